use serde::Serialize;

use crate::archive::format::{self, Context, Handler};
use crate::bank::Item;
use crate::cursor::ByteCursor;
use crate::entry::ChunkEntry;
use crate::error::{Error, ErrorKind, Result, ResultExt};
use crate::game::Game;

/// Sub-chunk roles inside an object record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectPart {
    Header,
    Name,
    Properties,
    Unknown,
    Effect,
}

/// Decoded view of an object header (0x4444).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ObjectHeader {
    pub handle: u16,
    pub object_type: i16,
    pub flags: u16,
    pub reserved: u16,
    pub ink_effect: u32,
    pub ink_effect_param: u32,
}

/// One object definition: a run of sub-chunks closed by the terminator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectItem {
    pub header: Option<ChunkEntry>,
    pub name: Option<ChunkEntry>,
    pub properties: Option<ChunkEntry>,
    pub effect: Option<ChunkEntry>,
    pub extra: Vec<ChunkEntry>,
    pub end: Option<ChunkEntry>,
}

impl ObjectItem {
    pub fn header(&self, game: &Game) -> Result<Option<ObjectHeader>> {
        let Some(entry) = &self.header else {
            return Ok(None);
        };
        let body = entry.decode_body(game.modes())?;
        let mut strm = body.cursor();
        Ok(Some(ObjectHeader {
            handle: strm.read_u16()?,
            object_type: strm.read_i16()?,
            flags: strm.read_u16()?,
            reserved: strm.read_u16()?,
            ink_effect: strm.read_u32()?,
            ink_effect_param: strm.read_u32()?,
        }))
    }

    pub fn name(&self, game: &Game) -> Result<Option<String>> {
        let Some(entry) = &self.name else {
            return Ok(None);
        };
        let body = entry.decode_body(game.modes())?;
        Ok(Some(body.cursor().read_string(entry.unicode)?))
    }
}

impl Item for ObjectItem {
    const NAME: &'static str = "Object Bank";
    const END_MARKER: Option<u16> = None;

    fn read(&mut self, game: &Game, strm: &mut ByteCursor<'_>) -> Result<()> {
        *self = Self::default();
        loop {
            let position = strm.absolute_position();
            let code = strm.peek_u16().trace("Object Has No Terminator")?;
            let kind = format::resolve(code, Context::Object)
                .trace_context("Failed To Read Object Chunk", || {
                    format!("at 0x{:X}", position)
                })?;

            if kind.handler == Handler::Last && self.header.is_none() {
                return Err(Error::with_context(
                    ErrorKind::InvalidState,
                    format!("object terminator before header at 0x{:X}", position),
                ));
            }

            let mut child = ChunkEntry::default();
            child
                .read(game, strm)
                .trace_with(|| format!("Failed To Read {}", kind.name))?;

            match kind.handler {
                Handler::Last => {
                    self.end = Some(child);
                    return Ok(());
                }
                Handler::ObjectChild(ObjectPart::Header) => self.header = Some(child),
                Handler::ObjectChild(ObjectPart::Name) => self.name = Some(child),
                Handler::ObjectChild(ObjectPart::Properties) => self.properties = Some(child),
                Handler::ObjectChild(ObjectPart::Effect) => self.effect = Some(child),
                _ => self.extra.push(child),
            }
        }
    }
}

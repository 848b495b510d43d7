use serde::Serialize;
use tracing::debug;

use super::{body_source, ItemKind};
use crate::bank::Item;
use crate::cursor::ByteCursor;
use crate::entry::ChunkEntry;
use crate::error::{Error, Result, ResultExt};
use crate::game::Game;
use crate::mode::ModeRegistry;
use crate::trace;

/// Bytes in a sound or music header.
pub const AUDIO_HEADER_SIZE: usize = 24;

/// Header flag: the body is stored uncompressed.
pub const SOUND_FLAG_UNCOMPRESSED: u32 = 0x20;

/// Header shared by sound and music items.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AudioHeader {
    pub checksum: u32,
    pub references: u32,
    pub decoded_size: u32,
    pub flags: u32,
    pub reserved: u32,
    /// Name length in characters.
    pub name_length: u32,
}

impl AudioHeader {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let mut strm = ByteCursor::new(bytes);
        Ok(Self {
            checksum: strm.read_u32()?,
            references: strm.read_u32()?,
            decoded_size: strm.read_u32()?,
            flags: strm.read_u32()?,
            reserved: strm.read_u32()?,
            name_length: strm.read_u32()?,
        })
    }

    /// Byte length of the name in the decoded body.
    pub fn name_bytes(&self, unicode: bool) -> u64 {
        self.name_length as u64 * if unicode { 2 } else { 1 }
    }
}

/// Split a decoded audio body into name and payload.
pub(crate) fn split_name(
    header: &AudioHeader,
    body: &[u8],
    unicode: bool,
) -> Result<(String, Vec<u8>)> {
    let mut strm = ByteCursor::new(body);
    let name = strm
        .read_string_len(header.name_length as usize, unicode)
        .trace("Failed To Read Audio Name")?;
    // Names are stored with a trailing NUL.
    let name = name.trim_end_matches('\0').to_string();
    Ok((name, strm.rest().to_vec()))
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SoundItem {
    pub entry: ChunkEntry,
    /// Header of a modern sound, known without decoding.
    pub header: Option<AudioHeader>,
}

impl SoundItem {
    pub fn handle(&self) -> Option<u32> {
        self.entry.handle
    }

    pub fn header(&self, modes: &ModeRegistry) -> Result<AudioHeader> {
        if let Some(header) = self.header {
            return Ok(header);
        }
        let head = self.entry.decode_head(modes)?;
        AudioHeader::parse(&head).trace("Failed To Parse Sound Header")
    }

    /// Name and raw audio payload.
    pub fn decode(&self, game: &Game) -> Result<(String, Vec<u8>)> {
        let header = self.header(game.modes())?;
        let body = self.entry.decode_body(game.modes())?;
        split_name(&header, body.as_bytes(), self.entry.unicode)
    }

    fn read_legacy(&mut self, game: &Game, strm: &mut ByteCursor<'_>) -> Result<()> {
        self.entry
            .read_head(game, strm, 0, true)
            .trace("Failed To Read Sound Handle")?;
        self.entry.head_in_body = AUDIO_HEADER_SIZE;
        self.entry
            .read_body(game, strm, body_source(ItemKind::Sound, 0).is_compressed(), None)
            .trace_context("Failed To Read Sound", || {
                format!("handle {:?}", self.entry.handle)
            })
    }

    fn read_modern(&mut self, game: &Game, strm: &mut ByteCursor<'_>) -> Result<()> {
        let start = strm.absolute_position();
        self.entry
            .read_head(game, strm, AUDIO_HEADER_SIZE, true)
            .trace("Failed To Read Sound Header")?;
        let header =
            AudioHeader::parse(&self.entry.raw_head).trace("Failed To Parse Sound Header")?;

        let compressed = body_source(ItemKind::Sound, header.flags).is_compressed();
        self.entry
            .read_body(game, strm, compressed, Some(header.decoded_size))
            .trace_context("Failed To Read Sound", || {
                format!("handle {:?}", self.entry.handle)
            })?;
        self.entry.set_ref_span(start..strm.absolute_position());

        // Checked after the record is consumed so the next item still lines up.
        let name_bytes = header.name_bytes(self.entry.unicode);
        if name_bytes > header.decoded_size as u64 {
            return Err(Error::str(format!(
                "sound name of {} bytes exceeds decoded size {}",
                name_bytes, header.decoded_size
            )));
        }

        debug!(
            "{}Sound {:?}: {} bytes, flags 0x{:X}",
            trace::indent(),
            self.entry.handle,
            header.decoded_size,
            header.flags
        );
        self.header = Some(header);
        Ok(())
    }
}

impl Item for SoundItem {
    const NAME: &'static str = "Sound Bank";
    const END_MARKER: Option<u16> = Some(0x5557);

    fn read(&mut self, game: &Game, strm: &mut ByteCursor<'_>) -> Result<()> {
        *self = Self::default();
        self.entry.read_init(game);
        if game.old_game() {
            self.read_legacy(game, strm)
        } else {
            self.read_modern(game, strm)
        }
    }
}

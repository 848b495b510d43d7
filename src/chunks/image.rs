use serde::Serialize;

use super::{body_source, ItemKind};
use crate::bank::Item;
use crate::cursor::ByteCursor;
use crate::entry::ChunkEntry;
use crate::error::{Result, ResultExt};
use crate::game::Game;
use crate::mode::ModeRegistry;

/// Bytes of image header at the start of the decoded body.
pub const IMAGE_HEADER_SIZE: usize = 36;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageItem {
    pub entry: ChunkEntry,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImageHeader {
    pub checksum: u32,
    pub references: u32,
    pub data_size: u32,
    pub width: u16,
    pub height: u16,
    pub graphics_mode: u16,
    pub flags: u16,
    pub reserved: u32,
    pub hotspot_x: i16,
    pub hotspot_y: i16,
    pub action_x: i16,
    pub action_y: i16,
    pub transparent: [u8; 4],
}

impl ImageHeader {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let mut strm = ByteCursor::new(bytes);
        Ok(Self {
            checksum: strm.read_u32()?,
            references: strm.read_u32()?,
            data_size: strm.read_u32()?,
            width: strm.read_u16()?,
            height: strm.read_u16()?,
            graphics_mode: strm.read_u16()?,
            flags: strm.read_u16()?,
            reserved: strm.read_u32()?,
            hotspot_x: strm.read_i16()?,
            hotspot_y: strm.read_i16()?,
            action_x: strm.read_i16()?,
            action_y: strm.read_i16()?,
            transparent: strm.read_array()?,
        })
    }
}

impl ImageItem {
    pub fn handle(&self) -> Option<u32> {
        self.entry.handle
    }

    pub fn header(&self, modes: &ModeRegistry) -> Result<ImageHeader> {
        let head = self.entry.decode_head(modes)?;
        ImageHeader::parse(&head).trace("Failed To Parse Image Header")
    }

    /// Encoded pixel payload following the header.
    pub fn data(&self, modes: &ModeRegistry) -> Result<Vec<u8>> {
        Ok(self.entry.decode_body(modes)?.into_owned())
    }
}

impl Item for ImageItem {
    const NAME: &'static str = "Image Bank";
    const END_MARKER: Option<u16> = Some(0x5555);

    fn read(&mut self, game: &Game, strm: &mut ByteCursor<'_>) -> Result<()> {
        self.entry.read_init(game);
        self.entry
            .read_head(game, strm, 0, true)
            .trace("Failed To Read Image Handle")?;
        self.entry.head_in_body = IMAGE_HEADER_SIZE;
        self.entry
            .read_body(game, strm, body_source(ItemKind::Image, 0).is_compressed(), None)
            .trace_context("Failed To Read Image", || {
                format!("handle {:?}", self.entry.handle)
            })
    }
}

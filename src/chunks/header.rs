use serde::Serialize;

use crate::cursor::ByteCursor;
use crate::entry::ChunkEntry;
use crate::error::{Result, ResultExt};
use crate::game::Game;
use crate::mode::ModeRegistry;

/// Application header (0x2223).
#[derive(Debug, Clone)]
pub struct AppHeaderChunk {
    pub entry: ChunkEntry,
}

/// Decoded view of the application header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AppHeader {
    pub size: u32,
    pub flags: u16,
    pub new_flags: u16,
    pub graphics_mode: u16,
    pub other_flags: u16,
    pub window_width: u16,
    pub window_height: u16,
    pub initial_score: u32,
    pub initial_lives: u32,
}

impl AppHeaderChunk {
    pub fn read(game: &Game, strm: &mut ByteCursor<'_>) -> Result<Self> {
        let mut entry = ChunkEntry::default();
        entry.read(game, strm).trace("Failed To Read App Header")?;
        Ok(Self { entry })
    }

    pub fn view(&self, modes: &ModeRegistry) -> Result<AppHeader> {
        let body = self.entry.decode_body(modes)?;
        let mut strm = body.cursor();
        let header = AppHeader {
            size: strm.read_u32()?,
            flags: strm.read_u16()?,
            new_flags: strm.read_u16()?,
            graphics_mode: strm.read_u16()?,
            other_flags: strm.read_u16()?,
            window_width: strm.read_u16()?,
            window_height: strm.read_u16()?,
            initial_score: strm.read_u32()?,
            initial_lives: strm.read_u32()?,
        };
        Ok(header)
    }
}

use super::{body_source, ItemKind};
use crate::bank::Item;
use crate::cursor::ByteCursor;
use crate::entry::ChunkEntry;
use crate::error::{Result, ResultExt};
use crate::game::Game;
use crate::mode::ModeRegistry;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FontItem {
    pub entry: ChunkEntry,
}

impl FontItem {
    pub fn handle(&self) -> Option<u32> {
        self.entry.handle
    }

    /// Decoded font record.
    pub fn data(&self, modes: &ModeRegistry) -> Result<Vec<u8>> {
        Ok(self.entry.decode_body(modes)?.into_owned())
    }
}

impl Item for FontItem {
    const NAME: &'static str = "Font Bank";
    const END_MARKER: Option<u16> = Some(0x5556);

    fn read(&mut self, game: &Game, strm: &mut ByteCursor<'_>) -> Result<()> {
        self.entry.read_init(game);
        self.entry
            .read_head(game, strm, 0, true)
            .trace("Failed To Read Font Handle")?;
        self.entry
            .read_body(game, strm, body_source(ItemKind::Font, 0).is_compressed(), None)
            .trace_context("Failed To Read Font", || {
                format!("handle {:?}", self.entry.handle)
            })
    }
}

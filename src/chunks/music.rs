use super::sound::{split_name, AudioHeader, AUDIO_HEADER_SIZE};
use super::{body_source, ItemKind};
use crate::bank::Item;
use crate::cursor::ByteCursor;
use crate::entry::ChunkEntry;
use crate::error::{Result, ResultExt};
use crate::game::Game;
use crate::mode::ModeRegistry;

/// Music track; the header is stored inside the compressed body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MusicItem {
    pub entry: ChunkEntry,
}

impl MusicItem {
    pub fn handle(&self) -> Option<u32> {
        self.entry.handle
    }

    pub fn header(&self, modes: &ModeRegistry) -> Result<AudioHeader> {
        let head = self.entry.decode_head(modes)?;
        AudioHeader::parse(&head).trace("Failed To Parse Music Header")
    }

    pub fn decode(&self, game: &Game) -> Result<(String, Vec<u8>)> {
        let header = self.header(game.modes())?;
        let body = self.entry.decode_body(game.modes())?;
        split_name(&header, body.as_bytes(), self.entry.unicode)
    }
}

impl Item for MusicItem {
    const NAME: &'static str = "Music Bank";
    const END_MARKER: Option<u16> = Some(0x5558);

    fn read(&mut self, game: &Game, strm: &mut ByteCursor<'_>) -> Result<()> {
        self.entry.read_init(game);
        self.entry
            .read_head(game, strm, 0, true)
            .trace("Failed To Read Music Handle")?;
        self.entry.head_in_body = AUDIO_HEADER_SIZE;
        self.entry
            .read_body(game, strm, body_source(ItemKind::Music, 0).is_compressed(), None)
            .trace_context("Failed To Read Music", || {
                format!("handle {:?}", self.entry.handle)
            })
    }
}

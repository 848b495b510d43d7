use crate::cursor::ByteCursor;
use crate::entry::ChunkEntry;
use crate::error::Result;
use crate::game::Game;
use crate::mode::ModeRegistry;

/// Offset table for one of the item banks.
#[derive(Debug, Clone)]
pub struct HandlesChunk {
    pub name: &'static str,
    pub entry: ChunkEntry,
}

impl HandlesChunk {
    pub fn read(name: &'static str, game: &Game, strm: &mut ByteCursor<'_>) -> Result<Self> {
        let mut entry = ChunkEntry::default();
        entry.read(game, strm)?;
        Ok(Self { name, entry })
    }

    /// Item offsets, one u32 per handle. A trailing partial word is ignored.
    pub fn offsets(&self, modes: &ModeRegistry) -> Result<Vec<u32>> {
        let body = self.entry.decode_body(modes)?;
        let mut strm = body.cursor();
        let mut offsets = Vec::with_capacity(strm.remaining() / 4);
        while strm.remaining() >= 4 {
            offsets.push(strm.read_u32()?);
        }
        Ok(offsets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{DecodeOptions, Progress};

    #[test]
    fn test_offsets() {
        let game = Game::new(DecodeOptions::default(), Progress::new());
        let mut data = vec![0x55, 0x55, 0, 0, 9, 0, 0, 0];
        for offset in [0u32, 0x40] {
            data.extend_from_slice(&offset.to_le_bytes());
        }
        data.push(0xEE);

        let chunk = HandlesChunk::read("ImageHandles", &game, &mut ByteCursor::new(&data)).unwrap();
        assert_eq!(chunk.offsets(game.modes()).unwrap(), vec![0, 0x40]);
    }
}

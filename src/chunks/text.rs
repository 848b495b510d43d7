use tracing::debug;

use crate::cursor::ByteCursor;
use crate::entry::ChunkEntry;
use crate::error::{Result, ResultExt};
use crate::game::Game;
use crate::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextKind {
    Title,
    Author,
    ProjectPath,
    OutputPath,
    AboutText,
    Copyright,
}

impl TextKind {
    pub fn name(self) -> &'static str {
        match self {
            TextKind::Title => "Title",
            TextKind::Author => "Author",
            TextKind::ProjectPath => "ProjectPath",
            TextKind::OutputPath => "OutputPath",
            TextKind::AboutText => "AboutText",
            TextKind::Copyright => "Copyright",
        }
    }

    /// Whether the string is part of the key material.
    pub fn is_key_part(self) -> bool {
        matches!(
            self,
            TextKind::Title | TextKind::Copyright | TextKind::ProjectPath
        )
    }
}

/// Single string chunk, decoded at load.
#[derive(Debug, Clone)]
pub struct TextChunk {
    pub entry: ChunkEntry,
    pub kind: TextKind,
    pub text: String,
}

impl TextChunk {
    pub fn read(kind: TextKind, game: &Game, strm: &mut ByteCursor<'_>) -> Result<Self> {
        let mut entry = ChunkEntry::default();
        entry.read(game, strm)?;

        let text = {
            let body = entry
                .decode_body(game.modes())
                .trace_with(|| format!("Failed To Decode {}", kind.name()))?;
            body.cursor()
                .read_string(entry.unicode)
                .trace_with(|| format!("Failed To Read {}", kind.name()))?
        };
        debug!("{}{}: {:?}", trace::indent(), kind.name(), text);

        Ok(Self { entry, kind, text })
    }
}

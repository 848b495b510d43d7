use tracing::debug;

use super::ChunkSummary;
use crate::archive::format::{self, Context, Handler};
use crate::cursor::ByteCursor;
use crate::entry::ChunkEntry;
use crate::error::{Result, ResultExt};
use crate::game::Game;
use crate::trace;

const FRAME_NAME_CHUNK: u16 = 0x3335;

/// One sub-chunk of a frame, kept undecoded.
#[derive(Debug, Clone)]
pub struct FrameChunk {
    pub name: &'static str,
    pub entry: ChunkEntry,
}

/// A frame: the 0x3333 chunk and the sub-chunks that follow it up to the
/// terminator.
#[derive(Debug, Clone)]
pub struct Frame {
    pub entry: ChunkEntry,
    pub chunks: Vec<FrameChunk>,
    pub end: ChunkEntry,
}

impl Frame {
    pub fn read(game: &Game, strm: &mut ByteCursor<'_>) -> Result<Self> {
        let mut entry = ChunkEntry::default();
        entry.read(game, strm).trace("Failed To Read Frame Header")?;
        debug!("{}Frame at 0x{:X}", trace::indent(), entry.position);

        let _nest = trace::nest();
        let mut chunks = Vec::new();
        let end = loop {
            let position = strm.absolute_position();
            let code = strm.peek_u16().trace("Frame Has No Terminator")?;
            let kind = format::resolve(code, Context::Frame)
                .trace_context("Failed To Read Frame Chunk", || {
                    format!("at 0x{:X}", position)
                })?;

            let mut child = ChunkEntry::default();
            child
                .read(game, strm)
                .trace_with(|| format!("Failed To Read {}", kind.name))?;
            if kind.handler == Handler::Last {
                break child;
            }
            debug!(
                "{}{} ({} bytes, {})",
                trace::indent(),
                kind.name,
                child.raw_body.len(),
                child.mode
            );
            chunks.push(FrameChunk {
                name: kind.name,
                entry: child,
            });
        };

        Ok(Self { entry, chunks, end })
    }

    pub fn chunk(&self, id: u16) -> Option<&ChunkEntry> {
        self.chunks
            .iter()
            .map(|chunk| &chunk.entry)
            .find(|entry| entry.id == id)
    }

    /// Decoded frame name, if the frame carries one.
    pub fn name(&self, game: &Game) -> Result<Option<String>> {
        let Some(entry) = self.chunk(FRAME_NAME_CHUNK) else {
            return Ok(None);
        };
        let body = entry.decode_body(game.modes())?;
        let name = body.cursor().read_string(entry.unicode)?;
        Ok(Some(name))
    }

    pub fn summary(&self) -> ChunkSummary {
        let mut summary = ChunkSummary::of("Frame", &self.entry);
        summary.children = self
            .chunks
            .iter()
            .map(|chunk| ChunkSummary::of(chunk.name, &chunk.entry))
            .collect();
        summary
    }
}

//! Typed chunk and bank item readers

mod font;
mod frame;
mod handles;
mod header;
mod image;
mod music;
mod object;
mod sound;
mod text;

pub use font::FontItem;
pub use frame::{Frame, FrameChunk};
pub use handles::HandlesChunk;
pub use header::{AppHeader, AppHeaderChunk};
pub use image::{ImageHeader, ImageItem, IMAGE_HEADER_SIZE};
pub use music::MusicItem;
pub use object::{ObjectHeader, ObjectItem, ObjectPart};
pub use sound::{AudioHeader, SoundItem, AUDIO_HEADER_SIZE, SOUND_FLAG_UNCOMPRESSED};
pub use text::{TextChunk, TextKind};

use serde::Serialize;

use crate::archive::format::{ChunkKind, Handler};
use crate::bank::Bank;
use crate::cursor::ByteCursor;
use crate::entry::ChunkEntry;
use crate::error::Result;
use crate::game::Game;
use crate::mode::Mode;

/// Every chunk the loader knows how to read.
#[derive(Debug, Clone)]
pub enum Chunk {
    AppHeader(AppHeaderChunk),
    Text(TextChunk),
    ObjectBank(Bank<ObjectItem>),
    Frame(Frame),
    Handles(HandlesChunk),
    ImageBank(Bank<ImageItem>),
    FontBank(Bank<FontItem>),
    SoundBank(Bank<SoundItem>),
    MusicBank(Bank<MusicItem>),
    /// Known chunk kept undecoded.
    Raw(&'static str, ChunkEntry),
    Last(ChunkEntry),
}

impl Chunk {
    /// Read the chunk at the cursor with the handler `kind` names.
    pub fn read(kind: &'static ChunkKind, game: &Game, strm: &mut ByteCursor<'_>) -> Result<Self> {
        Ok(match kind.handler {
            Handler::AppHeader => Chunk::AppHeader(AppHeaderChunk::read(game, strm)?),
            Handler::Text(text) => Chunk::Text(TextChunk::read(text, game, strm)?),
            Handler::ObjectBank => Chunk::ObjectBank(Bank::read(game, strm)?),
            Handler::Frame => Chunk::Frame(Frame::read(game, strm)?),
            Handler::Handles => Chunk::Handles(HandlesChunk::read(kind.name, game, strm)?),
            Handler::ImageBank => Chunk::ImageBank(Bank::read(game, strm)?),
            Handler::FontBank => Chunk::FontBank(Bank::read(game, strm)?),
            Handler::SoundBank => Chunk::SoundBank(Bank::read(game, strm)?),
            Handler::MusicBank => Chunk::MusicBank(Bank::read(game, strm)?),
            Handler::Raw | Handler::FrameChild | Handler::ObjectChild(_) => {
                let mut entry = ChunkEntry::default();
                entry.read(game, strm)?;
                Chunk::Raw(kind.name, entry)
            }
            Handler::Last => {
                let mut entry = ChunkEntry::default();
                entry.read(game, strm)?;
                Chunk::Last(entry)
            }
        })
    }

    pub fn entry(&self) -> &ChunkEntry {
        match self {
            Chunk::AppHeader(chunk) => &chunk.entry,
            Chunk::Text(chunk) => &chunk.entry,
            Chunk::ObjectBank(bank) => &bank.entry,
            Chunk::Frame(frame) => &frame.entry,
            Chunk::Handles(chunk) => &chunk.entry,
            Chunk::ImageBank(bank) => &bank.entry,
            Chunk::FontBank(bank) => &bank.entry,
            Chunk::SoundBank(bank) => &bank.entry,
            Chunk::MusicBank(bank) => &bank.entry,
            Chunk::Raw(_, entry) | Chunk::Last(entry) => entry,
        }
    }

    pub fn id(&self) -> u16 {
        self.entry().id
    }

    pub fn name(&self) -> &'static str {
        match self {
            Chunk::AppHeader(_) => "AppHeader",
            Chunk::Text(chunk) => chunk.kind.name(),
            Chunk::ObjectBank(_) => "ObjectBank",
            Chunk::Frame(_) => "Frame",
            Chunk::Handles(chunk) => chunk.name,
            Chunk::ImageBank(_) => "ImageBank",
            Chunk::FontBank(_) => "FontBank",
            Chunk::SoundBank(_) => "SoundBank",
            Chunk::MusicBank(_) => "MusicBank",
            Chunk::Raw(name, _) => name,
            Chunk::Last(_) => "Last",
        }
    }

    pub fn summary(&self) -> ChunkSummary {
        let name = self.name();
        match self {
            Chunk::Text(chunk) => {
                let mut summary = ChunkSummary::of(name, &chunk.entry);
                summary.text = Some(chunk.text.clone());
                summary
            }
            Chunk::Frame(frame) => frame.summary(),
            Chunk::ObjectBank(bank) => bank.summary(name),
            Chunk::ImageBank(bank) => bank.summary(name),
            Chunk::FontBank(bank) => bank.summary(name),
            Chunk::SoundBank(bank) => bank.summary(name),
            Chunk::MusicBank(bank) => bank.summary(name),
            _ => ChunkSummary::of(name, self.entry()),
        }
    }
}

/// Serializable outline of one chunk, for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChunkSummary {
    pub id: String,
    pub name: &'static str,
    pub mode: Mode,
    pub offset: usize,
    pub size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed: Vec<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ChunkSummary>,
}

impl ChunkSummary {
    pub fn of(name: &'static str, entry: &ChunkEntry) -> Self {
        Self {
            id: format!("0x{}", hex::encode_upper(entry.id.to_be_bytes())),
            name,
            mode: entry.mode,
            offset: entry.position,
            size: entry.raw_body.len(),
            text: None,
            items: None,
            failed: Vec::new(),
            error: None,
            children: Vec::new(),
        }
    }
}

/// Bank item kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Image,
    Font,
    Sound,
    Music,
}

/// Where an item's body length comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodySource {
    /// Compressed stream with its own size field.
    Compressed,
    /// Stored as-is; length is the header's decoded size.
    Raw,
}

impl BodySource {
    pub fn is_compressed(self) -> bool {
        self == BodySource::Compressed
    }
}

struct BodyOverride {
    kind: ItemKind,
    mask: u32,
    source: BodySource,
}

const BODY_OVERRIDES: &[BodyOverride] = &[BodyOverride {
    kind: ItemKind::Sound,
    mask: SOUND_FLAG_UNCOMPRESSED,
    source: BodySource::Raw,
}];

/// Body source for an item kind given its header flags. Kinds whose header
/// sits inside the body are read before any flags are known and pass 0.
pub fn body_source(kind: ItemKind, flags: u32) -> BodySource {
    BODY_OVERRIDES
        .iter()
        .find(|o| o.kind == kind && flags & o.mask != 0)
        .map(|o| o.source)
        .unwrap_or(BodySource::Compressed)
}

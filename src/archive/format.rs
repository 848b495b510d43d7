//! Chunk code dispatch table
//!
//! Every known chunk code maps to one handler and the context it may
//! appear in. Codes are 16-bit and unique across contexts.

use crate::chunks::{ObjectPart, TextKind};
use crate::error::{Error, ErrorKind, Result};

/// Terminator of the top-level stream, a frame, or an object.
pub const LAST_CHUNK: u16 = 0x7F7F;

/// Frame container.
pub const FRAME_CHUNK: u16 = 0x3333;

/// Object header sub-chunk.
pub const OBJECT_HEADER_CHUNK: u16 = 0x4444;

/// Where in the chunk tree a code is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Context {
    TopLevel,
    Frame,
    Object,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handler {
    AppHeader,
    Text(TextKind),
    ObjectBank,
    Frame,
    Handles,
    ImageBank,
    FontBank,
    SoundBank,
    MusicBank,
    Raw,
    FrameChild,
    ObjectChild(ObjectPart),
    Last,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkKind {
    pub code: u16,
    pub name: &'static str,
    /// `None` for the terminator, which closes every context.
    pub context: Option<Context>,
    pub handler: Handler,
}

impl ChunkKind {
    pub fn allowed_in(&self, context: Context) -> bool {
        self.context.map_or(true, |own| own == context)
    }
}

const fn top(code: u16, name: &'static str, handler: Handler) -> ChunkKind {
    ChunkKind {
        code,
        name,
        context: Some(Context::TopLevel),
        handler,
    }
}

const fn raw(code: u16, name: &'static str) -> ChunkKind {
    top(code, name, Handler::Raw)
}

const fn frame(code: u16, name: &'static str) -> ChunkKind {
    ChunkKind {
        code,
        name,
        context: Some(Context::Frame),
        handler: Handler::FrameChild,
    }
}

const fn object(code: u16, name: &'static str, part: ObjectPart) -> ChunkKind {
    ChunkKind {
        code,
        name,
        context: Some(Context::Object),
        handler: Handler::ObjectChild(part),
    }
}

pub static CHUNK_KINDS: &[ChunkKind] = &[
    raw(0x1122, "Preview"),
    raw(0x1223, "MiniHeader"),
    top(0x2223, "AppHeader", Handler::AppHeader),
    top(0x2224, "Title", Handler::Text(TextKind::Title)),
    top(0x2225, "Author", Handler::Text(TextKind::Author)),
    raw(0x2226, "Menu"),
    raw(0x2227, "ExtraPath"),
    raw(0x2228, "Extensions"),
    top(0x2229, "ObjectBank", Handler::ObjectBank),
    raw(0x222A, "GlobalEvents"),
    raw(0x222B, "FrameHandles"),
    raw(0x222C, "ExtraData"),
    raw(0x222D, "AdditionalExtensions"),
    top(0x222E, "ProjectPath", Handler::Text(TextKind::ProjectPath)),
    top(0x222F, "OutputPath", Handler::Text(TextKind::OutputPath)),
    raw(0x2230, "AppDoc"),
    raw(0x2231, "OtherExtension"),
    raw(0x2232, "GlobalValues"),
    raw(0x2233, "GlobalStrings"),
    raw(0x2234, "ExtensionList"),
    raw(0x2235, "Icon"),
    raw(0x2236, "DemoVersion"),
    raw(0x2237, "SecurityNumber"),
    raw(0x2238, "BinaryFiles"),
    raw(0x2239, "MenuImages"),
    top(0x223A, "AboutText", Handler::Text(TextKind::AboutText)),
    top(0x223B, "Copyright", Handler::Text(TextKind::Copyright)),
    raw(0x223C, "GlobalValueNames"),
    raw(0x223D, "GlobalStringNames"),
    raw(0x223E, "MovementExtensions"),
    raw(0x223F, "ObjectBank2"),
    raw(0x2240, "ExeOnly"),
    raw(0x2241, "Chunk2241"),
    raw(0x2242, "Protection"),
    raw(0x2243, "Shaders"),
    raw(0x2244, "Chunk2244"),
    raw(0x2245, "ExtendedHeader"),
    raw(0x2246, "Spacer"),
    raw(0x224D, "FrameBank"),
    raw(0x224F, "Chunk224F"),
    raw(0x2251, "TitleScreen"),
    top(FRAME_CHUNK, "Frame", Handler::Frame),
    frame(0x3334, "FrameHeader"),
    frame(0x3335, "FrameName"),
    frame(0x3336, "FramePassword"),
    frame(0x3337, "FramePalette"),
    frame(0x3338, "FrameObjectInstances"),
    frame(0x3339, "FrameFadeInFrame"),
    frame(0x333A, "FrameFadeOutFrame"),
    frame(0x333B, "FrameFadeIn"),
    frame(0x333C, "FrameFadeOut"),
    frame(0x333D, "FrameEvents"),
    frame(0x333E, "FramePlayHeader"),
    frame(0x333F, "FrameAdditionalItem"),
    frame(0x3340, "FrameAdditionalItemInstance"),
    frame(0x3341, "FrameLayers"),
    frame(0x3342, "FrameVirtualSize"),
    frame(0x3343, "DemoFilePath"),
    frame(0x3344, "RandomSeed"),
    frame(0x3345, "FrameLayerEffect"),
    frame(0x3346, "FrameBluray"),
    frame(0x3347, "MovementTimerBase"),
    frame(0x3348, "MosaicImageTable"),
    frame(0x3349, "FrameEffects"),
    frame(0x334A, "FrameIphoneOptions"),
    frame(0x334B, "FrameChunk334B"),
    frame(0x334C, "FrameChunk334C"),
    object(OBJECT_HEADER_CHUNK, "ObjectHeader", ObjectPart::Header),
    object(0x4445, "ObjectName", ObjectPart::Name),
    object(0x4446, "ObjectProperties", ObjectPart::Properties),
    object(0x4447, "ObjectChunk4447", ObjectPart::Unknown),
    object(0x4448, "ObjectEffect", ObjectPart::Effect),
    top(0x5555, "ImageHandles", Handler::Handles),
    top(0x5556, "FontHandles", Handler::Handles),
    top(0x5557, "SoundHandles", Handler::Handles),
    top(0x5558, "MusicHandles", Handler::Handles),
    top(0x6666, "ImageBank", Handler::ImageBank),
    top(0x6667, "FontBank", Handler::FontBank),
    top(0x6668, "SoundBank", Handler::SoundBank),
    top(0x6669, "MusicBank", Handler::MusicBank),
    ChunkKind {
        code: LAST_CHUNK,
        name: "Last",
        context: None,
        handler: Handler::Last,
    },
];

pub fn lookup(code: u16) -> Option<&'static ChunkKind> {
    CHUNK_KINDS.iter().find(|kind| kind.code == code)
}

/// Look up `code` for reading in `context`.
#[track_caller]
pub fn resolve(code: u16, context: Context) -> Result<&'static ChunkKind> {
    match lookup(code) {
        Some(kind) if kind.allowed_in(context) => Ok(kind),
        Some(kind) => Err(Error::with_context(
            ErrorKind::InvalidState,
            format!("{} (0x{:04X}) in {:?} context", kind.name, code, context),
        )),
        None => Err(Error::with_context(
            ErrorKind::InvalidChunk,
            format!("unknown chunk 0x{:04X} in {:?} context", code, context),
        )),
    }
}

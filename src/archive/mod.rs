pub mod exe;
pub mod format;
mod loader;

pub use exe::{
    Container, EXE_SIGNATURE, GAME_MAGIC_ANSI, GAME_MAGIC_UNICODE, MAX_PACK_COUNT, PACK_MAGIC,
    PE_SIGNATURE,
};
pub use format::{ChunkKind, Context, Handler, CHUNK_KINDS, LAST_CHUNK};
pub use loader::Decoder;

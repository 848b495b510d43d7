//! fusion-archive: read-only decoder for Clickteam Fusion game archives
//!
//! Handles games embedded in a Windows executable as well as standalone
//! `.ccn` archives:
//! - Container validation (PE wrapper, pack section, game header)
//! - Chunk tree walk with per-chunk compression/encryption modes
//! - Fault-tolerant item banks (images, fonts, sounds, music, objects)
//! - Errors carrying an indented trace of every layer they passed through
//!
//! Bodies are copied out raw and only decoded when asked for.
//!
//! # Example
//!
//! ```no_run
//! use fusion_archive::{Chunk, Decoder, DecodeOptions};
//!
//! let decoder = Decoder::with_options(DecodeOptions::new().with_skip_broken_items(true));
//! let game = decoder.decode_file("game.exe")?;
//! println!("{:?}", game.title());
//!
//! for chunk in game.chunks() {
//!     if let Chunk::SoundBank(bank) = chunk {
//!         for sound in &bank.items {
//!             let (name, data) = sound.decode(&game)?;
//!             println!("{}: {} bytes", name, data.len());
//!         }
//!     }
//! }
//! # Ok::<(), fusion_archive::Error>(())
//! ```

// Core modules
pub mod archive;
pub mod bank;
pub mod chunks;
pub mod cursor;
pub mod entry;
pub mod error;
pub mod game;
pub mod mode;
pub mod trace;

use std::path::Path;

// Re-export commonly used types
pub use archive::Decoder;
pub use bank::{Bank, Item};
pub use chunks::{Chunk, ChunkSummary};
pub use cursor::ByteCursor;
pub use entry::{ChunkEntry, Decoded};
pub use error::{Error, ErrorKind, Result, ResultExt, TraceFrame};
pub use game::{DecodeOptions, Game, GameFlags, GameHeader, GameSummary, PackFile, Progress};
pub use mode::{Mode, ModeRegistry};

/// Decode an in-memory archive with default options.
pub fn decode(buffer: &[u8]) -> Result<Game> {
    Decoder::new().decode(buffer)
}

/// Read and decode an archive file with default options.
pub fn decode_file<P: AsRef<Path>>(path: P) -> Result<Game> {
    Decoder::new().decode_file(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_basics() {
        // Ensure core types are accessible
        let _mode = Mode::Mode1;
        let _options = DecodeOptions::default();
        assert_eq!(decode(b"").unwrap_err().kind(), &ErrorKind::InvalidExeSignature);
    }
}

use std::path::Path;

use tracing::debug;

use super::exe;
use super::format::{self, Context, Handler};
use crate::chunks::{Chunk, TextKind};
use crate::cursor::ByteCursor;
use crate::error::{Error, Result, ResultExt};
use crate::game::{DecodeOptions, Game, GameHeader, Progress};
use crate::trace;

/// Archive decoder with caller policy and a shareable progress handle.
#[derive(Debug, Clone, Default)]
pub struct Decoder {
    options: DecodeOptions,
    progress: Progress,
}

impl Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: DecodeOptions) -> Self {
        Self {
            options,
            progress: Progress::new(),
        }
    }

    pub fn options(&self) -> &DecodeOptions {
        &self.options
    }

    /// Progress of the bank currently being read. Safe to poll from another
    /// thread while [`Decoder::decode`] runs.
    pub fn progress(&self) -> Progress {
        self.progress.clone()
    }

    /// Decode an in-memory archive.
    pub fn decode(&self, buffer: &[u8]) -> Result<Game> {
        let mut strm = ByteCursor::new(buffer);
        let mut game = Game::new(self.options.clone(), self.progress.clone());

        let container = exe::locate(&mut strm).trace("Failed To Locate Game Data")?;
        let (header, unicode) =
            exe::read_game_header(&mut strm).trace("Failed To Read Game Header")?;
        start_session(&mut game, header, container.ccn, unicode)?;
        game.set_pack_files(container.pack_files);

        let flags = game.flags();
        debug!(
            "{}Game: runtime 0x{:04X}.{}, build {}, old {}, ccn {}, 2.5+ {}, unicode {}",
            trace::indent(),
            header.runtime_version,
            header.runtime_sub_version,
            header.product_build,
            flags.old_game,
            flags.ccn,
            flags.two_five_plus,
            flags.unicode
        );

        read_chunks(&mut game, &mut strm).trace("Failed To Read Chunks")?;
        Ok(game)
    }

    pub fn decode_file<P: AsRef<Path>>(&self, path: P) -> Result<Game> {
        let path = path.as_ref();
        let buffer = std::fs::read(path)
            .map_err(|e| Error::str(format!("{}: {}", path.display(), e)))?;
        self.decode(&buffer)
    }
}

/// Fix the version flags derived from the game header.
fn start_session(game: &mut Game, header: GameHeader, ccn: bool, unicode: bool) -> Result<()> {
    game.set_flags(header, header.flags(ccn, unicode))
        .trace("Failed To Set Game Flags")
}

/// Remember one of the strings the key is built from and rebuild the key.
fn set_key_part(game: &mut Game, kind: TextKind, value: String) -> Result<()> {
    match kind {
        TextKind::Title => game.set_title(value).trace("Failed To Set Title"),
        TextKind::Copyright => game.set_copyright(value).trace("Failed To Set Copyright"),
        _ => game
            .set_project_path(value)
            .trace("Failed To Set Project Path"),
    }
}

/// Walk the top-level chunk stream up to and including the terminator.
fn read_chunks(game: &mut Game, strm: &mut ByteCursor<'_>) -> Result<()> {
    let _nest = trace::nest();
    loop {
        let position = strm.absolute_position();
        let code = strm.peek_u16().trace("Chunk Stream Has No Terminator")?;
        let kind = format::resolve(code, Context::TopLevel)
            .trace_context("Failed To Read Chunk", || format!("at 0x{:X}", position))?;
        debug!("{}{} (0x{:04X}) at 0x{:X}", trace::indent(), kind.name, code, position);

        let chunk = Chunk::read(kind, game, strm)
            .trace_context("Failed To Read Chunk", || {
                format!("{} (0x{:04X}) at 0x{:X}", kind.name, code, position)
            })?;

        if let Chunk::Text(text) = &chunk {
            if text.kind.is_key_part() {
                set_key_part(game, text.kind, text.text.clone())?;
            }
        }

        game.push_chunk(chunk);
        if kind.handler == Handler::Last {
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn header() -> GameHeader {
        GameHeader {
            runtime_version: 0x0302,
            runtime_sub_version: 0,
            product_version: 0,
            product_build: 290,
        }
    }

    #[test]
    fn test_session_starts_once() {
        let mut game = Game::new(DecodeOptions::default(), Progress::new());
        start_session(&mut game, header(), false, true).unwrap();
        assert!(game.unicode());

        let err = start_session(&mut game, header(), true, false).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::InvalidState);
        assert!(err.mentions("Failed To Set Game Flags"));
        assert!(!game.ccn());
    }

    #[test]
    fn test_key_parts_install_the_key() {
        let mut game = Game::new(DecodeOptions::default(), Progress::new());
        start_session(&mut game, header(), false, true).unwrap();
        assert!(!game.modes().has_key());

        set_key_part(&mut game, TextKind::Copyright, "(c)".to_string()).unwrap();
        set_key_part(&mut game, TextKind::Title, "Demo".to_string()).unwrap();
        set_key_part(&mut game, TextKind::ProjectPath, "demo.mfa".to_string()).unwrap();
        assert_eq!(game.title(), Some("Demo"));
        assert_eq!(game.copyright(), Some("(c)"));
        assert_eq!(game.project_path(), Some("demo.mfa"));
        assert!(game.modes().has_key());
    }
}

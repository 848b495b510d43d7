//! Decode session: flags, options, progress and the decoded chunk tree

use std::panic::Location;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::chunks::{Chunk, ChunkSummary};
use crate::error::{Error, ErrorKind, Result};
use crate::mode::{self, ModeRegistry};

/// Version evidence gathered from the container.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GameFlags {
    /// Produced by the 0x0207 runtime (raw deflate, no encryption).
    pub old_game: bool,
    /// Standalone `.ccn` archive with no executable wrapper.
    pub ccn: bool,
    /// Fusion 2.5 or later.
    pub two_five_plus: bool,
    /// `PAMU` magic; strings are UTF-16LE.
    pub unicode: bool,
}

/// Fixed header following the `PAME`/`PAMU` magic.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GameHeader {
    pub runtime_version: u16,
    pub runtime_sub_version: u16,
    pub product_version: u32,
    pub product_build: u32,
}

/// Runtime version word of the legacy runtime.
pub const OLD_RUNTIME_VERSION: u16 = 0x0207;

/// Last product build before 2.5.
pub const LAST_PRE_2_5_BUILD: u32 = 284;

impl GameHeader {
    /// Derive flags from the header and container evidence.
    pub fn flags(&self, ccn: bool, unicode: bool) -> GameFlags {
        let old_game = self.runtime_version == OLD_RUNTIME_VERSION;
        GameFlags {
            old_game,
            ccn,
            two_five_plus: !old_game && self.product_build > LAST_PRE_2_5_BUILD,
            unicode,
        }
    }
}

/// A file bundled in the executable's pack section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackFile {
    pub name: String,
    /// Offset of the data within the decoded buffer.
    pub offset: usize,
    #[serde(skip)]
    pub data: Vec<u8>,
}

/// Caller policy for tolerating corrupt items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeOptions {
    /// Downgrade a failed bank to an empty one instead of aborting.
    pub skip_broken_items: bool,
    /// Item failures tolerated per bank before the bank itself fails.
    pub max_item_read_fails: usize,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            skip_broken_items: false,
            max_item_read_fails: 3,
        }
    }
}

impl DecodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_skip_broken_items(mut self, skip: bool) -> Self {
        self.skip_broken_items = skip;
        self
    }

    pub fn with_max_item_read_fails(mut self, max: usize) -> Self {
        self.max_item_read_fails = max;
        self
    }
}

/// Fraction of the current bank read, shareable across threads.
#[derive(Debug, Clone, Default)]
pub struct Progress(Arc<AtomicU32>);

impl Progress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    pub fn set(&self, fraction: f32) {
        self.0.store(fraction.to_bits(), Ordering::Relaxed);
    }

    /// Reset to 0 when the returned guard drops.
    pub fn scoped(&self) -> ProgressGuard<'_> {
        ProgressGuard { progress: self }
    }
}

pub struct ProgressGuard<'a> {
    progress: &'a Progress,
}

impl Drop for ProgressGuard<'_> {
    fn drop(&mut self) {
        self.progress.set(0.0);
    }
}

/// A decoded game archive.
#[derive(Debug)]
pub struct Game {
    flags: Option<GameFlags>,
    header: GameHeader,
    pack_files: Vec<PackFile>,
    chunks: Vec<Chunk>,
    modes: ModeRegistry,
    options: DecodeOptions,
    progress: Progress,
    title: Option<String>,
    copyright: Option<String>,
    project_path: Option<String>,
}

impl Game {
    pub fn new(options: DecodeOptions, progress: Progress) -> Self {
        Self {
            flags: None,
            header: GameHeader::default(),
            pack_files: Vec::new(),
            chunks: Vec::new(),
            modes: ModeRegistry::default(),
            options,
            progress,
            title: None,
            copyright: None,
            project_path: None,
        }
    }

    /// Fix the version flags. A session accepts this exactly once.
    #[track_caller]
    pub fn set_flags(&mut self, header: GameHeader, flags: GameFlags) -> Result<()> {
        if let Some(existing) = self.flags {
            return Err(Error::with_context(
                ErrorKind::InvalidState,
                format!("flags already set to {:?}", existing),
            ));
        }
        self.header = header;
        self.flags = Some(flags);
        self.modes = ModeRegistry::new(flags);
        Ok(())
    }

    pub fn flags(&self) -> GameFlags {
        self.flags.unwrap_or_default()
    }

    pub fn old_game(&self) -> bool {
        self.flags().old_game
    }

    pub fn ccn(&self) -> bool {
        self.flags().ccn
    }

    pub fn two_five_plus(&self) -> bool {
        self.flags().two_five_plus
    }

    pub fn unicode(&self) -> bool {
        self.flags().unicode
    }

    pub fn header(&self) -> &GameHeader {
        &self.header
    }

    pub fn pack_files(&self) -> &[PackFile] {
        &self.pack_files
    }

    pub(crate) fn set_pack_files(&mut self, files: Vec<PackFile>) {
        self.pack_files = files;
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub(crate) fn push_chunk(&mut self, chunk: Chunk) {
        self.chunks.push(chunk);
    }

    pub fn modes(&self) -> &ModeRegistry {
        &self.modes
    }

    pub fn options(&self) -> &DecodeOptions {
        &self.options
    }

    pub fn progress(&self) -> &Progress {
        &self.progress
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn copyright(&self) -> Option<&str> {
        self.copyright.as_deref()
    }

    pub fn project_path(&self) -> Option<&str> {
        self.project_path.as_deref()
    }

    pub(crate) fn set_title(&mut self, title: String) -> Result<()> {
        self.title = Some(title);
        self.refresh_key()
    }

    pub(crate) fn set_copyright(&mut self, copyright: String) -> Result<()> {
        self.copyright = Some(copyright);
        self.refresh_key()
    }

    pub(crate) fn set_project_path(&mut self, path: String) -> Result<()> {
        self.project_path = Some(path);
        self.refresh_key()
    }

    /// Rebuild the keyed decoders from the strings seen so far.
    fn refresh_key(&mut self) -> Result<()> {
        let flags = self.flags();
        if flags.old_game {
            return Ok(());
        }
        let material = mode::key_material(
            &flags,
            self.title().unwrap_or_default(),
            self.copyright().unwrap_or_default(),
            self.project_path().unwrap_or_default(),
        );
        if material.is_empty() {
            return Ok(());
        }
        self.modes.install_key(&material).map_err(|err| {
            err.traced(Location::caller(), "Failed To Install Key", None)
        })
    }

    /// Serializable outline of the decoded archive.
    pub fn summary(&self) -> GameSummary {
        GameSummary {
            flags: self.flags(),
            header: self.header,
            title: self.title.clone(),
            copyright: self.copyright.clone(),
            project_path: self.project_path.clone(),
            pack_files: self
                .pack_files
                .iter()
                .map(|file| PackFileSummary {
                    name: file.name.clone(),
                    offset: file.offset,
                    size: file.data.len(),
                })
                .collect(),
            chunks: self.chunks.iter().map(Chunk::summary).collect(),
        }
    }

    pub fn summary_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.summary()).map_err(|e| Error::str(e.to_string()))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GameSummary {
    pub flags: GameFlags,
    pub header: GameHeader,
    pub title: Option<String>,
    pub copyright: Option<String>,
    pub project_path: Option<String>,
    pub pack_files: Vec<PackFileSummary>,
    pub chunks: Vec<ChunkSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PackFileSummary {
    pub name: String,
    pub offset: usize,
    pub size: usize,
}

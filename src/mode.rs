//! Mode decoder registry
//!
//! Chunk and item bodies are stored under one of four historical schemes:
//!
//! | Mode | Raw body layout                                  |
//! |------|--------------------------------------------------|
//! | 0    | plaintext                                        |
//! | 1    | `decoded u32, compressed u32, stream`            |
//! | 2    | `ciphertext(check u8, data)`                     |
//! | 3    | `decoded u32, ciphertext(check u8, compressed u32, zlib)` |
//!
//! When an item header already declares the decoded size, the leading
//! `decoded` field is absent from modes 1 and 3. The `check` byte is the
//! key-derived checksum of [`EncryptionTable::check`]; a mismatch after
//! decryption means the key is wrong.

use std::borrow::Cow;
use std::fmt;
use std::io::Read;
use std::sync::Arc;

use flate2::read::{DeflateDecoder, ZlibDecoder};
use serde::Serialize;

use crate::cursor::ByteCursor;
use crate::error::{Error, ErrorKind, Result, ResultExt};
use crate::game::GameFlags;

/// Key schedule magic for Fusion 2.5+ games.
pub const MAGIC_CHAR_2_5: u8 = 0x63;

/// Key schedule magic for everything older.
pub const MAGIC_CHAR: u8 = 0x36;

/// Upper bound on speculative output allocation before inflating.
const MAX_PREALLOC: usize = 16 * 1024 * 1024;

/// Compression/encryption scheme of a chunk or item body.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u8)]
pub enum Mode {
    #[default]
    Mode0 = 0,
    Mode1 = 1,
    Mode2 = 2,
    Mode3 = 3,
}

impl Mode {
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            0 => Some(Self::Mode0),
            1 => Some(Self::Mode1),
            2 => Some(Self::Mode2),
            3 => Some(Self::Mode3),
            _ => None,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    /// Whether this build carries a decoder for the mode.
    pub fn compiled(self) -> bool {
        match self {
            Self::Mode0 => cfg!(feature = "mode0"),
            Self::Mode1 => cfg!(feature = "mode1"),
            Self::Mode2 => cfg!(feature = "mode2"),
            Self::Mode3 => cfg!(feature = "mode3"),
        }
    }

    fn not_compiled(self) -> ErrorKind {
        match self {
            Self::Mode0 => ErrorKind::NoMode0,
            Self::Mode1 => ErrorKind::NoMode1,
            Self::Mode2 => ErrorKind::NoMode2,
            Self::Mode3 => ErrorKind::NoMode3,
        }
    }

    fn not_registered(self) -> ErrorKind {
        match self {
            Self::Mode0 => ErrorKind::NoMode0Decoder,
            Self::Mode1 => ErrorKind::NoMode1Decoder,
            Self::Mode2 => ErrorKind::NoMode2Decoder,
            Self::Mode3 => ErrorKind::NoMode3Decoder,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MODE{}", self.index())
    }
}

/// Decompression half of a mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decompress {
    Identity,
    /// zlib-wrapped deflate (modern runtimes)
    Zlib,
    /// Headerless deflate (legacy runtime)
    Deflate,
}

impl Decompress {
    /// Inflate `stream`, which must produce exactly `decoded` bytes.
    pub fn inflate(self, stream: &[u8], decoded: usize) -> Result<Vec<u8>> {
        // One byte past the declared size is enough to notice an oversized
        // stream without inflating all of it.
        let limit = decoded as u64 + 1;
        let mut out = Vec::with_capacity(decoded.min(MAX_PREALLOC));
        let result = match self {
            Self::Identity => {
                out.extend_from_slice(stream);
                Ok(stream.len())
            }
            Self::Zlib => ZlibDecoder::new(stream).take(limit).read_to_end(&mut out),
            Self::Deflate => DeflateDecoder::new(stream).take(limit).read_to_end(&mut out),
        };
        if let Err(e) = result {
            return Err(Error::with_context(ErrorKind::InflateFailed, e.to_string()));
        }
        if out.len() != decoded {
            return Err(Error::with_context(
                ErrorKind::InflateFailed,
                format!(
                    "expected {} bytes, stream of {} bytes inflated to {}{}",
                    decoded,
                    stream.len(),
                    out.len().min(decoded),
                    if out.len() > decoded { "+" } else { "" }
                ),
            ));
        }
        Ok(out)
    }
}

/// Decryption half of a mode.
#[derive(Debug, Clone)]
pub enum Decrypt {
    Identity,
    Keyed {
        table: Arc<EncryptionTable>,
        /// Odd chunk ids additionally mask the first ciphertext byte.
        chunk_id_xor: bool,
    },
}

impl Decrypt {
    /// Decrypt `data` in place and strip the check byte.
    pub fn apply(&self, data: &mut Vec<u8>, id: u16) -> Result<()> {
        match self {
            Self::Identity => Ok(()),
            Self::Keyed {
                table,
                chunk_id_xor,
            } => {
                if *chunk_id_xor && id & 1 == 1 {
                    if let Some(first) = data.first_mut() {
                        *first ^= chunk_id_mask(id);
                    }
                }
                table.transform(data);
                match data.first() {
                    Some(&check) if check == table.check() => {
                        data.remove(0);
                        Ok(())
                    }
                    Some(&check) => Err(Error::with_context(
                        ErrorKind::DecryptFailed,
                        format!(
                            "key check 0x{:02X}, expected 0x{:02X}",
                            check,
                            table.check()
                        ),
                    )),
                    None => Err(Error::with_context(
                        ErrorKind::DecryptFailed,
                        "empty ciphertext has no key check",
                    )),
                }
            }
        }
    }
}

/// Mask applied to the first ciphertext byte of odd chunk ids.
pub fn chunk_id_mask(id: u16) -> u8 {
    (id as u8) ^ ((id >> 8) as u8)
}

/// A registered decode strategy.
#[derive(Debug, Clone)]
pub struct ModeDecoder {
    mode: Mode,
    decompress: Decompress,
    decrypt: Decrypt,
}

impl ModeDecoder {
    pub fn new(mode: Mode, decompress: Decompress, decrypt: Decrypt) -> Self {
        Self {
            mode,
            decompress,
            decrypt,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Decode a raw body. Pure: the same input always yields the same bytes.
    pub fn decode<'a>(
        &self,
        raw: &'a [u8],
        id: u16,
        expected: Option<u32>,
    ) -> Result<Cow<'a, [u8]>> {
        match self.mode {
            Mode::Mode0 => Ok(Cow::Borrowed(raw)),
            Mode::Mode1 => {
                let mut strm = ByteCursor::new(raw);
                let decoded = match expected {
                    Some(size) => size,
                    None => strm.read_u32().trace("Failed To Read Decoded Size")?,
                };
                let compressed = strm.read_u32().trace("Failed To Read Compressed Size")?;
                let stream = strm
                    .read_bytes(compressed as usize)
                    .trace("Compressed Stream Truncated")?;
                let out = self
                    .decompress
                    .inflate(stream, decoded as usize)
                    .trace("Failed To Inflate MODE1 Body")?;
                Ok(Cow::Owned(out))
            }
            Mode::Mode2 => {
                let mut data = raw.to_vec();
                self.decrypt
                    .apply(&mut data, id)
                    .trace("Failed To Decrypt MODE2 Body")?;
                Ok(Cow::Owned(data))
            }
            Mode::Mode3 => {
                let mut strm = ByteCursor::new(raw);
                let decoded = match expected {
                    Some(size) => size,
                    None => strm.read_u32().trace("Failed To Read Decoded Size")?,
                };
                let mut plain = strm.rest().to_vec();
                self.decrypt
                    .apply(&mut plain, id)
                    .trace("Failed To Decrypt MODE3 Body")?;

                let mut strm = ByteCursor::new(&plain);
                let compressed = match strm.read_u32() {
                    Ok(size) => size as usize,
                    Err(_) => {
                        return Err(Error::with_context(
                            ErrorKind::DecryptFailed,
                            format!("{} byte plaintext has no size field", plain.len()),
                        ))
                    }
                };
                if compressed > strm.remaining() {
                    return Err(Error::with_context(
                        ErrorKind::DecryptFailed,
                        format!(
                            "decrypted size {} exceeds {} remaining bytes",
                            compressed,
                            strm.remaining()
                        ),
                    ));
                }
                let stream = strm.read_bytes(compressed)?;
                let out = self
                    .decompress
                    .inflate(stream, decoded as usize)
                    .trace("Failed To Inflate MODE3 Body")?;
                Ok(Cow::Owned(out))
            }
        }
    }
}

/// Keyed stream transform used by modes 2 and 3.
///
/// The transform is its own inverse. Every encrypted payload starts with
/// [`EncryptionTable::check`], so a table built from the wrong key is
/// caught on the first decode.
#[derive(Clone)]
pub struct EncryptionTable {
    state: [u8; 256],
    check: u8,
}

impl EncryptionTable {
    /// Run the key schedule over `material` followed by `magic`.
    pub fn new(material: &[u8], magic: u8) -> Result<Self> {
        if material.is_empty() {
            return Err(Error::with_context(
                ErrorKind::DecryptFailed,
                "empty key material",
            ));
        }

        let mut state = [0u8; 256];
        for (i, slot) in state.iter_mut().enumerate() {
            *slot = i as u8;
        }

        let key_len = material.len() + 1;
        let mut j: u8 = 0;
        for i in 0..256 {
            let k = i % key_len;
            let key_byte = if k == material.len() { magic } else { material[k] };
            j = j.wrapping_add(state[i]).wrapping_add(key_byte);
            state.swap(i, j as usize);
        }

        Ok(Self {
            state,
            check: key_check(material, magic),
        })
    }

    /// Key-derived checksum leading every plaintext.
    pub fn check(&self) -> u8 {
        self.check
    }

    pub fn transform(&self, data: &mut [u8]) {
        let mut state = self.state;
        let mut i: u8 = 0;
        let mut j: u8 = 0;
        for byte in data.iter_mut() {
            i = i.wrapping_add(1);
            j = j.wrapping_add(state[i as usize]);
            state.swap(i as usize, j as usize);
            let k = state[i as usize].wrapping_add(state[j as usize]);
            *byte ^= state[k as usize];
        }
    }
}

/// Checksum of the key material: each byte is masked with a rotating copy of
/// `magic` and weighted by the mask's low bit.
fn key_check(material: &[u8], magic: u8) -> u8 {
    let mut rot = magic;
    let mut acc = magic;
    for &byte in material {
        rot = rot.rotate_right(1);
        acc = acc.wrapping_add((byte ^ rot).wrapping_mul((rot & 1) + 2));
    }
    acc
}

impl fmt::Debug for EncryptionTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptionTable").finish_non_exhaustive()
    }
}

/// Key schedule magic for a game.
pub fn magic_char(flags: &GameFlags) -> u8 {
    if flags.two_five_plus {
        MAGIC_CHAR_2_5
    } else {
        MAGIC_CHAR
    }
}

/// Build the key material from the game's title, copyright and project path.
pub fn key_material(flags: &GameFlags, title: &str, copyright: &str, project_path: &str) -> Vec<u8> {
    let parts = if flags.two_five_plus {
        [title, copyright, project_path]
    } else {
        [project_path, title, copyright]
    };

    let mut out = Vec::new();
    for part in parts {
        if flags.unicode {
            for unit in part.encode_utf16() {
                out.extend_from_slice(&unit.to_le_bytes());
            }
        } else {
            out.extend(part.chars().map(|c| u8::try_from(c as u32).unwrap_or(b'?')));
        }
    }
    out
}

/// Per-session lookup from mode to decoder.
#[derive(Debug, Clone)]
pub struct ModeRegistry {
    flags: GameFlags,
    decoders: [Option<ModeDecoder>; 4],
}

impl ModeRegistry {
    /// Registry with the keyless modes (0 and 1) for a game.
    pub fn new(flags: GameFlags) -> Self {
        let mut registry = Self {
            flags,
            decoders: Default::default(),
        };
        registry.register(ModeDecoder::new(
            Mode::Mode0,
            Decompress::Identity,
            Decrypt::Identity,
        ));
        let inflate = if flags.old_game {
            Decompress::Deflate
        } else {
            Decompress::Zlib
        };
        registry.register(ModeDecoder::new(Mode::Mode1, inflate, Decrypt::Identity));
        registry
    }

    pub fn flags(&self) -> &GameFlags {
        &self.flags
    }

    /// Register a decoder. Modes compiled out of this build stay empty.
    pub fn register(&mut self, decoder: ModeDecoder) {
        let mode = decoder.mode;
        if mode.compiled() {
            self.decoders[mode.index()] = Some(decoder);
        }
    }

    /// Register the keyed modes (2 and 3) for `material`.
    pub fn install_key(&mut self, material: &[u8]) -> Result<()> {
        let table = Arc::new(EncryptionTable::new(material, magic_char(&self.flags))?);
        let decrypt = Decrypt::Keyed {
            table,
            chunk_id_xor: self.flags.two_five_plus,
        };
        self.register(ModeDecoder::new(
            Mode::Mode2,
            Decompress::Identity,
            decrypt.clone(),
        ));
        self.register(ModeDecoder::new(Mode::Mode3, Decompress::Zlib, decrypt));
        Ok(())
    }

    pub fn has_key(&self) -> bool {
        self.decoders[Mode::Mode2.index()].is_some() || self.decoders[Mode::Mode3.index()].is_some()
    }

    /// Map a header discriminant to a mode for this game.
    pub fn select(&self, discriminant: u16) -> Result<Mode> {
        let mode = match Mode::from_u16(discriminant) {
            Some(mode) => mode,
            None => {
                return Err(Error::with_context(
                    ErrorKind::InvalidMode,
                    format!("mode {}", discriminant),
                ))
            }
        };
        if self.flags.old_game && matches!(mode, Mode::Mode2 | Mode::Mode3) {
            return Err(Error::with_context(
                ErrorKind::InvalidMode,
                format!("{} in a legacy game", mode),
            ));
        }
        Ok(mode)
    }

    pub fn decoder(&self, mode: Mode) -> Result<&ModeDecoder> {
        if !mode.compiled() {
            return Err(Error::new(mode.not_compiled()));
        }
        match &self.decoders[mode.index()] {
            Some(decoder) => Ok(decoder),
            None => Err(Error::new(mode.not_registered())),
        }
    }
}

impl Default for ModeRegistry {
    fn default() -> Self {
        Self::new(GameFlags::default())
    }
}

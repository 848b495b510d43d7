//! Fixture builders shared by the integration tests

#![allow(dead_code)]

use flate2::write::{DeflateEncoder, ZlibEncoder};
use flate2::Compression;
use fusion_archive::mode::{chunk_id_mask, key_material, magic_char, EncryptionTable};
use fusion_archive::GameFlags;
use std::io::Write;

pub const PACK_MAGIC: [u8; 8] = [0x77, 0x77, 0x77, 0x77, 0x49, 0x87, 0x47, 0x12];

/// Offset of the game data in executables built by [`exe`].
pub const EXE_DATA_START: usize = 0x200;

pub fn zlib(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

pub fn deflate(data: &[u8]) -> Vec<u8> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// `decoded u32, compressed u32, stream`
pub fn mode1(plain: &[u8]) -> Vec<u8> {
    sized_stream(plain, &zlib(plain))
}

/// Mode 1 body for the legacy runtime (raw deflate).
pub fn mode1_legacy(plain: &[u8]) -> Vec<u8> {
    sized_stream(plain, &deflate(plain))
}

pub fn sized_stream(plain: &[u8], stream: &[u8]) -> Vec<u8> {
    let mut out = (plain.len() as u32).to_le_bytes().to_vec();
    out.extend_from_slice(&(stream.len() as u32).to_le_bytes());
    out.extend_from_slice(stream);
    out
}

/// Mode 3 body encrypted under `material`.
pub fn mode3(flags: &GameFlags, material: &[u8], id: u16, plain: &[u8]) -> Vec<u8> {
    let stream = zlib(plain);
    let mut inner = (stream.len() as u32).to_le_bytes().to_vec();
    inner.extend_from_slice(&stream);
    let mut out = (plain.len() as u32).to_le_bytes().to_vec();
    out.extend_from_slice(&mode2(flags, material, id, &inner));
    out
}

/// Mode 2 body encrypted under `material`: key check byte, then `plain`.
pub fn mode2(flags: &GameFlags, material: &[u8], id: u16, plain: &[u8]) -> Vec<u8> {
    let table = EncryptionTable::new(material, magic_char(flags)).unwrap();
    let mut out = vec![table.check()];
    out.extend_from_slice(plain);
    table.transform(&mut out);
    if flags.two_five_plus && id & 1 == 1 {
        out[0] ^= chunk_id_mask(id);
    }
    out
}

pub fn chunk(id: u16, mode: u16, body: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&id.to_le_bytes());
    out.extend_from_slice(&mode.to_le_bytes());
    out.extend_from_slice(&(body.len() as u32).to_le_bytes());
    out.extend_from_slice(body);
    out
}

/// NUL-terminated string in the game's encoding.
pub fn string(text: &str, unicode: bool) -> Vec<u8> {
    if unicode {
        format!("{}\0", text)
            .encode_utf16()
            .flat_map(|u| u.to_le_bytes())
            .collect()
    } else {
        let mut out = text.as_bytes().to_vec();
        out.push(0);
        out
    }
}

/// Count-prefixed bank body.
pub fn bank_body(records: &[Vec<u8>]) -> Vec<u8> {
    let mut out = (records.len() as u32).to_le_bytes().to_vec();
    for record in records {
        out.extend_from_slice(record);
    }
    out
}

pub fn image_record(handle: u32, width: u16, height: u16, pixels: &[u8]) -> Vec<u8> {
    let mut plain = Vec::new();
    plain.extend_from_slice(&0u32.to_le_bytes());
    plain.extend_from_slice(&1u32.to_le_bytes());
    plain.extend_from_slice(&(pixels.len() as u32).to_le_bytes());
    plain.extend_from_slice(&width.to_le_bytes());
    plain.extend_from_slice(&height.to_le_bytes());
    plain.extend_from_slice(&[0u8; 20]);
    plain.extend_from_slice(pixels);

    let mut record = handle.to_le_bytes().to_vec();
    record.extend_from_slice(&mode1(&plain));
    record
}

/// Modern sound record. `name_length` overrides the real name length.
pub fn sound_record(
    handle: u32,
    name: &str,
    data: &[u8],
    uncompressed: bool,
    name_length: Option<u32>,
) -> Vec<u8> {
    let mut plain = string(name, true);
    let length = name_length.unwrap_or(name.encode_utf16().count() as u32 + 1);
    plain.extend_from_slice(data);

    let flags = if uncompressed { 0x20u32 } else { 0 };
    let mut record = handle.to_le_bytes().to_vec();
    for word in [0u32, 1, plain.len() as u32, flags, 0, length] {
        record.extend_from_slice(&word.to_le_bytes());
    }
    if uncompressed {
        record.extend_from_slice(&plain);
    } else {
        let stream = zlib(&plain);
        record.extend_from_slice(&(stream.len() as u32).to_le_bytes());
        record.extend_from_slice(&stream);
    }
    record
}

pub fn object_record(handle: u16, name: &str, unicode: bool) -> Vec<u8> {
    let mut header = handle.to_le_bytes().to_vec();
    header.extend_from_slice(&[0u8; 14]);
    let mut out = chunk(0x4444, 0, &header);
    out.extend_from_slice(&chunk(0x4445, 0, &string(name, unicode)));
    out.extend_from_slice(&chunk(0x7F7F, 0, &[]));
    out
}

/// Game magic plus fixed header.
pub fn game_header(unicode: bool, runtime_version: u16, build: u32) -> Vec<u8> {
    let mut out = if unicode { b"PAMU".to_vec() } else { b"PAME".to_vec() };
    out.extend_from_slice(&runtime_version.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&0x0300u32.to_le_bytes());
    out.extend_from_slice(&build.to_le_bytes());
    out
}

pub fn pack(files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut out = PACK_MAGIC.to_vec();
    for word in [32u32, 0, 1, 0, 0, files.len() as u32] {
        out.extend_from_slice(&word.to_le_bytes());
    }
    for (name, data) in files {
        let units: Vec<u16> = name.encode_utf16().collect();
        out.extend_from_slice(&(units.len() as u16).to_le_bytes());
        for unit in units {
            out.extend_from_slice(&unit.to_le_bytes());
        }
        out.extend_from_slice(&(data.len() as u32).to_le_bytes());
        out.extend_from_slice(data);
    }
    out
}

/// Minimal PE executable whose single section ends at [`EXE_DATA_START`],
/// followed by `payload`.
pub fn exe(payload: &[u8]) -> Vec<u8> {
    let mut out = vec![0u8; 0x80];
    out[..2].copy_from_slice(b"MZ");
    out[0x3C..0x40].copy_from_slice(&0x80u32.to_le_bytes());
    out.extend_from_slice(b"PE\0\0");
    let mut coff = [0u8; 20];
    coff[2..4].copy_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&coff);
    let mut section = [0u8; 40];
    section[..5].copy_from_slice(b".text");
    section[16..20].copy_from_slice(&0x100u32.to_le_bytes());
    section[20..24].copy_from_slice(&0x100u32.to_le_bytes());
    out.extend_from_slice(&section);
    out.resize(EXE_DATA_START, 0xCC);
    out.extend_from_slice(payload);
    out
}

/// Builder for a whole archive.
pub struct GameBuilder {
    pub unicode: bool,
    pub runtime_version: u16,
    pub build: u32,
    pub ccn: bool,
    pub pack: Vec<(String, Vec<u8>)>,
    pub chunks: Vec<u8>,
}

impl GameBuilder {
    /// Modern (2.5+) unicode game in an executable.
    pub fn new() -> Self {
        Self {
            unicode: true,
            runtime_version: 0x0302,
            build: 295,
            ccn: false,
            pack: Vec::new(),
            chunks: Vec::new(),
        }
    }

    pub fn legacy() -> Self {
        Self {
            unicode: false,
            runtime_version: 0x0207,
            build: 0,
            ..Self::new()
        }
    }

    pub fn ccn(mut self) -> Self {
        self.ccn = true;
        self
    }

    pub fn flags(&self) -> GameFlags {
        let old_game = self.runtime_version == 0x0207;
        GameFlags {
            old_game,
            ccn: self.ccn,
            two_five_plus: !old_game && self.build > 284,
            unicode: self.unicode,
        }
    }

    /// Key material for the given strings under this builder's flags.
    pub fn key(&self, title: &str, copyright: &str, project_path: &str) -> Vec<u8> {
        key_material(&self.flags(), title, copyright, project_path)
    }

    pub fn pack_file(mut self, name: &str, data: &[u8]) -> Self {
        self.pack.push((name.to_string(), data.to_vec()));
        self
    }

    pub fn chunk(mut self, id: u16, mode: u16, body: &[u8]) -> Self {
        self.chunks.extend_from_slice(&chunk(id, mode, body));
        self
    }

    pub fn text(self, id: u16, text: &str) -> Self {
        let body = string(text, self.unicode);
        self.chunk(id, 0, &body)
    }

    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.chunks.extend_from_slice(bytes);
        self
    }

    /// Archive without a terminator chunk.
    pub fn build_unterminated(&self) -> Vec<u8> {
        let mut game = Vec::new();
        if !self.pack.is_empty() {
            let files: Vec<(&str, &[u8])> = self
                .pack
                .iter()
                .map(|(name, data)| (name.as_str(), data.as_slice()))
                .collect();
            game.extend_from_slice(&pack(&files));
        }
        game.extend_from_slice(&game_header(self.unicode, self.runtime_version, self.build));
        game.extend_from_slice(&self.chunks);
        if self.ccn {
            game
        } else {
            exe(&game)
        }
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = self.build_unterminated();
        out.extend_from_slice(&chunk(0x7F7F, 0, &[]));
        out
    }
}

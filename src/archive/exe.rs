//! Container validation: executable wrapper, pack section and game header

use tracing::debug;

use crate::cursor::ByteCursor;
use crate::error::{Error, ErrorKind, Result, ResultExt};
use crate::game::{GameHeader, PackFile};
use crate::trace;

pub const EXE_SIGNATURE: [u8; 2] = *b"MZ";
pub const PE_SIGNATURE: [u8; 4] = *b"PE\0\0";
pub const PACK_MAGIC: [u8; 8] = [0x77, 0x77, 0x77, 0x77, 0x49, 0x87, 0x47, 0x12];
pub const GAME_MAGIC_ANSI: [u8; 4] = *b"PAME";
pub const GAME_MAGIC_UNICODE: [u8; 4] = *b"PAMU";

/// Offset of `e_lfanew` in the DOS header.
pub const PE_OFFSET_FIELD: usize = 0x3C;

/// Bytes per section table entry.
pub const SECTION_ENTRY_SIZE: usize = 40;

pub const MAX_PACK_COUNT: u32 = 0x1000;

/// Where the game data starts and what preceded it.
#[derive(Debug, Clone, Default)]
pub struct Container {
    pub ccn: bool,
    pub pack_files: Vec<PackFile>,
}

fn is_game_magic(bytes: &[u8]) -> bool {
    bytes.starts_with(&GAME_MAGIC_ANSI) || bytes.starts_with(&GAME_MAGIC_UNICODE)
}

/// Validate the container and leave `strm` at the game header.
pub fn locate(strm: &mut ByteCursor<'_>) -> Result<Container> {
    if is_game_magic(strm.rest()) {
        debug!("{}Standalone archive", trace::indent());
        return Ok(Container {
            ccn: true,
            pack_files: Vec::new(),
        });
    }

    let data_start = read_pe(strm).trace("Failed To Read Executable")?;
    strm.seek(data_start)
        .trace("Game Data Starts Past End Of File")?;
    debug!("{}Game data at 0x{:X}", trace::indent(), data_start);

    let rest = strm.rest();
    let pack_files = if is_game_magic(rest) {
        Vec::new()
    } else if rest.starts_with(&PACK_MAGIC) {
        read_pack(strm).trace("Failed To Read Pack")?
    } else {
        let shown = &rest[..rest.len().min(8)];
        return Err(Error::with_context(
            ErrorKind::InvalidGameSignature,
            format!("0x{}", hex::encode_upper(shown)),
        ));
    };

    Ok(Container {
        ccn: false,
        pack_files,
    })
}

/// Walk the PE headers and return the end of the last section.
pub fn read_pe(strm: &mut ByteCursor<'_>) -> Result<usize> {
    let signature = match strm.read_array::<2>() {
        Ok(bytes) => bytes,
        Err(_) => {
            return Err(Error::with_context(
                ErrorKind::InvalidExeSignature,
                format!("{} byte file", strm.size()),
            ))
        }
    };
    if signature != EXE_SIGNATURE {
        return Err(Error::with_context(
            ErrorKind::InvalidExeSignature,
            format!("0x{}", hex::encode_upper(signature)),
        ));
    }

    strm.seek(PE_OFFSET_FIELD)?;
    let pe_offset = strm.read_u32().trace("Failed To Read PE Offset")? as usize;
    strm.seek(pe_offset).trace("PE Offset Past End Of File")?;

    let pe_signature = strm.read_array::<4>().map_err(|_| {
        Error::with_context(ErrorKind::InvalidPeSignature, "truncated PE header")
    })?;
    if pe_signature != PE_SIGNATURE {
        return Err(Error::with_context(
            ErrorKind::InvalidPeSignature,
            format!("0x{} at 0x{:X}", hex::encode_upper(pe_signature), pe_offset),
        ));
    }

    // COFF header: machine u16, sections u16, ..., optional header size u16
    let mut coff = strm.subspan(20).trace("Failed To Read COFF Header")?;
    coff.skip(2)?;
    let section_count = coff.read_u16()? as usize;
    coff.seek(16)?;
    let optional_size = coff.read_u16()? as usize;

    strm.skip(optional_size)
        .trace("Failed To Skip Optional Header")?;

    let mut data_start = 0usize;
    for i in 0..section_count {
        let mut section = strm
            .subspan(SECTION_ENTRY_SIZE)
            .trace_with(|| format!("Failed To Read Section {} Of {}", i, section_count))?;
        section.seek(16)?;
        let raw_size = section.read_u32()? as usize;
        let raw_ptr = section.read_u32()? as usize;
        data_start = data_start.max(raw_ptr.saturating_add(raw_size));
    }
    Ok(data_start)
}

/// Read the pack header and bundled files.
pub fn read_pack(strm: &mut ByteCursor<'_>) -> Result<Vec<PackFile>> {
    strm.skip(PACK_MAGIC.len())?;
    let header_size = strm.read_u32()?;
    let data_size = strm.read_u32()?;
    let format_version = strm.read_u32()?;
    strm.skip(8)?;
    let count = strm.read_u32().trace("Failed To Read Pack Count")?;
    debug!(
        "{}Pack: header {} bytes, data {} bytes, version {}, {} files",
        trace::indent(),
        header_size,
        data_size,
        format_version,
        count
    );

    if count == 0 || count > MAX_PACK_COUNT {
        return Err(Error::with_context(
            ErrorKind::InvalidPackCount,
            format!("{} files", count),
        ));
    }

    let _nest = trace::nest();
    let mut files = Vec::with_capacity(count as usize);
    for i in 0..count {
        let file = read_pack_file(strm)
            .trace_with(|| format!("Failed To Read Pack File {} Of {}", i, count))?;
        debug!("{}{} ({} bytes)", trace::indent(), file.name, file.data.len());
        files.push(file);
    }
    Ok(files)
}

fn read_pack_file(strm: &mut ByteCursor<'_>) -> Result<PackFile> {
    let name_len = strm.read_u16()? as usize;
    let name = strm.read_string_len(name_len, true)?;
    let size = strm.read_u32()? as usize;
    let offset = strm.absolute_position();
    let data = strm.read_bytes(size)?.to_vec();
    Ok(PackFile { name, offset, data })
}

/// Read the game magic and fixed header. Returns the header and whether
/// the game is unicode.
pub fn read_game_header(strm: &mut ByteCursor<'_>) -> Result<(GameHeader, bool)> {
    let magic = strm.read_array::<4>().map_err(|_| {
        Error::with_context(ErrorKind::InvalidGameSignature, "truncated game header")
    })?;
    let unicode = match magic {
        GAME_MAGIC_ANSI => false,
        GAME_MAGIC_UNICODE => true,
        other => {
            return Err(Error::with_context(
                ErrorKind::InvalidGameSignature,
                format!("0x{}", hex::encode_upper(other)),
            ))
        }
    };

    let header = GameHeader {
        runtime_version: strm.read_u16()?,
        runtime_sub_version: strm.read_u16()?,
        product_version: strm.read_u32()?,
        product_build: strm.read_u32()?,
    };
    Ok((header, unicode))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pe(sections: &[(u32, u32)], tail: &[u8]) -> Vec<u8> {
        let mut out = vec![0u8; 0x80];
        out[..2].copy_from_slice(b"MZ");
        out[0x3C..0x40].copy_from_slice(&0x80u32.to_le_bytes());
        out.extend_from_slice(b"PE\0\0");
        let mut coff = [0u8; 20];
        coff[2..4].copy_from_slice(&(sections.len() as u16).to_le_bytes());
        coff[16..18].copy_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&coff);
        for (size, ptr) in sections {
            let mut entry = [0u8; SECTION_ENTRY_SIZE];
            entry[16..20].copy_from_slice(&size.to_le_bytes());
            entry[20..24].copy_from_slice(&ptr.to_le_bytes());
            out.extend_from_slice(&entry);
        }
        out.extend_from_slice(tail);
        out
    }

    #[test]
    fn test_pe_data_start_is_end_of_last_section() {
        let data = pe(&[(0x10, 0x100), (0x40, 0x120), (0x08, 0x110)], &[]);
        let mut strm = ByteCursor::new(&data);
        assert_eq!(read_pe(&mut strm).unwrap(), 0x160);
    }

    #[test]
    fn test_bad_exe_signature() {
        let mut data = pe(&[], &[]);
        data[0] = b'Z';
        let err = read_pe(&mut ByteCursor::new(&data)).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::InvalidExeSignature);
        assert!(err.mentions("0x5A5A"));
    }

    #[test]
    fn test_bad_pe_signature() {
        let mut data = pe(&[], &[]);
        data[0x81] = b'X';
        let err = read_pe(&mut ByteCursor::new(&data)).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::InvalidPeSignature);
    }

    #[test]
    fn test_standalone_archive() {
        let data = b"PAMU\x02\x03\x00\x00".to_vec();
        let mut strm = ByteCursor::new(&data);
        let container = locate(&mut strm).unwrap();
        assert!(container.ccn);
        assert_eq!(strm.position(), 0);
    }

    #[test]
    fn test_unknown_data_after_sections() {
        // PE header at 0x80, COFF to 0x98, one section entry to 0xC0.
        let data = pe(&[(0, 0xC0)], b"JUNK");
        let err = locate(&mut ByteCursor::new(&data)).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::InvalidGameSignature);
        assert!(err.mentions("0x4A554E4B"));
    }

    #[test]
    fn test_pack_count_bounds() {
        for count in [0u32, MAX_PACK_COUNT + 1] {
            let mut data = PACK_MAGIC.to_vec();
            for word in [32u32, 0, 1, 0, 0, count] {
                data.extend_from_slice(&word.to_le_bytes());
            }
            let err = read_pack(&mut ByteCursor::new(&data)).unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::InvalidPackCount);
        }
    }

    #[test]
    fn test_pack_files() {
        let mut data = PACK_MAGIC.to_vec();
        for word in [32u32, 0, 1, 0, 0, 1] {
            data.extend_from_slice(&word.to_le_bytes());
        }
        let name: Vec<u8> = "ext.mfx".encode_utf16().flat_map(|u| u.to_le_bytes()).collect();
        data.extend_from_slice(&7u16.to_le_bytes());
        data.extend_from_slice(&name);
        data.extend_from_slice(&3u32.to_le_bytes());
        data.extend_from_slice(b"abc");

        let files = read_pack(&mut ByteCursor::new(&data)).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "ext.mfx");
        assert_eq!(files[0].data, b"abc");
        assert_eq!(files[0].offset, data.len() - 3);
    }

    #[test]
    fn test_game_header() {
        let mut data = b"PAME".to_vec();
        data.extend_from_slice(&0x0302u16.to_le_bytes());
        data.extend_from_slice(&0u16.to_le_bytes());
        data.extend_from_slice(&0x0300u32.to_le_bytes());
        data.extend_from_slice(&295u32.to_le_bytes());

        let (header, unicode) = read_game_header(&mut ByteCursor::new(&data)).unwrap();
        assert!(!unicode);
        assert_eq!(header.runtime_version, 0x0302);
        assert_eq!(header.product_build, 295);

        let err = read_game_header(&mut ByteCursor::new(b"PAMX")).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::InvalidGameSignature);
    }
}

use crate::error::{Error, Result};

/// Bounds-checked read cursor over a borrowed byte slice. All reads are
/// little-endian.
///
/// A failed read never moves the cursor.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
    base: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            base: 0,
        }
    }

    /// Cursor over data that originally sat at `base` in a larger buffer.
    pub fn with_base(data: &'a [u8], base: usize) -> Self {
        Self { data, pos: 0, base }
    }

    /// Current byte position.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Position within the outermost buffer this cursor was carved from.
    pub fn absolute_position(&self) -> usize {
        self.base + self.pos
    }

    /// Total length of the underlying data.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Remaining bytes from current position.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Seek to an absolute position within this cursor.
    #[track_caller]
    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(Error::out_of_data(pos, self.data.len()));
        }
        self.pos = pos;
        Ok(())
    }

    #[track_caller]
    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.ensure(n)?;
        self.pos += n;
        Ok(())
    }

    /// Unread tail, without advancing.
    pub fn rest(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    /// Read a slice of `n` bytes without copying.
    #[track_caller]
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        self.ensure(n)?;
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    /// Carve an independent cursor over the next `len` bytes and step past
    /// them.
    #[track_caller]
    pub fn subspan(&mut self, len: usize) -> Result<ByteCursor<'a>> {
        let base = self.absolute_position();
        let data = self.read_bytes(len)?;
        Ok(ByteCursor { data, pos: 0, base })
    }

    #[track_caller]
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let bytes = self.read_bytes(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    #[track_caller]
    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    #[track_caller]
    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    #[track_caller]
    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(i16::from_le_bytes(self.read_array()?))
    }

    #[track_caller]
    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    #[track_caller]
    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(i32::from_le_bytes(self.read_array()?))
    }

    #[track_caller]
    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    /// Look at the next u16 without consuming it.
    #[track_caller]
    pub fn peek_u16(&self) -> Result<u16> {
        self.ensure(2)?;
        Ok(u16::from_le_bytes([
            self.data[self.pos],
            self.data[self.pos + 1],
        ]))
    }

    /// Read a NUL-terminated string. Unicode strings are UTF-16LE, others
    /// are Latin-1. A missing terminator ends the string at end of data.
    pub fn read_string(&mut self, unicode: bool) -> Result<String> {
        let mut out = String::new();
        if unicode {
            let mut units = Vec::new();
            while self.remaining() >= 2 {
                let unit = self.read_u16()?;
                if unit == 0 {
                    break;
                }
                units.push(unit);
            }
            out.extend(char::decode_utf16(units).map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER)));
        } else {
            while !self.empty() {
                let byte = self.read_u8()?;
                if byte == 0 {
                    break;
                }
                out.push(byte as char);
            }
        }
        Ok(out)
    }

    /// Read exactly `len` characters (no terminator).
    #[track_caller]
    pub fn read_string_len(&mut self, len: usize, unicode: bool) -> Result<String> {
        if unicode {
            let byte_len = match len.checked_mul(2) {
                Some(n) => n,
                None => return Err(Error::out_of_data(usize::MAX, self.remaining())),
            };
            let bytes = self.read_bytes(byte_len)?;
            let units = bytes
                .chunks_exact(2)
                .map(|pair| u16::from_le_bytes([pair[0], pair[1]]));
            Ok(char::decode_utf16(units)
                .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
                .collect())
        } else {
            let bytes = self.read_bytes(len)?;
            Ok(bytes.iter().map(|&b| b as char).collect())
        }
    }

    #[track_caller]
    fn ensure(&self, n: usize) -> Result<()> {
        if n > self.remaining() {
            return Err(Error::out_of_data(n, self.remaining()));
        }
        Ok(())
    }
}

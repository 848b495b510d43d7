use std::borrow::Cow;
use std::ops::Range;

use crate::cursor::ByteCursor;
use crate::error::{Error, ErrorKind, Result, ResultExt};
use crate::game::Game;
use crate::mode::{Mode, ModeRegistry};

/// Size of a chunk header: id u16, mode u16, size u32.
pub const CHUNK_HEADER_SIZE: usize = 8;

/// Raw, undecoded record of one chunk or bank item.
///
/// Reading copies bytes out of the stream and never decodes them; decoding
/// happens on demand through [`ChunkEntry::decode_head`] and
/// [`ChunkEntry::decode_body`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkEntry {
    pub id: u16,
    pub mode: Mode,
    /// Offset of the record. Absolute in the archive buffer for chunks and
    /// for items of a mode 0 bank; relative to the decoded bank body for
    /// items of a compressed or encrypted bank.
    pub position: usize,
    pub handle: Option<u32>,
    pub raw_head: Vec<u8>,
    pub raw_body: Vec<u8>,
    /// Byte range the whole record occupies, in the same frame as `position`.
    pub ref_span: Range<usize>,
    /// Decoded size declared by an item header, if any.
    pub expected_size: Option<u32>,
    /// Length of a header stored inside the encoded body.
    pub head_in_body: usize,
    /// Strings in this record are UTF-16LE.
    pub unicode: bool,
}

impl ChunkEntry {
    /// Forget everything read so far and take the string encoding from
    /// the session.
    pub fn read_init(&mut self, game: &Game) {
        *self = Self {
            unicode: game.unicode(),
            ..Self::default()
        };
    }

    /// Record the position, optional handle and `header_size` raw header
    /// bytes. Nothing is consumed unless the whole window fits.
    ///
    /// A window of [`CHUNK_HEADER_SIZE`] bytes without a handle is a chunk
    /// header: its id and mode are taken from it and its declared size must
    /// fit the rest of the stream.
    #[track_caller]
    pub fn read_head(
        &mut self,
        game: &Game,
        strm: &mut ByteCursor<'_>,
        header_size: usize,
        has_handle: bool,
    ) -> Result<()> {
        let mut window = strm.clone();
        self.position = window.absolute_position();
        if has_handle {
            self.handle = Some(window.read_u32().trace("Failed To Read Handle")?);
        }
        self.raw_head = window
            .read_bytes(header_size)
            .trace("Failed To Read Header")?
            .to_vec();

        if !has_handle && header_size == CHUNK_HEADER_SIZE {
            let mut head = ByteCursor::new(&self.raw_head);
            self.id = head.read_u16()?;
            let mode = head.read_u16()?;
            let size = head.read_u32()? as usize;

            let id = self.id;
            self.mode = game
                .modes()
                .select(mode)
                .trace_context("Invalid Chunk Mode", || format!("chunk 0x{:04X}", id))?;
            if size > window.remaining() {
                let err = Error::out_of_data(size, window.remaining());
                return Err(err).trace_context("Chunk Body Does Not Fit", || {
                    format!("chunk 0x{:04X} at 0x{:X}", id, self.position)
                });
            }
        }

        *strm = window;
        self.ref_span = self.position..strm.absolute_position();
        Ok(())
    }

    /// Copy the raw body.
    ///
    /// | compressed | expected size | body length                  |
    /// |------------|---------------|------------------------------|
    /// | yes        | none          | `8 + compressed` (both sizes)|
    /// | yes        | some          | `4 + compressed`             |
    /// | no         | some(n)       | `n`                          |
    /// | no         | none          | consumed u32 prefix          |
    pub fn read_body(
        &mut self,
        game: &Game,
        strm: &mut ByteCursor<'_>,
        compressed: bool,
        expected_size: Option<u32>,
    ) -> Result<()> {
        self.mode = game
            .modes()
            .select(compressed as u16)
            .trace("Failed To Select Body Mode")?;
        self.expected_size = expected_size;

        let len = match (compressed, expected_size) {
            (true, None) => {
                let mut peek = strm.clone();
                peek.skip(4).trace("Failed To Read Decoded Size")?;
                let stream = peek.read_u32().trace("Failed To Read Compressed Size")?;
                8 + stream as usize
            }
            (true, Some(_)) => {
                let mut peek = strm.clone();
                let stream = peek.read_u32().trace("Failed To Read Compressed Size")?;
                4 + stream as usize
            }
            (false, Some(size)) => size as usize,
            (false, None) => strm.read_u32().trace("Failed To Read Body Size")? as usize,
        };

        self.raw_body = strm
            .read_bytes(len)
            .trace_context("Body Truncated", || {
                format!("{} bytes at 0x{:X}", len, strm.absolute_position())
            })?
            .to_vec();
        self.ref_span = self.position..strm.absolute_position();
        Ok(())
    }

    /// Read a whole chunk: 8-byte header window then `size` body bytes.
    pub fn read(&mut self, game: &Game, strm: &mut ByteCursor<'_>) -> Result<()> {
        self.read_init(game);
        self.read_head(game, strm, CHUNK_HEADER_SIZE, false)
            .trace("Failed To Read Chunk Header")?;

        let size = ByteCursor::new(&self.raw_head[4..]).read_u32()? as usize;
        self.raw_body = strm.read_bytes(size)?.to_vec();
        self.ref_span = self.position..strm.absolute_position();
        Ok(())
    }

    pub fn set_ref_span(&mut self, span: Range<usize>) {
        self.ref_span = span;
    }

    /// Decode the full body, header prefix included.
    fn decode(&self, modes: &ModeRegistry) -> Result<Cow<'_, [u8]>> {
        let decoder = modes.decoder(self.mode)?;
        decoder
            .decode(&self.raw_body, self.id, self.expected_size)
            .trace_context("Failed To Decode Body", || {
                format!("0x{:04X} {} at 0x{:X}", self.id, self.mode, self.position)
            })
    }

    /// Header bytes: `raw_head`, or the decoded prefix for kinds that keep
    /// their header inside the encoded body.
    pub fn decode_head(&self, modes: &ModeRegistry) -> Result<Cow<'_, [u8]>> {
        if self.head_in_body == 0 {
            return Ok(Cow::Borrowed(&self.raw_head));
        }
        let body = self.decode(modes)?;
        if body.len() < self.head_in_body {
            return Err(Error::out_of_data(self.head_in_body, body.len()))
                .trace("Decoded Body Shorter Than Header");
        }
        Ok(match body {
            Cow::Borrowed(bytes) => Cow::Borrowed(&bytes[..self.head_in_body]),
            Cow::Owned(mut bytes) => {
                bytes.truncate(self.head_in_body);
                Cow::Owned(bytes)
            }
        })
    }

    /// Offset of the first raw body byte, in the same frame as `position`.
    pub fn body_position(&self) -> usize {
        self.ref_span.end - self.raw_body.len()
    }

    /// Decoded body with any in-body header stripped.
    ///
    /// Mode 0 plaintext is the raw body itself, so its cursor reports
    /// positions in the frame of `position`. Any other mode produces fresh
    /// bytes and its cursor positions are relative to the decoded body.
    pub fn decode_body(&self, modes: &ModeRegistry) -> Result<Decoded<'_>> {
        let data = self.decode(modes)?;
        if data.len() < self.head_in_body {
            return Err(Error::with_context(
                ErrorKind::OutOfData {
                    requested: self.head_in_body,
                    remaining: data.len(),
                },
                "decoded body shorter than its header",
            ));
        }
        let base = match data {
            Cow::Borrowed(_) => Some(self.body_position() + self.head_in_body),
            Cow::Owned(_) => None,
        };
        Ok(Decoded {
            data,
            offset: self.head_in_body,
            base,
        })
    }
}

/// Plaintext of a decoded body. Borrows the raw body for mode 0.
#[derive(Debug, Clone)]
pub struct Decoded<'a> {
    data: Cow<'a, [u8]>,
    offset: usize,
    base: Option<usize>,
}

impl Decoded<'_> {
    pub fn as_bytes(&self) -> &[u8] {
        &self.data[self.offset..]
    }

    pub fn len(&self) -> usize {
        self.data.len() - self.offset
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_borrowed(&self) -> bool {
        matches!(self.data, Cow::Borrowed(_))
    }

    /// Whether cursor positions map back onto the source stream. False
    /// when the plaintext was inflated or decrypted.
    pub fn is_absolute(&self) -> bool {
        self.base.is_some()
    }

    /// Fresh cursor over the plaintext.
    pub fn cursor(&self) -> ByteCursor<'_> {
        ByteCursor::with_base(self.as_bytes(), self.base.unwrap_or(0))
    }

    pub fn into_owned(self) -> Vec<u8> {
        match self.data {
            Cow::Borrowed(bytes) => bytes[self.offset..].to_vec(),
            Cow::Owned(mut bytes) => {
                bytes.drain(..self.offset);
                bytes
            }
        }
    }
}

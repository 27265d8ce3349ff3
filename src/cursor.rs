use crate::{AseError, Result};
use byteorder::{BigEndian, ByteOrder, LittleEndian, WriteBytesExt};

/// Bounded, forward-only reader over a byte buffer.
///
/// All multi-byte reads are little-endian, matching the file format. `base`
/// is the absolute file offset of `buf[0]`, so a cursor scoped to a chunk
/// payload still reports file offsets in its errors.
pub(crate) struct ByteCursor<'a> {
    buf: &'a [u8],
    pos: usize,
    base: usize,
}

impl<'a> ByteCursor<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> ByteCursor<'a> {
        ByteCursor { buf, pos: 0, base: 0 }
    }

    /// A cursor over `buf` that reports offsets as if `buf[0]` sat at
    /// absolute offset `base`.
    pub(crate) fn with_base(buf: &'a [u8], base: usize) -> ByteCursor<'a> {
        ByteCursor { buf, pos: 0, base }
    }

    /// Absolute offset of the next read.
    pub(crate) fn pos(&self) -> usize {
        self.base + self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.buf.len() - self.pos {
            return Err(AseError::OutOfBounds {
                offset: self.base + self.pos,
                needed: n,
            });
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub(crate) fn byte(&mut self) -> Result<u8> {
        self.take(1).map(|b| b[0])
    }

    pub(crate) fn word(&mut self) -> Result<u16> {
        self.take(2).map(LittleEndian::read_u16)
    }

    pub(crate) fn short(&mut self) -> Result<i16> {
        self.take(2).map(LittleEndian::read_i16)
    }

    pub(crate) fn dword(&mut self) -> Result<u32> {
        self.take(4).map(LittleEndian::read_u32)
    }

    /// A length-prefixed UTF-8 string: u16 length followed by that many
    /// bytes. Invalid UTF-8 is replaced, not rejected.
    pub(crate) fn string(&mut self) -> Result<String> {
        let len = self.word()? as usize;
        let bytes = self.take(len)?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    pub(crate) fn skip_reserved(&mut self, count: usize) -> Result<()> {
        self.take(count).map(|_| ())
    }

    /// A borrowed view of the next `count` bytes.
    pub(crate) fn slice(&mut self, count: usize) -> Result<&'a [u8]> {
        self.take(count)
    }

    /// Everything between the current position and the cursor's bound.
    pub(crate) fn rest(&mut self) -> &'a [u8] {
        let slice = &self.buf[self.pos..];
        self.pos = self.buf.len();
        slice
    }
}

/// Growing little-endian writer, the encoder-side mirror of [ByteCursor].
///
/// Appending to a `Vec` cannot fail, but the methods still return `Result`
/// so encoder code chains with `?` the same way decoder code does.
#[derive(Default)]
pub(crate) struct ByteWriter {
    buf: Vec<u8>,
    bit_acc: u32,
    bit_len: u32,
}

impl ByteWriter {
    pub(crate) fn new() -> ByteWriter {
        ByteWriter::default()
    }

    pub(crate) fn byte(&mut self, value: u8) -> Result<()> {
        self.buf.write_u8(value)?;
        Ok(())
    }

    pub(crate) fn word(&mut self, value: u16) -> Result<()> {
        self.buf.write_u16::<LittleEndian>(value)?;
        Ok(())
    }

    pub(crate) fn short(&mut self, value: i16) -> Result<()> {
        self.buf.write_i16::<LittleEndian>(value)?;
        Ok(())
    }

    pub(crate) fn dword(&mut self, value: u32) -> Result<()> {
        self.buf.write_u32::<LittleEndian>(value)?;
        Ok(())
    }

    /// Big-endian u16, for embedded data that does not share the
    /// container's byte order.
    #[allow(dead_code)]
    pub(crate) fn word_be(&mut self, value: u16) -> Result<()> {
        self.buf.write_u16::<BigEndian>(value)?;
        Ok(())
    }

    /// Big-endian u32. See [word_be](ByteWriter::word_be).
    #[allow(dead_code)]
    pub(crate) fn dword_be(&mut self, value: u32) -> Result<()> {
        self.buf.write_u32::<BigEndian>(value)?;
        Ok(())
    }

    pub(crate) fn bytes(&mut self, data: &[u8]) -> Result<()> {
        self.buf.extend_from_slice(data);
        Ok(())
    }

    pub(crate) fn zeros(&mut self, count: usize) -> Result<()> {
        self.buf.resize(self.buf.len() + count, 0);
        Ok(())
    }

    /// Length-prefixed UTF-8 string, the inverse of [ByteCursor::string].
    pub(crate) fn string(&mut self, s: &str) -> Result<()> {
        debug_assert!(s.len() <= u16::MAX as usize);
        self.word(s.len() as u16)?;
        self.bytes(s.as_bytes())
    }

    /// Pack the low `count` bits of `value` into the stream, least
    /// significant bit first, the order sub-byte indexed pixel data uses.
    /// Bits accumulate across calls; full bytes are emitted as they fill.
    /// End a packed run with [flush_bits](ByteWriter::flush_bits).
    #[allow(dead_code)]
    pub(crate) fn bits(&mut self, value: u8, count: u32) -> Result<()> {
        debug_assert!(count <= 8);
        self.bit_acc |= (value as u32 & ((1 << count) - 1)) << self.bit_len;
        self.bit_len += count;
        while self.bit_len >= 8 {
            let byte = (self.bit_acc & 0xFF) as u8;
            self.byte(byte)?;
            self.bit_acc >>= 8;
            self.bit_len -= 8;
        }
        Ok(())
    }

    /// Emit a partially filled bit accumulator, padding the high bits with
    /// zeros. No-op when the accumulator is empty.
    #[allow(dead_code)]
    pub(crate) fn flush_bits(&mut self) -> Result<()> {
        if self.bit_len > 0 {
            let byte = (self.bit_acc & 0xFF) as u8;
            self.byte(byte)?;
            self.bit_acc = 0;
            self.bit_len = 0;
        }
        Ok(())
    }

    pub(crate) fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

#[test]
fn cursor_reads_little_endian() {
    let data = [0x01, 0x02, 0x03, 0x04, 0xFE, 0xFF, 0x2A];
    let mut cursor = ByteCursor::new(&data);
    assert_eq!(cursor.word().unwrap(), 0x0201);
    assert_eq!(cursor.dword().unwrap(), 0xFFFE_0403);
    assert_eq!(cursor.byte().unwrap(), 0x2A);
}

#[test]
fn cursor_reads_signed_shorts() {
    let data = [0xFF, 0xFF, 0x00, 0x80];
    let mut cursor = ByteCursor::new(&data);
    assert_eq!(cursor.short().unwrap(), -1);
    assert_eq!(cursor.short().unwrap(), i16::MIN);
}

#[test]
fn cursor_out_of_bounds_reports_absolute_offset() {
    let data = [0x01, 0x02, 0x03];
    let mut cursor = ByteCursor::with_base(&data, 100);
    assert_eq!(cursor.word().unwrap(), 0x0201);
    match cursor.dword() {
        Err(AseError::OutOfBounds { offset, needed }) => {
            assert_eq!(offset, 102);
            assert_eq!(needed, 4);
        }
        other => panic!("expected OutOfBounds, got {:?}", other),
    }
    // A failed read consumes nothing.
    assert_eq!(cursor.pos(), 102);
    assert_eq!(cursor.byte().unwrap(), 0x03);
}

#[test]
fn cursor_string_replaces_invalid_utf8() {
    let data = [0x02, 0x00, b'h', b'i', 0x02, 0x00, 0xFF, 0xFE];
    let mut cursor = ByteCursor::new(&data);
    assert_eq!(cursor.string().unwrap(), "hi");
    assert_eq!(cursor.string().unwrap(), "\u{FFFD}\u{FFFD}");
}

#[test]
fn cursor_string_with_truncated_bytes_is_out_of_bounds() {
    let data = [0x05, 0x00, b'a', b'b'];
    let mut cursor = ByteCursor::new(&data);
    assert!(matches!(
        cursor.string(),
        Err(AseError::OutOfBounds { offset: 2, needed: 5 })
    ));
}

#[test]
fn cursor_slice_and_rest() {
    let data = [1, 2, 3, 4, 5];
    let mut cursor = ByteCursor::new(&data);
    assert_eq!(cursor.slice(2).unwrap(), &[1, 2]);
    assert_eq!(cursor.rest(), &[3, 4, 5]);
    assert_eq!(cursor.rest(), &[] as &[u8]);
}

#[test]
fn writer_mirrors_cursor() {
    let mut writer = ByteWriter::new();
    writer.word(0x0201).unwrap();
    writer.dword(0xFFFE_0403).unwrap();
    writer.short(-1).unwrap();
    writer.string("hi").unwrap();
    let buf = writer.into_inner();

    let mut cursor = ByteCursor::new(&buf);
    assert_eq!(cursor.word().unwrap(), 0x0201);
    assert_eq!(cursor.dword().unwrap(), 0xFFFE_0403);
    assert_eq!(cursor.short().unwrap(), -1);
    assert_eq!(cursor.string().unwrap(), "hi");
}

#[test]
fn writer_zeros_and_bytes() {
    let mut writer = ByteWriter::new();
    writer.byte(0xAB).unwrap();
    writer.zeros(3).unwrap();
    writer.bytes(&[1, 2]).unwrap();
    assert_eq!(writer.into_inner(), [0xAB, 0, 0, 0, 1, 2]);
}

#[test]
fn writer_big_endian_variants() {
    let mut writer = ByteWriter::new();
    writer.word(0x1234).unwrap();
    writer.word_be(0x1234).unwrap();
    writer.dword_be(0x0102_0304).unwrap();
    assert_eq!(
        writer.into_inner(),
        [0x34, 0x12, 0x12, 0x34, 0x01, 0x02, 0x03, 0x04]
    );
}

#[test]
fn writer_packs_bits_lsb_first() {
    let mut writer = ByteWriter::new();
    writer.bits(0b101, 3).unwrap();
    writer.bits(0b11, 2).unwrap();
    writer.bits(0b0, 1).unwrap();
    writer.bits(0b10, 2).unwrap();
    writer.bits(0b1, 1).unwrap();
    writer.flush_bits().unwrap();
    assert_eq!(writer.into_inner(), [0b1001_1101, 0b0000_0001]);
}

#[test]
fn writer_flush_bits_pads_with_zeros() {
    let mut writer = ByteWriter::new();
    writer.bits(0b11, 2).unwrap();
    writer.flush_bits().unwrap();
    writer.flush_bits().unwrap();
    assert_eq!(writer.into_inner(), [0b0000_0011]);
}

use std::{error::Error, fmt, io};

/// An error raised while decoding or encoding an Aseprite file.
///
/// Every variant aborts the whole operation: there is no partial document
/// and no retry. Unknown chunk types and unsupported sub-formats (tilemaps,
/// the legacy palette chunk, color profiles) are deliberately *not* errors;
/// they are skipped and logged instead.
#[derive(Debug)]
pub enum AseError {
    /// The container structure was malformed: declared file size or magic
    /// number mismatch, bad chunk framing, or a field with an out-of-range
    /// value. The message names the offending value and, where available,
    /// its offset.
    BadHeader(String),
    /// A frame header did not start with the frame magic number `0xF1FA`.
    BadFrameMagic {
        /// Absolute file offset of the magic field.
        offset: usize,
        /// The value found instead.
        found: u16,
    },
    /// The header declared a color depth other than 8, 16 or 32 bits per
    /// pixel.
    UnsupportedColorDepth(u16),
    /// A cel is inconsistent with the rest of the document: it references a
    /// missing layer or frame, links forward or in a cycle, or its pixel
    /// data does not match its declared size.
    CorruptCel(String),
    /// The zlib stream of a compressed cel could not be inflated.
    Decompression(io::Error),
    /// A read needed more bytes than the buffer (or the current chunk) has.
    OutOfBounds {
        /// Absolute file offset at which the read started.
        offset: usize,
        /// Number of bytes the read asked for.
        needed: usize,
    },
    /// An I/O error from the underlying byte source or sink.
    Io(io::Error),
}

impl fmt::Display for AseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AseError::BadHeader(msg) => write!(f, "Malformed Aseprite data: {}", msg),
            AseError::BadFrameMagic { offset, found } => write!(
                f,
                "Bad frame magic number 0x{:04x} at offset {} (expected 0xf1fa)",
                found, offset
            ),
            AseError::UnsupportedColorDepth(bpp) => {
                write!(f, "Unsupported color depth: {} bits per pixel", bpp)
            }
            AseError::CorruptCel(msg) => write!(f, "Corrupt cel: {}", msg),
            AseError::Decompression(err) => {
                write!(f, "Could not inflate compressed cel data: {}", err)
            }
            AseError::OutOfBounds { offset, needed } => write!(
                f,
                "Read of {} bytes at offset {} runs past the end of the input",
                needed, offset
            ),
            AseError::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl Error for AseError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            AseError::Decompression(err) | AseError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for AseError {
    fn from(err: io::Error) -> Self {
        AseError::Io(err)
    }
}

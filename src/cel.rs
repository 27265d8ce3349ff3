use crate::cursor::ByteCursor;
use crate::document::ColorDepth;
use crate::{AseError, Result};
use flate2::read::ZlibDecoder;
use log::debug;
use std::fmt;
use std::io::Read;

/// The pixel payload of a cel.
#[derive(Debug, Clone)]
pub enum CelContent {
    /// Pixel data owned by this cel. Raw and zlib-compressed wire encodings
    /// both end up here; they are indistinguishable after decoding.
    Image(ImageData),
    /// No pixel data of its own; reuses the pixels of the cel on the same
    /// layer in an earlier frame.
    Linked {
        /// Index of the frame that holds the actual pixels. Always smaller
        /// than the index of the frame containing this cel.
        frame_index: u16,
    },
    /// A tilemap cel. Decoded as empty and never flattened or re-encoded.
    Tilemap,
}

/// Dimensions plus tightly packed pixel bytes of an image cel.
///
/// Pixels are stored row-major with no padding, in the document's color
/// depth: 4 bytes per pixel for RGBA, 2 for grayscale, 1 for indexed.
#[derive(Clone)]
pub struct ImageData {
    pub(crate) width: u16,
    pub(crate) height: u16,
    pub(crate) pixels: Vec<u8>,
}

impl ImageData {
    /// Width of the cel in pixels. May differ from the canvas size.
    pub fn width(&self) -> u16 {
        self.width
    }

    /// Height of the cel in pixels.
    pub fn height(&self) -> u16 {
        self.height
    }

    /// The pixel bytes, exactly `width * height * bytes_per_pixel` of them.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}

impl fmt::Debug for ImageData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{} <{} bytes>", self.width, self.height, self.pixels.len())
    }
}

/// One layer's pixel contribution to one frame. In the timeline view these
/// are the dots.
///
/// [Official docs for cels](https://www.aseprite.org/docs/cel/).
#[derive(Debug, Clone)]
pub struct Cel {
    pub(crate) layer_index: u16,
    pub(crate) x: i16,
    pub(crate) y: i16,
    pub(crate) opacity: u8,
    pub(crate) z_index: i16,
    pub(crate) content: CelContent,
}

impl Cel {
    /// Position of this cel's layer in the frame's layer table.
    pub fn layer_index(&self) -> u16 {
        self.layer_index
    }

    /// Horizontal placement on the canvas. Negative values hang off the
    /// left edge.
    pub fn x(&self) -> i16 {
        self.x
    }

    /// Vertical placement on the canvas.
    pub fn y(&self) -> i16 {
        self.y
    }

    /// Cel opacity, multiplied with the layer opacity when flattening.
    pub fn opacity(&self) -> u8 {
        self.opacity
    }

    /// Stacking adjustment: cels draw in ascending `layer_index + z_index`
    /// order, with the larger `z_index` on top when the sums tie.
    pub fn z_index(&self) -> i16 {
        self.z_index
    }

    /// The cel's pixel payload.
    pub fn content(&self) -> &CelContent {
        &self.content
    }
}

pub(crate) fn parse_chunk(mut cursor: ByteCursor, depth: ColorDepth) -> Result<Cel> {
    let layer_index = cursor.word()?;
    let x = cursor.short()?;
    let y = cursor.short()?;
    let opacity = cursor.byte()?;
    let cel_type = cursor.word()?;
    let z_index = cursor.short()?;
    cursor.skip_reserved(5)?;

    let content = match cel_type {
        0 => parse_raw(&mut cursor, depth)?,
        1 => CelContent::Linked {
            frame_index: cursor.word()?,
        },
        2 => parse_compressed(&mut cursor, depth)?,
        3 => {
            debug!("ignoring tilemap cel data on layer {}", layer_index);
            CelContent::Tilemap
        }
        _ => {
            return Err(AseError::CorruptCel(format!(
                "invalid cel type {} on layer {}",
                cel_type, layer_index
            )))
        }
    };

    Ok(Cel {
        layer_index,
        x,
        y,
        opacity,
        z_index,
        content,
    })
}

fn parse_raw(cursor: &mut ByteCursor, depth: ColorDepth) -> Result<CelContent> {
    let width = cursor.word()?;
    let height = cursor.word()?;
    let pixels = cursor.slice(pixel_bytes(width, height, depth))?.to_vec();
    Ok(CelContent::Image(ImageData {
        width,
        height,
        pixels,
    }))
}

fn parse_compressed(cursor: &mut ByteCursor, depth: ColorDepth) -> Result<CelContent> {
    let width = cursor.word()?;
    let height = cursor.word()?;
    let expected = pixel_bytes(width, height, depth);

    // The compressed stream is zlib-wrapped, not bare deflate.
    let mut pixels = Vec::with_capacity(expected);
    let mut decoder = ZlibDecoder::new(cursor.rest());
    decoder
        .read_to_end(&mut pixels)
        .map_err(AseError::Decompression)?;

    if pixels.len() != expected {
        return Err(AseError::CorruptCel(format!(
            "compressed cel inflated to {} bytes, expected {} for {}x{} pixels",
            pixels.len(),
            expected,
            width,
            height
        )));
    }
    Ok(CelContent::Image(ImageData {
        width,
        height,
        pixels,
    }))
}

fn pixel_bytes(width: u16, height: u16, depth: ColorDepth) -> usize {
    width as usize * height as usize * depth.bytes_per_pixel()
}

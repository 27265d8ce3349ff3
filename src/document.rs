use crate::cel::Cel;
use crate::layer::Layer;
use crate::palette::Palette;
use crate::{compositor, encoder, parse, AseError, Result};
use image::{DynamicImage, RgbaImage};
use std::fs;
use std::path::Path;

/// Pixel storage format of a document, from the `color depth` header field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorDepth {
    /// 8 bits per pixel; each pixel is an index into the palette.
    Indexed,
    /// 16 bits per pixel: gray value and alpha.
    GrayscaleAlpha,
    /// 32 bits per pixel: red, green, blue, alpha.
    Rgba,
}

impl ColorDepth {
    /// Bits per pixel, as the header declares it.
    pub fn bits_per_pixel(self) -> u16 {
        match self {
            ColorDepth::Indexed => 8,
            ColorDepth::GrayscaleAlpha => 16,
            ColorDepth::Rgba => 32,
        }
    }

    /// Bytes occupied by one pixel in cel data.
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            ColorDepth::Indexed => 1,
            ColorDepth::GrayscaleAlpha => 2,
            ColorDepth::Rgba => 4,
        }
    }

    pub(crate) fn from_bits_per_pixel(bpp: u16) -> Result<ColorDepth> {
        match bpp {
            8 => Ok(ColorDepth::Indexed),
            16 => Ok(ColorDepth::GrayscaleAlpha),
            32 => Ok(ColorDepth::Rgba),
            _ => Err(AseError::UnsupportedColorDepth(bpp)),
        }
    }
}

/// Pixel aspect ratio as `width : height`. Square pixels are `1:1`; a
/// header that declares either component as zero is read as square.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelAspect {
    /// Width component of the ratio.
    pub width: u8,
    /// Height component of the ratio.
    pub height: u8,
}

impl Default for PixelAspect {
    fn default() -> Self {
        PixelAspect {
            width: 1,
            height: 1,
        }
    }
}

/// The editor's grid settings. Advisory only; nothing in this crate
/// interprets them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grid {
    /// X position of the grid origin.
    pub x: i16,
    /// Y position of the grid origin.
    pub y: i16,
    /// Grid cell width in pixels.
    pub width: u16,
    /// Grid cell height in pixels.
    pub height: u16,
}

impl Default for Grid {
    fn default() -> Self {
        Grid {
            x: 0,
            y: 0,
            width: 16,
            height: 16,
        }
    }
}

/// One animation frame: its layer table, its cels, and (for indexed
/// documents) its palette state.
#[derive(Debug, Clone)]
pub struct Frame {
    pub(crate) duration_ms: u16,
    pub(crate) layers: Vec<Layer>,
    pub(crate) cels: Vec<Cel>,
    pub(crate) palette: Palette,
}

impl Frame {
    pub(crate) fn new(duration_ms: u16) -> Frame {
        Frame {
            duration_ms,
            layers: Vec::new(),
            cels: Vec::new(),
            palette: Palette::default(),
        }
    }

    /// Display duration in milliseconds. Frames that do not override it
    /// report the document default.
    pub fn duration(&self) -> u16 {
        self.duration_ms
    }

    /// The layer table, bottom to top. Aseprite writes layer chunks only
    /// into the first frame; later frames inherit its table when decoded.
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// The frame's cels, in file order. For the composited image use
    /// [AseDocument::flatten] instead.
    pub fn cels(&self) -> &[Cel] {
        &self.cels
    }

    /// This frame's palette state. Lookups during flattening use the
    /// document's effective palette, not this one.
    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// Find a layer by name. The lowest index wins if names repeat.
    pub fn layer_by_name(&self, name: &str) -> Option<&Layer> {
        self.layers.iter().find(|layer| layer.name() == name)
    }
}

/// A complete Aseprite document: canvas description plus all frames.
///
/// Obtained from [decode](AseDocument::decode) or
/// [read_file](AseDocument::read_file), or built from a plain raster with
/// [from_image](AseDocument::from_image).
#[derive(Debug, Clone)]
pub struct AseDocument {
    pub(crate) width: u16,
    pub(crate) height: u16,
    pub(crate) color_depth: ColorDepth,
    pub(crate) flags: u32,
    pub(crate) default_frame_duration_ms: u16,
    pub(crate) transparent_index: u8,
    pub(crate) color_count: u16,
    pub(crate) pixel_aspect: PixelAspect,
    pub(crate) grid: Grid,
    pub(crate) frames: Vec<Frame>,
    pub(crate) palette: Palette,
}

impl AseDocument {
    /// Decode a complete `.ase` / `.aseprite` file from memory.
    pub fn decode(data: &[u8]) -> Result<AseDocument> {
        parse::decode(data)
    }

    /// Read and decode a file from disk.
    pub fn read_file(path: &Path) -> Result<AseDocument> {
        let data = fs::read(path)?;
        AseDocument::decode(&data)
    }

    /// Encode the document back into the binary file format.
    pub fn encode(&self) -> Result<Vec<u8>> {
        encoder::encode(self)
    }

    /// Encode the document and write it to disk.
    pub fn save_file(&self, path: &Path) -> Result<()> {
        let data = self.encode()?;
        fs::write(path, data)?;
        Ok(())
    }

    /// Decode a file and flatten its first frame in one step.
    pub fn decode_image(data: &[u8]) -> Result<DynamicImage> {
        let doc = AseDocument::decode(data)?;
        if doc.frames.is_empty() {
            return Err(AseError::BadHeader("file contains no frames".to_owned()));
        }
        doc.flatten(0)
    }

    /// Build a single-frame, single-layer RGBA document from a raster,
    /// ready for [encode](AseDocument::encode).
    ///
    /// # Panics
    ///
    /// Panics if either image dimension is zero or exceeds `u16::MAX`.
    pub fn from_image(image: &RgbaImage) -> AseDocument {
        encoder::from_image(image)
    }

    /// Width of the canvas in pixels.
    pub fn width(&self) -> u16 {
        self.width
    }

    /// Height of the canvas in pixels.
    pub fn height(&self) -> u16 {
        self.height
    }

    /// Width and height of the canvas in pixels.
    pub fn size(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    /// Pixel storage format.
    pub fn color_depth(&self) -> ColorDepth {
        self.color_depth
    }

    /// Raw header flag bits. Bit 0 means layer opacities are valid; the
    /// rest are not interpreted.
    pub fn flags(&self) -> u32 {
        self.flags
    }

    /// Duration, in milliseconds, for frames that do not declare their own.
    pub fn default_frame_duration(&self) -> u16 {
        self.default_frame_duration_ms
    }

    /// The palette index treated as transparent on non-background layers.
    /// `None` unless the document is indexed.
    pub fn transparent_index(&self) -> Option<u8> {
        match self.color_depth {
            ColorDepth::Indexed => Some(self.transparent_index),
            _ => None,
        }
    }

    /// Number of colors declared in the header. Zero is read as 256 for
    /// indexed documents. Informational; the palette chunks are
    /// authoritative.
    pub fn color_count(&self) -> u16 {
        self.color_count
    }

    /// Pixel aspect ratio.
    pub fn pixel_aspect(&self) -> PixelAspect {
        self.pixel_aspect
    }

    /// The editor's grid settings.
    pub fn grid(&self) -> Grid {
        self.grid
    }

    /// Number of animation frames.
    pub fn num_frames(&self) -> u32 {
        self.frames.len() as u32
    }

    /// All frames, in playback order.
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// A single frame.
    ///
    /// # Panics
    ///
    /// Panics if `index` is not less than [num_frames](AseDocument::num_frames).
    pub fn frame(&self, index: u32) -> &Frame {
        &self.frames[index as usize]
    }

    /// The effective palette, i.e. the palette state of frame 0. `None`
    /// unless the document is indexed.
    pub fn palette(&self) -> Option<&Palette> {
        match self.color_depth {
            ColorDepth::Indexed => Some(&self.palette),
            _ => None,
        }
    }

    /// Flatten one frame into an image in the document's natural channel
    /// layout: RGBA for RGBA and indexed documents, gray plus alpha for
    /// grayscale documents.
    ///
    /// # Panics
    ///
    /// Panics if `frame_index` is not less than
    /// [num_frames](AseDocument::num_frames).
    pub fn flatten(&self, frame_index: u32) -> Result<DynamicImage> {
        compositor::flatten(self, frame_index)
    }

    /// Like [flatten](AseDocument::flatten), but always converted to RGBA.
    pub fn flatten_rgba(&self, frame_index: u32) -> Result<RgbaImage> {
        self.flatten(frame_index).map(|image| image.to_rgba8())
    }
}

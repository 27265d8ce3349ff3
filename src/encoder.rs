use crate::cel::{Cel, CelContent, ImageData};
use crate::cursor::ByteWriter;
use crate::document::{AseDocument, ColorDepth, Frame, Grid, PixelAspect};
use crate::layer::{BlendMode, Layer, LayerFlags, LayerKind};
use crate::palette::Palette;
use crate::parse::{
    CHUNK_CEL, CHUNK_HEADER_SIZE, CHUNK_LAYER, CHUNK_PALETTE, FILE_MAGIC, FRAME_MAGIC,
};
use crate::Result;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::RgbaImage;
use log::warn;
use std::io::Write;

const FILE_HEADER_SIZE: u32 = 128;
const FRAME_HEADER_SIZE: u32 = 16;

const DEFAULT_FRAME_DURATION_MS: u16 = 100;

// Indexed pixels are single bytes, so no pixel can reference a palette
// entry above this index.
const MAX_PALETTE_INDEX: u32 = u8::MAX as u32;

// Frames are encoded into memory first; their sizes then feed the file
// header, so nothing ever needs to seek back.
pub(crate) fn encode(doc: &AseDocument) -> Result<Vec<u8>> {
    let mut frames = Vec::with_capacity(doc.frames.len());
    let mut frames_size = 0_usize;
    for (index, frame) in doc.frames.iter().enumerate() {
        let encoded = encode_frame(doc, frame, index == 0)?;
        frames_size += encoded.len();
        frames.push(encoded);
    }

    let mut w = ByteWriter::new();
    write_header(&mut w, doc, FILE_HEADER_SIZE + frames_size as u32)?;
    let mut out = w.into_inner();
    for frame in frames {
        out.extend_from_slice(&frame);
    }
    Ok(out)
}

fn write_header(w: &mut ByteWriter, doc: &AseDocument, file_size: u32) -> Result<()> {
    w.dword(file_size)?;
    w.word(FILE_MAGIC)?;
    w.word(doc.frames.len() as u16)?;
    w.word(doc.width)?;
    w.word(doc.height)?;
    w.word(doc.color_depth.bits_per_pixel())?;
    w.dword(doc.flags)?;
    w.word(doc.default_frame_duration_ms)?;
    w.zeros(8)?;
    w.byte(doc.transparent_index)?;
    w.zeros(3)?;
    w.word(doc.color_count)?;
    w.byte(doc.pixel_aspect.width)?;
    w.byte(doc.pixel_aspect.height)?;
    w.short(doc.grid.x)?;
    w.short(doc.grid.y)?;
    w.word(doc.grid.width)?;
    w.word(doc.grid.height)?;
    w.zeros(84)?;
    Ok(())
}

fn encode_frame(doc: &AseDocument, frame: &Frame, first_frame: bool) -> Result<Vec<u8>> {
    let mut chunks = ByteWriter::new();
    let mut num_chunks = 0_u32;

    if doc.color_depth == ColorDepth::Indexed {
        if let Some(payload) = palette_chunk(&frame.palette)? {
            write_chunk(&mut chunks, CHUNK_PALETTE, &payload)?;
            num_chunks += 1;
        }
    }

    // The layer table goes into the first frame only; decoders apply it to
    // every frame.
    if first_frame {
        for layer in &frame.layers {
            write_chunk(&mut chunks, CHUNK_LAYER, &layer_chunk(layer)?)?;
            num_chunks += 1;
        }
    }

    for cel in &frame.cels {
        if let Some(payload) = cel_chunk(cel)? {
            write_chunk(&mut chunks, CHUNK_CEL, &payload)?;
            num_chunks += 1;
        }
    }

    let chunks = chunks.into_inner();
    let mut w = ByteWriter::new();
    w.dword(FRAME_HEADER_SIZE + chunks.len() as u32)?;
    w.word(FRAME_MAGIC)?;
    w.word(num_chunks.min(0xFFFF) as u16)?;
    w.word(frame.duration_ms)?;
    w.zeros(2)?;
    w.dword(num_chunks)?;
    w.bytes(&chunks)?;
    Ok(w.into_inner())
}

fn write_chunk(w: &mut ByteWriter, tag: u16, payload: &[u8]) -> Result<()> {
    w.dword(CHUNK_HEADER_SIZE + payload.len() as u32)?;
    w.word(tag)?;
    w.bytes(payload)
}

// Written as a new palette chunk (0x2019) covering the populated index
// range, clamped to the indices an indexed pixel can actually reference.
// Holes inside the range become 0,0,0,0 entries; color names are never
// written.
fn palette_chunk(palette: &Palette) -> Result<Option<Vec<u8>>> {
    let dropped = palette
        .iter()
        .filter(|(index, _)| *index > MAX_PALETTE_INDEX)
        .count();
    if dropped > 0 {
        warn!(
            "dropping {} palette entries above index {}; no pixel can reference them",
            dropped, MAX_PALETTE_INDEX
        );
    }
    let (first, last) = match palette.index_range(MAX_PALETTE_INDEX) {
        Some(range) => range,
        None => return Ok(None),
    };
    let mut w = ByteWriter::new();
    w.dword(last + 1)?;
    w.dword(first)?;
    w.dword(last)?;
    w.zeros(8)?;
    for index in first..=last {
        let rgba = palette.get(index).unwrap_or([0, 0, 0, 0]);
        w.word(0)?;
        w.byte(rgba[0])?;
        w.byte(rgba[1])?;
        w.byte(rgba[2])?;
        w.byte(rgba[3])?;
    }
    Ok(Some(w.into_inner()))
}

fn layer_chunk(layer: &Layer) -> Result<Vec<u8>> {
    let mut w = ByteWriter::new();
    w.word(layer.flags.bits())?;
    let layer_type: u16 = match layer.kind {
        LayerKind::Image => 0,
        LayerKind::Group => 1,
        LayerKind::Tilemap { .. } => 2,
    };
    w.word(layer_type)?;
    w.word(layer.child_level)?;
    w.zeros(4)?; // default layer width and height, ignored by readers
    w.word(layer.blend_mode as u16)?;
    w.byte(layer.opacity)?;
    w.zeros(3)?;
    w.string(&layer.name)?;
    if let LayerKind::Tilemap { tileset_index } = layer.kind {
        w.dword(tileset_index)?;
    }
    Ok(w.into_inner())
}

// Image cels are always written in the compressed encoding; raw cels exist
// only on the decode side. Tilemap cels cannot be re-encoded faithfully,
// so they are dropped from the output.
fn cel_chunk(cel: &Cel) -> Result<Option<Vec<u8>>> {
    let mut w = ByteWriter::new();
    w.word(cel.layer_index)?;
    w.short(cel.x)?;
    w.short(cel.y)?;
    w.byte(cel.opacity)?;
    match &cel.content {
        CelContent::Image(data) => {
            w.word(2)?;
            w.short(cel.z_index)?;
            w.zeros(5)?;
            w.word(data.width)?;
            w.word(data.height)?;
            w.bytes(&deflate(&data.pixels)?)?;
        }
        CelContent::Linked { frame_index } => {
            w.word(1)?;
            w.short(cel.z_index)?;
            w.zeros(5)?;
            w.word(*frame_index)?;
        }
        CelContent::Tilemap => {
            warn!("dropping unsupported tilemap cel on layer {}", cel.layer_index);
            return Ok(None);
        }
    }
    Ok(Some(w.into_inner()))
}

fn deflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

pub(crate) fn from_image(image: &RgbaImage) -> AseDocument {
    let (width, height) = image.dimensions();
    assert!(
        width > 0 && height > 0 && width <= u16::MAX as u32 && height <= u16::MAX as u32,
        "image size {}x{} does not fit the format",
        width,
        height
    );

    let layer = Layer {
        name: "Layer 1".to_owned(),
        kind: LayerKind::Image,
        flags: LayerFlags::VISIBLE | LayerFlags::EDITABLE,
        child_level: 0,
        blend_mode: BlendMode::Normal,
        opacity: 255,
    };
    let cel = Cel {
        layer_index: 0,
        x: 0,
        y: 0,
        opacity: 255,
        z_index: 0,
        content: CelContent::Image(ImageData {
            width: width as u16,
            height: height as u16,
            pixels: image.as_raw().clone(),
        }),
    };
    let mut frame = Frame::new(DEFAULT_FRAME_DURATION_MS);
    frame.layers.push(layer);
    frame.cels.push(cel);

    AseDocument {
        width: width as u16,
        height: height as u16,
        color_depth: ColorDepth::Rgba,
        flags: 1, // layer opacities are valid
        default_frame_duration_ms: DEFAULT_FRAME_DURATION_MS,
        transparent_index: 0,
        color_count: 0,
        pixel_aspect: PixelAspect::default(),
        grid: Grid::default(),
        frames: vec![frame],
        palette: Palette::default(),
    }
}

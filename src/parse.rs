use crate::cel::{self, CelContent};
use crate::cursor::ByteCursor;
use crate::document::{AseDocument, ColorDepth, Frame, Grid, PixelAspect};
use crate::palette::{self, Palette};
use crate::{layer, AseError, Result};
use log::{debug, warn};

// File format docs:
// https://github.com/aseprite/aseprite/blob/master/docs/ase-file-specs.md
pub(crate) const FILE_MAGIC: u16 = 0xA5E0;
pub(crate) const FRAME_MAGIC: u16 = 0xF1FA;

pub(crate) const CHUNK_OLD_PALETTE: u16 = 0x0004;
pub(crate) const CHUNK_LEGACY_PALETTE: u16 = 0x0011;
pub(crate) const CHUNK_LAYER: u16 = 0x2004;
pub(crate) const CHUNK_CEL: u16 = 0x2005;
pub(crate) const CHUNK_COLOR_PROFILE: u16 = 0x2007;
pub(crate) const CHUNK_PALETTE: u16 = 0x2019;

pub(crate) const CHUNK_HEADER_SIZE: u32 = 6;

/// Chunk types this codec reads. Every other tag is skipped over, which is
/// the format's forward compatibility mechanism.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChunkType {
    OldPalette,
    LegacyPalette,
    Layer,
    Cel,
    ColorProfile,
    Palette,
}

impl ChunkType {
    fn from_tag(tag: u16) -> Option<ChunkType> {
        match tag {
            CHUNK_OLD_PALETTE => Some(ChunkType::OldPalette),
            CHUNK_LEGACY_PALETTE => Some(ChunkType::LegacyPalette),
            CHUNK_LAYER => Some(ChunkType::Layer),
            CHUNK_CEL => Some(ChunkType::Cel),
            CHUNK_COLOR_PROFILE => Some(ChunkType::ColorProfile),
            CHUNK_PALETTE => Some(ChunkType::Palette),
            _ => None,
        }
    }
}

pub(crate) fn decode(data: &[u8]) -> Result<AseDocument> {
    let mut cursor = ByteCursor::new(data);
    let (mut doc, num_frames) = parse_header(&mut cursor, data.len())?;

    for _ in 0..num_frames {
        let frame = parse_frame(&mut cursor, &doc)?;
        doc.frames.push(frame);
    }

    finalize(&mut doc)?;
    Ok(doc)
}

fn parse_header(cursor: &mut ByteCursor, input_len: usize) -> Result<(AseDocument, u16)> {
    let file_size = cursor.dword()?;
    if file_size as usize != input_len {
        return Err(AseError::BadHeader(format!(
            "header declares {} bytes but the input has {}",
            file_size, input_len
        )));
    }

    let magic = cursor.word()?;
    if magic != FILE_MAGIC {
        return Err(AseError::BadHeader(format!(
            "bad file magic number 0x{:04x} (expected 0x{:04x})",
            magic, FILE_MAGIC
        )));
    }

    let num_frames = cursor.word()?;
    let width = cursor.word()?;
    let height = cursor.word()?;
    if width == 0 || height == 0 {
        return Err(AseError::BadHeader(format!(
            "bad canvas size {}x{}",
            width, height
        )));
    }

    let color_depth = ColorDepth::from_bits_per_pixel(cursor.word()?)?;
    let flags = cursor.dword()?;
    let default_frame_duration_ms = cursor.word()?;
    cursor.skip_reserved(8)?;
    let transparent_index = cursor.byte()?;
    cursor.skip_reserved(3)?;
    let mut color_count = cursor.word()?;
    if color_count == 0 && color_depth == ColorDepth::Indexed {
        color_count = 256;
    }

    let pixel_width = cursor.byte()?;
    let pixel_height = cursor.byte()?;
    let pixel_aspect = if pixel_width == 0 || pixel_height == 0 {
        PixelAspect::default()
    } else {
        PixelAspect {
            width: pixel_width,
            height: pixel_height,
        }
    };

    let grid = Grid {
        x: cursor.short()?,
        y: cursor.short()?,
        width: cursor.word()?,
        height: cursor.word()?,
    };

    cursor.skip_reserved(84)?;

    let doc = AseDocument {
        width,
        height,
        color_depth,
        flags,
        default_frame_duration_ms,
        transparent_index,
        color_count,
        pixel_aspect,
        grid,
        frames: Vec::with_capacity(num_frames as usize),
        palette: Palette::default(),
    };
    Ok((doc, num_frames))
}

fn parse_frame(cursor: &mut ByteCursor, doc: &AseDocument) -> Result<Frame> {
    let _frame_size = cursor.dword()?;
    let magic_offset = cursor.pos();
    let magic = cursor.word()?;
    if magic != FRAME_MAGIC {
        return Err(AseError::BadFrameMagic {
            offset: magic_offset,
            found: magic,
        });
    }

    let chunk_count1 = cursor.word()?;
    let duration = cursor.word()?;
    cursor.skip_reserved(2)?;
    let chunk_count2 = cursor.dword()?;

    let mut frame = Frame::new(if duration != 0 {
        duration
    } else {
        doc.default_frame_duration_ms
    });

    for _ in 0..resolve_chunk_count(chunk_count1, chunk_count2) {
        parse_chunk(cursor, doc, &mut frame)?;
    }
    Ok(frame)
}

// The old 16-bit count saturates at 0xFFFF; the 32-bit field supersedes it
// whenever it is nonzero. A saturated old count with a zero new count
// leaves the real count unrecoverable, so the frame is read as empty
// rather than walking garbage.
fn resolve_chunk_count(count1: u16, count2: u32) -> u32 {
    if count2 != 0 {
        count2
    } else if count1 == 0xFFFF {
        0
    } else {
        count1 as u32
    }
}

fn parse_chunk(cursor: &mut ByteCursor, doc: &AseDocument, frame: &mut Frame) -> Result<()> {
    let chunk_offset = cursor.pos();
    let total_size = cursor.dword()?;
    let tag = cursor.word()?;
    let payload_len = total_size.checked_sub(CHUNK_HEADER_SIZE).ok_or_else(|| {
        AseError::BadHeader(format!(
            "chunk at offset {} declares {} bytes, less than its own 6-byte header",
            chunk_offset, total_size
        ))
    })?;

    let payload_offset = cursor.pos();
    let payload = cursor.slice(payload_len as usize)?;
    let mut chunk = ByteCursor::with_base(payload, payload_offset);

    match ChunkType::from_tag(tag) {
        Some(ChunkType::OldPalette) => {
            let transparent = doc.transparent_index().map(u32::from);
            palette::parse_old_palette_chunk(&mut chunk, &mut frame.palette, transparent)?;
        }
        Some(ChunkType::LegacyPalette) => {
            warn!("legacy palette chunk (0x0011) is not supported, ignoring it");
        }
        Some(ChunkType::Palette) => {
            palette::parse_palette_chunk(&mut chunk, &mut frame.palette)?;
        }
        Some(ChunkType::Layer) => {
            frame.layers.push(layer::parse_chunk(&mut chunk)?);
        }
        Some(ChunkType::Cel) => {
            frame.cels.push(cel::parse_chunk(chunk, doc.color_depth)?);
        }
        Some(ChunkType::ColorProfile) => {
            debug!("ignoring color profile chunk ({} bytes)", payload_len);
        }
        None => {
            debug!("skipping unknown chunk type 0x{:04x} ({} bytes)", tag, payload_len);
        }
    }
    Ok(())
}

// Cels carry bare indices; they are checked once here instead of at every
// use. This cannot happen during the chunk walk because layer chunks may
// legally come after the cels that reference them.
fn finalize(doc: &mut AseDocument) -> Result<()> {
    if doc.frames.is_empty() {
        return Ok(());
    }

    if doc.color_depth == ColorDepth::Indexed {
        doc.palette = doc.frames[0].palette.clone();
    }

    // Aseprite writes layer chunks only into the first frame; later frames
    // inherit its table.
    let first_layers = doc.frames[0].layers.clone();
    for frame in doc.frames.iter_mut().skip(1) {
        if frame.layers.is_empty() {
            frame.layers = first_layers.clone();
        }
    }

    for (frame_index, frame) in doc.frames.iter().enumerate() {
        for cel in &frame.cels {
            if cel.layer_index as usize >= frame.layers.len() {
                return Err(AseError::CorruptCel(format!(
                    "cel in frame {} references layer {} but the frame has {} layers",
                    frame_index,
                    cel.layer_index,
                    frame.layers.len()
                )));
            }
            if let CelContent::Linked { frame_index: target } = cel.content {
                if target as usize >= frame_index {
                    return Err(AseError::CorruptCel(format!(
                        "cel in frame {} links to frame {}, which is not an earlier frame",
                        frame_index, target
                    )));
                }
            }
        }
    }
    Ok(())
}

#[test]
fn chunk_count_prefers_the_new_field() {
    assert_eq!(resolve_chunk_count(3, 0), 3);
    assert_eq!(resolve_chunk_count(3, 70000), 70000);
    assert_eq!(resolve_chunk_count(0xFFFF, 70000), 70000);
    assert_eq!(resolve_chunk_count(0xFFFF, 0), 0);
    assert_eq!(resolve_chunk_count(0, 0), 0);
}

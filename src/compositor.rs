use crate::cel::{Cel, CelContent, ImageData};
use crate::document::{AseDocument, ColorDepth};
use crate::layer::{Layer, LayerKind};
use crate::{AseError, Result};
use image::{DynamicImage, GrayAlphaImage, RgbaImage};

// Flat output canvas. Indexed input resolves to RGBA, so bpp is 4 for RGBA
// and indexed documents, 2 for grayscale.
struct Canvas {
    bytes: Vec<u8>,
    width: i32,
    height: i32,
    bpp: usize,
}

pub(crate) fn flatten(doc: &AseDocument, frame_index: u32) -> Result<DynamicImage> {
    assert!(
        (frame_index as usize) < doc.frames.len(),
        "frame index {} out of range ({} frames)",
        frame_index,
        doc.frames.len()
    );
    let frame = &doc.frames[frame_index as usize];

    let bpp = match doc.color_depth {
        ColorDepth::GrayscaleAlpha => 2,
        ColorDepth::Rgba | ColorDepth::Indexed => 4,
    };
    let mut canvas = Canvas {
        bytes: vec![0; doc.width as usize * doc.height as usize * bpp],
        width: doc.width as i32,
        height: doc.height as i32,
        bpp,
    };

    // Draw order is ascending layer_index + z_index; on ties the cel with
    // the larger z_index draws later and thus shows on top. The sort is
    // stable, so equal keys keep file order.
    let mut order: Vec<&Cel> = frame.cels.iter().collect();
    order.sort_by_key(|cel| (cel.layer_index as i32 + cel.z_index as i32, cel.z_index));

    for cel in order {
        let layer = frame.layers.get(cel.layer_index as usize).ok_or_else(|| {
            AseError::CorruptCel(format!(
                "cel references layer {} but the frame has {} layers",
                cel.layer_index,
                frame.layers.len()
            ))
        })?;
        if !layer.is_visible() || !matches!(layer.kind(), LayerKind::Image) {
            continue;
        }
        let data = match resolve_content(doc, frame_index as usize, cel)? {
            Some(data) => data,
            None => continue,
        };
        draw_cel(&mut canvas, doc, layer, data, cel)?;
    }

    let width = doc.width as u32;
    let height = doc.height as u32;
    let image = match doc.color_depth {
        ColorDepth::GrayscaleAlpha => DynamicImage::ImageLumaA8(
            GrayAlphaImage::from_raw(width, height, canvas.bytes)
                .expect("canvas buffer matches dimensions"),
        ),
        ColorDepth::Rgba | ColorDepth::Indexed => DynamicImage::ImageRgba8(
            RgbaImage::from_raw(width, height, canvas.bytes)
                .expect("canvas buffer matches dimensions"),
        ),
    };
    Ok(image)
}

// A linked cel only redirects the pixel source; position, opacity and
// z-index still come from the linking cel itself. Links must step strictly
// backwards through the frames, which also rules out cycles.
fn resolve_content<'a>(
    doc: &'a AseDocument,
    frame_index: usize,
    cel: &'a Cel,
) -> Result<Option<&'a ImageData>> {
    let mut current_frame = frame_index;
    let mut content = &cel.content;
    loop {
        match content {
            CelContent::Image(data) => return Ok(Some(data)),
            CelContent::Tilemap => return Ok(None),
            CelContent::Linked { frame_index: target } => {
                let target = *target as usize;
                if target >= current_frame {
                    return Err(AseError::CorruptCel(format!(
                        "cel link from frame {} to frame {} does not go backwards",
                        current_frame, target
                    )));
                }
                let source = doc.frames[target]
                    .cels
                    .iter()
                    .find(|c| c.layer_index == cel.layer_index)
                    .ok_or_else(|| {
                        AseError::CorruptCel(format!(
                            "cel links to frame {} which has no cel on layer {}",
                            target, cel.layer_index
                        ))
                    })?;
                current_frame = target;
                content = &source.content;
            }
        }
    }
}

fn draw_cel(
    canvas: &mut Canvas,
    doc: &AseDocument,
    layer: &Layer,
    data: &ImageData,
    cel: &Cel,
) -> Result<()> {
    let src_bpp = doc.color_depth.bytes_per_pixel();
    let combined_opacity = mul_un8(cel.opacity, layer.opacity);
    let transparent = doc.transparent_index();
    let x0 = cel.x as i32;
    let y0 = cel.y as i32;

    for sy in 0..data.height as i32 {
        let dy = y0 + sy;
        if dy < 0 || dy >= canvas.height {
            continue;
        }
        for sx in 0..data.width as i32 {
            let dx = x0 + sx;
            if dx < 0 || dx >= canvas.width {
                continue;
            }
            let src = (sy as usize * data.width as usize + sx as usize) * src_bpp;
            let src = &data.pixels[src..src + src_bpp];
            let dst = (dy as usize * canvas.width as usize + dx as usize) * canvas.bpp;

            match doc.color_depth {
                ColorDepth::Rgba => {
                    let alpha = mul_un8(src[3], combined_opacity);
                    if alpha > 0 {
                        canvas.bytes[dst..dst + 3].copy_from_slice(&src[..3]);
                        canvas.bytes[dst + 3] = alpha;
                    }
                }
                ColorDepth::GrayscaleAlpha => {
                    let alpha = mul_un8(src[1], combined_opacity);
                    if alpha > 0 {
                        canvas.bytes[dst] = src[0];
                        canvas.bytes[dst + 1] = alpha;
                    }
                }
                ColorDepth::Indexed => {
                    let index = src[0];
                    let [red, green, blue, mut alpha] =
                        doc.palette.get(index as u32).ok_or_else(|| {
                            AseError::CorruptCel(format!(
                                "pixel uses palette index {} which has no entry",
                                index
                            ))
                        })?;
                    if Some(index) == transparent && !layer.is_background() {
                        alpha = 0;
                    }
                    let alpha = mul_un8(alpha, combined_opacity);
                    if alpha > 0 {
                        canvas.bytes[dst] = red;
                        canvas.bytes[dst + 1] = green;
                        canvas.bytes[dst + 2] = blue;
                        canvas.bytes[dst + 3] = alpha;
                    }
                }
            }
        }
    }
    Ok(())
}

// Fixed-point multiply of two bytes with rounding, as Aseprite does it.
fn mul_un8(a: u8, b: u8) -> u8 {
    let t = a as i32 * b as i32 + 0x80;
    (((t >> 8) + t) >> 8) as u8
}

#[test]
fn mul_un8_rounds_like_aseprite() {
    assert_eq!(mul_un8(255, 255), 255);
    assert_eq!(mul_un8(255, 128), 128);
    assert_eq!(mul_un8(128, 128), 64);
    assert_eq!(mul_un8(128, 255), 128);
    assert_eq!(mul_un8(1, 255), 1);
    assert_eq!(mul_un8(1, 1), 0);
    assert_eq!(mul_un8(0, 255), 0);
}

use crate::cursor::ByteCursor;
use crate::{AseError, Result};
use bitflags::bitflags;
use log::debug;

/// What a layer holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    /// An ordinary layer whose cels carry pixel data.
    Image,
    /// A layer that groups other layers and contains no image data itself.
    Group,
    /// A tilemap layer. Decoded for completeness, but cels on it carry no
    /// usable pixel data and are skipped when flattening.
    Tilemap {
        /// Index into the file's tileset table. Not interpreted here.
        tileset_index: u32,
    },
}

bitflags! {
    /// Per-layer flag bits as stored in the layer chunk.
    pub struct LayerFlags: u16 {
        /// The layer is shown in the editor and included when flattening.
        const VISIBLE = 0x0001;
        /// The layer is unlocked for editing.
        const EDITABLE = 0x0002;
        /// The layer's position is locked.
        const MOVEMENT_LOCKED = 0x0004;
        /// The layer is the background and stays at the bottom of the stack.
        const BACKGROUND = 0x0008;
        /// Copying a cel on this layer creates a link instead of a copy.
        const CONTINUOUS = 0x0010;
        /// The group is displayed collapsed in the layer panel.
        const COLLAPSED = 0x0020;
        /// The layer shows a reference image.
        const REFERENCE = 0x0040;
    }
}

/// Describes how a layer is combined with the layers underneath it.
///
/// Decoded and written back verbatim. Flattening does not interpret it;
/// every visible cel is drawn with simple alpha replacement (see
/// [AseDocument::flatten](crate::AseDocument::flatten)).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum BlendMode {
    Normal,
    Multiply,
    Screen,
    Overlay,
    Darken,
    Lighten,
    ColorDodge,
    ColorBurn,
    HardLight,
    SoftLight,
    Difference,
    Exclusion,
    Hue,
    Saturation,
    Color,
    Luminosity,
    Addition,
    Subtract,
    Divide,
}

/// One entry of a frame's layer table.
///
/// Layers are stored back to front: index 0 is the bottom of the stack.
/// Group membership is only recorded as a nesting depth; cels reference
/// layers by their flat table index.
#[derive(Debug, Clone)]
pub struct Layer {
    pub(crate) name: String,
    pub(crate) kind: LayerKind,
    pub(crate) flags: LayerFlags,
    pub(crate) child_level: u16,
    pub(crate) blend_mode: BlendMode,
    pub(crate) opacity: u8,
}

impl Layer {
    /// Name of the layer. Not necessarily unique within a document.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this layer holds images, groups other layers, or is a
    /// tilemap.
    pub fn kind(&self) -> LayerKind {
        self.kind
    }

    /// The layer's flag bits.
    pub fn flags(&self) -> LayerFlags {
        self.flags
    }

    /// Shortcut for `.flags().contains(LayerFlags::VISIBLE)`.
    pub fn is_visible(&self) -> bool {
        self.flags.contains(LayerFlags::VISIBLE)
    }

    pub(crate) fn is_background(&self) -> bool {
        self.flags.contains(LayerFlags::BACKGROUND)
    }

    /// Nesting depth below the preceding group layers; 0 for a top-level
    /// layer.
    pub fn child_level(&self) -> u16 {
        self.child_level
    }

    /// Blend mode recorded for this layer.
    pub fn blend_mode(&self) -> BlendMode {
        self.blend_mode
    }

    /// Layer opacity, from 0 (transparent) to 255 (opaque). Multiplied with
    /// each cel's own opacity when flattening.
    pub fn opacity(&self) -> u8 {
        self.opacity
    }
}

pub(crate) fn parse_chunk(cursor: &mut ByteCursor) -> Result<Layer> {
    let flags = cursor.word()?;
    let layer_type = cursor.word()?;
    let child_level = cursor.word()?;
    cursor.skip_reserved(4)?; // default layer width and height, ignored
    let blend_mode = parse_blend_mode(cursor.word()?)?;
    let opacity = cursor.byte()?;
    cursor.skip_reserved(3)?;
    let name = cursor.string()?;

    let kind = match layer_type {
        0 => LayerKind::Image,
        1 => LayerKind::Group,
        2 => {
            let tileset_index = cursor.dword()?;
            debug!(
                "layer {:?} is a tilemap layer; its cels will not be flattened",
                name
            );
            LayerKind::Tilemap { tileset_index }
        }
        _ => {
            return Err(AseError::BadHeader(format!(
                "invalid layer type {} for layer {:?}",
                layer_type, name
            )))
        }
    };

    Ok(Layer {
        name,
        kind,
        flags: LayerFlags::from_bits_truncate(flags),
        child_level,
        blend_mode,
        opacity,
    })
}

fn parse_blend_mode(id: u16) -> Result<BlendMode> {
    match id {
        0 => Ok(BlendMode::Normal),
        1 => Ok(BlendMode::Multiply),
        2 => Ok(BlendMode::Screen),
        3 => Ok(BlendMode::Overlay),
        4 => Ok(BlendMode::Darken),
        5 => Ok(BlendMode::Lighten),
        6 => Ok(BlendMode::ColorDodge),
        7 => Ok(BlendMode::ColorBurn),
        8 => Ok(BlendMode::HardLight),
        9 => Ok(BlendMode::SoftLight),
        10 => Ok(BlendMode::Difference),
        11 => Ok(BlendMode::Exclusion),
        12 => Ok(BlendMode::Hue),
        13 => Ok(BlendMode::Saturation),
        14 => Ok(BlendMode::Color),
        15 => Ok(BlendMode::Luminosity),
        16 => Ok(BlendMode::Addition),
        17 => Ok(BlendMode::Subtract),
        18 => Ok(BlendMode::Divide),
        _ => Err(AseError::BadHeader(format!(
            "invalid blend mode: {}",
            id
        ))),
    }
}

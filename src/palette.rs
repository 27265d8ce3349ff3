use crate::cursor::ByteCursor;
use crate::{AseError, Result};
use log::debug;
use nohash::IntMap;

/// A sparse mapping from color index to an RGBA quad.
///
/// Entries are sparse on purpose: palette chunks only cover the index range
/// they declare, and nothing forces that range to start at zero. Indexed
/// documents resolve pixels through the *effective* palette, which is the
/// palette state of frame 0 (see [AseDocument::palette](crate::AseDocument::palette)).
#[derive(Debug, Clone, Default)]
pub struct Palette {
    entries: IntMap<u32, [u8; 4]>,
}

impl Palette {
    /// Number of populated entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no entry is populated.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up the `[r, g, b, a]` quad at `index`.
    pub fn get(&self, index: u32) -> Option<[u8; 4]> {
        self.entries.get(&index).copied()
    }

    /// Set the `[r, g, b, a]` quad at `index`, replacing any previous value.
    pub fn set(&mut self, index: u32, rgba: [u8; 4]) {
        self.entries.insert(index, rgba);
    }

    /// All `(index, rgba)` pairs, in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, [u8; 4])> + '_ {
        self.entries.iter().map(|(index, rgba)| (*index, *rgba))
    }

    /// Smallest and largest populated index at or below `cap`, `None` when
    /// no entry lands in that range.
    pub(crate) fn index_range(&self, cap: u32) -> Option<(u32, u32)> {
        let mut keys = self.entries.keys().filter(|&&index| index <= cap);
        let first = *keys.next()?;
        Some(keys.fold((first, first), |(lo, hi), k| (lo.min(*k), hi.max(*k))))
    }
}

/// Old palette chunk (0x0004): packets of consecutive RGB triples without
/// alpha. Alpha becomes opaque, except at the transparent index of an
/// indexed document which becomes fully transparent.
pub(crate) fn parse_old_palette_chunk(
    cursor: &mut ByteCursor,
    palette: &mut Palette,
    transparent_index: Option<u32>,
) -> Result<()> {
    let packets = cursor.word()?;
    for _ in 0..packets {
        let first_index = cursor.byte()? as u32;
        let count = cursor.byte()? as u32;
        for offset in 0..count {
            let index = first_index + offset;
            let red = cursor.byte()?;
            let green = cursor.byte()?;
            let blue = cursor.byte()?;
            let alpha = if Some(index) == transparent_index { 0 } else { 255 };
            palette.set(index, [red, green, blue, alpha]);
        }
    }
    Ok(())
}

/// New palette chunk (0x2019): a declared index range of RGBA entries.
/// Per-color names are read and discarded.
pub(crate) fn parse_palette_chunk(cursor: &mut ByteCursor, palette: &mut Palette) -> Result<()> {
    let _declared_size = cursor.dword()?;
    let first_index = cursor.dword()?;
    let last_index = cursor.dword()?;
    cursor.skip_reserved(8)?;

    if last_index < first_index {
        return Err(AseError::BadHeader(format!(
            "bad palette chunk index range: first={} last={}",
            first_index, last_index
        )));
    }

    for index in first_index..=last_index {
        let flags = cursor.word()?;
        let red = cursor.byte()?;
        let green = cursor.byte()?;
        let blue = cursor.byte()?;
        let alpha = cursor.byte()?;
        palette.set(index, [red, green, blue, alpha]);
        if flags & 1 != 0 {
            let name = cursor.string()?;
            debug!("ignoring name {:?} for palette color {}", name, index);
        }
    }
    Ok(())
}

#[test]
fn old_palette_packet_is_opaque_by_default() {
    // One packet: skip 10 entries, then 3 colors.
    let data = [
        0x01, 0x00, 10, 3, 1, 2, 3, 4, 5, 6, 7, 8, 9,
    ];
    let mut palette = Palette::default();
    parse_old_palette_chunk(&mut ByteCursor::new(&data), &mut palette, None).unwrap();
    assert_eq!(palette.len(), 3);
    assert_eq!(palette.get(9), None);
    assert_eq!(palette.get(10), Some([1, 2, 3, 255]));
    assert_eq!(palette.get(11), Some([4, 5, 6, 255]));
    assert_eq!(palette.get(12), Some([7, 8, 9, 255]));
    assert_eq!(palette.get(13), None);
}

#[test]
fn old_palette_clears_alpha_at_transparent_index() {
    let data = [
        0x01, 0x00, 10, 3, 1, 2, 3, 4, 5, 6, 7, 8, 9,
    ];
    let mut palette = Palette::default();
    parse_old_palette_chunk(&mut ByteCursor::new(&data), &mut palette, Some(11)).unwrap();
    assert_eq!(palette.get(10), Some([1, 2, 3, 255]));
    assert_eq!(palette.get(11), Some([4, 5, 6, 0]));
    assert_eq!(palette.get(12), Some([7, 8, 9, 255]));
}

#[test]
fn palette_index_range_spans_sparse_entries() {
    let mut palette = Palette::default();
    assert_eq!(palette.index_range(u32::MAX), None);
    palette.set(7, [0, 0, 0, 255]);
    palette.set(3, [0, 0, 0, 255]);
    palette.set(200, [0, 0, 0, 255]);
    assert_eq!(palette.index_range(u32::MAX), Some((3, 200)));
    // Entries past the cap do not stretch the range.
    assert_eq!(palette.index_range(100), Some((3, 7)));
    assert_eq!(palette.index_range(2), None);
}

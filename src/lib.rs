#![warn(clippy::all)]
#![warn(missing_docs)]
/*!

Decode, encode and flatten [Aseprite](https://www.aseprite.org/) files. This
library works directly on the binary `.ase` / `.aseprite` format ([file
format documentation][format-docs]); no JSON export step is needed, so
sprites can be loaded straight from the files an artist saves.

All three color depths are supported (RGBA, grayscale, indexed), as are
multiple frames, layer opacity and visibility, linked cels and per-cel
z-index stacking. Unknown chunk types from newer Aseprite versions are
skipped, so files from future versions still decode.

[format-docs]: https://github.com/aseprite/aseprite/blob/master/docs/ase-file-specs.md

# Basic Usage

## Decode and flatten

The easiest way is [AseDocument::read_file] (or [AseDocument::decode] for
bytes already in memory), then [AseDocument::flatten_rgba] for the
composited image of a frame as an `image::RgbaImage` from the
[image](https://docs.rs/image) library.

```
use asecodec::AseDocument;
use image::RgbaImage;

let sprite = RgbaImage::from_pixel(16, 16, image::Rgba([255, 0, 0, 255]));
let bytes = AseDocument::from_image(&sprite).encode().unwrap();

let doc = AseDocument::decode(&bytes).unwrap();
println!("Size: {}x{}", doc.width(), doc.height());
println!("Frames: {}", doc.num_frames());

let flat = doc.flatten_rgba(0).unwrap();
assert_eq!(flat.get_pixel(0, 0), &image::Rgba([255, 0, 0, 255]));
```

For the common decode-then-flatten case there is also the one-step
[AseDocument::decode_image].

## Inspect the document

Frames expose their layer table and cels; indexed documents also carry a
[Palette].

```
# use asecodec::AseDocument;
# use image::RgbaImage;
# let sprite = RgbaImage::new(16, 16);
# let bytes = AseDocument::from_image(&sprite).encode().unwrap();
# let doc = AseDocument::decode(&bytes).unwrap();
let frame = doc.frame(0);
println!("Frame lasts {} ms", frame.duration());
for layer in frame.layers() {
    println!("Layer {:?} visible: {}", layer.name(), layer.is_visible());
}
for cel in frame.cels() {
    println!("Cel on layer {} at {},{}", cel.layer_index(), cel.x(), cel.y());
}
```

## Encode

A document round-trips through [AseDocument::encode] /
[AseDocument::save_file]. [AseDocument::from_image] wraps a plain raster
into a single-frame RGBA document first.

```no_run
use asecodec::AseDocument;
use image::RgbaImage;
use std::path::Path;

let sprite = RgbaImage::new(32, 32);
let doc = AseDocument::from_image(&sprite);
doc.save_file(Path::new("sprite.aseprite")).unwrap();
```

*/

pub(crate) mod cel;
pub(crate) mod compositor;
pub(crate) mod cursor;
pub(crate) mod document;
pub(crate) mod encoder;
pub(crate) mod error;
pub(crate) mod layer;
pub(crate) mod palette;
pub(crate) mod parse;

/// A specialized `Result` type for codec operations.
pub type Result<T> = std::result::Result<T, AseError>;

pub use cel::{Cel, CelContent, ImageData};
pub use document::{AseDocument, ColorDepth, Frame, Grid, PixelAspect};
pub use error::AseError;
pub use layer::{BlendMode, Layer, LayerFlags, LayerKind};
pub use palette::Palette;

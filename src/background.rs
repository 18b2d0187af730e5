//! Background color resolution.
//!
//! A run composites transparency against at most one background color. It
//! comes from the caller's override, or from the file's bKGD chunk when the
//! caller opted in, or not at all (transparency is then stripped).

use rgb::Rgb;

use crate::color::ColorTables;
use crate::info::{ColorModel, FileBackground, SourceDescriptor, SourceMetadata};
use crate::samples::scale_to_8;

/// Where the applied background came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BackgroundSource {
    /// Caller-supplied override.
    Override,
    /// The file's bKGD chunk.
    File,
}

/// The applied background, in all three representations.
///
/// Linear and destination forms are derived from the tables once, at
/// construction, and never recomputed elsewhere.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Background {
    origin: BackgroundSource,
    source: Rgb<u8>,
    destination: Rgb<u8>,
    linear: Rgb<f64>,
}

impl Background {
    /// Background given in the source's encoding.
    pub fn from_source(color: Rgb<u8>, tables: &ColorTables) -> Self {
        Self {
            origin: BackgroundSource::File,
            source: color,
            destination: Rgb {
                r: tables.src_to_dst(color.r),
                g: tables.src_to_dst(color.g),
                b: tables.src_to_dst(color.b),
            },
            linear: Rgb {
                r: tables.src_to_linear(color.r),
                g: tables.src_to_linear(color.g),
                b: tables.src_to_linear(color.b),
            },
        }
    }

    /// Background given in the destination (sRGB) encoding.
    pub fn from_destination(color: Rgb<u8>, tables: &ColorTables) -> Self {
        Self {
            origin: BackgroundSource::Override,
            source: Rgb {
                r: tables.dst_to_src(color.r),
                g: tables.dst_to_src(color.g),
                b: tables.dst_to_src(color.b),
            },
            destination: color,
            linear: Rgb {
                r: tables.dst_to_linear(color.r),
                g: tables.dst_to_linear(color.g),
                b: tables.dst_to_linear(color.b),
            },
        }
    }

    /// Where this background came from.
    pub fn origin(&self) -> BackgroundSource {
        self.origin
    }

    /// Source-encoded color.
    pub fn source(&self) -> Rgb<u8> {
        self.source
    }

    /// Destination-encoded color. This is what a host paints around the image.
    pub fn destination(&self) -> Rgb<u8> {
        self.destination
    }

    /// Linear-light color used for compositing.
    pub fn linear(&self) -> Rgb<f64> {
        self.linear
    }

    /// Whether all three destination channels are equal.
    pub fn is_gray(&self) -> bool {
        let c = self.destination;
        c.r == c.g && c.r == c.b
    }
}

/// Pick the run's background.
///
/// Priority: `override_color`, then the file's bKGD if `use_file` is set,
/// then none.
pub fn resolve(
    override_color: Option<Rgb<u8>>,
    use_file: bool,
    descriptor: &SourceDescriptor,
    metadata: &SourceMetadata,
    tables: &ColorTables,
) -> Option<Background> {
    if let Some(color) = override_color {
        return Some(Background::from_destination(color, tables));
    }
    if !use_file {
        return None;
    }
    let color = file_background_to_source(metadata.background?, descriptor)?;
    Some(Background::from_source(color, tables))
}

/// Reduce a bKGD value to 8-bit source-encoded RGB.
///
/// Gray below 8 bits is rescaled by the channel's range, 16-bit values keep
/// their high byte, palette indices are looked up. Returns `None` when the
/// chunk doesn't fit the image (wrong kind for the model, index out of range).
pub fn file_background_to_source(
    background: FileBackground,
    descriptor: &SourceDescriptor,
) -> Option<Rgb<u8>> {
    let depth = descriptor.bit_depth;
    match (descriptor.color_model, background) {
        (ColorModel::Gray | ColorModel::GrayAlpha, FileBackground::Gray(v)) => {
            let g = scale_to_8(v, depth);
            Some(Rgb { r: g, g, b: g })
        }
        (ColorModel::Truecolor | ColorModel::TruecolorAlpha, FileBackground::Rgb(c)) => {
            Some(Rgb {
                r: scale_to_8(c.r, depth),
                g: scale_to_8(c.g, depth),
                b: scale_to_8(c.b, depth),
            })
        }
        (ColorModel::Palette, FileBackground::PaletteIndex(i)) => {
            descriptor.palette.get(i as usize).copied()
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::CorrectionMode;

    fn gray(depth: u8) -> SourceDescriptor {
        SourceDescriptor::new(1, 1, depth, ColorModel::GrayAlpha)
    }

    #[test]
    fn override_wins_over_file() {
        let t = ColorTables::new(CorrectionMode::Disabled);
        let meta = SourceMetadata::none().with_background(FileBackground::Gray(0));
        let bg = resolve(Some(Rgb { r: 0, g: 255, b: 0 }), true, &gray(8), &meta, &t).unwrap();
        assert_eq!(bg.origin(), BackgroundSource::Override);
        assert_eq!(bg.destination(), Rgb { r: 0, g: 255, b: 0 });
        assert_eq!(bg.linear(), Rgb { r: 0.0, g: 1.0, b: 0.0 });
        assert!(!bg.is_gray());
    }

    #[test]
    fn file_background_requires_opt_in() {
        let t = ColorTables::new(CorrectionMode::Disabled);
        let meta = SourceMetadata::none().with_background(FileBackground::Gray(100));
        assert!(resolve(None, false, &gray(8), &meta, &t).is_none());
        let bg = resolve(None, true, &gray(8), &meta, &t).unwrap();
        assert_eq!(bg.origin(), BackgroundSource::File);
        assert_eq!(bg.source(), Rgb { r: 100, g: 100, b: 100 });
        assert!(bg.is_gray());
    }

    #[test]
    fn no_background_anywhere() {
        let t = ColorTables::new(CorrectionMode::Disabled);
        assert!(resolve(None, true, &gray(8), &SourceMetadata::none(), &t).is_none());
    }

    #[test]
    fn low_depth_gray_is_rescaled() {
        assert_eq!(scale_to_8(1, 1), 255);
        assert_eq!(scale_to_8(2, 2), 170);
        assert_eq!(scale_to_8(7, 4), 119);
        assert_eq!(scale_to_8(0xABCD, 16), 0xAB);
        assert_eq!(scale_to_8(200, 8), 200);
    }

    #[test]
    fn sixteen_bit_rgb_keeps_high_byte() {
        let d = SourceDescriptor::new(1, 1, 16, ColorModel::Truecolor);
        let c = file_background_to_source(
            FileBackground::Rgb(Rgb {
                r: 0xFF00,
                g: 0x80FF,
                b: 0x0001,
            }),
            &d,
        );
        assert_eq!(c, Some(Rgb { r: 0xFF, g: 0x80, b: 0x00 }));
    }

    #[test]
    fn palette_index_is_looked_up() {
        let d = SourceDescriptor::new(1, 1, 8, ColorModel::Palette).with_palette(vec![
            Rgb { r: 1, g: 2, b: 3 },
            Rgb { r: 4, g: 5, b: 6 },
        ]);
        assert_eq!(
            file_background_to_source(FileBackground::PaletteIndex(1), &d),
            Some(Rgb { r: 4, g: 5, b: 6 })
        );
        assert_eq!(file_background_to_source(FileBackground::PaletteIndex(2), &d), None);
    }

    #[test]
    fn mismatched_chunk_kind_is_ignored() {
        let d = SourceDescriptor::new(1, 1, 8, ColorModel::Truecolor);
        assert_eq!(file_background_to_source(FileBackground::Gray(3), &d), None);
    }

    #[test]
    fn representations_come_from_tables() {
        let t = ColorTables::new(CorrectionMode::Gamma(1.0));
        let bg = Background::from_source(Rgb { r: 51, g: 0, b: 255 }, &t);
        assert_eq!(bg.destination(), Rgb { r: 124, g: 0, b: 255 });
        assert_eq!(bg.linear().r, t.src_to_linear(51));

        let bg = Background::from_destination(Rgb { r: 124, g: 124, b: 124 }, &t);
        assert_eq!(bg.source(), Rgb { r: 51, g: 51, b: 51 });
        assert!(bg.is_gray());
    }
}

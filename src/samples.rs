//! Source row unpacking.
//!
//! Source rows arrive at native depth: packed for 1/2/4-bit samples,
//! big-endian pairs for 16-bit. Strategies work on 8-bit samples in a
//! [`WorkingLayout`], so every row is normalized here first.

use rgb::Rgb;

use crate::error::{Error, Result};
use crate::info::{ColorModel, SourceDescriptor, Transparency};
use crate::strategy::WorkingLayout;

/// Read sample `index` from a native-depth row.
///
/// Callers guarantee the row is long enough.
#[inline]
pub fn sample_at(row: &[u8], depth: u8, index: usize) -> u16 {
    match depth {
        16 => u16::from_be_bytes([row[index * 2], row[index * 2 + 1]]),
        8 => row[index] as u16,
        d => {
            let bit = index * d as usize;
            let shift = 8 - d as usize - bit % 8;
            let mask = (1u16 << d) - 1;
            (row[bit / 8] as u16 >> shift) & mask
        }
    }
}

/// Scale a native sample to 8 bits.
///
/// Low depths replicate their range onto 0..=255; 16-bit keeps the high byte.
#[inline]
pub fn scale_to_8(v: u16, depth: u8) -> u8 {
    match depth {
        16 => (v >> 8) as u8,
        8 => v.min(255) as u8,
        d => {
            let max = (1u32 << d) - 1;
            ((v as u32 * 255) / max).min(255) as u8
        }
    }
}

/// Color key compared against native samples.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Key {
    Gray(u16),
    Rgb(Rgb<u16>),
}

/// Converts native source rows to 8-bit working rows.
#[derive(Clone, Debug)]
pub struct RowUnpacker {
    model: ColorModel,
    depth: u8,
    width: usize,
    row_bytes: usize,
    layout: WorkingLayout,
    key: Option<Key>,
}

impl RowUnpacker {
    /// Unpacker producing `layout` rows from sources described by `descriptor`.
    pub fn new(
        descriptor: &SourceDescriptor,
        transparency: Option<&Transparency>,
        layout: WorkingLayout,
    ) -> Result<Self> {
        let model = descriptor.color_model;
        let key = match (model, transparency) {
            (ColorModel::Gray, Some(Transparency::GrayKey(k))) => Some(Key::Gray(*k)),
            (ColorModel::Truecolor, Some(Transparency::RgbKey(k))) => Some(Key::Rgb(*k)),
            _ => None,
        };
        let compatible = match layout {
            WorkingLayout::Gray | WorkingLayout::GrayAlpha => model.is_grayscale(),
            WorkingLayout::Rgb | WorkingLayout::Rgba => {
                matches!(model, ColorModel::Truecolor | ColorModel::TruecolorAlpha)
            }
            WorkingLayout::Indexed => model == ColorModel::Palette,
        };
        if !compatible {
            return Err(Error::internal(format!(
                "cannot unpack {model:?} rows as {layout:?}"
            )));
        }
        Ok(Self {
            model,
            depth: descriptor.bit_depth,
            width: descriptor.width as usize,
            row_bytes: descriptor.row_bytes(),
            layout,
            key,
        })
    }

    /// Bytes in one working row.
    pub fn working_row_bytes(&self) -> usize {
        match self.layout {
            WorkingLayout::Indexed => self.row_bytes,
            l => self.width * l.samples(),
        }
    }

    /// Normalize one native row into `dst`.
    ///
    /// A `src` shorter than a full row means the stream was truncated.
    pub fn unpack(&self, src: &[u8], dst: &mut [u8]) -> Result<()> {
        if src.len() < self.row_bytes {
            return Err(Error::malformed(format!(
                "Invalid PNG image: row has {} bytes, expected {}",
                src.len(),
                self.row_bytes
            )));
        }
        let out_len = self.working_row_bytes();
        let Some(dst) = dst.get_mut(..out_len) else {
            return Err(Error::internal("working row too small"));
        };

        let depth = self.depth;
        let channels = self.model.channels();
        let px = |x: usize, c: usize| sample_at(src, depth, x * channels + c);

        match self.layout {
            WorkingLayout::Indexed => dst.copy_from_slice(&src[..out_len]),
            WorkingLayout::Gray => {
                for (x, out) in dst.iter_mut().enumerate() {
                    *out = scale_to_8(px(x, 0), depth);
                }
            }
            WorkingLayout::GrayAlpha => {
                for (x, out) in dst.chunks_exact_mut(2).enumerate() {
                    let g = px(x, 0);
                    out[0] = scale_to_8(g, depth);
                    out[1] = match (self.model, self.key) {
                        (ColorModel::GrayAlpha, _) => scale_to_8(px(x, 1), depth),
                        (_, Some(Key::Gray(k))) if k == g => 0,
                        _ => 255,
                    };
                }
            }
            WorkingLayout::Rgb => {
                for (x, out) in dst.chunks_exact_mut(3).enumerate() {
                    for (c, o) in out.iter_mut().enumerate() {
                        *o = scale_to_8(px(x, c), depth);
                    }
                }
            }
            WorkingLayout::Rgba => {
                for (x, out) in dst.chunks_exact_mut(4).enumerate() {
                    let (r, g, b) = (px(x, 0), px(x, 1), px(x, 2));
                    out[0] = scale_to_8(r, depth);
                    out[1] = scale_to_8(g, depth);
                    out[2] = scale_to_8(b, depth);
                    out[3] = match (self.model, self.key) {
                        (ColorModel::TruecolorAlpha, _) => scale_to_8(px(x, 3), depth),
                        (_, Some(Key::Rgb(k))) if k == (Rgb { r, g, b }) => 0,
                        _ => 255,
                    };
                }
            }
        }
        Ok(())
    }
}

/// Repack `width` 2-bit indices from `src` into 4-bit indices in `dst`.
///
/// One index per nibble, high nibble first. `dst` must hold
/// `width.div_ceil(2)` bytes; bytes past that are left alone.
pub fn repack_2bit_to_4bit(src: &[u8], dst: &mut [u8], width: usize) {
    dst[..width.div_ceil(2)].fill(0);
    for i in 0..width {
        let index = sample_at(src, 2, i) as u8;
        dst[i / 2] |= index << (4 * (1 - i % 2));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_packed_samples_msb_first() {
        let row = [0b1011_0001];
        assert_eq!(sample_at(&row, 1, 0), 1);
        assert_eq!(sample_at(&row, 1, 1), 0);
        assert_eq!(sample_at(&row, 1, 7), 1);
        assert_eq!(sample_at(&row, 2, 0), 0b10);
        assert_eq!(sample_at(&row, 2, 3), 0b01);
        assert_eq!(sample_at(&row, 4, 0), 0b1011);
        assert_eq!(sample_at(&row, 4, 1), 0b0001);
        assert_eq!(sample_at(&[0x12, 0x34], 16, 0), 0x1234);
    }

    #[test]
    fn scaling_replicates_range() {
        assert_eq!(scale_to_8(0, 1), 0);
        assert_eq!(scale_to_8(1, 1), 255);
        assert_eq!(scale_to_8(1, 2), 85);
        assert_eq!(scale_to_8(15, 4), 255);
        assert_eq!(scale_to_8(0xFF80, 16), 0xFF);
    }

    #[test]
    fn one_bit_gray_expands_to_full_range() {
        let d = SourceDescriptor::new(3, 1, 1, ColorModel::Gray);
        let u = RowUnpacker::new(&d, None, WorkingLayout::Gray).unwrap();
        let mut out = [9u8; 3];
        u.unpack(&[0b0100_0000], &mut out).unwrap();
        assert_eq!(out, [0, 255, 0]);
    }

    #[test]
    fn gray_key_becomes_alpha() {
        let d = SourceDescriptor::new(4, 1, 4, ColorModel::Gray).with_transparency(true);
        let trns = Transparency::GrayKey(3);
        let u = RowUnpacker::new(&d, Some(&trns), WorkingLayout::GrayAlpha).unwrap();
        let mut out = [0u8; 8];
        u.unpack(&[0x3F, 0x03], &mut out).unwrap();
        assert_eq!(out, [51, 0, 255, 255, 0, 255, 51, 0]);
    }

    #[test]
    fn sixteen_bit_gray_alpha_strips_and_keeps_alpha() {
        let d = SourceDescriptor::new(1, 1, 16, ColorModel::GrayAlpha);
        let src = [0xAB, 0xCD, 0x80, 0x00];
        let strip = RowUnpacker::new(&d, None, WorkingLayout::Gray).unwrap();
        let mut g = [0u8; 1];
        strip.unpack(&src, &mut g).unwrap();
        assert_eq!(g, [0xAB]);

        let keep = RowUnpacker::new(&d, None, WorkingLayout::GrayAlpha).unwrap();
        let mut ga = [0u8; 2];
        keep.unpack(&src, &mut ga).unwrap();
        assert_eq!(ga, [0xAB, 0x80]);
    }

    #[test]
    fn rgb_key_matches_at_native_depth() {
        let d = SourceDescriptor::new(2, 1, 16, ColorModel::Truecolor).with_transparency(true);
        // Same high bytes, different low bytes: only the exact match is transparent.
        let trns = Transparency::RgbKey(Rgb {
            r: 0x0101,
            g: 0x0202,
            b: 0x0303,
        });
        let src = [1, 1, 2, 2, 3, 3, 1, 0, 2, 2, 3, 3];
        let u = RowUnpacker::new(&d, Some(&trns), WorkingLayout::Rgba).unwrap();
        let mut out = [0u8; 8];
        u.unpack(&src, &mut out).unwrap();
        assert_eq!(out, [1, 2, 3, 0, 1, 2, 3, 255]);
    }

    #[test]
    fn rgba_strips_to_rgb() {
        let d = SourceDescriptor::new(2, 1, 8, ColorModel::TruecolorAlpha);
        let u = RowUnpacker::new(&d, None, WorkingLayout::Rgb).unwrap();
        let mut out = [0u8; 6];
        u.unpack(&[1, 2, 3, 4, 5, 6, 7, 8], &mut out).unwrap();
        assert_eq!(out, [1, 2, 3, 5, 6, 7]);
    }

    #[test]
    fn short_row_is_malformed() {
        let d = SourceDescriptor::new(4, 1, 8, ColorModel::Truecolor);
        let u = RowUnpacker::new(&d, None, WorkingLayout::Rgb).unwrap();
        let mut out = [0u8; 12];
        let err = u.unpack(&[0; 11], &mut out).unwrap_err();
        assert_eq!(err.code(), crate::ErrorCode::Malformed);
    }

    #[test]
    fn incompatible_layout_is_rejected() {
        let d = SourceDescriptor::new(1, 1, 8, ColorModel::Gray);
        assert!(RowUnpacker::new(&d, None, WorkingLayout::Rgb).is_err());
    }

    #[test]
    fn repack_puts_one_index_per_nibble() {
        // Indices 3, 0, 1, 2 | 1
        let src = [0b1100_0110, 0b0100_0000];
        let mut dst = [0xFFu8; 3];
        repack_2bit_to_4bit(&src, &mut dst, 5);
        assert_eq!(dst, [0x30, 0x12, 0x10]);
    }
}

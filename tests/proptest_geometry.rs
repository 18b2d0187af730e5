//! Property tests for buffer geometry, lookup tables, repacking and compositing.

use proptest::prelude::*;
use zendib::{
    ColorModel, ColorTables, ConvertConfig, CorrectionMode, Geometry, Rgb, SourceDescriptor,
    SourceMetadata, row_stride,
};

fn bpp() -> impl Strategy<Value = u16> {
    prop_oneof![Just(1u16), Just(4), Just(8), Just(24)]
}

proptest! {
    #[test]
    fn stride_is_aligned_and_minimal(width in 1u32..200_000, bits in bpp()) {
        let stride = row_stride(width, bits);
        let needed = (width as u64 * bits as u64).div_ceil(8);
        prop_assert_eq!(stride % 4, 0);
        prop_assert!(stride >= needed);
        prop_assert!(stride - needed < 4);
    }

    #[test]
    fn geometry_adds_up(width in 1u32..4096, height in 1u32..4096, bits in bpp()) {
        let palette = if bits == 24 { 0 } else { 1usize << bits.min(8) };
        let g = Geometry::new(width, height, bits, palette).unwrap();
        prop_assert_eq!(g.pixel_offset, 40 + palette * 4);
        prop_assert_eq!(g.total_size, g.pixel_offset + g.stride * height as usize);
    }

    #[test]
    fn repack_keeps_every_index(indices in prop::collection::vec(0u8..4, 1..64)) {
        let width = indices.len();
        let mut packed = vec![0u8; width.div_ceil(4)];
        for (i, &v) in indices.iter().enumerate() {
            packed[i / 4] |= v << (6 - 2 * (i % 4));
        }
        let mut out = vec![0u8; width.div_ceil(2)];
        zendib::repack_2bit_to_4bit(&packed, &mut out, width);
        for (i, &v) in indices.iter().enumerate() {
            let nibble = if i % 2 == 0 { out[i / 2] >> 4 } else { out[i / 2] & 0x0F };
            prop_assert_eq!(nibble, v);
        }
        if width % 2 == 1 {
            prop_assert_eq!(out[width / 2] & 0x0F, 0);
        }
    }

    #[test]
    fn gamma_tables_are_monotonic(gamma in 0.05f64..8.0) {
        let t = ColorTables::new(CorrectionMode::Gamma(gamma));
        prop_assert_eq!(t.src_to_dst(0), 0);
        prop_assert_eq!(t.src_to_dst(255), 255);
        for n in 1..=255u8 {
            prop_assert!(t.src_to_dst(n) >= t.src_to_dst(n - 1));
            prop_assert!(t.src_to_linear(n) >= t.src_to_linear(n - 1));
        }
    }

    #[test]
    fn transparent_pixels_are_exactly_the_background(
        rgb in any::<[u8; 3]>(),
        bg in any::<[u8; 3]>(),
        correct in any::<bool>(),
    ) {
        let d = SourceDescriptor::new(1, 1, 8, ColorModel::TruecolorAlpha);
        let mut s = zendib::RawSource::new(
            d,
            SourceMetadata::none(),
            vec![rgb[0], rgb[1], rgb[2], 0],
        )
        .unwrap();
        let out = ConvertConfig::new()
            .with_color_correction(correct)
            .with_background(Rgb { r: bg[0], g: bg[1], b: bg[2] })
            .convert(&mut s)
            .unwrap();
        prop_assert_eq!(out.dib().row(0), Some(&[bg[2], bg[1], bg[0]][..]));
    }

    #[test]
    fn opaque_pixels_keep_their_color_without_correction(rgb in any::<[u8; 3]>()) {
        let d = SourceDescriptor::new(1, 1, 8, ColorModel::TruecolorAlpha);
        let mut s = zendib::RawSource::new(
            d,
            SourceMetadata::none(),
            vec![rgb[0], rgb[1], rgb[2], 255],
        )
        .unwrap();
        let out = ConvertConfig::new()
            .with_background(Rgb { r: 1, g: 2, b: 3 })
            .convert(&mut s)
            .unwrap();
        prop_assert_eq!(out.dib().row(0), Some(&[rgb[2], rgb[1], rgb[0]][..]));
    }
}

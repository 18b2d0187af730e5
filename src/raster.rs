//! DIB buffer geometry and assembly.
//!
//! The output is one contiguous allocation: a 40-byte `BITMAPINFOHEADER`,
//! the palette as B,G,R,0 quads, then the pixel rows. Rows are padded to a
//! multiple of 4 bytes and stored bottom-up. [`RowTargets`] hands the rows to
//! strategies in source (top-down) order so nothing downstream has to care.

use rgb::alt::BGRA;

use crate::error::{Error, Result};
use crate::info::Density;
use crate::output::{Dib, DibHeader};

/// Size of `BITMAPINFOHEADER`.
pub const HEADER_SIZE: usize = 40;

/// Size of `BITMAPFILEHEADER`, prepended only when writing a `.bmp` file.
pub const FILE_HEADER_SIZE: usize = 14;

/// Size of one palette entry (`RGBQUAD`).
pub const PALETTE_ENTRY_SIZE: usize = 4;

/// Resolution written when the source carries no valid density.
pub const DEFAULT_RESOLUTION: i32 = 72;

/// `biCompression` value for uncompressed pixels.
pub const BI_RGB: u32 = 0;

/// Bytes per DIB row: `ceil(width * bpp / 32) * 4`.
pub fn row_stride(width: u32, bits_per_pixel: u16) -> u64 {
    (width as u64 * bits_per_pixel as u64).div_ceil(32) * 4
}

/// Layout of one DIB buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub struct Geometry {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// 1, 4, 8 or 24.
    pub bits_per_pixel: u16,
    /// Bytes per padded row.
    pub stride: usize,
    /// Number of palette quads.
    pub palette_entries: usize,
    /// Offset of the first pixel byte from the start of the header.
    pub pixel_offset: usize,
    /// Header + palette + pixels.
    pub total_size: usize,
}

impl Geometry {
    /// Compute the layout, rejecting sizes the DIB header fields cannot hold.
    pub fn new(width: u32, height: u32, bits_per_pixel: u16, palette_entries: usize) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::malformed(format!(
                "Invalid PNG image: {width}x{height} has no pixels"
            )));
        }
        if width > i32::MAX as u32 || height > i32::MAX as u32 {
            return Err(Error::unsupported(format!(
                "Unsupported image type: {width}x{height} exceeds DIB dimensions"
            )));
        }
        if !matches!(bits_per_pixel, 1 | 4 | 8 | 24) {
            return Err(Error::internal(format!(
                "no DIB format for {bits_per_pixel} bits per pixel"
            )));
        }
        if palette_entries > 256 {
            return Err(Error::internal(format!(
                "{palette_entries} palette entries"
            )));
        }

        let stride = row_stride(width, bits_per_pixel);
        let pixel_offset = (HEADER_SIZE + palette_entries * PALETTE_ENTRY_SIZE) as u64;
        let total = stride
            .checked_mul(height as u64)
            .and_then(|pixels| pixels.checked_add(pixel_offset))
            .filter(|&total| total + FILE_HEADER_SIZE as u64 <= u32::MAX as u64)
            .ok_or_else(|| {
                Error::with_detail(
                    crate::ErrorCode::OutOfMemory,
                    format!("Unable to allocate memory: {width}x{height} at {bits_per_pixel} bpp"),
                )
            })?;
        let total_size = usize::try_from(total).map_err(|_| Error::out_of_memory(usize::MAX))?;

        Ok(Self {
            width,
            height,
            bits_per_pixel,
            stride: stride as usize,
            palette_entries,
            pixel_offset: pixel_offset as usize,
            total_size,
        })
    }

    /// Bytes of pixel data (`biSizeImage`).
    pub fn image_size(&self) -> usize {
        self.stride * self.height as usize
    }

    /// Bytes actually covered by pixels in each row, before padding.
    pub fn row_bytes(&self) -> usize {
        (self.width as u64 * self.bits_per_pixel as u64).div_ceil(8) as usize
    }
}

/// Allocates the output buffer and fills everything but the pixels.
pub struct RasterAssembler {
    geometry: Geometry,
    buf: Vec<u8>,
}

impl RasterAssembler {
    /// Allocate a zeroed buffer for `geometry`.
    pub fn allocate(geometry: Geometry) -> Result<Self> {
        let mut buf = Vec::new();
        buf.try_reserve_exact(geometry.total_size)
            .map_err(|_| Error::out_of_memory(geometry.total_size))?;
        buf.resize(geometry.total_size, 0);
        Ok(Self { geometry, buf })
    }

    /// Fill the palette with the 256-entry ramp `k = (k, k, k)`.
    pub fn write_grayscale_ramp(&mut self) -> Result<()> {
        if self.geometry.palette_entries != 256 {
            return Err(Error::internal(format!(
                "grayscale ramp needs 256 entries, buffer has {}",
                self.geometry.palette_entries
            )));
        }
        for (k, quad) in self.palette_region().chunks_exact_mut(PALETTE_ENTRY_SIZE).enumerate() {
            quad[..3].fill(k as u8);
        }
        Ok(())
    }

    /// Write palette entries. The reserved byte of each quad is always 0.
    pub fn write_palette(&mut self, entries: &[BGRA<u8>]) -> Result<()> {
        if entries.len() != self.geometry.palette_entries {
            return Err(Error::internal(format!(
                "palette has {} entries, DIB expects {}",
                entries.len(),
                self.geometry.palette_entries
            )));
        }
        for (quad, e) in self
            .palette_region()
            .chunks_exact_mut(PALETTE_ENTRY_SIZE)
            .zip(entries)
        {
            quad.copy_from_slice(&[e.b, e.g, e.r, 0]);
        }
        Ok(())
    }

    /// Row bindings in source order.
    pub fn rows(&mut self) -> Result<RowTargets<'_>> {
        let Geometry {
            stride,
            height,
            pixel_offset,
            ..
        } = self.geometry;
        let mut rows = Vec::new();
        rows.try_reserve_exact(height as usize)?;
        rows.extend(self.buf[pixel_offset..].chunks_exact_mut(stride).rev());
        Ok(RowTargets { rows })
    }

    /// Write the header and hand over the finished buffer.
    pub fn finish(mut self, density: Option<Density>) -> Dib {
        let g = self.geometry;
        let (x, y) = match density {
            Some(d) => (clamp_i32(d.x), clamp_i32(d.y)),
            None => (DEFAULT_RESOLUTION, DEFAULT_RESOLUTION),
        };
        let header = DibHeader {
            size: HEADER_SIZE as u32,
            width: g.width as i32,
            height: g.height as i32,
            planes: 1,
            bit_count: g.bits_per_pixel,
            compression: BI_RGB,
            size_image: g.image_size() as u32,
            x_pels_per_meter: x,
            y_pels_per_meter: y,
            clr_used: g.palette_entries as u32,
            clr_important: 0,
        };
        header.write_to(&mut self.buf[..HEADER_SIZE]);
        Dib::from_parts(self.buf, g, header)
    }

    fn palette_region(&mut self) -> &mut [u8] {
        &mut self.buf[HEADER_SIZE..self.geometry.pixel_offset]
    }
}

fn clamp_i32(v: u32) -> i32 {
    v.min(i32::MAX as u32) as i32
}

/// Mutable DIB rows indexed by source row.
///
/// Row 0 is the top of the image, which is the last row in the buffer.
/// Each slice spans the full padded stride.
pub struct RowTargets<'a> {
    rows: Vec<&'a mut [u8]>,
}

impl RowTargets<'_> {
    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Iterate rows top-down.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut [u8]> {
        self.rows.iter_mut().map(|r| &mut **r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::info::DensityUnit;

    #[test]
    fn stride_is_padded_to_four_bytes() {
        assert_eq!(row_stride(1, 1), 4);
        assert_eq!(row_stride(33, 1), 8);
        assert_eq!(row_stride(3, 4), 4);
        assert_eq!(row_stride(9, 4), 8);
        assert_eq!(row_stride(5, 8), 8);
        assert_eq!(row_stride(1, 24), 4);
        assert_eq!(row_stride(2, 24), 8);
        assert_eq!(row_stride(4, 24), 12);
    }

    #[test]
    fn geometry_totals() {
        let g = Geometry::new(3, 2, 8, 256).unwrap();
        assert_eq!(g.stride, 4);
        assert_eq!(g.pixel_offset, 40 + 1024);
        assert_eq!(g.total_size, 40 + 1024 + 8);
        assert_eq!(g.image_size(), 8);
        assert_eq!(g.row_bytes(), 3);

        let g = Geometry::new(5, 1, 4, 3).unwrap();
        assert_eq!(g.row_bytes(), 3);
        assert_eq!(g.pixel_offset, 52);
    }

    #[test]
    fn geometry_rejects_bad_input() {
        assert_eq!(Geometry::new(0, 1, 8, 0).unwrap_err().code(), ErrorCode::Malformed);
        assert_eq!(
            Geometry::new(u32::MAX, 1, 8, 0).unwrap_err().code(),
            ErrorCode::Unsupported
        );
        assert_eq!(Geometry::new(1, 1, 2, 0).unwrap_err().code(), ErrorCode::Internal);
        assert_eq!(
            Geometry::new(100_000, 100_000, 24, 0).unwrap_err().code(),
            ErrorCode::OutOfMemory
        );
    }

    #[test]
    fn rows_are_bound_bottom_up() {
        let g = Geometry::new(1, 3, 8, 0).unwrap();
        let mut asm = RasterAssembler::allocate(g).unwrap();
        {
            let mut rows = asm.rows().unwrap();
            assert_eq!(rows.len(), 3);
            for (j, row) in rows.iter_mut().enumerate() {
                assert_eq!(row.len(), 4);
                row[0] = j as u8 + 1;
            }
        }
        let dib = asm.finish(None);
        let px = dib.pixel_bytes();
        assert_eq!(&px[0..4], &[3, 0, 0, 0]);
        assert_eq!(&px[4..8], &[2, 0, 0, 0]);
        assert_eq!(&px[8..12], &[1, 0, 0, 0]);
    }

    #[test]
    fn grayscale_ramp_entries() {
        let g = Geometry::new(1, 1, 8, 256).unwrap();
        let mut asm = RasterAssembler::allocate(g).unwrap();
        asm.write_grayscale_ramp().unwrap();
        let dib = asm.finish(None);
        let pal = dib.palette();
        assert_eq!(pal.len(), 256);
        for (k, e) in pal.iter().enumerate() {
            assert_eq!((e.b, e.g, e.r, e.a), (k as u8, k as u8, k as u8, 0));
        }
    }

    #[test]
    fn palette_size_mismatch_is_internal() {
        let g = Geometry::new(1, 1, 8, 2).unwrap();
        let mut asm = RasterAssembler::allocate(g).unwrap();
        let err = asm.write_palette(&[BGRA { b: 0, g: 0, r: 0, a: 0 }]).unwrap_err();
        assert_eq!(err.code(), ErrorCode::Internal);
        assert!(asm.write_grayscale_ramp().is_err());
    }

    #[test]
    fn header_fields() {
        let g = Geometry::new(7, 3, 24, 0).unwrap();
        let dib = RasterAssembler::allocate(g).unwrap().finish(None);
        let h = dib.header();
        assert_eq!(h.size, 40);
        assert_eq!((h.width, h.height), (7, 3));
        assert_eq!(h.planes, 1);
        assert_eq!(h.bit_count, 24);
        assert_eq!(h.compression, BI_RGB);
        assert_eq!(h.size_image, 24 * 3);
        assert_eq!((h.x_pels_per_meter, h.y_pels_per_meter), (72, 72));
        assert_eq!(h.clr_used, 0);
        assert_eq!(h.clr_important, 0);
        assert_eq!(dib.as_bytes().len(), 40 + 72);
    }

    #[test]
    fn density_sets_resolution() {
        let g = Geometry::new(1, 1, 8, 256).unwrap();
        let d = Density::new(2835, 1417, DensityUnit::Meter);
        let dib = RasterAssembler::allocate(g).unwrap().finish(d);
        let h = dib.header();
        assert_eq!((h.x_pels_per_meter, h.y_pels_per_meter), (2835, 1417));
        assert_eq!(h.clr_used, 256);
    }
}

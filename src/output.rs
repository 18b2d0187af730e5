//! Conversion output types.

use imgref::ImgRef;
use rgb::Rgb;
use rgb::alt::BGRA;

use crate::info::Density;
use crate::raster::{FILE_HEADER_SIZE, Geometry, HEADER_SIZE, PALETTE_ENTRY_SIZE};
use crate::strategy::Strategy;

/// `BITMAPINFOHEADER` fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DibHeader {
    /// Header size, always 40.
    pub size: u32,
    /// Width in pixels.
    pub width: i32,
    /// Height in pixels. Positive: rows are stored bottom-up.
    pub height: i32,
    /// Always 1.
    pub planes: u16,
    /// Bits per pixel.
    pub bit_count: u16,
    /// Compression, always `BI_RGB`.
    pub compression: u32,
    /// Bytes of pixel data.
    pub size_image: u32,
    /// Horizontal resolution.
    pub x_pels_per_meter: i32,
    /// Vertical resolution.
    pub y_pels_per_meter: i32,
    /// Palette entries present.
    pub clr_used: u32,
    /// Always 0.
    pub clr_important: u32,
}

impl DibHeader {
    /// Serialize little-endian into the first 40 bytes of `out`.
    pub(crate) fn write_to(&self, out: &mut [u8]) {
        let mut at = 0;
        let mut put = |bytes: &[u8]| {
            out[at..at + bytes.len()].copy_from_slice(bytes);
            at += bytes.len();
        };
        put(&self.size.to_le_bytes());
        put(&self.width.to_le_bytes());
        put(&self.height.to_le_bytes());
        put(&self.planes.to_le_bytes());
        put(&self.bit_count.to_le_bytes());
        put(&self.compression.to_le_bytes());
        put(&self.size_image.to_le_bytes());
        put(&self.x_pels_per_meter.to_le_bytes());
        put(&self.y_pels_per_meter.to_le_bytes());
        put(&self.clr_used.to_le_bytes());
        put(&self.clr_important.to_le_bytes());
    }

    /// Parse a header from the start of `bytes`.
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        let b = bytes.get(..HEADER_SIZE)?;
        let u32_at = |i: usize| u32::from_le_bytes([b[i], b[i + 1], b[i + 2], b[i + 3]]);
        let i32_at = |i: usize| i32::from_le_bytes([b[i], b[i + 1], b[i + 2], b[i + 3]]);
        let u16_at = |i: usize| u16::from_le_bytes([b[i], b[i + 1]]);
        Some(Self {
            size: u32_at(0),
            width: i32_at(4),
            height: i32_at(8),
            planes: u16_at(12),
            bit_count: u16_at(14),
            compression: u32_at(16),
            size_image: u32_at(20),
            x_pels_per_meter: i32_at(24),
            y_pels_per_meter: i32_at(28),
            clr_used: u32_at(32),
            clr_important: u32_at(36),
        })
    }
}

/// A finished device-independent bitmap: header, palette and pixels in one
/// contiguous buffer, the layout `CF_DIB` clipboard data and packed DIBs use.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Dib {
    data: Vec<u8>,
    geometry: Geometry,
    header: DibHeader,
}

impl Dib {
    pub(crate) fn from_parts(data: Vec<u8>, geometry: Geometry, header: DibHeader) -> Self {
        Self {
            data,
            geometry,
            header,
        }
    }

    /// Borrow the whole buffer.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Consume and return the buffer.
    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    /// Total byte count.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the buffer is empty. A finished DIB never is.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The buffer layout.
    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// Header fields.
    pub fn header(&self) -> DibHeader {
        self.header
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.geometry.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.geometry.height
    }

    /// Bits per pixel.
    pub fn bit_count(&self) -> u16 {
        self.geometry.bits_per_pixel
    }

    /// Bytes per padded row.
    pub fn stride(&self) -> usize {
        self.geometry.stride
    }

    /// Palette entries as B,G,R,reserved.
    pub fn palette(&self) -> Vec<BGRA<u8>> {
        self.data[HEADER_SIZE..self.geometry.pixel_offset]
            .chunks_exact(PALETTE_ENTRY_SIZE)
            .map(|q| BGRA {
                b: q[0],
                g: q[1],
                r: q[2],
                a: q[3],
            })
            .collect()
    }

    /// Offset of the pixel data from the start of the buffer.
    pub fn pixel_offset(&self) -> usize {
        self.geometry.pixel_offset
    }

    /// Pixel rows, bottom-up, including padding.
    pub fn pixel_bytes(&self) -> &[u8] {
        &self.data[self.geometry.pixel_offset..]
    }

    /// Strided view of the pixel rows, in buffer (bottom-up) order.
    ///
    /// Width is in bytes, not pixels, so the padding is excluded.
    pub fn pixels(&self) -> ImgRef<'_, u8> {
        let g = &self.geometry;
        ImgRef::new_stride(
            self.pixel_bytes(),
            g.row_bytes(),
            g.height as usize,
            g.stride,
        )
    }

    /// Pixel bytes of image row `y`, counted from the top of the image.
    pub fn row(&self, y: u32) -> Option<&[u8]> {
        let g = &self.geometry;
        if y >= g.height {
            return None;
        }
        let physical = (g.height - 1 - y) as usize;
        let start = physical * g.stride;
        self.pixel_bytes().get(start..start + g.row_bytes())
    }

    /// Write a `.bmp` file: a 14-byte `BITMAPFILEHEADER` followed by this DIB.
    pub fn write_bmp<W: std::io::Write>(&self, mut w: W) -> std::io::Result<()> {
        let file_size = (FILE_HEADER_SIZE + self.data.len()) as u32;
        let bits_offset = (FILE_HEADER_SIZE + self.geometry.pixel_offset) as u32;
        let mut file_header = [0u8; FILE_HEADER_SIZE];
        file_header[0..2].copy_from_slice(b"BM");
        file_header[2..6].copy_from_slice(&file_size.to_le_bytes());
        file_header[10..14].copy_from_slice(&bits_offset.to_le_bytes());
        w.write_all(&file_header)?;
        w.write_all(&self.data)
    }
}

impl AsRef<[u8]> for Dib {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

/// Result of a successful conversion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConvertOutput {
    dib: Dib,
    background: Option<Rgb<u8>>,
    density: Option<Density>,
    strategy: Strategy,
}

impl ConvertOutput {
    pub(crate) fn new(
        dib: Dib,
        background: Option<Rgb<u8>>,
        density: Option<Density>,
        strategy: Strategy,
    ) -> Self {
        Self {
            dib,
            background,
            density,
            strategy,
        }
    }

    /// Borrow the DIB.
    pub fn dib(&self) -> &Dib {
        &self.dib
    }

    /// Take the DIB.
    pub fn into_dib(self) -> Dib {
        self.dib
    }

    /// The background that was composited, destination-encoded.
    ///
    /// Hosts paint this around the image so the padding matches.
    pub fn background(&self) -> Option<Rgb<u8>> {
        self.background
    }

    /// Source pixel density, if it declared a valid one.
    pub fn density(&self) -> Option<Density> {
        self.density
    }

    /// The strategy that produced the pixels.
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Output bits per pixel.
    pub fn bits_per_pixel(&self) -> u16 {
        self.dib.bit_count()
    }
}

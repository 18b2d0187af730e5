//! Source image adapters.
//!
//! [`PngSource`] decodes a PNG stream with the `png` crate, leaving samples
//! at their native depth. [`RawSource`] wraps rows a host already decoded.

use std::io::{Cursor, Read};

use rgb::Rgb;
use tracing::debug;

use crate::error::{Error, Result};
use crate::info::{
    ColorModel, Density, DensityUnit, FileBackground, SourceDescriptor, SourceEncoding,
    SourceMetadata, Transparency,
};
use crate::limits::ResourceLimits;
use crate::traits::SourceImage;

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1A, b'\n'];

/// A PNG image decoded into native-depth rows.
///
/// The whole stream is read and decoded up front; rows are then handed out
/// top-down. Interlaced images come out already deinterlaced.
#[derive(Debug)]
pub struct PngSource {
    descriptor: SourceDescriptor,
    metadata: SourceMetadata,
    pixels: Vec<u8>,
    line_size: usize,
    next: usize,
}

impl PngSource {
    /// Decode a PNG from `reader`, enforcing `limits`.
    pub fn new<R: Read>(reader: R, limits: &ResourceLimits) -> Result<Self> {
        let bytes = read_stream(reader, limits)?;
        let ancillary = walk_chunks(&bytes, limits.max_decoder_bytes);

        let mut decoder = png::Decoder::new(Cursor::new(bytes));
        decoder.set_transformations(png::Transformations::IDENTITY);
        // Text is never used.
        decoder.set_ignore_text_chunk(true);
        let mut reader = decoder.read_info()?;

        let (descriptor, metadata) = describe(reader.info(), ancillary.background)?;
        limits.check_descriptor(&descriptor)?;
        debug!(
            width = descriptor.width,
            height = descriptor.height,
            depth = descriptor.bit_depth,
            model = ?descriptor.color_model,
            interlaced = descriptor.interlaced,
            "png header"
        );

        let size = reader.output_buffer_size();
        let mut pixels = Vec::new();
        pixels
            .try_reserve_exact(size)
            .map_err(|_| Error::out_of_memory(size))?;
        pixels.resize(size, 0);
        let frame = reader.next_frame(&mut pixels)?;
        pixels.truncate(frame.buffer_size());

        Ok(Self {
            descriptor,
            metadata,
            pixels,
            line_size: frame.line_size,
            next: 0,
        })
    }
}

impl SourceImage for PngSource {
    fn descriptor(&self) -> &SourceDescriptor {
        &self.descriptor
    }

    fn metadata(&self) -> &SourceMetadata {
        &self.metadata
    }

    fn next_row(&mut self) -> Result<Option<&[u8]>> {
        if self.next >= self.descriptor.height as usize {
            return Ok(None);
        }
        let start = self.next * self.line_size;
        self.next += 1;
        match self.pixels.get(start..start + self.line_size) {
            Some(row) => Ok(Some(row)),
            None => Err(Error::malformed("Invalid PNG image: truncated image data")),
        }
    }
}

fn read_stream<R: Read>(reader: R, limits: &ResourceLimits) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    match limits.max_file_size {
        Some(max) => {
            reader.take(max.saturating_add(1)).read_to_end(&mut bytes)?;
        }
        None => {
            let mut reader = reader;
            reader.read_to_end(&mut bytes)?;
        }
    }
    limits.check_file_size(bytes.len() as u64)?;
    Ok(bytes)
}

/// What the chunk walk found that the decoder doesn't report.
#[derive(Debug, Default)]
struct Ancillary {
    background: Option<Vec<u8>>,
}

/// Scan the chunks ahead of the image data for bKGD.
///
/// A chunk larger than `max_chunk` is skipped with its payload unread.
/// A stream that isn't a PNG is left for the decoder to reject.
fn walk_chunks(bytes: &[u8], max_chunk: Option<u64>) -> Ancillary {
    let mut found = Ancillary::default();
    let Some(mut rest) = bytes.strip_prefix(&PNG_SIGNATURE[..]) else {
        return found;
    };
    while rest.len() >= 8 {
        let len = u32::from_be_bytes([rest[0], rest[1], rest[2], rest[3]]) as usize;
        let kind = [rest[4], rest[5], rest[6], rest[7]];
        if &kind == b"IDAT" || &kind == b"IEND" {
            break;
        }
        let end = len.saturating_add(8);
        let oversized = max_chunk.is_some_and(|max| len as u64 > max);
        if oversized {
            debug!(
                chunk = %String::from_utf8_lossy(&kind),
                len,
                "skipping chunk over the decoder allocation cap"
            );
        } else if &kind == b"bKGD"
            && let Some(data) = rest.get(8..end)
        {
            found.background = Some(data.to_vec());
        }
        // Payload plus CRC.
        rest = rest.get(end.saturating_add(4)..).unwrap_or_default();
    }
    found
}

fn describe(
    info: &png::Info<'_>,
    background: Option<Vec<u8>>,
) -> Result<(SourceDescriptor, SourceMetadata)> {
    let model = match info.color_type {
        png::ColorType::Grayscale => ColorModel::Gray,
        png::ColorType::GrayscaleAlpha => ColorModel::GrayAlpha,
        png::ColorType::Rgb => ColorModel::Truecolor,
        png::ColorType::Rgba => ColorModel::TruecolorAlpha,
        png::ColorType::Indexed => ColorModel::Palette,
    };
    let depth = info.bit_depth as u8;

    let palette = match (model, info.palette.as_deref()) {
        (ColorModel::Palette, Some(p)) => p
            .chunks_exact(3)
            .map(|c| Rgb {
                r: c[0],
                g: c[1],
                b: c[2],
            })
            .collect(),
        (ColorModel::Palette, None) => {
            return Err(Error::malformed("Invalid PNG image: missing palette"));
        }
        _ => Vec::new(),
    };

    let transparency = info
        .trns
        .as_deref()
        .and_then(|t| parse_transparency(model, t));

    let encoding = if info.srgb.is_some() {
        SourceEncoding::Srgb
    } else if let Some(gamma) = info.source_gamma {
        SourceEncoding::Gamma(gamma.into_value() as f64)
    } else {
        SourceEncoding::Unlabeled
    };

    let density = info.pixel_dims.and_then(|d| {
        let unit = match d.unit {
            png::Unit::Meter => DensityUnit::Meter,
            png::Unit::Unspecified => DensityUnit::Unspecified,
        };
        Density::new(d.xppu, d.yppu, unit)
    });

    let descriptor = SourceDescriptor::new(info.width, info.height, depth, model)
        .with_palette(palette)
        .with_transparency(transparency.is_some())
        .with_interlaced(info.interlaced);

    let mut metadata = SourceMetadata::none().with_encoding(encoding);
    metadata.transparency = transparency;
    metadata.density = density;
    metadata.background = background.and_then(|b| parse_background(model, &b));

    Ok((descriptor, metadata))
}

/// Interpret a tRNS payload. Models with their own alpha channel ignore it.
pub(crate) fn parse_transparency(model: ColorModel, data: &[u8]) -> Option<Transparency> {
    match (model, data) {
        (ColorModel::Palette, a) if !a.is_empty() => Some(Transparency::PaletteAlpha(a.to_vec())),
        (ColorModel::Gray, &[h, l, ..]) => Some(Transparency::GrayKey(u16::from_be_bytes([h, l]))),
        (ColorModel::Truecolor, &[r0, r1, g0, g1, b0, b1, ..]) => {
            Some(Transparency::RgbKey(Rgb {
                r: u16::from_be_bytes([r0, r1]),
                g: u16::from_be_bytes([g0, g1]),
                b: u16::from_be_bytes([b0, b1]),
            }))
        }
        _ => None,
    }
}

/// Interpret a bKGD payload for `model`.
pub(crate) fn parse_background(model: ColorModel, data: &[u8]) -> Option<FileBackground> {
    match (model, data) {
        (ColorModel::Palette, &[i]) => Some(FileBackground::PaletteIndex(i)),
        (ColorModel::Gray | ColorModel::GrayAlpha, &[h, l]) => {
            Some(FileBackground::Gray(u16::from_be_bytes([h, l])))
        }
        (ColorModel::Truecolor | ColorModel::TruecolorAlpha, &[r0, r1, g0, g1, b0, b1]) => {
            Some(FileBackground::Rgb(Rgb {
                r: u16::from_be_bytes([r0, r1]),
                g: u16::from_be_bytes([g0, g1]),
                b: u16::from_be_bytes([b0, b1]),
            }))
        }
        _ => None,
    }
}

/// Rows a host has already decoded, packed back to back at native depth.
#[derive(Clone, Debug)]
pub struct RawSource {
    descriptor: SourceDescriptor,
    metadata: SourceMetadata,
    data: Vec<u8>,
    row_bytes: usize,
    next: usize,
}

impl RawSource {
    /// Wrap `data`, which must hold `height` rows of
    /// [`row_bytes()`](SourceDescriptor::row_bytes) each.
    pub fn new(descriptor: SourceDescriptor, metadata: SourceMetadata, data: Vec<u8>) -> Result<Self> {
        let row_bytes = descriptor.row_bytes();
        let needed = row_bytes
            .checked_mul(descriptor.height as usize)
            .ok_or_else(|| Error::malformed("Invalid PNG image: row data overflows"))?;
        if data.len() < needed {
            return Err(Error::malformed(format!(
                "Invalid PNG image: {} bytes of row data, expected {needed}",
                data.len()
            )));
        }
        Ok(Self {
            descriptor,
            metadata,
            data,
            row_bytes,
            next: 0,
        })
    }
}

impl SourceImage for RawSource {
    fn descriptor(&self) -> &SourceDescriptor {
        &self.descriptor
    }

    fn metadata(&self) -> &SourceMetadata {
        &self.metadata
    }

    fn next_row(&mut self) -> Result<Option<&[u8]>> {
        if self.next >= self.descriptor.height as usize {
            return Ok(None);
        }
        let start = self.next * self.row_bytes;
        self.next += 1;
        Ok(self.data.get(start..start + self.row_bytes))
    }
}

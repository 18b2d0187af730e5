//! Pixel conversion strategies.
//!
//! Each strategy pulls native rows from the source, one at a time, and
//! writes finished DIB rows through [`RowTargets`]. Opaque strategies
//! unpack straight into the destination row; compositing strategies go
//! through one reusable working row.

use rgb::Rgb;
use rgb::alt::BGRA;
use tracing::debug;

use crate::background::Background;
use crate::color::{ColorTables, CorrectionMode};
use crate::error::{Error, Result};
use crate::info::{SourceDescriptor, Transparency};
use crate::raster::{RasterAssembler, RowTargets};
use crate::samples::{RowUnpacker, repack_2bit_to_4bit};
use crate::strategy::{PaletteKind, Selection, Strategy};
use crate::traits::SourceImage;

/// Fill `assembler` from `source` using the selected strategy.
pub(crate) fn run<S: SourceImage + ?Sized>(
    source: &mut S,
    selection: &Selection,
    tables: &ColorTables,
    background: Option<&Background>,
    assembler: &mut RasterAssembler,
) -> Result<()> {
    let descriptor = source.descriptor().clone();
    let transparency = source.metadata().transparency.clone();

    match selection.palette {
        PaletteKind::None => {}
        PaletteKind::Grayscale => assembler.write_grayscale_ramp()?,
        PaletteKind::Source => {
            let entries = build_palette(&descriptor, transparency.as_ref(), tables, background)?;
            assembler.write_palette(&entries)?;
        }
    }

    let unpacker = RowUnpacker::new(&descriptor, transparency.as_ref(), selection.layout)?;
    let needs_working_row = match selection.strategy {
        Strategy::DirectCopy { .. } => false,
        Strategy::GrayAlphaComposite { .. } | Strategy::RgbaComposite => true,
        Strategy::Palette => descriptor.bit_depth == 2,
    };
    let mut work = Vec::new();
    if needs_working_row {
        let len = unpacker.working_row_bytes();
        work.try_reserve_exact(len)
            .map_err(|_| Error::out_of_memory(len))?;
        work.resize(len, 0);
    }

    debug!(
        strategy = ?selection.strategy,
        bpp = selection.bits_per_pixel,
        rows = descriptor.height,
        working_row = work.len(),
        "converting pixels"
    );

    let width = descriptor.width as usize;
    let mut rows = assembler.rows()?;
    for_each_row(source, &mut rows, |src, dst| match selection.strategy {
        Strategy::DirectCopy { samples_per_pixel } => {
            unpacker.unpack(src, dst)?;
            direct_copy(dst, width * samples_per_pixel as usize, samples_per_pixel, tables);
            Ok(())
        }
        Strategy::RgbaComposite => {
            unpacker.unpack(src, &mut work)?;
            composite_rgba(&work, dst, tables, require(background)?);
            Ok(())
        }
        Strategy::GrayAlphaComposite { to_color } => {
            unpacker.unpack(src, &mut work)?;
            composite_gray_alpha(&work, dst, tables, require(background)?, to_color);
            Ok(())
        }
        Strategy::Palette if descriptor.bit_depth == 2 => {
            unpacker.unpack(src, &mut work)?;
            repack_2bit_to_4bit(&work, dst, width);
            Ok(())
        }
        Strategy::Palette => unpacker.unpack(src, dst),
    })
}

/// Pair each source row with its destination row, top-down.
fn for_each_row<S, F>(source: &mut S, rows: &mut RowTargets<'_>, mut f: F) -> Result<()>
where
    S: SourceImage + ?Sized,
    F: FnMut(&[u8], &mut [u8]) -> Result<()>,
{
    let height = rows.len();
    for (y, dst) in rows.iter_mut().enumerate() {
        let Some(src) = source.next_row()? else {
            return Err(Error::malformed(format!(
                "Invalid PNG image: image data ended after {y} of {height} rows"
            )));
        };
        f(src, dst)?;
    }
    Ok(())
}

fn require(background: Option<&Background>) -> Result<&Background> {
    background.ok_or_else(|| Error::internal("compositing strategy without a background"))
}

/// Reorder RGB to BGR and apply gamma correction in place.
fn direct_copy(row: &mut [u8], samples: usize, samples_per_pixel: u8, tables: &ColorTables) {
    let row = &mut row[..samples];
    if samples_per_pixel == 3 {
        for px in row.chunks_exact_mut(3) {
            px.swap(0, 2);
        }
    }
    // src_to_dst is the identity for sRGB and disabled correction.
    if matches!(tables.mode(), CorrectionMode::Gamma(_)) {
        for s in row {
            *s = tables.src_to_dst(*s);
        }
    }
}

/// Composite one color against the background in linear light.
///
/// Fully transparent input yields the background's destination color exactly.
#[inline]
fn composite(color: Rgb<u8>, alpha: u8, tables: &ColorTables, bg: &Background) -> Rgb<u8> {
    if alpha == 0 {
        return bg.destination();
    }
    let a = alpha as f64 / 255.0;
    let lin = bg.linear();
    let mix = |s: u8, b: f64| tables.encode_linear(a * tables.src_to_linear(s) + (1.0 - a) * b);
    Rgb {
        r: mix(color.r, lin.r),
        g: mix(color.g, lin.g),
        b: mix(color.b, lin.b),
    }
}

fn composite_rgba(work: &[u8], dst: &mut [u8], tables: &ColorTables, bg: &Background) {
    for (src, out) in work.chunks_exact(4).zip(dst.chunks_exact_mut(3)) {
        let c = composite(
            Rgb {
                r: src[0],
                g: src[1],
                b: src[2],
            },
            src[3],
            tables,
            bg,
        );
        out.copy_from_slice(&[c.b, c.g, c.r]);
    }
}

fn composite_gray_alpha(
    work: &[u8],
    dst: &mut [u8],
    tables: &ColorTables,
    bg: &Background,
    to_color: bool,
) {
    if to_color {
        for (src, out) in work.chunks_exact(2).zip(dst.chunks_exact_mut(3)) {
            let g = src[0];
            let c = composite(Rgb { r: g, g, b: g }, src[1], tables, bg);
            out.copy_from_slice(&[c.b, c.g, c.r]);
        }
        return;
    }
    // Gray backgrounds have equal channels; red stands in for all three.
    let bg_dst = bg.destination().r;
    let bg_lin = bg.linear().r;
    for (src, out) in work.chunks_exact(2).zip(dst.iter_mut()) {
        *out = match src[1] {
            0 => bg_dst,
            alpha => {
                let a = alpha as f64 / 255.0;
                tables.encode_linear(a * tables.src_to_linear(src[0]) + (1.0 - a) * bg_lin)
            }
        };
    }
}

/// Color-correct the source palette, compositing translucent entries when a
/// background is applied.
pub(crate) fn build_palette(
    descriptor: &SourceDescriptor,
    transparency: Option<&Transparency>,
    tables: &ColorTables,
    background: Option<&Background>,
) -> Result<Vec<BGRA<u8>>> {
    let alphas: &[u8] = match (background, transparency) {
        (Some(_), Some(Transparency::PaletteAlpha(a))) => a,
        _ => &[],
    };
    let mut entries = Vec::new();
    entries.try_reserve_exact(descriptor.palette.len())?;
    for (i, &color) in descriptor.palette.iter().enumerate() {
        let c = match (background, alphas.get(i)) {
            (Some(bg), Some(&alpha)) => composite(color, alpha, tables, bg),
            _ => Rgb {
                r: tables.encode_linear(tables.src_to_linear(color.r)),
                g: tables.encode_linear(tables.src_to_linear(color.g)),
                b: tables.encode_linear(tables.src_to_linear(color.b)),
            },
        };
        entries.push(BGRA {
            b: c.b,
            g: c.g,
            r: c.r,
            a: 0,
        });
    }
    Ok(entries)
}

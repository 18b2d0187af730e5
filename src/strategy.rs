//! Strategy selection.
//!
//! A pure classifier from the source's color model, bit depth, transparency
//! and background to one packing strategy and the output bit depth. Written
//! as one ordered `match` over tagged conditions so every row of the table
//! can be read (and tested) on its own. Combinations outside the table are
//! an error; there is no fallback.

use crate::background::Background;
use crate::error::{Error, Result};
use crate::info::{ColorModel, SourceDescriptor};

/// How a source row is presented to a strategy: 8-bit samples in this order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WorkingLayout {
    /// One gray sample per pixel.
    Gray,
    /// Gray, alpha.
    GrayAlpha,
    /// Red, green, blue.
    Rgb,
    /// Red, green, blue, alpha.
    Rgba,
    /// Raw palette indices at the source bit depth.
    Indexed,
}

impl WorkingLayout {
    /// Samples per pixel. `Indexed` counts one packed index.
    pub const fn samples(self) -> usize {
        match self {
            Self::Gray | Self::Indexed => 1,
            Self::GrayAlpha => 2,
            Self::Rgb => 3,
            Self::Rgba => 4,
        }
    }
}

/// The pixel conversion algorithm for a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Copy samples straight into the DIB, 1 (gray) or 3 (BGR) per pixel.
    DirectCopy {
        /// 1 or 3.
        samples_per_pixel: u8,
    },
    /// Composite gray + alpha against the background.
    GrayAlphaComposite {
        /// Write BGR pixels (chromatic background) instead of gray indices.
        to_color: bool,
    },
    /// Composite RGB + alpha against the background.
    RgbaComposite,
    /// Copy indices, correct and composite the palette.
    Palette,
}

/// Palette the output DIB carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PaletteKind {
    /// No palette (24 bpp).
    None,
    /// 256-entry ramp with entry k = (k, k, k).
    Grayscale,
    /// Built from the source palette, one entry per source entry.
    Source,
}

/// Outcome of strategy selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Selection {
    /// Chosen strategy.
    pub strategy: Strategy,
    /// Output bits per pixel: 1, 4, 8 or 24.
    pub bits_per_pixel: u16,
    /// Output palette.
    pub palette: PaletteKind,
    /// Layout the strategy expects its rows in.
    pub layout: WorkingLayout,
}

impl Selection {
    const fn new(
        strategy: Strategy,
        bits_per_pixel: u16,
        palette: PaletteKind,
        layout: WorkingLayout,
    ) -> Self {
        Self {
            strategy,
            bits_per_pixel,
            palette,
            layout,
        }
    }

    /// Number of palette entries the DIB needs for this selection.
    pub fn palette_entries(&self, descriptor: &SourceDescriptor) -> usize {
        match self.palette {
            PaletteKind::None => 0,
            PaletteKind::Grayscale => 256,
            PaletteKind::Source => descriptor.palette.len(),
        }
    }
}

/// Background condition as the table sees it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Bg {
    None,
    Gray,
    Chromatic,
}

const GRAY_DIRECT: Selection = Selection::new(
    Strategy::DirectCopy {
        samples_per_pixel: 1,
    },
    8,
    PaletteKind::Grayscale,
    WorkingLayout::Gray,
);

const RGB_DIRECT: Selection = Selection::new(
    Strategy::DirectCopy {
        samples_per_pixel: 3,
    },
    24,
    PaletteKind::None,
    WorkingLayout::Rgb,
);

/// Choose the strategy for a source and (optional) applied background.
pub fn select(descriptor: &SourceDescriptor, background: Option<&Background>) -> Result<Selection> {
    let model = descriptor.color_model;
    let depth = descriptor.bit_depth;
    if !model.allows_depth(depth) {
        return Err(Error::unsupported(format!(
            "Unsupported image type: {model:?} at {depth} bits per sample"
        )));
    }

    let transparent = model.has_alpha_channel() || descriptor.has_transparency;
    let bg = match background {
        None => Bg::None,
        Some(b) if b.is_gray() => Bg::Gray,
        Some(_) => Bg::Chromatic,
    };

    use ColorModel::*;
    let selection = match (model, transparent, bg) {
        (Gray, false, _) => GRAY_DIRECT,
        (Gray | GrayAlpha, true, Bg::None) => GRAY_DIRECT,
        (Gray | GrayAlpha, true, Bg::Gray) => Selection::new(
            Strategy::GrayAlphaComposite { to_color: false },
            8,
            PaletteKind::Grayscale,
            WorkingLayout::GrayAlpha,
        ),
        (Gray | GrayAlpha, true, Bg::Chromatic) => Selection::new(
            Strategy::GrayAlphaComposite { to_color: true },
            24,
            PaletteKind::None,
            WorkingLayout::GrayAlpha,
        ),
        (Truecolor, false, _) => RGB_DIRECT,
        (Truecolor, true, Bg::None) => RGB_DIRECT,
        (Truecolor, true, Bg::Gray | Bg::Chromatic) => Selection::new(
            Strategy::RgbaComposite,
            24,
            PaletteKind::None,
            WorkingLayout::Rgba,
        ),
        (TruecolorAlpha, _, Bg::None) => RGB_DIRECT,
        (TruecolorAlpha, _, Bg::Gray | Bg::Chromatic) => Selection::new(
            Strategy::RgbaComposite,
            24,
            PaletteKind::None,
            WorkingLayout::Rgba,
        ),
        (Palette, _, _) => {
            if descriptor.palette.is_empty() || descriptor.palette.len() > 256 {
                return Err(Error::malformed(format!(
                    "Invalid palette size {}",
                    descriptor.palette.len()
                )));
            }
            // DIBs have no 2-bit format; those rows are repacked to 4 bits.
            let bpp = if depth == 2 { 4 } else { depth as u16 };
            Selection::new(Strategy::Palette, bpp, PaletteKind::Source, WorkingLayout::Indexed)
        }
        (GrayAlpha, false, _) => {
            return Err(Error::internal("gray+alpha image reported as opaque"));
        }
    };
    Ok(selection)
}

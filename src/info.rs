//! Source image description: header fields and ancillary metadata.
//!
//! [`SourceDescriptor`] holds what the PNG header says about the pixel
//! layout. [`SourceMetadata`] holds the optional ancillary chunks that steer
//! color correction, background compositing and output resolution.

use rgb::Rgb;

/// PNG color model (IHDR color type).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ColorModel {
    /// Single luminance channel.
    Gray,
    /// Luminance + alpha.
    GrayAlpha,
    /// Red, green, blue.
    Truecolor,
    /// Red, green, blue, alpha.
    TruecolorAlpha,
    /// Indices into a palette of RGB triples.
    Palette,
}

impl ColorModel {
    /// Samples per pixel as stored in the source rows.
    #[inline]
    pub const fn channels(self) -> usize {
        match self {
            Self::Gray | Self::Palette => 1,
            Self::GrayAlpha => 2,
            Self::Truecolor => 3,
            Self::TruecolorAlpha => 4,
        }
    }

    /// Whether each pixel carries its own alpha sample.
    #[inline]
    pub const fn has_alpha_channel(self) -> bool {
        matches!(self, Self::GrayAlpha | Self::TruecolorAlpha)
    }

    /// Whether the model has no color channels.
    #[inline]
    pub const fn is_grayscale(self) -> bool {
        matches!(self, Self::Gray | Self::GrayAlpha)
    }

    /// Whether `depth` is a bit depth PNG allows for this model.
    pub const fn allows_depth(self, depth: u8) -> bool {
        match self {
            Self::Gray => matches!(depth, 1 | 2 | 4 | 8 | 16),
            Self::Palette => matches!(depth, 1 | 2 | 4 | 8),
            Self::GrayAlpha | Self::Truecolor | Self::TruecolorAlpha => matches!(depth, 8 | 16),
        }
    }
}

/// Header-level description of a source image. Immutable for a run.
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub struct SourceDescriptor {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Bits per sample (1, 2, 4, 8 or 16).
    pub bit_depth: u8,
    /// Color model.
    pub color_model: ColorModel,
    /// Whether the stream is Adam7-interlaced. Deinterlacing is the decoder's job;
    /// rows handed to the converter are always in final order.
    pub interlaced: bool,
    /// Whether a binary-transparency (tRNS) table is present.
    pub has_transparency: bool,
    /// Palette entries, source-encoded. Empty unless the model is [`ColorModel::Palette`].
    pub palette: Vec<Rgb<u8>>,
}

impl SourceDescriptor {
    /// Create a descriptor with no palette, no transparency, not interlaced.
    pub fn new(width: u32, height: u32, bit_depth: u8, color_model: ColorModel) -> Self {
        Self {
            width,
            height,
            bit_depth,
            color_model,
            interlaced: false,
            has_transparency: false,
            palette: Vec::new(),
        }
    }

    /// Set the palette.
    pub fn with_palette(mut self, palette: Vec<Rgb<u8>>) -> Self {
        self.palette = palette;
        self
    }

    /// Set whether binary transparency is present.
    pub fn with_transparency(mut self, has_transparency: bool) -> Self {
        self.has_transparency = has_transparency;
        self
    }

    /// Set the interlace flag.
    pub fn with_interlaced(mut self, interlaced: bool) -> Self {
        self.interlaced = interlaced;
        self
    }

    /// Bytes in one raw source row: `ceil(width * channels * bit_depth / 8)`.
    pub fn row_bytes(&self) -> usize {
        let bits = self.width as u64 * self.color_model.channels() as u64 * self.bit_depth as u64;
        bits.div_ceil(8) as usize
    }
}

/// Tone-response labelling declared by the source.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum SourceEncoding {
    /// sRGB chunk present.
    Srgb,
    /// gAMA chunk present with this file gamma (e.g. 0.45455).
    Gamma(f64),
    /// Neither chunk present.
    #[default]
    Unlabeled,
}

/// Binary transparency (tRNS) in the source's native encoding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Transparency {
    /// Per-index alpha for palette images. Indices past the end are opaque.
    PaletteAlpha(Vec<u8>),
    /// Gray value (at native bit depth) that is fully transparent.
    GrayKey(u16),
    /// RGB value (at native bit depth) that is fully transparent.
    RgbKey(Rgb<u16>),
}

/// File-declared background (bKGD) in the source's native encoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileBackground {
    /// Gray level at the image's bit depth.
    Gray(u16),
    /// RGB at the image's bit depth.
    Rgb(Rgb<u16>),
    /// Palette index.
    PaletteIndex(u8),
}

/// Unit of a [`Density`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum DensityUnit {
    /// Aspect ratio only.
    #[default]
    Unspecified,
    /// Pixels per meter.
    Meter,
}

/// Pixel density (pHYs).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Density {
    /// Pixels per unit, X axis.
    pub x: u32,
    /// Pixels per unit, Y axis.
    pub y: u32,
    /// Unit specifier.
    pub unit: DensityUnit,
}

impl Density {
    /// Build a density, rejecting zero values on either axis.
    pub fn new(x: u32, y: u32, unit: DensityUnit) -> Option<Self> {
        (x >= 1 && y >= 1).then_some(Self { x, y, unit })
    }
}

/// Ancillary metadata that steers the conversion.
#[derive(Clone, Debug, Default, PartialEq)]
#[non_exhaustive]
pub struct SourceMetadata {
    /// Declared tone response.
    pub encoding: SourceEncoding,
    /// Declared background color.
    pub background: Option<FileBackground>,
    /// Binary transparency table.
    pub transparency: Option<Transparency>,
    /// Valid pixel density.
    pub density: Option<Density>,
}

impl SourceMetadata {
    /// Empty metadata.
    pub fn none() -> Self {
        Self::default()
    }

    /// Set the declared encoding.
    pub fn with_encoding(mut self, encoding: SourceEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Set the file background.
    pub fn with_background(mut self, background: FileBackground) -> Self {
        self.background = Some(background);
        self
    }

    /// Set the transparency table.
    pub fn with_transparency(mut self, transparency: Transparency) -> Self {
        self.transparency = Some(transparency);
        self
    }

    /// Set the pixel density.
    pub fn with_density(mut self, density: Density) -> Self {
        self.density = Some(density);
        self
    }
}

//! Conversion configuration and the run that ties the stages together.

use std::io::Read;

use rgb::Rgb;
use tracing::debug;

use crate::background;
use crate::color::{ColorTables, CorrectionMode};
use crate::convert;
use crate::error::Result;
use crate::limits::ResourceLimits;
use crate::output::ConvertOutput;
use crate::raster::{Geometry, RasterAssembler};
use crate::source::PngSource;
use crate::strategy;
use crate::traits::SourceImage;

/// Settings for a conversion.
///
/// Reusable and cheap to clone; each call to [`convert()`](Self::convert)
/// builds its own tables and buffers, so one config can serve concurrent
/// runs from different threads.
///
/// # Example
///
/// ```
/// use zendib::{ConvertConfig, Rgb};
///
/// let config = ConvertConfig::new()
///     .with_color_correction(true)
///     .with_background(Rgb { r: 255, g: 255, b: 255 });
/// assert!(config.color_correction());
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConvertConfig {
    color_correction: bool,
    file_background: bool,
    background: Option<Rgb<u8>>,
    limits: ResourceLimits,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            color_correction: false,
            file_background: false,
            background: None,
            limits: ResourceLimits::standard(),
        }
    }
}

impl ConvertConfig {
    /// Defaults: no correction, no backgrounds, [`ResourceLimits::standard()`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Convert source colors to sRGB.
    pub fn with_color_correction(mut self, enabled: bool) -> Self {
        self.color_correction = enabled;
        self
    }

    /// Composite against the file's bKGD color when no override is set.
    pub fn with_file_background(mut self, enabled: bool) -> Self {
        self.file_background = enabled;
        self
    }

    /// Composite against this sRGB color. Takes priority over bKGD.
    pub fn with_background(mut self, color: Rgb<u8>) -> Self {
        self.background = Some(color);
        self
    }

    /// Replace the resource limits.
    pub fn with_limits(mut self, limits: ResourceLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Whether color correction is enabled.
    pub fn color_correction(&self) -> bool {
        self.color_correction
    }

    /// Whether the file's background is used.
    pub fn file_background(&self) -> bool {
        self.file_background
    }

    /// The override background.
    pub fn background(&self) -> Option<Rgb<u8>> {
        self.background
    }

    /// The resource limits.
    pub fn limits(&self) -> &ResourceLimits {
        &self.limits
    }

    /// Decode a PNG stream and convert it.
    pub fn convert_png<R: Read>(&self, reader: R) -> Result<ConvertOutput> {
        let mut source = PngSource::new(reader, &self.limits)?;
        self.convert(&mut source)
    }

    /// Convert a source image into a DIB.
    ///
    /// Either the whole DIB is returned or nothing is: on error the
    /// partially filled buffer is dropped.
    pub fn convert<S: SourceImage + ?Sized>(&self, source: &mut S) -> Result<ConvertOutput> {
        let descriptor = source.descriptor();
        let metadata = source.metadata();
        self.limits.check_descriptor(descriptor)?;

        let mode = CorrectionMode::select(self.color_correction, metadata.encoding);
        let tables = ColorTables::new(mode);
        let background = background::resolve(
            self.background,
            self.file_background,
            descriptor,
            metadata,
            &tables,
        );
        let selection = strategy::select(descriptor, background.as_ref())?;
        debug!(
            model = ?descriptor.color_model,
            depth = descriptor.bit_depth,
            transparency = descriptor.has_transparency,
            ?mode,
            background = ?background.as_ref().map(|b| b.destination()),
            strategy = ?selection.strategy,
            bpp = selection.bits_per_pixel,
            "selected strategy"
        );

        let geometry = Geometry::new(
            descriptor.width,
            descriptor.height,
            selection.bits_per_pixel,
            selection.palette_entries(descriptor),
        )?;
        self.limits.check_memory(geometry.total_size as u64)?;
        debug!(
            stride = geometry.stride,
            palette = geometry.palette_entries,
            total = geometry.total_size,
            "dib geometry"
        );
        let density = metadata.density;

        let mut assembler = RasterAssembler::allocate(geometry)?;
        convert::run(
            source,
            &selection,
            &tables,
            background.as_ref(),
            &mut assembler,
        )?;

        Ok(ConvertOutput::new(
            assembler.finish(density),
            background.map(|b| b.destination()),
            density,
            selection.strategy,
        ))
    }
}

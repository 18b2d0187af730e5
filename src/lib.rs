//! Color-corrected conversion of decoded PNG rasters into device-independent bitmaps.
//!
//! The output is an uncompressed, bottom-up DIB (`BITMAPINFOHEADER`, palette,
//! 4-byte-aligned rows) at 1, 4, 8 or 24 bits per pixel, ready for a host
//! surface or a `.bmp` file:
//!
//! - [`ConvertConfig`]: correction and background settings, resource limits, entry points
//! - [`SourceImage`]: row-supplier interface; [`PngSource`] and [`RawSource`] implement it
//! - [`ColorTables`]: source ↔ linear ↔ sRGB lookup tables
//! - [`Background`]: the resolved compositing color in all three encodings
//! - [`Strategy`] / [`select_strategy`]: the packing decision table
//! - [`Dib`] / [`ConvertOutput`]: the finished bitmap plus host queries
//! - [`Error`] / [`ErrorCode`]: one outcome code per failed run
//!
//! ```no_run
//! use zendib::{ConvertConfig, Rgb};
//!
//! let file = std::fs::File::open("image.png")?;
//! let out = ConvertConfig::new()
//!     .with_color_correction(true)
//!     .with_background(Rgb { r: 255, g: 255, b: 255 })
//!     .convert_png(std::io::BufReader::new(file))?;
//! out.dib().write_bmp(std::fs::File::create("image.bmp")?)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![forbid(unsafe_code)]

mod background;
mod color;
mod convert;
mod converter;
mod error;
mod info;
mod limits;
mod output;
mod raster;
mod samples;
mod source;
mod strategy;
mod traits;

pub use background::{
    Background, BackgroundSource, file_background_to_source, resolve as resolve_background,
};
pub use color::{
    ColorTables, CorrectionMode, MAX_GAMMA, MIN_GAMMA, linear_to_srgb, srgb_to_linear,
};
pub use converter::ConvertConfig;
pub use error::{Error, ErrorCode, Result};
pub use info::{
    ColorModel, Density, DensityUnit, FileBackground, SourceDescriptor, SourceEncoding,
    SourceMetadata, Transparency,
};
pub use limits::{
    DEFAULT_MAX_DECODER_MEMORY, DEFAULT_MAX_DIMENSION, LimitExceeded, ResourceLimits,
};
pub use output::{ConvertOutput, Dib, DibHeader};
pub use raster::{
    BI_RGB, DEFAULT_RESOLUTION, FILE_HEADER_SIZE, Geometry, HEADER_SIZE, row_stride,
};
pub use samples::repack_2bit_to_4bit;
pub use source::{PngSource, RawSource};
pub use strategy::{PaletteKind, Selection, Strategy, WorkingLayout, select as select_strategy};
pub use traits::SourceImage;

// Re-exports for callers.
pub use imgref::ImgRef;
pub use rgb;
pub use rgb::Rgb;
pub use rgb::alt::BGRA as Bgra;

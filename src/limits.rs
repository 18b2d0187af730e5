//! Resource limits for conversion runs.
//!
//! [`ResourceLimits`] caps what a single run may consume. [`LimitExceeded`]
//! is returned when a check fails. Dimension checks run right after the
//! source header is parsed, before any pixel work or output allocation.

use crate::info::SourceDescriptor;

/// Largest width or height accepted by [`ResourceLimits::standard()`].
pub const DEFAULT_MAX_DIMENSION: u32 = 100_000;

/// Cap on decoder-side ancillary allocations used by [`ResourceLimits::standard()`].
pub const DEFAULT_MAX_DECODER_MEMORY: u64 = 1_000_000;

/// Resource limits for a conversion run.
///
/// Used to reject pathological inputs before they exhaust memory. All fields
/// are optional; `None` means no limit for that resource.
///
/// # Example
///
/// ```
/// use zendib::ResourceLimits;
///
/// let limits = ResourceLimits::standard()
///     .with_max_pixels(100_000_000)
///     .with_max_file_size(64 * 1024 * 1024);
/// assert!(limits.check_dimensions(4000, 3000).is_ok());
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[non_exhaustive]
pub struct ResourceLimits {
    /// Maximum total pixels (width × height).
    pub max_pixels: Option<u64>,
    /// Maximum size of the finished DIB in bytes.
    pub max_memory_bytes: Option<u64>,
    /// Maximum image width in pixels.
    pub max_width: Option<u32>,
    /// Maximum image height in pixels.
    pub max_height: Option<u32>,
    /// Maximum input file size in bytes.
    pub max_file_size: Option<u64>,
    /// Largest ancillary chunk payload read; bigger chunks are skipped.
    pub max_decoder_bytes: Option<u64>,
}

impl ResourceLimits {
    /// No limits (all fields `None`).
    pub fn none() -> Self {
        Self::default()
    }

    /// The limits a viewer applies by default: 100 000 pixels per side and a
    /// 1 MB cap on decoder chunk allocations.
    pub fn standard() -> Self {
        Self::none()
            .with_max_width(DEFAULT_MAX_DIMENSION)
            .with_max_height(DEFAULT_MAX_DIMENSION)
            .with_max_decoder_bytes(DEFAULT_MAX_DECODER_MEMORY)
    }

    /// Set maximum total pixels.
    pub fn with_max_pixels(mut self, max: u64) -> Self {
        self.max_pixels = Some(max);
        self
    }

    /// Set maximum output allocation in bytes.
    pub fn with_max_memory(mut self, bytes: u64) -> Self {
        self.max_memory_bytes = Some(bytes);
        self
    }

    /// Set maximum image width in pixels.
    pub fn with_max_width(mut self, width: u32) -> Self {
        self.max_width = Some(width);
        self
    }

    /// Set maximum image height in pixels.
    pub fn with_max_height(mut self, height: u32) -> Self {
        self.max_height = Some(height);
        self
    }

    /// Set maximum input file size in bytes.
    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = Some(bytes);
        self
    }

    /// Set the ancillary chunk cap in bytes.
    pub fn with_max_decoder_bytes(mut self, bytes: u64) -> Self {
        self.max_decoder_bytes = Some(bytes);
        self
    }

    // --- Validation methods ---

    /// Check image dimensions against `max_width`, `max_height`, and `max_pixels`.
    pub fn check_dimensions(&self, width: u32, height: u32) -> Result<(), LimitExceeded> {
        if let Some(max) = self.max_width
            && width > max
        {
            return Err(LimitExceeded::Width { actual: width, max });
        }
        if let Some(max) = self.max_height
            && height > max
        {
            return Err(LimitExceeded::Height {
                actual: height,
                max,
            });
        }
        if let Some(max) = self.max_pixels {
            let pixels = width as u64 * height as u64;
            if pixels > max {
                return Err(LimitExceeded::Pixels {
                    actual: pixels,
                    max,
                });
            }
        }
        Ok(())
    }

    /// Check an output allocation size against `max_memory_bytes`.
    pub fn check_memory(&self, bytes: u64) -> Result<(), LimitExceeded> {
        if let Some(max) = self.max_memory_bytes
            && bytes > max
        {
            return Err(LimitExceeded::Memory { actual: bytes, max });
        }
        Ok(())
    }

    /// Check input file size against `max_file_size`.
    pub fn check_file_size(&self, bytes: u64) -> Result<(), LimitExceeded> {
        if let Some(max) = self.max_file_size
            && bytes > max
        {
            return Err(LimitExceeded::FileSize { actual: bytes, max });
        }
        Ok(())
    }

    /// Check a parsed [`SourceDescriptor`] against the dimension limits.
    ///
    /// This is the earliest rejection point for oversized images: call it as
    /// soon as the header is known, before any pixel data is read.
    pub fn check_descriptor(&self, descriptor: &SourceDescriptor) -> Result<(), LimitExceeded> {
        self.check_dimensions(descriptor.width, descriptor.height)
    }
}

/// A resource limit was exceeded.
///
/// Each variant carries the actual value and the limit that was exceeded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LimitExceeded {
    /// Image width exceeded `max_width`.
    Width {
        /// Actual width.
        actual: u32,
        /// Maximum allowed.
        max: u32,
    },
    /// Image height exceeded `max_height`.
    Height {
        /// Actual height.
        actual: u32,
        /// Maximum allowed.
        max: u32,
    },
    /// Pixel count exceeded `max_pixels`.
    Pixels {
        /// Actual pixel count.
        actual: u64,
        /// Maximum allowed.
        max: u64,
    },
    /// Output size exceeded `max_memory_bytes`.
    Memory {
        /// Size in bytes.
        actual: u64,
        /// Maximum allowed.
        max: u64,
    },
    /// Input file size exceeded `max_file_size`.
    FileSize {
        /// Actual file size in bytes.
        actual: u64,
        /// Maximum allowed.
        max: u64,
    },
}

impl core::fmt::Display for LimitExceeded {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Width { actual, max } => write!(f, "width {actual} exceeds limit {max}"),
            Self::Height { actual, max } => write!(f, "height {actual} exceeds limit {max}"),
            Self::Pixels { actual, max } => {
                write!(f, "pixel count {actual} exceeds limit {max}")
            }
            Self::Memory { actual, max } => {
                write!(f, "memory {actual} bytes exceeds limit {max}")
            }
            Self::FileSize { actual, max } => {
                write!(f, "file size {actual} bytes exceeds limit {max}")
            }
        }
    }
}

impl core::error::Error for LimitExceeded {}

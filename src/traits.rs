//! The row-supplier interface conversions read from.
//!
//! A [`SourceImage`] is a decoded raster seen through three windows: the
//! header ([`SourceDescriptor`]), ancillary chunks ([`SourceMetadata`]) and a
//! top-down row iterator. [`PngSource`](crate::PngSource) implements it over
//! the `png` crate; [`RawSource`](crate::RawSource) over rows already in memory.

use crate::error::Result;
use crate::info::{SourceDescriptor, SourceMetadata};

/// A decoded source raster.
///
/// Rows are raw samples at the descriptor's native bit depth: packed
/// most-significant-bit first below 8 bits, big-endian pairs at 16 bits,
/// with no filter byte. Interlaced sources must yield rows in final image
/// order.
pub trait SourceImage {
    /// Header fields. Fixed for the life of the source.
    fn descriptor(&self) -> &SourceDescriptor;

    /// Ancillary metadata. Fixed for the life of the source.
    fn metadata(&self) -> &SourceMetadata;

    /// Next row, top-down. `Ok(None)` once every row has been returned.
    ///
    /// Decode or read failures surface here.
    fn next_row(&mut self) -> Result<Option<&[u8]>>;
}

impl<T: SourceImage + ?Sized> SourceImage for &mut T {
    fn descriptor(&self) -> &SourceDescriptor {
        (**self).descriptor()
    }

    fn metadata(&self) -> &SourceMetadata {
        (**self).metadata()
    }

    fn next_row(&mut self) -> Result<Option<&[u8]>> {
        (**self).next_row()
    }
}

impl<T: SourceImage + ?Sized> SourceImage for Box<T> {
    fn descriptor(&self) -> &SourceDescriptor {
        (**self).descriptor()
    }

    fn metadata(&self) -> &SourceMetadata {
        (**self).metadata()
    }

    fn next_row(&mut self) -> Result<Option<&[u8]>> {
        (**self).next_row()
    }
}

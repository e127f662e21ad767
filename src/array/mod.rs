//! Zero-copy views over GeoArrow arrays and the raw-buffer builder.

pub(crate) mod coord;
mod offsets;
pub(crate) mod raw;
mod view;

pub use coord::{
    CoordBuffer, CoordBufferBuilder, InterleavedCoordBuffer, InterleavedCoordBufferBuilder,
    SeparatedCoordBuffer, SeparatedCoordBufferBuilder,
};
pub use offsets::OffsetsBuilder;
pub use raw::RawArrayBuilder;
pub use view::GeometryArrayView;

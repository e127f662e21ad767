//! Visitor-driven builders for native GeoArrow arrays.
//!
//! Each builder implements [`GeomVisitor`](crate::visitor::GeomVisitor) and
//! turns the event stream of a reader into the offset and coordinate buffers
//! of its layout. Builders promote or truncate coordinate dimensions to
//! their target dimension (absent ordinates fill with NaN) and accept the
//! single-geometry counterpart of their multi type (a Point feature may be
//! written into a MultiPoint array, and so on). Incompatible geometry types
//! fail with `IncompatibleType`.

mod geometry;
mod linestring;
mod multilinestring;
mod multipoint;
mod multipolygon;
mod point;
mod polygon;

pub use geometry::NativeBuilder;
pub use linestring::LineStringBuilder;
pub use multilinestring::MultiLineStringBuilder;
pub use multipoint::MultiPointBuilder;
pub use multipolygon::MultiPolygonBuilder;
pub use point::PointBuilder;
pub use polygon::PolygonBuilder;

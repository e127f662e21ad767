//! GeoArrow geometry type and metadata definitions.
//!
//! The types in this module form a closed algebra over geometry type,
//! dimension, coordinate layout, edge interpretation and CRS. A
//! [`GeoArrowType`] round-trips losslessly through an Arrow [`Field`]
//! carrying `ARROW:extension:name` and `ARROW:extension:metadata` entries.
//!
//! [`Field`]: arrow_schema::Field

mod coord_type;
pub mod crs;
mod datatype;
mod dimension;
mod edges;
mod geometry_type;
mod metadata;
mod r#type;
pub mod type_id;

pub use coord_type::CoordType;
pub use crs::{Crs, CrsType};
pub use datatype::GeoArrowType;
pub use dimension::Dimension;
pub use edges::Edges;
pub use geometry_type::GeometryType;
pub use metadata::Metadata;
pub use r#type::{
    BoxType, LineStringType, MultiLineStringType, MultiPointType, MultiPolygonType, PointType,
    PolygonType, WkbType, WktType,
};

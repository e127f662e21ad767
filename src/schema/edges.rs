use serde::{Deserialize, Serialize};

/// Instructs consumers how an edge between two explicit coordinates should be
/// interpolated. If this value is omitted from the metadata, edges are
/// interpreted as planar.
///
/// Only [`Edges::Planar`] is interpreted by the kernels in this crate; the
/// other values round-trip through metadata, and operations that would need
/// to interpolate along a non-planar edge (notably the bounding-box kernels)
/// refuse such input.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Edges {
    /// Edges follow a straight path in the coordinate plane.
    #[serde(rename = "planar")]
    Planar,

    /// Edges follow a spherical great-circle path.
    ///
    /// See [the geoarrow
    /// specification](https://github.com/geoarrow/geoarrow/blob/main/extension-types.md#extension-metadata)
    /// for more information about how `edges` should be used.
    #[serde(rename = "spherical")]
    Spherical,

    /// Edges follow the Vincenty geodesic.
    #[serde(rename = "vincenty")]
    Vincenty,

    /// Edges follow the Thomas geodesic.
    #[serde(rename = "thomas")]
    Thomas,

    /// Edges follow the Andoyer geodesic.
    #[serde(rename = "andoyer")]
    Andoyer,

    /// Edges follow the Karney geodesic.
    #[serde(rename = "karney")]
    Karney,
}

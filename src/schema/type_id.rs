//! Packed integer identifiers for geometry types and full type descriptors.
//!
//! Two encodings live here:
//!
//! - The **ISO code** of a (geometry type, dimension) pair, identical to the
//!   ISO WKB type word: `dimension_group * 1000 + base`. This is what
//!   `unique_geometry_types_agg` emits.
//! - The **descriptor id** of a full native descriptor, which additionally
//!   packs the coordinate layout: `coord_group * 10000 + iso_code`. This is
//!   what the `type` kernel option of `as_geoarrow` accepts.

use crate::error::{GeoArrowError, Result};
use crate::schema::{CoordType, Dimension, GeoArrowType, GeometryType};

/// Compute the ISO type code for a geometry type and dimension combination.
///
/// For example, `POINT ZM` is 3001 and `MULTIPOINT` (XY) is 4.
pub fn iso_code(geometry_type: GeometryType, dim: Dimension) -> i32 {
    (dim.iso_group() * 1000 + u32::from(geometry_type)) as i32
}

/// Split an ISO type code back into its geometry type and dimension.
pub fn parse_iso_code(code: i32) -> Result<(GeometryType, Dimension)> {
    if code < 0 {
        return Err(GeoArrowError::IllegalArgument(format!(
            "Negative ISO type code: {code}"
        )));
    }
    let code = code as u32;
    let dim = match code / 1000 {
        0 => Dimension::XY,
        1 => Dimension::XYZ,
        2 => Dimension::XYM,
        3 => Dimension::XYZM,
        group => {
            return Err(GeoArrowError::IllegalArgument(format!(
                "Invalid ISO dimension group: {group}"
            )))
        }
    };
    let geometry_type = GeometryType::from_wkb_code(code % 1000)
        .map_err(|_| GeoArrowError::IllegalArgument(format!("Invalid ISO type code: {code}")))?;
    Ok((geometry_type, dim))
}

fn coord_group(coord_type: CoordType) -> i32 {
    match coord_type {
        CoordType::Separated => 0,
        CoordType::Interleaved => 1,
    }
}

impl GeoArrowType {
    /// The packed descriptor id of this type.
    ///
    /// Only defined for native parameterized descriptors; serialized and box
    /// descriptors have no id.
    pub fn type_id(&self) -> Result<i32> {
        match (self.geometry_type(), self.dimension(), self.coord_type()) {
            (GeometryType::Geometry | GeometryType::Box, _, _) | (_, None, _) | (_, _, None) => {
                Err(GeoArrowError::IllegalArgument(format!(
                    "No packed descriptor id for {self:?}"
                )))
            }
            (geometry_type, Some(dim), Some(coord_type)) => {
                Ok(coord_group(coord_type) * 10000 + iso_code(geometry_type, dim))
            }
        }
    }

    /// Parse a packed descriptor id produced by [`type_id`][Self::type_id].
    pub fn from_type_id(id: i32) -> Result<Self> {
        let coord_type = match id / 10000 {
            0 => CoordType::Separated,
            1 => CoordType::Interleaved,
            group => {
                return Err(GeoArrowError::IllegalArgument(format!(
                    "Invalid coordinate layout group: {group}"
                )))
            }
        };
        let (geometry_type, dim) = parse_iso_code(id % 10000)?;
        Self::new(geometry_type, dim, coord_type)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn iso_codes_match_wkb() {
        assert_eq!(iso_code(GeometryType::Point, Dimension::XYZM), 3001);
        assert_eq!(iso_code(GeometryType::LineString, Dimension::XYM), 2002);
        assert_eq!(iso_code(GeometryType::Polygon, Dimension::XYZ), 1003);
        assert_eq!(iso_code(GeometryType::MultiPoint, Dimension::XY), 4);
    }

    #[test]
    fn descriptor_id_round_trip() {
        for geometry_type in [
            GeometryType::Point,
            GeometryType::LineString,
            GeometryType::Polygon,
            GeometryType::MultiPoint,
            GeometryType::MultiLineString,
            GeometryType::MultiPolygon,
        ] {
            for dim in [
                Dimension::XY,
                Dimension::XYZ,
                Dimension::XYM,
                Dimension::XYZM,
            ] {
                for coord_type in [CoordType::Separated, CoordType::Interleaved] {
                    let descriptor =
                        GeoArrowType::new(geometry_type, dim, coord_type).unwrap();
                    let id = descriptor.type_id().unwrap();
                    assert_eq!(GeoArrowType::from_type_id(id).unwrap(), descriptor);
                }
            }
        }
    }

    #[test]
    fn invalid_descriptor_ids_rejected() {
        assert!(GeoArrowType::from_type_id(0).is_err());
        assert!(GeoArrowType::from_type_id(7).is_err());
        assert!(GeoArrowType::from_type_id(20003).is_err());
        assert!(GeoArrowType::from_type_id(-1).is_err());
    }
}

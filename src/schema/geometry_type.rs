use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::error::{GeoArrowError, Result};

/// The closed set of GeoArrow geometry types.
///
/// The discriminants of the parameterized types match their ISO WKB geometry
/// type codes. [`GeometryType::Geometry`] signals an unparameterized array
/// (WKB or WKT storage).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u32)]
pub enum GeometryType {
    /// Unparameterized; the array stores serialized geometries of any type.
    Geometry = 0,
    /// Point
    Point = 1,
    /// LineString
    LineString = 2,
    /// Polygon
    Polygon = 3,
    /// MultiPoint
    MultiPoint = 4,
    /// MultiLineString
    MultiLineString = 5,
    /// MultiPolygon
    MultiPolygon = 6,
    /// GeometryCollection
    GeometryCollection = 7,
    /// Box (a bounding rectangle; not a WKB-representable type)
    Box = 8,
}

impl GeometryType {
    /// The ISO WKB base code of this geometry type.
    ///
    /// Errors for [`GeometryType::Geometry`] and [`GeometryType::Box`], which
    /// have no WKB representation of their own.
    pub fn wkb_code(&self) -> Result<u32> {
        match self {
            GeometryType::Geometry | GeometryType::Box => Err(GeoArrowError::IllegalArgument(
                format!("{self:?} has no ISO WKB type code"),
            )),
            _ => Ok(u32::from(*self)),
        }
    }

    /// Parse a base WKB geometry type code (after stripping any dimension
    /// group or EWKB flags).
    pub fn from_wkb_code(code: u32) -> Result<Self> {
        match code {
            1..=7 => Ok(Self::try_from(code).unwrap()),
            code => Err(GeoArrowError::Parse(format!(
                "Unknown WKB geometry type code: {code}"
            ))),
        }
    }

    /// The uppercase tag used in WKT for this geometry type.
    pub fn wkt_tag(&self) -> &'static str {
        match self {
            GeometryType::Geometry => "GEOMETRY",
            GeometryType::Point => "POINT",
            GeometryType::LineString => "LINESTRING",
            GeometryType::Polygon => "POLYGON",
            GeometryType::MultiPoint => "MULTIPOINT",
            GeometryType::MultiLineString => "MULTILINESTRING",
            GeometryType::MultiPolygon => "MULTIPOLYGON",
            GeometryType::GeometryCollection => "GEOMETRYCOLLECTION",
            GeometryType::Box => "BOX",
        }
    }

    /// Whether this type contains rings (polygonal).
    pub fn is_polygonal(&self) -> bool {
        matches!(self, GeometryType::Polygon | GeometryType::MultiPolygon)
    }

    /// Whether this type is a collection of other geometries.
    pub fn is_multi(&self) -> bool {
        matches!(
            self,
            GeometryType::MultiPoint
                | GeometryType::MultiLineString
                | GeometryType::MultiPolygon
                | GeometryType::GeometryCollection
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn wkb_codes_match_discriminants() {
        assert_eq!(GeometryType::Point.wkb_code().unwrap(), 1);
        assert_eq!(GeometryType::GeometryCollection.wkb_code().unwrap(), 7);
        assert!(GeometryType::Geometry.wkb_code().is_err());
        assert!(GeometryType::Box.wkb_code().is_err());
    }

    #[test]
    fn unknown_code_rejected() {
        assert!(GeometryType::from_wkb_code(0).is_err());
        assert!(GeometryType::from_wkb_code(8).is_err());
        assert!(GeometryType::from_wkb_code(17).is_err());
    }
}

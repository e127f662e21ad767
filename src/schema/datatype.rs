use std::collections::HashMap;
use std::sync::Arc;

use arrow_schema::{DataType, Field};

use crate::error::{GeoArrowError, Result};
use crate::schema::r#type::{
    BoxType, LineStringType, MultiLineStringType, MultiPointType, MultiPolygonType, PointType,
    PolygonType, WkbType, WktType,
};
use crate::schema::{CoordType, Crs, Dimension, Edges, GeometryType, Metadata};

/// The Arrow field metadata key holding an extension type name.
pub(crate) const EXTENSION_NAME_KEY: &str = "ARROW:extension:name";

/// The Arrow field metadata key holding serialized extension metadata.
pub(crate) const EXTENSION_METADATA_KEY: &str = "ARROW:extension:metadata";

/// A type enum representing all possible GeoArrow geometry types, including
/// both "native" and "serialized" encodings.
///
/// Each variant carries a complete descriptor: geometry type, dimension and
/// coordinate layout where applicable, and [`Metadata`] (edge interpretation
/// plus CRS). Descriptors are immutable values; the `with_*` methods return
/// new descriptors.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GeoArrowType {
    /// A Point array.
    Point(PointType),
    /// A LineString array.
    LineString(LineStringType),
    /// A Polygon array.
    Polygon(PolygonType),
    /// A MultiPoint array.
    MultiPoint(MultiPointType),
    /// A MultiLineString array.
    MultiLineString(MultiLineStringType),
    /// A MultiPolygon array.
    MultiPolygon(MultiPolygonType),
    /// A Box (bounding rectangle) array.
    Rect(BoxType),
    /// A WKB array with `i32` offsets.
    Wkb(WkbType),
    /// A WKB array with `i64` offsets.
    LargeWkb(WkbType),
    /// A WKT array with `i32` offsets.
    Wkt(WktType),
    /// A WKT array with `i64` offsets.
    LargeWkt(WktType),
}

impl GeoArrowType {
    /// Construct a native descriptor from its three axes, with default
    /// (planar, CRS-less) metadata.
    ///
    /// Errors for [`GeometryType::Geometry`] (use [`WkbType`]/[`WktType`]
    /// directly, which have no dimension or coordinate layout) and
    /// [`GeometryType::GeometryCollection`] (which has no native storage
    /// layout; collections round-trip through WKB or WKT).
    pub fn new(
        geometry_type: GeometryType,
        dim: Dimension,
        coord_type: CoordType,
    ) -> Result<Self> {
        let metadata: Arc<Metadata> = Default::default();
        let out = match geometry_type {
            GeometryType::Point => Self::Point(PointType::new(coord_type, dim, metadata)),
            GeometryType::LineString => {
                Self::LineString(LineStringType::new(coord_type, dim, metadata))
            }
            GeometryType::Polygon => Self::Polygon(PolygonType::new(coord_type, dim, metadata)),
            GeometryType::MultiPoint => {
                Self::MultiPoint(MultiPointType::new(coord_type, dim, metadata))
            }
            GeometryType::MultiLineString => {
                Self::MultiLineString(MultiLineStringType::new(coord_type, dim, metadata))
            }
            GeometryType::MultiPolygon => {
                Self::MultiPolygon(MultiPolygonType::new(coord_type, dim, metadata))
            }
            GeometryType::Box => Self::Rect(BoxType::new(dim, metadata)),
            GeometryType::Geometry | GeometryType::GeometryCollection => {
                return Err(GeoArrowError::IllegalArgument(format!(
                    "{geometry_type:?} has no native GeoArrow storage layout"
                )))
            }
        };
        Ok(out)
    }

    /// The geometry type axis of this descriptor.
    ///
    /// Serialized (WKB/WKT) arrays report [`GeometryType::Geometry`].
    pub fn geometry_type(&self) -> GeometryType {
        use GeoArrowType::*;
        match self {
            Point(_) => GeometryType::Point,
            LineString(_) => GeometryType::LineString,
            Polygon(_) => GeometryType::Polygon,
            MultiPoint(_) => GeometryType::MultiPoint,
            MultiLineString(_) => GeometryType::MultiLineString,
            MultiPolygon(_) => GeometryType::MultiPolygon,
            Rect(_) => GeometryType::Box,
            Wkb(_) | LargeWkb(_) | Wkt(_) | LargeWkt(_) => GeometryType::Geometry,
        }
    }

    /// Get the [`Dimension`] of this data type, if it has one.
    ///
    /// Serialized arrays have no fixed dimension.
    pub fn dimension(&self) -> Option<Dimension> {
        use GeoArrowType::*;
        match self {
            Point(t) => Some(t.dimension()),
            LineString(t) => Some(t.dimension()),
            Polygon(t) => Some(t.dimension()),
            MultiPoint(t) => Some(t.dimension()),
            MultiLineString(t) => Some(t.dimension()),
            MultiPolygon(t) => Some(t.dimension()),
            Rect(t) => Some(t.dimension()),
            Wkb(_) | LargeWkb(_) | Wkt(_) | LargeWkt(_) => None,
        }
    }

    /// Get the [`CoordType`] of this data type, if it has one.
    pub fn coord_type(&self) -> Option<CoordType> {
        use GeoArrowType::*;
        match self {
            Point(t) => Some(t.coord_type()),
            LineString(t) => Some(t.coord_type()),
            Polygon(t) => Some(t.coord_type()),
            MultiPoint(t) => Some(t.coord_type()),
            MultiLineString(t) => Some(t.coord_type()),
            MultiPolygon(t) => Some(t.coord_type()),
            Rect(_) => Some(CoordType::Separated),
            Wkb(_) | LargeWkb(_) | Wkt(_) | LargeWkt(_) => None,
        }
    }

    /// Access the [`Metadata`] of this descriptor.
    pub fn metadata(&self) -> &Arc<Metadata> {
        use GeoArrowType::*;
        match self {
            Point(t) => t.metadata(),
            LineString(t) => t.metadata(),
            Polygon(t) => t.metadata(),
            MultiPoint(t) => t.metadata(),
            MultiLineString(t) => t.metadata(),
            MultiPolygon(t) => t.metadata(),
            Rect(t) => t.metadata(),
            Wkb(t) | LargeWkb(t) => t.metadata(),
            Wkt(t) | LargeWkt(t) => t.metadata(),
        }
    }

    /// Whether this is a native (non-serialized) descriptor.
    pub fn is_native(&self) -> bool {
        !matches!(
            self,
            GeoArrowType::Wkb(_)
                | GeoArrowType::LargeWkb(_)
                | GeoArrowType::Wkt(_)
                | GeoArrowType::LargeWkt(_)
        )
    }

    /// The GeoArrow extension name of this type.
    pub fn extension_name(&self) -> &'static str {
        use GeoArrowType::*;
        match self {
            Point(_) => PointType::NAME,
            LineString(_) => LineStringType::NAME,
            Polygon(_) => PolygonType::NAME,
            MultiPoint(_) => MultiPointType::NAME,
            MultiLineString(_) => MultiLineStringType::NAME,
            MultiPolygon(_) => MultiPolygonType::NAME,
            Rect(_) => BoxType::NAME,
            Wkb(_) | LargeWkb(_) => WkbType::NAME,
            Wkt(_) | LargeWkt(_) => WktType::NAME,
        }
    }

    /// The Arrow storage type of this descriptor.
    pub fn data_type(&self) -> DataType {
        use GeoArrowType::*;
        match self {
            Point(t) => t.data_type(),
            LineString(t) => t.data_type(),
            Polygon(t) => t.data_type(),
            MultiPoint(t) => t.data_type(),
            MultiLineString(t) => t.data_type(),
            MultiPolygon(t) => t.data_type(),
            Rect(t) => t.data_type(),
            Wkb(_) => DataType::Binary,
            LargeWkb(_) => DataType::LargeBinary,
            Wkt(_) => DataType::Utf8,
            LargeWkt(_) => DataType::LargeUtf8,
        }
    }

    /// Convert this descriptor to an Arrow [Field] carrying the storage type
    /// but no extension metadata.
    pub fn to_storage_field<N: Into<String>>(&self, name: N, nullable: bool) -> Field {
        Field::new(name, self.data_type(), nullable)
    }

    /// Convert this descriptor to an Arrow [Field], attaching the
    /// `ARROW:extension:name` and (when non-default) the
    /// `ARROW:extension:metadata` entries.
    pub fn to_field<N: Into<String>>(&self, name: N, nullable: bool) -> Field {
        let mut field_metadata = HashMap::with_capacity(2);
        field_metadata.insert(
            EXTENSION_NAME_KEY.to_string(),
            self.extension_name().to_string(),
        );
        if let Some(ext_meta) = self.metadata().serialize() {
            field_metadata.insert(EXTENSION_METADATA_KEY.to_string(), ext_meta);
        }
        self.to_storage_field(name, nullable)
            .with_metadata(field_metadata)
    }

    /// Parse an Arrow [Field] carrying GeoArrow extension metadata into a
    /// descriptor.
    ///
    /// Errors if the field has no `ARROW:extension:name` entry, the name is
    /// not a recognized `geoarrow.*` name, the metadata is malformed JSON, or
    /// the storage type contradicts the extension name.
    pub fn from_extension_field(field: &Field) -> Result<Self> {
        let extension_name = field.metadata().get(EXTENSION_NAME_KEY).ok_or_else(|| {
            GeoArrowError::IllegalArgument(format!(
                "Field {} has no Arrow extension name",
                field.name()
            ))
        })?;
        let extension_metadata = field.metadata().get(EXTENSION_METADATA_KEY);
        Self::from_storage(
            field.data_type(),
            extension_name,
            extension_metadata.map(|s| s.as_str()),
        )
    }

    /// Parse a storage type plus out-of-band extension name and metadata into
    /// a descriptor.
    pub fn from_storage(
        data_type: &DataType,
        extension_name: &str,
        extension_metadata: Option<&str>,
    ) -> Result<Self> {
        let metadata = Arc::new(Metadata::deserialize(extension_metadata)?);
        let out = match extension_name {
            PointType::NAME => {
                let (coord_type, dim) = PointType::parse_data_type(data_type)?;
                Self::Point(PointType::new(coord_type, dim, metadata))
            }
            LineStringType::NAME => {
                let (coord_type, dim) = LineStringType::parse_data_type(data_type)?;
                Self::LineString(LineStringType::new(coord_type, dim, metadata))
            }
            PolygonType::NAME => {
                let (coord_type, dim) = PolygonType::parse_data_type(data_type)?;
                Self::Polygon(PolygonType::new(coord_type, dim, metadata))
            }
            MultiPointType::NAME => {
                let (coord_type, dim) = MultiPointType::parse_data_type(data_type)?;
                Self::MultiPoint(MultiPointType::new(coord_type, dim, metadata))
            }
            MultiLineStringType::NAME => {
                let (coord_type, dim) = MultiLineStringType::parse_data_type(data_type)?;
                Self::MultiLineString(MultiLineStringType::new(coord_type, dim, metadata))
            }
            MultiPolygonType::NAME => {
                let (coord_type, dim) = MultiPolygonType::parse_data_type(data_type)?;
                Self::MultiPolygon(MultiPolygonType::new(coord_type, dim, metadata))
            }
            BoxType::NAME => {
                let dim = BoxType::parse_data_type(data_type)?;
                Self::Rect(BoxType::new(dim, metadata))
            }
            WkbType::NAME => {
                if WkbType::check_data_type(data_type)? {
                    Self::LargeWkb(WkbType::new(metadata))
                } else {
                    Self::Wkb(WkbType::new(metadata))
                }
            }
            WktType::NAME => {
                if WktType::check_data_type(data_type)? {
                    Self::LargeWkt(WktType::new(metadata))
                } else {
                    Self::Wkt(WktType::new(metadata))
                }
            }
            name => {
                return Err(GeoArrowError::IllegalArgument(format!(
                    "Unrecognized GeoArrow extension name: {name}"
                )))
            }
        };
        Ok(out)
    }

    /// Returns a descriptor with the given geometry type, keeping the
    /// dimension, coordinate layout and metadata.
    ///
    /// Errors for serialized descriptors (which have no geometry-type
    /// parameter) and for targets without a native storage layout.
    pub fn with_geometry_type(&self, geometry_type: GeometryType) -> Result<Self> {
        match (self.dimension(), self.coord_type()) {
            (Some(dim), Some(coord_type)) => Ok(Self::new(geometry_type, dim, coord_type)?
                .with_metadata(self.metadata().clone())),
            _ => Err(GeoArrowError::IllegalArgument(
                "Serialized arrays have no geometry type parameter".to_string(),
            )),
        }
    }

    /// Returns a descriptor with the same geometry type and metadata but the
    /// given dimension.
    ///
    /// Errors for serialized descriptors, which carry no dimension.
    pub fn with_dimension(&self, dim: Dimension) -> Result<Self> {
        use GeoArrowType::*;
        let out = match self.clone() {
            Point(t) => Point(t.with_dimension(dim)),
            LineString(t) => LineString(t.with_dimension(dim)),
            Polygon(t) => Polygon(t.with_dimension(dim)),
            MultiPoint(t) => MultiPoint(t.with_dimension(dim)),
            MultiLineString(t) => MultiLineString(t.with_dimension(dim)),
            MultiPolygon(t) => MultiPolygon(t.with_dimension(dim)),
            Rect(t) => Rect(t.with_dimension(dim)),
            Wkb(_) | LargeWkb(_) | Wkt(_) | LargeWkt(_) => {
                return Err(GeoArrowError::IllegalArgument(
                    "Serialized arrays have no dimension parameter".to_string(),
                ))
            }
        };
        Ok(out)
    }

    /// Returns a descriptor with the same geometry type and metadata but the
    /// given coordinate layout.
    ///
    /// Errors for serialized and box descriptors, which carry no coordinate
    /// layout parameter.
    pub fn with_coord_type(&self, coord_type: CoordType) -> Result<Self> {
        use GeoArrowType::*;
        let out = match self.clone() {
            Point(t) => Point(t.with_coord_type(coord_type)),
            LineString(t) => LineString(t.with_coord_type(coord_type)),
            Polygon(t) => Polygon(t.with_coord_type(coord_type)),
            MultiPoint(t) => MultiPoint(t.with_coord_type(coord_type)),
            MultiLineString(t) => MultiLineString(t.with_coord_type(coord_type)),
            MultiPolygon(t) => MultiPolygon(t.with_coord_type(coord_type)),
            Rect(_) | Wkb(_) | LargeWkb(_) | Wkt(_) | LargeWkt(_) => {
                return Err(GeoArrowError::IllegalArgument(
                    "This type has no coordinate layout parameter".to_string(),
                ))
            }
        };
        Ok(out)
    }

    /// Returns a descriptor with the given metadata.
    pub fn with_metadata(&self, metadata: Arc<Metadata>) -> Self {
        use GeoArrowType::*;
        match self.clone() {
            Point(t) => Point(t.with_metadata(metadata)),
            LineString(t) => LineString(t.with_metadata(metadata)),
            Polygon(t) => Polygon(t.with_metadata(metadata)),
            MultiPoint(t) => MultiPoint(t.with_metadata(metadata)),
            MultiLineString(t) => MultiLineString(t.with_metadata(metadata)),
            MultiPolygon(t) => MultiPolygon(t.with_metadata(metadata)),
            Rect(t) => Rect(t.with_metadata(metadata)),
            Wkb(t) => Wkb(t.with_metadata(metadata)),
            LargeWkb(t) => LargeWkb(t.with_metadata(metadata)),
            Wkt(t) => Wkt(t.with_metadata(metadata)),
            LargeWkt(t) => LargeWkt(t.with_metadata(metadata)),
        }
    }

    /// Returns a descriptor with the given edge interpretation, keeping the
    /// CRS.
    pub fn with_edges(&self, edges: Edges) -> Self {
        let metadata = Metadata::new(self.metadata().crs().clone(), Some(edges));
        self.with_metadata(Arc::new(metadata))
    }

    /// Returns a descriptor with the given CRS, keeping the edge
    /// interpretation.
    pub fn with_crs(&self, crs: Crs) -> Self {
        let metadata = Metadata::new(crs, self.metadata().edges());
        self.with_metadata(Arc::new(metadata))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn all_native_descriptors() -> Vec<GeoArrowType> {
        let mut out = vec![];
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
                    out.push(GeoArrowType::new(geometry_type, dim, coord_type).unwrap());
                }
            }
        }
        for dim in [Dimension::XY, Dimension::XYZ, Dimension::XYZM] {
            out.push(GeoArrowType::Rect(BoxType::new(dim, Default::default())));
        }
        out
    }

    #[test]
    fn extension_field_round_trip() {
        let mut descriptors = all_native_descriptors();
        descriptors.push(GeoArrowType::Wkb(WkbType::new(Default::default())));
        descriptors.push(GeoArrowType::LargeWkb(WkbType::new(Default::default())));
        descriptors.push(GeoArrowType::Wkt(WktType::new(Default::default())));
        descriptors.push(GeoArrowType::LargeWkt(WktType::new(Default::default())));

        for descriptor in descriptors {
            let field = descriptor.to_field("geometry", true);
            let back = GeoArrowType::from_extension_field(&field).unwrap();
            assert_eq!(back, descriptor);

            let storage = descriptor.to_storage_field("geometry", true);
            assert!(storage.metadata().is_empty());
            let back = GeoArrowType::from_storage(
                storage.data_type(),
                descriptor.extension_name(),
                descriptor.metadata().serialize().as_deref(),
            )
            .unwrap();
            assert_eq!(back, descriptor);
        }
    }

    #[test]
    fn metadata_round_trip() {
        let descriptor = GeoArrowType::new(
            GeometryType::Point,
            Dimension::XY,
            CoordType::Separated,
        )
        .unwrap()
        .with_crs(Crs::from_authority_code("EPSG:4326".to_string()))
        .with_edges(Edges::Spherical);

        let field = descriptor.to_field("geometry", true);
        let meta_json = field.metadata().get(EXTENSION_METADATA_KEY).unwrap();
        assert_eq!(
            meta_json,
            r#"{"crs":"EPSG:4326","crs_type":"authority_code","edges":"spherical"}"#
        );
        let back = GeoArrowType::from_extension_field(&field).unwrap();
        assert_eq!(back, descriptor);
    }

    #[test]
    fn storage_shape_must_match_name() {
        let point = GeoArrowType::new(GeometryType::Point, Dimension::XY, CoordType::Separated)
            .unwrap();
        // Point storage with a polygon name is inconsistent.
        assert!(
            GeoArrowType::from_storage(&point.data_type(), "geoarrow.polygon", None).is_err()
        );
        assert!(GeoArrowType::from_storage(&point.data_type(), "geoarrow.wkb", None).is_err());
    }

    #[test]
    fn unknown_extension_name_rejected() {
        assert!(GeoArrowType::from_storage(&DataType::Binary, "geoarrow.unknown", None).is_err());
        assert!(GeoArrowType::from_storage(&DataType::Binary, "arrow.json", None).is_err());
        let plain = Field::new("geometry", DataType::Binary, true);
        assert!(GeoArrowType::from_extension_field(&plain).is_err());
    }

    #[test]
    fn geometry_collection_has_no_native_layout() {
        assert!(GeoArrowType::new(
            GeometryType::GeometryCollection,
            Dimension::XY,
            CoordType::Separated
        )
        .is_err());
    }

    #[test]
    fn with_geometry_type_keeps_other_axes() {
        let point = GeoArrowType::new(GeometryType::Point, Dimension::XYZ, CoordType::Interleaved)
            .unwrap()
            .with_crs(Crs::from_authority_code("EPSG:4326".to_string()));
        let multi = point.with_geometry_type(GeometryType::MultiPoint).unwrap();
        assert_eq!(multi.geometry_type(), GeometryType::MultiPoint);
        assert_eq!(multi.dimension(), Some(Dimension::XYZ));
        assert_eq!(multi.coord_type(), Some(CoordType::Interleaved));
        assert_eq!(multi.metadata(), point.metadata());

        let wkt = GeoArrowType::Wkt(WktType::new(Default::default()));
        assert!(wkt.with_geometry_type(GeometryType::Point).is_err());
    }

    #[test]
    fn descriptors_are_immutable_values() {
        let a = GeoArrowType::new(GeometryType::Point, Dimension::XY, CoordType::Separated)
            .unwrap();
        let b = a.with_dimension(Dimension::XYZ).unwrap();
        assert_eq!(a.dimension(), Some(Dimension::XY));
        assert_eq!(b.dimension(), Some(Dimension::XYZ));
        assert_ne!(a, b);
    }
}

use std::sync::Arc;

use arrow_schema::{DataType, Field, Fields};

use crate::error::{GeoArrowError, Result};
use crate::schema::{CoordType, Dimension, Metadata};

pub(crate) fn coord_type_to_data_type(coord_type: CoordType, dim: Dimension) -> DataType {
    match coord_type {
        CoordType::Interleaved => {
            let values_field = Field::new(dim.interleaved_field_name(), DataType::Float64, false);
            DataType::FixedSizeList(Arc::new(values_field), dim.size() as i32)
        }
        CoordType::Separated => {
            let values_fields: Vec<Field> = dim
                .separated_field_names()
                .iter()
                .map(|name| Field::new(*name, DataType::Float64, false))
                .collect();
            DataType::Struct(values_fields.into())
        }
    }
}

pub(crate) fn parse_coords(data_type: &DataType) -> Result<(CoordType, Dimension)> {
    match data_type {
        DataType::FixedSizeList(inner_field, list_size) => {
            let dim = Dimension::from_interleaved_field(inner_field)?;
            if *list_size as usize != dim.size() {
                return Err(GeoArrowError::IllegalArgument(format!(
                    "Expected fixed size list of size {}, got {}",
                    dim.size(),
                    list_size
                )));
            }
            if !matches!(inner_field.data_type(), DataType::Float64) {
                return Err(GeoArrowError::IllegalArgument(format!(
                    "Expected Float64 interleaved coordinates, got {}",
                    inner_field.data_type()
                )));
            }
            Ok((CoordType::Interleaved, dim))
        }
        DataType::Struct(struct_fields) => {
            let dim = Dimension::from_separated_fields(struct_fields)?;
            for field in struct_fields {
                if !matches!(field.data_type(), DataType::Float64) {
                    return Err(GeoArrowError::IllegalArgument(format!(
                        "Expected Float64 separated coordinates, got {}",
                        field.data_type()
                    )));
                }
            }
            Ok((CoordType::Separated, dim))
        }
        dt => Err(GeoArrowError::IllegalArgument(format!(
            "Unexpected coordinate data type {dt}"
        ))),
    }
}

fn inner_list_field(data_type: &DataType) -> Result<&Field> {
    match data_type {
        DataType::List(inner_field) => Ok(inner_field),
        dt => Err(GeoArrowError::IllegalArgument(format!(
            "Unexpected data type {dt}, expected a list"
        ))),
    }
}

macro_rules! impl_geometry_type {
    ($struct_name:ident, $ext_name:literal, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub struct $struct_name {
            coord_type: CoordType,
            dim: Dimension,
            metadata: Arc<Metadata>,
        }

        impl $struct_name {
            /// The GeoArrow extension name of this type.
            pub const NAME: &'static str = $ext_name;

            /// Construct a new type descriptor.
            pub fn new(coord_type: CoordType, dim: Dimension, metadata: Arc<Metadata>) -> Self {
                Self {
                    coord_type,
                    dim,
                    metadata,
                }
            }

            /// The coordinate layout of this type.
            pub fn coord_type(&self) -> CoordType {
                self.coord_type
            }

            /// The dimension of this type.
            pub fn dimension(&self) -> Dimension {
                self.dim
            }

            /// The metadata attached to this type.
            pub fn metadata(&self) -> &Arc<Metadata> {
                &self.metadata
            }

            /// Returns a copy of this type with the given coordinate layout.
            pub fn with_coord_type(self, coord_type: CoordType) -> Self {
                Self { coord_type, ..self }
            }

            /// Returns a copy of this type with the given dimension.
            pub fn with_dimension(self, dim: Dimension) -> Self {
                Self { dim, ..self }
            }

            /// Returns a copy of this type with the given metadata.
            pub fn with_metadata(self, metadata: Arc<Metadata>) -> Self {
                Self { metadata, ..self }
            }
        }
    };
}

impl_geometry_type!(PointType, "geoarrow.point", "A GeoArrow Point type.");
impl_geometry_type!(
    LineStringType,
    "geoarrow.linestring",
    "A GeoArrow LineString type."
);
impl_geometry_type!(PolygonType, "geoarrow.polygon", "A GeoArrow Polygon type.");
impl_geometry_type!(
    MultiPointType,
    "geoarrow.multipoint",
    "A GeoArrow MultiPoint type."
);
impl_geometry_type!(
    MultiLineStringType,
    "geoarrow.multilinestring",
    "A GeoArrow MultiLineString type."
);
impl_geometry_type!(
    MultiPolygonType,
    "geoarrow.multipolygon",
    "A GeoArrow MultiPolygon type."
);

impl PointType {
    /// The Arrow storage type of this geometry type.
    pub fn data_type(&self) -> DataType {
        coord_type_to_data_type(self.coord_type, self.dim)
    }

    pub(crate) fn parse_data_type(data_type: &DataType) -> Result<(CoordType, Dimension)> {
        parse_coords(data_type)
    }
}

impl LineStringType {
    /// The Arrow storage type of this geometry type.
    pub fn data_type(&self) -> DataType {
        let coords_type = coord_type_to_data_type(self.coord_type, self.dim);
        let vertices_field = Field::new("vertices", coords_type, false);
        DataType::List(vertices_field.into())
    }

    pub(crate) fn parse_data_type(data_type: &DataType) -> Result<(CoordType, Dimension)> {
        parse_coords(inner_list_field(data_type)?.data_type())
    }
}

impl PolygonType {
    /// The Arrow storage type of this geometry type.
    pub fn data_type(&self) -> DataType {
        let coords_type = coord_type_to_data_type(self.coord_type, self.dim);
        let vertices_field = Field::new("vertices", coords_type, false);
        let rings_field = Field::new_list("rings", vertices_field, false);
        DataType::List(rings_field.into())
    }

    pub(crate) fn parse_data_type(data_type: &DataType) -> Result<(CoordType, Dimension)> {
        let rings = inner_list_field(data_type)?;
        parse_coords(inner_list_field(rings.data_type())?.data_type())
    }
}

impl MultiPointType {
    /// The Arrow storage type of this geometry type.
    pub fn data_type(&self) -> DataType {
        let coords_type = coord_type_to_data_type(self.coord_type, self.dim);
        let points_field = Field::new("points", coords_type, false);
        DataType::List(points_field.into())
    }

    pub(crate) fn parse_data_type(data_type: &DataType) -> Result<(CoordType, Dimension)> {
        parse_coords(inner_list_field(data_type)?.data_type())
    }
}

impl MultiLineStringType {
    /// The Arrow storage type of this geometry type.
    pub fn data_type(&self) -> DataType {
        let coords_type = coord_type_to_data_type(self.coord_type, self.dim);
        let vertices_field = Field::new("vertices", coords_type, false);
        let linestrings_field = Field::new_list("linestrings", vertices_field, false);
        DataType::List(linestrings_field.into())
    }

    pub(crate) fn parse_data_type(data_type: &DataType) -> Result<(CoordType, Dimension)> {
        let linestrings = inner_list_field(data_type)?;
        parse_coords(inner_list_field(linestrings.data_type())?.data_type())
    }
}

impl MultiPolygonType {
    /// The Arrow storage type of this geometry type.
    pub fn data_type(&self) -> DataType {
        let coords_type = coord_type_to_data_type(self.coord_type, self.dim);
        let vertices_field = Field::new("vertices", coords_type, false);
        let rings_field = Field::new_list("rings", vertices_field, false);
        let polygons_field = Field::new_list("polygons", rings_field, false);
        DataType::List(polygons_field.into())
    }

    pub(crate) fn parse_data_type(data_type: &DataType) -> Result<(CoordType, Dimension)> {
        let polygons = inner_list_field(data_type)?;
        let rings = inner_list_field(polygons.data_type())?;
        parse_coords(inner_list_field(rings.data_type())?.data_type())
    }
}

/// A GeoArrow Box type, storing axis-aligned bounding rectangles.
///
/// Box arrays always use separated coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BoxType {
    dim: Dimension,
    metadata: Arc<Metadata>,
}

impl BoxType {
    /// The GeoArrow extension name of this type.
    pub const NAME: &'static str = "geoarrow.box";

    /// Construct a new type descriptor.
    pub fn new(dim: Dimension, metadata: Arc<Metadata>) -> Self {
        Self { dim, metadata }
    }

    /// The dimension of this type.
    pub fn dimension(&self) -> Dimension {
        self.dim
    }

    /// The metadata attached to this type.
    pub fn metadata(&self) -> &Arc<Metadata> {
        &self.metadata
    }

    /// Returns a copy of this type with the given dimension.
    pub fn with_dimension(self, dim: Dimension) -> Self {
        Self { dim, ..self }
    }

    /// Returns a copy of this type with the given metadata.
    pub fn with_metadata(self, metadata: Arc<Metadata>) -> Self {
        Self { metadata, ..self }
    }

    /// The names of the struct children, mins then maxes.
    pub(crate) fn field_names(&self) -> Vec<String> {
        let ordinates = self.dim.separated_field_names();
        let mut names: Vec<String> = ordinates.iter().map(|o| format!("{o}min")).collect();
        names.extend(ordinates.iter().map(|o| format!("{o}max")));
        names
    }

    /// The Arrow storage type of this geometry type.
    pub fn data_type(&self) -> DataType {
        let fields: Vec<Field> = self
            .field_names()
            .into_iter()
            .map(|name| Field::new(name, DataType::Float64, false))
            .collect();
        DataType::Struct(fields.into())
    }

    pub(crate) fn parse_data_type(data_type: &DataType) -> Result<Dimension> {
        let struct_fields = match data_type {
            DataType::Struct(struct_fields) => struct_fields,
            dt => {
                return Err(GeoArrowError::IllegalArgument(format!(
                    "Unexpected data type parsing box: {dt}"
                )))
            }
        };
        parse_box_fields(struct_fields)
    }
}

fn parse_box_fields(fields: &Fields) -> Result<Dimension> {
    let names: Vec<&str> = fields.iter().map(|f| f.name().as_str()).collect();
    match names.len() {
        4 => Ok(Dimension::XY),
        6 => {
            if names.contains(&"mmin") && names.contains(&"mmax") {
                Ok(Dimension::XYM)
            } else if names.contains(&"zmin") && names.contains(&"zmax") {
                Ok(Dimension::XYZ)
            } else {
                Err(GeoArrowError::IllegalArgument(format!(
                    "Expected either mmin/mmax or zmin/zmax in a 6-field box struct, got {names:?}"
                )))
            }
        }
        8 => Ok(Dimension::XYZM),
        n => Err(GeoArrowError::IllegalArgument(format!(
            "Unexpected number of box struct fields: {n}"
        ))),
    }
}

macro_rules! impl_serialized_type {
    ($struct_name:ident, $ext_name:literal, $small:path, $large:path, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub struct $struct_name {
            metadata: Arc<Metadata>,
        }

        impl $struct_name {
            /// The GeoArrow extension name of this type.
            pub const NAME: &'static str = $ext_name;

            /// Construct a new type descriptor.
            pub fn new(metadata: Arc<Metadata>) -> Self {
                Self { metadata }
            }

            /// The metadata attached to this type.
            pub fn metadata(&self) -> &Arc<Metadata> {
                &self.metadata
            }

            /// Returns a copy of this type with the given metadata.
            pub fn with_metadata(self, metadata: Arc<Metadata>) -> Self {
                Self { metadata }
            }

            pub(crate) fn check_data_type(data_type: &DataType) -> Result<bool> {
                match data_type {
                    $small => Ok(false),
                    $large => Ok(true),
                    dt => Err(GeoArrowError::IllegalArgument(format!(
                        "Unexpected data type {dt} for {}",
                        Self::NAME
                    ))),
                }
            }
        }
    };
}

impl_serialized_type!(
    WkbType,
    "geoarrow.wkb",
    DataType::Binary,
    DataType::LargeBinary,
    "A GeoArrow WKB type, storing ISO well-known binary blobs."
);
impl_serialized_type!(
    WktType,
    "geoarrow.wkt",
    DataType::Utf8,
    DataType::LargeUtf8,
    "A GeoArrow WKT type, storing ISO well-known text strings."
);

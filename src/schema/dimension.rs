use std::collections::HashSet;

use arrow_schema::{Field, Fields};

use crate::error::{GeoArrowError, Result};

/// The dimension of a geometry array.
///
/// An array stores a single dimension; mixing XY and XYZ coordinates in one
/// array is not representable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Dimension {
    /// Two-dimensional.
    #[default]
    XY,

    /// Three-dimensional.
    XYZ,

    /// XYM (2D with measure).
    XYM,

    /// XYZM (3D with measure).
    XYZM,
}

impl Dimension {
    pub(crate) fn from_interleaved_field(field: &Field) -> Result<Self> {
        match field.name().as_str() {
            "xy" => Ok(Dimension::XY),
            "xyz" => Ok(Dimension::XYZ),
            "xym" => Ok(Dimension::XYM),
            "xyzm" => Ok(Dimension::XYZM),
            name => Err(GeoArrowError::IllegalArgument(format!(
                "Invalid interleaved coordinate field name: {name}"
            ))),
        }
    }

    pub(crate) fn from_separated_fields(fields: &Fields) -> Result<Self> {
        match fields.len() {
            2 => Ok(Self::XY),
            3 => {
                let field_names: HashSet<&str> =
                    HashSet::from_iter(fields.iter().map(|f| f.name().as_str()));
                if field_names.contains("m") {
                    Ok(Self::XYM)
                } else {
                    Ok(Self::XYZ)
                }
            }
            4 => Ok(Self::XYZM),
            n => Err(GeoArrowError::IllegalArgument(format!(
                "Invalid number of fields for separated coordinates: {n}"
            ))),
        }
    }

    /// Returns the number of dimensions.
    pub fn size(&self) -> usize {
        match self {
            Dimension::XY => 2,
            Dimension::XYZ => 3,
            Dimension::XYM => 3,
            Dimension::XYZM => 4,
        }
    }

    /// Whether this dimension contains a Z ordinate.
    pub fn has_z(&self) -> bool {
        matches!(self, Dimension::XYZ | Dimension::XYZM)
    }

    /// Whether this dimension contains an M ordinate.
    pub fn has_m(&self) -> bool {
        matches!(self, Dimension::XYM | Dimension::XYZM)
    }

    /// Construct from Z/M presence flags.
    pub fn from_flags(has_z: bool, has_m: bool) -> Self {
        match (has_z, has_m) {
            (false, false) => Dimension::XY,
            (true, false) => Dimension::XYZ,
            (false, true) => Dimension::XYM,
            (true, true) => Dimension::XYZM,
        }
    }

    /// The name used for the single child field of interleaved coordinates.
    pub(crate) fn interleaved_field_name(&self) -> &'static str {
        match self {
            Dimension::XY => "xy",
            Dimension::XYZ => "xyz",
            Dimension::XYM => "xym",
            Dimension::XYZM => "xyzm",
        }
    }

    /// The names of the sibling child fields of separated coordinates.
    pub(crate) fn separated_field_names(&self) -> &'static [&'static str] {
        match self {
            Dimension::XY => &["x", "y"],
            Dimension::XYZ => &["x", "y", "z"],
            Dimension::XYM => &["x", "y", "m"],
            Dimension::XYZM => &["x", "y", "z", "m"],
        }
    }

    /// The ISO WKB thousands group for this dimension (`+1000` → XYZ, `+2000`
    /// → XYM, `+3000` → XYZM).
    pub fn iso_group(&self) -> u32 {
        match self {
            Dimension::XY => 0,
            Dimension::XYZ => 1,
            Dimension::XYM => 2,
            Dimension::XYZM => 3,
        }
    }
}

#[cfg(test)]
mod test {
    use arrow_schema::DataType;

    use super::*;

    #[test]
    fn separated_field_recognition() {
        let xym: Fields = vec![
            Field::new("x", DataType::Float64, false),
            Field::new("y", DataType::Float64, false),
            Field::new("m", DataType::Float64, false),
        ]
        .into();
        assert_eq!(Dimension::from_separated_fields(&xym).unwrap(), Dimension::XYM);

        let xyz: Fields = vec![
            Field::new("x", DataType::Float64, false),
            Field::new("y", DataType::Float64, false),
            Field::new("z", DataType::Float64, false),
        ]
        .into();
        assert_eq!(Dimension::from_separated_fields(&xyz).unwrap(), Dimension::XYZ);
    }

    #[test]
    fn invalid_field_count() {
        let too_many: Fields = (0..5)
            .map(|i| Field::new(format!("f{i}"), DataType::Float64, false))
            .collect();
        assert!(Dimension::from_separated_fields(&too_many).is_err());
    }

    #[test]
    fn flag_round_trip() {
        for dim in [Dimension::XY, Dimension::XYZ, Dimension::XYM, Dimension::XYZM] {
            assert_eq!(Dimension::from_flags(dim.has_z(), dim.has_m()), dim);
        }
    }
}

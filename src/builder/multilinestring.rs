use arrow_array::ArrayRef;
use arrow_buffer::NullBufferBuilder;

use crate::array::raw::assemble;
use crate::array::{CoordBufferBuilder, OffsetsBuilder};
use crate::error::{GeoArrowError, Result};
use crate::schema::{Dimension, GeoArrowType, GeometryType, MultiLineStringType};
use crate::visitor::GeomVisitor;

/// Builds a MultiLineString array from geometry events.
///
/// A bare LineString feature is absorbed as a multi of one.
#[derive(Debug)]
pub struct MultiLineStringBuilder {
    data_type: GeoArrowType,
    coords: CoordBufferBuilder,
    geom_offsets: OffsetsBuilder,
    ring_offsets: OffsetsBuilder,
    validity: NullBufferBuilder,
    len: usize,
    depth: usize,
    linestrings_start: usize,
    child_coords_start: usize,
    child_open: bool,
    null: bool,
}

impl MultiLineStringBuilder {
    /// Create an empty builder.
    pub fn new(data_type: MultiLineStringType) -> Self {
        Self::with_capacity(data_type, 0)
    }

    /// Create a builder with room for `capacity` features.
    pub fn with_capacity(data_type: MultiLineStringType, capacity: usize) -> Self {
        let coords = CoordBufferBuilder::new(data_type.coord_type(), data_type.dimension());
        Self {
            data_type: GeoArrowType::MultiLineString(data_type),
            coords,
            geom_offsets: OffsetsBuilder::with_capacity(capacity),
            ring_offsets: OffsetsBuilder::new(),
            validity: NullBufferBuilder::new(capacity),
            len: 0,
            depth: 0,
            linestrings_start: 0,
            child_coords_start: 0,
            child_open: false,
            null: false,
        }
    }

    /// The number of features pushed so far.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether no feature has been pushed yet.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Consume into the finished storage array.
    pub fn finish(mut self) -> Result<ArrayRef> {
        let nulls = self.validity.finish();
        assemble(
            &self.data_type,
            vec![
                self.geom_offsets.finish().into_inner(),
                self.ring_offsets.finish().into_inner(),
            ],
            self.coords.finish(),
            nulls,
            self.len,
        )
    }
}

impl GeomVisitor for MultiLineStringBuilder {
    fn feature_begin(&mut self) -> Result<()> {
        self.null = false;
        self.depth = 0;
        self.child_open = false;
        self.linestrings_start = self.ring_offsets.len();
        Ok(())
    }

    fn null_feature(&mut self) -> Result<()> {
        self.null = true;
        Ok(())
    }

    fn geometry_begin(&mut self, geometry_type: GeometryType, _dim: Dimension) -> Result<()> {
        match (self.depth, geometry_type) {
            (0, GeometryType::MultiLineString) => {}
            // A bare linestring is a multi of one.
            (0, GeometryType::LineString) | (1, GeometryType::LineString) => {
                self.child_open = true;
                self.child_coords_start = self.coords.len();
            }
            _ => {
                return Err(GeoArrowError::IncompatibleType(format!(
                    "Cannot write {geometry_type:?} into a multilinestring array"
                )))
            }
        }
        self.depth += 1;
        Ok(())
    }

    fn geometry_end(&mut self) -> Result<()> {
        self.depth -= 1;
        if self.child_open {
            self.ring_offsets
                .try_push_usize(self.coords.len() - self.child_coords_start)?;
            self.child_open = false;
        }
        Ok(())
    }

    fn coord(&mut self, x: f64, y: f64, z: Option<f64>, m: Option<f64>) -> Result<()> {
        self.coords.push(x, y, z, m);
        Ok(())
    }

    fn feature_end(&mut self) -> Result<()> {
        if self.null {
            self.geom_offsets.extend_constant(1);
            self.validity.append_null();
        } else {
            self.geom_offsets
                .try_push_usize(self.ring_offsets.len() - self.linestrings_start)?;
            self.validity.append_non_null();
        }
        self.len += 1;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::array::GeometryArrayView;
    use crate::schema::CoordType;
    use crate::wkt::process_wkt;

    fn data_type() -> MultiLineStringType {
        MultiLineStringType::new(CoordType::Separated, Dimension::XY, Default::default())
    }

    #[test]
    fn multilinestring_and_promoted_linestring() {
        let mut b = MultiLineStringBuilder::new(data_type());
        for wkt in [
            "MULTILINESTRING ((0 1, 2 3), (4 5, 6 7, 8 9))",
            "LINESTRING (1 1, 2 2)",
        ] {
            b.feature_begin().unwrap();
            process_wkt(wkt, &mut b).unwrap();
            b.feature_end().unwrap();
        }
        let array = b.finish().unwrap();
        let view = GeometryArrayView::try_new(
            array.as_ref(),
            GeoArrowType::MultiLineString(data_type()),
        )
        .unwrap();
        assert_eq!(view.len(), 2);
        let offsets = view.offset_buffers();
        assert_eq!(offsets[0].as_ref(), &[0, 2, 3]);
        assert_eq!(offsets[1].as_ref(), &[0, 2, 5, 7]);
        assert_eq!(view.coords().unwrap().len(), 7);
    }

    #[test]
    fn point_rejected() {
        let mut b = MultiLineStringBuilder::new(data_type());
        b.feature_begin().unwrap();
        assert!(matches!(
            process_wkt("POINT (0 1)", &mut b),
            Err(GeoArrowError::IncompatibleType(_))
        ));
    }
}

use arrow_array::ArrayRef;
use arrow_buffer::NullBufferBuilder;

use crate::array::raw::assemble;
use crate::array::{CoordBufferBuilder, OffsetsBuilder};
use crate::error::{GeoArrowError, Result};
use crate::schema::{Dimension, GeoArrowType, GeometryType, LineStringType};
use crate::visitor::GeomVisitor;

/// Builds a LineString array from geometry events.
#[derive(Debug)]
pub struct LineStringBuilder {
    data_type: GeoArrowType,
    coords: CoordBufferBuilder,
    geom_offsets: OffsetsBuilder,
    validity: NullBufferBuilder,
    len: usize,
    depth: usize,
    coords_start: usize,
    null: bool,
}

impl LineStringBuilder {
    /// Create an empty builder.
    pub fn new(data_type: LineStringType) -> Self {
        Self::with_capacity(data_type, 0)
    }

    /// Create a builder with room for `capacity` features.
    pub fn with_capacity(data_type: LineStringType, capacity: usize) -> Self {
        let coords =
            CoordBufferBuilder::new(data_type.coord_type(), data_type.dimension());
        Self {
            data_type: GeoArrowType::LineString(data_type),
            coords,
            geom_offsets: OffsetsBuilder::with_capacity(capacity),
            validity: NullBufferBuilder::new(capacity),
            len: 0,
            depth: 0,
            coords_start: 0,
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
        let offsets = self.geom_offsets.finish();
        assemble(
            &self.data_type,
            vec![offsets.into_inner()],
            self.coords.finish(),
            nulls,
            self.len,
        )
    }
}

impl GeomVisitor for LineStringBuilder {
    fn feature_begin(&mut self) -> Result<()> {
        self.null = false;
        self.depth = 0;
        self.coords_start = self.coords.len();
        Ok(())
    }

    fn null_feature(&mut self) -> Result<()> {
        self.null = true;
        Ok(())
    }

    fn geometry_begin(&mut self, geometry_type: GeometryType, _dim: Dimension) -> Result<()> {
        if self.depth == 0 && geometry_type != GeometryType::LineString {
            return Err(GeoArrowError::IncompatibleType(format!(
                "Cannot write {geometry_type:?} into a linestring array"
            )));
        }
        self.depth += 1;
        Ok(())
    }

    fn geometry_end(&mut self) -> Result<()> {
        self.depth -= 1;
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
                .try_push_usize(self.coords.len() - self.coords_start)?;
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

    #[test]
    fn wkt_to_linestring_array() {
        let data_type =
            LineStringType::new(CoordType::Separated, Dimension::XY, Default::default());
        let mut b = LineStringBuilder::new(data_type.clone());
        b.feature_begin().unwrap();
        process_wkt("LINESTRING (0 1, 2 3)", &mut b).unwrap();
        b.feature_end().unwrap();
        b.feature_begin().unwrap();
        b.null_feature().unwrap();
        b.feature_end().unwrap();

        let array = b.finish().unwrap();
        let view =
            GeometryArrayView::try_new(array.as_ref(), GeoArrowType::LineString(data_type))
                .unwrap();
        assert_eq!(view.len(), 2);
        assert_eq!(view.null_count(), 1);
        assert_eq!(view.offset_buffers()[0].as_ref(), &[0, 2, 2]);
        let coords = view.coords().unwrap();
        assert_eq!(coords.x(0), 0.0);
        assert_eq!(coords.y(0), 1.0);
        assert_eq!(coords.x(1), 2.0);
        assert_eq!(coords.y(1), 3.0);
    }

    #[test]
    fn polygon_rejected() {
        let data_type =
            LineStringType::new(CoordType::Separated, Dimension::XY, Default::default());
        let mut b = LineStringBuilder::new(data_type);
        b.feature_begin().unwrap();
        assert!(matches!(
            process_wkt("POLYGON ((0 0, 1 0, 0 1, 0 0))", &mut b),
            Err(GeoArrowError::IncompatibleType(_))
        ));
    }
}

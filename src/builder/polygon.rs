use arrow_array::ArrayRef;
use arrow_buffer::NullBufferBuilder;

use crate::array::raw::assemble;
use crate::array::{CoordBufferBuilder, OffsetsBuilder};
use crate::error::{GeoArrowError, Result};
use crate::schema::{Dimension, GeoArrowType, GeometryType, PolygonType};
use crate::visitor::GeomVisitor;

/// Builds a Polygon array from geometry events.
#[derive(Debug)]
pub struct PolygonBuilder {
    data_type: GeoArrowType,
    coords: CoordBufferBuilder,
    geom_offsets: OffsetsBuilder,
    ring_offsets: OffsetsBuilder,
    validity: NullBufferBuilder,
    len: usize,
    depth: usize,
    rings_start: usize,
    ring_coords_start: usize,
    null: bool,
}

impl PolygonBuilder {
    /// Create an empty builder.
    pub fn new(data_type: PolygonType) -> Self {
        Self::with_capacity(data_type, 0)
    }

    /// Create a builder with room for `capacity` features.
    pub fn with_capacity(data_type: PolygonType, capacity: usize) -> Self {
        let coords = CoordBufferBuilder::new(data_type.coord_type(), data_type.dimension());
        Self {
            data_type: GeoArrowType::Polygon(data_type),
            coords,
            geom_offsets: OffsetsBuilder::with_capacity(capacity),
            ring_offsets: OffsetsBuilder::new(),
            validity: NullBufferBuilder::new(capacity),
            len: 0,
            depth: 0,
            rings_start: 0,
            ring_coords_start: 0,
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

impl GeomVisitor for PolygonBuilder {
    fn feature_begin(&mut self) -> Result<()> {
        self.null = false;
        self.depth = 0;
        self.rings_start = self.ring_offsets.len();
        Ok(())
    }

    fn null_feature(&mut self) -> Result<()> {
        self.null = true;
        Ok(())
    }

    fn geometry_begin(&mut self, geometry_type: GeometryType, _dim: Dimension) -> Result<()> {
        if self.depth == 0 && geometry_type != GeometryType::Polygon {
            return Err(GeoArrowError::IncompatibleType(format!(
                "Cannot write {geometry_type:?} into a polygon array"
            )));
        }
        self.depth += 1;
        Ok(())
    }

    fn geometry_end(&mut self) -> Result<()> {
        self.depth -= 1;
        Ok(())
    }

    fn ring_begin(&mut self) -> Result<()> {
        self.ring_coords_start = self.coords.len();
        Ok(())
    }

    fn ring_end(&mut self) -> Result<()> {
        self.ring_offsets
            .try_push_usize(self.coords.len() - self.ring_coords_start)
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
                .try_push_usize(self.ring_offsets.len() - self.rings_start)?;
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
    fn polygon_with_hole() {
        let data_type = PolygonType::new(CoordType::Separated, Dimension::XY, Default::default());
        let mut b = PolygonBuilder::new(data_type.clone());
        b.feature_begin().unwrap();
        process_wkt(
            "POLYGON ((0 0, 10 0, 10 10, 0 10, 0 0), (2 2, 4 2, 4 4, 2 2))",
            &mut b,
        )
        .unwrap();
        b.feature_end().unwrap();

        let array = b.finish().unwrap();
        let view = GeometryArrayView::try_new(array.as_ref(), GeoArrowType::Polygon(data_type))
            .unwrap();
        assert_eq!(view.len(), 1);
        let offsets = view.offset_buffers();
        assert_eq!(offsets[0].as_ref(), &[0, 2]);
        assert_eq!(offsets[1].as_ref(), &[0, 5, 9]);
        assert_eq!(view.coords().unwrap().len(), 9);
    }

    #[test]
    fn empty_polygon_has_no_rings() {
        let data_type = PolygonType::new(CoordType::Separated, Dimension::XY, Default::default());
        let mut b = PolygonBuilder::new(data_type.clone());
        b.feature_begin().unwrap();
        process_wkt("POLYGON EMPTY", &mut b).unwrap();
        b.feature_end().unwrap();
        let array = b.finish().unwrap();
        let view = GeometryArrayView::try_new(array.as_ref(), GeoArrowType::Polygon(data_type))
            .unwrap();
        assert_eq!(view.null_count(), 0);
        assert_eq!(view.offset_buffers()[0].as_ref(), &[0, 0]);
    }
}

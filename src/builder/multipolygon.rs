use arrow_array::ArrayRef;
use arrow_buffer::NullBufferBuilder;

use crate::array::raw::assemble;
use crate::array::{CoordBufferBuilder, OffsetsBuilder};
use crate::error::{GeoArrowError, Result};
use crate::schema::{Dimension, GeoArrowType, GeometryType, MultiPolygonType};
use crate::visitor::GeomVisitor;

/// Builds a MultiPolygon array from geometry events.
///
/// A bare Polygon feature is absorbed as a multi of one.
#[derive(Debug)]
pub struct MultiPolygonBuilder {
    data_type: GeoArrowType,
    coords: CoordBufferBuilder,
    geom_offsets: OffsetsBuilder,
    polygon_offsets: OffsetsBuilder,
    ring_offsets: OffsetsBuilder,
    validity: NullBufferBuilder,
    len: usize,
    depth: usize,
    polygons_start: usize,
    child_rings_start: usize,
    ring_coords_start: usize,
    child_open: bool,
    null: bool,
}

impl MultiPolygonBuilder {
    /// Create an empty builder.
    pub fn new(data_type: MultiPolygonType) -> Self {
        Self::with_capacity(data_type, 0)
    }

    /// Create a builder with room for `capacity` features.
    pub fn with_capacity(data_type: MultiPolygonType, capacity: usize) -> Self {
        let coords = CoordBufferBuilder::new(data_type.coord_type(), data_type.dimension());
        Self {
            data_type: GeoArrowType::MultiPolygon(data_type),
            coords,
            geom_offsets: OffsetsBuilder::with_capacity(capacity),
            polygon_offsets: OffsetsBuilder::new(),
            ring_offsets: OffsetsBuilder::new(),
            validity: NullBufferBuilder::new(capacity),
            len: 0,
            depth: 0,
            polygons_start: 0,
            child_rings_start: 0,
            ring_coords_start: 0,
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
                self.polygon_offsets.finish().into_inner(),
                self.ring_offsets.finish().into_inner(),
            ],
            self.coords.finish(),
            nulls,
            self.len,
        )
    }
}

impl GeomVisitor for MultiPolygonBuilder {
    fn feature_begin(&mut self) -> Result<()> {
        self.null = false;
        self.depth = 0;
        self.child_open = false;
        self.polygons_start = self.polygon_offsets.len();
        Ok(())
    }

    fn null_feature(&mut self) -> Result<()> {
        self.null = true;
        Ok(())
    }

    fn geometry_begin(&mut self, geometry_type: GeometryType, _dim: Dimension) -> Result<()> {
        match (self.depth, geometry_type) {
            (0, GeometryType::MultiPolygon) => {}
            // A bare polygon is a multi of one.
            (0, GeometryType::Polygon) | (1, GeometryType::Polygon) => {
                self.child_open = true;
                self.child_rings_start = self.ring_offsets.len();
            }
            _ => {
                return Err(GeoArrowError::IncompatibleType(format!(
                    "Cannot write {geometry_type:?} into a multipolygon array"
                )))
            }
        }
        self.depth += 1;
        Ok(())
    }

    fn geometry_end(&mut self) -> Result<()> {
        self.depth -= 1;
        if self.child_open {
            self.polygon_offsets
                .try_push_usize(self.ring_offsets.len() - self.child_rings_start)?;
            self.child_open = false;
        }
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
                .try_push_usize(self.polygon_offsets.len() - self.polygons_start)?;
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

    fn data_type() -> MultiPolygonType {
        MultiPolygonType::new(CoordType::Separated, Dimension::XY, Default::default())
    }

    #[test]
    fn multipolygon_offsets() {
        let mut b = MultiPolygonBuilder::new(data_type());
        b.feature_begin().unwrap();
        process_wkt(
            "MULTIPOLYGON (((0 0, 4 0, 0 4, 0 0)), ((10 10, 12 10, 10 12, 10 10), (11 11, 11.5 11, 11 11.5, 11 11)))",
            &mut b,
        )
        .unwrap();
        b.feature_end().unwrap();
        b.feature_begin().unwrap();
        process_wkt("POLYGON ((0 0, 1 0, 0 1, 0 0))", &mut b).unwrap();
        b.feature_end().unwrap();

        let array = b.finish().unwrap();
        let view = GeometryArrayView::try_new(
            array.as_ref(),
            GeoArrowType::MultiPolygon(data_type()),
        )
        .unwrap();
        assert_eq!(view.len(), 2);
        let offsets = view.offset_buffers();
        assert_eq!(offsets[0].as_ref(), &[0, 2, 3]);
        assert_eq!(offsets[1].as_ref(), &[0, 1, 3, 4]);
        assert_eq!(offsets[2].as_ref(), &[0, 4, 8, 12, 16]);
        assert_eq!(view.coords().unwrap().len(), 16);
    }
}

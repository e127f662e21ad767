use arrow_array::ArrayRef;
use arrow_buffer::NullBufferBuilder;

use crate::array::raw::assemble;
use crate::array::{CoordBufferBuilder, OffsetsBuilder};
use crate::error::{GeoArrowError, Result};
use crate::schema::{Dimension, GeoArrowType, GeometryType, MultiPointType};
use crate::visitor::GeomVisitor;

/// Builds a MultiPoint array from geometry events.
///
/// A bare Point feature is absorbed as a multipoint of one.
#[derive(Debug)]
pub struct MultiPointBuilder {
    data_type: GeoArrowType,
    coords: CoordBufferBuilder,
    geom_offsets: OffsetsBuilder,
    validity: NullBufferBuilder,
    len: usize,
    depth: usize,
    coords_start: usize,
    child_open: bool,
    child_has_coord: bool,
    null: bool,
}

impl MultiPointBuilder {
    /// Create an empty builder.
    pub fn new(data_type: MultiPointType) -> Self {
        Self::with_capacity(data_type, 0)
    }

    /// Create a builder with room for `capacity` features.
    pub fn with_capacity(data_type: MultiPointType, capacity: usize) -> Self {
        let coords = CoordBufferBuilder::new(data_type.coord_type(), data_type.dimension());
        Self {
            data_type: GeoArrowType::MultiPoint(data_type),
            coords,
            geom_offsets: OffsetsBuilder::with_capacity(capacity),
            validity: NullBufferBuilder::new(capacity),
            len: 0,
            depth: 0,
            coords_start: 0,
            child_open: false,
            child_has_coord: false,
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
            vec![self.geom_offsets.finish().into_inner()],
            self.coords.finish(),
            nulls,
            self.len,
        )
    }
}

impl GeomVisitor for MultiPointBuilder {
    fn feature_begin(&mut self) -> Result<()> {
        self.null = false;
        self.depth = 0;
        self.child_open = false;
        self.child_has_coord = false;
        self.coords_start = self.coords.len();
        Ok(())
    }

    fn null_feature(&mut self) -> Result<()> {
        self.null = true;
        Ok(())
    }

    fn geometry_begin(&mut self, geometry_type: GeometryType, _dim: Dimension) -> Result<()> {
        match (self.depth, geometry_type) {
            (0, GeometryType::MultiPoint) => {}
            // A bare point is a multipoint of one.
            (0, GeometryType::Point) | (1, GeometryType::Point) => {
                self.child_open = true;
                self.child_has_coord = false;
            }
            _ => {
                return Err(GeoArrowError::IncompatibleType(format!(
                    "Cannot write {geometry_type:?} into a multipoint array"
                )))
            }
        }
        self.depth += 1;
        Ok(())
    }

    fn geometry_end(&mut self) -> Result<()> {
        self.depth -= 1;
        if self.child_open {
            if !self.child_has_coord {
                // An empty point child materializes as NaN ordinates.
                self.coords.push_nan();
            }
            self.child_open = false;
        }
        Ok(())
    }

    fn coord(&mut self, x: f64, y: f64, z: Option<f64>, m: Option<f64>) -> Result<()> {
        self.coords.push(x, y, z, m);
        self.child_has_coord = true;
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

    fn data_type() -> MultiPointType {
        MultiPointType::new(CoordType::Separated, Dimension::XY, Default::default())
    }

    #[test]
    fn multipoint_and_promoted_point() {
        let mut b = MultiPointBuilder::new(data_type());
        for wkt in ["MULTIPOINT ((0 1), (2 3))", "POINT (9 9)"] {
            b.feature_begin().unwrap();
            process_wkt(wkt, &mut b).unwrap();
            b.feature_end().unwrap();
        }
        let array = b.finish().unwrap();
        let view = GeometryArrayView::try_new(
            array.as_ref(),
            GeoArrowType::MultiPoint(data_type()),
        )
        .unwrap();
        assert_eq!(view.len(), 2);
        assert_eq!(view.offset_buffers()[0].as_ref(), &[0, 2, 3]);
        assert_eq!(view.coords().unwrap().x(2), 9.0);
    }

    #[test]
    fn empty_child_point_is_nan() {
        let mut b = MultiPointBuilder::new(data_type());
        b.feature_begin().unwrap();
        process_wkt("MULTIPOINT (1 2, EMPTY)", &mut b).unwrap();
        b.feature_end().unwrap();
        let array = b.finish().unwrap();
        let view = GeometryArrayView::try_new(
            array.as_ref(),
            GeoArrowType::MultiPoint(data_type()),
        )
        .unwrap();
        assert_eq!(view.offset_buffers()[0].as_ref(), &[0, 2]);
        assert!(view.coords().unwrap().x(1).is_nan());
    }

    #[test]
    fn linestring_rejected() {
        let mut b = MultiPointBuilder::new(data_type());
        b.feature_begin().unwrap();
        assert!(matches!(
            process_wkt("LINESTRING (0 1, 2 3)", &mut b),
            Err(GeoArrowError::IncompatibleType(_))
        ));
    }
}

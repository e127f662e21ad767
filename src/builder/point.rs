use arrow_array::ArrayRef;
use arrow_buffer::NullBufferBuilder;

use crate::array::raw::assemble;
use crate::array::CoordBufferBuilder;
use crate::error::{GeoArrowError, Result};
use crate::schema::{Dimension, GeoArrowType, GeometryType, PointType};
use crate::visitor::GeomVisitor;

/// Builds a Point array from geometry events.
///
/// A null feature and an empty point both occupy one coordinate slot; the
/// null feature is additionally marked in the validity bitmap, while the
/// empty point materializes as NaN ordinates.
#[derive(Debug)]
pub struct PointBuilder {
    data_type: GeoArrowType,
    coords: CoordBufferBuilder,
    validity: NullBufferBuilder,
    len: usize,
    depth: usize,
    wrote_coord: bool,
    null: bool,
}

impl PointBuilder {
    /// Create an empty builder.
    pub fn new(data_type: PointType) -> Self {
        Self::with_capacity(data_type, 0)
    }

    /// Create a builder with room for `capacity` features.
    pub fn with_capacity(data_type: PointType, capacity: usize) -> Self {
        let coords =
            CoordBufferBuilder::with_capacity(data_type.coord_type(), data_type.dimension(), capacity);
        Self {
            data_type: GeoArrowType::Point(data_type),
            coords,
            validity: NullBufferBuilder::new(capacity),
            len: 0,
            depth: 0,
            wrote_coord: false,
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
        assemble(&self.data_type, vec![], self.coords.finish(), nulls, self.len)
    }
}

impl GeomVisitor for PointBuilder {
    fn feature_begin(&mut self) -> Result<()> {
        self.wrote_coord = false;
        self.null = false;
        self.depth = 0;
        Ok(())
    }

    fn null_feature(&mut self) -> Result<()> {
        self.null = true;
        Ok(())
    }

    fn geometry_begin(&mut self, geometry_type: GeometryType, _dim: Dimension) -> Result<()> {
        if self.depth == 0 && geometry_type != GeometryType::Point {
            return Err(GeoArrowError::IncompatibleType(format!(
                "Cannot write {geometry_type:?} into a point array"
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
        if self.wrote_coord {
            return Err(GeoArrowError::Validation(
                "A point feature holds exactly one coordinate".to_string(),
            ));
        }
        self.coords.push(x, y, z, m);
        self.wrote_coord = true;
        Ok(())
    }

    fn feature_end(&mut self) -> Result<()> {
        if self.null {
            self.coords.push_nan();
            self.validity.append_null();
        } else {
            if !self.wrote_coord {
                // POINT EMPTY materializes as NaN ordinates.
                self.coords.push_nan();
            }
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

    fn builder(dim: Dimension) -> PointBuilder {
        PointBuilder::new(PointType::new(CoordType::Separated, dim, Default::default()))
    }

    #[test]
    fn wkt_to_point_array() {
        let mut b = builder(Dimension::XY);
        for wkt in ["POINT (30 10)", "POINT (1 2)"] {
            b.feature_begin().unwrap();
            process_wkt(wkt, &mut b).unwrap();
            b.feature_end().unwrap();
        }
        let data_type = GeoArrowType::new(
            GeometryType::Point,
            Dimension::XY,
            CoordType::Separated,
        )
        .unwrap();
        let array = b.finish().unwrap();
        let view = GeometryArrayView::try_new(array.as_ref(), data_type).unwrap();
        assert_eq!(view.len(), 2);
        assert_eq!(view.coords().unwrap().x(0), 30.0);
        assert_eq!(view.coords().unwrap().y(0), 10.0);
        assert_eq!(view.coords().unwrap().x(1), 1.0);
    }

    #[test]
    fn empty_point_is_nan() {
        let mut b = builder(Dimension::XY);
        b.feature_begin().unwrap();
        process_wkt("POINT EMPTY", &mut b).unwrap();
        b.feature_end().unwrap();
        let array = b.finish().unwrap();
        let data_type = GeoArrowType::new(
            GeometryType::Point,
            Dimension::XY,
            CoordType::Separated,
        )
        .unwrap();
        let view = GeometryArrayView::try_new(array.as_ref(), data_type).unwrap();
        assert_eq!(view.null_count(), 0);
        assert!(view.coords().unwrap().x(0).is_nan());
    }

    #[test]
    fn xy_into_xyz_promotes_with_nan() {
        let mut b = builder(Dimension::XYZ);
        b.feature_begin().unwrap();
        process_wkt("POINT (1 2)", &mut b).unwrap();
        b.feature_end().unwrap();
        let array = b.finish().unwrap();
        let data_type = GeoArrowType::new(
            GeometryType::Point,
            Dimension::XYZ,
            CoordType::Separated,
        )
        .unwrap();
        let view = GeometryArrayView::try_new(array.as_ref(), data_type).unwrap();
        assert_eq!(view.coords().unwrap().x(0), 1.0);
        assert!(view.coords().unwrap().ordinate_value(0, 2).is_nan());
    }

    #[test]
    fn linestring_rejected() {
        let mut b = builder(Dimension::XY);
        b.feature_begin().unwrap();
        assert!(matches!(
            process_wkt("LINESTRING (0 1, 2 3)", &mut b),
            Err(GeoArrowError::IncompatibleType(_))
        ));
    }
}

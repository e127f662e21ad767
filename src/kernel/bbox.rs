use std::sync::Arc;

use arrow_array::{ArrayRef, Float64Array, StructArray};
use arrow_buffer::NullBufferBuilder;
use arrow_schema::{DataType, Field, Fields};

use crate::array::{CoordBuffer, GeometryArrayView};
use crate::error::Result;
use crate::schema::{CoordType, GeoArrowType};
use crate::visitor::GeomVisitor;

/// A running planar 2D bounding box.
///
/// Starts out empty (`+∞/−∞` extremes). NaN ordinates are skipped when
/// accumulating, so a feature containing only NaN coordinates keeps the
/// canonical empty box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingRect {
    xmin: f64,
    xmax: f64,
    ymin: f64,
    ymax: f64,
}

impl BoundingRect {
    /// A new, empty bounding box.
    pub fn new() -> Self {
        Self {
            xmin: f64::INFINITY,
            xmax: f64::NEG_INFINITY,
            ymin: f64::INFINITY,
            ymax: f64::NEG_INFINITY,
        }
    }

    /// The minimum x value.
    pub fn xmin(&self) -> f64 {
        self.xmin
    }

    /// The maximum x value.
    pub fn xmax(&self) -> f64 {
        self.xmax
    }

    /// The minimum y value.
    pub fn ymin(&self) -> f64 {
        self.ymin
    }

    /// The maximum y value.
    pub fn ymax(&self) -> f64 {
        self.ymax
    }

    /// Reassemble a box from stored bounds, without the NaN filtering of
    /// [`add_coord`][Self::add_coord]. Empty-box sentinels pass through
    /// unchanged.
    pub fn from_bounds(xmin: f64, xmax: f64, ymin: f64, ymax: f64) -> Self {
        Self {
            xmin,
            xmax,
            ymin,
            ymax,
        }
    }

    /// Whether no finite coordinate has been accumulated.
    pub fn is_empty(&self) -> bool {
        self.xmin > self.xmax || self.ymin > self.ymax
    }

    /// Accumulate one coordinate, skipping NaN ordinates.
    pub fn add_coord(&mut self, x: f64, y: f64) {
        if !x.is_nan() {
            if x < self.xmin {
                self.xmin = x;
            }
            if x > self.xmax {
                self.xmax = x;
            }
        }
        if !y.is_nan() {
            if y < self.ymin {
                self.ymin = y;
            }
            if y > self.ymax {
                self.ymax = y;
            }
        }
    }

    /// Componentwise union with another box.
    pub fn merge(&mut self, other: &BoundingRect) {
        self.add_coord(other.xmin, other.ymin);
        self.add_coord(other.xmax, other.ymax);
    }

    /// Whether two boxes overlap. Empty boxes intersect nothing.
    pub fn intersects(&self, other: &BoundingRect) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        self.xmin <= other.xmax
            && self.xmax >= other.xmin
            && self.ymin <= other.ymax
            && self.ymax >= other.ymin
    }
}

impl Default for BoundingRect {
    fn default() -> Self {
        Self::new()
    }
}

/// The storage fields of a box result: `{xmin, xmax, ymin, ymax}`.
pub(crate) fn box_result_fields() -> Fields {
    vec![
        Field::new("xmin", DataType::Float64, false),
        Field::new("xmax", DataType::Float64, false),
        Field::new("ymin", DataType::Float64, false),
        Field::new("ymax", DataType::Float64, false),
    ]
    .into()
}

pub(crate) fn box_result_data_type() -> DataType {
    DataType::Struct(box_result_fields())
}

/// Collects one bounding box per feature.
#[derive(Debug)]
pub(crate) struct BoxVisitor {
    current: BoundingRect,
    null: bool,
    xmin: Vec<f64>,
    xmax: Vec<f64>,
    ymin: Vec<f64>,
    ymax: Vec<f64>,
    validity: NullBufferBuilder,
}

impl BoxVisitor {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            current: BoundingRect::new(),
            null: false,
            xmin: Vec::with_capacity(capacity),
            xmax: Vec::with_capacity(capacity),
            ymin: Vec::with_capacity(capacity),
            ymax: Vec::with_capacity(capacity),
            validity: NullBufferBuilder::new(capacity),
        }
    }

    pub(crate) fn finish(mut self) -> ArrayRef {
        let nulls = self.validity.finish();
        let columns: Vec<ArrayRef> = [self.xmin, self.xmax, self.ymin, self.ymax]
            .into_iter()
            .map(|values| Arc::new(Float64Array::from(values)) as ArrayRef)
            .collect();
        Arc::new(StructArray::new(box_result_fields(), columns, nulls))
    }
}

impl GeomVisitor for BoxVisitor {
    fn feature_begin(&mut self) -> Result<()> {
        self.current = BoundingRect::new();
        self.null = false;
        Ok(())
    }

    fn null_feature(&mut self) -> Result<()> {
        self.null = true;
        Ok(())
    }

    fn coord(&mut self, x: f64, y: f64, _z: Option<f64>, _m: Option<f64>) -> Result<()> {
        self.current.add_coord(x, y);
        Ok(())
    }

    fn feature_end(&mut self) -> Result<()> {
        if self.null {
            self.xmin.push(f64::NAN);
            self.xmax.push(f64::NAN);
            self.ymin.push(f64::NAN);
            self.ymax.push(f64::NAN);
            self.validity.append_null();
        } else {
            self.xmin.push(self.current.xmin);
            self.xmax.push(self.current.xmax);
            self.ymin.push(self.current.ymin);
            self.ymax.push(self.current.ymax);
            self.validity.append_non_null();
        }
        Ok(())
    }
}

/// Accumulates a single bounding box over every visited feature.
#[derive(Debug, Default)]
pub(crate) struct BoxAggVisitor {
    pub(crate) rect: BoundingRect,
}

impl GeomVisitor for BoxAggVisitor {
    fn coord(&mut self, x: f64, y: f64, _z: Option<f64>, _m: Option<f64>) -> Result<()> {
        self.rect.add_coord(x, y);
        Ok(())
    }
}

/// Aggregate a batch into `rect`, using a buffer-level min/max for separated
/// point arrays with no nulls.
pub(crate) fn accumulate_batch(view: &GeometryArrayView, rect: &mut BoundingRect) -> Result<()> {
    if view.null_count() == 0 {
        if let (GeoArrowType::Point(t), Some(coords)) = (view.data_type(), view.coords()) {
            if t.coord_type() == CoordType::Separated {
                if let CoordBuffer::Separated(buffers) = coords {
                    for i in 0..buffers.len() {
                        rect.add_coord(buffers.ordinate(0)[i], buffers.ordinate(1)[i]);
                    }
                    return Ok(());
                }
            }
        }
    }
    let mut visitor = BoxAggVisitor { rect: *rect };
    view.visit(&mut visitor)?;
    *rect = visitor.rect;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn empty_box_is_canonical() {
        let rect = BoundingRect::new();
        assert!(rect.is_empty());
        assert_eq!(rect.xmin(), f64::INFINITY);
        assert_eq!(rect.xmax(), f64::NEG_INFINITY);
    }

    #[test]
    fn nan_ordinates_are_skipped() {
        let mut rect = BoundingRect::new();
        rect.add_coord(f64::NAN, 1.0);
        rect.add_coord(2.0, f64::NAN);
        assert_eq!(rect.xmin(), 2.0);
        assert_eq!(rect.xmax(), 2.0);
        assert_eq!(rect.ymin(), 1.0);
        assert_eq!(rect.ymax(), 1.0);
    }

    #[test]
    fn merge_is_union() {
        let mut a = BoundingRect::new();
        a.add_coord(0.0, 1.0);
        let mut b = BoundingRect::new();
        b.add_coord(2.0, 3.0);
        a.merge(&b);
        assert_eq!((a.xmin(), a.xmax(), a.ymin(), a.ymax()), (0.0, 2.0, 1.0, 3.0));

        // Merging an empty box changes nothing.
        let before = a;
        a.merge(&BoundingRect::new());
        assert_eq!(a, before);
    }

    #[test]
    fn fractional_accumulation() {
        use approx::assert_relative_eq;

        let mut rect = BoundingRect::new();
        rect.add_coord(0.1, 0.2);
        rect.add_coord(0.1 + 0.2, 0.4);
        assert_relative_eq!(rect.xmax(), 0.3, epsilon = 1e-15);
        assert_relative_eq!(rect.ymin(), 0.2);
        assert_relative_eq!(rect.ymax(), 0.4);
    }

    #[test]
    fn intersection_rules() {
        let mut a = BoundingRect::new();
        a.add_coord(0.0, 0.0);
        a.add_coord(2.0, 2.0);
        let mut b = BoundingRect::new();
        b.add_coord(1.0, 1.0);
        b.add_coord(3.0, 3.0);
        let mut c = BoundingRect::new();
        c.add_coord(5.0, 5.0);
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
        assert!(!a.intersects(&BoundingRect::new()));
    }
}

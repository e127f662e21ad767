use arrow_array::{Array, GenericBinaryArray, GenericListArray, GenericStringArray, StructArray};
use arrow_buffer::{NullBuffer, OffsetBuffer, ScalarBuffer};

use crate::array::coord::CoordBuffer;
use crate::error::{GeoArrowError, Result};
use crate::schema::{CoordType, Dimension, GeoArrowType, GeometryType};
use crate::visitor::GeomVisitor;

/// A non-owning interpretation of an Arrow array as a GeoArrow array.
///
/// The view resolves the array's buffers once at construction — validity
/// bitmap, one `i32` offset buffer per list nesting level, and the
/// coordinate leaf buffers — and exposes them without copying. All buffer
/// handles are reference-counted clones of the input array's buffers, so the
/// view is cheap to construct and does not copy coordinate data.
///
/// Walking the view emits the [`GeomVisitor`] event stream; index access is
/// `O(1)` per geometry, and walking is `O(total coordinates)`.
#[derive(Debug, Clone)]
pub struct GeometryArrayView {
    data_type: GeoArrowType,
    len: usize,
    nulls: Option<NullBuffer>,
    inner: ViewInner,
}

#[derive(Debug, Clone)]
enum ViewInner {
    Point(CoordBuffer),
    LineString {
        geom_offsets: OffsetBuffer<i32>,
        coords: CoordBuffer,
    },
    Polygon {
        geom_offsets: OffsetBuffer<i32>,
        ring_offsets: OffsetBuffer<i32>,
        coords: CoordBuffer,
    },
    MultiPoint {
        geom_offsets: OffsetBuffer<i32>,
        coords: CoordBuffer,
    },
    MultiLineString {
        geom_offsets: OffsetBuffer<i32>,
        ring_offsets: OffsetBuffer<i32>,
        coords: CoordBuffer,
    },
    MultiPolygon {
        geom_offsets: OffsetBuffer<i32>,
        polygon_offsets: OffsetBuffer<i32>,
        ring_offsets: OffsetBuffer<i32>,
        coords: CoordBuffer,
    },
    Rect {
        mins: CoordBuffer,
        maxs: CoordBuffer,
    },
    Wkb(GenericBinaryArray<i32>),
    LargeWkb(GenericBinaryArray<i64>),
    Wkt(GenericStringArray<i32>),
    LargeWkt(GenericStringArray<i64>),
}

fn downcast_list<'a, O: arrow_array::OffsetSizeTrait>(
    array: &'a dyn Array,
    what: &str,
) -> Result<&'a GenericListArray<O>> {
    array
        .as_any()
        .downcast_ref::<GenericListArray<O>>()
        .ok_or_else(|| {
            GeoArrowError::IllegalArgument(format!(
                "Expected a list array for {what}, got {}",
                array.data_type()
            ))
        })
}

/// Check that `offsets` is usable against a child of length `child_len`.
///
/// Offsets produced by a conforming Arrow implementation are monotonic by
/// construction, but this view is the entry point for foreign memory, so the
/// invariants are re-checked here rather than trusted.
fn validate_offsets(offsets: &[i32], child_len: usize) -> Result<()> {
    let mut prev = *offsets.first().ok_or_else(|| {
        GeoArrowError::Validation("Offset buffer must hold at least one value".to_string())
    })?;
    if prev < 0 {
        return Err(GeoArrowError::Validation(format!(
            "Negative list offset: {prev}"
        )));
    }
    for &offset in &offsets[1..] {
        if offset < prev {
            return Err(GeoArrowError::Validation(format!(
                "List offsets decrease from {prev} to {offset}"
            )));
        }
        prev = offset;
    }
    if prev as usize > child_len {
        return Err(GeoArrowError::Validation(format!(
            "Final list offset {prev} exceeds child length {child_len}"
        )));
    }
    Ok(())
}

impl GeometryArrayView {
    /// Interpret `array` as a GeoArrow array of type `data_type`.
    ///
    /// Fails with `IllegalArgument` if the storage shape contradicts the
    /// descriptor and with `Validation` if an offset buffer is unusable.
    pub fn try_new(array: &dyn Array, data_type: GeoArrowType) -> Result<Self> {
        let (coord_type, dim) = match (data_type.coord_type(), data_type.dimension()) {
            (Some(coord_type), Some(dim)) => (coord_type, dim),
            // Serialized variants don't consult these.
            _ => (CoordType::Separated, Dimension::XY),
        };
        let inner = match &data_type {
            GeoArrowType::Point(_) => {
                ViewInner::Point(CoordBuffer::try_from_arrow(array, coord_type, dim)?)
            }
            GeoArrowType::LineString(_) => {
                let list = downcast_list::<i32>(array, "linestring")?;
                let coords = CoordBuffer::try_from_arrow(list.values(), coord_type, dim)?;
                let geom_offsets = list.offsets().clone();
                validate_offsets(&geom_offsets, coords.len())?;
                ViewInner::LineString {
                    geom_offsets,
                    coords,
                }
            }
            GeoArrowType::Polygon(_) => {
                let list = downcast_list::<i32>(array, "polygon")?;
                let rings = downcast_list::<i32>(list.values(), "polygon rings")?;
                let coords = CoordBuffer::try_from_arrow(rings.values(), coord_type, dim)?;
                let geom_offsets = list.offsets().clone();
                let ring_offsets = rings.offsets().clone();
                validate_offsets(&ring_offsets, coords.len())?;
                validate_offsets(&geom_offsets, rings.len())?;
                ViewInner::Polygon {
                    geom_offsets,
                    ring_offsets,
                    coords,
                }
            }
            GeoArrowType::MultiPoint(_) => {
                let list = downcast_list::<i32>(array, "multipoint")?;
                let coords = CoordBuffer::try_from_arrow(list.values(), coord_type, dim)?;
                let geom_offsets = list.offsets().clone();
                validate_offsets(&geom_offsets, coords.len())?;
                ViewInner::MultiPoint {
                    geom_offsets,
                    coords,
                }
            }
            GeoArrowType::MultiLineString(_) => {
                let list = downcast_list::<i32>(array, "multilinestring")?;
                let linestrings = downcast_list::<i32>(list.values(), "linestrings")?;
                let coords = CoordBuffer::try_from_arrow(linestrings.values(), coord_type, dim)?;
                let geom_offsets = list.offsets().clone();
                let ring_offsets = linestrings.offsets().clone();
                validate_offsets(&ring_offsets, coords.len())?;
                validate_offsets(&geom_offsets, linestrings.len())?;
                ViewInner::MultiLineString {
                    geom_offsets,
                    ring_offsets,
                    coords,
                }
            }
            GeoArrowType::MultiPolygon(_) => {
                let list = downcast_list::<i32>(array, "multipolygon")?;
                let polygons = downcast_list::<i32>(list.values(), "polygons")?;
                let rings = downcast_list::<i32>(polygons.values(), "rings")?;
                let coords = CoordBuffer::try_from_arrow(rings.values(), coord_type, dim)?;
                let geom_offsets = list.offsets().clone();
                let polygon_offsets = polygons.offsets().clone();
                let ring_offsets = rings.offsets().clone();
                validate_offsets(&ring_offsets, coords.len())?;
                validate_offsets(&polygon_offsets, rings.len())?;
                validate_offsets(&geom_offsets, polygons.len())?;
                ViewInner::MultiPolygon {
                    geom_offsets,
                    polygon_offsets,
                    ring_offsets,
                    coords,
                }
            }
            GeoArrowType::Rect(t) => {
                let s = array.as_any().downcast_ref::<StructArray>().ok_or_else(|| {
                    GeoArrowError::IllegalArgument(format!(
                        "Expected a struct array for box, got {}",
                        array.data_type()
                    ))
                })?;
                let size = t.dimension().size();
                if s.num_columns() != 2 * size {
                    return Err(GeoArrowError::IllegalArgument(format!(
                        "Expected {} box children, got {}",
                        2 * size,
                        s.num_columns()
                    )));
                }
                let ordinates = |range: std::ops::Range<usize>| -> Result<CoordBuffer> {
                    let mut buffers: [ScalarBuffer<f64>; 4] =
                        std::array::from_fn(|_| ScalarBuffer::from(Vec::new()));
                    for (slot, i) in range.enumerate() {
                        let column = s.column(i);
                        let values = column
                            .as_any()
                            .downcast_ref::<arrow_array::Float64Array>()
                            .ok_or_else(|| {
                                GeoArrowError::IllegalArgument(
                                    "Expected Float64 box values".to_string(),
                                )
                            })?;
                        buffers[slot] = values.values().slice(column.offset(), s.len());
                    }
                    Ok(CoordBuffer::Separated(
                        crate::array::coord::SeparatedCoordBuffer::try_new(buffers, t.dimension())?,
                    ))
                };
                ViewInner::Rect {
                    mins: ordinates(0..size)?,
                    maxs: ordinates(size..2 * size)?,
                }
            }
            GeoArrowType::Wkb(_) => ViewInner::Wkb(
                array
                    .as_any()
                    .downcast_ref::<GenericBinaryArray<i32>>()
                    .ok_or_else(|| {
                        GeoArrowError::IllegalArgument(format!(
                            "Expected a binary array for wkb, got {}",
                            array.data_type()
                        ))
                    })?
                    .clone(),
            ),
            GeoArrowType::LargeWkb(_) => ViewInner::LargeWkb(
                array
                    .as_any()
                    .downcast_ref::<GenericBinaryArray<i64>>()
                    .ok_or_else(|| {
                        GeoArrowError::IllegalArgument(format!(
                            "Expected a large binary array for wkb, got {}",
                            array.data_type()
                        ))
                    })?
                    .clone(),
            ),
            GeoArrowType::Wkt(_) => ViewInner::Wkt(
                array
                    .as_any()
                    .downcast_ref::<GenericStringArray<i32>>()
                    .ok_or_else(|| {
                        GeoArrowError::IllegalArgument(format!(
                            "Expected a utf8 array for wkt, got {}",
                            array.data_type()
                        ))
                    })?
                    .clone(),
            ),
            GeoArrowType::LargeWkt(_) => ViewInner::LargeWkt(
                array
                    .as_any()
                    .downcast_ref::<GenericStringArray<i64>>()
                    .ok_or_else(|| {
                        GeoArrowError::IllegalArgument(format!(
                            "Expected a large utf8 array for wkt, got {}",
                            array.data_type()
                        ))
                    })?
                    .clone(),
            ),
        };
        Ok(Self {
            data_type,
            len: array.len(),
            nulls: array.nulls().cloned(),
            inner,
        })
    }

    /// The descriptor this view was constructed with.
    pub fn data_type(&self) -> &GeoArrowType {
        &self.data_type
    }

    /// The number of features.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the view holds no features.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The validity bitmap, or `None` when every feature is valid.
    pub fn nulls(&self) -> Option<&NullBuffer> {
        self.nulls.as_ref()
    }

    /// The number of null features.
    pub fn null_count(&self) -> usize {
        self.nulls.as_ref().map(|n| n.null_count()).unwrap_or(0)
    }

    /// Whether the feature at `i` is null.
    pub fn is_null(&self, i: usize) -> bool {
        self.nulls.as_ref().map(|n| n.is_null(i)).unwrap_or(false)
    }

    /// The list offset buffers of this view, outermost first.
    ///
    /// Empty for point, box and serialized arrays.
    pub fn offset_buffers(&self) -> Vec<&OffsetBuffer<i32>> {
        match &self.inner {
            ViewInner::Point(_)
            | ViewInner::Rect { .. }
            | ViewInner::Wkb(_)
            | ViewInner::LargeWkb(_)
            | ViewInner::Wkt(_)
            | ViewInner::LargeWkt(_) => vec![],
            ViewInner::LineString { geom_offsets, .. }
            | ViewInner::MultiPoint { geom_offsets, .. } => vec![geom_offsets],
            ViewInner::Polygon {
                geom_offsets,
                ring_offsets,
                ..
            }
            | ViewInner::MultiLineString {
                geom_offsets,
                ring_offsets,
                ..
            } => vec![geom_offsets, ring_offsets],
            ViewInner::MultiPolygon {
                geom_offsets,
                polygon_offsets,
                ring_offsets,
                ..
            } => vec![geom_offsets, polygon_offsets, ring_offsets],
        }
    }

    /// The coordinate leaf buffer of this view, if the layout has one.
    pub fn coords(&self) -> Option<&CoordBuffer> {
        match &self.inner {
            ViewInner::Point(coords)
            | ViewInner::LineString { coords, .. }
            | ViewInner::Polygon { coords, .. }
            | ViewInner::MultiPoint { coords, .. }
            | ViewInner::MultiLineString { coords, .. }
            | ViewInner::MultiPolygon { coords, .. } => Some(coords),
            _ => None,
        }
    }

    /// Emit every feature to `visitor` in order.
    pub fn visit<V: GeomVisitor>(&self, visitor: &mut V) -> Result<()> {
        for i in 0..self.len {
            self.visit_feature(i, visitor)?;
        }
        Ok(())
    }

    /// Emit the single feature at `i` to `visitor`.
    pub fn visit_feature<V: GeomVisitor>(&self, i: usize, visitor: &mut V) -> Result<()> {
        visitor.feature_begin()?;
        if self.is_null(i) {
            visitor.null_feature()?;
        } else {
            self.visit_geometry(i, visitor)?;
        }
        visitor.feature_end()
    }

    fn visit_geometry<V: GeomVisitor>(&self, i: usize, visitor: &mut V) -> Result<()> {
        let dim = self.data_type.dimension().unwrap_or(Dimension::XY);
        match &self.inner {
            ViewInner::Point(coords) => visit_point(coords, i, dim, visitor),
            ViewInner::LineString {
                geom_offsets,
                coords,
            } => {
                let (start, end) = bounds(geom_offsets, i);
                visit_line_string(coords, start, end, dim, visitor)
            }
            ViewInner::Polygon {
                geom_offsets,
                ring_offsets,
                coords,
            } => {
                let (start, end) = bounds(geom_offsets, i);
                visit_polygon(coords, ring_offsets, start, end, dim, visitor)
            }
            ViewInner::MultiPoint {
                geom_offsets,
                coords,
            } => {
                let (start, end) = bounds(geom_offsets, i);
                visitor.geometry_begin(GeometryType::MultiPoint, dim)?;
                for child in start..end {
                    visit_point(coords, child, dim, visitor)?;
                }
                visitor.geometry_end()
            }
            ViewInner::MultiLineString {
                geom_offsets,
                ring_offsets,
                coords,
            } => {
                let (start, end) = bounds(geom_offsets, i);
                visitor.geometry_begin(GeometryType::MultiLineString, dim)?;
                for child in start..end {
                    let (cs, ce) = bounds(ring_offsets, child);
                    visit_line_string(coords, cs, ce, dim, visitor)?;
                }
                visitor.geometry_end()
            }
            ViewInner::MultiPolygon {
                geom_offsets,
                polygon_offsets,
                ring_offsets,
                coords,
            } => {
                let (start, end) = bounds(geom_offsets, i);
                visitor.geometry_begin(GeometryType::MultiPolygon, dim)?;
                for child in start..end {
                    let (ps, pe) = bounds(polygon_offsets, child);
                    visit_polygon(coords, ring_offsets, ps, pe, dim, visitor)?;
                }
                visitor.geometry_end()
            }
            ViewInner::Rect { mins, maxs } => {
                let (xmin, ymin) = (mins.x(i), mins.y(i));
                let (xmax, ymax) = (maxs.x(i), maxs.y(i));
                visitor.geometry_begin(GeometryType::Polygon, Dimension::XY)?;
                if xmin <= xmax && ymin <= ymax {
                    visitor.ring_begin()?;
                    visitor.coord(xmin, ymin, None, None)?;
                    visitor.coord(xmax, ymin, None, None)?;
                    visitor.coord(xmax, ymax, None, None)?;
                    visitor.coord(xmin, ymax, None, None)?;
                    visitor.coord(xmin, ymin, None, None)?;
                    visitor.ring_end()?;
                }
                visitor.geometry_end()
            }
            ViewInner::Wkb(array) => crate::wkb::reader::process_wkb(array.value(i), visitor),
            ViewInner::LargeWkb(array) => crate::wkb::reader::process_wkb(array.value(i), visitor),
            ViewInner::Wkt(array) => crate::wkt::reader::process_wkt(array.value(i), visitor),
            ViewInner::LargeWkt(array) => crate::wkt::reader::process_wkt(array.value(i), visitor),
        }
    }
}

fn bounds(offsets: &OffsetBuffer<i32>, i: usize) -> (usize, usize) {
    (offsets[i] as usize, offsets[i + 1] as usize)
}

fn visit_point<V: GeomVisitor>(
    coords: &CoordBuffer,
    i: usize,
    dim: Dimension,
    visitor: &mut V,
) -> Result<()> {
    visitor.geometry_begin(GeometryType::Point, dim)?;
    coords.visit_range(i, i + 1, visitor)?;
    visitor.geometry_end()
}

fn visit_line_string<V: GeomVisitor>(
    coords: &CoordBuffer,
    start: usize,
    end: usize,
    dim: Dimension,
    visitor: &mut V,
) -> Result<()> {
    visitor.geometry_begin(GeometryType::LineString, dim)?;
    coords.visit_range(start, end, visitor)?;
    visitor.geometry_end()
}

fn visit_polygon<V: GeomVisitor>(
    coords: &CoordBuffer,
    ring_offsets: &OffsetBuffer<i32>,
    start: usize,
    end: usize,
    dim: Dimension,
    visitor: &mut V,
) -> Result<()> {
    visitor.geometry_begin(GeometryType::Polygon, dim)?;
    for ring in start..end {
        let (rs, re) = bounds(ring_offsets, ring);
        visitor.ring_begin()?;
        coords.visit_range(rs, re, visitor)?;
        visitor.ring_end()?;
    }
    visitor.geometry_end()
}

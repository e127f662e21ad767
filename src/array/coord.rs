use std::sync::Arc;

use arrow_array::{Array, ArrayRef, FixedSizeListArray, Float64Array, StructArray};
use arrow_buffer::ScalarBuffer;
use arrow_schema::{DataType, Field};

use crate::error::{GeoArrowError, Result};
use crate::schema::{CoordType, Dimension};
use crate::visitor::GeomVisitor;

/// An array of coordinates stored interleaved in a single buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct InterleavedCoordBuffer {
    coords: ScalarBuffer<f64>,
    dim: Dimension,
}

impl InterleavedCoordBuffer {
    /// Construct a new buffer.
    ///
    /// # Errors
    ///
    /// - if the buffer length is not a multiple of the dimension size
    pub fn try_new(coords: ScalarBuffer<f64>, dim: Dimension) -> Result<Self> {
        if coords.len() % dim.size() != 0 {
            return Err(GeoArrowError::Validation(
                "Length of interleaved coordinate buffer must be a multiple of the dimension size"
                    .to_string(),
            ));
        }
        Ok(Self { coords, dim })
    }

    /// The number of coordinates.
    pub fn len(&self) -> usize {
        self.coords.len() / self.dim.size()
    }

    /// Whether this buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Access the underlying coordinate buffer.
    pub fn coords(&self) -> &ScalarBuffer<f64> {
        &self.coords
    }
}

/// An array of coordinates stored in one buffer per dimension.
///
/// A buffer is always stored for all 4 dimensions; the buffers for absent
/// dimensions are empty.
#[derive(Debug, Clone, PartialEq)]
pub struct SeparatedCoordBuffer {
    buffers: [ScalarBuffer<f64>; 4],
    dim: Dimension,
}

impl SeparatedCoordBuffer {
    /// Construct a new buffer.
    ///
    /// # Errors
    ///
    /// - if the buffers for present dimensions have different lengths
    pub fn try_new(buffers: [ScalarBuffer<f64>; 4], dim: Dimension) -> Result<Self> {
        if !buffers[..dim.size()].windows(2).all(|w| w[0].len() == w[1].len()) {
            return Err(GeoArrowError::Validation(
                "all coordinate buffers must have the same length".to_string(),
            ));
        }
        Ok(Self { buffers, dim })
    }

    /// The number of coordinates.
    pub fn len(&self) -> usize {
        self.buffers[0].len()
    }

    /// Whether this buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Access the buffer of the `n`th ordinate.
    pub fn ordinate(&self, n: usize) -> &ScalarBuffer<f64> {
        &self.buffers[n]
    }
}

/// Coordinates in either of the two GeoArrow layouts.
#[derive(Debug, Clone, PartialEq)]
pub enum CoordBuffer {
    /// Interleaved coordinates.
    Interleaved(InterleavedCoordBuffer),
    /// Separated coordinates.
    Separated(SeparatedCoordBuffer),
}

impl CoordBuffer {
    /// The coordinate type of this buffer.
    pub fn coord_type(&self) -> CoordType {
        match self {
            CoordBuffer::Interleaved(_) => CoordType::Interleaved,
            CoordBuffer::Separated(_) => CoordType::Separated,
        }
    }

    /// The dimension of this buffer.
    pub fn dim(&self) -> Dimension {
        match self {
            CoordBuffer::Interleaved(b) => b.dim,
            CoordBuffer::Separated(b) => b.dim,
        }
    }

    /// The number of coordinates.
    pub fn len(&self) -> usize {
        match self {
            CoordBuffer::Interleaved(b) => b.len(),
            CoordBuffer::Separated(b) => b.len(),
        }
    }

    /// Whether this buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The x value of the coordinate at `i`.
    pub fn x(&self, i: usize) -> f64 {
        self.ordinate_value(i, 0)
    }

    /// The y value of the coordinate at `i`.
    pub fn y(&self, i: usize) -> f64 {
        self.ordinate_value(i, 1)
    }

    /// The `n`th ordinate of the coordinate at `i`.
    ///
    /// Ordinates are numbered in storage order: x, y, then z and/or m as the
    /// dimension declares them.
    pub fn ordinate_value(&self, i: usize, n: usize) -> f64 {
        match self {
            CoordBuffer::Interleaved(b) => b.coords[i * b.dim.size() + n],
            CoordBuffer::Separated(b) => b.buffers[n][i],
        }
    }

    /// Interpret an Arrow array as a coordinate buffer with the given layout.
    ///
    /// This is zero-copy: buffers are reference-counted clones of the input
    /// array's buffers.
    pub fn try_from_arrow(
        array: &dyn Array,
        coord_type: CoordType,
        dim: Dimension,
    ) -> Result<Self> {
        match coord_type {
            CoordType::Interleaved => {
                let fsl = array
                    .as_any()
                    .downcast_ref::<FixedSizeListArray>()
                    .ok_or_else(|| {
                        GeoArrowError::IllegalArgument(format!(
                            "Expected fixed size list coordinates, got {}",
                            array.data_type()
                        ))
                    })?;
                if fsl.value_length() as usize != dim.size() {
                    return Err(GeoArrowError::IllegalArgument(format!(
                        "Expected fixed size list of width {}, got {}",
                        dim.size(),
                        fsl.value_length()
                    )));
                }
                let values = fsl
                    .values()
                    .as_any()
                    .downcast_ref::<Float64Array>()
                    .ok_or_else(|| {
                        GeoArrowError::IllegalArgument(
                            "Expected Float64 coordinate values".to_string(),
                        )
                    })?;
                let start = fsl.offset() * dim.size();
                let coords = values.values().slice(start, fsl.len() * dim.size());
                Ok(Self::Interleaved(InterleavedCoordBuffer::try_new(
                    coords, dim,
                )?))
            }
            CoordType::Separated => {
                let s = array.as_any().downcast_ref::<StructArray>().ok_or_else(|| {
                    GeoArrowError::IllegalArgument(format!(
                        "Expected struct coordinates, got {}",
                        array.data_type()
                    ))
                })?;
                if s.num_columns() != dim.size() {
                    return Err(GeoArrowError::IllegalArgument(format!(
                        "Expected {} coordinate children, got {}",
                        dim.size(),
                        s.num_columns()
                    )));
                }
                let mut buffers: [ScalarBuffer<f64>; 4] =
                    std::array::from_fn(|_| ScalarBuffer::from(Vec::new()));
                for (n, column) in s.columns().iter().enumerate() {
                    let values = column
                        .as_any()
                        .downcast_ref::<Float64Array>()
                        .ok_or_else(|| {
                            GeoArrowError::IllegalArgument(
                                "Expected Float64 coordinate values".to_string(),
                            )
                        })?;
                    buffers[n] = values.values().slice(column.offset(), s.len());
                }
                Ok(Self::Separated(SeparatedCoordBuffer::try_new(
                    buffers, dim,
                )?))
            }
        }
    }

    /// Convert into the Arrow storage array for this layout.
    pub fn into_arrow(self) -> ArrayRef {
        match self {
            CoordBuffer::Interleaved(b) => {
                let field = Field::new(b.dim.interleaved_field_name(), DataType::Float64, false);
                let values = Arc::new(Float64Array::new(b.coords, None));
                Arc::new(FixedSizeListArray::new(
                    Arc::new(field),
                    b.dim.size() as i32,
                    values,
                    None,
                ))
            }
            CoordBuffer::Separated(b) => {
                let fields: Vec<Field> = b
                    .dim
                    .separated_field_names()
                    .iter()
                    .map(|name| Field::new(*name, DataType::Float64, false))
                    .collect();
                let arrays: Vec<ArrayRef> = b.buffers[..b.dim.size()]
                    .iter()
                    .map(|buffer| Arc::new(Float64Array::new(buffer.clone(), None)) as ArrayRef)
                    .collect();
                Arc::new(StructArray::new(fields.into(), arrays, None))
            }
        }
    }

    /// Emit the coordinates in `start..end` to a visitor.
    ///
    /// Separated buffers hand over whole slices through the batched
    /// [`coords`][GeomVisitor::coords] event; interleaved buffers emit one
    /// [`coord`][GeomVisitor::coord] per position.
    pub fn visit_range<V: GeomVisitor>(
        &self,
        start: usize,
        end: usize,
        visitor: &mut V,
    ) -> Result<()> {
        let dim = self.dim();
        if end > self.len() || start > end {
            return Err(GeoArrowError::Validation(format!(
                "Coordinate range {start}..{end} out of bounds for buffer of length {}",
                self.len()
            )));
        }
        match self {
            CoordBuffer::Separated(b) => {
                let z_slot = dim.has_z().then_some(2);
                let m_slot = dim.has_m().then_some(if dim.has_z() { 3 } else { 2 });
                visitor.coords(
                    dim,
                    &b.buffers[0][start..end],
                    &b.buffers[1][start..end],
                    z_slot.map(|n| &b.buffers[n][start..end]),
                    m_slot.map(|n| &b.buffers[n][start..end]),
                )
            }
            CoordBuffer::Interleaved(b) => {
                let size = dim.size();
                for i in start..end {
                    let base = i * size;
                    let z = dim.has_z().then(|| b.coords[base + 2]);
                    let m = dim
                        .has_m()
                        .then(|| b.coords[base + 2 + usize::from(dim.has_z())]);
                    visitor.coord(b.coords[base], b.coords[base + 1], z, m)?;
                }
                Ok(())
            }
        }
    }
}

/// A growable coordinate buffer in either layout.
#[derive(Debug, Clone)]
pub enum CoordBufferBuilder {
    /// Building interleaved coordinates.
    Interleaved(InterleavedCoordBufferBuilder),
    /// Building separated coordinates.
    Separated(SeparatedCoordBufferBuilder),
}

/// A growable interleaved coordinate buffer.
#[derive(Debug, Clone)]
pub struct InterleavedCoordBufferBuilder {
    coords: Vec<f64>,
    dim: Dimension,
}

/// A growable separated coordinate buffer.
#[derive(Debug, Clone)]
pub struct SeparatedCoordBufferBuilder {
    buffers: [Vec<f64>; 4],
    dim: Dimension,
}

impl CoordBufferBuilder {
    /// Create a new empty builder.
    pub fn new(coord_type: CoordType, dim: Dimension) -> Self {
        Self::with_capacity(coord_type, dim, 0)
    }

    /// Create a new builder with room for `capacity` coordinates.
    pub fn with_capacity(coord_type: CoordType, dim: Dimension, capacity: usize) -> Self {
        match coord_type {
            CoordType::Interleaved => Self::Interleaved(InterleavedCoordBufferBuilder {
                coords: Vec::with_capacity(capacity * dim.size()),
                dim,
            }),
            CoordType::Separated => Self::Separated(SeparatedCoordBufferBuilder {
                buffers: [
                    Vec::with_capacity(capacity),
                    Vec::with_capacity(capacity),
                    Vec::new(),
                    Vec::new(),
                ],
                dim,
            }),
        }
    }

    /// The dimension being built.
    pub fn dim(&self) -> Dimension {
        match self {
            CoordBufferBuilder::Interleaved(b) => b.dim,
            CoordBufferBuilder::Separated(b) => b.dim,
        }
    }

    /// The number of coordinates pushed so far.
    pub fn len(&self) -> usize {
        match self {
            CoordBufferBuilder::Interleaved(b) => b.coords.len() / b.dim.size(),
            CoordBufferBuilder::Separated(b) => b.buffers[0].len(),
        }
    }

    /// Whether no coordinate has been pushed yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reserve room for `additional` more coordinates.
    pub fn reserve(&mut self, additional: usize) {
        match self {
            CoordBufferBuilder::Interleaved(b) => b.coords.reserve(additional * b.dim.size()),
            CoordBufferBuilder::Separated(b) => {
                for buffer in b.buffers[..b.dim.size()].iter_mut() {
                    buffer.reserve(additional);
                }
            }
        }
    }

    /// Push one coordinate, promoting or truncating to the target dimension.
    ///
    /// Ordinates the target dimension declares but the input lacks are filled
    /// with NaN; ordinates the input carries but the target lacks are
    /// dropped.
    pub fn push(&mut self, x: f64, y: f64, z: Option<f64>, m: Option<f64>) {
        let dim = self.dim();
        let mut ordinates = [x, y, f64::NAN, f64::NAN];
        let mut n = 2;
        if dim.has_z() {
            ordinates[n] = z.unwrap_or(f64::NAN);
            n += 1;
        }
        if dim.has_m() {
            ordinates[n] = m.unwrap_or(f64::NAN);
            n += 1;
        }
        match self {
            CoordBufferBuilder::Interleaved(b) => b.coords.extend_from_slice(&ordinates[..n]),
            CoordBufferBuilder::Separated(b) => {
                for (slot, value) in ordinates[..n].iter().enumerate() {
                    b.buffers[slot].push(*value);
                }
            }
        }
    }

    /// Push one all-NaN coordinate (the materialization of an empty point or
    /// a null feature in a point array).
    pub fn push_nan(&mut self) {
        self.push(f64::NAN, f64::NAN, Some(f64::NAN), Some(f64::NAN));
    }

    /// Consume into an immutable [CoordBuffer].
    pub fn finish(self) -> CoordBuffer {
        match self {
            CoordBufferBuilder::Interleaved(b) => {
                CoordBuffer::Interleaved(InterleavedCoordBuffer {
                    coords: b.coords.into(),
                    dim: b.dim,
                })
            }
            CoordBufferBuilder::Separated(b) => {
                let dim = b.dim;
                let [x, y, z, m] = b.buffers;
                CoordBuffer::Separated(SeparatedCoordBuffer {
                    buffers: [x.into(), y.into(), z.into(), m.into()],
                    dim,
                })
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn build(coord_type: CoordType, dim: Dimension) -> CoordBuffer {
        let mut builder = CoordBufferBuilder::new(coord_type, dim);
        builder.push(0.0, 1.0, Some(2.0), Some(3.0));
        builder.push(4.0, 5.0, None, None);
        builder.finish()
    }

    #[test]
    fn ordinate_access() {
        for coord_type in [CoordType::Separated, CoordType::Interleaved] {
            let buffer = build(coord_type, Dimension::XYZM);
            assert_eq!(buffer.len(), 2);
            assert_eq!(buffer.x(0), 0.0);
            assert_eq!(buffer.y(0), 1.0);
            assert_eq!(buffer.ordinate_value(0, 2), 2.0);
            assert_eq!(buffer.ordinate_value(0, 3), 3.0);
            assert!(buffer.ordinate_value(1, 2).is_nan());
        }
    }

    #[test]
    fn arrow_round_trip() {
        for coord_type in [CoordType::Separated, CoordType::Interleaved] {
            for dim in [Dimension::XY, Dimension::XYZ, Dimension::XYM, Dimension::XYZM] {
                let buffer = build(coord_type, dim);
                let array = buffer.clone().into_arrow();
                let back = CoordBuffer::try_from_arrow(array.as_ref(), coord_type, dim).unwrap();
                assert_eq!(back.len(), buffer.len());
                assert_eq!(back.x(1), 4.0);
                assert_eq!(back.y(1), 5.0);
            }
        }
    }

    #[test]
    fn layout_mismatch_rejected() {
        let buffer = build(CoordType::Separated, Dimension::XY);
        let array = buffer.into_arrow();
        assert!(
            CoordBuffer::try_from_arrow(array.as_ref(), CoordType::Interleaved, Dimension::XY)
                .is_err()
        );
    }

    #[test]
    fn visit_range_batches_separated() {
        struct Collect(Vec<(f64, f64)>);
        impl GeomVisitor for Collect {
            fn coord(&mut self, x: f64, y: f64, _z: Option<f64>, _m: Option<f64>) -> crate::error::Result<()> {
                self.0.push((x, y));
                Ok(())
            }
        }
        for coord_type in [CoordType::Separated, CoordType::Interleaved] {
            let buffer = build(coord_type, Dimension::XY);
            let mut visitor = Collect(vec![]);
            buffer.visit_range(0, 2, &mut visitor).unwrap();
            assert_eq!(visitor.0, vec![(0.0, 1.0), (4.0, 5.0)]);
        }
    }
}

use std::sync::Arc;

use arrow_array::{Array, ArrayRef, FixedSizeListArray, Float64Array, GenericListArray, StructArray};
use arrow_buffer::{BooleanBuffer, Buffer, NullBuffer, OffsetBuffer, ScalarBuffer};
use arrow_schema::{DataType, FieldRef};

use crate::array::coord::{CoordBuffer, InterleavedCoordBuffer, SeparatedCoordBuffer};
use crate::error::{GeoArrowError, Result};
use crate::schema::{CoordType, GeoArrowType};

/// Assembles a GeoArrow array from raw buffers without copying them.
///
/// Buffer slots are numbered by the array layout: slot 0 is the validity
/// bitmap, slots `1..=D` are the `i32` offset buffers for each list nesting
/// level (outermost first), and the remaining slots are the `f64` coordinate
/// buffers — a single slot for interleaved layouts, one slot per ordinate
/// for separated layouts.
///
/// Unset offset slots default to empty lists; unset coordinate slots default
/// to zero-filled buffers of the length implied by the innermost offsets.
/// [`finish`][Self::finish] validates the assembled structure and transfers
/// buffer ownership into the output array.
#[derive(Debug)]
pub struct RawArrayBuilder {
    data_type: GeoArrowType,
    validity: Option<Buffer>,
    offsets: Vec<Option<ScalarBuffer<i32>>>,
    coords: Vec<Option<ScalarBuffer<f64>>>,
}

fn list_depth(data_type: &GeoArrowType) -> Result<usize> {
    use GeoArrowType::*;
    match data_type {
        Point(_) => Ok(0),
        LineString(_) | MultiPoint(_) => Ok(1),
        Polygon(_) | MultiLineString(_) => Ok(2),
        MultiPolygon(_) => Ok(3),
        _ => Err(GeoArrowError::IllegalArgument(format!(
            "Cannot build {} arrays from raw buffers",
            data_type.extension_name()
        ))),
    }
}

impl RawArrayBuilder {
    /// Create a builder for the given native descriptor.
    ///
    /// Errors for box and serialized descriptors, which are not built from
    /// raw geometry buffers.
    pub fn try_new(data_type: GeoArrowType) -> Result<Self> {
        let depth = list_depth(&data_type)?;
        let num_coord_buffers = match data_type.coord_type().unwrap() {
            CoordType::Interleaved => 1,
            CoordType::Separated => data_type.dimension().unwrap().size(),
        };
        Ok(Self {
            data_type,
            validity: None,
            offsets: vec![None; depth],
            coords: vec![None; num_coord_buffers],
        })
    }

    /// The descriptor this builder assembles.
    pub fn data_type(&self) -> &GeoArrowType {
        &self.data_type
    }

    /// The number of buffer slots of this layout, including validity.
    pub fn num_buffers(&self) -> usize {
        1 + self.offsets.len() + self.coords.len()
    }

    /// Set the validity bitmap (slot 0), 1 bit per feature, LSB first.
    pub fn set_validity(&mut self, bitmap: Buffer) {
        self.validity = Some(bitmap);
    }

    /// Set the offset buffer for list `level` (0 = outermost).
    pub fn set_offsets(&mut self, level: usize, offsets: ScalarBuffer<i32>) -> Result<()> {
        let slot = self.offsets.get_mut(level).ok_or_else(|| {
            GeoArrowError::IllegalArgument(format!(
                "Layout has no offset level {level}"
            ))
        })?;
        *slot = Some(offsets);
        Ok(())
    }

    /// Set the coordinate buffer for `ordinate` (0 for the single interleaved
    /// buffer; 0..dim for separated layouts in storage order).
    pub fn set_coords(&mut self, ordinate: usize, values: ScalarBuffer<f64>) -> Result<()> {
        let slot = self.coords.get_mut(ordinate).ok_or_else(|| {
            GeoArrowError::IllegalArgument(format!(
                "Layout has no coordinate buffer {ordinate}"
            ))
        })?;
        *slot = Some(values);
        Ok(())
    }

    /// Set a buffer by flat slot number, reinterpreting the raw bytes
    /// according to the slot's role.
    ///
    /// Offset payloads must be 4-byte aligned and coordinate payloads 8-byte
    /// aligned, as required for zero-copy Arrow interop.
    pub fn set_buffer(&mut self, slot: usize, buffer: Buffer) -> Result<()> {
        if slot == 0 {
            self.set_validity(buffer);
            return Ok(());
        }
        let slot = slot - 1;
        if slot < self.offsets.len() {
            if buffer.len() % 4 != 0 {
                return Err(GeoArrowError::IllegalArgument(
                    "Offset buffer length must be a multiple of 4 bytes".to_string(),
                ));
            }
            let len = buffer.len() / 4;
            self.set_offsets(slot, ScalarBuffer::new(buffer, 0, len))
        } else {
            let slot = slot - self.offsets.len();
            if buffer.len() % 8 != 0 {
                return Err(GeoArrowError::IllegalArgument(
                    "Coordinate buffer length must be a multiple of 8 bytes".to_string(),
                ));
            }
            let len = buffer.len() / 8;
            self.set_coords(slot, ScalarBuffer::new(buffer, 0, len))
        }
    }

    /// Validate the assembled buffers and emit the output array of `len`
    /// features.
    ///
    /// The builder is consumed; its buffers become the output array's owned
    /// buffers.
    pub fn finish(self, len: usize) -> Result<ArrayRef> {
        let dim = self.data_type.dimension().unwrap();
        let coord_type = self.data_type.coord_type().unwrap();

        // Resolve offsets level by level; the element count of each level is
        // the final offset of the level above.
        let mut count = len;
        let mut offsets = Vec::with_capacity(self.offsets.len());
        for (level, slot) in self.offsets.into_iter().enumerate() {
            let buffer =
                slot.unwrap_or_else(|| ScalarBuffer::from(vec![0i32; count + 1]));
            if buffer.len() != count + 1 {
                return Err(GeoArrowError::Validation(format!(
                    "Offset buffer at level {level} must hold {} values, holds {}",
                    count + 1,
                    buffer.len()
                )));
            }
            if buffer[0] != 0 {
                return Err(GeoArrowError::Validation(format!(
                    "Offset buffer at level {level} must start at 0, starts at {}",
                    buffer[0]
                )));
            }
            if !buffer.windows(2).all(|w| w[0] <= w[1]) {
                return Err(GeoArrowError::Validation(format!(
                    "Offset buffer at level {level} is not monotonically non-decreasing"
                )));
            }
            count = *buffer.last().unwrap() as usize;
            offsets.push(buffer);
        }

        // The innermost count is the required coordinate count.
        let coords = match coord_type {
            CoordType::Interleaved => {
                let buffer = self.coords.into_iter().next().unwrap().unwrap_or_else(|| {
                    ScalarBuffer::from(vec![0f64; count * dim.size()])
                });
                if buffer.len() != count * dim.size() {
                    return Err(GeoArrowError::Validation(format!(
                        "Interleaved coordinate buffer must hold {} values, holds {}",
                        count * dim.size(),
                        buffer.len()
                    )));
                }
                CoordBuffer::Interleaved(InterleavedCoordBuffer::try_new(buffer, dim)?)
            }
            CoordType::Separated => {
                let mut buffers: [ScalarBuffer<f64>; 4] =
                    std::array::from_fn(|_| ScalarBuffer::from(Vec::new()));
                for (ordinate, slot) in self.coords.into_iter().enumerate() {
                    let buffer =
                        slot.unwrap_or_else(|| ScalarBuffer::from(vec![0f64; count]));
                    if buffer.len() != count {
                        return Err(GeoArrowError::Validation(format!(
                            "Coordinate buffer {ordinate} must hold {count} values, holds {}",
                            buffer.len()
                        )));
                    }
                    buffers[ordinate] = buffer;
                }
                CoordBuffer::Separated(SeparatedCoordBuffer::try_new(buffers, dim)?)
            }
        };

        let nulls = match self.validity {
            Some(bitmap) => {
                if bitmap.len() < len.div_ceil(8) {
                    return Err(GeoArrowError::Validation(format!(
                        "Validity bitmap must hold at least {} bytes for {len} features, holds {}",
                        len.div_ceil(8),
                        bitmap.len()
                    )));
                }
                Some(NullBuffer::new(BooleanBuffer::new(bitmap, 0, len)))
            }
            None => None,
        };

        assemble(&self.data_type, offsets, coords, nulls, len)
    }
}

/// Wrap a coordinate array in the list nesting of `data_type`, attaching
/// `nulls` at the outermost level.
pub(crate) fn assemble(
    data_type: &GeoArrowType,
    offsets: Vec<ScalarBuffer<i32>>,
    coords: CoordBuffer,
    nulls: Option<NullBuffer>,
    len: usize,
) -> Result<ArrayRef> {
    // Child fields per nesting level, outermost first.
    let mut child_fields: Vec<FieldRef> = Vec::with_capacity(offsets.len());
    let mut current = data_type.data_type();
    for _ in 0..offsets.len() {
        match current {
            DataType::List(field) => {
                current = field.data_type().clone();
                child_fields.push(field);
            }
            dt => {
                return Err(GeoArrowError::IllegalArgument(format!(
                    "Descriptor storage is not nested deeply enough: {dt}"
                )))
            }
        }
    }

    if offsets.is_empty() {
        // Point layout: nulls attach to the coordinate array itself.
        let out: ArrayRef = match coords {
            CoordBuffer::Interleaved(b) => {
                let dim = data_type.dimension().unwrap();
                let field = match data_type.data_type() {
                    DataType::FixedSizeList(field, _) => field,
                    _ => unreachable!("interleaved point storage is a fixed size list"),
                };
                let values = Arc::new(Float64Array::new(b.coords().clone(), None));
                Arc::new(FixedSizeListArray::new(
                    field,
                    dim.size() as i32,
                    values,
                    nulls,
                ))
            }
            CoordBuffer::Separated(ref b) => {
                let dim = data_type.dimension().unwrap();
                let fields = match data_type.data_type() {
                    DataType::Struct(fields) => fields,
                    _ => unreachable!("separated point storage is a struct"),
                };
                let arrays: Vec<ArrayRef> = (0..dim.size())
                    .map(|n| {
                        Arc::new(Float64Array::new(b.ordinate(n).clone(), None)) as ArrayRef
                    })
                    .collect();
                Arc::new(StructArray::new(fields, arrays, nulls))
            }
        };
        debug_assert_eq!(out.len(), len);
        return Ok(out);
    }

    let mut child: ArrayRef = coords.into_arrow();
    for (level, offsets) in offsets.into_iter().enumerate().rev() {
        let level_nulls = if level == 0 { nulls.clone() } else { None };
        child = Arc::new(GenericListArray::<i32>::new(
            child_fields[level].clone(),
            OffsetBuffer::new(offsets),
            child,
            level_nulls,
        ));
    }
    debug_assert_eq!(child.len(), len);
    Ok(child)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::schema::{CoordType, Dimension, GeometryType};

    fn line_string_type() -> GeoArrowType {
        GeoArrowType::new(
            GeometryType::LineString,
            Dimension::XY,
            CoordType::Separated,
        )
        .unwrap()
    }

    #[test]
    fn line_string_from_buffers() {
        let mut builder = RawArrayBuilder::try_new(line_string_type()).unwrap();
        assert_eq!(builder.num_buffers(), 4);
        builder
            .set_offsets(0, ScalarBuffer::from(vec![0i32, 2]))
            .unwrap();
        builder
            .set_coords(0, ScalarBuffer::from(vec![0.0, 2.0]))
            .unwrap();
        builder
            .set_coords(1, ScalarBuffer::from(vec![1.0, 3.0]))
            .unwrap();
        let array = builder.finish(1).unwrap();
        assert_eq!(array.len(), 1);

        let view = crate::array::GeometryArrayView::try_new(array.as_ref(), line_string_type())
            .unwrap();
        let coords = view.coords().unwrap();
        assert_eq!(coords.x(0), 0.0);
        assert_eq!(coords.y(1), 3.0);
        assert_eq!(view.offset_buffers()[0].as_ref(), &[0, 2]);
    }

    #[test]
    fn unset_coordinate_slots_are_zero_filled() {
        let mut builder = RawArrayBuilder::try_new(line_string_type()).unwrap();
        builder
            .set_offsets(0, ScalarBuffer::from(vec![0i32, 3]))
            .unwrap();
        let array = builder.finish(1).unwrap();
        let view = crate::array::GeometryArrayView::try_new(array.as_ref(), line_string_type())
            .unwrap();
        assert_eq!(view.coords().unwrap().len(), 3);
        assert_eq!(view.coords().unwrap().x(2), 0.0);
    }

    #[test]
    fn non_monotonic_offsets_rejected() {
        let mut builder = RawArrayBuilder::try_new(line_string_type()).unwrap();
        builder
            .set_offsets(0, ScalarBuffer::from(vec![0i32, 2, 1]))
            .unwrap();
        builder
            .set_coords(0, ScalarBuffer::from(vec![0.0, 2.0]))
            .unwrap();
        builder
            .set_coords(1, ScalarBuffer::from(vec![1.0, 3.0]))
            .unwrap();
        assert!(matches!(
            builder.finish(2),
            Err(GeoArrowError::Validation(_))
        ));
    }

    #[test]
    fn wrong_offset_count_rejected() {
        let mut builder = RawArrayBuilder::try_new(line_string_type()).unwrap();
        builder
            .set_offsets(0, ScalarBuffer::from(vec![0i32, 2]))
            .unwrap();
        assert!(matches!(
            builder.finish(3),
            Err(GeoArrowError::Validation(_))
        ));
    }

    #[test]
    fn wrong_coord_length_rejected() {
        let mut builder = RawArrayBuilder::try_new(line_string_type()).unwrap();
        builder
            .set_offsets(0, ScalarBuffer::from(vec![0i32, 2]))
            .unwrap();
        builder
            .set_coords(0, ScalarBuffer::from(vec![0.0]))
            .unwrap();
        assert!(matches!(
            builder.finish(1),
            Err(GeoArrowError::Validation(_))
        ));
    }

    #[test]
    fn short_validity_bitmap_rejected() {
        let ty = GeoArrowType::new(GeometryType::Point, Dimension::XY, CoordType::Separated)
            .unwrap();
        let mut builder = RawArrayBuilder::try_new(ty).unwrap();
        builder.set_coords(0, ScalarBuffer::from(vec![0.0; 16])).unwrap();
        builder.set_coords(1, ScalarBuffer::from(vec![0.0; 16])).unwrap();
        builder.set_validity(Buffer::from(vec![0b1111_1111u8]));
        assert!(matches!(
            builder.finish(16),
            Err(GeoArrowError::Validation(_))
        ));
    }

    #[test]
    fn serialized_descriptors_rejected() {
        let wkb = GeoArrowType::Wkb(crate::schema::WkbType::new(Default::default()));
        assert!(RawArrayBuilder::try_new(wkb).is_err());
    }

    #[test]
    fn point_with_validity() {
        let ty = GeoArrowType::new(GeometryType::Point, Dimension::XY, CoordType::Separated)
            .unwrap();
        let mut builder = RawArrayBuilder::try_new(ty.clone()).unwrap();
        builder
            .set_coords(0, ScalarBuffer::from(vec![30.0, 0.0]))
            .unwrap();
        builder
            .set_coords(1, ScalarBuffer::from(vec![10.0, 0.0]))
            .unwrap();
        builder.set_validity(Buffer::from(vec![0b0000_0001u8]));
        let array = builder.finish(2).unwrap();
        let view = crate::array::GeometryArrayView::try_new(array.as_ref(), ty).unwrap();
        assert_eq!(view.null_count(), 1);
        assert!(!view.is_null(0));
        assert!(view.is_null(1));
        assert_eq!(view.coords().unwrap().x(0), 30.0);
    }
}

use arrow_buffer::{OffsetBuffer, ScalarBuffer};

use crate::error::{GeoArrowError, Result};

/// A builder for monotonically non-decreasing `i32` list offsets.
///
/// Always holds at least the leading `0`. Lengths that would push the final
/// offset past `i32::MAX` fail with [`GeoArrowError::Overflow`]; callers that
/// need more than `i32::MAX` inner elements must use a large-offset storage
/// variant instead.
#[derive(Debug, Clone)]
pub struct OffsetsBuilder {
    offsets: Vec<i32>,
}

impl OffsetsBuilder {
    /// Create a new builder containing only the leading zero.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create a new builder with capacity for `capacity` list elements.
    pub fn with_capacity(capacity: usize) -> Self {
        let mut offsets = Vec::with_capacity(capacity + 1);
        offsets.push(0);
        Self { offsets }
    }

    /// Reserve space for `additional` more list elements.
    pub fn reserve(&mut self, additional: usize) {
        self.offsets.reserve(additional);
    }

    /// The number of list elements pushed so far.
    pub fn len(&self) -> usize {
        self.offsets.len() - 1
    }

    /// Whether any list element has been pushed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The current final offset.
    pub fn last(&self) -> i32 {
        *self.offsets.last().unwrap()
    }

    /// Push a list element covering `length` more inner elements.
    pub fn try_push_usize(&mut self, length: usize) -> Result<()> {
        let length = i32::try_from(length).map_err(|_| GeoArrowError::Overflow)?;
        let offset = self.last().checked_add(length).ok_or(GeoArrowError::Overflow)?;
        self.offsets.push(offset);
        Ok(())
    }

    /// Push `additional` empty list elements.
    pub fn extend_constant(&mut self, additional: usize) {
        let last = self.last();
        self.offsets
            .extend(std::iter::repeat(last).take(additional));
    }

    /// Consume into an Arrow [OffsetBuffer].
    pub fn finish(self) -> OffsetBuffer<i32> {
        OffsetBuffer::new(ScalarBuffer::from(self.offsets))
    }
}

impl Default for OffsetsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn push_and_finish() {
        let mut builder = OffsetsBuilder::new();
        builder.try_push_usize(2).unwrap();
        builder.extend_constant(1);
        builder.try_push_usize(3).unwrap();
        assert_eq!(builder.len(), 3);
        assert_eq!(builder.last(), 5);
        let offsets = builder.finish();
        assert_eq!(offsets.as_ref(), &[0, 2, 2, 5]);
    }

    #[test]
    fn overflow_is_reported() {
        let mut builder = OffsetsBuilder::new();
        builder.try_push_usize(i32::MAX as usize).unwrap();
        assert!(matches!(
            builder.try_push_usize(1),
            Err(GeoArrowError::Overflow)
        ));
        assert!(matches!(
            OffsetsBuilder::new().try_push_usize(usize::MAX),
            Err(GeoArrowError::Overflow)
        ));
    }
}

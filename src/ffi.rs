//! The Arrow C Data Interface boundary.
//!
//! Every input to and output from this crate can cross process and language
//! boundaries as an `ArrowArray`/`ArrowSchema` pair. This module adapts
//! between those ABI structs and the in-memory [`ArrayRef`]/[`Field`] types
//! the rest of the crate works with, delegating the ABI layout and the
//! release-callback contract (called exactly once, handle reset to its
//! sentinel) to the `arrow` crate's `ffi` module.
//!
//! Imported buffers stay owned by the foreign allocator until the last
//! reference-counted handle drops; exported buffers transfer ownership into
//! the produced pair.

use arrow::array::{make_array, ArrayRef};
use arrow::ffi::{from_ffi, to_ffi, FFI_ArrowArray, FFI_ArrowSchema};
use arrow_schema::Field;

use crate::error::{GeoArrowError, Result};

/// Export a field (including its GeoArrow extension metadata) to an
/// `ArrowSchema`.
pub fn export_field(field: &Field) -> Result<FFI_ArrowSchema> {
    Ok(FFI_ArrowSchema::try_from(field)?)
}

/// Import a field from an `ArrowSchema`, preserving extension metadata.
pub fn import_field(schema: &FFI_ArrowSchema) -> Result<Field> {
    Ok(Field::try_from(schema)?)
}

/// Export an array and its field to an `ArrowArray`/`ArrowSchema` pair.
///
/// The schema is derived from `field` rather than from the array's bare
/// storage type so extension metadata survives the crossing.
pub fn export_array(array: &ArrayRef, field: &Field) -> Result<(FFI_ArrowArray, FFI_ArrowSchema)> {
    let (ffi_array, _storage_schema) = to_ffi(&array.to_data())?;
    Ok((ffi_array, export_field(field)?))
}

/// Import an `ArrowArray`/`ArrowSchema` pair.
///
/// The array's structure is fully validated before use; foreign memory that
/// breaches Arrow's buffer invariants is rejected with a validation error
/// rather than trusted.
pub fn import_array(
    array: FFI_ArrowArray,
    schema: &FFI_ArrowSchema,
) -> Result<(Field, ArrayRef)> {
    let field = import_field(schema)?;
    let data = unsafe { from_ffi(array, schema) }?;
    data.validate_full()
        .map_err(|err| GeoArrowError::Validation(format!("Invalid imported array: {err}")))?;
    Ok((field, make_array(data)))
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use arrow_array::builder::StringBuilder;
    use arrow_array::cast::AsArray;
    use arrow_array::Array;

    use super::*;
    use crate::schema::{GeoArrowType, WktType};

    #[test]
    fn array_round_trip_preserves_extension_metadata() {
        let descriptor = GeoArrowType::Wkt(WktType::new(Default::default()));
        let field = descriptor.to_field("geometry", true);

        let mut builder = StringBuilder::new();
        builder.append_value("POINT (30 10)");
        builder.append_null();
        let array: ArrayRef = Arc::new(builder.finish());

        let (ffi_array, ffi_schema) = export_array(&array, &field).unwrap();
        let (imported_field, imported) = import_array(ffi_array, &ffi_schema).unwrap();

        assert_eq!(imported_field, field);
        assert_eq!(
            GeoArrowType::from_extension_field(&imported_field).unwrap(),
            descriptor
        );
        let strings = imported.as_string::<i32>();
        assert_eq!(strings.value(0), "POINT (30 10)");
        assert!(strings.is_null(1));
    }

    #[test]
    fn imported_arrays_feed_kernels() {
        use crate::kernel::{Kernel, KernelOptions};

        let descriptor = GeoArrowType::Wkt(WktType::new(Default::default()));
        let field = descriptor.to_field("geometry", true);
        let mut builder = StringBuilder::new();
        builder.append_value("LINESTRING (0 1, 2 3)");
        let array: ArrayRef = Arc::new(builder.finish());

        let (ffi_array, ffi_schema) = export_array(&array, &field).unwrap();
        let (field, array) = import_array(ffi_array, &ffi_schema).unwrap();

        let mut kernel = Kernel::start("box", &field, &KernelOptions::new()).unwrap();
        let out = kernel.push_batch(&array).unwrap().unwrap();
        assert_eq!(out.len(), 1);
    }
}

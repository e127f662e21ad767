//! A bounding-box index over the fragments of a columnar dataset.
//!
//! The index holds one row per fragment with the planar bounds of each
//! geometry column, so fragment-level spatial filtering never touches
//! geometry content. Bounds come from fragment statistics when the backing
//! format provides them (and the column is a separated point column);
//! otherwise one `box_agg` kernel per fragment × column scans the data.
//! With the `rayon` feature enabled, the scan fans out across fragments.

mod fragment;

use std::sync::Arc;

use arrow_array::cast::AsArray;
use arrow_array::types::Float64Type;
use arrow_array::{Array, ArrayRef, Float64Array, Int32Array, RecordBatch, StructArray};
use arrow_buffer::NullBufferBuilder;
use arrow_schema::{DataType, Field, Schema, SchemaRef};
#[cfg(feature = "rayon")]
use rayon::prelude::*;

use crate::error::{GeoArrowError, Result};
use crate::kernel::bbox::{box_result_data_type, box_result_fields};
use crate::kernel::{BoundingRect, Kernel, KernelOptions};
use crate::schema::{CoordType, GeoArrowType};

pub use fragment::Fragment;

/// The name of the fragment id column of the index table.
pub const FRAGMENT_INDEX_COLUMN: &str = "_fragment_index";

/// A per-fragment bounding-box index over one or more geometry columns.
///
/// The index is an ordinary Arrow table: an `i32` fragment id column plus
/// one `{xmin, xmax, ymin, ymax}` struct column per geometry column. A null
/// struct value means the bounds of that fragment are unknown, and the
/// fragment is never pruned.
#[derive(Debug, Clone)]
pub struct FragmentIndex {
    columns: Vec<String>,
    table: RecordBatch,
}

impl FragmentIndex {
    /// The geometry columns covered by this index.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// The backing index table.
    pub fn table(&self) -> &RecordBatch {
        &self.table
    }

    /// Wrap an externally stored index table.
    ///
    /// The table must carry a [`FRAGMENT_INDEX_COLUMN`] and one box struct
    /// column per geometry column.
    pub fn try_new(table: RecordBatch) -> Result<Self> {
        let schema = table.schema();
        if schema.column_with_name(FRAGMENT_INDEX_COLUMN).is_none() {
            return Err(GeoArrowError::IllegalArgument(format!(
                "Index table has no {FRAGMENT_INDEX_COLUMN} column"
            )));
        }
        let columns = schema
            .fields()
            .iter()
            .filter(|f| f.name() != FRAGMENT_INDEX_COLUMN)
            .map(|f| f.name().clone())
            .collect();
        Ok(Self { columns, table })
    }

    /// Return the ids of the fragments whose bounds for at least one indexed
    /// column intersect the bounds of `target`, plus every fragment with
    /// unknown bounds.
    ///
    /// `target` is any GeoArrow array; its planar bounding box is computed
    /// with a `box_agg` kernel. The result preserves fragment enumeration
    /// order.
    pub fn filter_fragments(&self, target_field: &Field, target: &ArrayRef) -> Result<Vec<i32>> {
        let mut kernel = Kernel::start("box_agg", target_field, &KernelOptions::new())?;
        kernel.push_batch(target)?;
        let result = kernel.finish()?.unwrap();
        let target_rect = rect_from_row(result.as_struct(), 0).unwrap_or_default();

        let ids = self
            .table
            .column_by_name(FRAGMENT_INDEX_COLUMN)
            .unwrap()
            .as_primitive::<arrow_array::types::Int32Type>()
            .clone();

        let mut out = vec![];
        for row in 0..self.table.num_rows() {
            let mut matches = false;
            for column in &self.columns {
                let boxes = self.table.column_by_name(column).ok_or_else(|| {
                    GeoArrowError::IllegalArgument(format!(
                        "Index table has no column {column}"
                    ))
                })?;
                match rect_from_row(boxes.as_struct(), row) {
                    // Unknown bounds cannot prune.
                    None => matches = true,
                    Some(rect) => matches |= rect.intersects(&target_rect),
                }
                if matches {
                    break;
                }
            }
            if matches {
                out.push(ids.value(row));
            }
        }
        Ok(out)
    }
}

fn rect_from_row(boxes: &StructArray, row: usize) -> Option<BoundingRect> {
    if boxes.is_null(row) {
        return None;
    }
    let value = |name: &str| {
        boxes
            .column_by_name(name)
            .map(|c| c.as_primitive::<Float64Type>().value(row))
            .unwrap_or(f64::NAN)
    };
    Some(BoundingRect::from_bounds(
        value("xmin"),
        value("xmax"),
        value("ymin"),
        value("ymax"),
    ))
}

/// Build a [FragmentIndex] over `geometry_columns` of an ordered fragment
/// list.
///
/// Index row order equals fragment enumeration order. Columns whose
/// fragment advertises statistics (and which use separated point storage)
/// are taken from the statistics without scanning; every other fragment ×
/// column pair runs a `box_agg` kernel over the fragment's batches.
pub fn build_index<F: Fragment>(
    fragments: &[F],
    schema: &SchemaRef,
    geometry_columns: &[&str],
) -> Result<FragmentIndex> {
    let mut descriptors = Vec::with_capacity(geometry_columns.len());
    for column in geometry_columns {
        let field = schema.field_with_name(column).map_err(|_| {
            GeoArrowError::IllegalArgument(format!("Dataset has no column {column}"))
        })?;
        descriptors.push((field.clone(), GeoArrowType::from_extension_field(field)?));
    }

    let scan = |fragment: &F| scan_fragment(fragment, &descriptors, geometry_columns);
    #[cfg(feature = "rayon")]
    let rows: Vec<Vec<BoundingRect>> = fragments.par_iter().map(scan).collect::<Result<_>>()?;
    #[cfg(not(feature = "rayon"))]
    let rows: Vec<Vec<BoundingRect>> = fragments.iter().map(scan).collect::<Result<_>>()?;

    // Assemble the index table.
    let mut fields = vec![Field::new(FRAGMENT_INDEX_COLUMN, DataType::Int32, false)];
    let mut columns: Vec<ArrayRef> = vec![Arc::new(Int32Array::from_iter_values(
        0..fragments.len() as i32,
    ))];
    for (i, column) in geometry_columns.iter().enumerate() {
        fields.push(Field::new(*column, box_result_data_type(), true));
        let mut xmin = Vec::with_capacity(rows.len());
        let mut xmax = Vec::with_capacity(rows.len());
        let mut ymin = Vec::with_capacity(rows.len());
        let mut ymax = Vec::with_capacity(rows.len());
        let mut validity = NullBufferBuilder::new(rows.len());
        for row in &rows {
            let rect = &row[i];
            xmin.push(rect.xmin());
            xmax.push(rect.xmax());
            ymin.push(rect.ymin());
            ymax.push(rect.ymax());
            validity.append_non_null();
        }
        let children: Vec<ArrayRef> = [xmin, xmax, ymin, ymax]
            .into_iter()
            .map(|values| Arc::new(Float64Array::from(values)) as ArrayRef)
            .collect();
        columns.push(Arc::new(StructArray::new(
            box_result_fields(),
            children,
            validity.finish(),
        )));
    }
    let table = RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?;
    FragmentIndex::try_new(table)
}

/// Whether fragment statistics may stand in for a scan of this column.
fn stats_usable(descriptor: &GeoArrowType) -> bool {
    matches!(descriptor, GeoArrowType::Point(t) if t.coord_type() == CoordType::Separated)
}

fn scan_fragment<F: Fragment>(
    fragment: &F,
    descriptors: &[(Field, GeoArrowType)],
    geometry_columns: &[&str],
) -> Result<Vec<BoundingRect>> {
    let mut resolved: Vec<Option<BoundingRect>> = Vec::with_capacity(descriptors.len());
    let mut kernels: Vec<(usize, Kernel)> = vec![];
    for (i, ((field, descriptor), column)) in
        descriptors.iter().zip(geometry_columns).enumerate()
    {
        let stats = if stats_usable(descriptor) {
            fragment.column_statistics(column)
        } else {
            None
        };
        match stats {
            Some(rect) => resolved.push(Some(rect)),
            None => {
                resolved.push(None);
                kernels.push((i, Kernel::start("box_agg", field, &KernelOptions::new())?));
            }
        }
    }

    if !kernels.is_empty() {
        for batch in fragment.batches()? {
            let batch = batch?;
            for (i, kernel) in kernels.iter_mut() {
                let column = batch
                    .column_by_name(geometry_columns[*i])
                    .ok_or_else(|| {
                        GeoArrowError::Validation(format!(
                            "Fragment batch has no column {}",
                            geometry_columns[*i]
                        ))
                    })?;
                kernel.push_batch(column)?;
            }
        }
        for (i, mut kernel) in kernels {
            let result = kernel.finish()?.unwrap();
            resolved[i] = rect_from_row(result.as_struct(), 0);
        }
    }

    Ok(resolved.into_iter().map(|r| r.unwrap_or_default()).collect())
}

#[cfg(test)]
mod test {
    use arrow_array::builder::StringBuilder;

    use super::*;
    use crate::schema::WktType;

    /// An in-memory fragment of WKT batches.
    struct WktFragment {
        schema: SchemaRef,
        batches: Vec<Vec<Option<&'static str>>>,
        stats: Option<BoundingRect>,
        fail_on_read: bool,
    }

    impl Fragment for WktFragment {
        fn batches(&self) -> Result<Box<dyn Iterator<Item = Result<RecordBatch>> + '_>> {
            if self.fail_on_read {
                return Err(GeoArrowError::Validation(
                    "This fragment must not be scanned".to_string(),
                ));
            }
            let schema = self.schema.clone();
            Ok(Box::new(self.batches.iter().map(move |values| {
                let mut builder = StringBuilder::new();
                for value in values {
                    match value {
                        Some(v) => builder.append_value(v),
                        None => builder.append_null(),
                    }
                }
                Ok(RecordBatch::try_new(
                    schema.clone(),
                    vec![Arc::new(builder.finish())],
                )?)
            })))
        }

        fn column_statistics(&self, _column: &str) -> Option<BoundingRect> {
            self.stats
        }
    }

    fn wkt_schema() -> SchemaRef {
        let field =
            GeoArrowType::Wkt(WktType::new(Default::default())).to_field("geometry", true);
        Arc::new(Schema::new(vec![field]))
    }

    fn fragment(schema: &SchemaRef, values: Vec<Option<&'static str>>) -> WktFragment {
        WktFragment {
            schema: schema.clone(),
            batches: vec![values],
            stats: None,
            fail_on_read: false,
        }
    }

    fn polygon_query() -> (Field, ArrayRef) {
        // POLYGON ((0 1, 1 1, 1 2, 0 2, 0 1)) has bbox 0..1 × 1..2.
        let field =
            GeoArrowType::Wkt(WktType::new(Default::default())).to_field("geometry", true);
        let mut builder = StringBuilder::new();
        builder.append_value("POLYGON ((0 1, 1 1, 1 2, 0 2, 0 1))");
        (field, Arc::new(builder.finish()) as ArrayRef)
    }

    #[test]
    fn build_and_filter() {
        let schema = wkt_schema();
        let fragments = vec![
            fragment(&schema, vec![Some("POINT (0.5 1.5)")]),
            fragment(&schema, vec![Some("POINT (2.5 3.5)")]),
        ];
        let index = build_index(&fragments, &schema, &["geometry"]).unwrap();
        assert_eq!(index.table().num_rows(), 2);
        assert_eq!(index.columns(), ["geometry".to_string()]);

        let (field, query) = polygon_query();
        assert_eq!(index.filter_fragments(&field, &query).unwrap(), vec![0]);
    }

    #[test]
    fn index_rows_follow_enumeration_order() {
        let schema = wkt_schema();
        let fragments = vec![
            fragment(&schema, vec![Some("POINT (10 10)")]),
            fragment(&schema, vec![Some("POINT (0.5 1.5)")]),
            fragment(&schema, vec![Some("POINT (0.2 1.2)"), None]),
        ];
        let index = build_index(&fragments, &schema, &["geometry"]).unwrap();
        let ids: Vec<i32> = index
            .table()
            .column_by_name(FRAGMENT_INDEX_COLUMN)
            .unwrap()
            .as_primitive::<arrow_array::types::Int32Type>()
            .values()
            .to_vec();
        assert_eq!(ids, vec![0, 1, 2]);

        let (field, query) = polygon_query();
        assert_eq!(index.filter_fragments(&field, &query).unwrap(), vec![1, 2]);
        // Repeated queries are stable.
        assert_eq!(index.filter_fragments(&field, &query).unwrap(), vec![1, 2]);
    }

    #[test]
    fn stats_skip_scanning_point_fragments() {
        // A separated point column whose fragment refuses to be read: the
        // statistics path must avoid batches() entirely.
        let point_type = GeoArrowType::new(
            crate::schema::GeometryType::Point,
            crate::schema::Dimension::XY,
            CoordType::Separated,
        )
        .unwrap();
        let schema = Arc::new(Schema::new(vec![point_type.to_field("geometry", true)]));
        let mut stats = BoundingRect::new();
        stats.add_coord(0.5, 1.5);
        let fragments = vec![WktFragment {
            schema: schema.clone(),
            batches: vec![],
            stats: Some(stats),
            fail_on_read: true,
        }];
        let index = build_index(&fragments, &schema, &["geometry"]).unwrap();

        let (field, query) = polygon_query();
        assert_eq!(index.filter_fragments(&field, &query).unwrap(), vec![0]);
    }

    #[test]
    fn stats_ignored_for_wkt_columns() {
        // The same statistics on a WKT column are not trusted; the fragment
        // is scanned instead.
        let schema = wkt_schema();
        let mut stats = BoundingRect::new();
        stats.add_coord(0.5, 1.5);
        let fragments = vec![WktFragment {
            schema: schema.clone(),
            batches: vec![vec![Some("POINT (50 50)")]],
            stats: Some(stats),
            fail_on_read: false,
        }];
        let index = build_index(&fragments, &schema, &["geometry"]).unwrap();
        let (field, query) = polygon_query();
        // The scanned bounds (50, 50) do not match the query.
        assert_eq!(index.filter_fragments(&field, &query).unwrap(), Vec::<i32>::new());
    }

    #[test]
    fn null_index_rows_never_prune() {
        // Hand-build a table with a null row for fragment 1.
        let fields = vec![
            Field::new(FRAGMENT_INDEX_COLUMN, DataType::Int32, false),
            Field::new("geometry", box_result_data_type(), true),
        ];
        let ids = Int32Array::from(vec![0, 1]);
        let children: Vec<ArrayRef> = [
            vec![10.0, 0.0],
            vec![11.0, 0.0],
            vec![10.0, 0.0],
            vec![11.0, 0.0],
        ]
        .into_iter()
        .map(|values| Arc::new(Float64Array::from(values)) as ArrayRef)
        .collect();
        let mut validity = NullBufferBuilder::new(2);
        validity.append_non_null();
        validity.append_null();
        let boxes = StructArray::new(box_result_fields(), children, validity.finish());
        let table = RecordBatch::try_new(
            Arc::new(Schema::new(fields)),
            vec![Arc::new(ids), Arc::new(boxes)],
        )
        .unwrap();
        let index = FragmentIndex::try_new(table).unwrap();

        let (field, query) = polygon_query();
        // Fragment 0 is out of range but fragment 1 has unknown bounds.
        assert_eq!(index.filter_fragments(&field, &query).unwrap(), vec![1]);
    }
}

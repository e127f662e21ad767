use arrow_array::RecordBatch;

use crate::error::Result;
use crate::kernel::BoundingRect;

/// A readable partition of a dataset (a file, a row group, …).
///
/// The index builder never performs I/O itself; fragments yield their
/// batches through this trait and may advertise pre-computed column
/// statistics so the builder can skip scanning them entirely.
pub trait Fragment: Send + Sync {
    /// The batches of this fragment, in order.
    fn batches(&self) -> Result<Box<dyn Iterator<Item = Result<RecordBatch>> + '_>>;

    /// Fragment-level bounds for a geometry column, if the backing format
    /// maintains them.
    ///
    /// For separated point columns stored in Parquet, for example, this is
    /// the min/max statistics of the `x` and `y` child columns. Returning
    /// `None` makes the builder fall back to scanning the fragment with a
    /// `box_agg` kernel.
    fn column_statistics(&self, _column: &str) -> Option<BoundingRect> {
        None
    }
}

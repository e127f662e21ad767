//! Reading and writing ISO well-known binary.
//!
//! The reader tolerates both ISO WKB (dimension encoded in the thousands
//! group of the type word) and PostGIS EWKB (dimension flag bits, optional
//! SRID prefix). The writer always produces little-endian ISO WKB; an EWKB
//! SRID is consumed and discarded on read, so callers needing SRID
//! round-trips must carry it in the type-level CRS metadata instead.

pub mod reader;
pub mod writer;

pub use reader::process_wkb;
pub use writer::WkbBuilder;

/// Nesting depth limit shared by the WKB and WKT parsers.
pub(crate) const MAX_NESTING_DEPTH: usize = 32;

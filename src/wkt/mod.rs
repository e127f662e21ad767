//! Reading and writing ISO well-known text.
//!
//! The reader accepts the ISO/SF grammar: a geometry tag, an optional `Z`,
//! `M` or `ZM` dimension modifier, then parenthesized content or the `EMPTY`
//! keyword. Numbers go through `lexical-core`, which implements the
//! correctly-rounded Eisel–Lemire fast path with a big-number fallback.
//!
//! The writer emits shortest-round-trip doubles (also via `lexical-core`),
//! normalizes negative zero to `0`, and renders non-finite ordinates as
//! `nan`, `inf` and `-inf`.

pub mod reader;
pub mod writer;

pub use reader::process_wkt;
pub use writer::{WktBuilder, WktOptions};

use std::num::NonZeroUsize;
use std::sync::Arc;

use arrow_array::builder::GenericStringBuilder;
use arrow_array::{ArrayRef, OffsetSizeTrait};

use crate::error::{GeoArrowError, Result};
use crate::schema::{Dimension, GeometryType};
use crate::visitor::GeomVisitor;

const FORMAT: u128 = lexical_core::format::STANDARD;

/// Options controlling WKT emission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WktOptions {
    /// Clamp emitted doubles to at most this many significant digits.
    /// `None` (and `Some(0)` from the options blob) emit shortest
    /// round-trip output. At most 17 digits are meaningful for a double.
    pub significant_digits: Option<usize>,

    /// Truncate each element to at most this many bytes, keeping a
    /// best-effort valid-UTF-8 prefix. `None` or `Some(0)` disables
    /// truncation.
    pub max_element_size_bytes: Option<usize>,
}

/// A [GeomVisitor] that renders each feature as ISO well-known text into a
/// utf8 array.
///
/// Doubles are emitted in shortest-round-trip form, negative zero is
/// normalized to `0`, NaN renders as `nan` and infinities as `inf`/`-inf`.
#[derive(Debug)]
pub struct WktBuilder<O: OffsetSizeTrait> {
    builder: GenericStringBuilder<O>,
    float_options: lexical_core::WriteFloatOptions,
    max_element_size_bytes: usize,
    buf: String,
    frames: Vec<Frame>,
    null: bool,
}

#[derive(Debug)]
struct Frame {
    geometry_type: GeometryType,
    tagged: bool,
    content_open: bool,
    count: u32,
    /// Point coordinates are buffered so an all-NaN point renders as EMPTY.
    pending_coord: Option<(f64, f64, Option<f64>, Option<f64>)>,
}

impl<O: OffsetSizeTrait> WktBuilder<O> {
    /// Create a builder with default options.
    pub fn new() -> Self {
        Self::with_options(WktOptions::default())
    }

    /// Create a builder with the given emission options.
    pub fn with_options(options: WktOptions) -> Self {
        let float_options = lexical_core::WriteFloatOptions::builder()
            .trim_floats(true)
            .max_significant_digits(
                options
                    .significant_digits
                    .and_then(|digits| NonZeroUsize::new(digits.min(17))),
            )
            .build()
            .unwrap();
        Self {
            builder: GenericStringBuilder::new(),
            float_options,
            max_element_size_bytes: options.max_element_size_bytes.unwrap_or(0),
            buf: String::new(),
            frames: Vec::new(),
            null: false,
        }
    }

    /// Consume into the finished utf8 array.
    pub fn finish(mut self) -> ArrayRef {
        Arc::new(self.builder.finish())
    }

    fn write_float(&mut self, value: f64) {
        if value.is_nan() {
            self.buf.push_str("nan");
        } else if value == f64::INFINITY {
            self.buf.push_str("inf");
        } else if value == f64::NEG_INFINITY {
            self.buf.push_str("-inf");
        } else if value == 0.0 {
            // Covers negative zero.
            self.buf.push('0');
        } else {
            let mut buffer = [0u8; lexical_core::BUFFER_SIZE];
            let bytes =
                lexical_core::write_with_options::<f64, FORMAT>(value, &mut buffer, &self.float_options);
            self.buf.push_str(std::str::from_utf8(bytes).unwrap());
        }
    }

    fn write_ordinates(&mut self, x: f64, y: f64, z: Option<f64>, m: Option<f64>) {
        self.write_float(x);
        self.buf.push(' ');
        self.write_float(y);
        if let Some(z) = z {
            self.buf.push(' ');
            self.write_float(z);
        }
        if let Some(m) = m {
            self.buf.push(' ');
            self.write_float(m);
        }
    }

    /// Open the innermost frame's parenthesized content, writing the child
    /// separator when content is already open.
    fn open_or_separate(&mut self) {
        let Some(frame) = self.frames.last_mut() else {
            return;
        };
        let needs_open = !frame.content_open;
        let needs_separator = !needs_open && frame.count > 0;
        let tagged = frame.tagged;
        frame.content_open = true;
        frame.count += 1;
        if needs_open {
            if tagged {
                self.buf.push(' ');
            }
            self.buf.push('(');
        } else if needs_separator {
            self.buf.push_str(", ");
        }
    }

    fn innermost(&mut self) -> Result<&mut Frame> {
        self.frames.last_mut().ok_or_else(|| {
            GeoArrowError::Validation("WKT writer received content outside a geometry".to_string())
        })
    }
}

impl<O: OffsetSizeTrait> Default for WktBuilder<O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O: OffsetSizeTrait> GeomVisitor for WktBuilder<O> {
    fn feature_begin(&mut self) -> Result<()> {
        self.buf.clear();
        self.frames.clear();
        self.null = false;
        Ok(())
    }

    fn null_feature(&mut self) -> Result<()> {
        self.null = true;
        Ok(())
    }

    fn geometry_begin(&mut self, geometry_type: GeometryType, dim: Dimension) -> Result<()> {
        // Children of multi geometries are untagged; children of collections
        // and top-level geometries carry their tag.
        let tagged = match self.frames.last() {
            None => true,
            Some(parent) => parent.geometry_type == GeometryType::GeometryCollection,
        };
        self.open_or_separate();
        if tagged {
            self.buf.push_str(geometry_type.wkt_tag());
            match dim {
                Dimension::XY => {}
                Dimension::XYZ => self.buf.push_str(" Z"),
                Dimension::XYM => self.buf.push_str(" M"),
                Dimension::XYZM => self.buf.push_str(" ZM"),
            }
        }
        self.frames.push(Frame {
            geometry_type,
            tagged,
            content_open: false,
            count: 0,
            pending_coord: None,
        });
        Ok(())
    }

    fn geometry_end(&mut self) -> Result<()> {
        let frame = self.frames.pop().ok_or_else(|| {
            GeoArrowError::Validation("Unbalanced geometry_end".to_string())
        })?;
        if frame.geometry_type == GeometryType::Point {
            // An absent or all-NaN coordinate renders as an empty point.
            let coord = frame.pending_coord.filter(|(x, y, _, _)| {
                !(x.is_nan() && y.is_nan())
            });
            match coord {
                Some((x, y, z, m)) => {
                    if frame.tagged {
                        self.buf.push(' ');
                    }
                    self.buf.push('(');
                    self.write_ordinates(x, y, z, m);
                    self.buf.push(')');
                }
                None => {
                    if frame.tagged {
                        self.buf.push(' ');
                    }
                    self.buf.push_str("EMPTY");
                }
            }
        } else if frame.content_open {
            self.buf.push(')');
        } else {
            if frame.tagged {
                self.buf.push(' ');
            }
            self.buf.push_str("EMPTY");
        }
        Ok(())
    }

    fn ring_begin(&mut self) -> Result<()> {
        self.open_or_separate();
        self.frames.push(Frame {
            geometry_type: GeometryType::LineString,
            tagged: false,
            content_open: true,
            count: 0,
            pending_coord: None,
        });
        self.buf.push('(');
        Ok(())
    }

    fn ring_end(&mut self) -> Result<()> {
        self.frames.pop().ok_or_else(|| {
            GeoArrowError::Validation("Unbalanced ring_end".to_string())
        })?;
        self.buf.push(')');
        Ok(())
    }

    fn coord(&mut self, x: f64, y: f64, z: Option<f64>, m: Option<f64>) -> Result<()> {
        let frame = self.innermost()?;
        if frame.geometry_type == GeometryType::Point {
            frame.pending_coord = Some((x, y, z, m));
            return Ok(());
        }
        let needs_open = !frame.content_open;
        let needs_separator = !needs_open && frame.count > 0;
        let tagged = frame.tagged;
        frame.content_open = true;
        frame.count += 1;
        if needs_open {
            if tagged {
                self.buf.push(' ');
            }
            self.buf.push('(');
        } else if needs_separator {
            self.buf.push_str(", ");
        }
        self.write_ordinates(x, y, z, m);
        Ok(())
    }

    fn feature_end(&mut self) -> Result<()> {
        if self.null {
            self.builder.append_null();
            return Ok(());
        }
        if self.max_element_size_bytes > 0 && self.buf.len() > self.max_element_size_bytes {
            let mut end = self.max_element_size_bytes;
            while !self.buf.is_char_boundary(end) {
                end -= 1;
            }
            self.builder.append_value(&self.buf[..end]);
        } else {
            self.builder.append_value(&self.buf);
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use arrow_array::cast::AsArray;

    use super::*;
    use crate::wkt::reader::process_wkt;

    fn rewrite_with(input: &str, options: WktOptions) -> String {
        let mut writer = WktBuilder::<i32>::with_options(options);
        writer.feature_begin().unwrap();
        process_wkt(input, &mut writer).unwrap();
        writer.feature_end().unwrap();
        let array = writer.finish();
        array.as_string::<i32>().value(0).to_string()
    }

    fn rewrite(input: &str) -> String {
        rewrite_with(input, WktOptions::default())
    }

    #[test]
    fn canonical_forms() {
        for (input, expected) in [
            ("POINT(30 10)", "POINT (30 10)"),
            ("POINT (30.0 10.50)", "POINT (30 10.5)"),
            ("POINT Z (1 2 3)", "POINT Z (1 2 3)"),
            ("POINT ZM (1 2 3 4)", "POINT ZM (1 2 3 4)"),
            ("LINESTRING (0 1, 2 3)", "LINESTRING (0 1, 2 3)"),
            (
                "POLYGON ((30 10, 40 40, 20 40, 10 20, 30 10))",
                "POLYGON ((30 10, 40 40, 20 40, 10 20, 30 10))",
            ),
            ("MULTIPOINT (0 1, 2 3)", "MULTIPOINT ((0 1), (2 3))"),
            (
                "MULTILINESTRING ((0 1, 2 3), (4 5, 6 7))",
                "MULTILINESTRING ((0 1, 2 3), (4 5, 6 7))",
            ),
            (
                "MULTIPOLYGON (((0 0, 1 0, 0 1, 0 0)))",
                "MULTIPOLYGON (((0 0, 1 0, 0 1, 0 0)))",
            ),
            (
                "GEOMETRYCOLLECTION (POINT (4 6), LINESTRING (4 6, 7 10))",
                "GEOMETRYCOLLECTION (POINT (4 6), LINESTRING (4 6, 7 10))",
            ),
        ] {
            assert_eq!(rewrite(input), expected);
        }
    }

    #[test]
    fn empties() {
        for (input, expected) in [
            ("POINT EMPTY", "POINT EMPTY"),
            ("POINT (nan nan)", "POINT EMPTY"),
            ("LINESTRING EMPTY", "LINESTRING EMPTY"),
            ("POLYGON ZM EMPTY", "POLYGON ZM EMPTY"),
            ("MULTIPOINT EMPTY", "MULTIPOINT EMPTY"),
            ("GEOMETRYCOLLECTION EMPTY", "GEOMETRYCOLLECTION EMPTY"),
            ("MULTIPOINT (1 2, EMPTY)", "MULTIPOINT ((1 2), EMPTY)"),
        ] {
            assert_eq!(rewrite(input), expected);
        }
    }

    #[test]
    fn special_values() {
        assert_eq!(rewrite("POINT (inf -inf)"), "POINT (inf -inf)");
        assert_eq!(rewrite("POINT (-0.0 0)"), "POINT (0 0)");
        assert_eq!(rewrite("LINESTRING (nan 1, 2 3)"), "LINESTRING (nan 1, 2 3)");
    }

    #[test]
    fn shortest_round_trip_by_default() {
        // Trailing fractional zeros are trimmed; short decimals stay exact.
        assert_eq!(rewrite("POINT (0.1 2.5)"), "POINT (0.1 2.5)");
        assert_eq!(rewrite("POINT (30.0 -10.25)"), "POINT (30 -10.25)");
    }

    #[test]
    fn significant_digits_clamp() {
        let options = WktOptions {
            significant_digits: Some(3),
            ..Default::default()
        };
        assert_eq!(
            rewrite_with("POINT (1.23456 7.654321)", options),
            "POINT (1.23 7.65)"
        );
    }

    #[test]
    fn element_truncation() {
        let options = WktOptions {
            max_element_size_bytes: Some(12),
            ..Default::default()
        };
        let out = rewrite_with("LINESTRING (0 1, 2 3, 4 5)", options);
        assert_eq!(out, "LINESTRING (");
        assert_eq!(out.len(), 12);

        // Zero disables truncation.
        let options = WktOptions {
            max_element_size_bytes: Some(0),
            ..Default::default()
        };
        assert_eq!(
            rewrite_with("LINESTRING (0 1, 2 3)", options),
            "LINESTRING (0 1, 2 3)"
        );
    }
}

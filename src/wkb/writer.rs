use std::sync::Arc;

use arrow_array::builder::GenericBinaryBuilder;
use arrow_array::{ArrayRef, OffsetSizeTrait};
use byteorder::{ByteOrder, LittleEndian};

use crate::error::{GeoArrowError, Result};
use crate::schema::{Dimension, GeometryType};
use crate::visitor::GeomVisitor;

/// A [GeomVisitor] that renders each feature as little-endian ISO WKB into a
/// binary array.
///
/// Element counts (child geometries, rings, coordinates) precede their
/// content on the wire but arrive after it in the event stream, so the
/// writer leaves a placeholder for each count and patches it when the
/// corresponding scope closes.
#[derive(Debug)]
pub struct WkbBuilder<O: OffsetSizeTrait> {
    builder: GenericBinaryBuilder<O>,
    buf: Vec<u8>,
    frames: Vec<Frame>,
    null: bool,
}

#[derive(Debug)]
struct Frame {
    geometry_type: GeometryType,
    dim: Dimension,
    /// Offset of the 4-byte count placeholder, if this scope carries one.
    count_pos: Option<usize>,
    count: u32,
    /// Points have no count word; track whether their single coordinate
    /// arrived so an empty point can materialize as NaN ordinates.
    wrote_coord: bool,
    is_ring: bool,
}

impl<O: OffsetSizeTrait> WkbBuilder<O> {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create a builder with room for `capacity` features.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            builder: GenericBinaryBuilder::with_capacity(capacity, 0),
            buf: Vec::new(),
            frames: Vec::new(),
            null: false,
        }
    }

    /// Consume into the finished binary array.
    pub fn finish(mut self) -> ArrayRef {
        Arc::new(self.builder.finish())
    }

    fn write_count_placeholder(&mut self) -> usize {
        let pos = self.buf.len();
        self.buf.extend_from_slice(&[0; 4]);
        pos
    }

    fn write_header(&mut self, geometry_type: GeometryType, dim: Dimension) -> Result<()> {
        self.buf.push(1); // NDR
        let type_word = geometry_type.wkb_code()? + 1000 * dim.iso_group();
        let mut word = [0; 4];
        LittleEndian::write_u32(&mut word, type_word);
        self.buf.extend_from_slice(&word);
        Ok(())
    }

    fn bump_parent(&mut self) {
        if let Some(parent) = self.frames.last_mut() {
            parent.count += 1;
        }
    }

    fn innermost(&mut self) -> Result<&mut Frame> {
        self.frames.last_mut().ok_or_else(|| {
            GeoArrowError::Validation("WKB writer received content outside a geometry".to_string())
        })
    }
}

impl<O: OffsetSizeTrait> Default for WkbBuilder<O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O: OffsetSizeTrait> GeomVisitor for WkbBuilder<O> {
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
        self.bump_parent();
        self.write_header(geometry_type, dim)?;
        let count_pos = match geometry_type {
            GeometryType::Point => None,
            _ => Some(self.write_count_placeholder()),
        };
        self.frames.push(Frame {
            geometry_type,
            dim,
            count_pos,
            count: 0,
            wrote_coord: false,
            is_ring: false,
        });
        Ok(())
    }

    fn geometry_end(&mut self) -> Result<()> {
        let frame = self.frames.pop().ok_or_else(|| {
            GeoArrowError::Validation("Unbalanced geometry_end".to_string())
        })?;
        match frame.count_pos {
            Some(pos) => LittleEndian::write_u32(&mut self.buf[pos..pos + 4], frame.count),
            None => {
                // POINT EMPTY materializes as NaN ordinates.
                if !frame.wrote_coord {
                    for _ in 0..frame.dim.size() {
                        let mut bytes = [0; 8];
                        LittleEndian::write_f64(&mut bytes, f64::NAN);
                        self.buf.extend_from_slice(&bytes);
                    }
                }
            }
        }
        Ok(())
    }

    fn ring_begin(&mut self) -> Result<()> {
        let pos = self.write_count_placeholder();
        let parent = self.innermost()?;
        if !parent.geometry_type.is_polygonal() {
            return Err(GeoArrowError::Validation(format!(
                "Ring inside non-polygonal {:?}",
                parent.geometry_type
            )));
        }
        let dim = parent.dim;
        parent.count += 1;
        self.frames.push(Frame {
            geometry_type: GeometryType::LineString,
            dim,
            count_pos: Some(pos),
            count: 0,
            wrote_coord: false,
            is_ring: true,
        });
        Ok(())
    }

    fn ring_end(&mut self) -> Result<()> {
        let frame = self.frames.pop().ok_or_else(|| {
            GeoArrowError::Validation("Unbalanced ring_end".to_string())
        })?;
        let pos = frame.count_pos.unwrap();
        LittleEndian::write_u32(&mut self.buf[pos..pos + 4], frame.count);
        Ok(())
    }

    fn coord(&mut self, x: f64, y: f64, z: Option<f64>, m: Option<f64>) -> Result<()> {
        let frame = self.innermost()?;
        let dim = frame.dim;
        if frame.geometry_type == GeometryType::Point {
            frame.wrote_coord = true;
        } else if !frame.is_ring && frame.geometry_type != GeometryType::LineString {
            return Err(GeoArrowError::Validation(format!(
                "Coordinate directly inside {:?}",
                frame.geometry_type
            )));
        } else {
            frame.count += 1;
        }
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
        for value in &ordinates[..n] {
            let mut bytes = [0; 8];
            LittleEndian::write_f64(&mut bytes, *value);
            self.buf.extend_from_slice(&bytes);
        }
        Ok(())
    }

    fn feature_end(&mut self) -> Result<()> {
        if self.null {
            self.builder.append_null();
        } else {
            self.builder.append_value(&self.buf);
        }
        Ok(())
    }
}

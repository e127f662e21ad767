use byteorder::{BigEndian, ByteOrder, LittleEndian};

use crate::error::{GeoArrowError, Result};
use crate::schema::{Dimension, GeometryType};
use crate::visitor::GeomVisitor;
use crate::wkb::MAX_NESTING_DEPTH;

/// EWKB flag bit indicating a Z ordinate.
const EWKB_Z: u32 = 0x8000_0000;
/// EWKB flag bit indicating an M ordinate.
const EWKB_M: u32 = 0x4000_0000;
/// EWKB flag bit indicating an embedded SRID.
const EWKB_SRID: u32 = 0x2000_0000;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Endianness {
    Big,
    Little,
}

/// A bounds-checked reader over a WKB payload.
struct WkbCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> WkbCursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(n).filter(|end| *end <= self.buf.len());
        match end {
            Some(end) => {
                let out = &self.buf[self.pos..end];
                self.pos = end;
                Ok(out)
            }
            None => Err(GeoArrowError::Parse(format!(
                "Truncated WKB: needed {n} bytes at offset {}, buffer holds {}",
                self.pos,
                self.buf.len()
            ))),
        }
    }

    fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn read_u32(&mut self, endianness: Endianness) -> Result<u32> {
        let bytes = self.take(4)?;
        Ok(match endianness {
            Endianness::Big => BigEndian::read_u32(bytes),
            Endianness::Little => LittleEndian::read_u32(bytes),
        })
    }

    fn read_f64(&mut self, endianness: Endianness) -> Result<f64> {
        let bytes = self.take(8)?;
        Ok(match endianness {
            Endianness::Big => BigEndian::read_f64(bytes),
            Endianness::Little => LittleEndian::read_f64(bytes),
        })
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }
}

struct Header {
    endianness: Endianness,
    geometry_type: GeometryType,
    dim: Dimension,
}

/// Read one geometry header: byte order, type word, and (EWKB only) an
/// embedded SRID, which is discarded.
fn read_header(cursor: &mut WkbCursor<'_>) -> Result<Header> {
    let endianness = match cursor.read_u8()? {
        0 => Endianness::Big,
        1 => Endianness::Little,
        b => {
            return Err(GeoArrowError::Parse(format!(
                "Invalid WKB byte order marker: {b:#04x}"
            )))
        }
    };
    let type_word = cursor.read_u32(endianness)?;

    let (base, dim) = if type_word & (EWKB_Z | EWKB_M | EWKB_SRID) != 0 {
        // PostGIS EWKB: dimensions in the high flag bits.
        let dim = Dimension::from_flags(type_word & EWKB_Z != 0, type_word & EWKB_M != 0);
        if type_word & EWKB_SRID != 0 {
            cursor.read_u32(endianness)?;
        }
        (type_word & 0xFF, dim)
    } else {
        // ISO WKB: dimensions in the thousands group.
        let dim = match type_word / 1000 {
            0 => Dimension::XY,
            1 => Dimension::XYZ,
            2 => Dimension::XYM,
            3 => Dimension::XYZM,
            group => {
                return Err(GeoArrowError::Parse(format!(
                    "Invalid ISO WKB dimension group: {group}"
                )))
            }
        };
        (type_word % 1000, dim)
    };

    Ok(Header {
        endianness,
        geometry_type: GeometryType::from_wkb_code(base)?,
        dim,
    })
}

/// Parse one WKB geometry and emit its events.
///
/// Only geometry-level events are emitted; callers streaming an array wrap
/// each element in `feature_begin`/`feature_end` themselves. Trailing bytes
/// after the geometry are a parse error.
pub fn process_wkb<V: GeomVisitor>(buf: &[u8], visitor: &mut V) -> Result<()> {
    let mut cursor = WkbCursor::new(buf);
    process_geometry(&mut cursor, visitor, 0)?;
    if cursor.remaining() != 0 {
        return Err(GeoArrowError::Parse(format!(
            "{} trailing bytes after WKB geometry",
            cursor.remaining()
        )));
    }
    Ok(())
}

fn read_coord<V: GeomVisitor>(
    cursor: &mut WkbCursor<'_>,
    header: &Header,
    visitor: &mut V,
) -> Result<()> {
    let x = cursor.read_f64(header.endianness)?;
    let y = cursor.read_f64(header.endianness)?;
    let z = if header.dim.has_z() {
        Some(cursor.read_f64(header.endianness)?)
    } else {
        None
    };
    let m = if header.dim.has_m() {
        Some(cursor.read_f64(header.endianness)?)
    } else {
        None
    };
    visitor.coord(x, y, z, m)
}

fn process_geometry<V: GeomVisitor>(
    cursor: &mut WkbCursor<'_>,
    visitor: &mut V,
    depth: usize,
) -> Result<()> {
    let header = read_header(cursor)?;
    process_geometry_body(cursor, &header, visitor, depth)
}

fn process_geometry_body<V: GeomVisitor>(
    cursor: &mut WkbCursor<'_>,
    header: &Header,
    visitor: &mut V,
    depth: usize,
) -> Result<()> {
    if depth > MAX_NESTING_DEPTH {
        return Err(GeoArrowError::Parse(format!(
            "WKB nesting depth exceeds {MAX_NESTING_DEPTH}"
        )));
    }
    visitor.geometry_begin(header.geometry_type, header.dim)?;
    match header.geometry_type {
        GeometryType::Point => {
            // POINT EMPTY travels as a NaN-valued coordinate; it is passed
            // through as stored and writers decide how to render it.
            read_coord(cursor, header, visitor)?;
        }
        GeometryType::LineString => {
            let n = cursor.read_u32(header.endianness)?;
            for _ in 0..n {
                read_coord(cursor, header, visitor)?;
            }
        }
        GeometryType::Polygon => {
            let rings = cursor.read_u32(header.endianness)?;
            for _ in 0..rings {
                let n = cursor.read_u32(header.endianness)?;
                visitor.ring_begin()?;
                for _ in 0..n {
                    read_coord(cursor, header, visitor)?;
                }
                visitor.ring_end()?;
            }
        }
        GeometryType::MultiPoint
        | GeometryType::MultiLineString
        | GeometryType::MultiPolygon
        | GeometryType::GeometryCollection => {
            let expected_child = match header.geometry_type {
                GeometryType::MultiPoint => Some(GeometryType::Point),
                GeometryType::MultiLineString => Some(GeometryType::LineString),
                GeometryType::MultiPolygon => Some(GeometryType::Polygon),
                _ => None,
            };
            let n = cursor.read_u32(header.endianness)?;
            for _ in 0..n {
                let child = read_header(cursor)?;
                if let Some(expected) = expected_child {
                    if child.geometry_type != expected {
                        return Err(GeoArrowError::Parse(format!(
                            "{:?} may not contain {:?} children",
                            header.geometry_type, child.geometry_type
                        )));
                    }
                }
                process_geometry_body(cursor, &child, visitor, depth + 1)?;
            }
        }
        GeometryType::Geometry | GeometryType::Box => unreachable!("rejected by from_wkb_code"),
    }
    visitor.geometry_end()
}

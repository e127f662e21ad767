use phf::phf_map;

use crate::error::{GeoArrowError, Result};
use crate::schema::{Dimension, GeometryType};
use crate::visitor::GeomVisitor;
use crate::wkb::MAX_NESTING_DEPTH;

static TAGS: phf::Map<&'static str, GeometryType> = phf_map! {
    "POINT" => GeometryType::Point,
    "LINESTRING" => GeometryType::LineString,
    "POLYGON" => GeometryType::Polygon,
    "MULTIPOINT" => GeometryType::MultiPoint,
    "MULTILINESTRING" => GeometryType::MultiLineString,
    "MULTIPOLYGON" => GeometryType::MultiPolygon,
    "GEOMETRYCOLLECTION" => GeometryType::GeometryCollection,
};

/// Parse one WKT geometry and emit its events.
///
/// Only geometry-level events are emitted; callers streaming an array wrap
/// each element in `feature_begin`/`feature_end` themselves. Trailing tokens
/// after the geometry are a parse error.
pub fn process_wkt<V: GeomVisitor>(input: &str, visitor: &mut V) -> Result<()> {
    let mut tokens = Tokens::new(input);
    let geom = parse_geometry(&mut tokens, None, 0)?;
    tokens.expect_eof()?;
    emit(&geom, visitor)
}

#[derive(Debug)]
struct Coord {
    x: f64,
    y: f64,
    z: Option<f64>,
    m: Option<f64>,
}

#[derive(Debug)]
enum Geom {
    Point(Dimension, Option<Coord>),
    LineString(Dimension, Vec<Coord>),
    Polygon(Dimension, Vec<Vec<Coord>>),
    MultiPoint(Dimension, Vec<Geom>),
    MultiLineString(Dimension, Vec<Geom>),
    MultiPolygon(Dimension, Vec<Geom>),
    GeometryCollection(Dimension, Vec<Geom>),
}

struct Tokens<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Tokens<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn skip_whitespace(&mut self) {
        let rest = &self.input[self.pos..];
        let trimmed = rest.trim_start();
        self.pos += rest.len() - trimmed.len();
    }

    fn peek(&mut self) -> Option<char> {
        self.skip_whitespace();
        self.input[self.pos..].chars().next()
    }

    /// Consume a single expected delimiter.
    fn expect(&mut self, delimiter: char) -> Result<()> {
        match self.peek() {
            Some(c) if c == delimiter => {
                self.pos += delimiter.len_utf8();
                Ok(())
            }
            Some(c) => Err(GeoArrowError::Parse(format!(
                "Expected '{delimiter}' at offset {}, found '{c}'",
                self.pos
            ))),
            None => Err(GeoArrowError::Parse(format!(
                "Expected '{delimiter}' at offset {}, found end of input",
                self.pos
            ))),
        }
    }

    /// Consume an alphabetic word, uppercased.
    fn word(&mut self) -> Result<String> {
        self.skip_whitespace();
        let rest = &self.input[self.pos..];
        let end = rest
            .char_indices()
            .find(|(_, c)| !c.is_ascii_alphabetic())
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        if end == 0 {
            return Err(GeoArrowError::Parse(format!(
                "Expected a word at offset {}",
                self.pos
            )));
        }
        self.pos += end;
        Ok(rest[..end].to_ascii_uppercase())
    }

    /// Whether the next token is a word (as opposed to a delimiter/number).
    fn peek_is_word(&mut self) -> bool {
        self.peek().is_some_and(|c| c.is_ascii_alphabetic())
    }

    /// Consume a run of non-delimiter, non-whitespace characters.
    fn atom(&mut self) -> Result<&'a str> {
        self.skip_whitespace();
        let rest = &self.input[self.pos..];
        let end = rest
            .char_indices()
            .find(|(_, c)| c.is_whitespace() || matches!(c, '(' | ')' | ','))
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        if end == 0 {
            return Err(GeoArrowError::Parse(format!(
                "Expected a number at offset {}",
                self.pos
            )));
        }
        self.pos += end;
        Ok(&rest[..end])
    }

    fn expect_eof(&mut self) -> Result<()> {
        match self.peek() {
            None => Ok(()),
            Some(c) => Err(GeoArrowError::Parse(format!(
                "Unexpected trailing '{c}' at offset {}",
                self.pos
            ))),
        }
    }
}

fn parse_number(atom: &str) -> Result<f64> {
    match atom.to_ascii_lowercase().as_str() {
        "nan" => Ok(f64::NAN),
        "inf" | "+inf" | "infinity" | "+infinity" => Ok(f64::INFINITY),
        "-inf" | "-infinity" => Ok(f64::NEG_INFINITY),
        _ => lexical_core::parse(atom.as_bytes()).map_err(|_| {
            GeoArrowError::Parse(format!("Malformed number: {atom:?}"))
        }),
    }
}

/// Parse one coordinate, inferring or checking the feature dimension.
fn parse_coord(tokens: &mut Tokens<'_>, dim: &mut Option<Dimension>) -> Result<Coord> {
    let mut ordinates = [0.0; 4];
    let mut count = 0;
    loop {
        match tokens.peek() {
            Some(')') | Some(',') | None => break,
            _ => {}
        }
        if count == 4 {
            return Err(GeoArrowError::Parse(
                "Coordinate holds more than 4 ordinates".to_string(),
            ));
        }
        ordinates[count] = parse_number(tokens.atom()?)?;
        count += 1;
    }
    let resolved = match *dim {
        Some(d) => {
            if count != d.size() {
                return Err(GeoArrowError::Parse(format!(
                    "Inconsistent dimensionality: expected {} ordinates, found {count}",
                    d.size()
                )));
            }
            d
        }
        None => {
            let inferred = match count {
                2 => Dimension::XY,
                3 => Dimension::XYZ,
                4 => Dimension::XYZM,
                n => {
                    return Err(GeoArrowError::Parse(format!(
                        "A coordinate needs 2 to 4 ordinates, found {n}"
                    )))
                }
            };
            *dim = Some(inferred);
            inferred
        }
    };
    let mut next = 2;
    let z = resolved.has_z().then(|| {
        let v = ordinates[next];
        next += 1;
        v
    });
    let m = resolved.has_m().then(|| ordinates[next]);
    Ok(Coord {
        x: ordinates[0],
        y: ordinates[1],
        z,
        m,
    })
}

fn parse_coord_seq(tokens: &mut Tokens<'_>, dim: &mut Option<Dimension>) -> Result<Vec<Coord>> {
    let mut coords = vec![parse_coord(tokens, dim)?];
    while tokens.peek() == Some(',') {
        tokens.expect(',')?;
        coords.push(parse_coord(tokens, dim)?);
    }
    Ok(coords)
}

fn parse_rings(tokens: &mut Tokens<'_>, dim: &mut Option<Dimension>) -> Result<Vec<Vec<Coord>>> {
    let mut rings = vec![];
    loop {
        tokens.expect('(')?;
        rings.push(parse_coord_seq(tokens, dim)?);
        tokens.expect(')')?;
        if tokens.peek() == Some(',') {
            tokens.expect(',')?;
        } else {
            break;
        }
    }
    Ok(rings)
}

/// Parse the optional `Z`/`M`/`ZM` modifier and the `EMPTY` keyword.
fn parse_modifiers(
    tokens: &mut Tokens<'_>,
    inherited: Option<Dimension>,
) -> Result<(Option<Dimension>, bool)> {
    let mut declared = inherited;
    let mut empty = false;
    while tokens.peek_is_word() {
        let word = tokens.word()?;
        match word.as_str() {
            "Z" | "M" | "ZM" => {
                let modifier = match word.as_str() {
                    "Z" => Dimension::XYZ,
                    "M" => Dimension::XYM,
                    _ => Dimension::XYZM,
                };
                if let Some(existing) = declared {
                    if existing != modifier {
                        return Err(GeoArrowError::Parse(format!(
                            "Dimension modifier {word} conflicts with {existing:?}"
                        )));
                    }
                }
                declared = Some(modifier);
            }
            "EMPTY" => {
                empty = true;
                break;
            }
            other => {
                return Err(GeoArrowError::Parse(format!(
                    "Unexpected token: {other}"
                )))
            }
        }
    }
    Ok((declared, empty))
}

fn parse_geometry(
    tokens: &mut Tokens<'_>,
    inherited: Option<Dimension>,
    depth: usize,
) -> Result<Geom> {
    if depth > MAX_NESTING_DEPTH {
        return Err(GeoArrowError::Parse(format!(
            "WKT nesting depth exceeds {MAX_NESTING_DEPTH}"
        )));
    }
    let tag = tokens.word()?;
    let geometry_type = *TAGS.get(tag.as_str()).ok_or_else(|| {
        GeoArrowError::Parse(format!("Unknown geometry tag: {tag}"))
    })?;
    let (declared, empty) = parse_modifiers(tokens, inherited)?;
    if empty {
        let dim = declared.unwrap_or_default();
        return Ok(match geometry_type {
            GeometryType::Point => Geom::Point(dim, None),
            GeometryType::LineString => Geom::LineString(dim, vec![]),
            GeometryType::Polygon => Geom::Polygon(dim, vec![]),
            GeometryType::MultiPoint => Geom::MultiPoint(dim, vec![]),
            GeometryType::MultiLineString => Geom::MultiLineString(dim, vec![]),
            GeometryType::MultiPolygon => Geom::MultiPolygon(dim, vec![]),
            GeometryType::GeometryCollection => Geom::GeometryCollection(dim, vec![]),
            _ => unreachable!("not in the tag table"),
        });
    }

    let mut dim = declared;
    tokens.expect('(')?;
    let geom = match geometry_type {
        GeometryType::Point => {
            let coord = parse_coord(tokens, &mut dim)?;
            Geom::Point(dim.unwrap(), Some(coord))
        }
        GeometryType::LineString => {
            let coords = parse_coord_seq(tokens, &mut dim)?;
            Geom::LineString(dim.unwrap(), coords)
        }
        GeometryType::Polygon => {
            let rings = parse_rings(tokens, &mut dim)?;
            Geom::Polygon(dim.unwrap(), rings)
        }
        GeometryType::MultiPoint => {
            let mut children = vec![];
            loop {
                // Both `(0 1)` and bare `0 1` child forms are accepted, as is
                // an EMPTY child.
                match tokens.peek() {
                    Some('(') => {
                        tokens.expect('(')?;
                        children.push(Geom::Point(
                            Dimension::XY,
                            Some(parse_coord(tokens, &mut dim)?),
                        ));
                        tokens.expect(')')?;
                    }
                    Some(c) if c.is_ascii_alphabetic() => {
                        let word = tokens.word()?;
                        if word != "EMPTY" {
                            return Err(GeoArrowError::Parse(format!(
                                "Unexpected token: {word}"
                            )));
                        }
                        children.push(Geom::Point(Dimension::XY, None));
                    }
                    _ => children.push(Geom::Point(
                        Dimension::XY,
                        Some(parse_coord(tokens, &mut dim)?),
                    )),
                }
                if tokens.peek() == Some(',') {
                    tokens.expect(',')?;
                } else {
                    break;
                }
            }
            let dim = dim.unwrap_or_default();
            let children = children
                .into_iter()
                .map(|child| match child {
                    Geom::Point(_, coord) => Geom::Point(dim, coord),
                    _ => unreachable!(),
                })
                .collect();
            Geom::MultiPoint(dim, children)
        }
        GeometryType::MultiLineString => {
            let mut children = vec![];
            loop {
                tokens.expect('(')?;
                children.push(parse_coord_seq(tokens, &mut dim)?);
                tokens.expect(')')?;
                if tokens.peek() == Some(',') {
                    tokens.expect(',')?;
                } else {
                    break;
                }
            }
            let dim = dim.unwrap_or_default();
            Geom::MultiLineString(
                dim,
                children
                    .into_iter()
                    .map(|coords| Geom::LineString(dim, coords))
                    .collect(),
            )
        }
        GeometryType::MultiPolygon => {
            let mut children = vec![];
            loop {
                tokens.expect('(')?;
                children.push(parse_rings(tokens, &mut dim)?);
                tokens.expect(')')?;
                if tokens.peek() == Some(',') {
                    tokens.expect(',')?;
                } else {
                    break;
                }
            }
            let dim = dim.unwrap_or_default();
            Geom::MultiPolygon(
                dim,
                children
                    .into_iter()
                    .map(|rings| Geom::Polygon(dim, rings))
                    .collect(),
            )
        }
        GeometryType::GeometryCollection => {
            let mut children = vec![parse_geometry(tokens, declared, depth + 1)?];
            while tokens.peek() == Some(',') {
                tokens.expect(',')?;
                children.push(parse_geometry(tokens, declared, depth + 1)?);
            }
            let dim = declared
                .or_else(|| children.first().map(geom_dim))
                .unwrap_or_default();
            Geom::GeometryCollection(dim, children)
        }
        _ => unreachable!("not in the tag table"),
    };
    tokens.expect(')')?;
    Ok(geom)
}

fn geom_dim(geom: &Geom) -> Dimension {
    match geom {
        Geom::Point(dim, _)
        | Geom::LineString(dim, _)
        | Geom::Polygon(dim, _)
        | Geom::MultiPoint(dim, _)
        | Geom::MultiLineString(dim, _)
        | Geom::MultiPolygon(dim, _)
        | Geom::GeometryCollection(dim, _) => *dim,
    }
}

fn emit<V: GeomVisitor>(geom: &Geom, visitor: &mut V) -> Result<()> {
    match geom {
        Geom::Point(dim, coord) => {
            visitor.geometry_begin(GeometryType::Point, *dim)?;
            if let Some(c) = coord {
                visitor.coord(c.x, c.y, c.z, c.m)?;
            }
            visitor.geometry_end()
        }
        Geom::LineString(dim, coords) => {
            visitor.geometry_begin(GeometryType::LineString, *dim)?;
            for c in coords {
                visitor.coord(c.x, c.y, c.z, c.m)?;
            }
            visitor.geometry_end()
        }
        Geom::Polygon(dim, rings) => {
            visitor.geometry_begin(GeometryType::Polygon, *dim)?;
            for ring in rings {
                visitor.ring_begin()?;
                for c in ring {
                    visitor.coord(c.x, c.y, c.z, c.m)?;
                }
                visitor.ring_end()?;
            }
            visitor.geometry_end()
        }
        Geom::MultiPoint(dim, children) => {
            visitor.geometry_begin(GeometryType::MultiPoint, *dim)?;
            for child in children {
                emit(child, visitor)?;
            }
            visitor.geometry_end()
        }
        Geom::MultiLineString(dim, children) => {
            visitor.geometry_begin(GeometryType::MultiLineString, *dim)?;
            for child in children {
                emit(child, visitor)?;
            }
            visitor.geometry_end()
        }
        Geom::MultiPolygon(dim, children) => {
            visitor.geometry_begin(GeometryType::MultiPolygon, *dim)?;
            for child in children {
                emit(child, visitor)?;
            }
            visitor.geometry_end()
        }
        Geom::GeometryCollection(dim, children) => {
            visitor.geometry_begin(GeometryType::GeometryCollection, *dim)?;
            for child in children {
                emit(child, visitor)?;
            }
            visitor.geometry_end()
        }
    }
}

use arrow_array::ArrayRef;

use crate::builder::{
    LineStringBuilder, MultiLineStringBuilder, MultiPointBuilder, MultiPolygonBuilder,
    PointBuilder, PolygonBuilder,
};
use crate::error::{GeoArrowError, Result};
use crate::schema::{Dimension, GeoArrowType, GeometryType};
use crate::visitor::GeomVisitor;

/// A builder for any native GeoArrow layout, dispatching on the target
/// descriptor.
#[derive(Debug)]
pub enum NativeBuilder {
    /// Building a Point array.
    Point(PointBuilder),
    /// Building a LineString array.
    LineString(LineStringBuilder),
    /// Building a Polygon array.
    Polygon(PolygonBuilder),
    /// Building a MultiPoint array.
    MultiPoint(MultiPointBuilder),
    /// Building a MultiLineString array.
    MultiLineString(MultiLineStringBuilder),
    /// Building a MultiPolygon array.
    MultiPolygon(MultiPolygonBuilder),
}

impl NativeBuilder {
    /// Create a builder for the given target descriptor.
    ///
    /// Errors for box and serialized descriptors, which have dedicated
    /// writers.
    pub fn new(data_type: &GeoArrowType) -> Result<Self> {
        let out = match data_type {
            GeoArrowType::Point(t) => Self::Point(PointBuilder::new(t.clone())),
            GeoArrowType::LineString(t) => Self::LineString(LineStringBuilder::new(t.clone())),
            GeoArrowType::Polygon(t) => Self::Polygon(PolygonBuilder::new(t.clone())),
            GeoArrowType::MultiPoint(t) => Self::MultiPoint(MultiPointBuilder::new(t.clone())),
            GeoArrowType::MultiLineString(t) => {
                Self::MultiLineString(MultiLineStringBuilder::new(t.clone()))
            }
            GeoArrowType::MultiPolygon(t) => {
                Self::MultiPolygon(MultiPolygonBuilder::new(t.clone()))
            }
            other => {
                return Err(GeoArrowError::IllegalArgument(format!(
                    "No native geometry builder for {}",
                    other.extension_name()
                )))
            }
        };
        Ok(out)
    }

    /// The number of features pushed so far.
    pub fn len(&self) -> usize {
        match self {
            Self::Point(b) => b.len(),
            Self::LineString(b) => b.len(),
            Self::Polygon(b) => b.len(),
            Self::MultiPoint(b) => b.len(),
            Self::MultiLineString(b) => b.len(),
            Self::MultiPolygon(b) => b.len(),
        }
    }

    /// Whether no feature has been pushed yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Consume into the finished storage array.
    pub fn finish(self) -> Result<ArrayRef> {
        match self {
            Self::Point(b) => b.finish(),
            Self::LineString(b) => b.finish(),
            Self::Polygon(b) => b.finish(),
            Self::MultiPoint(b) => b.finish(),
            Self::MultiLineString(b) => b.finish(),
            Self::MultiPolygon(b) => b.finish(),
        }
    }
}

macro_rules! delegate {
    ($self:ident, $method:ident $(, $arg:expr)*) => {
        match $self {
            NativeBuilder::Point(b) => b.$method($($arg),*),
            NativeBuilder::LineString(b) => b.$method($($arg),*),
            NativeBuilder::Polygon(b) => b.$method($($arg),*),
            NativeBuilder::MultiPoint(b) => b.$method($($arg),*),
            NativeBuilder::MultiLineString(b) => b.$method($($arg),*),
            NativeBuilder::MultiPolygon(b) => b.$method($($arg),*),
        }
    };
}

impl GeomVisitor for NativeBuilder {
    fn feature_begin(&mut self) -> Result<()> {
        delegate!(self, feature_begin)
    }

    fn null_feature(&mut self) -> Result<()> {
        delegate!(self, null_feature)
    }

    fn geometry_begin(&mut self, geometry_type: GeometryType, dim: Dimension) -> Result<()> {
        delegate!(self, geometry_begin, geometry_type, dim)
    }

    fn geometry_end(&mut self) -> Result<()> {
        delegate!(self, geometry_end)
    }

    fn ring_begin(&mut self) -> Result<()> {
        delegate!(self, ring_begin)
    }

    fn ring_end(&mut self) -> Result<()> {
        delegate!(self, ring_end)
    }

    fn coord(&mut self, x: f64, y: f64, z: Option<f64>, m: Option<f64>) -> Result<()> {
        delegate!(self, coord, x, y, z, m)
    }

    fn coords(
        &mut self,
        dim: Dimension,
        xs: &[f64],
        ys: &[f64],
        zs: Option<&[f64]>,
        ms: Option<&[f64]>,
    ) -> Result<()> {
        delegate!(self, coords, dim, xs, ys, zs, ms)
    }

    fn feature_end(&mut self) -> Result<()> {
        delegate!(self, feature_end)
    }
}

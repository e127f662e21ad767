//! The geometry event protocol connecting readers and writers.
//!
//! Every codec in this crate interacts with geometry content through
//! [`GeomVisitor`]: readers (WKB, WKT, native array walkers) translate their
//! encoding into a stream of events, and writers (WKB, WKT, native builders)
//! translate events back into their encoding. Every conversion is therefore a
//! composition of one reader and one writer, and neither side knows about the
//! other's encoding.
//!
//! # Event grammar
//!
//! For each feature of an array:
//!
//! ```text
//! feature_begin
//!   ( null_feature | geometry )
//! feature_end
//!
//! geometry      := geometry_begin(type, dim) content geometry_end
//! content       := coords*                      for points and linestrings
//!                | ring*                        for polygons
//!                | geometry*                    for multi types and collections
//! ring          := ring_begin coords* ring_end
//! ```
//!
//! Invariants upheld by every reader in this crate:
//!
//! - `geometry_begin`/`geometry_end` and `ring_begin`/`ring_end` are
//!   balanced.
//! - `ring_begin` is only emitted inside polygonal geometries.
//! - [`coord`][GeomVisitor::coord] (or the batched
//!   [`coords`][GeomVisitor::coords]) passes exactly the ordinates declared
//!   by the enclosing geometry's dimension.
//!
//! Writers targeting a wider dimension than the incoming events fill absent
//! ordinates with NaN; writers targeting a narrower dimension drop the extra
//! ordinates.

use crate::error::Result;
use crate::schema::{Dimension, GeometryType};

/// Geometry event consumer.
///
/// All methods default to doing nothing so that single-purpose visitors (for
/// example a coordinate counter) only implement what they observe.
#[allow(unused_variables)]
pub trait GeomVisitor {
    /// Begin of one feature (array element).
    fn feature_begin(&mut self) -> Result<()> {
        Ok(())
    }

    /// The current feature is null. No geometry events follow before
    /// `feature_end`.
    fn null_feature(&mut self) -> Result<()> {
        Ok(())
    }

    /// Begin of a geometry with the given type and dimension.
    ///
    /// Nested for the children of multi geometries and geometry collections.
    fn geometry_begin(&mut self, geometry_type: GeometryType, dim: Dimension) -> Result<()> {
        Ok(())
    }

    /// End of the innermost open geometry.
    fn geometry_end(&mut self) -> Result<()> {
        Ok(())
    }

    /// Begin of a polygon ring. The first ring of a polygon is its exterior.
    fn ring_begin(&mut self) -> Result<()> {
        Ok(())
    }

    /// End of the current ring.
    fn ring_end(&mut self) -> Result<()> {
        Ok(())
    }

    /// Process one coordinate.
    ///
    /// `z` and `m` are present exactly when the enclosing geometry's
    /// dimension declares them.
    fn coord(&mut self, x: f64, y: f64, z: Option<f64>, m: Option<f64>) -> Result<()> {
        Ok(())
    }

    /// Process a batch of coordinates stored in columnar slices.
    ///
    /// `zs`/`ms` are `Some` exactly when `dim` declares them, and all
    /// provided slices have equal length. The default implementation forwards
    /// to [`coord`][Self::coord] once per position; columnar writers may
    /// override it to consume the slices wholesale.
    fn coords(
        &mut self,
        dim: Dimension,
        xs: &[f64],
        ys: &[f64],
        zs: Option<&[f64]>,
        ms: Option<&[f64]>,
    ) -> Result<()> {
        debug_assert_eq!(dim.has_z(), zs.is_some());
        debug_assert_eq!(dim.has_m(), ms.is_some());
        for i in 0..xs.len() {
            self.coord(xs[i], ys[i], zs.map(|z| z[i]), ms.map(|m| m[i]))?;
        }
        Ok(())
    }

    /// End of one feature.
    fn feature_end(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[derive(Default)]
    struct CoordCounter {
        coords: usize,
        features: usize,
    }

    impl GeomVisitor for CoordCounter {
        fn feature_begin(&mut self) -> Result<()> {
            self.features += 1;
            Ok(())
        }

        fn coord(&mut self, _x: f64, _y: f64, _z: Option<f64>, _m: Option<f64>) -> Result<()> {
            self.coords += 1;
            Ok(())
        }
    }

    #[test]
    fn batched_coords_default_to_scalar() {
        let mut counter = CoordCounter::default();
        counter.feature_begin().unwrap();
        counter
            .coords(
                Dimension::XYZ,
                &[0.0, 1.0],
                &[2.0, 3.0],
                Some(&[4.0, 5.0]),
                None,
            )
            .unwrap();
        counter.feature_end().unwrap();
        assert_eq!(counter.features, 1);
        assert_eq!(counter.coords, 2);
    }
}

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{GeoArrowError, Result};
use crate::schema::crs::Crs;
use crate::schema::edges::Edges;

/// A GeoArrow metadata object following the extension metadata [defined by the GeoArrow
/// specification](https://geoarrow.org/extension-types).
///
/// This is serialized to JSON when an array is exported to an Arrow field and
/// deserialized when imported from one. Serialization of the known keys is
/// deterministic: `crs`, then `crs_type`, then `edges`, then any unrecognized
/// keys in their original order, so equal metadata objects produce
/// byte-identical JSON.
#[derive(Default, Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Metadata {
    // Raise the underlying crs fields to this level.
    // https://serde.rs/attr-flatten.html
    #[serde(flatten)]
    crs: Crs,

    /// If present, instructs consumers that edges follow the named path
    /// rather than a planar one. If this value is omitted, edges will be
    /// interpreted as planar.
    #[serde(skip_serializing_if = "Option::is_none")]
    edges: Option<Edges>,

    /// Keys this crate does not recognize, preserved across round-trips.
    #[serde(flatten)]
    extra: IndexMap<String, Value>,
}

// `IndexMap` does not implement `Hash`, and its `PartialEq` is order-independent,
// so `extra` is hashed as an order-independent combination of its entries to stay
// consistent with equality.
impl std::hash::Hash for Metadata {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        use std::hash::Hasher;
        self.crs.hash(state);
        self.edges.hash(state);
        let mut combined: u64 = 0;
        for (k, v) in &self.extra {
            let mut entry_hasher = std::collections::hash_map::DefaultHasher::new();
            k.hash(&mut entry_hasher);
            v.hash(&mut entry_hasher);
            combined ^= entry_hasher.finish();
        }
        combined.hash(state);
    }
}

impl Metadata {
    /// Creates a new [`Metadata`] object.
    pub fn new(crs: Crs, edges: Option<Edges>) -> Self {
        Self {
            crs,
            edges,
            extra: Default::default(),
        }
    }

    /// Access the CRS information.
    pub fn crs(&self) -> &Crs {
        &self.crs
    }

    /// Access the declared edge interpretation, if any.
    pub fn edges(&self) -> Option<Edges> {
        self.edges
    }

    /// Whether edges are interpreted as planar.
    ///
    /// Absence of an `edges` key and an explicit `"planar"` value are
    /// equivalent.
    pub fn is_planar(&self) -> bool {
        self.edges.map_or(true, |e| e == Edges::Planar)
    }

    /// Returns true if the metadata should be serialized.
    fn should_serialize(&self) -> bool {
        self.crs.should_serialize() || self.edges.is_some() || !self.extra.is_empty()
    }

    pub(crate) fn serialize(&self) -> Option<String> {
        if self.should_serialize() {
            Some(serde_json::to_string(&self).unwrap())
        } else {
            None
        }
    }

    pub(crate) fn deserialize(metadata: Option<&str>) -> Result<Self> {
        if let Some(ext_meta) = metadata.filter(|s| !s.is_empty()) {
            serde_json::from_str(ext_meta).map_err(|err| {
                GeoArrowError::IllegalArgument(format!("Invalid GeoArrow metadata: {err}"))
            })
        } else {
            Ok(Default::default())
        }
    }
}

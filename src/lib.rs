#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![warn(missing_docs)]
#![doc(
    html_logo_url = "https://github.com/geoarrow.png",
    html_favicon_url = "https://github.com/geoarrow.png?size=32"
)]

pub mod array;
pub mod builder;
pub mod error;
pub mod ffi;
pub mod index;
pub mod kernel;
pub mod schema;
pub mod visitor;
pub mod wkb;
pub mod wkt;

pub use error::{GeoArrowError, Result};

//! Turns an OpenStreetMap XML extract into renderer-agnostic scene primitives:
//! polylines for roads and extruded outlines for buildings, plus wind and
//! point-of-interest overlays.

pub mod config;
pub mod data;
pub mod digest;
pub mod errors;
pub mod etl;
pub mod overlay;

pub use config::{NodePolicy, SceneConfig, DEFAULT_NODE_POLICY};
pub use data::geo::{GeoBounds, OutputRange, ProjectedPoint};
pub use data::semantic::{AreaFeature, Diagnostic, Extraction, Interest, LineFeature, Primitive};
pub use errors::{Error, Result};
pub use etl::scene::extract;

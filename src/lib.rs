//! Effective-model construction and artifact version resolution for Maven-style builds.
//!
//! The crate has two halves:
//!  * [`model`] merges a project model with its parent chain, active profiles and management
//!    sections into one effective model. This is pure, synchronous computation.
//!  * [`maven`] pins concrete artifact versions (`LATEST`, `RELEASE`, `-SNAPSHOT`, version
//!    ranges) against repository metadata fetched through a [`maven::transport::Transport`].

pub mod config;
pub mod error;
pub mod maven;
pub mod model;
pub mod version;

pub use model::builder::{build_effective_model, ModelBuildingResult};
pub use maven::model_resolver::{ModelRequest, ModelResolver, ResolvedModel};
pub use maven::transform::{resolve_version, VersionResolver};

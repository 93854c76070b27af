//! The repository side: coordinates and layout, repository metadata and its resolution, and
//!  the version transformations built on top of it.

pub mod artifact;
pub mod checksum;
pub mod coordinates;
pub mod metadata;
pub mod metadata_manager;
pub mod metadata_xml;
pub mod model_resolver;
pub mod paths;
pub mod repository;
pub mod session;
pub mod transform;
pub mod transport;

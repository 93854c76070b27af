//! Maven version ordering and version range syntax.

pub mod comparable;
pub mod range;

pub use comparable::ComparableVersion;
pub use range::{Restriction, VersionRange};

//! Domain types shared across the workspace.

mod artifact;
pub mod doc;

pub use artifact::ModelArtifact;
pub use doc::Document;

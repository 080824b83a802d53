//! paxreg-unify library - passenger registry entity resolution
//!
//! Builds the Person registry from the upstream source tables:
//! consolidation by identity key, then a union-find merge of duplicate
//! clusters over the persisted rows.

pub mod cluster;
pub mod consolidate;
pub mod export;
pub mod identity;
pub mod pipeline;
pub mod profile;
pub mod sources;

pub use cluster::{ClusterMerger, MergeReport};
pub use consolidate::{ConsolidationContext, ConsolidationReport, Consolidator};
pub use identity::{Fallback, IdentityIndex, IdentityKey};
pub use pipeline::{run, RunOptions, RunReport};
pub use profile::PersonProfile;

//! # Passenger Registry Common Library
//!
//! Shared code for the passenger registry tools:
//! - Error taxonomy
//! - Configuration loading and store path resolution
//! - Person field catalogue (scalar and set-valued columns)
//! - Identity field normalization
//! - Registry store access (schema, row model, transactions)

pub mod config;
pub mod db;
pub mod error;
pub mod fields;
pub mod normalize;

pub use error::{Error, Result};
pub use fields::{ScalarField, SetField, SourceKind};

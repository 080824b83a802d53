//! Registry store access

pub mod init;
pub mod models;
pub mod persons;
pub mod store;

pub use init::*;
pub use models::*;
pub use persons::*;
pub use store::*;

//! Core types, fixed business tables, normalization and numbering.
//!
//! Everything here is free of I/O and shared by the resolver, the RPS
//! builder and the submission pipeline.

mod config;
mod error;
mod normalize;
mod numbering;
pub mod tables;
mod types;

pub use config::*;
pub use error::*;
pub use normalize::*;
pub use numbering::*;
pub use types::*;

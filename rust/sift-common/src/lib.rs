//! Core definitions (error types and validation helpers), relied upon by all sift-* crates.

pub mod error;
pub mod result;

pub use result::Result;

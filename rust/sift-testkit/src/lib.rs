//! Shared helpers for the sift test suites.

pub mod data_gen;

//! Client code for waystation.
//!
//! This crate provides the HTTP transport the worker uses to reach the
//! application origin.

pub mod fetch;

pub use fetch::{FetchConfig, HttpNetwork};

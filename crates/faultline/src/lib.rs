//! Faultline - dependency graph and cascading-failure analysis.
//!
//! This crate provides both a CLI application and a library for modelling
//! service dependencies, estimating the blast radius of failures and
//! suggesting structural improvements.

#![forbid(unsafe_code)]

// Public modules for library usage
pub mod cascade;
pub mod config;
pub mod domain;
pub mod error;
pub mod graph;
pub mod health;
pub mod impact;
pub mod optimization;
pub mod tracker;

// Public CLI module (needed by binary)
pub mod cli;

// Internal modules (not exposed as public API)
pub(crate) mod output;

pub use error::{Error, Result};
pub use tracker::DependencyTracker;

//! Terragrunt multi-module loader.
//!
//! Discovers the modules under a root directory with one aggregate
//! `terragrunt-info` run, produces plan or state JSON for each module, and
//! assembles the results into an ordered project list. Generated plan files
//! and CLI config files are removed on every exit path.
pub mod cleanup;
pub mod cli;
pub mod cmd;
pub mod config;
pub mod discover;
pub mod error;
pub mod generate;
pub mod metadata;
pub mod parser;
pub mod progress;
pub mod project;
pub mod provider;
pub mod records;
pub mod usage;
pub mod version;

#[cfg(test)]
mod test_support;

pub use error::{Error, Partial, Result};
pub use provider::TerragruntProvider;

//! Pipeplan (Pipeline Planner) - a command-line recruiting funnel planning tool
//!
//! This library provides the core functionality for Pipeplan, including:
//! - Database operations and migrations
//! - Data models for pipelines, funnel stages, and computed plans
//! - Repository layer for data access
//! - Reverse pipeline calculation (back-solving candidate counts from a hiring target)
//! - Forward stage requirements with a safety buffer
//! - CLI command parsing and execution
//! - Date expression utilities
//!
//! # Example
//!
//! ```no_run
//! use pipeplan::cli::run;
//!
//! fn main() {
//!     if let Err(e) = run() {
//!         eprintln!("Error: {}", e);
//!         std::process::exit(1);
//!     }
//! }
//! ```

pub mod db;
pub mod models;
pub mod repo;
pub mod plan;
pub mod cli;
pub mod utils;

//! BAO Flow - deal tracking and status workflow for a packaging trade operation
//!
//! This library provides the core functionality for BAO Flow, including:
//! - The M01-M25 stage registry and legacy stage resolution
//! - Database operations and migrations
//! - Repository layer for deals, clients, history, profiles and rates
//! - The status changer and transition applier
//! - SVG chart primitives and the HTML dashboard
//! - Exchange-rate lookup and transition email
//!
//! # Example
//!
//! ```no_run
//! use baoflow::cli::run;
//!
//! fn main() {
//!     if let Err(e) = run() {
//!         eprintln!("Error: {}", e);
//!         std::process::exit(1);
//!     }
//! }
//! ```

pub mod charts;
pub mod cli;
pub mod config;
pub mod db;
pub mod models;
pub mod repo;
pub mod services;
pub mod utils;
pub mod workflow;

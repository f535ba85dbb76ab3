//! Input/Output operations for Davidson runs
//!
//! This module handles logging setup and the results file.

mod output;

pub use output::{setup_output, write_results};

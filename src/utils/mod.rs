//! Utility modules for common functionality
//!
//! - `logging`: tracing subscriber setup
//! - `table`: plain-text table output for the command line

pub mod logging;
pub mod table;

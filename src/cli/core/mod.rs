//! Setup and reporting commands
//!
//! `init` prepares the configured store and checks the identity; `report`
//! prints the analytics procedures' results.

pub mod init;
pub mod report;

//! OPUM administration backend: roster uploads, password reset links and
//! utilization exports.

pub mod config;
pub mod error;
pub mod report;
pub mod reset;
pub mod telemetry;
pub mod upload;

//! Resale certificate document generation.
//!
//! Intake data collected by the resale-certificate wizard is projected onto the named
//! fields of a fillable PDF template and written into a copy of that template.

pub mod certificate;
pub mod config;
pub mod error;
pub mod telemetry;

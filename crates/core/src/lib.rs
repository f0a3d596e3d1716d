//! Core library: charset probing, directory scanning, CSV loading, upload
//! and report aggregation.

pub mod categories;
pub mod config;
pub mod csv_loader;
pub mod filters;
pub mod models;
pub mod prober;
pub mod report;
pub mod scanner;
pub mod upload;

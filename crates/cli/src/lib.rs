//! Public library modules for the CLI crate
pub mod detect;
pub mod ingest;
pub mod paths;

pub mod auth;
pub mod backfill;
pub mod config;
pub mod geo;
pub mod ingest;
pub mod log;
pub mod report;
pub mod seed;
pub mod site_resolver;
pub mod tracker;

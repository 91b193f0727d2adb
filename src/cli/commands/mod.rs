pub mod backfill;
pub mod config;
pub mod db;
pub mod init;
pub mod log;
pub mod record;
pub mod report;
pub mod resolve;
pub mod seed;
pub mod serve;
pub mod track;

use crate::errors::AppResult;

/// Multi-threaded runtime for the async commands; the rest of the CLI is sync.
pub(crate) fn runtime() -> AppResult<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?)
}

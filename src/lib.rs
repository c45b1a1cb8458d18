pub mod calculator;
pub mod config;
pub mod db;
pub mod errors;
pub mod extraction;
pub mod feed;
pub mod models;
pub mod portfolio;
pub mod redaction;
pub mod session;

pub use crate::calculator::compute;
pub use crate::config::{ConnectionTarget, DatabaseLocation, StoreSettings};
pub use crate::db::RoiStore;
pub use crate::errors::{AppError, AppResult};
pub use crate::extraction::{extract, FieldSpec, FIELD_CATALOG};
pub use crate::feed::{load_use_cases, unwrap_feed, RawUseCase, StaticFeed, UseCaseFeed};
pub use crate::models::{
    CostCell, ExtractedUseCase, Payback, PortfolioSummary, PortfolioTotals, ReferenceFields, RoiCell, RoiFields,
    RoiInputRecord, RoiResult, SortDirection, SortKey, SortOptions, SummaryRow,
};
pub use crate::portfolio::{aggregate, merge_inputs, summarize};
pub use crate::session::{RoiSession, WorkingSet};

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;

static LOG_GUARD: std::sync::OnceLock<WorkerGuard> = std::sync::OnceLock::new();

/// Installs JSON logging into a daily rolling file under `log_dir`.
/// `RUST_LOG` overrides the default `info` filter.
pub fn init_tracing(log_dir: &Path) -> Result<(), String> {
    std::fs::create_dir_all(log_dir).map_err(|error| error.to_string())?;
    let file_appender = tracing_appender::rolling::daily(log_dir, "roi.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let _ = LOG_GUARD.set(guard);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .json()
        .with_writer(non_blocking)
        .try_init()
        .map_err(|error| error.to_string())
}

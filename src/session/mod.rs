//! Per-upload session state and the processed-workbook export.

mod aggregator;
mod export;
mod store;

pub use aggregator::ResultAggregator;
#[cfg(feature = "xlsx")]
pub use export::export_session;
pub use export::{export_file_name, export_workbook};
pub use store::{Session, SessionId, SessionStore};

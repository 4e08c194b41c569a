//! # Analytics Core
//!
//! Report assembly, caching, and export spooling. Control flow for a report
//! request: resolve the period token, consult the report cache, on miss fan
//! out the aggregate query batch, normalize the numbers, fold into a nested
//! document, and write it back with a topic-specific TTL.

pub mod assembler;
pub mod cache_key;
pub mod export;
pub mod numeric;
pub mod period;
pub mod report_cache;

pub use assembler::ReportAssembler;
pub use export::{ExportData, ExportFormat, ExportOptions, ExportRecord, ExportSpooler, ExportType};
pub use period::{Grouping, Period, ResolvedPeriod};
pub use report_cache::{ReportCache, ReportTopic};

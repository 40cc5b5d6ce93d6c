//! Utilization reporting.

pub mod router;
pub mod utilization;

pub use router::{report_router, REPORT_FILENAME};
pub use utilization::{
    format_percentage, percentage, PeriodHours, ReportError, Standing, UtilizationReport,
    UtilizationRow,
};

mod json;
mod table;

pub use json::JsonReport;
pub use table::TableReport;

use crate::pipeline::ImageReport;
use anyhow::Result;

/// Trait for report destinations
pub trait ReportSink {
    /// Write one image's report
    fn write_report(&mut self, report: &ImageReport) -> Result<()>;
}

use super::ReportSink;
use crate::pipeline::{EstimateStatus, ImageReport};
use anyhow::{Context, Result};
use std::io::Write;

/// Human-readable table
pub struct TableReport<W: Write> {
    writer: W,
}

impl<W: Write> TableReport<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn render(&mut self, report: &ImageReport) -> std::io::Result<()> {
        let w = &mut self.writer;

        if !report.reference_found {
            writeln!(w, "No reference object found; using default calibration")?;
        }

        writeln!(
            w,
            "{:<12} {:>10} {:>10} {:>13}  {}",
            "Label", "Confidence", "Mass (g)", "Energy (kcal)", "Status"
        )?;
        writeln!(w, "{:-<62}", "")?;

        for item in &report.items {
            let status = match item.status {
                EstimateStatus::Estimated => "",
                EstimateStatus::UnsupportedLabel => "unsupported",
                EstimateStatus::Failed => "failed",
            };
            writeln!(
                w,
                "{:<12} {:>10.2} {:>10.2} {:>13.2}  {}",
                item.label, item.confidence, item.mass_grams, item.energy_kcal, status
            )?;
        }

        writeln!(w, "{:-<62}", "")?;
        writeln!(w, "Total estimated energy: {:.2} kcal", report.total_energy_kcal)?;
        w.flush()
    }
}

impl<W: Write> ReportSink for TableReport<W> {
    fn write_report(&mut self, report: &ImageReport) -> Result<()> {
        self.render(report).context("Failed to write report table")
    }
}

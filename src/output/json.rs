use super::ReportSink;
use crate::pipeline::ImageReport;
use anyhow::{Context, Result};
use std::io::Write;

/// Pretty-printed JSON, one document per report
pub struct JsonReport<W: Write> {
    writer: W,
}

impl<W: Write> JsonReport<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> ReportSink for JsonReport<W> {
    fn write_report(&mut self, report: &ImageReport) -> Result<()> {
        serde_json::to_writer_pretty(&mut self.writer, report)
            .context("Failed to serialize report")?;
        writeln!(self.writer).context("Failed to write report")?;
        self.writer.flush().context("Failed to flush report")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::Calibration;
    use crate::pipeline::{EstimateStatus, ItemEstimate};

    #[test]
    fn writes_snake_case_fields() {
        let report = ImageReport {
            items: vec![ItemEstimate {
                label: "apple".to_string(),
                confidence: 0.5,
                volume_cm3: 2.0,
                mass_grams: 1.92,
                energy_kcal: 0.9984,
                kcal_per_100g: Some(52.0),
                status: EstimateStatus::Estimated,
            }],
            total_energy_kcal: 0.9984,
            reference_found: false,
            calibration: Calibration {
                reference_area_pixels: 100_000.0,
                pixel_to_cm: 0.01,
            },
        };

        let mut sink = JsonReport::new(Vec::new());
        sink.write_report(&report).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&sink.into_inner()).unwrap();

        assert_eq!(value["reference_found"], false);
        assert_eq!(value["items"][0]["status"], "estimated");
        assert_eq!(value["items"][0]["kcal_per_100g"], 52.0);
        assert_eq!(value["calibration"]["pixel_to_cm"], 0.01);
    }
}

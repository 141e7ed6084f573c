//! Plain-data export of cycle plans
//!
//! Presentation and calendar collaborators consume these snapshots; nothing
//! here mutates a cycle.

use csv::Writer;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

use crate::models::{CycleWeek, Phase, TrainingCycle};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Unsupported export format: {0}")]
    UnsupportedFormat(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            _ => Err(ExportError::UnsupportedFormat(s.to_string())),
        }
    }
}

/// Flat CSV row for one week
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekRow {
    pub week: u32,
    pub phase: Phase,
    pub target_fatigue: f64,
    pub actual_fatigue: Option<f64>,
    pub plan_completion: Option<f64>,
    pub wellbeing: Option<u8>,
    pub total_volume: Option<f64>,
    pub average_rpe: Option<f64>,
    pub average_intensity: Option<f64>,
    pub training_days: u32,
}

impl From<&CycleWeek> for WeekRow {
    fn from(week: &CycleWeek) -> Self {
        Self {
            week: week.week_number,
            phase: week.phase,
            target_fatigue: week.target_fatigue,
            actual_fatigue: week.actual_fatigue,
            plan_completion: week.plan_completion,
            wellbeing: week.wellbeing,
            total_volume: week.metrics.total_volume,
            average_rpe: week.metrics.average_rpe,
            average_intensity: week.metrics.average_intensity,
            training_days: week.metrics.training_days,
        }
    }
}

/// Write one CSV row per week to `writer`
pub fn write_weeks_csv<W: Write>(cycle: &TrainingCycle, writer: W) -> Result<(), ExportError> {
    let mut csv_writer = Writer::from_writer(writer);
    for week in cycle.weeks() {
        csv_writer.serialize(WeekRow::from(week))?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Full cycle as pretty JSON
pub fn to_json(cycle: &TrainingCycle) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(cycle)?)
}

/// Export a cycle to `output_path` in the given format
pub fn export_cycle<P: AsRef<Path>>(
    cycle: &TrainingCycle,
    format: ExportFormat,
    output_path: P,
) -> Result<(), ExportError> {
    let file = File::create(output_path.as_ref())?;
    match format {
        ExportFormat::Csv => write_weeks_csv(cycle, file)?,
        ExportFormat::Json => {
            let mut file = file;
            file.write_all(to_json(cycle)?.as_bytes())?;
        }
    }
    tracing::info!(
        cycle = %cycle.id,
        format = ?format,
        path = %output_path.as_ref().display(),
        "cycle exported"
    );
    Ok(())
}

//! Report output: terminal text, JSON or CSV (attendance rows).

mod fs_utils;
mod json_csv;
pub mod model;
pub mod text;

pub use model::AttendanceExport;
pub use text::render_report;

use crate::core::report::Report;
use crate::errors::AppResult;
use crate::ui::messages::success;
use clap::ValueEnum;
use fs_utils::ensure_writable;
use json_csv::{write_csv, write_json};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    #[default]
    Text,
    Json,
    Csv,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Text => "text",
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
        }
    }
}

fn write_to<W: Write>(report: &Report, format: ExportFormat, out: W, color: bool) -> AppResult<()> {
    match format {
        ExportFormat::Text => {
            let mut out = out;
            out.write_all(render_report(report, color).as_bytes())?;
            out.flush()?;
            Ok(())
        }
        ExportFormat::Json => write_json(report, out),
        ExportFormat::Csv => {
            let rows: Vec<AttendanceExport> = report.attendance.iter().map(AttendanceExport::from).collect();
            write_csv(&rows, out)
        }
    }
}

/// Write `report` to `file`, or to stdout when no file is given.
pub fn export_report(report: &Report, format: ExportFormat, file: Option<&Path>, force: bool) -> AppResult<()> {
    match file {
        None => write_to(report, format, io::stdout().lock(), format == ExportFormat::Text),
        Some(path) => {
            ensure_writable(path, force)?;
            let writer = BufWriter::new(File::create(path)?);
            write_to(report, format, writer, false)?;
            success(format!(
                "{} export completed: {}",
                format.as_str().to_uppercase(),
                path.display()
            ));
            Ok(())
        }
    }
}

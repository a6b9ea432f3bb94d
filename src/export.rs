use std::io::Write;

use serde_json::{Map, Value};

use crate::error::QaResult;
use crate::models::{AssessmentRecord, AuditLogEntry, Portfolio, SamplingRecord};

pub const MISSING: &str = "N/A";
pub const MISSING_DATE: &str = "Unknown date";

/// A record that can be flattened into export columns.
pub trait Exportable {
    /// Columns exported when the caller does not pick any.
    const DEFAULT_COLUMNS: &'static [&'static str];
    /// Date-valued columns, which get the date placeholder when empty.
    const DATE_COLUMNS: &'static [&'static str];

    fn field(&self, column: &str) -> Option<String>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportRow {
    pub cells: Vec<(String, String)>,
}

impl ExportRow {
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(_, value)| value.as_str())
    }
}

/// Resolves the requested columns, falling back to the record type's defaults.
pub fn columns_for<T: Exportable>(requested: &[String]) -> Vec<String> {
    if requested.is_empty() {
        T::DEFAULT_COLUMNS.iter().map(|c| c.to_string()).collect()
    } else {
        requested.iter().map(|c| c.trim().to_string()).collect()
    }
}

pub fn to_rows<T: Exportable>(records: &[T], columns: &[String]) -> Vec<ExportRow> {
    records
        .iter()
        .map(|record| ExportRow {
            cells: columns
                .iter()
                .map(|column| {
                    let value = record
                        .field(column)
                        .filter(|v| !v.trim().is_empty())
                        .unwrap_or_else(|| placeholder::<T>(column).to_string());
                    (column.clone(), value)
                })
                .collect(),
        })
        .collect()
}

fn placeholder<T: Exportable>(column: &str) -> &'static str {
    if T::DATE_COLUMNS.contains(&column) {
        MISSING_DATE
    } else {
        MISSING
    }
}

pub fn write_csv<W: Write>(writer: W, columns: &[String], rows: &[ExportRow]) -> QaResult<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(columns)?;
    for row in rows {
        csv.write_record(row.values())?;
    }
    csv.flush()?;
    Ok(())
}

pub fn to_json(rows: &[ExportRow]) -> Value {
    Value::Array(
        rows.iter()
            .map(|row| {
                let object: Map<String, Value> = row
                    .cells
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                    .collect();
                Value::Object(object)
            })
            .collect(),
    )
}

/// Renders rows as fixed-height text pages, the printable counterpart of the CSV export.
pub fn paginate(
    title: &str,
    columns: &[String],
    rows: &[ExportRow],
    rows_per_page: usize,
) -> Vec<String> {
    let rows_per_page = rows_per_page.max(1);
    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(i, column)| {
            rows.iter()
                .filter_map(|row| row.cells.get(i))
                .map(|(_, value)| value.chars().count())
                .chain(std::iter::once(column.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let line = |values: Vec<&str>| {
        values
            .iter()
            .zip(&widths)
            .map(|(value, &width)| format!("{value:<width$}"))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let header = line(columns.iter().map(String::as_str).collect());
    let rule = "-".repeat(header.chars().count());

    let chunks: Vec<&[ExportRow]> = if rows.is_empty() {
        vec![rows]
    } else {
        rows.chunks(rows_per_page).collect()
    };
    let total = chunks.len();

    chunks
        .into_iter()
        .enumerate()
        .map(|(index, chunk)| {
            let mut page = Vec::with_capacity(chunk.len() + 4);
            page.push(format!("{title} (Page {} of {total})", index + 1));
            page.push(String::new());
            page.push(header.clone());
            page.push(rule.clone());
            if chunk.is_empty() {
                page.push("No records.".to_string());
            }
            for row in chunk {
                page.push(line(row.values().collect()));
            }
            page.join("\n")
        })
        .collect()
}

impl Exportable for AuditLogEntry {
    const DEFAULT_COLUMNS: &'static [&'static str] = &[
        "timestamp",
        "user",
        "actionType",
        "description",
        "targetType",
        "targetId",
    ];
    const DATE_COLUMNS: &'static [&'static str] = &["timestamp"];

    fn field(&self, column: &str) -> Option<String> {
        match column {
            "timestamp" => self
                .timestamp
                .map(|ts| ts.format("%Y-%m-%d %H:%M:%S").to_string()),
            "user" => self.user.clone(),
            "actionType" => self.action_type.map(|a| a.as_str().to_string()),
            "description" => self.description.clone(),
            "targetType" => self.target_type.clone(),
            "targetId" => self.target_id.clone(),
            _ => None,
        }
    }
}

impl Exportable for AssessmentRecord {
    const DEFAULT_COLUMNS: &'static [&'static str] = &[
        "id",
        "course",
        "trainer",
        "date",
        "sampleSize",
        "sampled",
        "passRate",
        "status",
        "flagged",
    ];
    const DATE_COLUMNS: &'static [&'static str] = &["date"];

    fn field(&self, column: &str) -> Option<String> {
        match column {
            "id" => Some(self.id.clone()),
            "course" => self.course.clone(),
            "trainer" => self.trainer.clone(),
            "date" => self.date.map(|d| d.to_string()),
            "sampleSize" => Some(self.sample_size.to_string()),
            "sampled" => Some(self.sampled.to_string()),
            "passRate" => Some(format!("{:.1}", self.pass_rate)),
            "status" => self.status.clone(),
            "flagged" => Some(if self.flagged { "yes" } else { "no" }.to_string()),
            "subAssessments" => Some(self.detailed_sub_assessments.len().to_string()),
            _ => None,
        }
    }
}

impl Exportable for Portfolio {
    const DEFAULT_COLUMNS: &'static [&'static str] = &[
        "id",
        "learnerName",
        "qualification",
        "assessor",
        "status",
        "submittedAt",
    ];
    const DATE_COLUMNS: &'static [&'static str] = &["submittedAt"];

    fn field(&self, column: &str) -> Option<String> {
        match column {
            "id" => Some(self.id.clone()),
            "learnerName" => self.learner_name.clone(),
            "qualification" => self.qualification.clone(),
            "assessor" => self.assessor.clone(),
            "status" => self.status.clone(),
            "submittedAt" => self.submitted_at.map(|ts| ts.date_naive().to_string()),
            "feedback" => self.feedback.clone(),
            "comments" => Some(self.comments.len().to_string()),
            _ => None,
        }
    }
}

impl Exportable for SamplingRecord {
    const DEFAULT_COLUMNS: &'static [&'static str] = &[
        "assessmentId",
        "course",
        "trainer",
        "sampleSize",
        "sampledCount",
        "samplingPercentage",
        "learners",
        "sampledDate",
        "sampledBy",
    ];
    const DATE_COLUMNS: &'static [&'static str] = &["sampledDate"];

    fn field(&self, column: &str) -> Option<String> {
        match column {
            "id" => Some(self.id.to_string()),
            "assessmentId" => Some(self.assessment_id.clone()),
            "course" => self.course.clone(),
            "trainer" => self.trainer.clone(),
            "sampleSize" => Some(self.sample_size.to_string()),
            "sampledCount" => Some(self.sampled_count.to_string()),
            "samplingPercentage" => Some(format!("{}%", self.sampling_percentage)),
            "learners" => Some(
                self.learners
                    .iter()
                    .map(|l| l.name.as_str())
                    .collect::<Vec<_>>()
                    .join("; "),
            ),
            "sampledDate" => Some(self.sampled_date.format("%Y-%m-%d %H:%M").to_string()),
            "sampledBy" => Some(self.sampled_by.clone()),
            _ => None,
        }
    }
}

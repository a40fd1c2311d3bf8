//! Snapshot reports over the collection: preview, CSV export, print.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::*;

pub const CSV_HEADER: &str = "ID,Student Name,Student ID,Category,Status,Submitted At,Resolved At,Description";
pub const NOT_APPLICABLE: &str = "N/A";

/// Inclusive submission-date range plus multi-select status/category sets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct ReportFilter {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub statuses: Vec<ComplaintStatus>,
    pub categories: Vec<ComplaintCategory>,
}

impl Default for ReportFilter {
    fn default() -> Self {
        Self {
            start_date: None,
            end_date: None,
            statuses: ComplaintStatus::ALL.to_vec(),
            categories: ComplaintCategory::ALL.to_vec(),
        }
    }
}

impl ReportFilter {
    pub fn accepts(&self, c: &Complaint) -> bool {
        let day = c.submitted_on();
        self.start_date.map_or(true, |start| day >= start)
            && self.end_date.map_or(true, |end| day <= end)
            && self.statuses.contains(&c.status)
            && self.categories.contains(&c.category)
    }
}

/// Frozen at generation time; later store changes do not show up here.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    #[serde(with = "timestamp")]
    pub generated_at: DateTime<Utc>,
    pub filter: ReportFilter,
    pub rows: Vec<Complaint>,
}

pub fn generate(complaints: &[Complaint], filter: ReportFilter, now: DateTime<Utc>) -> Report {
    let rows = complaints.iter().filter(|c| filter.accepts(c)).cloned().collect();
    Report { generated_at: now, filter, rows }
}

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

/// RFC 4180: quote only when the field would otherwise break the row.
fn csv_field(field: &str) -> String {
    if field.contains([',', '"', '\r', '\n']) {
        quote(field)
    } else {
        field.to_string()
    }
}

fn joined<T: std::fmt::Display>(items: &[T]) -> String {
    if items.is_empty() {
        return "none".into();
    }
    items.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

impl Report {
    pub fn to_csv(&self) -> String {
        let mut lines = Vec::with_capacity(self.rows.len() + 1);
        lines.push(CSV_HEADER.to_string());
        for c in &self.rows {
            let resolved = c.resolved_at.as_ref().map(timestamp::encode).unwrap_or_else(|| NOT_APPLICABLE.into());
            lines.push(
                [
                    csv_field(&c.id),
                    csv_field(&c.student_name),
                    csv_field(&c.student_id),
                    csv_field(c.category.label()),
                    csv_field(c.status.label()),
                    timestamp::encode(&c.submitted_at),
                    resolved,
                    // always quoted
                    quote(&c.description),
                ]
                .join(","),
            );
        }
        lines.join("\n")
    }

    /// `complaint_report_<YYYY-MM-DD>.csv`, dated by generation day.
    pub fn csv_filename(&self) -> String {
        format!("complaint_report_{}.csv", self.generated_at.format("%Y-%m-%d"))
    }

    pub fn render_print(&self) -> String {
        let range = match (self.filter.start_date, self.filter.end_date) {
            (None, None) => "all dates".to_string(),
            (start, end) => format!(
                "{} to {}",
                start.map_or("beginning".into(), |d| d.to_string()),
                end.map_or("today".into(), |d| d.to_string())
            ),
        };
        let mut out = String::new();
        out.push_str("Complaint Report\n");
        out.push_str(&format!("Generated: {}\n", self.generated_at.format("%Y-%m-%d %H:%M UTC")));
        out.push_str(&format!(
            "Filters: {range}; Statuses: {}; Categories: {}.\n",
            joined(&self.filter.statuses),
            joined(&self.filter.categories)
        ));
        out.push_str(&format!("Total: {}\n", self.rows.len()));
        if self.rows.is_empty() {
            out.push_str("\nNo complaints match the selected filters.\n");
        }
        for c in &self.rows {
            out.push_str(&format!(
                "\n{} | {} ({}) | {} | {}\nSubmitted: {} | Resolved: {}\n{}\n",
                c.id,
                c.student_name,
                c.student_id,
                c.category,
                c.status,
                c.submitted_at.format("%Y-%m-%d"),
                c.resolved_at.map_or(NOT_APPLICABLE.into(), |t| t.format("%Y-%m-%d").to_string()),
                c.description
            ));
        }
        out
    }
}

//! Read-only derivations over the complaint collection for the dashboards.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::*;
use crate::notify::Severity;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Newest,
    Oldest,
    StatusAsc,
    StatusDesc,
}

/// Admin dashboard filter. `None` means "all".
#[derive(Debug, Clone, Default)]
pub struct AdminQuery {
    pub status: Option<ComplaintStatus>,
    pub category: Option<ComplaintCategory>,
    pub search: String,
    pub sort: SortOrder,
}

/// Case-insensitive substring match over id, student name, student id and
/// description. An empty term matches everything.
pub fn matches_search(c: &Complaint, term: &str) -> bool {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return true;
    }
    [&c.id, &c.student_name, &c.student_id, &c.description]
        .iter()
        .any(|field| field.to_lowercase().contains(&term))
}

pub fn admin_view(complaints: &[Complaint], query: &AdminQuery) -> Vec<Complaint> {
    let mut v: Vec<_> = complaints
        .iter()
        .filter(|c| query.status.map_or(true, |s| c.status == s))
        .filter(|c| query.category.map_or(true, |cat| c.category == cat))
        .filter(|c| matches_search(c, &query.search))
        .cloned()
        .collect();
    match query.sort {
        SortOrder::Newest => v.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at)),
        SortOrder::Oldest => v.sort_by(|a, b| a.submitted_at.cmp(&b.submitted_at)),
        SortOrder::StatusAsc => v.sort_by(|a, b| {
            a.status.label().cmp(b.status.label()).then_with(|| b.submitted_at.cmp(&a.submitted_at))
        }),
        SortOrder::StatusDesc => v.sort_by(|a, b| {
            b.status.label().cmp(a.status.label()).then_with(|| b.submitted_at.cmp(&a.submitted_at))
        }),
    }
    v
}

/// A student's own complaints, newest first.
pub fn student_view(complaints: &[Complaint], student_id: &str, search: &str) -> Vec<Complaint> {
    let mut v: Vec<_> = complaints
        .iter()
        .filter(|c| c.student_id == student_id && matches_search(c, search))
        .cloned()
        .collect();
    v.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
    v
}

/// A complaint as rendered on a dashboard card.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ComplaintCard {
    #[serde(flatten)]
    pub complaint: Complaint,
    pub is_overdue: bool,
    /// Admin cards only: not yet opened by an admin.
    pub is_new: bool,
}

pub fn cards(complaints: Vec<Complaint>, today: NaiveDate, for_admin: bool) -> Vec<ComplaintCard> {
    complaints
        .into_iter()
        .map(|c| ComplaintCard {
            is_overdue: c.is_overdue(today),
            is_new: for_admin && !c.is_read_by_admin,
            complaint: c,
        })
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DueAlerts {
    pub overdue: Vec<ComplaintId>,
    pub due_today: Vec<ComplaintId>,
}

/// Date-only comparison against `today`; settled complaints never alert.
pub fn due_alerts(complaints: &[Complaint], today: NaiveDate) -> DueAlerts {
    DueAlerts {
        overdue: complaints.iter().filter(|c| c.is_overdue(today)).map(|c| c.id.clone()).collect(),
        due_today: complaints.iter().filter(|c| c.is_due_on(today)).map(|c| c.id.clone()).collect(),
    }
}

fn count_phrase(n: usize, tail: &str) -> String {
    if n > 1 {
        format!("{n} complaints are {tail}.")
    } else {
        format!("{n} complaint is {tail}.")
    }
}

impl DueAlerts {
    pub fn is_empty(&self) -> bool {
        self.overdue.is_empty() && self.due_today.is_empty()
    }

    /// One-shot dashboard message; error severity when anything is overdue.
    pub fn message(&self) -> Option<(String, Severity)> {
        if self.is_empty() {
            return None;
        }
        let mut parts = Vec::new();
        if !self.overdue.is_empty() {
            parts.push(count_phrase(self.overdue.len(), "overdue"));
        }
        if !self.due_today.is_empty() {
            parts.push(count_phrase(self.due_today.len(), "due today"));
        }
        let severity = if self.overdue.is_empty() { Severity::Info } else { Severity::Error };
        Some((parts.join(" "), severity))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct NamedCount {
    pub name: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total: usize,
    pub resolved: usize,
    pub in_progress: usize,
    pub pending: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Analytics {
    /// Only categories that occur, in enum order.
    pub by_category: Vec<NamedCount>,
    pub by_status: Vec<NamedCount>,
    pub summary: Summary,
}

pub fn analytics(complaints: &[Complaint]) -> Analytics {
    let by_category = ComplaintCategory::ALL
        .into_iter()
        .map(|cat| NamedCount { name: cat.label().into(), count: complaints.iter().filter(|c| c.category == cat).count() })
        .filter(|n| n.count > 0)
        .collect();
    let status_count = |s: ComplaintStatus| complaints.iter().filter(|c| c.status == s).count();
    let by_status = ComplaintStatus::ALL
        .into_iter()
        .map(|s| NamedCount { name: s.label().into(), count: status_count(s) })
        .filter(|n| n.count > 0)
        .collect();
    Analytics {
        by_category,
        by_status,
        summary: Summary {
            total: complaints.len(),
            resolved: status_count(ComplaintStatus::Resolved),
            in_progress: status_count(ComplaintStatus::InProgress),
            pending: status_count(ComplaintStatus::Submitted),
        },
    }
}

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub type ComplaintId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Admin,
    None,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub role: Role,
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_picture_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// Partial profile edit; `id` and `role` are not editable.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub department: Option<String>,
    pub level: Option<u32>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub profile_picture_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum ComplaintStatus {
    Submitted,
    #[serde(rename = "In Progress")]
    InProgress,
    Resolved,
    Closed,
}

impl ComplaintStatus {
    pub const ALL: [ComplaintStatus; 4] = [
        ComplaintStatus::Submitted,
        ComplaintStatus::InProgress,
        ComplaintStatus::Resolved,
        ComplaintStatus::Closed,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ComplaintStatus::Submitted => "Submitted",
            ComplaintStatus::InProgress => "In Progress",
            ComplaintStatus::Resolved => "Resolved",
            ComplaintStatus::Closed => "Closed",
        }
    }

    /// Resolved and Closed complaints no longer count towards due-date alerts.
    pub fn is_settled(self) -> bool {
        matches!(self, ComplaintStatus::Resolved | ComplaintStatus::Closed)
    }
}

impl fmt::Display for ComplaintStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ComplaintStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalize(s);
        Self::ALL
            .into_iter()
            .find(|v| normalize(v.label()) == wanted)
            .ok_or_else(|| UnknownVariant(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum ComplaintCategory {
    Academic,
    Administrative,
    Facilities,
    #[serde(rename = "Harassment/Security")]
    Harassment,
    Financial,
    Other,
}

impl ComplaintCategory {
    pub const ALL: [ComplaintCategory; 6] = [
        ComplaintCategory::Academic,
        ComplaintCategory::Administrative,
        ComplaintCategory::Facilities,
        ComplaintCategory::Harassment,
        ComplaintCategory::Financial,
        ComplaintCategory::Other,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ComplaintCategory::Academic => "Academic",
            ComplaintCategory::Administrative => "Administrative",
            ComplaintCategory::Facilities => "Facilities",
            ComplaintCategory::Harassment => "Harassment/Security",
            ComplaintCategory::Financial => "Financial",
            ComplaintCategory::Other => "Other",
        }
    }
}

impl fmt::Display for ComplaintCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ComplaintCategory {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalize(s);
        Self::ALL
            .into_iter()
            .find(|v| normalize(v.label()) == wanted || normalize(&format!("{v:?}")) == wanted)
            .ok_or_else(|| UnknownVariant(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown value '{0}'")]
pub struct UnknownVariant(pub String);

// "In Progress", "in_progress" and "in-progress" all compare equal
fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '/')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub name: String,
    /// Size in bytes.
    pub size: u64,
    #[serde(rename = "type")]
    pub mime: String,
    /// Base64 `data:` URL holding the file contents.
    pub data_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub status: ComplaintStatus,
    #[serde(with = "timestamp")]
    pub changed_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Complaint {
    pub id: ComplaintId,
    pub student_name: String,
    pub student_id: String,
    pub category: ComplaintCategory,
    pub description: String,
    pub status: ComplaintStatus,
    #[serde(with = "timestamp")]
    pub submitted_at: DateTime<Utc>,
    #[serde(default, with = "timestamp::option", skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_notes: Option<String>,
    pub history: Vec<HistoryEntry>,
    #[serde(default)]
    pub is_read_by_admin: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<Attachment>,
}

impl Complaint {
    /// Due strictly before `today` and still open.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        !self.status.is_settled() && self.due_date.is_some_and(|due| due < today)
    }

    pub fn is_due_on(&self, today: NaiveDate) -> bool {
        !self.status.is_settled() && self.due_date == Some(today)
    }

    /// Calendar day of submission (UTC).
    pub fn submitted_on(&self) -> NaiveDate {
        self.submitted_at.date_naive()
    }
}

/// Student-authored draft; everything else is stamped by the store.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewComplaint {
    pub category: ComplaintCategory,
    pub description: String,
    #[serde(default)]
    pub attachment: Option<Attachment>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    pub status: ComplaintStatus,
    /// Replaces the due date; `null` clears it.
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NotesUpdate {
    pub notes: String,
}

/// Explicit timestamp encoding for every persistence and wire boundary:
/// RFC 3339, millisecond precision, `Z` suffix.
pub mod timestamp {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn encode(t: &DateTime<Utc>) -> String {
        t.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn decode(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
        DateTime::parse_from_rfc3339(raw).map(|t| t.with_timezone(&Utc))
    }

    pub fn serialize<S: Serializer>(t: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&encode(t))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        decode(&raw).map_err(serde::de::Error::custom)
    }

    pub mod option {
        use super::*;

        pub fn serialize<S: Serializer>(t: &Option<DateTime<Utc>>, s: S) -> Result<S::Ok, S::Error> {
            match t {
                Some(t) => s.serialize_some(&encode(t)),
                None => s.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<DateTime<Utc>>, D::Error> {
            Option::<String>::deserialize(d)?
                .map(|raw| decode(&raw))
                .transpose()
                .map_err(serde::de::Error::custom)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_labels_parse_loosely() {
        assert_eq!("In Progress".parse::<ComplaintStatus>().unwrap(), ComplaintStatus::InProgress);
        assert_eq!("in_progress".parse::<ComplaintStatus>().unwrap(), ComplaintStatus::InProgress);
        assert_eq!("closed".parse::<ComplaintStatus>().unwrap(), ComplaintStatus::Closed);
        assert!("Reopened".parse::<ComplaintStatus>().is_err());
        assert_eq!("Harassment/Security".parse::<ComplaintCategory>().unwrap(), ComplaintCategory::Harassment);
        assert_eq!("harassment".parse::<ComplaintCategory>().unwrap(), ComplaintCategory::Harassment);
    }

    #[test]
    fn stored_complaint_rehydrates_dates() {
        let raw = r#"{
            "id": "C-1", "studentName": "Ada", "studentId": "U2021/5570009",
            "category": "Harassment/Security", "description": "d", "status": "In Progress",
            "submittedAt": "2024-05-20T10:00:00.000Z",
            "history": [{"status": "Submitted", "changedAt": "2024-05-20T10:00:00.000Z"}],
            "dueDate": "2024-06-10"
        }"#;
        let c: Complaint = serde_json::from_str(raw).unwrap();
        assert_eq!(c.category, ComplaintCategory::Harassment);
        assert_eq!(c.status, ComplaintStatus::InProgress);
        assert!(!c.is_read_by_admin);
        assert_eq!(timestamp::encode(&c.submitted_at), "2024-05-20T10:00:00.000Z");
        assert_eq!(c.due_date, NaiveDate::from_ymd_opt(2024, 6, 10));
        assert!(c.resolved_at.is_none());

        let back = serde_json::to_value(&c).unwrap();
        assert_eq!(back["submittedAt"], "2024-05-20T10:00:00.000Z");
        assert_eq!(back["status"], "In Progress");
        assert!(back.get("resolvedAt").is_none());
    }
}

//! First-run example complaints.

use chrono::{DateTime, NaiveDate, Utc};

use crate::models::*;

// 1x1 transparent PNG standing in for a payment receipt
const RECEIPT_DATA_URL: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAQAAAC1HAwCAAAAC0lEQVR42mNkYAAAAAYAAjCB0C8AAAAASUVORK5CYII=";

fn at(raw: &str) -> DateTime<Utc> {
    timestamp::decode(raw).expect("valid seed timestamp")
}

fn day(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(y, m, d)
}

fn entry(status: ComplaintStatus, changed_at: &str, notes: Option<&str>) -> HistoryEntry {
    HistoryEntry { status, changed_at: at(changed_at), notes: notes.map(Into::into) }
}

fn new_id() -> ComplaintId {
    format!("C-{}", uuid::Uuid::new_v4())
}

/// The five example complaints. The Financial one is stamped `now` and unread.
pub fn complaints(now: DateTime<Utc>) -> Vec<Complaint> {
    use ComplaintStatus::*;
    vec![
        Complaint {
            id: new_id(),
            student_name: "Ada Okoro".into(),
            student_id: "U2021/5570009".into(),
            category: ComplaintCategory::Academic,
            description: "My grade for COS 301 was not recorded correctly. I believe there has been a mistake in the calculation. I have my test scripts as proof.".into(),
            status: InProgress,
            submitted_at: at("2024-05-20T10:00:00Z"),
            resolved_at: None,
            admin_notes: Some("Contacted the department head. Waiting for feedback on the grade review process.".into()),
            history: vec![
                entry(Submitted, "2024-05-20T10:00:00Z", Some("Complaint submitted by student.")),
                entry(InProgress, "2024-05-21T14:30:00Z", Some("Assigned to academic affairs. Awaiting course adviser's response.")),
            ],
            is_read_by_admin: true,
            due_date: day(2024, 6, 10),
            attachment: None,
        },
        Complaint {
            id: new_id(),
            student_name: "Bolanle Adeyemi".into(),
            student_id: "U2020/5512345".into(),
            category: ComplaintCategory::Facilities,
            description: "The air conditioning unit in Lecture Hall 2 has been faulty for over a week, making lectures very uncomfortable.".into(),
            status: Resolved,
            submitted_at: at("2024-05-18T09:30:00Z"),
            resolved_at: Some(at("2024-05-22T11:00:00Z")),
            admin_notes: Some("Maintenance team was dispatched and has repaired the AC unit. Issue confirmed resolved.".into()),
            history: vec![
                entry(Submitted, "2024-05-18T09:30:00Z", None),
                entry(InProgress, "2024-05-18T12:00:00Z", Some("Ticket raised with the maintenance department.")),
                entry(Resolved, "2024-05-22T11:00:00Z", Some("Unit repaired and tested successfully.")),
            ],
            is_read_by_admin: true,
            due_date: day(2024, 5, 25),
            attachment: None,
        },
        Complaint {
            id: new_id(),
            student_name: "Chukwudi Eze".into(),
            student_id: "U2022/5598765".into(),
            category: ComplaintCategory::Financial,
            description: "I paid my school fees two weeks ago but my portal still shows that I have an outstanding balance. My remita receipt is attached.".into(),
            status: Submitted,
            submitted_at: now,
            resolved_at: None,
            admin_notes: None,
            history: vec![HistoryEntry { status: Submitted, changed_at: now, notes: None }],
            is_read_by_admin: false,
            due_date: None,
            attachment: Some(Attachment {
                name: "school_fees_receipt.png".into(),
                size: 123_456,
                mime: "image/png".into(),
                data_url: RECEIPT_DATA_URL.into(),
            }),
        },
        Complaint {
            id: new_id(),
            student_name: "Fatima Sani".into(),
            student_id: "U2019/5545678".into(),
            category: ComplaintCategory::Administrative,
            description: "I applied for a transcript a month ago and have not received any update on its status. The application ID is T-45678.".into(),
            status: Closed,
            submitted_at: at("2024-04-15T15:00:00Z"),
            resolved_at: Some(at("2024-04-20T16:00:00Z")),
            admin_notes: Some("Transcript was processed and dispatched on April 19th. Student confirmed receipt. Closing ticket.".into()),
            history: vec![
                entry(Submitted, "2024-04-15T15:00:00Z", None),
                entry(InProgress, "2024-04-16T10:00:00Z", Some("Forwarded to exams and records.")),
                entry(Resolved, "2024-04-20T16:00:00Z", Some("Transcript sent.")),
                entry(Closed, "2024-04-21T09:00:00Z", None),
            ],
            is_read_by_admin: true,
            due_date: None,
            attachment: None,
        },
        Complaint {
            id: new_id(),
            student_name: "Emeka Nwosu".into(),
            student_id: "U2021/5570010".into(),
            category: ComplaintCategory::Harassment,
            description: "A security guard at the main gate was verbally abusive and refused me entry without a valid reason, even after showing my ID card.".into(),
            status: InProgress,
            submitted_at: at("2024-05-23T18:00:00Z"),
            resolved_at: None,
            admin_notes: Some("Chief Security Officer has been notified and an investigation is underway. The student has been contacted for more details.".into()),
            history: vec![
                entry(Submitted, "2024-05-23T18:00:00Z", None),
                entry(InProgress, "2024-05-24T09:15:00Z", Some("Incident escalated to CSO.")),
            ],
            is_read_by_admin: true,
            due_date: day(2024, 6, 5),
            attachment: None,
        },
    ]
}

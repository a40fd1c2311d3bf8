use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{error, info, warn};

use crate::error::ValidationError;
use crate::models::*;
use crate::seed;
use crate::storage::{load_json, save_json, KeyValueStore};

pub const COMPLAINTS_KEY: &str = "csDepartmentComplaints";

pub const SUBMITTED_NOTE: &str = "Complaint submitted by student.";
pub const DETAILS_UPDATED_NOTE: &str = "Complaint details updated by admin.";

pub const ATTACHMENT_SIZE_LIMIT: usize = 5 * 1024 * 1024; // 5 MB

/// Every mutation of the collection is one of these.
#[derive(Debug, Clone)]
pub enum Command {
    /// Swap in a whole collection (restore).
    Replace(Vec<Complaint>),
    /// Insert at the head.
    Add(Complaint),
    UpdateStatus {
        id: ComplaintId,
        status: ComplaintStatus,
        due_date: Option<NaiveDate>,
        at: DateTime<Utc>,
    },
    UpdateNotes { id: ComplaintId, notes: String },
    MarkRead { id: ComplaintId },
}

/// Pure command handler: (collection, command) -> collection.
/// Commands naming an unknown id leave the collection untouched.
pub fn apply(mut complaints: Vec<Complaint>, command: Command) -> Vec<Complaint> {
    match command {
        Command::Replace(all) => return all,
        Command::Add(c) => complaints.insert(0, c),
        Command::UpdateStatus { id, status, due_date, at } => {
            if let Some(c) = complaints.iter_mut().find(|c| c.id == id) {
                change_status(c, status, due_date, at);
            }
        }
        Command::UpdateNotes { id, notes } => {
            if let Some(c) = complaints.iter_mut().find(|c| c.id == id) {
                c.admin_notes = Some(notes);
                c.is_read_by_admin = true;
            }
        }
        Command::MarkRead { id } => {
            if let Some(c) = complaints.iter_mut().find(|c| c.id == id) {
                c.is_read_by_admin = true;
            }
        }
    }
    complaints
}

pub fn status_change_note(old: ComplaintStatus, new: ComplaintStatus) -> String {
    if old == new {
        DETAILS_UPDATED_NOTE.to_string()
    } else {
        format!("Status changed from {old} to {new}.")
    }
}

// Any target status is accepted: the admin picks freely from the enum.
fn change_status(c: &mut Complaint, status: ComplaintStatus, due_date: Option<NaiveDate>, at: DateTime<Utc>) {
    let note = status_change_note(c.status, status);
    c.history.push(HistoryEntry { status, changed_at: at, notes: Some(note) });
    if status.is_settled() && c.resolved_at.is_none() {
        c.resolved_at = Some(at);
    }
    c.status = status;
    c.due_date = due_date;
    c.is_read_by_admin = true;
}

/// Build a freshly submitted complaint owned by `student`.
pub fn new_complaint(draft: NewComplaint, student: &User, now: DateTime<Utc>) -> Result<Complaint, ValidationError> {
    let description = draft.description.trim();
    if description.is_empty() {
        return Err(ValidationError::EmptyDescription);
    }
    if let Some(a) = &draft.attachment {
        if a.size > ATTACHMENT_SIZE_LIMIT as u64 {
            return Err(ValidationError::FileTooLarge { limit_mb: ATTACHMENT_SIZE_LIMIT / (1024 * 1024) });
        }
    }
    Ok(Complaint {
        id: format!("C-{}", uuid::Uuid::new_v4()),
        student_name: student.name.clone(),
        student_id: student.id.clone(),
        category: draft.category,
        description: description.to_string(),
        status: ComplaintStatus::Submitted,
        submitted_at: now,
        resolved_at: None,
        admin_notes: None,
        history: vec![HistoryEntry {
            status: ComplaintStatus::Submitted,
            changed_at: now,
            notes: Some(SUBMITTED_NOTE.into()),
        }],
        is_read_by_admin: false,
        due_date: None,
        attachment: draft.attachment,
    })
}

/// Single source of truth for complaints. Each call is applied atomically
/// under the write lock and the whole collection is persisted afterwards.
pub struct ComplaintStore {
    state: RwLock<Vec<Complaint>>,
    storage: Arc<dyn KeyValueStore>,
}

impl ComplaintStore {
    /// Load the persisted collection, seeding (and persisting) the example
    /// complaints on first run.
    pub fn restore(storage: Arc<dyn KeyValueStore>) -> Self {
        let loaded = match load_json::<Vec<Complaint>>(&*storage, COMPLAINTS_KEY) {
            Ok(Some(all)) => {
                info!(count = all.len(), "restored complaints");
                Some(all)
            }
            Ok(None) => {
                info!("no stored complaints; seeding example data");
                None
            }
            Err(e) => {
                error!("failed to read stored complaints: {e}. Falling back to example data.");
                None
            }
        };
        let store = Self { state: RwLock::new(Vec::new()), storage };
        match loaded {
            Some(all) => store.dispatch(Command::Replace(all), false),
            None => store.dispatch(Command::Replace(seed::complaints(Utc::now())), true),
        }
        store
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Complaint>> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn dispatch(&self, command: Command, persist: bool) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let next = apply(std::mem::take(&mut *state), command);
        *state = next;
        if persist {
            if let Err(e) = save_json(&*self.storage, COMPLAINTS_KEY, &*state) {
                // in-memory state stays authoritative
                error!("failed to persist complaints: {e}");
            }
        }
    }

    pub fn all(&self) -> Vec<Complaint> {
        self.read().clone()
    }

    pub fn get(&self, id: &str) -> Option<Complaint> {
        self.read().iter().find(|c| c.id == id).cloned()
    }

    fn contains(&self, id: &str) -> bool {
        self.read().iter().any(|c| c.id == id)
    }

    pub fn create(&self, student: &User, draft: NewComplaint) -> Result<Complaint, ValidationError> {
        let complaint = new_complaint(draft, student, Utc::now())?;
        info!(id = %complaint.id, student = %student.id, "complaint submitted");
        self.dispatch(Command::Add(complaint.clone()), true);
        Ok(complaint)
    }

    /// Returns `None` (and changes nothing) when `id` is unknown.
    pub fn update_status(&self, id: &str, status: ComplaintStatus, due_date: Option<NaiveDate>) -> Option<Complaint> {
        self.update_status_at(id, status, due_date, Utc::now())
    }

    pub fn update_status_at(
        &self,
        id: &str,
        status: ComplaintStatus,
        due_date: Option<NaiveDate>,
        at: DateTime<Utc>,
    ) -> Option<Complaint> {
        if !self.contains(id) {
            warn!(id, "status update for unknown complaint ignored");
            return None;
        }
        self.dispatch(Command::UpdateStatus { id: id.to_string(), status, due_date, at }, true);
        info!(id, %status, "complaint status updated");
        self.get(id)
    }

    pub fn update_notes(&self, id: &str, notes: impl Into<String>) -> Option<Complaint> {
        if !self.contains(id) {
            warn!(id, "notes update for unknown complaint ignored");
            return None;
        }
        self.dispatch(Command::UpdateNotes { id: id.to_string(), notes: notes.into() }, true);
        self.get(id)
    }

    /// Set the read flag; history is untouched. Returns false for unknown ids.
    pub fn mark_read(&self, id: &str) -> bool {
        match self.get(id) {
            Some(c) if c.is_read_by_admin => true,
            Some(_) => {
                self.dispatch(Command::MarkRead { id: id.to_string() }, true);
                true
            }
            None => false,
        }
    }

    /// Admin detail view: opening an unread complaint marks it read.
    pub fn open_as_admin(&self, id: &str) -> Option<Complaint> {
        if self.mark_read(id) { self.get(id) } else { None }
    }
}

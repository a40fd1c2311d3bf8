use std::sync::{Arc, PoisonError, RwLock};

use tracing::{error, info, warn};

use crate::directory::{self, ADMIN_ID};
use crate::error::{AuthError, ValidationError};
use crate::models::{ProfileUpdate, Role, User};
use crate::storage::{load_json, save_json, KeyValueStore};

pub const SESSION_KEY: &str = "currentUser";

pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_PASSWORD: &str = "password";

/// What the two login forms submit.
#[derive(Debug, Clone)]
pub enum Credentials {
    Student { student_id: String },
    Admin { username: String, password: String },
}

/// Holds the active identity and mirrors it into the session record.
pub struct SessionStore {
    current: RwLock<Option<User>>,
    storage: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    /// Restore the previous session; a missing or unreadable record means
    /// nobody is signed in.
    pub fn restore(storage: Arc<dyn KeyValueStore>) -> Self {
        let current = match load_json::<User>(&*storage, SESSION_KEY) {
            Ok(Some(user)) => {
                info!(user = %user.id, "restored session");
                Some(user)
            }
            Ok(None) => None,
            Err(e) => {
                error!("failed to read session record: {e}");
                None
            }
        };
        Self { current: RwLock::new(current), storage }
    }

    pub fn current(&self) -> Option<User> {
        self.current.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Activate `id` under `role`. Students go through the directory; the
    /// admin only matches the fixed admin id.
    pub fn login(&self, role: Role, id: &str) -> bool {
        let user = match role {
            Role::Student => directory::resolve_student(id),
            Role::Admin if id == ADMIN_ID => Some(directory::admin_user()),
            _ => None,
        };
        match user {
            Some(user) => {
                info!(user = %user.id, ?role, "login");
                self.set(Some(user));
                true
            }
            None => false,
        }
    }

    /// Login surface: validates the form input, then calls [`Self::login`].
    pub fn sign_in(&self, credentials: Credentials) -> Result<User, AuthError> {
        match credentials {
            Credentials::Student { student_id } => {
                let id = student_id.trim().to_uppercase();
                if id.is_empty() {
                    return Err(ValidationError::EmptyStudentId.into());
                }
                if !self.login(Role::Student, &id) {
                    warn!(student_id = %id, "rejected student login");
                    return Err(AuthError::InvalidStudentId);
                }
            }
            Credentials::Admin { username, password } => {
                if username != ADMIN_USERNAME || password != ADMIN_PASSWORD || !self.login(Role::Admin, ADMIN_ID) {
                    warn!("rejected admin login");
                    return Err(AuthError::InvalidAdminCredentials);
                }
            }
        }
        self.current().ok_or(AuthError::NoSession)
    }

    pub fn logout(&self) {
        if let Some(user) = self.current() {
            info!(user = %user.id, "logout");
        }
        self.set(None);
    }

    /// Merge `update` into the active identity; id and role never change.
    pub fn update_profile(&self, update: ProfileUpdate) -> Result<User, AuthError> {
        let mut user = self.current().ok_or(AuthError::NoSession)?;
        if let Some(name) = update.name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(ValidationError::EmptyName.into());
            }
            user.name = name;
        }
        if let Some(v) = update.department { user.department = Some(v); }
        if let Some(v) = update.level { user.level = Some(v); }
        if let Some(v) = update.email { user.email = Some(v); }
        if let Some(v) = update.phone { user.phone = Some(v); }
        if let Some(v) = update.profile_picture_url { user.profile_picture_url = Some(v); }
        self.set(Some(user.clone()));
        Ok(user)
    }

    fn set(&self, user: Option<User>) {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let result = match &user {
            Some(u) => save_json(&*self.storage, SESSION_KEY, u),
            None => self.storage.remove(SESSION_KEY),
        };
        if let Err(e) = result {
            // keep the in-memory session even if the record could not be written
            error!("failed to write session record: {e}");
        }
        *current = user;
    }
}

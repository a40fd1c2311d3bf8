//! Fixed identity directory standing in for a user-management system.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::models::{Role, User};

pub const ADMIN_ID: &str = "admin01";

struct StudentRecord {
    name: &'static str,
    department: &'static str,
    level: u32,
    email: &'static str,
    phone: &'static str,
}

static STUDENTS: Lazy<HashMap<&'static str, StudentRecord>> = Lazy::new(|| {
    HashMap::from([
        ("U2021/5570009", StudentRecord { name: "Ada Okoro", department: "Computer Science", level: 300, email: "ada.okoro@csd.edu", phone: "08012345678" }),
        ("U2020/5512345", StudentRecord { name: "Bolanle Adeyemi", department: "Petroleum Engineering", level: 400, email: "bolanle.adeyemi@csd.edu", phone: "08023456789" }),
        ("U2022/5598765", StudentRecord { name: "Chukwudi Eze", department: "Medicine and Surgery", level: 200, email: "chukwudi.eze@csd.edu", phone: "08034567890" }),
        ("U2019/5545678", StudentRecord { name: "Fatima Sani", department: "Law", level: 500, email: "fatima.sani@csd.edu", phone: "08045678901" }),
        ("U2021/5570010", StudentRecord { name: "Emeka Nwosu", department: "Electrical Engineering", level: 300, email: "emeka.nwosu@csd.edu", phone: "08056789012" }),
    ])
});

fn picture_url(id: &str) -> String {
    format!("https://picsum.photos/seed/{id}/200")
}

pub fn admin_user() -> User {
    User {
        role: Role::Admin,
        id: ADMIN_ID.into(),
        name: "Dr. Amina Bello".into(),
        profile_picture_url: Some(picture_url(ADMIN_ID)),
        department: Some("Central Administration".into()),
        level: None,
        email: Some("amina.bello@csd.edu".into()),
        phone: Some("08098765432".into()),
    }
}

/// `U` + 4 digits + `/` + 7 digits, e.g. `U2021/5570009`.
pub fn is_plausible_student_id(id: &str) -> bool {
    let b = id.as_bytes();
    b.len() == 13
        && b[0] == b'U'
        && b[1..5].iter().all(u8::is_ascii_digit)
        && b[5] == b'/'
        && b[6..].iter().all(u8::is_ascii_digit)
}

fn generated_name(id: &str) -> String {
    // only called on plausible (ASCII) ids
    format!("Student {}", &id[id.len() - 4..])
}

fn known_student(id: &str) -> Option<User> {
    STUDENTS.get(id).map(|r| User {
        role: Role::Student,
        id: id.to_string(),
        name: r.name.into(),
        profile_picture_url: Some(picture_url(id)),
        department: Some(r.department.into()),
        level: Some(r.level),
        email: Some(r.email.into()),
        phone: Some(r.phone.into()),
    })
}

/// Resolve a student for login. Unknown ids of the right shape get a
/// placeholder profile so any plausible id can sign in.
pub fn resolve_student(id: &str) -> Option<User> {
    if let Some(user) = known_student(id) {
        return Some(user);
    }
    if !is_plausible_student_id(id) {
        return None;
    }
    Some(User {
        role: Role::Student,
        id: id.to_string(),
        name: generated_name(id),
        profile_picture_url: None,
        department: Some("Undeclared".into()),
        level: Some(100),
        email: Some(format!("{}@student.csd.edu", id.to_lowercase())),
        phone: Some("N/A".into()),
    })
}

/// Resolve any identity (admin included) for detail views.
pub fn resolve_any(id: &str) -> Option<User> {
    if id == ADMIN_ID {
        return Some(admin_user());
    }
    if let Some(user) = known_student(id) {
        return Some(user);
    }
    is_plausible_student_id(id).then(|| User {
        role: Role::Student,
        id: id.to_string(),
        name: generated_name(id),
        profile_picture_url: None,
        department: None,
        level: None,
        email: None,
        phone: None,
    })
}

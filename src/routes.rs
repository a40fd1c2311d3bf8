use std::sync::Arc;

use actix_multipart::Multipart;
use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{web, HttpResponse};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{NaiveDate, Utc};
use futures_util::TryStreamExt as _;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::assistant::{self, DescriptionAssistant};
use crate::complaints::{ComplaintStore, ATTACHMENT_SIZE_LIMIT};
use crate::directory;
use crate::error::{ApiError, AuthError, ValidationError};
use crate::models::*;
use crate::notify::{Notification, NotificationChannel};
use crate::reports::{self, Report, ReportFilter};
use crate::session::{Credentials, SessionStore};
use crate::storage::KeyValueStore;
use crate::views::{self, AdminQuery, Analytics, ComplaintCard, DueAlerts, SortOrder};

pub const PROFILE_PICTURE_SIZE_LIMIT: usize = 10 * 1024 * 1024; // 10 MB

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .service(
                web::resource("/session")
                    .route(web::get().to(get_session))
                    .route(web::delete().to(logout)),
            )
            .service(web::resource("/session/student").route(web::post().to(login_student)))
            .service(web::resource("/session/admin").route(web::post().to(login_admin)))
            .service(web::resource("/session/profile").route(web::patch().to(update_profile)))
            .service(web::resource("/session/profile/picture").route(web::post().to(upload_profile_picture)))
            .service(
                web::resource("/complaints")
                    .route(web::get().to(list_complaints))
                    .route(web::post().to(create_complaint)),
            )
            .service(web::resource("/complaints/{id}").route(web::get().to(get_complaint)))
            .service(web::resource("/complaints/{id}/status").route(web::patch().to(update_status)))
            .service(web::resource("/complaints/{id}/notes").route(web::put().to(update_notes)))
            .service(web::resource("/attachments").route(web::post().to(upload_attachment)))
            .service(web::resource("/my/complaints").route(web::get().to(my_complaints)))
            .service(web::resource("/alerts").route(web::get().to(get_alerts)))
            .service(web::resource("/analytics").route(web::get().to(get_analytics)))
            .service(web::resource("/reports").route(web::post().to(preview_report)))
            .service(web::resource("/reports/csv").route(web::post().to(export_csv)))
            .service(web::resource("/reports/print").route(web::post().to(print_report)))
            .service(web::resource("/assistant/describe").route(web::post().to(describe)))
            .service(
                web::resource("/notification")
                    .route(web::get().to(get_notification))
                    .route(web::delete().to(dismiss_notification)),
            ),
    );
}

#[derive(Clone)]
pub struct AppState {
    pub complaints: Arc<ComplaintStore>,
    pub session: Arc<SessionStore>,
    pub notifications: NotificationChannel,
    pub assistant: Arc<dyn DescriptionAssistant>,
}

impl AppState {
    /// Restore both stores from `storage`.
    pub fn new(storage: Arc<dyn KeyValueStore>, assistant: Arc<dyn DescriptionAssistant>) -> Self {
        Self {
            complaints: Arc::new(ComplaintStore::restore(storage.clone())),
            session: Arc::new(SessionStore::restore(storage)),
            notifications: NotificationChannel::new(),
            assistant,
        }
    }

    fn signed_in(&self) -> Result<User, ApiError> {
        self.session.current().ok_or_else(|| AuthError::NoSession.into())
    }

    // View gating only; the session is whatever this instance last signed in.
    fn signed_in_as(&self, role: Role) -> Result<User, ApiError> {
        let user = self.signed_in()?;
        if user.role != role {
            return Err(ApiError::Forbidden);
        }
        Ok(user)
    }

    fn publish_due_alerts(&self) {
        if let Some((message, severity)) = views::due_alerts(&self.complaints.all(), today()).message() {
            self.notifications.show(message, severity);
        }
    }
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

// ---------------- Session ----------------

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StudentLoginRequest {
    pub student_id: String,
}

#[derive(Deserialize, ToSchema)]
pub struct AdminLoginRequest {
    pub username: String,
    pub password: String,
}

#[utoipa::path(
    get,
    path = "/api/v1/session",
    responses(
        (status = 200, description = "Active identity", body = User),
        (status = 401, description = "Nobody signed in")
    )
)]
pub async fn get_session(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(data.signed_in()?))
}

#[utoipa::path(
    post,
    path = "/api/v1/session/student",
    request_body = StudentLoginRequest,
    responses(
        (status = 200, description = "Signed in", body = User),
        (status = 400, description = "Empty student id"),
        (status = 401, description = "Unknown or malformed student id")
    )
)]
pub async fn login_student(data: web::Data<AppState>, payload: web::Json<StudentLoginRequest>) -> Result<HttpResponse, ApiError> {
    let user = data.session.sign_in(Credentials::Student { student_id: payload.into_inner().student_id })?;
    Ok(HttpResponse::Ok().json(user))
}

#[utoipa::path(
    post,
    path = "/api/v1/session/admin",
    request_body = AdminLoginRequest,
    responses(
        (status = 200, description = "Signed in", body = User),
        (status = 401, description = "Invalid admin credentials")
    )
)]
pub async fn login_admin(data: web::Data<AppState>, payload: web::Json<AdminLoginRequest>) -> Result<HttpResponse, ApiError> {
    let AdminLoginRequest { username, password } = payload.into_inner();
    let user = data.session.sign_in(Credentials::Admin { username, password })?;
    Ok(HttpResponse::Ok().json(user))
}

#[utoipa::path(delete, path = "/api/v1/session", responses((status = 204, description = "Signed out")))]
pub async fn logout(data: web::Data<AppState>) -> HttpResponse {
    data.session.logout();
    HttpResponse::NoContent().finish()
}

#[utoipa::path(
    patch,
    path = "/api/v1/session/profile",
    request_body = ProfileUpdate,
    responses(
        (status = 200, description = "Updated identity", body = User),
        (status = 400, description = "Empty name"),
        (status = 401, description = "Nobody signed in")
    )
)]
pub async fn update_profile(data: web::Data<AppState>, payload: web::Json<ProfileUpdate>) -> Result<HttpResponse, ApiError> {
    let user = data.session.update_profile(payload.into_inner())?;
    data.notifications.success("Profile updated successfully!");
    Ok(HttpResponse::Ok().json(user))
}

#[utoipa::path(
    post,
    path = "/api/v1/session/profile/picture",
    request_body(content = String, content_type = "multipart/form-data", description = "Image in field `file`"),
    responses(
        (status = 200, description = "Updated identity", body = User),
        (status = 400, description = "Not an image or larger than 10MB"),
        (status = 401, description = "Nobody signed in")
    )
)]
pub async fn upload_profile_picture(data: web::Data<AppState>, payload: Multipart) -> Result<HttpResponse, ApiError> {
    data.signed_in()?;
    let upload = read_file_field(payload, PROFILE_PICTURE_SIZE_LIMIT).await?;
    if !upload.mime.starts_with("image/") {
        return Err(ValidationError::NotAnImage.into());
    }
    let update = ProfileUpdate { profile_picture_url: Some(upload.data_url()), ..ProfileUpdate::default() };
    let user = data.session.update_profile(update)?;
    data.notifications.success("Profile picture updated successfully!");
    Ok(HttpResponse::Ok().json(user))
}

// ---------------- Uploads ----------------

struct Upload {
    name: String,
    mime: String,
    bytes: Vec<u8>,
}

impl Upload {
    fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime, STANDARD.encode(&self.bytes))
    }

    fn into_attachment(self) -> Attachment {
        Attachment { data_url: self.data_url(), size: self.bytes.len() as u64, name: self.name, mime: self.mime }
    }
}

/// Read the multipart field named `file`, refusing anything over `limit` bytes.
async fn read_file_field(mut payload: Multipart, limit: usize) -> Result<Upload, ApiError> {
    while let Some(mut field) = payload.try_next().await.map_err(|e| {
        log::error!("multipart error: {e}");
        ApiError::BadRequest(ValidationError::MissingFile.to_string())
    })? {
        if field.content_disposition().get_name() != Some("file") {
            continue;
        }
        let name = field.content_disposition().get_filename().unwrap_or("upload").to_string();
        let declared = field.content_type().map(|m| m.essence_str().to_string());
        let mut bytes: Vec<u8> = Vec::new();
        while let Some(chunk) = field.try_next().await.map_err(|e| {
            log::error!("stream read error: {e}");
            ApiError::Internal
        })? {
            if bytes.len() + chunk.len() > limit {
                return Err(ValidationError::FileTooLarge { limit_mb: limit / (1024 * 1024) }.into());
            }
            bytes.extend_from_slice(&chunk);
        }
        // sniffed type wins over the declared one
        let mime = infer::get(&bytes)
            .map(|t| t.mime_type().to_string())
            .or(declared)
            .unwrap_or_else(|| "application/octet-stream".into());
        return Ok(Upload { name, mime, bytes });
    }
    Err(ValidationError::MissingFile.into())
}

#[utoipa::path(
    post,
    path = "/api/v1/attachments",
    request_body(content = String, content_type = "multipart/form-data", description = "File in field `file`"),
    responses(
        (status = 200, description = "Inline attachment", body = Attachment),
        (status = 400, description = "Missing file or larger than 5MB")
    )
)]
pub async fn upload_attachment(data: web::Data<AppState>, payload: Multipart) -> Result<HttpResponse, ApiError> {
    data.signed_in_as(Role::Student)?;
    let upload = read_file_field(payload, ATTACHMENT_SIZE_LIMIT).await?;
    Ok(HttpResponse::Ok().json(upload.into_attachment()))
}

// ---------------- Complaints ----------------

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ComplaintListQuery {
    /// Status label, or `All`.
    pub status: Option<String>,
    /// Category label, or `All`.
    pub category: Option<String>,
    pub search: Option<String>,
    pub sort: Option<SortOrder>,
}

fn parse_choice<T: std::str::FromStr<Err = UnknownVariant>>(raw: Option<String>) -> Result<Option<T>, ApiError> {
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) if v.eq_ignore_ascii_case("all") => Ok(None),
        Some(v) => v.parse().map(Some).map_err(|e: UnknownVariant| ApiError::BadRequest(e.to_string())),
    }
}

impl ComplaintListQuery {
    fn into_admin_query(self) -> Result<AdminQuery, ApiError> {
        Ok(AdminQuery {
            status: parse_choice(self.status)?,
            category: parse_choice(self.category)?,
            search: self.search.unwrap_or_default(),
            sort: self.sort.unwrap_or_default(),
        })
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/complaints",
    params(ComplaintListQuery),
    responses(
        (status = 200, description = "Admin dashboard list", body = [ComplaintCard]),
        (status = 400, description = "Unknown status or category"),
        (status = 403, description = "Admins only")
    )
)]
pub async fn list_complaints(data: web::Data<AppState>, query: web::Query<ComplaintListQuery>) -> Result<HttpResponse, ApiError> {
    data.signed_in_as(Role::Admin)?;
    let query = query.into_inner().into_admin_query()?;
    let list = views::admin_view(&data.complaints.all(), &query);
    data.publish_due_alerts();
    Ok(HttpResponse::Ok().json(views::cards(list, today(), true)))
}

#[utoipa::path(
    post,
    path = "/api/v1/complaints",
    request_body = NewComplaint,
    responses(
        (status = 201, description = "Complaint submitted", body = Complaint),
        (status = 400, description = "Empty description or oversize attachment"),
        (status = 403, description = "Students only")
    )
)]
pub async fn create_complaint(data: web::Data<AppState>, payload: web::Json<NewComplaint>) -> Result<HttpResponse, ApiError> {
    let student = data.signed_in_as(Role::Student)?;
    let complaint = data.complaints.create(&student, payload.into_inner())?;
    data.notifications.success("Complaint submitted successfully!");
    Ok(HttpResponse::Created().json(complaint))
}

/// Complaint detail; admins also get the owning student's profile.
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ComplaintDetail {
    #[serde(flatten)]
    pub complaint: Complaint,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student: Option<User>,
}

#[utoipa::path(
    get,
    path = "/api/v1/complaints/{id}",
    params(("id" = String, Path, description = "Complaint id")),
    responses(
        (status = 200, description = "Complaint detail", body = ComplaintDetail),
        (status = 404, description = "Complaint not found")
    )
)]
pub async fn get_complaint(data: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
    let user = data.signed_in()?;
    let id = path.into_inner();
    let detail = match user.role {
        Role::Admin => data.complaints.open_as_admin(&id).map(|complaint| ComplaintDetail {
            student: directory::resolve_any(&complaint.student_id),
            complaint,
        }),
        // students only ever see their own
        _ => data
            .complaints
            .get(&id)
            .filter(|c| c.student_id == user.id)
            .map(|complaint| ComplaintDetail { complaint, student: None }),
    };
    detail.map(|d| HttpResponse::Ok().json(d)).ok_or(ApiError::NotFound)
}

#[utoipa::path(
    patch,
    path = "/api/v1/complaints/{id}/status",
    params(("id" = String, Path, description = "Complaint id")),
    request_body = StatusUpdate,
    responses(
        (status = 200, description = "Updated complaint", body = Complaint),
        (status = 403, description = "Admins only"),
        (status = 404, description = "Complaint not found")
    )
)]
pub async fn update_status(
    data: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<StatusUpdate>,
) -> Result<HttpResponse, ApiError> {
    data.signed_in_as(Role::Admin)?;
    let id = path.into_inner();
    let StatusUpdate { status, due_date } = payload.into_inner();
    let complaint = data.complaints.update_status(&id, status, due_date).ok_or(ApiError::NotFound)?;
    data.notifications.success(format!("Complaint {id} updated successfully."));
    data.publish_due_alerts();
    Ok(HttpResponse::Ok().json(complaint))
}

#[utoipa::path(
    put,
    path = "/api/v1/complaints/{id}/notes",
    params(("id" = String, Path, description = "Complaint id")),
    request_body = NotesUpdate,
    responses(
        (status = 200, description = "Updated complaint", body = Complaint),
        (status = 403, description = "Admins only"),
        (status = 404, description = "Complaint not found")
    )
)]
pub async fn update_notes(
    data: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<NotesUpdate>,
) -> Result<HttpResponse, ApiError> {
    data.signed_in_as(Role::Admin)?;
    let id = path.into_inner();
    let complaint = data.complaints.update_notes(&id, payload.into_inner().notes).ok_or(ApiError::NotFound)?;
    data.notifications.success(format!("Notes for complaint {id} updated."));
    data.publish_due_alerts();
    Ok(HttpResponse::Ok().json(complaint))
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    pub search: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/v1/my/complaints",
    params(SearchQuery),
    responses(
        (status = 200, description = "The student's own complaints, newest first", body = [ComplaintCard]),
        (status = 403, description = "Students only")
    )
)]
pub async fn my_complaints(data: web::Data<AppState>, query: web::Query<SearchQuery>) -> Result<HttpResponse, ApiError> {
    let student = data.signed_in_as(Role::Student)?;
    let search = query.into_inner().search.unwrap_or_default();
    let list = views::student_view(&data.complaints.all(), &student.id, &search);
    Ok(HttpResponse::Ok().json(views::cards(list, today(), false)))
}

#[utoipa::path(
    get,
    path = "/api/v1/alerts",
    responses((status = 200, description = "Overdue and due-today complaint ids", body = DueAlerts))
)]
pub async fn get_alerts(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    data.signed_in_as(Role::Admin)?;
    Ok(HttpResponse::Ok().json(views::due_alerts(&data.complaints.all(), today())))
}

#[utoipa::path(
    get,
    path = "/api/v1/analytics",
    responses((status = 200, description = "Counts per category and status", body = Analytics))
)]
pub async fn get_analytics(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    data.signed_in_as(Role::Admin)?;
    Ok(HttpResponse::Ok().json(views::analytics(&data.complaints.all())))
}

// ---------------- Reports ----------------

fn build_report(data: &AppState, filter: ReportFilter) -> Result<Report, ApiError> {
    data.signed_in_as(Role::Admin)?;
    Ok(reports::generate(&data.complaints.all(), filter, Utc::now()))
}

#[utoipa::path(
    post,
    path = "/api/v1/reports",
    request_body = ReportFilter,
    responses((status = 200, description = "Report snapshot", body = Report))
)]
pub async fn preview_report(data: web::Data<AppState>, payload: web::Json<ReportFilter>) -> Result<HttpResponse, ApiError> {
    let report = build_report(&data, payload.into_inner())?;
    Ok(HttpResponse::Ok().json(report))
}

#[utoipa::path(
    post,
    path = "/api/v1/reports/csv",
    request_body = ReportFilter,
    responses((status = 200, description = "CSV download", content_type = "text/csv", body = String))
)]
pub async fn export_csv(data: web::Data<AppState>, payload: web::Json<ReportFilter>) -> Result<HttpResponse, ApiError> {
    let report = build_report(&data, payload.into_inner())?;
    let disposition = ContentDisposition {
        disposition: DispositionType::Attachment,
        parameters: vec![DispositionParam::Filename(report.csv_filename())],
    };
    Ok(HttpResponse::Ok()
        .content_type("text/csv; charset=utf-8")
        .insert_header(disposition)
        .body(report.to_csv()))
}

#[utoipa::path(
    post,
    path = "/api/v1/reports/print",
    request_body = ReportFilter,
    responses((status = 200, description = "Printable plain-text report", content_type = "text/plain", body = String))
)]
pub async fn print_report(data: web::Data<AppState>, payload: web::Json<ReportFilter>) -> Result<HttpResponse, ApiError> {
    let report = build_report(&data, payload.into_inner())?;
    Ok(HttpResponse::Ok().content_type("text/plain; charset=utf-8").body(report.render_print()))
}

// ---------------- Assistant ----------------

#[derive(Deserialize, ToSchema)]
pub struct DescribeRequest {
    pub keywords: String,
}

#[derive(Serialize, ToSchema)]
pub struct DescribeResponse {
    pub description: String,
}

#[utoipa::path(
    post,
    path = "/api/v1/assistant/describe",
    request_body = DescribeRequest,
    responses(
        (status = 200, description = "Drafted description", body = DescribeResponse),
        (status = 400, description = "Empty keywords"),
        (status = 502, description = "Assistant unavailable")
    )
)]
pub async fn describe(data: web::Data<AppState>, payload: web::Json<DescribeRequest>) -> Result<HttpResponse, ApiError> {
    data.signed_in_as(Role::Student)?;
    let description = assistant::describe_complaint(data.assistant.as_ref(), &payload.keywords).await?;
    Ok(HttpResponse::Ok().json(DescribeResponse { description }))
}

// ---------------- Notification ----------------

#[utoipa::path(
    get,
    path = "/api/v1/notification",
    responses((status = 200, description = "Current status message", body = Notification))
)]
pub async fn get_notification(data: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(data.notifications.current())
}

#[utoipa::path(delete, path = "/api/v1/notification", responses((status = 204, description = "Hidden")))]
pub async fn dismiss_notification(data: web::Data<AppState>) -> HttpResponse {
    data.notifications.hide();
    HttpResponse::NoContent().finish()
}

use crate::models::{Attachment, Complaint, ComplaintCategory, ComplaintStatus, HistoryEntry, NewComplaint, NotesUpdate, ProfileUpdate, Role, StatusUpdate, User};
use crate::notify::{Notification, Severity};
use crate::reports::{Report, ReportFilter};
use crate::views::{Analytics, ComplaintCard, DueAlerts, NamedCount, SortOrder, Summary};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::get_session,
        crate::routes::login_student,
        crate::routes::login_admin,
        crate::routes::logout,
        crate::routes::update_profile,
        crate::routes::upload_profile_picture,
        crate::routes::upload_attachment,
        crate::routes::list_complaints,
        crate::routes::create_complaint,
        crate::routes::get_complaint,
        crate::routes::update_status,
        crate::routes::update_notes,
        crate::routes::my_complaints,
        crate::routes::get_alerts,
        crate::routes::get_analytics,
        crate::routes::preview_report,
        crate::routes::export_csv,
        crate::routes::print_report,
        crate::routes::describe,
        crate::routes::get_notification,
        crate::routes::dismiss_notification,
    ),
    components(schemas(
        Role, User, ProfileUpdate, ComplaintStatus, ComplaintCategory, Attachment, HistoryEntry,
        Complaint, NewComplaint, StatusUpdate, NotesUpdate, Notification, Severity,
        Report, ReportFilter, Analytics, NamedCount, Summary, ComplaintCard, DueAlerts, SortOrder,
        crate::routes::StudentLoginRequest, crate::routes::AdminLoginRequest,
        crate::routes::DescribeRequest, crate::routes::DescribeResponse,
        crate::routes::ComplaintDetail
    )),
    tags(
        (name = "session", description = "Sign-in and profile"),
        (name = "complaints", description = "Complaint lifecycle"),
        (name = "reports", description = "Report snapshots and exports"),
    )
)]
pub struct ApiDoc;

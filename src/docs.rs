use crate::api::checkin::{EntryReq, ExitReq};
use crate::api::device::{AuthorizeDeviceReq, RenameDeviceReq, RevokeDevicesReq};
use crate::api::report::{
    AttendanceReportResponse, AttendanceReportRow, EmployeeSummary, SummaryResponse,
};
use crate::api::schedule::{CreateScheduleReq, ScheduleResponse};
use crate::api::users::{CreateUserReq, UserListResponse};
use crate::fingerprint::DeviceAttributes;
use crate::model::device::AuthorizedDevice;
use crate::model::user::User;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Time Clock API",
        version = "1.0.0",
        description = r#"
## Employee Time Clock

Backend for a small-business check-in/check-out kiosk and its admin dashboard.

### Key Features
- **Check-in / Check-out**
  - Per-request employee authentication, device-authorization gate, late/early classification
- **Account Management**
  - Admin-created accounts, soft deactivation
- **Schedules**
  - Per-employee entry/exit windows with a late-arrival grace period
- **Devices**
  - Fingerprint-based kiosk enrollment, targeted or mass revocation
- **Reports**
  - Classified attendance rows and per-employee summaries

### Security
Management endpoints require **JWT Bearer authentication** and the admin
role. Kiosk endpoints authenticate the employee on every request.

Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::checkin::check_in,
        crate::api::checkin::check_out,

        crate::api::users::create_user,
        crate::api::users::list_users,
        crate::api::users::get_user,
        crate::api::users::update_user,
        crate::api::users::deactivate_user,

        crate::api::schedule::create_schedule,
        crate::api::schedule::list_schedules,
        crate::api::schedule::deactivate_schedule,

        crate::api::device::authorize_device,
        crate::api::device::list_devices,
        crate::api::device::revoke_devices,
        crate::api::device::rename_device,
        crate::api::device::delete_device,

        crate::api::report::attendance_report,
        crate::api::report::attendance_summary
    ),
    components(
        schemas(
            DeviceAttributes,
            EntryReq,
            ExitReq,
            CreateUserReq,
            User,
            UserListResponse,
            CreateScheduleReq,
            ScheduleResponse,
            AuthorizeDeviceReq,
            RevokeDevicesReq,
            RenameDeviceReq,
            AuthorizedDevice,
            AttendanceReportRow,
            AttendanceReportResponse,
            EmployeeSummary,
            SummaryResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Checkin", description = "Kiosk check-in and check-out"),
        (name = "Users", description = "Account management APIs"),
        (name = "Schedules", description = "Work schedule APIs"),
        (name = "Devices", description = "Kiosk device authorization APIs"),
        (name = "Reports", description = "Attendance review APIs"),
    )
)]
pub struct ApiDoc;

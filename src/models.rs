use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::permissions::PermissionSet;

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// Canonical identity record from the `users` table. The password hash never
/// leaves the server: it is skipped during serialization.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    #[ts(skip)]
    #[schema(ignore)]
    pub password_hash: String,
    pub role_id: Option<Uuid>,
    pub position_id: Option<Uuid>,
    pub profile_picture: Option<String>,
    // 'active' or 'inactive'. Inactive users cannot log in.
    pub status: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// Role
///
/// A named collection of permissions. Users reference a role; the matrix
/// rows in `role_permissions` spell out what the role may do.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Role {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
}

/// RolePermission
///
/// One authorization matrix cell: what a single role may do within a single
/// module. At most one row exists per (role, module_name).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct RolePermission {
    pub id: Uuid,
    pub role_id: Uuid,
    pub module_name: String,
    pub can_view: bool,
    pub can_create: bool,
    pub can_edit: bool,
    pub can_delete: bool,
}

impl RolePermission {
    pub fn permissions(&self) -> PermissionSet {
        PermissionSet {
            can_view: self.can_view,
            can_create: self.can_create,
            can_edit: self.can_edit,
            can_delete: self.can_delete,
        }
    }
}

/// Position
///
/// A named title (jabatan). Referenced by users as their primary position
/// and optionally per membership row.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Position {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
}

/// Division
///
/// An organizational sub-unit. Related to prokers via the `proker_division`
/// pivot and to users through `proker_anggota.division_id`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Division {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
}

/// Proker
///
/// A tracked organizational project/event ("program kerja").
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Proker {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub date: NaiveDate,
    pub location: Option<String>,
    // 'planned', 'ongoing' or 'done'.
    pub status: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// ProkerAnggota
///
/// A membership join row linking a user to a proker. division_id and
/// position_id describe the member's role inside this specific proker,
/// independent of the user's primary division/position. There is no
/// uniqueness constraint on (proker_id, user_id): the same user may appear
/// under several role labels.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct ProkerAnggota {
    pub id: Uuid,
    pub proker_id: Uuid,
    pub user_id: Uuid,
    pub division_id: Option<Uuid>,
    pub position_id: Option<Uuid>,
    // Free-text role label within the proker, e.g. "Koordinator".
    pub role: Option<String>,
}

/// AnggotaWithUser
///
/// Membership row enriched with the member's name and email (a join), the
/// shape the proker detail view renders.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct AnggotaWithUser {
    pub id: Uuid,
    pub proker_id: Uuid,
    pub user_id: Uuid,
    pub division_id: Option<Uuid>,
    pub position_id: Option<Uuid>,
    pub role: Option<String>,
    pub user_name: String,
    pub user_email: String,
}

/// ProkerMedia
///
/// Gallery entry owned by one proker. Media are external URLs, not managed
/// uploads.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct ProkerMedia {
    pub id: Uuid,
    pub proker_id: Uuid,
    // 'image' or 'video'.
    pub media_type: String,
    pub media_url: String,
    pub caption: Option<String>,
}

/// Message
///
/// A contact-form message from the public site.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Message {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub subject: Option<String>,
    pub content: String,
    // 'unread', 'read' or 'archived'.
    pub status: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// Transaction
///
/// A finance ledger entry, either income or expense.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Transaction {
    pub id: Uuid,
    /// 'income' or 'expense'. The SQL column is "type", a reserved keyword
    /// in Rust, hence the dual rename.
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub transaction_type: String,
    pub amount: f64,
    pub description: String,
    pub date: NaiveDate,
    pub created_by: Option<Uuid>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// Setting
///
/// A single key-value pair of organization-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Setting {
    pub key: String,
    pub value: String,
}

/// AuditLogEntry
///
/// One append-only "who did what" record, enriched with the actor's name
/// when the actor still exists.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct AuditLogEntry {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    #[sqlx(default)]
    pub user_name: Option<String>,
    pub action: String,
    pub description: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

// --- Aggregates (explicit fetch shapes, assembled by the repository) ---

/// UserWithRole
///
/// A user with role, primary position and the role's full permission matrix
/// loaded. This is the principal shape: the auth extractor resolves it fresh
/// per request, and login/me return it.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UserWithRole {
    pub user: User,
    pub role: Option<Role>,
    pub position: Option<Position>,
    pub permissions: Vec<RolePermission>,
}

/// ProkerDetail
///
/// A proker with all of its associations loaded: divisions, media and
/// memberships with member names. The fetch shape is fixed here rather than
/// assembled ad hoc per call site.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ProkerDetail {
    pub proker: Proker,
    pub divisions: Vec<Division>,
    pub media: Vec<ProkerMedia>,
    pub anggota: Vec<AnggotaWithUser>,
}

/// RoleWithPermissions
///
/// A role plus its matrix rows, the shape the settings page edits.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct RoleWithPermissions {
    pub role: Role,
    pub permissions: Vec<RolePermission>,
}

/// Paginated
///
/// Standard list envelope: one page of rows plus the total row count.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
}

// --- Request Payloads (Input Schemas) ---

/// LoginRequest
///
/// The identifier matches either username or email.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// LoginResponse
///
/// The authenticated principal plus the freshly minted opaque bearer token.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LoginResponse {
    pub user: UserWithRole,
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateProfileRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// CreateUserRequest
///
/// Admin-side user creation payload. The password arrives in clear and is
/// argon2-hashed before persistence.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateUserRequest {
    pub name: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub role_id: Option<Uuid>,
    pub position_id: Option<Uuid>,
    pub profile_picture: Option<String>,
    pub status: Option<String>,
}

/// UpdateUserRequest
///
/// Partial update: only provided fields change. A provided password is
/// re-hashed.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateUserRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateDivisionRequest {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreatePositionRequest {
    pub name: String,
    pub description: Option<String>,
}

/// AnggotaInput
///
/// Input for one membership row, used both inside proker creation and by
/// the standalone add-anggota endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct AnggotaInput {
    pub user_id: Uuid,
    pub role: Option<String>,
    pub division_id: Option<Uuid>,
    pub position_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateProkerRequest {
    pub title: String,
    pub description: Option<String>,
    pub date: NaiveDate,
    pub location: Option<String>,
    pub status: Option<String>,
    pub division_ids: Vec<Uuid>,
    pub anggota: Option<Vec<AnggotaInput>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateProkerRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// When present, the proker's division set is replaced with exactly
    /// this list (empty clears all).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub division_ids: Option<Vec<Uuid>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct AddMediaRequest {
    pub media_type: String,
    pub media_url: String,
    pub caption: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateMessageRequest {
    pub name: String,
    pub email: String,
    pub subject: Option<String>,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateMessageStatusRequest {
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateTransactionRequest {
    #[serde(rename = "type")]
    pub transaction_type: String,
    pub amount: f64,
    pub description: String,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateTransactionRequest {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub transaction_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
}

/// PermissionEntry
///
/// One row of a role's replacement matrix in the settings editor.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct PermissionEntry {
    pub module_name: String,
    pub can_view: bool,
    pub can_create: bool,
    pub can_edit: bool,
    pub can_delete: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateRolePermissionsRequest {
    pub permissions: Vec<PermissionEntry>,
}

// --- Dashboard & Statistics Schemas (Output) ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct MessageStats {
    pub total: i64,
    pub unread: i64,
    pub read: i64,
    pub archived: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct TransactionStats {
    pub total_income: f64,
    pub total_expense: f64,
    pub balance: f64,
}

/// MonthlyTransaction
///
/// One month of the income/expense trend, month formatted "YYYY-MM".
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct MonthlyTransaction {
    pub month: String,
    pub income: f64,
    pub expense: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ProkerStatusBreakdown {
    pub planned: i64,
    pub ongoing: i64,
    pub done: i64,
}

/// ProkerWithDivisions
///
/// Listing shape: a proker plus its division set, without the heavier media
/// and membership loads of the detail view.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ProkerWithDivisions {
    pub proker: Proker,
    pub divisions: Vec<Division>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct DivisionMemberCount {
    pub name: String,
    pub count: i64,
}

/// DashboardStats
///
/// Everything the dashboard page renders, compiled in one call.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct DashboardStats {
    pub total_users: i64,
    pub total_divisions: i64,
    pub total_prokers: i64,
    pub unread_messages: i64,
    pub balance: f64,
    pub total_income: f64,
    pub total_expense: f64,
    pub proker_status: ProkerStatusBreakdown,
    pub recent_prokers: Vec<ProkerWithDivisions>,
    pub recent_messages: Vec<Message>,
    pub users_by_division: Vec<DivisionMemberCount>,
    pub transaction_trend: Vec<MonthlyTransaction>,
}

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use osis_panel::{
    AppState,
    auth::AuthUser,
    config::AppConfig,
    models::{
        AddMediaRequest, AnggotaInput, AnggotaWithUser, AuditLogEntry, CreateMessageRequest,
        CreateProkerRequest, CreateTransactionRequest, CreateUserRequest, DashboardStats,
        Division, DivisionMemberCount, Message, MessageStats, MonthlyTransaction, Paginated,
        PermissionEntry, Position, Proker, ProkerDetail, ProkerMedia, ProkerWithDivisions, Role,
        RolePermission, RoleWithPermissions, Setting, Transaction, TransactionStats,
        UpdateProfileRequest, UpdateProkerRequest, UpdateTransactionRequest, UpdateUserRequest,
        User, UserWithRole,
    },
    repository::Repository,
};
use uuid::Uuid;

type Result<T> = std::result::Result<T, sqlx::Error>;

pub const TEST_USER_ID: Uuid = Uuid::from_u128(123);
pub const TEST_PROKER_ID: Uuid = Uuid::from_u128(777);

// --- MOCK REPOSITORY IMPLEMENTATION ---

// Central control point for handler tests. Handlers depend on the Repository
// trait, so tests substitute this canned implementation and assert on what
// the handler did with the results.
pub struct MockRepoControl {
    // Pre-canned outputs for handler requests
    pub user_by_identifier: Option<User>,
    pub principal_to_return: Option<UserWithRole>,
    pub token_user: Option<Uuid>,
    pub users_to_return: Vec<User>,
    pub user_to_return: Option<User>,
    pub proker_to_return: Option<Proker>,
    pub proker_detail_to_return: Option<ProkerDetail>,
    pub message_to_return: Option<Message>,
    pub transaction_to_return: Option<Transaction>,

    // Probe results controlling validation branches
    pub username_taken_result: bool,
    pub email_taken_result: bool,
    pub role_exists_result: bool,
    pub position_exists_result: bool,
    pub division_exists_result: bool,

    // Ownership-checked delete outcomes
    pub delete_result: bool,
    pub remove_anggota_result: bool,
    pub remove_media_result: bool,

    // Records every audit append so tests can verify the trail
    pub audit_actions: Mutex<Vec<String>>,
    // Records memberships added through add_anggota
    pub added_anggota: Mutex<Vec<AnggotaInput>>,
    // Records every division-set replacement requested via update_proker
    pub replaced_divisions: Mutex<Vec<Vec<Uuid>>>,
}

impl Default for MockRepoControl {
    fn default() -> Self {
        MockRepoControl {
            user_by_identifier: None,
            principal_to_return: None,
            token_user: None,
            users_to_return: vec![],
            user_to_return: Some(User::default()),
            proker_to_return: Some(Proker::default()),
            proker_detail_to_return: Some(ProkerDetail::default()),
            message_to_return: Some(Message::default()),
            transaction_to_return: Some(Transaction::default()),
            username_taken_result: false,
            email_taken_result: false,
            role_exists_result: true,
            position_exists_result: true,
            division_exists_result: true,
            delete_result: true,
            remove_anggota_result: true,
            remove_media_result: true,
            audit_actions: Mutex::new(vec![]),
            added_anggota: Mutex::new(vec![]),
            replaced_divisions: Mutex::new(vec![]),
        }
    }
}

impl MockRepoControl {
    pub fn audited(&self) -> Vec<String> {
        self.audit_actions.lock().unwrap().clone()
    }
}

#[async_trait]
impl Repository for MockRepoControl {
    // --- Identity & Session ---
    async fn find_user_by_identifier(&self, _identifier: &str) -> Result<Option<User>> {
        Ok(self.user_by_identifier.clone())
    }
    async fn get_user_with_role(&self, _id: Uuid) -> Result<Option<UserWithRole>> {
        Ok(self.principal_to_return.clone())
    }
    async fn insert_token(&self, _token: &str, _user_id: Uuid) -> Result<()> {
        Ok(())
    }
    async fn find_token_user(&self, _token: &str) -> Result<Option<Uuid>> {
        Ok(self.token_user)
    }
    async fn delete_token(&self, _token: &str) -> Result<bool> {
        Ok(self.delete_result)
    }
    async fn update_password(&self, _user_id: Uuid, _password_hash: &str) -> Result<()> {
        Ok(())
    }
    async fn update_profile(
        &self,
        _user_id: Uuid,
        _req: UpdateProfileRequest,
    ) -> Result<Option<User>> {
        Ok(self.user_to_return.clone())
    }

    // --- Users ---
    async fn list_users(
        &self,
        _role_id: Option<Uuid>,
        _division_id: Option<Uuid>,
        _status: Option<String>,
        _search: Option<String>,
        page: i64,
        per_page: i64,
    ) -> Result<Paginated<User>> {
        Ok(Paginated {
            data: self.users_to_return.clone(),
            total: self.users_to_return.len() as i64,
            page,
            per_page,
        })
    }
    async fn get_user(&self, _id: Uuid) -> Result<Option<User>> {
        Ok(self.user_to_return.clone())
    }
    async fn username_taken(&self, _username: &str, _exclude: Option<Uuid>) -> Result<bool> {
        Ok(self.username_taken_result)
    }
    async fn email_taken(&self, _email: &str, _exclude: Option<Uuid>) -> Result<bool> {
        Ok(self.email_taken_result)
    }
    async fn create_user(&self, req: CreateUserRequest, _password_hash: String) -> Result<User> {
        Ok(User {
            id: Uuid::new_v4(),
            name: req.name,
            username: req.username,
            email: req.email,
            ..User::default()
        })
    }
    async fn update_user(
        &self,
        _id: Uuid,
        _req: UpdateUserRequest,
        _password_hash: Option<String>,
    ) -> Result<Option<User>> {
        Ok(self.user_to_return.clone())
    }
    async fn delete_user(&self, _id: Uuid) -> Result<bool> {
        Ok(self.delete_result)
    }
    async fn user_prokers(&self, _user_id: Uuid) -> Result<Vec<Proker>> {
        Ok(vec![])
    }

    // --- Roles & permission matrix ---
    async fn list_roles_with_permissions(&self) -> Result<Vec<RoleWithPermissions>> {
        Ok(vec![])
    }
    async fn role_exists(&self, _id: Uuid) -> Result<bool> {
        Ok(self.role_exists_result)
    }
    async fn replace_role_permissions(
        &self,
        role_id: Uuid,
        entries: Vec<PermissionEntry>,
    ) -> Result<Vec<RolePermission>> {
        Ok(entries
            .into_iter()
            .map(|entry| RolePermission {
                id: Uuid::new_v4(),
                role_id,
                module_name: entry.module_name,
                can_view: entry.can_view,
                can_create: entry.can_create,
                can_edit: entry.can_edit,
                can_delete: entry.can_delete,
            })
            .collect())
    }

    // --- Positions ---
    async fn list_positions(&self) -> Result<Vec<Position>> {
        Ok(vec![])
    }
    async fn position_exists(&self, _id: Uuid) -> Result<bool> {
        Ok(self.position_exists_result)
    }
    async fn position_name_taken(&self, _name: &str, _exclude: Option<Uuid>) -> Result<bool> {
        Ok(false)
    }
    async fn create_position(
        &self,
        name: String,
        description: Option<String>,
    ) -> Result<Position> {
        Ok(Position {
            id: Uuid::new_v4(),
            name,
            description,
        })
    }
    async fn update_position(
        &self,
        id: Uuid,
        name: String,
        description: Option<String>,
    ) -> Result<Option<Position>> {
        Ok(Some(Position {
            id,
            name,
            description,
        }))
    }
    async fn delete_position(&self, _id: Uuid) -> Result<bool> {
        Ok(self.delete_result)
    }

    // --- Divisions ---
    async fn list_divisions(&self) -> Result<Vec<Division>> {
        Ok(vec![Division::default()])
    }
    async fn division_exists(&self, _id: Uuid) -> Result<bool> {
        Ok(self.division_exists_result)
    }
    async fn create_division(
        &self,
        name: String,
        description: Option<String>,
    ) -> Result<Division> {
        Ok(Division {
            id: Uuid::new_v4(),
            name,
            description,
        })
    }
    async fn update_division(
        &self,
        id: Uuid,
        name: String,
        description: Option<String>,
    ) -> Result<Option<Division>> {
        Ok(Some(Division {
            id,
            name,
            description,
        }))
    }
    async fn delete_division(&self, _id: Uuid) -> Result<bool> {
        Ok(self.delete_result)
    }

    // --- Prokers ---
    async fn list_prokers(
        &self,
        _division_id: Option<Uuid>,
        _status: Option<String>,
        _search: Option<String>,
        page: i64,
        per_page: i64,
    ) -> Result<Paginated<ProkerWithDivisions>> {
        Ok(Paginated {
            data: vec![],
            total: 0,
            page,
            per_page,
        })
    }
    async fn get_proker(&self, _id: Uuid) -> Result<Option<Proker>> {
        Ok(self.proker_to_return.clone())
    }
    async fn get_proker_detail(&self, _id: Uuid) -> Result<Option<ProkerDetail>> {
        Ok(self.proker_detail_to_return.clone())
    }
    async fn create_proker(&self, req: CreateProkerRequest) -> Result<Proker> {
        for anggota in req.anggota.unwrap_or_default() {
            self.added_anggota.lock().unwrap().push(anggota);
        }
        Ok(Proker {
            id: TEST_PROKER_ID,
            title: req.title,
            ..Proker::default()
        })
    }
    async fn update_proker(
        &self,
        _id: Uuid,
        req: UpdateProkerRequest,
    ) -> Result<Option<Proker>> {
        if let Some(division_ids) = req.division_ids {
            self.replaced_divisions.lock().unwrap().push(division_ids);
        }
        Ok(self.proker_to_return.clone())
    }
    async fn delete_proker(&self, _id: Uuid) -> Result<bool> {
        Ok(self.delete_result)
    }
    async fn add_anggota(
        &self,
        proker_id: Uuid,
        input: AnggotaInput,
    ) -> Result<AnggotaWithUser> {
        self.added_anggota.lock().unwrap().push(input.clone());
        Ok(AnggotaWithUser {
            id: Uuid::new_v4(),
            proker_id,
            user_id: input.user_id,
            division_id: input.division_id,
            position_id: input.position_id,
            role: input.role,
            user_name: "Test Member".to_string(),
            user_email: "member@example.com".to_string(),
        })
    }
    async fn remove_anggota(&self, _proker_id: Uuid, _anggota_id: Uuid) -> Result<bool> {
        Ok(self.remove_anggota_result)
    }
    async fn add_media(&self, proker_id: Uuid, req: AddMediaRequest) -> Result<ProkerMedia> {
        Ok(ProkerMedia {
            id: Uuid::new_v4(),
            proker_id,
            media_type: req.media_type,
            media_url: req.media_url,
            caption: req.caption,
        })
    }
    async fn remove_media(&self, _proker_id: Uuid, _media_id: Uuid) -> Result<bool> {
        Ok(self.remove_media_result)
    }
    async fn list_public_media(&self) -> Result<Vec<ProkerMedia>> {
        Ok(vec![])
    }

    // --- Messages ---
    async fn create_message(&self, req: CreateMessageRequest) -> Result<Message> {
        Ok(Message {
            id: Uuid::new_v4(),
            name: req.name,
            email: req.email,
            subject: req.subject,
            content: req.content,
            status: "unread".to_string(),
            ..Message::default()
        })
    }
    async fn list_messages(
        &self,
        _status: Option<String>,
        page: i64,
        per_page: i64,
    ) -> Result<Paginated<Message>> {
        Ok(Paginated {
            data: vec![],
            total: 0,
            page,
            per_page,
        })
    }
    async fn get_message(&self, _id: Uuid) -> Result<Option<Message>> {
        Ok(self.message_to_return.clone())
    }
    async fn update_message_status(&self, _id: Uuid, status: String) -> Result<Option<Message>> {
        Ok(self.message_to_return.clone().map(|mut message| {
            message.status = status;
            message
        }))
    }
    async fn delete_message(&self, _id: Uuid) -> Result<bool> {
        Ok(self.delete_result)
    }
    async fn message_stats(&self) -> Result<MessageStats> {
        Ok(MessageStats::default())
    }

    // --- Transactions ---
    async fn list_transactions(
        &self,
        _transaction_type: Option<String>,
        page: i64,
        per_page: i64,
    ) -> Result<Paginated<Transaction>> {
        Ok(Paginated {
            data: vec![],
            total: 0,
            page,
            per_page,
        })
    }
    async fn get_transaction(&self, _id: Uuid) -> Result<Option<Transaction>> {
        Ok(self.transaction_to_return.clone())
    }
    async fn create_transaction(
        &self,
        req: CreateTransactionRequest,
        created_by: Option<Uuid>,
    ) -> Result<Transaction> {
        Ok(Transaction {
            id: Uuid::new_v4(),
            transaction_type: req.transaction_type,
            amount: req.amount,
            description: req.description,
            date: req.date,
            created_by,
            ..Transaction::default()
        })
    }
    async fn update_transaction(
        &self,
        _id: Uuid,
        _req: UpdateTransactionRequest,
    ) -> Result<Option<Transaction>> {
        Ok(self.transaction_to_return.clone())
    }
    async fn delete_transaction(&self, _id: Uuid) -> Result<bool> {
        Ok(self.delete_result)
    }
    async fn transaction_stats(&self) -> Result<TransactionStats> {
        Ok(TransactionStats::default())
    }
    async fn monthly_transactions(&self) -> Result<Vec<MonthlyTransaction>> {
        Ok(vec![])
    }

    // --- Settings ---
    async fn list_settings(&self) -> Result<Vec<Setting>> {
        Ok(vec![])
    }
    async fn upsert_settings(&self, values: BTreeMap<String, String>) -> Result<Vec<Setting>> {
        Ok(values
            .into_iter()
            .map(|(key, value)| Setting { key, value })
            .collect())
    }

    // --- Audit trail ---
    async fn append_audit(
        &self,
        _user_id: Option<Uuid>,
        action: &str,
        _description: &str,
    ) -> Result<()> {
        self.audit_actions.lock().unwrap().push(action.to_string());
        Ok(())
    }
    async fn list_audit_logs(&self, _limit: i64) -> Result<Vec<AuditLogEntry>> {
        Ok(vec![])
    }

    // --- Dashboard ---
    async fn dashboard_stats(&self) -> Result<DashboardStats> {
        Ok(DashboardStats::default())
    }
}

// --- TEST UTILITIES ---

/// Wraps mock components into the shared application state.
pub fn create_test_state(repo_control: Arc<MockRepoControl>) -> AppState {
    AppState {
        repo: repo_control,
        config: AppConfig::default(),
    }
}

fn matrix_row(module: &str, view: bool, create: bool, edit: bool, delete: bool) -> RolePermission {
    RolePermission {
        id: Uuid::new_v4(),
        role_id: Uuid::from_u128(1),
        module_name: module.to_string(),
        can_view: view,
        can_create: create,
        can_edit: edit,
        can_delete: delete,
    }
}

/// Principal whose role grants everything on the given modules.
pub fn principal_with_full_access(module_names: &[&str]) -> UserWithRole {
    UserWithRole {
        user: User {
            id: TEST_USER_ID,
            name: "Test User".to_string(),
            username: "testuser".to_string(),
            email: "test@example.com".to_string(),
            status: "active".to_string(),
            ..User::default()
        },
        role: Some(Role {
            id: Uuid::from_u128(1),
            name: "Test Role".to_string(),
            description: None,
        }),
        position: None,
        permissions: module_names
            .iter()
            .map(|module| matrix_row(module, true, true, true, true))
            .collect(),
    }
}

/// Principal with a view-only grant on the given modules.
pub fn principal_with_view_only(module_names: &[&str]) -> UserWithRole {
    let mut principal = principal_with_full_access(&[]);
    principal.permissions = module_names
        .iter()
        .map(|module| matrix_row(module, true, false, false, false))
        .collect();
    principal
}

pub fn auth_user(principal: UserWithRole) -> AuthUser {
    AuthUser { principal }
}

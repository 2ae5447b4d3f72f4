use crate::models::{
    AddMediaRequest, AnggotaInput, AnggotaWithUser, AuditLogEntry, CreateMessageRequest,
    CreateProkerRequest, CreateTransactionRequest, CreateUserRequest, DashboardStats, Division,
    DivisionMemberCount, Message, MessageStats, MonthlyTransaction, Paginated, PermissionEntry,
    Position, Proker, ProkerDetail, ProkerMedia, ProkerStatusBreakdown, ProkerWithDivisions, Role,
    RolePermission, RoleWithPermissions, Setting, Transaction, TransactionStats,
    UpdateProfileRequest, UpdateProkerRequest, UpdateTransactionRequest, UpdateUserRequest, User,
    UserWithRole,
};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use sqlx::{PgPool, query_builder::QueryBuilder};
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

type Result<T> = std::result::Result<T, sqlx::Error>;

/// Repository Trait
///
/// Abstract contract for all persistence operations. Handlers depend on this
/// trait, never on Postgres directly, so tests can substitute an in-memory
/// mock. `Send + Sync + async_trait` make `Arc<dyn Repository>` shareable
/// across Axum's task boundaries.
///
/// Methods return `Result<_, sqlx::Error>`; absent rows are `Ok(None)`, and
/// ownership-checked deletes report `Ok(false)` when nothing matched.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Identity & Session ---
    /// Looks a user up by username OR email, for login.
    async fn find_user_by_identifier(&self, identifier: &str) -> Result<Option<User>>;
    /// The principal aggregate: user + role + position + permission matrix.
    async fn get_user_with_role(&self, id: Uuid) -> Result<Option<UserWithRole>>;
    async fn insert_token(&self, token: &str, user_id: Uuid) -> Result<()>;
    /// Resolves an opaque bearer token to the owning user id.
    async fn find_token_user(&self, token: &str) -> Result<Option<Uuid>>;
    async fn delete_token(&self, token: &str) -> Result<bool>;
    async fn update_password(&self, user_id: Uuid, password_hash: &str) -> Result<()>;
    async fn update_profile(
        &self,
        user_id: Uuid,
        req: UpdateProfileRequest,
    ) -> Result<Option<User>>;

    // --- Users ---
    async fn list_users(
        &self,
        role_id: Option<Uuid>,
        division_id: Option<Uuid>,
        status: Option<String>,
        search: Option<String>,
        page: i64,
        per_page: i64,
    ) -> Result<Paginated<User>>;
    async fn get_user(&self, id: Uuid) -> Result<Option<User>>;
    /// Uniqueness probes; `exclude` skips the row being edited.
    async fn username_taken(&self, username: &str, exclude: Option<Uuid>) -> Result<bool>;
    async fn email_taken(&self, email: &str, exclude: Option<Uuid>) -> Result<bool>;
    async fn create_user(&self, req: CreateUserRequest, password_hash: String) -> Result<User>;
    async fn update_user(
        &self,
        id: Uuid,
        req: UpdateUserRequest,
        password_hash: Option<String>,
    ) -> Result<Option<User>>;
    async fn delete_user(&self, id: Uuid) -> Result<bool>;
    /// Prokers the user holds memberships in, for the user detail view.
    async fn user_prokers(&self, user_id: Uuid) -> Result<Vec<Proker>>;

    // --- Roles & permission matrix ---
    async fn list_roles_with_permissions(&self) -> Result<Vec<RoleWithPermissions>>;
    async fn role_exists(&self, id: Uuid) -> Result<bool>;
    /// Replaces the role's full matrix in one transaction.
    async fn replace_role_permissions(
        &self,
        role_id: Uuid,
        entries: Vec<PermissionEntry>,
    ) -> Result<Vec<RolePermission>>;

    // --- Positions ---
    async fn list_positions(&self) -> Result<Vec<Position>>;
    async fn position_exists(&self, id: Uuid) -> Result<bool>;
    async fn position_name_taken(&self, name: &str, exclude: Option<Uuid>) -> Result<bool>;
    async fn create_position(&self, name: String, description: Option<String>) -> Result<Position>;
    async fn update_position(
        &self,
        id: Uuid,
        name: String,
        description: Option<String>,
    ) -> Result<Option<Position>>;
    async fn delete_position(&self, id: Uuid) -> Result<bool>;

    // --- Divisions ---
    async fn list_divisions(&self) -> Result<Vec<Division>>;
    async fn division_exists(&self, id: Uuid) -> Result<bool>;
    async fn create_division(&self, name: String, description: Option<String>) -> Result<Division>;
    async fn update_division(
        &self,
        id: Uuid,
        name: String,
        description: Option<String>,
    ) -> Result<Option<Division>>;
    async fn delete_division(&self, id: Uuid) -> Result<bool>;

    // --- Prokers ---
    async fn list_prokers(
        &self,
        division_id: Option<Uuid>,
        status: Option<String>,
        search: Option<String>,
        page: i64,
        per_page: i64,
    ) -> Result<Paginated<ProkerWithDivisions>>;
    async fn get_proker(&self, id: Uuid) -> Result<Option<Proker>>;
    /// Fully populated aggregate: divisions + media + memberships-with-user.
    async fn get_proker_detail(&self, id: Uuid) -> Result<Option<ProkerDetail>>;
    /// Inserts the proker, its division set and any initial memberships in
    /// one transaction.
    async fn create_proker(&self, req: CreateProkerRequest) -> Result<Proker>;
    /// A present `division_ids` set-replaces the proker<->division
    /// associations: duplicates collapse and an empty list clears all rows.
    async fn update_proker(&self, id: Uuid, req: UpdateProkerRequest) -> Result<Option<Proker>>;
    async fn delete_proker(&self, id: Uuid) -> Result<bool>;
    async fn add_anggota(&self, proker_id: Uuid, input: AnggotaInput) -> Result<AnggotaWithUser>;
    /// Deletes only when the membership belongs to the given proker.
    async fn remove_anggota(&self, proker_id: Uuid, anggota_id: Uuid) -> Result<bool>;
    async fn add_media(&self, proker_id: Uuid, req: AddMediaRequest) -> Result<ProkerMedia>;
    async fn remove_media(&self, proker_id: Uuid, media_id: Uuid) -> Result<bool>;
    /// Gallery feed: media belonging to finished prokers, newest first.
    async fn list_public_media(&self) -> Result<Vec<ProkerMedia>>;

    // --- Messages ---
    async fn create_message(&self, req: CreateMessageRequest) -> Result<Message>;
    async fn list_messages(
        &self,
        status: Option<String>,
        page: i64,
        per_page: i64,
    ) -> Result<Paginated<Message>>;
    async fn get_message(&self, id: Uuid) -> Result<Option<Message>>;
    async fn update_message_status(&self, id: Uuid, status: String) -> Result<Option<Message>>;
    async fn delete_message(&self, id: Uuid) -> Result<bool>;
    async fn message_stats(&self) -> Result<MessageStats>;

    // --- Transactions (finance) ---
    async fn list_transactions(
        &self,
        transaction_type: Option<String>,
        page: i64,
        per_page: i64,
    ) -> Result<Paginated<Transaction>>;
    async fn get_transaction(&self, id: Uuid) -> Result<Option<Transaction>>;
    async fn create_transaction(
        &self,
        req: CreateTransactionRequest,
        created_by: Option<Uuid>,
    ) -> Result<Transaction>;
    async fn update_transaction(
        &self,
        id: Uuid,
        req: UpdateTransactionRequest,
    ) -> Result<Option<Transaction>>;
    async fn delete_transaction(&self, id: Uuid) -> Result<bool>;
    async fn transaction_stats(&self) -> Result<TransactionStats>;
    async fn monthly_transactions(&self) -> Result<Vec<MonthlyTransaction>>;

    // --- Settings ---
    async fn list_settings(&self) -> Result<Vec<Setting>>;
    async fn upsert_settings(&self, values: BTreeMap<String, String>) -> Result<Vec<Setting>>;

    // --- Audit trail ---
    /// Appends one immutable row. Callers treat failures as best-effort;
    /// see `handlers::audit`.
    async fn append_audit(
        &self,
        user_id: Option<Uuid>,
        action: &str,
        description: &str,
    ) -> Result<()>;
    async fn list_audit_logs(&self, limit: i64) -> Result<Vec<AuditLogEntry>>;

    // --- Dashboard ---
    async fn dashboard_stats(&self) -> Result<DashboardStats>;
}

/// The concrete type used to share the persistence layer across the
/// application state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// The production implementation, backed by the PostgreSQL pool. Queries use
/// the runtime-checked sqlx API throughout.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    const USER_COLUMNS: &'static str = "id, name, username, email, password_hash, role_id, \
         position_id, profile_picture, status, created_at, updated_at";

    async fn divisions_for_prokers(
        &self,
        proker_ids: &[Uuid],
    ) -> Result<BTreeMap<Uuid, Vec<Division>>> {
        #[derive(sqlx::FromRow)]
        struct PivotRow {
            proker_id: Uuid,
            id: Uuid,
            name: String,
            description: Option<String>,
        }

        let rows = sqlx::query_as::<_, PivotRow>(
            r#"
            SELECT pd.proker_id, d.id, d.name, d.description
            FROM proker_division pd
            JOIN divisions d ON d.id = pd.division_id
            WHERE pd.proker_id = ANY($1)
            ORDER BY d.name
            "#,
        )
        .bind(proker_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut map: BTreeMap<Uuid, Vec<Division>> = BTreeMap::new();
        for row in rows {
            map.entry(row.proker_id).or_default().push(Division {
                id: row.id,
                name: row.name,
                description: row.description,
            });
        }
        Ok(map)
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    // --- Identity & Session ---

    async fn find_user_by_identifier(&self, identifier: &str) -> Result<Option<User>> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE username = $1 OR email = $1",
            Self::USER_COLUMNS
        ))
        .bind(identifier)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_user_with_role(&self, id: Uuid) -> Result<Option<UserWithRole>> {
        let Some(user) = self.get_user(id).await? else {
            return Ok(None);
        };

        let role = match user.role_id {
            Some(role_id) => {
                sqlx::query_as::<_, Role>("SELECT id, name, description FROM roles WHERE id = $1")
                    .bind(role_id)
                    .fetch_optional(&self.pool)
                    .await?
            }
            None => None,
        };

        let position = match user.position_id {
            Some(position_id) => {
                sqlx::query_as::<_, Position>(
                    "SELECT id, name, description FROM positions WHERE id = $1",
                )
                .bind(position_id)
                .fetch_optional(&self.pool)
                .await?
            }
            None => None,
        };

        let permissions = match &role {
            Some(role) => {
                sqlx::query_as::<_, RolePermission>(
                    "SELECT id, role_id, module_name, can_view, can_create, can_edit, can_delete \
                     FROM role_permissions WHERE role_id = $1 ORDER BY module_name",
                )
                .bind(role.id)
                .fetch_all(&self.pool)
                .await?
            }
            None => vec![],
        };

        Ok(Some(UserWithRole {
            user,
            role,
            position,
            permissions,
        }))
    }

    async fn insert_token(&self, token: &str, user_id: Uuid) -> Result<()> {
        sqlx::query("INSERT INTO auth_tokens (token, user_id) VALUES ($1, $2)")
            .bind(token)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_token_user(&self, token: &str) -> Result<Option<Uuid>> {
        sqlx::query_scalar::<_, Uuid>("SELECT user_id FROM auth_tokens WHERE token = $1")
            .bind(token)
            .fetch_optional(&self.pool)
            .await
    }

    async fn delete_token(&self, token: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM auth_tokens WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn update_password(&self, user_id: Uuid, password_hash: &str) -> Result<()> {
        sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
            .bind(user_id)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn update_profile(
        &self,
        user_id: Uuid,
        req: UpdateProfileRequest,
    ) -> Result<Option<User>> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET name = COALESCE($2, name),
                email = COALESCE($3, email),
                profile_picture = COALESCE($4, profile_picture),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            Self::USER_COLUMNS
        ))
        .bind(user_id)
        .bind(req.name)
        .bind(req.email)
        .bind(req.profile_picture)
        .fetch_optional(&self.pool)
        .await
    }

    // --- Users ---

    async fn list_users(
        &self,
        role_id: Option<Uuid>,
        division_id: Option<Uuid>,
        status: Option<String>,
        search: Option<String>,
        page: i64,
        per_page: i64,
    ) -> Result<Paginated<User>> {
        // Shared WHERE clause assembly for the page and count queries.
        let push_filters = |builder: &mut QueryBuilder<sqlx::Postgres>| {
            if let Some(role_id) = role_id {
                builder.push(" AND role_id = ");
                builder.push_bind(role_id);
            }
            if let Some(division_id) = division_id {
                // Division association flows through proker memberships.
                builder.push(
                    " AND EXISTS (SELECT 1 FROM proker_anggota pa \
                     WHERE pa.user_id = users.id AND pa.division_id = ",
                );
                builder.push_bind(division_id);
                builder.push(")");
            }
            if let Some(status) = status.clone() {
                builder.push(" AND status = ");
                builder.push_bind(status);
            }
            if let Some(search) = search.clone() {
                let pattern = format!("%{}%", search);
                builder.push(" AND (name ILIKE ");
                builder.push_bind(pattern.clone());
                builder.push(" OR username ILIKE ");
                builder.push_bind(pattern.clone());
                builder.push(" OR email ILIKE ");
                builder.push_bind(pattern);
                builder.push(")");
            }
        };

        let mut count_builder: QueryBuilder<sqlx::Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM users WHERE TRUE");
        push_filters(&mut count_builder);
        let total: i64 = count_builder
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        let mut builder: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(format!(
            "SELECT {} FROM users WHERE TRUE",
            Self::USER_COLUMNS
        ));
        push_filters(&mut builder);
        builder.push(" ORDER BY created_at DESC LIMIT ");
        builder.push_bind(per_page);
        builder.push(" OFFSET ");
        builder.push_bind((page - 1).saturating_mul(per_page));

        let data = builder
            .build_query_as::<User>()
            .fetch_all(&self.pool)
            .await?;

        Ok(Paginated {
            data,
            total,
            page,
            per_page,
        })
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            Self::USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn username_taken(&self, username: &str, exclude: Option<Uuid>) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM users WHERE username = $1 AND ($2::uuid IS NULL OR id <> $2)",
        )
        .bind(username)
        .bind(exclude)
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }

    async fn email_taken(&self, email: &str, exclude: Option<Uuid>) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM users WHERE email = $1 AND ($2::uuid IS NULL OR id <> $2)",
        )
        .bind(email)
        .bind(exclude)
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }

    async fn create_user(&self, req: CreateUserRequest, password_hash: String) -> Result<User> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users
                (id, name, username, email, password_hash, role_id, position_id,
                 profile_picture, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {}
            "#,
            Self::USER_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(req.name)
        .bind(req.username)
        .bind(req.email)
        .bind(password_hash)
        .bind(req.role_id)
        .bind(req.position_id)
        .bind(req.profile_picture)
        .bind(req.status.unwrap_or_else(|| "active".to_string()))
        .fetch_one(&self.pool)
        .await
    }

    async fn update_user(
        &self,
        id: Uuid,
        req: UpdateUserRequest,
        password_hash: Option<String>,
    ) -> Result<Option<User>> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET name = COALESCE($2, name),
                username = COALESCE($3, username),
                email = COALESCE($4, email),
                password_hash = COALESCE($5, password_hash),
                role_id = COALESCE($6, role_id),
                position_id = COALESCE($7, position_id),
                profile_picture = COALESCE($8, profile_picture),
                status = COALESCE($9, status),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            Self::USER_COLUMNS
        ))
        .bind(id)
        .bind(req.name)
        .bind(req.username)
        .bind(req.email)
        .bind(password_hash)
        .bind(req.role_id)
        .bind(req.position_id)
        .bind(req.profile_picture)
        .bind(req.status)
        .fetch_optional(&self.pool)
        .await
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn user_prokers(&self, user_id: Uuid) -> Result<Vec<Proker>> {
        sqlx::query_as::<_, Proker>(
            r#"
            SELECT DISTINCT p.id, p.title, p.description, p.date, p.location, p.status,
                   p.created_at, p.updated_at
            FROM prokers p
            JOIN proker_anggota pa ON pa.proker_id = p.id
            WHERE pa.user_id = $1
            ORDER BY p.date DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    // --- Roles & permission matrix ---

    async fn list_roles_with_permissions(&self) -> Result<Vec<RoleWithPermissions>> {
        let roles =
            sqlx::query_as::<_, Role>("SELECT id, name, description FROM roles ORDER BY name")
                .fetch_all(&self.pool)
                .await?;

        let permissions = sqlx::query_as::<_, RolePermission>(
            "SELECT id, role_id, module_name, can_view, can_create, can_edit, can_delete \
             FROM role_permissions ORDER BY module_name",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut by_role: BTreeMap<Uuid, Vec<RolePermission>> = BTreeMap::new();
        for permission in permissions {
            by_role.entry(permission.role_id).or_default().push(permission);
        }

        Ok(roles
            .into_iter()
            .map(|role| {
                let permissions = by_role.remove(&role.id).unwrap_or_default();
                RoleWithPermissions { role, permissions }
            })
            .collect())
    }

    async fn role_exists(&self, id: Uuid) -> Result<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM roles WHERE id = $1")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }

    async fn replace_role_permissions(
        &self,
        role_id: Uuid,
        entries: Vec<PermissionEntry>,
    ) -> Result<Vec<RolePermission>> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM role_permissions WHERE role_id = $1")
            .bind(role_id)
            .execute(&mut *tx)
            .await?;

        for entry in entries {
            sqlx::query(
                r#"
                INSERT INTO role_permissions
                    (id, role_id, module_name, can_view, can_create, can_edit, can_delete)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                ON CONFLICT (role_id, module_name) DO UPDATE
                SET can_view = EXCLUDED.can_view,
                    can_create = EXCLUDED.can_create,
                    can_edit = EXCLUDED.can_edit,
                    can_delete = EXCLUDED.can_delete,
                    updated_at = NOW()
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(role_id)
            .bind(entry.module_name)
            .bind(entry.can_view)
            .bind(entry.can_create)
            .bind(entry.can_edit)
            .bind(entry.can_delete)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        sqlx::query_as::<_, RolePermission>(
            "SELECT id, role_id, module_name, can_view, can_create, can_edit, can_delete \
             FROM role_permissions WHERE role_id = $1 ORDER BY module_name",
        )
        .bind(role_id)
        .fetch_all(&self.pool)
        .await
    }

    // --- Positions ---

    async fn list_positions(&self) -> Result<Vec<Position>> {
        // Insertion order, so manually curated hierarchies stay stable.
        sqlx::query_as::<_, Position>(
            "SELECT id, name, description FROM positions ORDER BY created_at",
        )
        .fetch_all(&self.pool)
        .await
    }

    async fn position_exists(&self, id: Uuid) -> Result<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM positions WHERE id = $1")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }

    async fn position_name_taken(&self, name: &str, exclude: Option<Uuid>) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM positions WHERE name = $1 AND ($2::uuid IS NULL OR id <> $2)",
        )
        .bind(name)
        .bind(exclude)
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }

    async fn create_position(&self, name: String, description: Option<String>) -> Result<Position> {
        sqlx::query_as::<_, Position>(
            "INSERT INTO positions (id, name, description) VALUES ($1, $2, $3) \
             RETURNING id, name, description",
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(description)
        .fetch_one(&self.pool)
        .await
    }

    async fn update_position(
        &self,
        id: Uuid,
        name: String,
        description: Option<String>,
    ) -> Result<Option<Position>> {
        sqlx::query_as::<_, Position>(
            "UPDATE positions SET name = $2, description = $3, updated_at = NOW() \
             WHERE id = $1 RETURNING id, name, description",
        )
        .bind(id)
        .bind(name)
        .bind(description)
        .fetch_optional(&self.pool)
        .await
    }

    async fn delete_position(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM positions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // --- Divisions ---

    async fn list_divisions(&self) -> Result<Vec<Division>> {
        sqlx::query_as::<_, Division>("SELECT id, name, description FROM divisions ORDER BY name")
            .fetch_all(&self.pool)
            .await
    }

    async fn division_exists(&self, id: Uuid) -> Result<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM divisions WHERE id = $1")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }

    async fn create_division(&self, name: String, description: Option<String>) -> Result<Division> {
        sqlx::query_as::<_, Division>(
            "INSERT INTO divisions (id, name, description) VALUES ($1, $2, $3) \
             RETURNING id, name, description",
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(description)
        .fetch_one(&self.pool)
        .await
    }

    async fn update_division(
        &self,
        id: Uuid,
        name: String,
        description: Option<String>,
    ) -> Result<Option<Division>> {
        sqlx::query_as::<_, Division>(
            "UPDATE divisions SET name = $2, description = $3, updated_at = NOW() \
             WHERE id = $1 RETURNING id, name, description",
        )
        .bind(id)
        .bind(name)
        .bind(description)
        .fetch_optional(&self.pool)
        .await
    }

    async fn delete_division(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM divisions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // --- Prokers ---

    async fn list_prokers(
        &self,
        division_id: Option<Uuid>,
        status: Option<String>,
        search: Option<String>,
        page: i64,
        per_page: i64,
    ) -> Result<Paginated<ProkerWithDivisions>> {
        let push_filters = |builder: &mut QueryBuilder<sqlx::Postgres>| {
            if let Some(division_id) = division_id {
                builder.push(
                    " AND EXISTS (SELECT 1 FROM proker_division pd \
                     WHERE pd.proker_id = prokers.id AND pd.division_id = ",
                );
                builder.push_bind(division_id);
                builder.push(")");
            }
            if let Some(status) = status.clone() {
                builder.push(" AND status = ");
                builder.push_bind(status);
            }
            if let Some(search) = search.clone() {
                let pattern = format!("%{}%", search);
                builder.push(" AND (title ILIKE ");
                builder.push_bind(pattern.clone());
                builder.push(" OR description ILIKE ");
                builder.push_bind(pattern);
                builder.push(")");
            }
        };

        let mut count_builder: QueryBuilder<sqlx::Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM prokers WHERE TRUE");
        push_filters(&mut count_builder);
        let total: i64 = count_builder
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        let mut builder: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(
            "SELECT id, title, description, date, location, status, created_at, updated_at \
             FROM prokers WHERE TRUE",
        );
        push_filters(&mut builder);
        builder.push(" ORDER BY date DESC LIMIT ");
        builder.push_bind(per_page);
        builder.push(" OFFSET ");
        builder.push_bind((page - 1).saturating_mul(per_page));

        let prokers = builder
            .build_query_as::<Proker>()
            .fetch_all(&self.pool)
            .await?;

        let ids: Vec<Uuid> = prokers.iter().map(|p| p.id).collect();
        let mut divisions = self.divisions_for_prokers(&ids).await?;

        let data = prokers
            .into_iter()
            .map(|proker| {
                let divisions = divisions.remove(&proker.id).unwrap_or_default();
                ProkerWithDivisions { proker, divisions }
            })
            .collect();

        Ok(Paginated {
            data,
            total,
            page,
            per_page,
        })
    }

    async fn get_proker(&self, id: Uuid) -> Result<Option<Proker>> {
        sqlx::query_as::<_, Proker>(
            "SELECT id, title, description, date, location, status, created_at, updated_at \
             FROM prokers WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_proker_detail(&self, id: Uuid) -> Result<Option<ProkerDetail>> {
        let Some(proker) = self.get_proker(id).await? else {
            return Ok(None);
        };

        let divisions = sqlx::query_as::<_, Division>(
            r#"
            SELECT d.id, d.name, d.description
            FROM divisions d
            JOIN proker_division pd ON pd.division_id = d.id
            WHERE pd.proker_id = $1
            ORDER BY d.name
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let media = sqlx::query_as::<_, ProkerMedia>(
            "SELECT id, proker_id, media_type, media_url, caption FROM proker_media \
             WHERE proker_id = $1 ORDER BY created_at",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let anggota = sqlx::query_as::<_, AnggotaWithUser>(
            r#"
            SELECT pa.id, pa.proker_id, pa.user_id, pa.division_id, pa.position_id, pa.role,
                   u.name AS user_name, u.email AS user_email
            FROM proker_anggota pa
            JOIN users u ON u.id = pa.user_id
            WHERE pa.proker_id = $1
            ORDER BY pa.created_at
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(ProkerDetail {
            proker,
            divisions,
            media,
            anggota,
        }))
    }

    async fn create_proker(&self, req: CreateProkerRequest) -> Result<Proker> {
        let mut tx = self.pool.begin().await?;

        let proker = sqlx::query_as::<_, Proker>(
            r#"
            INSERT INTO prokers (id, title, description, date, location, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, title, description, date, location, status, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(req.title)
        .bind(req.description)
        .bind(req.date)
        .bind(req.location)
        .bind(req.status.unwrap_or_else(|| "planned".to_string()))
        .fetch_one(&mut *tx)
        .await?;

        for division_id in dedup(&req.division_ids) {
            sqlx::query(
                "INSERT INTO proker_division (proker_id, division_id) VALUES ($1, $2) \
                 ON CONFLICT DO NOTHING",
            )
            .bind(proker.id)
            .bind(division_id)
            .execute(&mut *tx)
            .await?;
        }

        for anggota in req.anggota.unwrap_or_default() {
            sqlx::query(
                "INSERT INTO proker_anggota (id, proker_id, user_id, division_id, position_id, role) \
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(Uuid::new_v4())
            .bind(proker.id)
            .bind(anggota.user_id)
            .bind(anggota.division_id)
            .bind(anggota.position_id)
            .bind(anggota.role)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(proker)
    }

    async fn update_proker(&self, id: Uuid, req: UpdateProkerRequest) -> Result<Option<Proker>> {
        let mut tx = self.pool.begin().await?;

        let proker = sqlx::query_as::<_, Proker>(
            r#"
            UPDATE prokers
            SET title = COALESCE($2, title),
                description = COALESCE($3, description),
                date = COALESCE($4, date),
                location = COALESCE($5, location),
                status = COALESCE($6, status),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, title, description, date, location, status, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(req.title)
        .bind(req.description)
        .bind(req.date)
        .bind(req.location)
        .bind(req.status)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(proker) = proker else {
            tx.rollback().await?;
            return Ok(None);
        };

        if let Some(division_ids) = req.division_ids {
            sqlx::query("DELETE FROM proker_division WHERE proker_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            for division_id in dedup(&division_ids) {
                sqlx::query(
                    "INSERT INTO proker_division (proker_id, division_id) VALUES ($1, $2) \
                     ON CONFLICT DO NOTHING",
                )
                .bind(id)
                .bind(division_id)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        Ok(Some(proker))
    }

    async fn delete_proker(&self, id: Uuid) -> Result<bool> {
        // Membership, media and pivot rows cascade with the proker.
        let result = sqlx::query("DELETE FROM prokers WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn add_anggota(&self, proker_id: Uuid, input: AnggotaInput) -> Result<AnggotaWithUser> {
        sqlx::query_as::<_, AnggotaWithUser>(
            r#"
            WITH inserted AS (
                INSERT INTO proker_anggota
                    (id, proker_id, user_id, division_id, position_id, role)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING id, proker_id, user_id, division_id, position_id, role
            )
            SELECT i.id, i.proker_id, i.user_id, i.division_id, i.position_id, i.role,
                   u.name AS user_name, u.email AS user_email
            FROM inserted i JOIN users u ON u.id = i.user_id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(proker_id)
        .bind(input.user_id)
        .bind(input.division_id)
        .bind(input.position_id)
        .bind(input.role)
        .fetch_one(&self.pool)
        .await
    }

    async fn remove_anggota(&self, proker_id: Uuid, anggota_id: Uuid) -> Result<bool> {
        // Both predicates in one DELETE: a row belonging to another proker
        // affects zero rows and nothing mutates.
        let result = sqlx::query("DELETE FROM proker_anggota WHERE id = $1 AND proker_id = $2")
            .bind(anggota_id)
            .bind(proker_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn add_media(&self, proker_id: Uuid, req: AddMediaRequest) -> Result<ProkerMedia> {
        sqlx::query_as::<_, ProkerMedia>(
            r#"
            INSERT INTO proker_media (id, proker_id, media_type, media_url, caption)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, proker_id, media_type, media_url, caption
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(proker_id)
        .bind(req.media_type)
        .bind(req.media_url)
        .bind(req.caption)
        .fetch_one(&self.pool)
        .await
    }

    async fn remove_media(&self, proker_id: Uuid, media_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM proker_media WHERE id = $1 AND proker_id = $2")
            .bind(media_id)
            .bind(proker_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_public_media(&self) -> Result<Vec<ProkerMedia>> {
        sqlx::query_as::<_, ProkerMedia>(
            r#"
            SELECT m.id, m.proker_id, m.media_type, m.media_url, m.caption
            FROM proker_media m
            JOIN prokers p ON p.id = m.proker_id
            WHERE p.status = 'done'
            ORDER BY m.created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
    }

    // --- Messages ---

    async fn create_message(&self, req: CreateMessageRequest) -> Result<Message> {
        sqlx::query_as::<_, Message>(
            r#"
            INSERT INTO messages (id, name, email, subject, content)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, email, subject, content, status, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(req.name)
        .bind(req.email)
        .bind(req.subject)
        .bind(req.content)
        .fetch_one(&self.pool)
        .await
    }

    async fn list_messages(
        &self,
        status: Option<String>,
        page: i64,
        per_page: i64,
    ) -> Result<Paginated<Message>> {
        let push_filters = |builder: &mut QueryBuilder<sqlx::Postgres>| {
            if let Some(status) = status.clone() {
                builder.push(" AND status = ");
                builder.push_bind(status);
            }
        };

        let mut count_builder: QueryBuilder<sqlx::Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM messages WHERE TRUE");
        push_filters(&mut count_builder);
        let total: i64 = count_builder
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        let mut builder: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(
            "SELECT id, name, email, subject, content, status, created_at \
             FROM messages WHERE TRUE",
        );
        push_filters(&mut builder);
        builder.push(" ORDER BY created_at DESC LIMIT ");
        builder.push_bind(per_page);
        builder.push(" OFFSET ");
        builder.push_bind((page - 1).saturating_mul(per_page));

        let data = builder
            .build_query_as::<Message>()
            .fetch_all(&self.pool)
            .await?;

        Ok(Paginated {
            data,
            total,
            page,
            per_page,
        })
    }

    async fn get_message(&self, id: Uuid) -> Result<Option<Message>> {
        sqlx::query_as::<_, Message>(
            "SELECT id, name, email, subject, content, status, created_at \
             FROM messages WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn update_message_status(&self, id: Uuid, status: String) -> Result<Option<Message>> {
        sqlx::query_as::<_, Message>(
            "UPDATE messages SET status = $2, updated_at = NOW() WHERE id = $1 \
             RETURNING id, name, email, subject, content, status, created_at",
        )
        .bind(id)
        .bind(status)
        .fetch_optional(&self.pool)
        .await
    }

    async fn delete_message(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM messages WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn message_stats(&self) -> Result<MessageStats> {
        #[derive(sqlx::FromRow)]
        struct StatsRow {
            total: i64,
            unread: i64,
            read: i64,
            archived: i64,
        }

        let row = sqlx::query_as::<_, StatsRow>(
            r#"
            SELECT COUNT(*) AS total,
                   COUNT(*) FILTER (WHERE status = 'unread') AS unread,
                   COUNT(*) FILTER (WHERE status = 'read') AS read,
                   COUNT(*) FILTER (WHERE status = 'archived') AS archived
            FROM messages
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(MessageStats {
            total: row.total,
            unread: row.unread,
            read: row.read,
            archived: row.archived,
        })
    }

    // --- Transactions (finance) ---

    async fn list_transactions(
        &self,
        transaction_type: Option<String>,
        page: i64,
        per_page: i64,
    ) -> Result<Paginated<Transaction>> {
        let push_filters = |builder: &mut QueryBuilder<sqlx::Postgres>| {
            if let Some(transaction_type) = transaction_type.clone() {
                builder.push(" AND type = ");
                builder.push_bind(transaction_type);
            }
        };

        let mut count_builder: QueryBuilder<sqlx::Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM transactions WHERE TRUE");
        push_filters(&mut count_builder);
        let total: i64 = count_builder
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        let mut builder: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(
            "SELECT id, type, amount, description, date, created_by, created_at \
             FROM transactions WHERE TRUE",
        );
        push_filters(&mut builder);
        builder.push(" ORDER BY date DESC LIMIT ");
        builder.push_bind(per_page);
        builder.push(" OFFSET ");
        builder.push_bind((page - 1).saturating_mul(per_page));

        let data = builder
            .build_query_as::<Transaction>()
            .fetch_all(&self.pool)
            .await?;

        Ok(Paginated {
            data,
            total,
            page,
            per_page,
        })
    }

    async fn get_transaction(&self, id: Uuid) -> Result<Option<Transaction>> {
        sqlx::query_as::<_, Transaction>(
            "SELECT id, type, amount, description, date, created_by, created_at \
             FROM transactions WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn create_transaction(
        &self,
        req: CreateTransactionRequest,
        created_by: Option<Uuid>,
    ) -> Result<Transaction> {
        sqlx::query_as::<_, Transaction>(
            r#"
            INSERT INTO transactions (id, type, amount, description, date, created_by)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, type, amount, description, date, created_by, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(req.transaction_type)
        .bind(req.amount)
        .bind(req.description)
        .bind(req.date)
        .bind(created_by)
        .fetch_one(&self.pool)
        .await
    }

    async fn update_transaction(
        &self,
        id: Uuid,
        req: UpdateTransactionRequest,
    ) -> Result<Option<Transaction>> {
        sqlx::query_as::<_, Transaction>(
            r#"
            UPDATE transactions
            SET type = COALESCE($2, type),
                amount = COALESCE($3, amount),
                description = COALESCE($4, description),
                date = COALESCE($5, date),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, type, amount, description, date, created_by, created_at
            "#,
        )
        .bind(id)
        .bind(req.transaction_type)
        .bind(req.amount)
        .bind(req.description)
        .bind(req.date)
        .fetch_optional(&self.pool)
        .await
    }

    async fn delete_transaction(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM transactions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn transaction_stats(&self) -> Result<TransactionStats> {
        #[derive(sqlx::FromRow)]
        struct SumRow {
            total_income: Option<f64>,
            total_expense: Option<f64>,
        }

        let row = sqlx::query_as::<_, SumRow>(
            r#"
            SELECT SUM(amount) FILTER (WHERE type = 'income') AS total_income,
                   SUM(amount) FILTER (WHERE type = 'expense') AS total_expense
            FROM transactions
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        let total_income = row.total_income.unwrap_or(0.0);
        let total_expense = row.total_expense.unwrap_or(0.0);
        Ok(TransactionStats {
            total_income,
            total_expense,
            balance: total_income - total_expense,
        })
    }

    async fn monthly_transactions(&self) -> Result<Vec<MonthlyTransaction>> {
        let cutoff = (Utc::now() - Duration::days(183)).date_naive();
        sqlx::query_as::<_, MonthlyTransaction>(
            r#"
            SELECT to_char(date, 'YYYY-MM') AS month,
                   COALESCE(SUM(amount) FILTER (WHERE type = 'income'), 0) AS income,
                   COALESCE(SUM(amount) FILTER (WHERE type = 'expense'), 0) AS expense
            FROM transactions
            WHERE date >= $1
            GROUP BY 1
            ORDER BY 1
            "#,
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await
    }

    // --- Settings ---

    async fn list_settings(&self) -> Result<Vec<Setting>> {
        sqlx::query_as::<_, Setting>("SELECT key, value FROM settings ORDER BY key")
            .fetch_all(&self.pool)
            .await
    }

    async fn upsert_settings(&self, values: BTreeMap<String, String>) -> Result<Vec<Setting>> {
        let mut tx = self.pool.begin().await?;
        for (key, value) in values {
            sqlx::query(
                "INSERT INTO settings (key, value) VALUES ($1, $2) \
                 ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = NOW()",
            )
            .bind(key)
            .bind(value)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        self.list_settings().await
    }

    // --- Audit trail ---

    async fn append_audit(
        &self,
        user_id: Option<Uuid>,
        action: &str,
        description: &str,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO audit_logs (id, user_id, action, description) VALUES ($1, $2, $3, $4)",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(action)
        .bind(description)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_audit_logs(&self, limit: i64) -> Result<Vec<AuditLogEntry>> {
        sqlx::query_as::<_, AuditLogEntry>(
            r#"
            SELECT a.id, a.user_id, u.name AS user_name, a.action, a.description, a.created_at
            FROM audit_logs a
            LEFT JOIN users u ON u.id = a.user_id
            ORDER BY a.created_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

    // --- Dashboard ---

    async fn dashboard_stats(&self) -> Result<DashboardStats> {
        let total_users: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE status = 'active'")
                .fetch_one(&self.pool)
                .await?;
        let total_divisions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM divisions")
            .fetch_one(&self.pool)
            .await?;
        let total_prokers: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM prokers")
            .fetch_one(&self.pool)
            .await?;
        let unread_messages: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM messages WHERE status = 'unread'")
                .fetch_one(&self.pool)
                .await?;

        let finance = self.transaction_stats().await?;

        #[derive(sqlx::FromRow)]
        struct BreakdownRow {
            planned: i64,
            ongoing: i64,
            done: i64,
        }
        let breakdown = sqlx::query_as::<_, BreakdownRow>(
            r#"
            SELECT COUNT(*) FILTER (WHERE status = 'planned') AS planned,
                   COUNT(*) FILTER (WHERE status = 'ongoing') AS ongoing,
                   COUNT(*) FILTER (WHERE status = 'done') AS done
            FROM prokers
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        let recent = sqlx::query_as::<_, Proker>(
            "SELECT id, title, description, date, location, status, created_at, updated_at \
             FROM prokers ORDER BY date DESC LIMIT 5",
        )
        .fetch_all(&self.pool)
        .await?;
        let ids: Vec<Uuid> = recent.iter().map(|p| p.id).collect();
        let mut divisions = self.divisions_for_prokers(&ids).await?;
        let recent_prokers = recent
            .into_iter()
            .map(|proker| {
                let divisions = divisions.remove(&proker.id).unwrap_or_default();
                ProkerWithDivisions { proker, divisions }
            })
            .collect();

        let recent_messages = sqlx::query_as::<_, Message>(
            "SELECT id, name, email, subject, content, status, created_at \
             FROM messages ORDER BY created_at DESC LIMIT 5",
        )
        .fetch_all(&self.pool)
        .await?;

        // Member distribution flows through proker_anggota.division_id, not a
        // direct user column.
        let users_by_division = sqlx::query_as::<_, DivisionMemberCount>(
            r#"
            SELECT d.name, COUNT(DISTINCT pa.user_id) AS count
            FROM divisions d
            LEFT JOIN proker_anggota pa ON pa.division_id = d.id
            GROUP BY d.id, d.name
            ORDER BY d.name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let transaction_trend = self.monthly_transactions().await?;

        Ok(DashboardStats {
            total_users,
            total_divisions,
            total_prokers,
            unread_messages,
            balance: finance.balance,
            total_income: finance.total_income,
            total_expense: finance.total_expense,
            proker_status: ProkerStatusBreakdown {
                planned: breakdown.planned,
                ongoing: breakdown.ongoing,
                done: breakdown.done,
            },
            recent_prokers,
            recent_messages,
            users_by_division,
            transaction_trend,
        })
    }
}

/// Collapses duplicates while preserving first-seen order.
fn dedup(ids: &[Uuid]) -> Vec<Uuid> {
    let mut seen = std::collections::HashSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

use std::sync::Arc;

use osis_panel::{
    auth::hash_password,
    config::AppConfig,
    models::{CreateUserRequest, PermissionEntry},
    permissions::modules,
    repository::{PostgresRepository, Repository},
};
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

/// Grant shape for one role: which modules it can see and what it may do in
/// each. `full` modules get all four flags; everything else follows the
/// per-module closures below.
struct RoleSeed {
    name: &'static str,
    description: &'static str,
    entries: Vec<PermissionEntry>,
}

fn entry(module: &str, view: bool, create: bool, edit: bool, delete: bool) -> PermissionEntry {
    PermissionEntry {
        module_name: module.to_string(),
        can_view: view,
        can_create: create,
        can_edit: edit,
        can_delete: delete,
    }
}

/// View-only dashboard plus full access on the given working modules, the
/// common pattern for officer roles.
fn officer(work: &[&str], can_delete: bool) -> Vec<PermissionEntry> {
    let mut entries = vec![entry(modules::DASHBOARD, true, false, false, false)];
    for module in work {
        entries.push(entry(module, true, true, true, can_delete));
    }
    entries.push(entry(modules::PROFILE, true, true, true, can_delete));
    entries
}

fn role_seeds() -> Vec<RoleSeed> {
    vec![
        RoleSeed {
            name: "Admin",
            description: "Administrator dengan akses penuh ke semua modul",
            entries: modules::ALL
                .iter()
                .map(|m| entry(m, true, true, true, true))
                .collect(),
        },
        RoleSeed {
            name: "Ketua OSIS",
            description: "Ketua OSIS dengan akses ke Prokers, Transactions, Messages",
            entries: officer(
                &[modules::PROKERS, modules::TRANSACTIONS, modules::MESSAGES],
                true,
            ),
        },
        RoleSeed {
            name: "Wakil Ketua OSIS",
            description: "Wakil Ketua OSIS dengan akses ke Prokers, Messages, dan Divisions",
            entries: officer(
                &[modules::PROKERS, modules::MESSAGES, modules::DIVISIONS],
                true,
            ),
        },
        RoleSeed {
            name: "Sekretaris",
            description: "Sekretaris dengan akses ke Messages dan Divisions",
            entries: officer(&[modules::MESSAGES, modules::DIVISIONS], false),
        },
        RoleSeed {
            name: "Bendahara",
            description: "Bendahara dengan akses ke Transactions",
            entries: vec![
                entry(modules::DASHBOARD, true, false, false, false),
                entry(modules::TRANSACTIONS, true, true, true, true),
                entry(modules::PROFILE, true, false, true, false),
            ],
        },
        RoleSeed {
            name: "Anggota",
            description: "Anggota OSIS dengan akses terbatas",
            entries: vec![
                entry(modules::DASHBOARD, true, false, false, false),
                entry(modules::PROFILE, true, false, true, false),
            ],
        },
        RoleSeed {
            name: "Humas",
            description: "Humas bertanggung jawab atas komunikasi dan publikasi",
            entries: vec![
                entry(modules::DASHBOARD, true, false, false, false),
                entry(modules::PROKERS, true, true, true, false),
                entry(modules::MESSAGES, true, true, true, false),
                entry(modules::PROFILE, true, false, false, false),
            ],
        },
        RoleSeed {
            name: "Medkom",
            description: "Media dan Komunikasi internal (Medkom)",
            entries: vec![
                entry(modules::DASHBOARD, true, false, false, false),
                entry(modules::PROKERS, true, true, true, false),
                entry(modules::PROFILE, true, false, true, false),
            ],
        },
    ]
}

/// Idempotent role/matrix/admin-user seeding. Safe to re-run: existing
/// roles keep their (possibly admin-edited) matrices, and the admin user is
/// only created when the username is free.
#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "seed=info,osis_panel=info".into()),
        )
        .init();

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&config.db_url)
        .await
        .expect("FATAL: Failed to connect to Postgres. Check DATABASE_URL.");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("FATAL: Database migration failed.");

    let repo = Arc::new(PostgresRepository::new(pool.clone()));

    for seed in role_seeds() {
        let existing = sqlx::query_scalar::<_, Uuid>("SELECT id FROM roles WHERE name = $1")
            .bind(seed.name)
            .fetch_optional(&pool)
            .await
            .expect("role lookup failed");

        if existing.is_some() {
            tracing::info!("role '{}' already seeded, skipping", seed.name);
            continue;
        }

        let role_id = sqlx::query_scalar::<_, Uuid>(
            "INSERT INTO roles (id, name, description) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(Uuid::new_v4())
        .bind(seed.name)
        .bind(seed.description)
        .fetch_one(&pool)
        .await
        .expect("role insert failed");

        repo.replace_role_permissions(role_id, seed.entries)
            .await
            .expect("permission seed failed");

        tracing::info!("seeded role '{}'", seed.name);
    }

    seed_admin_user(&pool, repo.as_ref()).await;

    tracing::info!("seeding complete");
}

async fn seed_admin_user(pool: &sqlx::PgPool, repo: &PostgresRepository) {
    let taken = repo
        .username_taken("admin", None)
        .await
        .expect("username lookup failed");
    if taken {
        tracing::info!("admin user already present, skipping");
        return;
    }

    let role_id = sqlx::query_scalar::<_, Uuid>("SELECT id FROM roles WHERE name = 'Admin'")
        .fetch_one(pool)
        .await
        .expect("Admin role missing");

    let password = std::env::var("SEED_ADMIN_PASSWORD").unwrap_or_else(|_| "admin123".to_string());
    let hash = hash_password(&password).expect("password hashing failed");

    let req = CreateUserRequest {
        name: "Administrator".to_string(),
        username: "admin".to_string(),
        email: "admin@example.com".to_string(),
        password,
        role_id: Some(role_id),
        position_id: None,
        profile_picture: None,
        status: Some("active".to_string()),
    };
    repo.create_user(req, hash).await.expect("admin insert failed");

    tracing::info!("seeded admin user 'admin'");
}

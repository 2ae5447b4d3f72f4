use osis_panel::config::{AppConfig, Env};
use serial_test::serial;

// Environment variables are process-global, so these tests are serialized.

fn set_var(key: &str, value: &str) {
    unsafe { std::env::set_var(key, value) }
}

fn remove_var(key: &str) {
    unsafe { std::env::remove_var(key) }
}

#[test]
#[serial]
fn default_config_is_local_and_needs_no_env() {
    let config = AppConfig::default();
    assert_eq!(config.env, Env::Local);
    assert!(!config.db_url.is_empty());
}

#[test]
#[serial]
fn load_reads_environment() {
    set_var("APP_ENV", "production");
    set_var("DATABASE_URL", "postgres://u:p@db:5432/app");
    set_var("BIND_ADDR", "0.0.0.0:8080");

    let config = AppConfig::load();
    assert_eq!(config.env, Env::Production);
    assert_eq!(config.db_url, "postgres://u:p@db:5432/app");
    assert_eq!(config.bind_addr, "0.0.0.0:8080");

    remove_var("APP_ENV");
    remove_var("DATABASE_URL");
    remove_var("BIND_ADDR");
}

#[test]
#[serial]
fn unknown_app_env_falls_back_to_local() {
    set_var("APP_ENV", "staging");
    set_var("DATABASE_URL", "postgres://u:p@db:5432/app");

    let config = AppConfig::load();
    assert_eq!(config.env, Env::Local);

    remove_var("APP_ENV");
    remove_var("DATABASE_URL");
}

#[test]
#[serial]
fn load_panics_without_database_url() {
    remove_var("DATABASE_URL");
    remove_var("APP_ENV");

    let result = std::panic::catch_unwind(AppConfig::load);
    assert!(result.is_err());
}

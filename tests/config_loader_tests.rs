use std::{
    env, fs,
    sync::{Mutex, MutexGuard, OnceLock},
};
use storefront::config::{ConfigError, ConfigLoader};
use tempfile::TempDir;

const STRONG_SECRET: &str = "an-integration-test-secret-of-decent-length";

fn env_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

fn env_guard() -> MutexGuard<'static, ()> {
    env_lock()
        .lock()
        .unwrap_or_else(|poison| poison.into_inner())
}

fn clear_env() {
    for key in [
        "STOREFRONT_PROFILE",
        "STOREFRONT_API_BIND_ADDR",
        "STOREFRONT_LOG_LEVEL",
        "STOREFRONT_LOG_FORMAT",
        "STOREFRONT_JWT_SECRET",
        "STOREFRONT_EXPOSE_RESET_TOKENS",
        "STOREFRONT_CORS_ALLOWED_ORIGINS",
        "STOREFRONT_SEED_ADMIN_PASSWORD",
    ] {
        unsafe {
            env::remove_var(key);
        }
    }
}

fn write_env_file(dir: &TempDir, name: &str, contents: &str) {
    let path = dir.path().join(name);
    fs::write(path, contents).unwrap();
}

#[test]
fn loads_defaults_when_no_env_present() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    let cfg = ConfigLoader::with_base_dir(temp_dir.path().to_path_buf())
        .load()
        .expect("config loads with defaults");

    assert_eq!(cfg.profile, "local");
    assert_eq!(cfg.api_bind_addr, "0.0.0.0:8080");
    assert_eq!(cfg.log_level, "info");
    assert_eq!(cfg.log_format, "json");
    assert!(!cfg.jwt_secret.is_empty(), "local profile gets a development secret");
    assert!(cfg.expose_reset_tokens, "local profile exposes reset tokens");
    assert!(cfg.cors_allowed_origins.is_empty());
    cfg.bind_addr().expect("default bind addr parses");
}

#[test]
fn layered_env_files_apply_in_order() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    write_env_file(&temp_dir, ".env", "STOREFRONT_API_BIND_ADDR=127.0.0.1:3000\n");
    write_env_file(
        &temp_dir,
        ".env.test",
        "STOREFRONT_API_BIND_ADDR=192.168.0.10:5000\n",
    );
    write_env_file(
        &temp_dir,
        ".env.test.local",
        "STOREFRONT_API_BIND_ADDR=10.0.0.5:6000\n",
    );
    // Select profile via .env.local before profile-specific files load.
    write_env_file(
        &temp_dir,
        ".env.local",
        "STOREFRONT_PROFILE=test\nSTOREFRONT_API_BIND_ADDR=127.0.0.1:4000\n",
    );

    let cfg = ConfigLoader::with_base_dir(temp_dir.path().to_path_buf())
        .load()
        .expect("layered config loads");

    assert_eq!(cfg.profile, "test");
    assert_eq!(cfg.api_bind_addr, "10.0.0.5:6000");
}

#[test]
fn process_env_overrides_files() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    write_env_file(&temp_dir, ".env", "STOREFRONT_LOG_LEVEL=warn\n");
    unsafe {
        env::set_var("STOREFRONT_LOG_LEVEL", "debug");
        env::set_var(
            "STOREFRONT_CORS_ALLOWED_ORIGINS",
            "https://shop.example.com, https://admin.example.com,",
        );
    }

    let cfg = ConfigLoader::with_base_dir(temp_dir.path().to_path_buf())
        .load()
        .expect("config loads");

    assert_eq!(cfg.log_level, "debug");
    assert_eq!(
        cfg.cors_allowed_origins,
        vec![
            "https://shop.example.com".to_string(),
            "https://admin.example.com".to_string()
        ]
    );
    clear_env();
}

#[test]
fn production_profile_requires_jwt_secret() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    write_env_file(&temp_dir, ".env", "STOREFRONT_PROFILE=production\n");

    let result = ConfigLoader::with_base_dir(temp_dir.path().to_path_buf()).load();
    assert!(matches!(result, Err(ConfigError::MissingJwtSecret)));
}

#[test]
fn production_profile_hides_reset_tokens_by_default() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    write_env_file(
        &temp_dir,
        ".env",
        &format!("STOREFRONT_PROFILE=production\nSTOREFRONT_JWT_SECRET={STRONG_SECRET}\n"),
    );

    let cfg = ConfigLoader::with_base_dir(temp_dir.path().to_path_buf())
        .load()
        .expect("production config loads");

    assert_eq!(cfg.profile, "production");
    assert!(!cfg.expose_reset_tokens);
    assert!(!cfg.is_development());
}

#[test]
fn short_jwt_secret_rejected() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    write_env_file(&temp_dir, ".env", "STOREFRONT_JWT_SECRET=too-short\n");

    let result = ConfigLoader::with_base_dir(temp_dir.path().to_path_buf()).load();
    assert!(matches!(result, Err(ConfigError::WeakJwtSecret { length: 9 })));
}

#[test]
fn invalid_bind_addr_rejected() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    write_env_file(&temp_dir, ".env", "STOREFRONT_API_BIND_ADDR=not-an-address\n");

    let result = ConfigLoader::with_base_dir(temp_dir.path().to_path_buf()).load();
    assert!(matches!(result, Err(ConfigError::InvalidBindAddr { .. })));
}

#[test]
fn redacted_json_hides_secrets() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    write_env_file(
        &temp_dir,
        ".env",
        &format!("STOREFRONT_JWT_SECRET={STRONG_SECRET}\nSTOREFRONT_SEED_ADMIN_PASSWORD=Admin123!\n"),
    );

    let cfg = ConfigLoader::with_base_dir(temp_dir.path().to_path_buf())
        .load()
        .expect("config loads");
    let json = cfg.redacted_json().unwrap();

    assert!(!json.contains(STRONG_SECRET));
    assert!(!json.contains("Admin123!"));
}

use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Environment variables that would leak into a spawned `murmur`.
#[allow(dead_code)]
pub const MURMUR_ENV: [&str; 8] = [
    "MURMUR_API_URL",
    "MURMUR_SOCKET_URL",
    "MURMUR_TIMEOUT_SECONDS",
    "MURMUR_TOKEN",
    "MURMUR_LOG_LEVEL",
    "MURMUR_JSON_LOGS",
    "MURMUR_LOG_FILE",
    "RUST_LOG",
];

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}

/// Config pointing the API at `api_url` with everything else defaulted.
#[allow(dead_code)]
pub fn config_for_api(api_url: &str) -> String {
    format!(
        "server:\n  api_url: {}\n  timeout_seconds: 5\nlogging:\n  level: warn\n",
        api_url
    )
}

use std::env;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

pub const BACKEND_URL_ENV: &str = "LEDGERDESK_BACKEND_URL";
pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:8000/";

#[derive(Debug, Default, Deserialize, Serialize, Clone)]
pub struct ConfigFile {
    pub backend_url: Option<String>,
    pub timeout: Option<u64>,
    pub proxy: Option<String>,
    pub session_file: Option<String>,
    pub page_size: Option<String>,
    pub output_format: Option<String>,
    pub no_color: Option<bool>,
}

fn home_dir() -> Option<PathBuf> {
    env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(|| env::var_os("USERPROFILE").map(PathBuf::from))
        .or_else(|| {
            let drive = env::var_os("HOMEDRIVE")?;
            let path = env::var_os("HOMEPATH")?;
            Some(PathBuf::from(drive).join(path))
        })
}

fn app_dir() -> Option<PathBuf> {
    Some(home_dir()?.join(".ledgerdesk"))
}

pub fn default_config_path() -> Option<PathBuf> {
    Some(app_dir()?.join("config.yml"))
}

pub fn default_session_path() -> Option<PathBuf> {
    Some(app_dir()?.join("session.json"))
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/").or_else(|| path.strip_prefix("~\\")) {
        if let Some(home) = home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

pub fn load_config(path: &PathBuf, allow_missing: bool) -> Result<ConfigFile, String> {
    match std::fs::read_to_string(path) {
        Ok(contents) => serde_yaml::from_str::<ConfigFile>(&contents)
            .map_err(|e| format!("failed to parse config '{}': {e}", path.display())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound && allow_missing => {
            Ok(ConfigFile::default())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(format!("config file not found '{}'", path.display()))
        }
        Err(e) => Err(format!("failed to read config '{}': {e}", path.display())),
    }
}

/// Backend URL precedence: explicit flag, environment, config file, default.
pub fn resolve_backend_url(flag: Option<String>, cfg: &ConfigFile) -> String {
    flag.filter(|v| !v.trim().is_empty())
        .or_else(|| env::var(BACKEND_URL_ENV).ok().filter(|v| !v.trim().is_empty()))
        .or_else(|| cfg.backend_url.clone())
        .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string())
}

fn default_config_yaml() -> String {
    r#"# ledgerdesk config
#
# Location (default):
#   ~/.ledgerdesk/config.yml

# Backend API root (LEDGERDESK_BACKEND_URL overrides this)
backend_url: http://127.0.0.1:8000/

# HTTP
timeout: 10
# proxy: http://127.0.0.1:8080

# Where the login session is kept
# session_file: ~/.ledgerdesk/session.json

# Tables
page_size: "5"
output_format: text

# Output styling
no_color: false
"#
    .to_string()
}

pub fn ensure_default_config_file(path: &PathBuf) -> Result<bool, String> {
    if path.exists() {
        return Ok(false);
    }
    let parent = path
        .parent()
        .ok_or_else(|| format!("invalid config path '{}'", path.display()))?;
    std::fs::create_dir_all(parent).map_err(|e| {
        format!(
            "failed to create config directory '{}': {e}",
            parent.display()
        )
    })?;
    std::fs::write(path, default_config_yaml())
        .map_err(|e| format!("failed to write config file '{}': {e}", path.display()))?;
    Ok(true)
}

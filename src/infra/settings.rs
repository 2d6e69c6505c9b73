//! Usage: Persisted application settings (schema + read/write helpers).
//!
//! Layout on disk (`settings.json` in the app data dir): top-level keys
//! `personal`, `business` (each `{notifications, url}`) and `app`
//! (`{darkMode}`). Absent keys fall back to built-in defaults independently
//! per key. Account URLs are repaired back to the built-in default when a
//! persisted value escapes the allowed host set.

use crate::supervisor::nav_guard;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const SCHEMA_VERSION: u32 = 1;

pub const DEFAULT_PERSONAL_URL: &str = "https://web.whatsapp.com";
pub const DEFAULT_BUSINESS_URL: &str = "https://web.whatsapp.com";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AccountSettings {
    pub notifications: bool,
    pub url: String,
}

impl Default for AccountSettings {
    fn default() -> Self {
        Self {
            notifications: true,
            url: DEFAULT_PERSONAL_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppSection {
    pub dark_mode: bool,
}

impl Default for AppSection {
    fn default() -> Self {
        Self { dark_mode: false }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub schema_version: u32,
    pub personal: AccountSettings,
    pub business: AccountSettings,
    pub app: AppSection,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            personal: AccountSettings::default(),
            business: AccountSettings {
                notifications: true,
                url: DEFAULT_BUSINESS_URL.to_string(),
            },
            app: AppSection::default(),
        }
    }
}

fn sanitize_account_url(url: &mut String, default_url: &str) -> bool {
    let trimmed = url.trim();
    if trimmed != url.as_str() {
        *url = trimmed.to_string();
    }
    if nav_guard::is_allowed_target(url) {
        return false;
    }
    tracing::warn!(url = %url, "持久化的视图地址不在允许域名内，已重置为默认地址");
    *url = default_url.to_string();
    true
}

fn sanitize_account_urls(settings: &mut AppSettings) -> bool {
    let mut changed = false;
    changed |= sanitize_account_url(&mut settings.personal.url, DEFAULT_PERSONAL_URL);
    changed |= sanitize_account_url(&mut settings.business.url, DEFAULT_BUSINESS_URL);
    changed
}

fn migrate_schema_version(settings: &mut AppSettings, schema_version_present: bool) -> bool {
    // If the schema version is missing, force a write to persist the current schema_version so we
    // don't re-run migrations on every startup.
    if schema_version_present && settings.schema_version >= SCHEMA_VERSION {
        return false;
    }

    settings.schema_version = SCHEMA_VERSION;
    true
}

fn parse_settings_json(content: &str) -> Result<(AppSettings, bool), String> {
    let raw: serde_json::Value =
        serde_json::from_str(content).map_err(|e| format!("failed to parse settings.json: {e}"))?;
    let schema_version_present = raw.get("schema_version").is_some();
    let settings: AppSettings =
        serde_json::from_value(raw).map_err(|e| format!("failed to parse settings.json: {e}"))?;
    Ok((settings, schema_version_present))
}

pub(crate) fn read_from_path(path: &Path) -> Result<AppSettings, String> {
    if !path.exists() {
        let settings = AppSettings::default();
        // Best-effort: create default settings.json on first read to make the config discoverable/editable.
        let _ = write_to_path(path, &settings);
        return Ok(settings);
    }

    let content =
        std::fs::read_to_string(path).map_err(|e| format!("failed to read settings: {e}"))?;
    let (mut settings, schema_version_present) = parse_settings_json(&content)?;

    let mut repaired = false;
    repaired |= migrate_schema_version(&mut settings, schema_version_present);
    repaired |= sanitize_account_urls(&mut settings);
    if repaired {
        // Best-effort: persist repaired values while keeping read semantics.
        let _ = write_to_path(path, &settings);
    }

    Ok(settings)
}

pub(crate) fn write_to_path(path: &Path, settings: &AppSettings) -> Result<AppSettings, String> {
    if !nav_guard::is_allowed_target(settings.personal.url.trim()) {
        return Err(format!(
            "personal.url host is not in the allowed domain set: {}",
            settings.personal.url
        ));
    }
    if !nav_guard::is_allowed_target(settings.business.url.trim()) {
        return Err(format!(
            "business.url host is not in the allowed domain set: {}",
            settings.business.url
        ));
    }

    let mut settings = settings.clone();
    settings.schema_version = SCHEMA_VERSION;
    settings.personal.url = settings.personal.url.trim().to_string();
    settings.business.url = settings.business.url.trim().to_string();

    let tmp_path = path.with_file_name("settings.json.tmp");
    let backup_path = path.with_file_name("settings.json.bak");

    let content = serde_json::to_vec_pretty(&settings)
        .map_err(|e| format!("failed to serialize settings: {e}"))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("failed to create dir {}: {e}", parent.display()))?;
    }

    std::fs::write(&tmp_path, content)
        .map_err(|e| format!("failed to write temp settings file: {e}"))?;

    if backup_path.exists() {
        let _ = std::fs::remove_file(&backup_path);
    }

    if path.exists() {
        std::fs::rename(path, &backup_path)
            .map_err(|e| format!("failed to create settings backup: {e}"))?;
    }

    if let Err(e) = std::fs::rename(&tmp_path, path) {
        let _ = std::fs::rename(&backup_path, path);
        return Err(format!("failed to finalize settings: {e}"));
    }

    if backup_path.exists() {
        let _ = std::fs::remove_file(&backup_path);
    }

    Ok(settings)
}

fn settings_path(app: &tauri::AppHandle) -> Result<PathBuf, String> {
    Ok(crate::app_paths::app_data_dir(app)?.join("settings.json"))
}

pub fn read(app: &tauri::AppHandle) -> Result<AppSettings, String> {
    read_from_path(&settings_path(app)?)
}

pub fn write(app: &tauri::AppHandle, settings: &AppSettings) -> Result<AppSettings, String> {
    write_to_path(&settings_path(app)?, settings)
}

#[cfg(test)]
mod tests;

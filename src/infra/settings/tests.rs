use super::*;

fn temp_settings_path() -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("settings.json");
    (dir, path)
}

#[test]
fn missing_file_yields_defaults_and_creates_file() {
    let (_dir, path) = temp_settings_path();

    let settings = read_from_path(&path).expect("read defaults");

    assert_eq!(settings, AppSettings::default());
    assert!(settings.personal.notifications);
    assert_eq!(settings.personal.url, DEFAULT_PERSONAL_URL);
    assert!(path.exists(), "first read should persist defaults");
}

#[test]
fn write_then_read_round_trips() {
    let (_dir, path) = temp_settings_path();

    let mut settings = AppSettings::default();
    settings.personal.notifications = false;
    settings.business.url = "https://web.whatsapp.com/business".to_string();
    settings.app.dark_mode = true;

    let saved = write_to_path(&path, &settings).expect("write settings");
    assert_eq!(saved, settings);

    let loaded = read_from_path(&path).expect("read settings");
    assert_eq!(loaded, settings);
}

#[test]
fn absent_keys_fall_back_independently() {
    let (_dir, path) = temp_settings_path();

    // Only the business section is persisted; personal and app must resolve to defaults.
    std::fs::write(
        &path,
        r#"{ "schema_version": 1, "business": { "notifications": false } }"#,
    )
    .expect("seed settings file");

    let settings = read_from_path(&path).expect("read settings");

    assert!(!settings.business.notifications);
    assert_eq!(settings.business.url, DEFAULT_PERSONAL_URL);
    assert_eq!(settings.personal, AccountSettings::default());
    assert_eq!(settings.app, AppSection::default());
}

#[test]
fn missing_schema_version_is_persisted_on_read() {
    let (_dir, path) = temp_settings_path();

    std::fs::write(&path, r#"{ "app": { "darkMode": true } }"#).expect("seed settings file");

    let settings = read_from_path(&path).expect("read settings");
    assert_eq!(settings.schema_version, SCHEMA_VERSION);
    assert!(settings.app.dark_mode);

    let content = std::fs::read_to_string(&path).expect("re-read settings file");
    assert!(content.contains("schema_version"));
}

#[test]
fn disallowed_persisted_url_is_repaired_to_default() {
    let (_dir, path) = temp_settings_path();

    std::fs::write(
        &path,
        r#"{ "schema_version": 1, "personal": { "notifications": true, "url": "https://evil.example.com" } }"#,
    )
    .expect("seed settings file");

    let settings = read_from_path(&path).expect("read settings");
    assert_eq!(settings.personal.url, DEFAULT_PERSONAL_URL);

    // The repair is written back so the next read is clean.
    let reloaded = read_from_path(&path).expect("re-read settings");
    assert_eq!(reloaded.personal.url, DEFAULT_PERSONAL_URL);
}

#[test]
fn write_rejects_disallowed_url() {
    let (_dir, path) = temp_settings_path();

    let mut settings = AppSettings::default();
    settings.business.url = "https://evil.example.com".to_string();

    let err = write_to_path(&path, &settings).expect_err("write must fail");
    assert!(err.contains("business.url"), "unexpected error: {err}");
    assert!(!path.exists(), "rejected write must not create the file");
}

#[test]
fn dark_mode_uses_camel_case_key_on_disk() {
    let (_dir, path) = temp_settings_path();

    let mut settings = AppSettings::default();
    settings.app.dark_mode = true;
    write_to_path(&path, &settings).expect("write settings");

    let content = std::fs::read_to_string(&path).expect("read raw settings");
    assert!(content.contains("\"darkMode\": true"));
}

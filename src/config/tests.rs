use std::io::Write;

use serde_json::json;

use super::*;

#[test]
fn defaults_resolve_without_sources() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.logging.level, LevelFilter::INFO);
    assert!(matches!(settings.logging.format, LogFormat::Compact));
    assert_eq!(
        settings.render.default_expiration,
        Duration::from_secs(DEFAULT_EXPIRATION_SECS)
    );
    assert!(!settings.render.device_partitioning);
    assert_eq!(settings.render.block_template_root, "blocks");
    assert_eq!(settings.store.max_entries.get(), DEFAULT_MAX_ENTRIES);
}

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.render.default_expiration_seconds = Some(600);
    raw.logging.level = Some("info".to_string());

    let overrides = SettingsOverrides {
        default_expiration_seconds: Some(0),
        log_level: Some("debug".to_string()),
        device_partitioning: Some(true),
        ..Default::default()
    };

    raw.apply_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.render.default_expiration, Duration::ZERO);
    assert!(settings.render.device_partitioning);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    raw.apply_overrides(&SettingsOverrides {
        log_json: Some(true),
        ..Default::default()
    });
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn invalid_log_level_is_rejected() {
    let mut raw = RawSettings::default();
    raw.logging.level = Some("loud".to_string());

    let err = Settings::from_raw(raw).expect_err("invalid level");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "logging.level",
            ..
        }
    ));
}

#[test]
fn zero_store_capacity_is_rejected() {
    let mut raw = RawSettings::default();
    raw.store.max_entries = Some(0);

    let err = Settings::from_raw(raw).expect_err("zero capacity");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "store.max_entries",
            ..
        }
    ));
}

#[test]
fn block_template_root_cannot_escape() {
    let mut raw = RawSettings::default();
    raw.render.block_template_root = Some("../secrets".to_string());

    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn config_file_is_layered_under_cli() {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("temp config file");
    writeln!(
        file,
        "[render]\ndefault_expiration_seconds = 120\nblock_template_root = \"partials\"\n\n[store]\nmax_entries = 16"
    )
    .expect("write config");

    let path = file.path().to_str().expect("utf-8 path").to_string();
    let args = CliArgs::parse_from([
        "viewcache",
        "--config-file",
        path.as_str(),
        "page",
        "home",
        "--store-max-entries",
        "32",
    ]);
    let settings = load(&args).expect("settings load");

    assert_eq!(settings.render.default_expiration, Duration::from_secs(120));
    assert_eq!(settings.render.block_template_root, "partials");
    assert_eq!(settings.store.max_entries.get(), 32);
}

#[test]
fn parse_page_arguments() {
    let args = CliArgs::parse_from([
        "viewcache",
        "page",
        "home",
        "--data",
        r#"{"title": "Home"}"#,
        "--tag",
        "lang-en",
        "--tag",
        "theme-dark",
        "--ttl",
        "60",
        "--repeat",
        "2",
    ]);

    match args.command {
        Command::Page(page) => {
            assert_eq!(page.path, "home");
            assert_eq!(page.data.get("title"), Some(&json!("Home")));
            assert_eq!(page.render.tags, vec!["lang-en", "theme-dark"]);
            assert_eq!(page.render.ttl, Some(60));
            assert_eq!(page.render.repeat, 2);
            assert!(page.render.user.is_empty());
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_block_arguments() {
    let args = CliArgs::parse_from([
        "viewcache",
        "block",
        "recent",
        "--query",
        r#"{"limit": 2}"#,
        "--locals",
        r#"{"heading": "Latest"}"#,
        "--device",
        "mobile",
        "--render-device-partitioning",
        "true",
    ]);

    match args.command {
        Command::Block(block) => {
            assert_eq!(block.path, "recent");
            assert_eq!(block.query, Some(json!({"limit": 2})));
            assert_eq!(block.locals.get("heading"), Some(&json!("Latest")));
            assert_eq!(block.render.device.as_deref(), Some("mobile"));
            assert_eq!(block.render.overrides.device_partitioning, Some(true));
            assert_eq!(block.render.repeat, 1);
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn non_object_data_is_rejected() {
    let result = CliArgs::try_parse_from(["viewcache", "page", "home", "--data", "[1, 2]"]);
    assert!(result.is_err());
}

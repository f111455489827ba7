//! Config layering: built-in defaults < default.toml < $TVL_LAG_ENV file < TVL_LAG_* env vars.
//!
//! Everything lives in one test because the environment is process-wide.

use std::fs;
use std::path::PathBuf;
use tvl_price_lag::config::AppConfig;

fn temp_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("tvl-lag-config-{}", uuid::Uuid::new_v4().simple()));
    fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn files_and_env_override_defaults_in_order() {
    let dir = temp_dir();
    fs::write(
        dir.join("default.toml"),
        r#"
[[protocols]]
slug = "curve-dex"
token = "CRV"
coin_id = "curve-dao-token"

[window]
days = 45

[http]
retry_statuses = [503]
max_retries = 2
"#,
    )
    .unwrap();
    fs::write(
        dir.join("ci.toml"),
        r#"
[http]
max_retries = 1

[output]
dir = "/tmp/tvl-lag-ci"
"#,
    )
    .unwrap();

    std::env::set_var("TVL_LAG_ENV", "ci");
    std::env::set_var("TVL_LAG_WINDOW__DAYS", "30");
    let loaded = AppConfig::load_from(&dir);
    std::env::remove_var("TVL_LAG_ENV");
    std::env::remove_var("TVL_LAG_WINDOW__DAYS");
    let config = loaded.unwrap();

    // default.toml replaces the protocol list wholesale
    let slugs: Vec<&str> = config.protocols.iter().map(|p| p.slug.as_str()).collect();
    assert_eq!(slugs, vec!["curve-dex"]);
    assert_eq!(config.protocols[0].coin_id, "curve-dao-token");
    assert_eq!(config.http.retry_statuses, vec![503]);

    // the environment file beats default.toml, env vars beat both
    assert_eq!(config.http.max_retries, 1);
    assert_eq!(config.output.dir, PathBuf::from("/tmp/tvl-lag-ci"));
    assert_eq!(config.window.days, 30);

    // untouched keys keep the built-in values
    assert_eq!(config.window.end_offset_days, 1);
    assert_eq!(config.lags.min, -5);
    assert_eq!(config.lags.max, 5);
    assert_eq!(config.http.timeout_secs, 30);
    assert_eq!(config.sources.vs_currency, "usd");
    assert_eq!(config.output.data_file, "data.csv");
    assert!(config.validate().is_ok());

    fs::remove_dir_all(&dir).unwrap();
}

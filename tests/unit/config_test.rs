//! Tests for configuration validation and loading

use std::collections::HashMap;
use std::time::Duration;

use prometheus_job_scheduler::config::{RateWindow, SchedulerConfig, ENV_PREFIX};

#[test]
fn test_default_config_is_valid() {
    let cfg = SchedulerConfig::default();
    assert!(cfg.validate().is_ok());
    assert!(cfg.auto_start);
    assert!(cfg.timeout().is_none());
    assert!(cfg.rate_window().is_none());
}

#[test]
fn test_invalid_concurrency() {
    let cfg = SchedulerConfig::new().with_concurrency(0);
    assert!(cfg.validate().is_err());
}

#[test]
fn test_invalid_zero_timeout() {
    let cfg = SchedulerConfig {
        timeout_ms: Some(0),
        ..SchedulerConfig::new()
    };
    assert!(cfg.validate().is_err());
}

#[test]
fn test_rate_window_builder() {
    let cfg = SchedulerConfig::new()
        .with_concurrency(3)
        .with_rate_window(5, Duration::from_millis(250));
    assert!(cfg.validate().is_ok());
    assert_eq!(
        cfg.rate_window(),
        Some(RateWindow {
            cap: 5,
            period: Duration::from_millis(250),
        })
    );
}

#[test]
fn test_rate_window_half_configured() {
    let cap_only = SchedulerConfig {
        interval_cap: Some(2),
        ..SchedulerConfig::new()
    };
    assert!(cap_only.validate().is_err());

    let interval_only = SchedulerConfig {
        interval_ms: Some(100),
        ..SchedulerConfig::new()
    };
    assert!(interval_only.validate().is_err());
}

#[test]
fn test_rate_window_zero_cap() {
    let cfg = SchedulerConfig::new().with_rate_window(0, Duration::from_secs(1));
    assert!(cfg.validate().is_err());
}

#[test]
fn test_from_json_str() {
    let cfg = SchedulerConfig::from_json_str(
        r#"{"concurrency": 4, "timeout_ms": 1500, "auto_start": false}"#,
    )
    .unwrap();
    assert_eq!(cfg.concurrency, 4);
    assert_eq!(cfg.timeout(), Some(Duration::from_millis(1500)));
    assert!(!cfg.auto_start);
    assert!(cfg.rate_window().is_none());
}

#[test]
fn test_from_json_str_rejects_invalid() {
    assert!(SchedulerConfig::from_json_str("{ not json").is_err());
    assert!(SchedulerConfig::from_json_str(r#"{"concurrency": 0}"#).is_err());
    assert!(SchedulerConfig::from_json_str(r#"{"interval_cap": 3}"#).is_err());
}

#[test]
fn test_json_roundtrip_preserves_fields() {
    let cfg = SchedulerConfig::new()
        .with_concurrency(8)
        .with_rate_window(10, Duration::from_secs(1));
    let json = serde_json::to_string(&cfg).unwrap();
    assert_eq!(SchedulerConfig::from_json_str(&json).unwrap(), cfg);
}

#[test]
fn test_from_lookup() {
    let vars: HashMap<String, String> = [
        ("CONCURRENCY", "6"),
        ("AUTO_START", "false"),
        ("INTERVAL_CAP", "2"),
        ("INTERVAL_MS", "1000"),
    ]
    .into_iter()
    .map(|(k, v)| (format!("{ENV_PREFIX}{k}"), v.to_string()))
    .collect();

    let cfg = SchedulerConfig::from_lookup(|key| vars.get(key).cloned()).unwrap();
    assert_eq!(cfg.concurrency, 6);
    assert!(!cfg.auto_start);
    assert_eq!(cfg.rate_window().map(|w| w.cap), Some(2));
    assert!(cfg.timeout_ms.is_none());
}

#[test]
fn test_from_lookup_reports_bad_value() {
    let err = SchedulerConfig::from_lookup(|key| {
        (key == "JOB_SCHEDULER_TIMEOUT_MS").then(|| "soon".to_string())
    })
    .unwrap_err();
    assert!(err.contains("JOB_SCHEDULER_TIMEOUT_MS"));
}

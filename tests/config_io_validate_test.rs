use solis_flux::config::Config;
use std::fs;

#[test]
fn save_and_load_yaml_roundtrip() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let path = tmp_dir.path().join("config.yaml");

    let mut cfg = Config::default();
    cfg.solis_control.charge_period.start = "01:30".to_string();
    cfg.forecast_remaining = "sensor.forecast_remaining".to_string();
    cfg.logging.file = path.with_extension("log").to_string_lossy().to_string();

    cfg.save_to_file(&path).unwrap();
    let loaded = Config::from_file(&path).unwrap();

    assert_eq!(loaded.solis_control.charge_period.start, "01:30");
    assert_eq!(loaded.forecast_remaining, "sensor.forecast_remaining");
    assert_eq!(loaded.logging.file, cfg.logging.file);
}

#[test]
fn token_is_not_written_back() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let path = tmp_dir.path().join("config.yaml");

    let mut cfg = Config::default();
    cfg.home_assistant.token = Some("secret".to_string());
    cfg.save_to_file(&path).unwrap();

    let yaml = fs::read_to_string(&path).unwrap();
    assert!(!yaml.contains("secret"));
}

#[test]
fn minimal_file_gets_defaults() {
    let tmp = tempfile::NamedTempFile::new().unwrap();
    fs::write(
        tmp.path(),
        r#"
morning_requirement: 6.5
evening_requirement: 3.0
forecast_remaining: solcast_forecast_remaining
solis_control:
  charge_period: { start: "02:30", end: "05:30" }
  discharge_period: { start: "16:00", end: "19:00" }
  battery_capacity_kwh: 9.6
  overdischarge_soc: 15
  charge_power_kw: 3.6
  discharge_power_kw: 3.6
  entities:
    battery_soc: sensor.battery_soc
    charge_start: time.charge_start
    charge_end: time.charge_end
    discharge_start: time.discharge_start
    discharge_end: time.discharge_end
"#,
    )
    .unwrap();

    let cfg = Config::from_file(tmp.path()).unwrap();
    assert_eq!(cfg.cron_before, 20);
    assert_eq!(cfg.retry_delay_seconds, 300);
    assert_eq!(cfg.timezone, "UTC");
    assert!((cfg.solis_control.overdischarge_soc - 15.0).abs() < 1e-9);
    assert_eq!(cfg.home_assistant.base_url, "http://localhost:8123");
}

#[test]
fn missing_required_key_fails_fast() {
    let tmp = tempfile::NamedTempFile::new().unwrap();
    fs::write(tmp.path(), "morning_requirement: 6.5\n").unwrap();
    assert!(Config::from_file(tmp.path()).is_err());
}

#[test]
fn config_validation_errors() {
    let mut cfg = Config::default();
    assert!(cfg.validate().is_ok());

    cfg.cron_before = -5;
    assert!(cfg.validate().is_err());

    cfg = Config::default();
    cfg.solis_control.discharge_period.end = "25:00".to_string();
    assert!(cfg.validate().is_err());

    cfg = Config::default();
    cfg.solis_control.battery_capacity_kwh = 0.0;
    assert!(cfg.validate().is_err());

    cfg = Config::default();
    cfg.solis_control.overdischarge_soc = 100.0;
    assert!(cfg.validate().is_err());

    cfg = Config::default();
    cfg.evening_requirement = f64::NAN;
    assert!(cfg.validate().is_err());

    cfg = Config::default();
    cfg.solis_control.entities.charge_end.clear();
    assert!(cfg.validate().is_err());

    cfg = Config::default();
    cfg.web.port = 0;
    assert!(cfg.validate().is_err());
    cfg.web.enabled = false;
    assert!(cfg.validate().is_ok());
}

#[test]
fn from_file_with_invalid_yaml_fails() {
    let tmp = tempfile::NamedTempFile::new().unwrap();
    fs::write(tmp.path(), b"bad: [unclosed").unwrap();
    let err = Config::from_file(tmp.path()).unwrap_err();
    let msg = format!("{}", err);
    assert!(msg.contains("Serialization error"));
}

#[test]
fn partial_sections_fill_in_defaults() {
    let tmp = tempfile::NamedTempFile::new().unwrap();
    fs::write(
        tmp.path(),
        r#"
morning_requirement: 6.5
evening_requirement: 3.0
forecast_remaining: solcast_forecast_remaining
solis_control:
  charge_period: { start: "02:30", end: "05:30" }
  discharge_period: { start: "16:00", end: "19:00" }
  battery_capacity_kwh: 9.6
  overdischarge_soc: 15
  charge_power_kw: 3.6
  discharge_power_kw: 3.6
  entities:
    battery_soc: sensor.battery_soc
    charge_start: time.charge_start
    charge_end: time.charge_end
    discharge_start: time.discharge_start
    discharge_end: time.discharge_end
home_assistant:
  base_url: http://ha.lan:8123
persistence: {}
logging:
  level: DEBUG
web:
  port: 8099
"#,
    )
    .unwrap();

    let cfg = Config::from_file(tmp.path()).unwrap();
    assert_eq!(cfg.home_assistant.base_url, "http://ha.lan:8123");
    assert_eq!(cfg.home_assistant.timeout_seconds, 10);
    assert!(cfg.home_assistant.token.is_none());
    assert_eq!(cfg.persistence.file, "/data/solis_flux_state.json");
    assert_eq!(cfg.logging.level, "DEBUG");
    assert_eq!(cfg.logging.file, Config::default().logging.file);
    assert_eq!(cfg.web.port, 8099);
    assert_eq!(cfg.web.host, Config::default().web.host);
}

mod common;

use common::{FORECAST_SENSOR, FakeStates, ScriptedInverter, forecast_store, test_config, time_setter};
use solis_flux::config::Config;
use solis_flux::controls::{Period, RunMode};
use solis_flux::service::{DiagnosticService, TestRequest};
use solis_flux::setter::TimesOutcome;
use std::sync::Arc;

fn build_service(
    config: &Config,
    states: Arc<FakeStates>,
    inverter: ScriptedInverter,
) -> (DiagnosticService, Arc<common::Calls>, solis_flux::forecast::ForecastStore) {
    let store = forecast_store(config, states);
    let (setter, calls) = time_setter(config, inverter);
    (
        DiagnosticService::new(
            store.clone(),
            setter,
            config.morning_requirement,
            config.evening_requirement,
        ),
        calls,
        store,
    )
}

fn request(action: &str, level_required: Option<f64>, use_forecast: bool) -> TestRequest {
    TestRequest {
        action: action.to_string(),
        level_required,
        use_forecast,
    }
}

#[tokio::test]
async fn charge_defaults_to_morning_requirement_in_test_mode() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir.path().join("state.json"));
    let (service, calls, _) = build_service(&config, FakeStates::new(), ScriptedInverter::new(30.0));

    let report = service.test(request("charge", None, false)).await;

    assert!((report.level_required - 8.0).abs() < 1e-9);
    assert_eq!(report.forecast, None);
    let Some(TimesOutcome::Ok { report: times }) = report.outcome else {
        panic!("expected OK");
    };
    assert_eq!(times.mode, RunMode::Test);
    assert_eq!(times.label, "notional charge");
    assert_eq!(calls.checks(), 1);
    assert_eq!(calls.sets(), 0);
}

#[tokio::test]
async fn explicit_level_is_used() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir.path().join("state.json"));
    let (service, _calls, _) = build_service(&config, FakeStates::new(), ScriptedInverter::new(60.0));

    let report = service.test(request("discharge", Some(2.5), false)).await;
    assert!((report.level_required - 2.5).abs() < 1e-9);
    assert!(report.outcome.is_some_and(|o| o.is_ok()));
}

#[tokio::test]
async fn forecast_is_subtracted_but_not_recorded() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir.path().join("state.json"));
    let states = FakeStates::new();
    states.set(FORECAST_SENSOR, "1.5");
    let (service, _calls, store) = build_service(&config, states, ScriptedInverter::new(60.0));

    let report = service.test(request("discharge", None, true)).await;

    assert_eq!(report.forecast, Some(1.5));
    assert!((report.level_required - 2.5).abs() < 1e-9);
    assert!(store.history(Period::Evening).await.is_empty());
}

#[tokio::test]
async fn invalid_action_with_level_is_rejected_without_connecting() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir.path().join("state.json"));
    let (service, calls, _) = build_service(&config, FakeStates::new(), ScriptedInverter::new(60.0));

    let report = service.test(request("boost", Some(3.0), true)).await;

    assert!(matches!(
        report.outcome,
        Some(TimesOutcome::InvalidAction { .. })
    ));
    assert_eq!(calls.opens(), 0);
}

#[tokio::test]
async fn nothing_runs_without_a_level() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(&dir.path().join("state.json"));
    config.morning_requirement = 0.0;
    let (service, calls, _) = build_service(&config, FakeStates::new(), ScriptedInverter::new(60.0));

    let report = service.test(request("charge", None, false)).await;

    assert!(report.outcome.is_none());
    assert_eq!(calls.opens(), 0);
}

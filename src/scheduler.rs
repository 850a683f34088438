//! Daily scheduler for the morning charge and evening discharge runs
//!
//! Each period gets one cron trigger, derived once at startup from the
//! period start minus `cron_before`. A run fetches (and records) the solar
//! forecast, lowers the requirement by it and pushes the resulting window
//! to the inverter. A failed run is retried exactly once after the retry
//! delay.

use crate::config::Config;
use crate::controls::{Period, RunMode, adjusted_level};
use crate::error::{FluxError, Result};
use crate::forecast::ForecastStore;
use crate::inverter::energy::serialize_hhmm;
use crate::inverter::time_adjust;
use crate::logging::{LogContext, StructuredLogger, get_logger, get_logger_with_context};
use crate::setter::{TimeSetter, TimesOutcome};
use chrono::{DateTime, Days, NaiveTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Daily trigger for one period
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyTrigger {
    pub period: Period,

    /// Local time the trigger fires
    #[serde(serialize_with = "serialize_hhmm")]
    pub time: NaiveTime,

    /// Five-field cron expression, `M H * * *`
    pub cron: String,
}

impl DailyTrigger {
    /// Trigger `cron_before` minutes ahead of `period_start`
    pub fn new(period: Period, period_start: NaiveTime, cron_before: i64) -> Self {
        let time = time_adjust(period_start, -cron_before);
        Self {
            period,
            time,
            cron: format!("{} {} * * *", time.minute(), time.hour()),
        }
    }

    /// Next firing strictly after `now`.
    ///
    /// When the local trigger time does not exist on the next day (a
    /// daylight-saving gap), the run moves to the first valid minute after
    /// the gap instead of skipping that day.
    pub fn next_after<Z: TimeZone>(&self, now: &DateTime<Z>) -> Result<DateTime<Z>> {
        let next = cron_parser::parse(&self.cron, now).map_err(|e| {
            FluxError::config(format!("Invalid cron expression '{}': {:?}", self.cron, e))
        })?;

        let local = now.naive_local();
        let mut day = local.date();
        if local.time() >= self.time {
            day = day + Days::new(1);
        }
        if next.date_naive() <= day {
            return Ok(next);
        }

        let tz = now.timezone();
        let mut candidate = day.and_time(self.time);
        for _ in 0..MAX_GAP_MINUTES {
            candidate += chrono::Duration::minutes(1);
            if let Some(fire) = tz.from_local_datetime(&candidate).earliest() {
                return Ok(fire);
            }
        }
        Ok(next)
    }
}

/// Longest daylight-saving gap searched when a trigger time is skipped
const MAX_GAP_MINUTES: u32 = 3 * 60;

/// Wall clock the trigger loop computes firings from
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Runs the two daily entrypoints
#[derive(Clone)]
pub struct Scheduler {
    forecast: ForecastStore,
    setter: TimeSetter,
    morning_requirement: f64,
    evening_requirement: f64,
    retry_delay: Duration,
    triggers: Vec<DailyTrigger>,
    tz: Tz,
    clock: Clock,
    logger: StructuredLogger,
}

impl Scheduler {
    pub fn new(config: &Config, forecast: ForecastStore, setter: TimeSetter) -> Result<Self> {
        let solis = &config.solis_control;
        let triggers = vec![
            DailyTrigger::new(
                Period::Morning,
                solis.charge_period.start_time()?,
                config.cron_before,
            ),
            DailyTrigger::new(
                Period::Evening,
                solis.discharge_period.start_time()?,
                config.cron_before,
            ),
        ];

        Ok(Self {
            forecast,
            setter,
            morning_requirement: config.morning_requirement,
            evening_requirement: config.evening_requirement,
            retry_delay: Duration::from_secs(config.retry_delay_seconds),
            triggers,
            tz: config.tz()?,
            clock: Arc::new(Utc::now),
            logger: get_logger("scheduler"),
        })
    }

    /// Replace the wall clock used to compute trigger firings
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn triggers(&self) -> &[DailyTrigger] {
        &self.triggers
    }

    pub fn retry_delay(&self) -> Duration {
        self.retry_delay
    }

    /// Configured energy requirement of a period
    pub fn requirement(&self, period: Period) -> f64 {
        match period {
            Period::Morning => self.morning_requirement,
            Period::Evening => self.evening_requirement,
        }
    }

    /// One scheduled run: forecast, level, live apply, one retry on failure
    pub async fn run_period(&self, period: Period) -> TimesOutcome {
        let forecast = self.forecast.get_forecast(Some(period), true).await;
        let level = adjusted_level(self.requirement(period), forecast, period);
        let action = period.action();

        let outcome = self.setter.apply(action, level, RunMode::Live).await;
        if outcome.is_ok() {
            return outcome;
        }

        let logger =
            get_logger_with_context(LogContext::new("scheduler").with_period(period.as_str()));
        logger.warn(&format!(
            "Setting {} times failed ({}), retrying in {}s",
            action,
            outcome.status(),
            self.retry_delay.as_secs()
        ));
        tokio::time::sleep(self.retry_delay).await;
        self.setter.apply(action, level, RunMode::Live).await
    }

    pub async fn set_charge_times(&self) -> TimesOutcome {
        self.run_period(Period::Morning).await
    }

    pub async fn set_discharge_times(&self) -> TimesOutcome {
        self.run_period(Period::Evening).await
    }

    /// Fire the daily triggers until `shutdown` flips to true. Each firing
    /// runs as its own task, so a run waiting on its retry does not hold
    /// back the next trigger.
    pub async fn run(&self, shutdown: watch::Receiver<bool>) {
        for trigger in &self.triggers {
            self.logger.info(&format!(
                "Scheduled {} run at {} ({}) in {}",
                trigger.period,
                trigger.time.format("%H:%M"),
                trigger.cron,
                self.tz
            ));
        }

        let handles: Vec<JoinHandle<()>> = self
            .triggers
            .iter()
            .cloned()
            .map(|trigger| {
                let this = self.clone();
                let shutdown = shutdown.clone();
                tokio::spawn(async move { this.trigger_loop(trigger, shutdown).await })
            })
            .collect();

        for handle in handles {
            if let Err(e) = handle.await {
                self.logger.error(&format!("Trigger task failed: {}", e));
            }
        }
        self.logger.info("Scheduler stopped");
    }

    async fn trigger_loop(&self, trigger: DailyTrigger, mut shutdown: watch::Receiver<bool>) {
        loop {
            if *shutdown.borrow() {
                break;
            }

            let now = (self.clock)().with_timezone(&self.tz);
            let next = match trigger.next_after(&now) {
                Ok(next) => next,
                Err(e) => {
                    self.logger.error(&format!("{} trigger disabled: {}", trigger.period, e));
                    break;
                }
            };
            let wait = (next.clone() - now).to_std().unwrap_or_default();
            self.logger.debug(&format!(
                "Next {} run at {}",
                trigger.period,
                next.format("%Y-%m-%d %H:%M %Z")
            ));

            tokio::select! {
                _ = tokio::time::sleep(wait) => {
                    let this = self.clone();
                    let period = trigger.period;
                    tokio::spawn(async move {
                        this.run_period(period).await;
                    });
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
    }
}

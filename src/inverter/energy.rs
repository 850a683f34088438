//! Energy arithmetic for the charge and discharge windows

use crate::config::SolisControlConfig;
use crate::error::Result;
use chrono::{Duration, NaiveTime, Timelike};
use serde::Serialize;

const MINUTES_PER_DAY: i64 = 24 * 60;

/// Shift a time of day by `minutes`, wrapping around midnight
pub fn time_adjust(time: NaiveTime, minutes: i64) -> NaiveTime {
    time.overflowing_add_signed(Duration::minutes(minutes)).0
}

fn minutes_of_day(time: NaiveTime) -> i64 {
    i64::from(time.hour()) * 60 + i64::from(time.minute())
}

/// Length of a window in minutes; windows may cross midnight
fn window_minutes(start: NaiveTime, end: NaiveTime) -> i64 {
    (minutes_of_day(end) - minutes_of_day(start)).rem_euclid(MINUTES_PER_DAY)
}

/// Battery energy picture at one instant (kWh)
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EnergySnapshot {
    /// Energy below the overdischarge SOC that can never be used
    pub unavailable_energy: f64,

    /// Energy at 100% SOC
    pub full_energy: f64,

    /// Energy currently stored
    pub current_energy: f64,

    /// State of charge in percent
    pub soc_percent: f64,
}

impl EnergySnapshot {
    pub fn from_soc(cfg: &SolisControlConfig, soc_percent: f64) -> Self {
        let full = cfg.battery_capacity_kwh;
        Self {
            unavailable_energy: full * cfg.overdischarge_soc / 100.0,
            full_energy: full,
            current_energy: full * soc_percent / 100.0,
            soc_percent,
        }
    }
}

/// Start/end clock times of one inverter slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeWindow {
    #[serde(serialize_with = "serialize_hhmm")]
    pub start: NaiveTime,
    #[serde(serialize_with = "serialize_hhmm")]
    pub end: NaiveTime,
}

pub(crate) fn serialize_hhmm<S: serde::Serializer>(
    time: &NaiveTime,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&time.format("%H:%M").to_string())
}

impl TimeWindow {
    /// Zero-length window, which leaves the slot inactive
    pub fn empty_at(time: NaiveTime) -> Self {
        Self {
            start: time,
            end: time,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn minutes(&self) -> i64 {
        window_minutes(self.start, self.end)
    }
}

/// Slots to write; `None` leaves that slot untouched
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TimeWindows {
    pub charge: Option<TimeWindow>,
    pub discharge: Option<TimeWindow>,
}

/// Open a window of `minutes` at the period start, capped to the period
fn window_from(start: NaiveTime, period_end: NaiveTime, minutes: i64) -> TimeWindow {
    let minutes = minutes.clamp(0, window_minutes(start, period_end));
    TimeWindow {
        start,
        end: time_adjust(start, minutes),
    }
}

/// Charge slot needed to hold `level_required` usable kWh afterwards
pub fn charge_times(
    cfg: &SolisControlConfig,
    snapshot: &EnergySnapshot,
    level_required: f64,
) -> Result<TimeWindow> {
    let start = cfg.charge_period.start_time()?;
    let end = cfg.charge_period.end_time()?;

    let target = (level_required + snapshot.unavailable_energy).min(snapshot.full_energy);
    let to_add = target - snapshot.current_energy;
    if to_add <= 0.0 {
        return Ok(TimeWindow::empty_at(start));
    }

    let minutes = (to_add / cfg.charge_power_kw * 60.0).ceil() as i64;
    Ok(window_from(start, end, minutes))
}

/// Discharge slot that exports everything above `level_required` usable kWh
pub fn discharge_times(
    cfg: &SolisControlConfig,
    snapshot: &EnergySnapshot,
    level_required: f64,
) -> Result<TimeWindow> {
    let start = cfg.discharge_period.start_time()?;
    let end = cfg.discharge_period.end_time()?;

    let surplus = snapshot.current_energy - snapshot.unavailable_energy - level_required;
    if surplus <= 0.0 {
        return Ok(TimeWindow::empty_at(start));
    }

    let minutes = (surplus / cfg.discharge_power_kw * 60.0).floor() as i64;
    Ok(window_from(start, end, minutes))
}

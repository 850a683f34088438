use super::*;

impl Default for PeriodConfig {
    fn default() -> Self {
        Self {
            start: "02:00".to_string(),
            end: "05:00".to_string(),
        }
    }
}

impl Default for InverterEntities {
    fn default() -> Self {
        Self {
            battery_soc: "sensor.solis_remaining_battery_capacity".to_string(),
            charge_start: "time.solis_timed_charge_start".to_string(),
            charge_end: "time.solis_timed_charge_end".to_string(),
            discharge_start: "time.solis_timed_discharge_start".to_string(),
            discharge_end: "time.solis_timed_discharge_end".to_string(),
        }
    }
}

impl Default for SolisControlConfig {
    fn default() -> Self {
        Self {
            charge_period: PeriodConfig::default(),
            discharge_period: PeriodConfig {
                start: "16:00".to_string(),
                end: "19:00".to_string(),
            },
            battery_capacity_kwh: 10.0,
            overdischarge_soc: 20.0,
            charge_power_kw: 3.0,
            discharge_power_kw: 3.0,
            entities: InverterEntities::default(),
        }
    }
}

impl Default for HomeAssistantConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8123".to_string(),
            token: None,
            timeout_seconds: 10,
        }
    }
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            file: "/data/solis_flux_state.json".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            file: "/tmp/solis_flux.log".to_string(),
            backup_count: 5,
            console_output: true,
            json_format: false,
        }
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "127.0.0.1".to_string(),
            port: 8089,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cron_before: default_cron_before(),
            retry_delay_seconds: default_retry_delay_seconds(),
            morning_requirement: 8.0,
            evening_requirement: 4.0,
            forecast_remaining: "solcast_pv_forecast_forecast_remaining_today".to_string(),
            timezone: default_timezone(),
            solis_control: SolisControlConfig::default(),
            home_assistant: HomeAssistantConfig::default(),
            persistence: PersistenceConfig::default(),
            logging: LoggingConfig::default(),
            web: WebConfig::default(),
        }
    }
}

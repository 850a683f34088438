use clap::Parser;

/// Solis Flux - forecast-aware charge and discharge scheduling
#[derive(Debug, Parser)]
#[clap(author, version)]
pub struct Options {
    /// Config file to read; searches the default locations when omitted
    #[clap(short = 'c', long = "config")]
    pub config_file: Option<String>,

    /// Run one diagnostic (notional) call for `charge` or `discharge` and exit
    #[clap(long = "test")]
    pub test_action: Option<String>,

    /// Target level in kWh for `--test`
    #[clap(long = "level", requires = "test_action")]
    pub level_required: Option<f64>,

    /// Subtract the current solar forecast for `--test`
    #[clap(long = "use-forecast", requires = "test_action")]
    pub use_forecast: bool,
}

impl Options {
    pub fn new() -> Self {
        Self::parse()
    }
}

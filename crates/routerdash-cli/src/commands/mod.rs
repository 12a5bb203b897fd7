pub mod api;
pub mod dashboard;
pub mod exec;
pub mod metrics;
pub mod mqtt;
pub mod server;
pub mod speedtest;

use std::fs::File;
use std::path::Path;
use std::time::Duration;

use routerdash_core::{DashboardConfig, HttpBackend};

/// Initialize `env_logger` from `RUST_LOG` (default `info`). With a path,
/// logs go to that file so they don't tear through a full-screen UI.
pub fn init_logging(log_file: Option<&Path>) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if let Some(path) = log_file {
        match File::create(path) {
            Ok(file) => {
                builder.target(env_logger::Target::Pipe(Box::new(file)));
            }
            Err(e) => fail(format!("cannot open log file {}: {e}", path.display())),
        }
    }
    builder.init();
}

/// Dashboard settings from the shared device flags.
pub fn device_config(url: &str, timeout_sec: f64) -> DashboardConfig {
    if !timeout_sec.is_finite() || timeout_sec <= 0.0 {
        fail(format!("--timeout-sec must be positive, got {timeout_sec}"));
    }
    let config = DashboardConfig {
        base_url: url.to_string(),
        request_timeout: Duration::from_secs_f64(timeout_sec),
        ..DashboardConfig::default()
    };
    if let Err(e) = config.validate() {
        fail(e);
    }
    config
}

pub fn make_backend(config: &DashboardConfig) -> HttpBackend {
    HttpBackend::new(config).unwrap_or_else(|e| fail(e))
}

pub fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Runtime::new().unwrap_or_else(|e| fail(format!("cannot start runtime: {e}")))
}

/// Print an error and exit with status 1.
pub fn fail(msg: impl std::fmt::Display) -> ! {
    eprintln!("error: {msg}");
    std::process::exit(1);
}

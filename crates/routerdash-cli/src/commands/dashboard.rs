use std::path::Path;
use std::time::Duration;

use routerdash_core::{
    DashboardController, DashboardModel, HistorySeries, RandomSpeeds, SimulatedMaintenance,
};

pub struct DashboardCommandConfig<'a> {
    pub url: &'a str,
    pub timeout_sec: f64,
    pub poll_ms: u64,
    pub log_file: &'a Path,
    pub seed_history: bool,
}

pub fn run(cfg: DashboardCommandConfig<'_>) {
    super::init_logging(Some(cfg.log_file));

    let mut config = super::device_config(cfg.url, cfg.timeout_sec);
    config.poll_interval = Duration::from_millis(cfg.poll_ms);
    if let Err(e) = config.validate() {
        super::fail(e);
    }
    let backend = super::make_backend(&config);
    let rt = super::runtime();

    let history = if cfg.seed_history {
        HistorySeries::seeded(&mut rand::rng())
    } else {
        HistorySeries::zeroed()
    };
    let model = DashboardModel::new(config.window_len, history, config.device_host());
    let (controller, events) = DashboardController::new(
        &config,
        backend,
        SimulatedMaintenance::default(),
        RandomSpeeds::from_os_rng(),
        rt.handle().clone(),
    );

    log::info!("dashboard connecting to {}", config.base_url);
    let mut app = crate::tui::app::App::new(controller, events, model, &config);
    if let Err(e) = app.run() {
        eprintln!("TUI error: {e}");
        std::process::exit(1);
    }
}

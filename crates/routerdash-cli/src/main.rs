//! CLI for routerdash — a live router dashboard in your terminal.

mod commands;
mod tui;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use routerdash_core::config::DEFAULT_BASE_URL;

#[derive(Parser)]
#[command(name = "routerdash")]
#[command(about = "routerdash — live dashboard for router management APIs")]
#[command(version = routerdash_core::VERSION)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Where the device API lives.
#[derive(Args, Clone)]
struct DeviceArgs {
    /// Device API base URL
    #[arg(long, env = "ROUTERDASH_URL", default_value = DEFAULT_BASE_URL)]
    url: String,

    /// Per-request timeout in seconds
    #[arg(long, default_value = "5")]
    timeout_sec: f64,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive dashboard: live metrics, speed test, MQTT and maintenance panels
    Dashboard {
        #[command(flatten)]
        device: DeviceArgs,

        /// Metrics poll interval in milliseconds
        #[arg(long, env = "ROUTERDASH_POLL_MS", default_value = "2000")]
        poll_ms: u64,

        /// Write logs here instead of the terminal
        #[arg(long, default_value = "routerdash.log")]
        log_file: PathBuf,

        /// Start with an empty bandwidth history instead of synthetic samples
        #[arg(long)]
        empty_history: bool,
    },

    /// Run the mock device API (synthetic metrics, flag-only MQTT broker)
    Server {
        /// Port to listen on
        #[arg(long, default_value = "5000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "0.0.0.0")]
        host: String,

        /// Seed the synthetic metrics for reproducible output
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Fetch one metrics snapshot and print it
    Metrics {
        #[command(flatten)]
        device: DeviceArgs,

        /// Print the raw snapshot as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run the simulated bandwidth test headless
    Speedtest {
        /// Seed target selection for reproducible results
        #[arg(long)]
        seed: Option<u64>,

        /// Print the final result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Query or control the device's MQTT broker
    Mqtt {
        #[command(flatten)]
        device: DeviceArgs,

        #[command(subcommand)]
        action: MqttAction,
    },

    /// Run one command on the device console and print its output
    Exec {
        #[command(flatten)]
        device: DeviceArgs,

        /// Command line, joined with spaces
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },

    /// List the device API endpoints
    Api,
}

#[derive(Subcommand, Clone, Copy)]
enum MqttAction {
    /// Show broker state and counters
    Status,
    /// Start the broker
    Start,
    /// Stop the broker
    Stop,
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Dashboard {
            device,
            poll_ms,
            log_file,
            empty_history,
        } => commands::dashboard::run(commands::dashboard::DashboardCommandConfig {
            url: &device.url,
            timeout_sec: device.timeout_sec,
            poll_ms,
            log_file: &log_file,
            seed_history: !empty_history,
        }),
        Commands::Server { port, host, seed } => {
            commands::init_logging(None);
            commands::server::run(&host, port, seed)
        }
        Commands::Metrics { device, json } => {
            commands::init_logging(None);
            commands::metrics::run(&device.url, device.timeout_sec, json)
        }
        Commands::Speedtest { seed, json } => {
            commands::init_logging(None);
            commands::speedtest::run(seed, json)
        }
        Commands::Mqtt { device, action } => {
            commands::init_logging(None);
            let action = match action {
                MqttAction::Status => commands::mqtt::Action::Status,
                MqttAction::Start => commands::mqtt::Action::Start,
                MqttAction::Stop => commands::mqtt::Action::Stop,
            };
            commands::mqtt::run(&device.url, device.timeout_sec, action)
        }
        Commands::Exec { device, command } => {
            commands::init_logging(None);
            commands::exec::run(&device.url, device.timeout_sec, &command)
        }
        Commands::Api => commands::api::run(),
    }
}

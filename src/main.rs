//! Binary entrypoint for the LoRaBridge CLI.
//!
//! Commands:
//! - `start [--port <path>] [--dry-run]` - open the radio and run the gateway loop
//! - `init` - write a starter `config.toml` with a generated broker client id
//! - `probe --port <path> [-b <baud>]` - check the module answers and dump its settings
//! - `configure [--port <path>]` - push the `[module]` settings to the radio
//! - `status` - print a configuration summary and any validation warnings
//!
//! See the library crate docs for module-level details: `lorabridge::`.
use anyhow::Result;
use clap::{Parser, Subcommand};
use log::{error, info, warn};

use lorabridge::config::Config;

#[derive(Parser)]
#[command(name = "lorabridge")]
#[command(about = "Bridge RYLR998 LoRa telemetry to an MQTT broker")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the gateway
    Start {
        /// Radio serial port, overriding the config (e.g., /dev/ttyUSB0)
        #[arg(short, long)]
        port: Option<String>,
        /// Log publishes instead of connecting to the broker
        #[arg(long)]
        dry_run: bool,
    },
    /// Write a default configuration file
    Init,
    /// Check the radio answers and print its current settings as JSON
    Probe {
        /// Radio serial port
        #[arg(short, long)]
        port: String,
        /// Baud rate
        #[arg(short = 'b', long, default_value_t = 115200)]
        baud: u32,
    },
    /// Apply the configured module settings to the radio
    Configure {
        /// Radio serial port, overriding the config
        #[arg(short, long)]
        port: Option<String>,
    },
    /// Show configuration summary and validation warnings
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let pre_config = match cli.command {
        Commands::Init => None,
        _ => Config::load(&cli.config).await.ok(),
    };
    init_logging(&pre_config, cli.verbose);

    match cli.command {
        Commands::Init => {
            info!("Initializing new LoRaBridge configuration");
            if tokio::fs::metadata(&cli.config).await.is_ok() {
                warn!("{} already exists; leaving it untouched", cli.config);
                return Ok(());
            }
            Config::create_default(&cli.config).await?;
            info!("Configuration file created at {}", cli.config);
        }
        Commands::Status => {
            let config = match pre_config {
                Some(c) => c,
                None => Config::load(&cli.config).await?,
            };
            print_status(&config);
        }
        Commands::Start { port, dry_run } => {
            let config = match pre_config {
                Some(c) => c,
                None => Config::load(&cli.config).await?,
            };
            run_gateway(config, port, dry_run).await?;
        }
        Commands::Probe { port, baud } => {
            let timeout = pre_config
                .as_ref()
                .map(|c| c.radio.command_timeout())
                .unwrap_or(lorabridge::radio::DEFAULT_COMMAND_TIMEOUT);
            probe(&port, baud, timeout)?;
        }
        Commands::Configure { port } => {
            let config = match pre_config {
                Some(c) => c,
                None => Config::load(&cli.config).await?,
            };
            configure(&config, port)?;
        }
    }
    Ok(())
}

fn print_status(config: &Config) {
    println!("LoRaBridge v{}", env!("CARGO_PKG_VERSION"));
    println!(
        "Radio:   {} @ {} baud, command timeout {} ms",
        config.radio.port, config.radio.serial_baud, config.radio.command_timeout_ms
    );
    let m = &config.module;
    println!(
        "Module:  address {} network {} band {} Hz, parameters {},{},{},{}",
        m.address,
        m.network_id,
        m.band,
        m.parameters.spreading_factor,
        m.parameters.bandwidth,
        m.parameters.coding_rate,
        m.parameters.preamble
    );
    println!(
        "Broker:  {}:{} as {}, topic root {}",
        config.broker.host,
        config.broker.port,
        config.broker.client_id,
        config.broker.topic_root.as_deref().unwrap_or("(none, publishing disabled)")
    );
    let problems = config.problems();
    if problems.is_empty() {
        println!("Configuration OK");
    } else {
        for p in &problems {
            println!("WARNING: {}", p);
        }
    }
    let snap = lorabridge::metrics::snapshot();
    println!(
        "Counters: {}",
        serde_json::to_string(&snap).unwrap_or_default()
    );
}

#[cfg(not(feature = "serial"))]
async fn run_gateway(_config: Config, _port: Option<String>, _dry_run: bool) -> Result<()> {
    error!("start requires the 'serial' feature");
    std::process::exit(2);
}

#[cfg(feature = "serial")]
async fn run_gateway(config: Config, port: Option<String>, dry_run: bool) -> Result<()> {
    use lorabridge::gateway::{display::DisplayQueue, report::Reporter, Gateway};
    use lorabridge::radio::{open_serial, RadioModule};

    info!("Starting LoRaBridge v{}", env!("CARGO_PKG_VERSION"));
    for p in config.problems() {
        warn!("Config: {}", p);
    }
    let port_path = port.unwrap_or_else(|| config.radio.port.clone());
    let link = open_serial(&port_path, config.radio.serial_baud)?;
    let mut radio = RadioModule::new(link).with_command_timeout(config.radio.command_timeout());

    if !radio.test_comm()? {
        warn!("Radio on {} did not answer AT; continuing anyway", port_path);
    }
    if config.radio.apply_on_start {
        if config.problems().is_empty() {
            radio.apply_settings(&config.module)?;
        } else {
            warn!("Not applying module settings until the configuration warnings are fixed");
        }
    }
    let snapshot = radio.read_settings()?;
    info!(
        "Radio settings: {}",
        serde_json::to_string(&snapshot).unwrap_or_default()
    );

    let reporter = Reporter::new(
        broker_publisher(&config, dry_run).await,
        config.broker.topic_root.clone(),
        DisplayQueue::new(config.gateway.display_capacity),
    );
    let mut gateway = Gateway::new(radio, reporter, config.gateway.poll_interval());
    gateway.run().await
}

/// The broker side of the pipeline: MQTT when a topic root is configured, otherwise (or
/// with `--dry-run`) publishes only go to the log.
#[cfg(feature = "serial")]
async fn broker_publisher(
    config: &Config,
    dry_run: bool,
) -> Box<dyn lorabridge::gateway::publish::Publisher> {
    use lorabridge::gateway::publish::LogPublisher;

    let Some(root) = config.broker.topic_root.as_deref() else {
        warn!("No topic root configured; telemetry will not be published");
        return Box::new(LogPublisher);
    };
    if dry_run {
        info!("Dry run: logging publishes under {} instead of connecting", root);
        return Box::new(LogPublisher);
    }
    #[cfg(feature = "mqtt")]
    {
        use lorabridge::gateway::mqtt;
        info!(
            "Publishing to {}:{} under {} as {}",
            config.broker.host, config.broker.port, root, config.broker.client_id
        );
        let (publisher, connection) = mqtt::connect(&config.broker);
        tokio::spawn(connection.run());
        if !publisher
            .wait_connected(std::time::Duration::from_secs(5))
            .await
        {
            warn!("MQTT broker not reachable yet; reports will be acknowledged false until it is");
        }
        Box::new(publisher)
    }
    #[cfg(not(feature = "mqtt"))]
    {
        warn!("Built without the 'mqtt' feature; logging publishes under {}", root);
        Box::new(LogPublisher)
    }
}

#[cfg(not(feature = "serial"))]
fn probe(_port: &str, _baud: u32, _timeout: std::time::Duration) -> Result<()> {
    error!("probe requires the 'serial' feature");
    std::process::exit(2);
}

#[cfg(feature = "serial")]
fn probe(port: &str, baud: u32, timeout: std::time::Duration) -> Result<()> {
    use lorabridge::radio::{open_serial, RadioModule};

    info!("Probing radio on {} @ {} baud", port, baud);
    let mut radio = RadioModule::new(open_serial(port, baud)?).with_command_timeout(timeout);
    let alive = radio.test_comm()?;
    let payload = serde_json::json!({
        "status": if alive { "ok" } else { "no_response" },
        "version": radio.firmware_version()?,
        "uid": radio.unique_id()?,
        "settings": radio.read_settings()?,
    });
    println!("{}", payload);
    std::process::exit(if alive { 0 } else { 1 });
}

#[cfg(not(feature = "serial"))]
fn configure(_config: &Config, _port: Option<String>) -> Result<()> {
    error!("configure requires the 'serial' feature");
    std::process::exit(2);
}

#[cfg(feature = "serial")]
fn configure(config: &Config, port: Option<String>) -> Result<()> {
    use lorabridge::radio::{open_serial, RadioModule};
    use lorabridge::validation::validate_radio_settings;

    let errors = validate_radio_settings(&config.module);
    if !errors.is_empty() {
        for e in &errors {
            error!("[module] {}", e);
        }
        anyhow::bail!("refusing to configure radio with invalid settings");
    }
    let port_path = port.unwrap_or_else(|| config.radio.port.clone());
    let link = open_serial(&port_path, config.radio.serial_baud)?;
    let mut radio = RadioModule::new(link).with_command_timeout(config.radio.command_timeout());
    let report = radio.apply_settings(&config.module)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    if config.module.module_baud != config.radio.serial_baud {
        warn!(
            "Module now talks at {} baud; update [radio].serial_baud to match",
            config.module.module_baud
        );
    }
    std::process::exit(if report.all_ok() { 0 } else { 1 });
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // -v overrides the configured level
    let base_level = match verbosity {
        0 => config
            .as_ref()
            .and_then(|c| c.logging.level.parse().ok())
            .unwrap_or(log::LevelFilter::Info),
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);
    let log_file = config
        .as_ref()
        .and_then(|c| c.logging.file.as_ref())
        .and_then(|file| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(file)
                .ok()
        });
    if let Some(f) = log_file {
        let write_mutex = std::sync::Arc::new(std::sync::Mutex::new(f));
        // Echo to the console only when someone is watching it.
        let is_tty = atty::is(atty::Stream::Stdout);
        builder.format(move |fmt, record| {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            let line = format!("{} [{}] {}", ts, record.level(), record.args());
            if let Ok(mut guard) = write_mutex.lock() {
                let _ = writeln!(guard, "{}", line);
            }
            if is_tty {
                writeln!(fmt, "{}", line)
            } else {
                Ok(())
            }
        });
    } else {
        builder.format(|fmt, record| {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            writeln!(fmt, "{} [{}] {}", ts, record.level(), record.args())
        });
    }
    let _ = builder.try_init();
}

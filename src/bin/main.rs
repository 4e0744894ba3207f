// SPDX-License-Identifier: AGPL-3.0-or-later

//! Prometheus exporter for NVMe devices (nvme-exporter)

#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use std::sync::Arc;

#[cfg(feature = "cli")]
use nvme_exporter::{
    preflight, Collector, ExporterConfig, HttpServer, MetricCatalogue, NvmeCli, TemperatureScale,
};

#[cfg(feature = "cli")]
#[derive(Parser)]
#[command(name = "nvme-exporter")]
#[command(
    about = "Prometheus exporter for NVMe namespaces, controllers and smart-log health",
    long_about = None
)]
#[command(version)]
struct Cli {
    /// Port to listen on
    #[arg(long)]
    port: Option<u16>,

    /// Address to bind
    #[arg(long)]
    listen_address: Option<String>,

    /// Temperature scale: celsius, fahrenheit or kelvin
    #[arg(long, alias = "temperature_scale")]
    temperature_scale: Option<String>,

    /// nvme-cli executable, bare name or path
    #[arg(long)]
    nvme_binary: Option<String>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Skip the root and nvme-cli checks at startup
    #[arg(long)]
    skip_preflight: bool,

    /// Poll once, print the metrics to stdout and exit
    #[arg(long)]
    once: bool,

    /// Print a sample configuration file and exit
    #[arg(long)]
    print_config: bool,
}

#[cfg(feature = "cli")]
impl Cli {
    /// Defaults, then the config file, then flags
    fn resolve_config(&self) -> nvme_exporter::Result<ExporterConfig> {
        let mut config = match &self.config {
            Some(path) => ExporterConfig::from_toml_file(path)?,
            None => ExporterConfig::default(),
        };

        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(addr) = &self.listen_address {
            config.listen_address = addr.clone();
        }
        if let Some(scale) = &self.temperature_scale {
            config.temperature_scale = TemperatureScale::from_name(scale);
        }
        if let Some(binary) = &self.nvme_binary {
            config.nvme_binary = binary.clone();
        }
        if self.skip_preflight {
            config.skip_preflight = true;
        }

        config.validate()?;
        Ok(config)
    }
}

#[cfg(feature = "cli")]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.print_config {
        print!("{}", ExporterConfig::sample_toml());
        return Ok(());
    }

    let config = cli.resolve_config()?;

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.log_level.as_filter()),
    )
    .init();

    let scale = config.temperature_scale.clone();
    if !scale.is_recognized() {
        log::warn!(
            "unrecognized temperature scale \"{}\", reporting Kelvin (expected one of: {})",
            scale,
            TemperatureScale::RECOGNIZED.join(", ")
        );
    }

    let binary = if config.skip_preflight {
        std::path::PathBuf::from(&config.nvme_binary)
    } else {
        preflight::run(&config.nvme_binary)?
    };
    let source = NvmeCli::new(binary);

    let catalogue = Arc::new(MetricCatalogue::new(&scale));
    let collector = Collector::new(catalogue, scale);

    if cli.once {
        print!("{}", collector.scrape(&source)?);
        return Ok(());
    }

    log::info!("nvme-exporter {} starting", nvme_exporter::VERSION);

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(HttpServer::new(config, collector, Arc::new(source)).run())?;
    Ok(())
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI features not enabled. Please compile with --features cli");
    std::process::exit(1);
}

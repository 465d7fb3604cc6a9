use std::time::Duration;

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<String>,

    /// Address to bind
    #[arg(long, env = "HOST")]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Deferred mock reply delay in milliseconds
    #[arg(long, env = "REPLY_DELAY_MS")]
    pub reply_delay_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub widget: WidgetConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WidgetConfig {
    /// Delay before the deferred mock reply, in milliseconds.
    pub reply_delay_ms: u64,
    /// How long an idle widget survives before the janitor drops it.
    pub retention_secs: u64,
    /// Interval between janitor sweeps.
    pub sweep_interval_secs: u64,
}

impl WidgetConfig {
    #[must_use]
    pub fn reply_delay(&self) -> Duration {
        Duration::from_millis(self.reply_delay_ms)
    }

    #[must_use]
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }

    #[must_use]
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from_args(std::env::args())
    }

    /// Layered load: defaults, then an optional config file, then
    /// `ASSISTANT_`-prefixed environment variables, then CLI flags.
    pub fn load_from_args<I, T>(args: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli =
            Cli::try_parse_from(args).map_err(|e| config::ConfigError::Message(e.to_string()))?;

        let mut builder = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("widget.reply_delay_ms", 600)?
            .set_default("widget.retention_secs", 1800)?
            .set_default("widget.sweep_interval_secs", 300)?;

        if let Some(path) = &cli.config {
            builder = builder.add_source(File::with_name(path));
        }

        // Environment variables prefixed with ASSISTANT_,
        // e.g. ASSISTANT_SERVER__PORT=8000
        builder = builder.add_source(
            Environment::with_prefix("ASSISTANT")
                .separator("__")
                .try_parsing(true),
        );

        // CLI flags (and their clap-managed env vars) win over everything.
        if let Some(host) = &cli.host {
            builder = builder.set_override("server.host", host.as_str())?;
        }
        if let Some(port) = cli.port {
            builder = builder.set_override("server.port", i64::from(port))?;
        }
        if let Some(delay) = cli.reply_delay_ms {
            builder = builder.set_override("widget.reply_delay_ms", delay)?;
        }

        let cfg = builder.build()?;
        cfg.try_deserialize()
    }
}

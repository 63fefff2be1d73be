use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Agent configuration, loadable from CLI or YAML file.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// TCP destination port to drop. When unset, the slot keeps whatever
    /// default seeding installed.
    #[serde(default)]
    pub drop_port: Option<u16>,

    /// Control/observability API port.
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Frames file to replay through the filter (one hex frame per line).
    #[serde(default)]
    pub input: Option<String>,

    /// Quiet mode (suppress non-error logs).
    #[serde(default)]
    pub quiet: bool,

    /// List of CIDRs allowed to access the API (empty = allow all).
    #[serde(default)]
    pub allowed_ips: Vec<String>,
}

fn default_api_port() -> u16 {
    3000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            drop_port: None,
            api_port: default_api_port(),
            input: None,
            quiet: false,
            allowed_ips: Vec::new(),
        }
    }
}

impl Config {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Merge CLI args into config (CLI takes precedence).
    pub fn merge_cli(&mut self, cli: &CliArgs) {
        if cli.drop_port.is_some() {
            self.drop_port = cli.drop_port;
        }
        if cli.api_port != 3000 {
            self.api_port = cli.api_port;
        }
        if cli.input.is_some() {
            self.input = cli.input.clone();
        }
        if cli.quiet {
            self.quiet = true;
        }
        if !cli.allowed_ips.is_empty() {
            self.allowed_ips = cli.allowed_ips.clone();
        }
    }
}

use clap::Parser;

/// dropflow: IPv4/TCP destination-port drop filter agent
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct CliArgs {
    /// TCP destination port to drop (overrides the seeded default).
    #[arg(short = 'p', long)]
    pub drop_port: Option<u16>,

    /// Port to serve the control API on.
    #[arg(long, default_value_t = 3000)]
    pub api_port: u16,

    /// Frames file to replay through the filter (one hex frame per line).
    #[arg(short, long)]
    pub input: Option<String>,

    /// Path to YAML config file.
    #[arg(short, long)]
    pub config: Option<String>,

    /// Quiet mode (suppress non-error logs).
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// IP CIDRs allowed to access the API (e.g., 10.0.0.0/8). Repeat for multiple.
    #[arg(long)]
    pub allowed_ips: Vec<String>,
}

//! netscope CLI
//!
//! Command-line interface for a running netscope agent.
//!
//! # Usage
//!
//! ```bash
//! netscope run ports
//! netscope run dns --format json
//! netscope dns-custom --name Office --ip 10.0.0.53
//! netscope recommendations
//! netscope report --export report.json
//! netscope settings set --restricted true
//! ```

use clap::{Parser, Subcommand, ValueEnum};

mod commands;
mod config;
mod output;

const DEFAULT_AGENT_URL: &str = "http://127.0.0.1:5000";

#[derive(Parser)]
#[command(name = "netscope")]
#[command(version)]
#[command(about = "netscope Command Line Interface", long_about = None)]
struct Cli {
    /// Agent URL
    #[arg(long, env = "NETSCOPE_AGENT_URL")]
    agent_url: Option<String>,

    /// Output format
    #[arg(long, short)]
    format: Option<output::OutputFormat>,

    /// Profile name from config file
    #[arg(long, short)]
    profile: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a test family on the agent
    Run {
        #[arg(value_enum)]
        family: TestFamily,
    },
    /// Benchmark a single DNS resolver
    DnsCustom {
        #[arg(long, default_value = "Custom")]
        name: String,
        #[arg(long)]
        ip: String,
    },
    /// Recommendations from the stored results
    Recommendations,
    /// Connection architecture from the stored results
    Architecture,
    /// Connection parameter template
    Template,
    /// Full report
    Report {
        /// Write the exported report to this file
        #[arg(long)]
        export: Option<String>,
    },
    /// Agent settings
    Settings {
        #[command(subcommand)]
        action: SettingsCommands,
    },
    /// Configure CLI
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TestFamily {
    Network,
    Ping,
    Dns,
    Cdn,
    Protocol,
    Ports,
}

#[derive(Subcommand)]
enum SettingsCommands {
    /// Show agent settings
    Get,
    /// Change agent settings
    Set {
        #[arg(long, action = clap::ArgAction::Set)]
        restricted: bool,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Set configuration value
    Set { key: String, value: String },
    /// Get configuration value
    Get { key: String },
    /// List all configuration
    List,
    /// Initialize configuration
    Init,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = config::Config::load(cli.profile.as_deref()).unwrap_or_default();
    let agent_url = cli
        .agent_url
        .or(config.agent_url.clone())
        .unwrap_or_else(|| DEFAULT_AGENT_URL.into());
    let format = cli
        .format
        .or_else(|| config.format())
        .unwrap_or(output::OutputFormat::Table);

    let client = commands::AgentClient::new(&agent_url);

    let result = match cli.command {
        Commands::Run { family } => commands::run::handle(family, &client, format).await,
        Commands::DnsCustom { name, ip } => {
            commands::run::dns_custom(&name, &ip, &client, format).await
        }
        Commands::Recommendations => commands::decision::recommendations(&client, format).await,
        Commands::Architecture => commands::decision::architecture(&client, format).await,
        Commands::Template => commands::decision::template(&client, format).await,
        Commands::Report { export } => commands::report::handle(export, &client, format).await,
        Commands::Settings { action } => commands::settings::handle(action, &client, format).await,
        Commands::Config { action } => commands::config::handle(action, cli.profile.as_deref()),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::builder::BoolishValueParser;
use clap::{Parser, Subcommand};
use colored::*;
use serde_json::json;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

use snoopconf::{
    DesiredParams, Mode, NxapiClient, NxosCommandBuilder, Overrides, ParameterSet, Protocol,
    Reconciler, Report, Settings, StateFetcher, Target,
};

/// Reconcile IGMP snooping settings on an NX-API managed switch
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Switch host name or address
    #[arg(long, global = true, env = "SNOOPCONF_HOST")]
    host: Option<String>,

    /// API user name (overrides the settings file)
    #[arg(short, long, global = true)]
    username: Option<String>,

    /// API password (overrides the settings file)
    #[arg(short, long, global = true)]
    password: Option<String>,

    /// Transport used to reach the API
    #[arg(long, value_enum, global = true)]
    protocol: Option<Protocol>,

    /// API port, defaults to 80 or 443 depending on the protocol
    #[arg(long, global = true)]
    port: Option<u16>,

    /// Additional settings file (toml or yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output format: json or pretty
    #[arg(short, long, default_value = "json", global = true)]
    format: String,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Bring IGMP snooping to the requested state
    Apply {
        /// Enable or disable IGMP snooping globally
        #[arg(long, value_parser = BoolishValueParser::new())]
        snooping: Option<bool>,

        /// Group membership timeout in minutes, or "never"
        #[arg(long)]
        group_timeout: Option<String>,

        /// Suppress reports for link-local groups
        #[arg(long, value_parser = BoolishValueParser::new())]
        link_local_grp_supp: Option<bool>,

        /// IGMPv1/v2 report suppression
        #[arg(long, value_parser = BoolishValueParser::new())]
        report_supp: Option<bool>,

        /// IGMPv3 report suppression
        #[arg(long, value_parser = BoolishValueParser::new())]
        v3_report_supp: Option<bool>,

        /// present applies the given values, default restores factory defaults
        #[arg(long, value_enum, default_value_t = Mode::Present)]
        state: Mode,

        /// Show the commands that would be sent without sending them
        #[arg(long)]
        check: bool,
    },

    /// Show the current IGMP snooping state
    Show,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let format = cli.format.clone();
    if let Err(e) = run(cli).await {
        error!("{:#}", e);
        if format == "json" {
            println!("{}", json!({"failed": true, "msg": format!("{:#}", e)}));
        } else {
            eprintln!("{} {:#}", "error:".red().bold(), e);
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let settings = Settings::load(cli.config.as_deref())
        .context("Failed to load settings")?
        .with_overrides(Overrides {
            username: cli.username,
            password: cli.password,
            protocol: cli.protocol,
            port: cli.port,
        });

    // Fail on an unusable client before touching the network.
    let client = Arc::new(NxapiClient::from_settings(&settings)?);

    let host = cli.host.context("No switch given, use --host or SNOOPCONF_HOST")?;
    let target = Target::resolve(&host, settings.protocol, settings.port).await?;
    debug!("Using device {}", target);

    match cli.command {
        Commands::Show => {
            let state = client.fetch(&target).await?;
            print_state(&state, &cli.format)?;
        }
        Commands::Apply {
            snooping,
            group_timeout,
            link_local_grp_supp,
            report_supp,
            v3_report_supp,
            state,
            check,
        } => {
            let desired = DesiredParams {
                snooping,
                group_timeout,
                link_local_grp_supp,
                report_supp,
                v3_report_supp,
            }
            .into_parameter_set()?;

            let reconciler = Reconciler::new(client.clone(), client, Box::new(NxosCommandBuilder))
                .check_mode(check);
            let report = reconciler.run(&target, desired, state).await?;
            print_report(&report, &cli.format)?;
        }
    }

    Ok(())
}

fn print_state(state: &ParameterSet, format: &str) -> Result<()> {
    if format == "json" {
        println!("{}", serde_json::to_string_pretty(state)?);
        return Ok(());
    }

    for (param, value) in state.iter() {
        println!("{:<22} {}", param.to_string().bold(), value);
    }
    Ok(())
}

fn print_report(report: &Report, format: &str) -> Result<()> {
    if format == "json" {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    if !report.changed {
        println!("{}", "No changes needed".green());
        return Ok(());
    }

    println!("{} ({})", "Changes".yellow().bold(), report.mode);
    for (param, value) in report.proposed.iter() {
        match report.existing.get(param) {
            Some(old) if old == value => {}
            Some(old) => println!("  {} {}: {} -> {}", "~".yellow(), param, old, value),
            None => println!("  {} {}: {}", "+".green(), param, value),
        }
    }

    println!("{}", "Commands".bold());
    for command in report.commands.iter() {
        println!("  {}", command);
    }
    Ok(())
}

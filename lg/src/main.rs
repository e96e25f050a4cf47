//! loadgen - weighted-task HTTP load generator
//!
//! CLI entry point for running scenarios and listing them.

use std::fs;
use std::path::PathBuf;

use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use tracing::{debug, info, warn};

use loadgen::cli::{Cli, Command, OutputFormat};
use loadgen::config::Config;
use loadgen::harness::{Harness, RunReport};
use loadgen::http::build_client;
use loadgen::scenario;

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("loadgen")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level).map(|s| s.to_uppercase()) {
        None => tracing::Level::INFO,
        Some(s) => match s.as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
    };

    let log_file = fs::File::create(log_dir.join("loadgen.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    info!(host = %config.host, users = config.users, "loadgen loaded config");

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Run {
            scenario,
            host,
            users,
            spawn_rate,
            run_time_secs,
            seed,
            format,
        } => {
            let config = Config {
                host: host.unwrap_or(config.host),
                users: users.unwrap_or(config.users),
                spawn_rate: spawn_rate.or(config.spawn_rate),
                run_time_secs: run_time_secs.or(config.run_time_secs),
                seed: seed.or(config.seed),
                ..config
            };
            cmd_run(&config, &scenario, format).await
        }
        Command::Scenarios { format } => cmd_scenarios(&config, format),
    }
}

/// Run a scenario and print its summary
async fn cmd_run(config: &Config, name: &str, format: OutputFormat) -> Result<()> {
    debug!(%name, ?format, "cmd_run: called");
    let scenarios = config.scenarios()?;
    let client = build_client(config.request_timeout());
    let scenario = scenario::find(&scenarios, name)?
        .build(&config.host, &client)
        .context(format!("Invalid scenario '{}'", name))?;
    let harness = Harness::new(config.harness_config(), scenario).context("Invalid run settings")?;

    if format == OutputFormat::Text {
        let run_time = match config.run_time_secs {
            Some(secs) => format!("for {}s", secs),
            None => "until Ctrl-C".to_string(),
        };
        println!(
            "{} {} against {} with {} users {}",
            "▶".green(),
            name.cyan(),
            config.host.yellow(),
            config.users,
            run_time
        );
    }

    let report = harness
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "cmd_run: cannot listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        })
        .await;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => print_report(&report),
    }
    Ok(())
}

fn print_report(report: &RunReport) {
    println!();
    println!(
        "Scenario: {}  Duration: {:.1}s  Users: {}",
        report.scenario.cyan(),
        report.elapsed_ms as f64 / 1000.0,
        report.users.len()
    );
    println!(
        "{:<24} {:>10} {:>10} {:>10} {:>10} {:>10}",
        "Name", "Requests", "Failures", "Avg(ms)", "Min(ms)", "Max(ms)"
    );
    for stats in &report.stats {
        let failures = if stats.failures > 0 {
            stats.failures.to_string().red()
        } else {
            stats.failures.to_string().normal()
        };
        println!(
            "{:<24} {:>10} {:>10} {:>10.1} {:>10.1} {:>10.1}",
            stats.action,
            stats.requests,
            failures,
            stats.avg_ms(),
            stats.min_elapsed_us as f64 / 1000.0,
            stats.max_elapsed_us as f64 / 1000.0
        );
    }
    println!(
        "{:<24} {:>10} {:>10} {:>10.1}",
        "Total".bold(),
        report.totals.requests,
        report.totals.failures,
        report.totals.avg_ms
    );
    println!("Requests/s: {:.2}", report.requests_per_sec());

    let errors: Vec<_> = report
        .stats
        .iter()
        .flat_map(|s| s.errors.iter().map(move |(label, count)| (&s.action, label, count)))
        .collect();
    if !errors.is_empty() {
        println!();
        println!("{}", "Failures".red());
        for (action, label, count) in errors {
            println!("  {:<22} {:<24} {}", action, label, count);
        }
    }
}

/// List every scenario; building each one validates it
fn cmd_scenarios(config: &Config, format: OutputFormat) -> Result<()> {
    debug!(?format, "cmd_scenarios: called");
    let client = build_client(config.request_timeout());

    let mut listing = Vec::new();
    for scenario_config in config.scenarios()? {
        let scenario = scenario_config
            .build(&config.host, &client)
            .context(format!("Invalid scenario '{}'", scenario_config.name))?;
        listing.push(scenario);
    }

    match format {
        OutputFormat::Json => {
            let json: Vec<_> = listing
                .iter()
                .map(|s| {
                    let tasks: Vec<_> = s
                        .actions
                        .iter()
                        .map(|(name, weight)| {
                            serde_json::json!({
                                "name": name,
                                "weight": weight,
                                "share": s.actions.share(name),
                            })
                        })
                        .collect();
                    serde_json::json!({
                        "name": s.name,
                        "wait": s.wait.to_string(),
                        "tasks": tasks,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Text => {
            for s in &listing {
                println!("{} (wait: {})", s.name.cyan(), s.wait);
                for (name, weight) in s.actions.iter() {
                    let share = s.actions.share(name).unwrap_or(0.0) * 100.0;
                    println!("  {:<24} weight {:>4}  {:>5.1}%", name, weight, share);
                }
            }
        }
    }
    Ok(())
}

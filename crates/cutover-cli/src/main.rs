//! Operator CLI for the cutover migration engine
//!
//! Drives a directory-backed store: inspect routing state, pull
//! comparison reports, edit modes, force or recover from rollback, and
//! run the retention sweep in the foreground.

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, Command};
use cutover_core::{Backend, CutoverConfig, Feature, FeatureMode};
use cutover_engine::{CutoverBuilder, CutoverService, Janitor};
use cutover_store::DirStore;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Command::new("cutover")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Feature routing, A/B migration and rollback control")
        .arg_required_else_help(true)
        .arg(
            Arg::new("data-dir")
                .long("data-dir")
                .default_value(".cutover")
                .global(true)
                .help("Directory holding persisted configuration and samples"),
        )
        .subcommand(Command::new("status").about("Show routing table, policy and monitor state"))
        .subcommand(
            Command::new("report")
                .about("Aggregate recent samples into a comparison report")
                .arg(
                    Arg::new("feature")
                        .long("feature")
                        .help("Restrict the report to one feature"),
                )
                .arg(
                    Arg::new("window-minutes")
                        .long("window-minutes")
                        .value_parser(value_parser!(u32))
                        .help("Trailing window, default 60 minutes"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output as JSON"),
                ),
        )
        .subcommand(
            Command::new("set-mode")
                .about("Route one feature (the operator path out of a rollback)")
                .arg(Arg::new("feature").required(true).help(
                    "authentication | applications | documents | realtime | analytics",
                ))
                .arg(
                    Arg::new("mode")
                        .required(true)
                        .help("legacy | native | cognito | ab_test"),
                ),
        )
        .subcommand(
            Command::new("rollback")
                .about("Force every feature back to the legacy system")
                .arg(
                    Arg::new("reason")
                        .long("reason")
                        .required(true)
                        .help("Recorded with the rollback notification"),
                ),
        )
        .subcommand(Command::new("reset").about("Restore defaults, clearing samples and assignments"))
        .subcommand(
            Command::new("record")
                .about("Append one performance sample (testing aid)")
                .arg(Arg::new("feature").long("feature").required(true))
                .arg(
                    Arg::new("backend")
                        .long("backend")
                        .required(true)
                        .help("legacy | native"),
                )
                .arg(
                    Arg::new("operation")
                        .long("operation")
                        .default_value("manual"),
                )
                .arg(
                    Arg::new("latency-ms")
                        .long("latency-ms")
                        .required(true)
                        .value_parser(value_parser!(f64)),
                )
                .arg(
                    Arg::new("failed")
                        .long("failed")
                        .action(ArgAction::SetTrue)
                        .help("Record the operation as failed"),
                )
                .arg(Arg::new("error").long("error").help("Error text for a failed operation"))
                .arg(Arg::new("user").long("user").help("Caller identity")),
        )
        .subcommand(
            Command::new("watch")
                .about("Run the retention sweep in the foreground")
                .arg(
                    Arg::new("interval-secs")
                        .long("interval-secs")
                        .default_value("3600")
                        .value_parser(value_parser!(u64)),
                ),
        );

    let matches = cli.get_matches();
    let data_dir = matches
        .get_one::<String>("data-dir")
        .expect("has default")
        .clone();

    match matches.subcommand() {
        Some(("status", _)) => {
            let service = open_service(&data_dir)?;
            print_status(&service);
        }
        Some(("report", args)) => {
            let service = open_service(&data_dir)?;
            let feature = args
                .get_one::<String>("feature")
                .map(|raw| raw.parse::<Feature>())
                .transpose()?;
            let window = args.get_one::<u32>("window-minutes").copied();
            let report = service.report(feature, window);
            if args.get_flag("json") {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
        }
        Some(("set-mode", args)) => {
            let service = open_service(&data_dir)?;
            let feature: Feature = args
                .get_one::<String>("feature")
                .expect("required")
                .parse()?;
            let mode: FeatureMode = args.get_one::<String>("mode").expect("required").parse()?;
            service.set_mode(feature, mode)?;
            println!("{feature} -> {mode}");
        }
        Some(("rollback", args)) => {
            let service = open_service(&data_dir)?;
            let reason = args.get_one::<String>("reason").expect("required");
            service.force_rollback(reason.clone());
            println!("all features rolled back to legacy");
        }
        Some(("reset", _)) => {
            let service = open_service(&data_dir)?;
            service.reset();
            println!("configuration and samples reset to defaults");
        }
        Some(("record", args)) => {
            let service = open_service(&data_dir)?;
            let feature: Feature = args
                .get_one::<String>("feature")
                .expect("required")
                .parse()?;
            let backend: Backend = args
                .get_one::<String>("backend")
                .expect("required")
                .parse()?;
            let operation = args.get_one::<String>("operation").expect("has default");
            let latency = *args.get_one::<f64>("latency-ms").expect("required");
            let failed = args.get_flag("failed");
            service.observe(
                backend,
                feature,
                operation,
                latency,
                !failed,
                args.get_one::<String>("error").map(String::as_str),
                args.get_one::<String>("user").map(String::as_str),
            );
            println!("recorded {operation} on {backend} ({latency} ms)");
        }
        Some(("watch", args)) => {
            let service = Arc::new(open_service(&data_dir)?);
            let interval = *args.get_one::<u64>("interval-secs").expect("has default");
            let janitor = Janitor::spawn(Arc::clone(&service), Duration::from_secs(interval));
            println!("pruning every {interval}s; ctrl-c to stop");
            tokio::signal::ctrl_c().await?;
            janitor.shutdown();
        }
        _ => unreachable!("subcommand required"),
    }

    Ok(())
}

fn open_service(data_dir: &str) -> Result<CutoverService> {
    let store = DirStore::open(data_dir)
        .with_context(|| format!("cannot open data directory {data_dir}"))?;
    Ok(CutoverBuilder::new()
        .with_config(CutoverConfig::from_env())
        .with_store(Box::new(store))
        .build())
}

fn print_status(service: &CutoverService) {
    let config = service.config();
    println!("monitor state: {}", service.monitor_state());
    println!("buffered samples: {}", service.sample_count());
    println!();
    println!("routing:");
    for (feature, mode) in config.routing.iter() {
        println!("  {feature:<16} {mode}");
    }
    println!();
    let policy = &config.policy;
    println!(
        "ab policy: enabled={} split={}% by_user={} override={}",
        policy.enabled,
        policy.split_percentage,
        policy.split_by_user,
        policy
            .admin_override
            .map_or_else(|| "none".to_string(), |r| r.to_string()),
    );
    let thresholds = &config.thresholds;
    println!(
        "thresholds: error_rate={:.1}% latency={:.0}ms window={}m sample_rate={:.2}",
        thresholds.error_rate * 100.0,
        thresholds.mean_latency_ms,
        thresholds.monitor_window_minutes,
        thresholds.sample_rate,
    );
}

fn print_report(report: &cutover_core::Comparison) {
    println!(
        "{:<10} {:>10} {:>14} {:>12} {:>12}",
        "system", "requests", "mean latency", "error rate", "success"
    );
    for (name, stats) in [("legacy", &report.legacy), ("native", &report.native)] {
        println!(
            "{:<10} {:>10} {:>12.1}ms {:>11.2}% {:>11.2}%",
            name,
            stats.total_requests,
            stats.mean_latency_ms,
            stats.error_rate * 100.0,
            stats.success_rate * 100.0,
        );
    }
    println!();
    match report.improvement.baseline {
        cutover_core::BaselineCoverage::Missing => {
            println!("improvement: n/a (no legacy baseline in window)");
        }
        cutover_core::BaselineCoverage::Present => {
            println!(
                "improvement: latency {:+.1}%  errors {:+.1}%  success {:+.1}%",
                report.improvement.latency_pct,
                report.improvement.error_rate_pct,
                report.improvement.success_rate_pct,
            );
        }
    }
}

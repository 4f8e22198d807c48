//! WaferScan Simulator CLI
//!
//! Drives deterministic (or realtime) inspection cycles, optionally exports
//! frame data as JSON, and with the `dashboard` feature launches the
//! interactive TUI.

use clap::Parser;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;
use waferscan_core::{FixtureCatalog, ScanCycleController};
use waferscan_env::{EnvError, TokioContext};
use waferscan_sim::{CycleRunner, RunExport, RunReport, SimContext, SimRunConfig};

/// WaferScan deterministic inspection-cycle simulator
#[derive(Parser, Debug)]
#[command(name = "waferscan-sim")]
#[command(about = "Run wafer-inspection scan cycles", long_about = None)]
struct Args {
    /// Number of complete scan cycles to drive
    #[arg(short, long, default_value = "4")]
    cycles: u32,

    /// Drive against wall-clock tokio timers instead of the virtual clock
    #[arg(long)]
    realtime: bool,

    /// Load a custom fixture catalog from a JSON file
    #[arg(long)]
    fixtures: Option<String>,

    /// Export sampled frames to a JSON file
    #[arg(long)]
    export: Option<String>,

    /// JSON summary output for CI parsing
    #[arg(long)]
    json: bool,

    /// Launch the interactive TUI dashboard (requires the `dashboard` feature)
    #[arg(long)]
    dashboard: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn load_catalog(args: &Args) -> FixtureCatalog {
    match &args.fixtures {
        Some(path) => match FixtureCatalog::from_json_file(path) {
            Ok(catalog) => catalog,
            Err(e) => {
                eprintln!("Error loading fixtures from {}: {}", path, e);
                std::process::exit(1);
            }
        },
        None => FixtureCatalog::builtin(),
    }
}

#[cfg(feature = "dashboard")]
fn run_dashboard(catalog: FixtureCatalog) -> Result<(), EnvError> {
    use waferscan_core::dashboard::InspectionDashboard;

    let controller = ScanCycleController::new(catalog);
    let ctx = TokioContext::shared();
    InspectionDashboard::new(controller, ctx).run()
}

#[cfg(not(feature = "dashboard"))]
fn run_dashboard(_catalog: FixtureCatalog) -> Result<(), EnvError> {
    Err(EnvError::driver(
        "dashboard not available (compile with --features dashboard)",
    ))
}

async fn run_cycles(args: &Args, catalog: FixtureCatalog) -> (SimRunConfig, RunReport) {
    let config = SimRunConfig {
        cycles: args.cycles,
        ..Default::default()
    };
    let runner = CycleRunner::new(config.clone());
    let mut controller = ScanCycleController::new(catalog);

    let report = if args.realtime {
        let ctx = TokioContext::new();
        runner.run(&ctx, &mut controller).await
    } else {
        let ctx = SimContext::new();
        runner.run(&ctx, &mut controller).await
    };

    (config, report)
}

fn main() {
    let args = Args::parse();

    if args.dashboard {
        // The TUI owns the terminal; skip logging setup entirely.
        let catalog = load_catalog(&args);
        if let Err(e) = run_dashboard(catalog) {
            eprintln!("Dashboard error: {}", e);
            std::process::exit(1);
        }
        return;
    }

    // Initialize logging
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    let catalog = load_catalog(&args);

    if !args.json {
        info!("WaferScan Simulator v0.1.0");
        info!(
            cycles = args.cycles,
            wafers = catalog.len(),
            realtime = args.realtime,
            "starting run"
        );
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .expect("Failed to build tokio runtime");
    let (config, report) = runtime.block_on(run_cycles(&args, catalog));

    if args.json {
        let summary = serde_json::json!({
            "cycles": report.cycles.len(),
            "total_ticks": report.total_ticks,
            "final_time_ms": report.final_time_ms,
            "passed": report.passed,
            "failure_reason": report.failure_reason.clone(),
            "results": report.cycles.iter().map(|c| {
                serde_json::json!({
                    "wafer_id": c.wafer_id,
                    "ticks": c.ticks,
                    "defects": c.defect_count,
                    "yield_rate": c.yield_rate,
                })
            }).collect::<Vec<_>>(),
        });
        match serde_json::to_string_pretty(&summary) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing summary: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        for cycle in &report.cycles {
            info!(
                "WAFER-{:03}: {} defects, yield {:.1}% ({} ticks)",
                cycle.wafer_id, cycle.defect_count, cycle.yield_rate, cycle.ticks
            );
        }
        if report.passed {
            info!(
                "All {} cycles completed in {} virtual ms",
                report.cycles.len(),
                report.final_time_ms
            );
        } else {
            error!(
                "Run failed: {}",
                report.failure_reason.as_deref().unwrap_or("unknown")
            );
        }
    }

    if let Some(path) = &args.export {
        let export = RunExport::from_report(config, report.clone());
        if let Err(e) = export.write_to_file(path) {
            error!("Failed to write export: {}", e);
            std::process::exit(1);
        }
        if !args.json {
            info!("Exported {} frames to {}", export.frames.len(), path);
        }
    }

    // Exit with proper code for CI
    if !report.passed {
        std::process::exit(1);
    }
}

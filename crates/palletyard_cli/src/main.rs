//! Operator console for the pallet yard.
//!
//! # Responsibility
//! - Wire configuration, storage, layout and manifest into a `YardSession`.
//! - Read one command per stdin line and print the outcome.

use clap::Parser;
use log::{error, info};
use palletyard_core::db::open_db;
use palletyard_core::{
    init_logging, DetachedSqliteWriter, LogStatusSink, Manifest, PackingManifest,
    ScanRepository, SqliteScanRepository, TruckKey, TruckProgress, YardConfig, YardSession,
};
use std::error::Error;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "palletyard")]
#[command(about = "Assign scanned pallets to staging slots and reconcile deliveries")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the scan database path
    #[arg(long)]
    db: Option<PathBuf>,

    /// Layout file with whitespace separated slot ids
    #[arg(long)]
    layout: Option<PathBuf>,

    /// Packing manifest in TOML format
    #[arg(long)]
    manifest: Option<PathBuf>,

    /// Directory for rotating log files
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

fn main() {
    let args = Args::parse();
    let config = match build_config(args) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("failed to load configuration: {err}");
            process::exit(1);
        }
    };

    if let Some(log_dir) = &config.log_dir {
        let log_dir = absolute(log_dir);
        if let Err(err) = init_logging(config.effective_log_level(), &log_dir) {
            eprintln!("logging disabled: {err}");
        }
    }

    if let Err(err) = run(&config) {
        error!("event=cli_exit module=cli status=error error={}", err);
        eprintln!("error: {err}");
        process::exit(1);
    }
}

fn build_config(args: Args) -> Result<YardConfig, Box<dyn Error>> {
    let mut config = match &args.config {
        Some(path) => YardConfig::load(path)?,
        None => YardConfig::default(),
    };
    if let Some(db) = args.db {
        config.database_path = db;
    }
    if args.layout.is_some() {
        config.layout_path = args.layout;
    }
    if args.manifest.is_some() {
        config.manifest_path = args.manifest;
    }
    if args.log_dir.is_some() {
        config.log_dir = args.log_dir;
    }
    if args.log_level.is_some() {
        config.log_level = args.log_level;
    }
    config.validate()?;
    Ok(config)
}

fn run(config: &YardConfig) -> Result<(), Box<dyn Error>> {
    let conn = open_db(&config.database_path)?;
    let manifest = match &config.manifest_path {
        Some(path) => PackingManifest::load(path)?,
        None => PackingManifest::default(),
    };

    let mut session = YardSession::open(
        SqliteScanRepository::new(&conn),
        manifest,
        Box::new(DetachedSqliteWriter::spawn(&config.database_path)?),
        Arc::new(LogStatusSink),
    )?;
    if let Some(path) = &config.layout_path {
        let slots = session.reload_layout(read_layout(path)?);
        println!("layout: {slots} slots");
    }
    info!(
        "event=cli_start module=cli status=ok db={}",
        config.database_path.display()
    );

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    prompt(&mut stdout)?;
    for line in stdin.lock().lines() {
        let line = line?;
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            prompt(&mut stdout)?;
            continue;
        };
        let rest: Vec<&str> = words.collect();
        match (command, rest.as_slice()) {
            ("quit" | "exit", _) => break,
            ("truck", [key]) => {
                let progress = session.select_truck(TruckKey::new(key));
                print_progress(&progress);
            }
            ("scan", [first, last]) => match session.scan(first, last) {
                Ok(report) => {
                    let placement = report.outcome.placement();
                    let note = if report.outcome.is_new() {
                        ""
                    } else {
                        " (already scanned)"
                    };
                    println!("pallet {} -> {}{}", report.pallet, placement, note);
                    if report.truck_completed {
                        println!("truck {} complete", report.truck);
                    }
                }
                Err(err) => println!("scan rejected: {err}"),
            },
            ("deliver", [key]) => match session.deliver(&TruckKey::new(key)) {
                Ok(report) => println!(
                    "delivered {key}: {} pallets released, {} slots freed",
                    report.assignments_released, report.slots_freed
                ),
                Err(err) => println!("delivery failed: {err}"),
            },
            ("status", []) => match session.active_truck().cloned() {
                Some(truck) => print_progress(&session.progress(&truck)),
                None => println!("no active truck"),
            },
            ("status", [key]) => print_progress(&session.progress(&TruckKey::new(key))),
            ("slots", []) => {
                for slot in session.catalog().slots() {
                    let pallets: Vec<String> = session
                        .assignments()
                        .get(&slot)
                        .map(|occupants| {
                            occupants
                                .iter()
                                .map(|a| format!("{}:{}@{}", a.truck, a.pallet, a.position))
                                .collect()
                        })
                        .unwrap_or_default();
                    let shown = if pallets.is_empty() {
                        "(empty)".to_string()
                    } else {
                        pallets.join(" ")
                    };
                    println!("{slot} {shown}");
                }
            }
            ("pending", []) => {
                for truck in session.pending_trucks() {
                    print_progress(&session.progress(&truck));
                }
            }
            ("trucks", []) => {
                for truck in session.manifest().trucks() {
                    println!("{truck}");
                }
            }
            ("reset", []) => match session.reset() {
                Ok(removed) => println!("reset: {removed} rows removed"),
                Err(err) => println!("reset failed: {err}"),
            },
            _ => println!(
                "commands: truck <key> | scan <first> <last> | deliver <key> | status [key] | slots | pending | trucks | reset | quit"
            ),
        }
        prompt(&mut stdout)?;
    }

    let remaining = SqliteScanRepository::new(&conn).list_scans()?.len();
    info!(
        "event=cli_exit module=cli status=ok durable_rows={}",
        remaining
    );
    Ok(())
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

fn read_layout(path: &Path) -> io::Result<Vec<String>> {
    let content = std::fs::read_to_string(path)?;
    Ok(content.split_whitespace().map(str::to_string).collect())
}

fn print_progress(progress: &TruckProgress) {
    let lane = progress
        .lane
        .map_or_else(|| "-".to_string(), |lane| lane.to_string());
    println!(
        "truck {} {:?} {}/{} lane {}",
        progress.truck, progress.state, progress.scanned, progress.total, lane
    );
}

fn prompt(stdout: &mut io::Stdout) -> io::Result<()> {
    write!(stdout, "> ")?;
    stdout.flush()
}

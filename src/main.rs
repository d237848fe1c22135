//! mplsview CLI - Normalized network view from captured device transcripts

use clap::{Parser, Subcommand, ValueEnum};
use mplsview::config::{self, MplsviewConfig};
use mplsview::ingest::{discover, IngestStats};
use mplsview::report::{build_report, Report};
use mplsview::storage::SqliteStore;
use mplsview::ui::{self, Icons, ProgressManager, Spinner};
use mplsview::{Ingestor, PendingResolver};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "mplsview")]
#[command(version = "0.1.0")]
#[command(about = "Normalized VRF, interface and route view from network device transcripts")]
#[command(long_about = r#"
mplsview reads captured CLI sessions (show running-config, show vlan,
show cdp neighbors, show inventory) and builds a cross-referenced model:
  • VRFs with route-target import/export relationships across the fleet
  • Interfaces, VLANs, addressing and tunnels per VRF
  • Static route next-hop summaries
  • Hardware inventory and CDP neighbors

Transcript file names carry the site: "3 Branch North.log" is site
"Branch North" with importance 3.

Example usage:
  mplsview init --path ./captures
  mplsview ingest
  mplsview report --format json
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default mplsview.toml
    Init {
        /// Directory holding the transcripts
        #[arg(short, long)]
        path: Option<String>,

        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },

    /// Parse every transcript in a directory, then resolve pending references
    Ingest {
        /// Directory holding the transcripts
        #[arg(short, long)]
        path: Option<PathBuf>,

        /// Transcript file extension
        #[arg(short, long)]
        extension: Option<String>,

        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,

        /// Also write an SQL dump of the result
        #[arg(long)]
        dump: Option<PathBuf>,

        /// Reconciliation passes over pending interfaces
        #[arg(long)]
        passes: Option<usize>,

        /// Log every line the parsers skip (needs --verbose)
        #[arg(long)]
        log_ignored: bool,

        /// Keep existing data instead of rebuilding the store
        #[arg(long)]
        append: bool,
    },

    /// Print VRFs, relationships, interfaces and routes per appliance
    Report {
        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,

        /// Only this appliance
        #[arg(long)]
        hostname: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: Format,
    },

    /// Show statistics about the store
    Stats {
        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: Format,
    },

    /// List entities still waiting on a reference
    Pending {
        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: Format,
    },

    /// Write the store as an ordered SQL statement dump
    Dump {
        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config_path = cli.config.clone().unwrap_or_else(config::default_config_path);
    let settings = config::load_config(Some(&config_path))?.unwrap_or_default();

    match cli.command {
        Commands::Init { path, force } => {
            let config = MplsviewConfig {
                path,
                ..settings
            };
            config::write_config(&config_path, &config, force)?;
            ui::success(&format!("Wrote {}", config_path.display()));
        }

        Commands::Ingest {
            path,
            extension,
            database,
            dump,
            passes,
            log_ignored,
            append,
        } => {
            let Some(dir) = path.or_else(|| settings.path.as_ref().map(PathBuf::from)) else {
                anyhow::bail!("no transcript directory (pass --path or set `path` in {})", config_path.display());
            };
            let database = database.unwrap_or_else(|| PathBuf::from(&settings.database));
            let extension = extension.unwrap_or_else(|| settings.extension.clone());
            let dump = dump.or_else(|| settings.dump.as_ref().map(PathBuf::from));
            let passes = passes.unwrap_or(settings.resolution_passes);
            let mut options = settings.parse_options();
            options.log_ignored_lines |= log_ignored;

            run_ingest(&dir, &extension, &database, dump.as_deref(), passes, options, append)?;
        }

        Commands::Report {
            database,
            hostname,
            format,
        } => {
            let store = open_existing(database, &settings)?;
            let spinner = Spinner::new("Building report");
            let mut report = build_report(&store)?;
            spinner.finish_and_clear();
            if let Some(hostname) = hostname {
                report.appliances.retain(|a| a.hostname.eq_ignore_ascii_case(&hostname));
            }
            match format {
                Format::Json => println!("{}", serde_json::to_string_pretty(&report)?),
                Format::Text => print_report(&report),
            }
        }

        Commands::Stats { database, format } => {
            let db_path = database.unwrap_or_else(|| PathBuf::from(&settings.database));
            let store = open_existing(Some(db_path.clone()), &settings)?;
            let stats = store.stats()?;
            match format {
                Format::Json => println!("{}", serde_json::to_string_pretty(&stats)?),
                Format::Text => {
                    ui::header("Store statistics");
                    let size = std::fs::metadata(&db_path).map(|m| m.len()).unwrap_or(0);
                    ui::status(Icons::DATABASE, "Database", &format!("{} ({})", db_path.display(), ui::human_bytes(size)));
                    ui::status(Icons::STATS, "Pending", &format!(
                        "{} interfaces, {} static routes",
                        stats.pending_interfaces, stats.pending_routes
                    ));
                    let counts = [
                        ("Sites", stats.sites),
                        ("Appliances", stats.appliances),
                        ("Transcripts", stats.transcripts),
                        ("VRFs", stats.vrfs),
                        ("Interfaces", stats.interfaces),
                        ("VLANs", stats.vlans),
                        ("IP addresses", stats.addresses),
                        ("Static routes", stats.static_routes),
                        ("CDP neighbors", stats.neighbors),
                        ("Inventory items", stats.inventory),
                    ];
                    let rendered: Vec<(&str, String)> = counts.iter().map(|(k, v)| (*k, v.to_string())).collect();
                    let rows: Vec<(&str, &str)> = rendered.iter().map(|(k, v)| (*k, v.as_str())).collect();
                    println!("{}", ui::stats_table(&rows));
                }
            }
        }

        Commands::Pending { database, format } => {
            let store = open_existing(database, &settings)?;
            let orphans = store.orphaned()?;
            match format {
                Format::Json => println!("{}", serde_json::to_string_pretty(&orphans)?),
                Format::Text if orphans.is_empty() => ui::success("Nothing pending"),
                Format::Text => {
                    ui::warn(&format!("{} entities still pending", orphans.len()));
                    println!("{}", ui::orphans_table(&orphans));
                }
            }
        }

        Commands::Dump { database, output } => {
            let store = open_existing(database, &settings)?;
            match output {
                Some(path) => {
                    write_dump(&store, &path)?;
                    ui::success(&format!("Dump written to {}", path.display()));
                }
                None => {
                    let stdout = std::io::stdout();
                    let mut out = stdout.lock();
                    store.dump_sql(&mut out)?;
                    out.flush()?;
                }
            }
        }
    }

    Ok(())
}

fn open_existing(database: Option<PathBuf>, settings: &MplsviewConfig) -> anyhow::Result<SqliteStore> {
    let path = database.unwrap_or_else(|| PathBuf::from(&settings.database));
    if !path.exists() {
        anyhow::bail!("database {} not found (run `mplsview ingest` first)", path.display());
    }
    Ok(SqliteStore::open(&path)?)
}

fn write_dump(store: &SqliteStore, path: &Path) -> anyhow::Result<()> {
    config::ensure_db_dir(path)?;
    let mut out = BufWriter::new(File::create(path)?);
    store.dump_sql(&mut out)?;
    out.flush()?;
    Ok(())
}

fn run_ingest(
    dir: &Path,
    extension: &str,
    database: &Path,
    dump: Option<&Path>,
    passes: usize,
    options: mplsview::ParseOptions,
    append: bool,
) -> anyhow::Result<()> {
    let started = Instant::now();
    config::ensure_db_dir(database)?;
    let mut store = SqliteStore::open(database)?;
    if !append {
        store.clear_all()?;
    }

    let files = discover(dir, extension)?;
    ui::header(&format!("Ingesting {} transcripts", files.len()));
    ui::status(Icons::DATABASE, "Database", &database.display().to_string());
    if files.is_empty() {
        ui::warn(&format!("No *{} files under {}", extension, dir.display()));
        return Ok(());
    }

    let progress = ProgressManager::new(files.len());
    let mut stats = IngestStats::default();
    {
        let mut ingestor = Ingestor::new(&mut store, options);
        for path in &files {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| path.display().to_string());
            progress.set_transcript(&name);
            match ingestor.ingest_file(path) {
                Ok(outcome) => {
                    progress.println(&ui::transcript_line(&name, outcome.hostname.as_deref()));
                    stats.add(&outcome);
                }
                Err(mplsview::Error::Io(e)) => {
                    tracing::warn!(file = %path.display(), error = %e, "Skipping unreadable transcript");
                    stats.unreadable += 1;
                }
                Err(e) => return Err(e.into()),
            }
            progress.inc_transcripts();
        }
    }
    progress.finish_transcripts();

    progress.start_resolving();
    let resolution = PendingResolver::new(&store).with_passes(passes).run()?;
    progress.finish_resolving();
    progress.finish_with_summary(started.elapsed(), stats.files, stats.appliances, resolution.orphaned);

    ui::section("Ingest");
    print!("{}", stats);
    ui::section("Resolution");
    print!("{}", resolution);

    if let Some(path) = dump {
        write_dump(&store, path)?;
        ui::info("SQL dump", &path.display().to_string());
    }
    if resolution.orphaned > 0 {
        ui::warn(&format!(
            "{} interfaces left pending (see `mplsview pending`)",
            resolution.orphaned
        ));
    }
    Ok(())
}

fn print_report(report: &Report) {
    for appliance in &report.appliances {
        ui::section(&format!(" {} / {} ", appliance.site, appliance.hostname));
        for vrf in &appliance.vrfs {
            ui::phase(&format!("VRF {}", vrf.name));
            if let Some(rd) = &vrf.rd {
                ui::summary_row("RD:", rd);
            }
            if let Some(description) = &vrf.description {
                ui::summary_row("Description:", description);
            }
            if !vrf.exports.is_empty() {
                ui::summary_row("Export RT:", &vrf.exports.join(", "));
            }
            if !vrf.imports.is_empty() {
                ui::summary_row("Import RT:", &vrf.imports.join(", "));
            }
            if !vrf.exported_to.is_empty() {
                println!("  {} Exported to", Icons::LINK);
                println!("{}", ui::relationships_table(&vrf.exported_to));
            }
            if !vrf.imported_from.is_empty() {
                println!("  {} Imported from", Icons::LINK);
                println!("{}", ui::relationships_table(&vrf.imported_from));
            }
            if !vrf.interfaces.is_empty() {
                println!("  {} Interfaces", Icons::PLUG);
                println!("{}", ui::interfaces_table(&vrf.interfaces));
            }
            if !vrf.static_routes.is_empty() {
                println!("  {} Static routes", Icons::ROUTE);
                println!("{}", ui::routes_table(&vrf.static_routes));
            }
        }
        if !appliance.neighbors.is_empty() {
            ui::phase("CDP neighbors");
            println!("{}", ui::neighbors_table(&appliance.neighbors));
        }
        if !appliance.inventory.is_empty() {
            ui::phase("Inventory");
            println!("{}", ui::inventory_table(&appliance.inventory));
        }
    }

    if !report.orphaned.is_empty() {
        ui::section(" Pending ");
        println!("{}", ui::orphans_table(&report.orphaned));
    }
}

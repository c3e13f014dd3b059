use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};

use tropedeck::content::SignalSet;
use tropedeck::engine::MediaEngine;
use tropedeck::prefs::{self, Prefs};
use tropedeck::probe::FsProber;
use tropedeck::registry::DEFAULT_MAX_ALTERNATES;
use tropedeck::roots::{LinkProbe, LinkSignal};
use tropedeck::{cli, debug};

#[derive(Parser, Debug)]
#[command(name = "tropedeck", about = "Trope hand-signal flashcard media engine")]
struct Cli {
    /// Enable debug logging
    #[arg(short = 'd', long, global = true)]
    debug: bool,

    /// Signal catalog (JSON array)
    #[arg(long, global = true, default_value = "./assets/signals.json")]
    data: PathBuf,

    /// Asset-root override: `full`, `opt`, or a comma-separated root list
    #[arg(long, global = true)]
    assets: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Discover and print the variants for one id
    Resolve {
        id: String,
        /// Numbered alternates to probe for
        #[arg(long, default_value_t = DEFAULT_MAX_ALTERNATES)]
        max: usize,
    },
    /// Warm the registry for the whole catalog (base-only)
    Warm {
        /// Worker count; 1 means sequential
        #[arg(short = 'c', long, default_value_t = 1)]
        concurrency: usize,
        /// Pause between items in sequential mode (ms)
        #[arg(long, default_value_t = 0)]
        delay_ms: u64,
    },
    /// Drive the display state machine for one id
    Show {
        id: String,
        /// Extra advance renders after the first
        #[arg(short = 'n', long, default_value_t = 0)]
        advance: usize,
        /// Force orientation for every render
        #[arg(long)]
        mirror: Option<bool>,
    },
    /// Cross-check asset roots against the catalog
    Audit,
    /// Show roots, catalog and registry summary
    Status,
}

/// Link-quality signal sourced from the prefs file (`save_data`,
/// `effective_type`, `downlink_mbps` keys).
struct PrefsLink {
    signal: LinkSignal,
}

impl LinkProbe for PrefsLink {
    fn signal(&self) -> LinkSignal {
        self.signal.clone()
    }
}

fn main() {
    let args = Cli::parse();
    if args.debug {
        debug::enable();
    }

    let prefs = Prefs::load(&prefs::default_prefs_path());
    let override_spec = args
        .assets
        .clone()
        .or_else(|| std::env::var("TROPEDECK_ASSETS").ok())
        .or_else(|| prefs.get_str("asset_roots"));
    let link = PrefsLink {
        signal: LinkSignal {
            save_data: prefs.get_bool("save_data").unwrap_or(false),
            effective_type: prefs.get_str("effective_type"),
            downlink_mbps: prefs.get_f64("downlink_mbps"),
        },
    };

    let content = match SignalSet::load(&args.data) {
        Ok(c) => Arc::new(c),
        Err(e) => {
            eprintln!("tropedeck: {:#}", e);
            std::process::exit(1);
        }
    };

    let engine = MediaEngine::new(content, Arc::new(FsProber), override_spec, Box::new(link));

    match args.command {
        Commands::Resolve { id, max } => cli::resolve(&engine, &id, max),
        Commands::Warm {
            concurrency,
            delay_ms,
        } => cli::warm(&engine, concurrency, Duration::from_millis(delay_ms)),
        Commands::Show {
            id,
            advance,
            mirror,
        } => cli::show(&engine, &id, advance, mirror),
        Commands::Audit => cli::run_audit(&engine),
        Commands::Status => cli::status(&engine),
    }
}

//! CLI smoke entry point.
//!
//! # Responsibility
//! - Open (and if needed initialize) a concept store file.
//! - Print a deterministic summary for quick local sanity checks.
//! - Parse `--config <path>` and an optional store path with `clap`.

use std::path::PathBuf;
use std::process::ExitCode;

use canvasnote_core::model::settings::DEFAULT_HOME_CONCEPT_ID;
use canvasnote_core::{
    builtin_registry, init_logging, CachedStore, Concept, ConceptStore, Content, CoreConfig,
    Settings,
};
use clap::Parser;
use log::info;

/// Opens a canvasnote store and prints a summary.
#[derive(Debug, Parser)]
#[command(name = "canvasnote_cli", version)]
struct Args {
    /// JSON config file; defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Store file, overriding `db_path` from the config.
    db_path: Option<PathBuf>,
}

fn main() -> ExitCode {
    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("canvasnote_cli error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), String> {
    let mut config = match args.config {
        Some(path) => CoreConfig::load(path).map_err(|err| err.to_string())?,
        None => CoreConfig::default(),
    };
    if let Some(path) = args.db_path {
        config.db_path = path;
    }
    if let Some(log_dir) = &config.log_dir {
        init_logging(&config.log_level, log_dir)?;
    }

    println!("canvasnote_core ping={}", canvasnote_core::ping());
    println!("canvasnote_core version={}", canvasnote_core::core_version());

    let mut store = CachedStore::open_sqlite(&config.db_path, config.store_options())
        .map_err(|err| err.to_string())?;
    if !store.is_valid() {
        let home = Concept::with_id(DEFAULT_HOME_CONCEPT_ID, Content::text("Home"));
        store
            .init(&Settings::new(home.id), &[home])
            .map_err(|err| err.to_string())?;
        info!("event=cli_init module=cli status=ok db_path={}", config.db_path.display());
        println!("initialized={}", config.db_path.display());
    }

    let settings = store.get_settings();
    let concepts = store.get_all_concepts();
    let registry = builtin_registry();
    let searchable = concepts
        .iter()
        .filter(|concept| registry.concept_string(concept).is_some())
        .count();

    println!("data_version={}", store.get_version().unwrap_or(0));
    println!("home_concept={}", settings.home_concept_id);
    println!("concepts={} searchable={}", concepts.len(), searchable);
    if let Some(updated) = store.get_last_updated_time() {
        println!("last_updated_ms={updated}");
    }

    store.run_until_idle().map_err(|err| err.to_string())?;
    Ok(())
}

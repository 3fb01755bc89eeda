mod config;
mod error_log;
mod pipeline;

pub use config::ScanConfig;
pub use error_log::ErrorLog;
pub use pipeline::Pipeline;

use anyhow::Result;
use clap::Parser;
use hoh_state::{read_entry_ids, write_table};
use hoh_vision::{DigitReader, ReferenceLibrary};
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

/// Read troop losses from hall-of-honor screenshots into a table.
#[derive(Parser, Debug)]
#[command(name = "hoh-scan", version, about, long_about = None)]
pub struct Cli {
    /// Scan directory under the data root (reads `<dir>/hoh/ids.tsv`)
    pub dir: String,

    /// Worker threads; 0 or less uses every core
    #[arg(short, long, default_value = "-1", allow_hyphen_values = true)]
    pub jobs: i32,

    /// Root holding the scan directories
    #[arg(long)]
    pub data_root: Option<PathBuf>,

    /// Directory with one sub-directory of reference icons per troop label
    #[arg(long)]
    pub templates: Option<PathBuf>,

    /// JSON file overriding thresholds and paths
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Pool size for rayon, where 0 means one thread per core.
    pub fn worker_threads(&self) -> usize {
        if self.jobs <= 0 {
            0
        } else {
            self.jobs as usize
        }
    }
}

pub fn run() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "hoh_scan=info,hoh_vision=info,hoh_data=info,hoh_capture=info".into()
            }),
        )
        .init();

    let cli = Cli::parse();
    let start = Instant::now();

    let mut config = ScanConfig::load(cli.config.as_deref())?;
    if let Some(root) = &cli.data_root {
        config.data_root = root.clone();
    }
    if let Some(templates) = &cli.templates {
        config.templates_dir = templates.clone();
    }

    let data_dir = config.data_root.join(&cli.dir);
    let entries = read_entry_ids(&data_dir.join("hoh").join("ids.tsv"))?;

    let library = ReferenceLibrary::load(
        &config.templates_dir,
        config.template_border,
        &config.vision,
    )?;
    let reader = DigitReader::new(&config.value_crop.whitelist);
    let error_log = ErrorLog::open(&data_dir.join("logs").join("hoh"))?;
    info!("Error log at {}", error_log.dir().display());

    let pipeline = Pipeline::new(library, reader, config, data_dir.join("hoh"), error_log);
    let results = pipeline.run_batch(&entries, cli.worker_threads())?;

    let table = data_dir.join("hoh.tsv");
    write_table(&table, &results)?;
    info!("Wrote {} rows to {}", results.len(), table.display());

    println!("\nElapsed: {:.2}s", start.elapsed().as_secs_f64());
    Ok(())
}

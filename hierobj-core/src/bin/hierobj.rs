use std::{
    fs::File,
    io::{BufWriter, Write},
    path::PathBuf,
};

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use hierobj_core::{
    HierarchyConfig, HierarchyPair, Registry, TieBreak, get_hierarchy,
    io::{read_rows, write_records},
};

#[derive(Parser)]
#[command(name = "hierobj")]
#[command(about = "Organize bounding-box annotations into a containment hierarchy")]
struct Args {
    #[arg(help = "Annotation rows: .csv (Open Images header), .jsonl or a JSON array")]
    input: PathBuf,

    #[arg(
        short,
        long = "pair",
        help = "Child and parent class as `child:parent`, resolved in the given order"
    )]
    pairs: Vec<HierarchyPair>,

    #[arg(short, long, help = "Output file, stdout when omitted")]
    output: Option<PathBuf>,

    #[arg(short, long, help = "JSON file with a hierarchy config")]
    config: Option<PathBuf>,

    #[arg(long, value_enum, help = "Rule for picking among several parents")]
    tie_break: Option<TieBreak>,

    #[arg(long, help = "IoU above which same-class boxes are duplicates")]
    iou_threshold: Option<f64>,

    #[arg(long, help = "Ignore duplicate annotations when assigning parents")]
    skip_duplicates: bool,

    #[arg(long, help = "Leave per-class overlap lists out of the output")]
    no_overlap: bool,
}

impl Args {
    fn hierarchy_config(&self) -> anyhow::Result<HierarchyConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let file = File::open(path)
                    .with_context(|| format!("open config {}", path.display()))?;
                serde_json::from_reader(file)
                    .with_context(|| format!("parse config {}", path.display()))?
            }
            None => HierarchyConfig::default(),
        };

        if let Some(tie_break) = self.tie_break {
            config.tie_break = tie_break;
        }
        if let Some(threshold) = self.iou_threshold {
            config.duplicate_iou_threshold = threshold;
        }
        config.skip_duplicates |= self.skip_duplicates;
        config.overlap_info &= !self.no_overlap;

        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = args.hierarchy_config()?;
    info!("Input: {}", args.input.display());
    info!("Config: {:?}", config);

    let rows = read_rows(&args.input)?;
    let mut registry = Registry::new();
    registry.extend(rows)?;

    if args.pairs.is_empty() {
        warn!("No hierarchy pairs given, only overlaps and duplicates are computed");
    }
    get_hierarchy(&mut registry, &args.pairs, &config)?;

    let duplicates = registry
        .iter()
        .filter(|record| record.duplicate() == Some(true))
        .count();
    let with_parent = registry
        .iter()
        .filter(|record| record.parents().is_some_and(|parents| !parents.is_empty()))
        .count();
    info!(
        "{} records in {} images, {} duplicates, {} with a parent",
        registry.len(),
        registry.images().count(),
        duplicates,
        with_parent
    );

    match &args.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("create output {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            write_records(&registry, &mut writer, config.overlap_info)?;
            writer.flush()?;
            info!("Output saved to: {}", path.display());
        }
        None => {
            let stdout = std::io::stdout();
            let mut writer = stdout.lock();
            write_records(&registry, &mut writer, config.overlap_info)?;
            writeln!(writer)?;
        }
    }

    Ok(())
}

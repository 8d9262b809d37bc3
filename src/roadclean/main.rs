mod io;

use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info, warn};
use roadclean::{Cleaner, CleanerConfig, PassControl, PlanarGeometry};
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

#[derive(Parser, Debug)]
#[command(author, version, about = "Cleans the topology of a road centreline network", long_about = None)]
struct Args {
    /// Input GeoJSON FeatureCollection of line features.
    input: PathBuf,

    /// Where to write the cleaned GeoJSON.
    output: PathBuf,

    /// Where to write the JSON report. Defaults to `<output>.report.json`.
    #[arg(long)]
    report: Option<PathBuf>,

    /// RON file with a CleanerConfig. Flags below override its fields.
    #[arg(long, env = "ROADCLEAN_CONFIG")]
    config: Option<PathBuf>,

    /// Property holding the integer feature id.
    /// Without it the GeoJSON feature id is used, then the feature's position.
    #[arg(long, env = "ROADCLEAN_ID_FIELD")]
    id_field: Option<String>,

    /// Property used to label edges in the report.
    #[arg(long, env = "ROADCLEAN_LABEL_FIELD")]
    label_field: Option<String>,

    /// Property stamped with the previous id of every edge when breaking.
    #[arg(long, env = "ROADCLEAN_ALIAS_FIELD")]
    alias_field: Option<String>,

    /// Decimal places coordinates are rounded to.
    #[arg(long, env = "ROADCLEAN_TOLERANCE")]
    tolerance: Option<u32>,

    /// One edge per segment instead of one per polyline.
    #[arg(long)]
    no_simplify: bool,

    #[arg(long)]
    skip_break: bool,

    #[arg(long)]
    skip_dedupe: bool,

    #[arg(long)]
    skip_merge: bool,

    /// Report edges with no neighbours at all.
    #[arg(long, env = "ROADCLEAN_REPORT_ORPHANS")]
    report_orphans: bool,

    /// Merged edges keep the first member's attributes instead of lists of all of them.
    #[arg(long)]
    first_attributes: bool,
}

impl Args {
    fn cleaner_config(&self) -> Result<CleanerConfig> {
        let mut config = match &self.config {
            Some(path) => CleanerConfig::from_ron_file(path)?,
            None => CleanerConfig::default(),
        };

        if let Some(field) = &self.label_field {
            config.label_field = Some(field.clone());
        }
        if let Some(field) = &self.alias_field {
            config.alias_field = field.clone();
        }
        if self.tolerance.is_some() {
            config.tolerance = self.tolerance;
        }
        if self.no_simplify {
            config.simplify = false;
        }
        if self.skip_break {
            config.break_at_intersections = false;
        }
        if self.skip_dedupe {
            config.remove_duplicates = false;
        }
        if self.skip_merge {
            config.merge_chains = false;
        }
        if self.report_orphans {
            config.report_orphans = true;
        }
        if self.first_attributes {
            config.merge_attributes = false;
        }

        Ok(config)
    }
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let args = Args::parse();
    let config = args.cleaner_config()?;
    debug!("Config: {:?}", config);

    let features = io::read_features(&args.input, args.id_field.as_deref())?;
    info!("Read {} features from {}", features.len(), args.input.display());

    let mut last_logged = 0u32;
    let mut control = PassControl::default().with_progress(|fraction| {
        let percent = (fraction * 100.0) as u32;
        if percent >= last_logged + 10 {
            last_logged = percent;
            debug!("Progress: {}%", percent);
        }
    });

    let output = Cleaner::new(config, &PlanarGeometry).run(features, &mut control)?;

    for issue in &output.report.issues {
        warn!("{}", issue);
    }

    std::fs::write(&args.output, io::edges_to_geojson(&output.edges)?.to_string())
        .with_context(|| format!("writing {}", args.output.display()))?;

    let report_path = args.report.clone().unwrap_or_else(|| {
        let mut name = args.output.clone().into_os_string();
        name.push(".report.json");
        PathBuf::from(name)
    });
    let writer = BufWriter::new(
        File::create(&report_path)
            .with_context(|| format!("creating {}", report_path.display()))?,
    );
    serde_json::to_writer_pretty(writer, &output.report)?;

    info!(
        "Wrote {} edges to {} ({} breakages, {} duplicates, {} overlaps, {} chains merged)",
        output.edges.len(),
        args.output.display(),
        output.report.breakages.len(),
        output.report.duplicates.len(),
        output.report.overlaps.len(),
        output.report.merged_chains.len()
    );

    Ok(())
}

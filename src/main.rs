use anyhow::{anyhow, Result};
use clap::Parser;

use street_centrality::centrality::{compute_centrality, CancelFlag, Weighting};
use street_centrality::config::Config;
use street_centrality::graph::spatial::clip_to_radius;
use street_centrality::graph::CostModel;
use street_centrality::layers::{compute_accessibility, DataLayer};
use street_centrality::{data, storage};

#[derive(Parser, Debug)]
#[clap(
    name = "street-centrality",
    about = "Localised centrality analysis of street networks"
)]
struct Cli {
    /// Graph file: `.json`, `.bin` snapshot, or a Parquet dataset stem
    #[clap(long)]
    input: String,

    /// Output directory for results
    #[clap(long, default_value = "centrality_results")]
    output_dir: String,

    /// Comma separated radii in metres
    #[clap(long, default_value = "400,800,1600", value_delimiter = ',')]
    distances: Vec<f64>,

    /// Rank shortest paths by angular cost and add angular harmonic closeness
    #[clap(long)]
    angular: bool,

    /// Weight targets by node weight (half the incident street length when
    /// the file carries no weights)
    #[clap(long)]
    weighted: bool,

    /// How far a coordinate may lie from the node it resolves to
    #[clap(long, default_value = "1.0")]
    snap_tolerance: f64,

    /// Skip betweenness
    #[clap(long)]
    no_betweenness: bool,

    /// Only analyse the network within `x,y,radius`
    #[clap(long, value_delimiter = ',', allow_hyphen_values = true)]
    clip: Option<Vec<f64>>,

    /// Data-layer points (JSON) to measure accessibility to
    #[clap(long)]
    points: Option<String>,

    /// How far a data point may lie from the node it is assigned to
    #[clap(long, default_value = "400.0")]
    points_max_dist: f64,

    /// Comma separated data classes to report (default: all)
    #[clap(long, value_delimiter = ',')]
    classes: Vec<String>,

    /// Also write the built graph as a binary snapshot
    #[clap(long)]
    snapshot: Option<String>,

    /// Origins per betweenness work unit
    #[clap(long, default_value = "64")]
    chunk_size: usize,

    /// Number of worker threads (0 = use all available cores)
    #[clap(long, default_value = "0")]
    threads: usize,

    /// Verbose logging
    #[clap(long, short)]
    verbose: bool,
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Cli::parse();

    // Configure logging
    let log_level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp_millis()
        .init();

    // Set number of threads
    let num_threads = if args.threads > 0 {
        args.threads
    } else {
        // If threads = 0, use all available cores
        num_cpus::get()
    };

    log::info!("Using {} worker threads", num_threads);
    rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build_global()?;

    log::info!("Starting street network centrality analysis");
    log::info!("Input: {}", args.input);
    log::info!("Output: {}", args.output_dir);

    let config = Config {
        betweenness: !args.no_betweenness,
        chunk_size: args.chunk_size.max(1),
        ..Config::new(
            args.distances.clone(),
            if args.angular { CostModel::Angular } else { CostModel::Metric },
            if args.weighted { Weighting::NodeWeighted } else { Weighting::Unweighted },
            args.snap_tolerance,
        )
    };
    // fail on bad radii before loading anything
    config.thresholds()?;

    // 1. Load data
    let mut store = data::load_graph(&args.input, args.weighted)?;

    if let Some(clip) = &args.clip {
        let &[x, y, radius] = clip.as_slice() else {
            return Err(anyhow!("--clip expects x,y,radius"));
        };
        store = clip_to_radius(&store, x, y, radius)?;
        log::info!(
            "Clipped to {} nodes and {} edges within {} of ({}, {})",
            store.node_count(),
            store.edge_count(),
            radius,
            x,
            y
        );
    }

    log::debug!("Graph store uses {} bytes", store.memory_usage());

    if let Some(path) = &args.snapshot {
        storage::save_snapshot(&store, path)?;
    }

    // 2. Compute centrality
    let cancel = CancelFlag::default();
    let report = compute_centrality(&store, &config, &cancel)?;

    // 3. Save results
    storage::save_results(&report, &store, &args.output_dir)?;

    if let Some(path) = &args.points {
        let points = data::json::load_points_json(path)?;
        let layer = DataLayer::new(&store, points, args.points_max_dist)?;
        let access = compute_accessibility(&store, &layer, &config, &args.classes, &cancel)?;
        storage::save_accessibility(&access, &args.output_dir)?;
    }

    log::info!("Analysis complete. Results saved to {}", args.output_dir);

    Ok(())
}

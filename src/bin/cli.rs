//! walk-planner CLI - recommend walks and inspect persisted state
//!
//! Usage:
//!   walk-planner recommend --lat <lat> --lng <lng> --minutes <n> [--db <path>]
//!   walk-planner territory <regions.geojson> --db <path>
//!   walk-planner pace --db <path>
//!
//! Routing and POI endpoints come from `WALK_PLANNER_ROUTING_BASE` and
//! `WALK_PLANNER_POI_ENDPOINT` when set, else from an optional `--config`
//! JSON file, else the public defaults.

use clap::{Parser, Subcommand};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use walk_planner::{
    format::{format_distance, format_minutes},
    IntensityTier, KeyValueStore, MatchConfig, MemoryStore, OsrmClient, OverpassClient,
    PaceModel, PlaceMatcher, RecommendConfig, Recommender, RegionSet, SqliteStore, VisitBook,
    WalkError,
};

#[derive(Parser)]
#[command(name = "walk-planner")]
#[command(about = "Round-trip walk recommendations and visit territory", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Recommendation config (JSON, partial documents allowed)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Recommend round-trip walks from a start point
    Recommend {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        #[arg(long, allow_hyphen_values = true)]
        lng: f64,

        /// Desired walk time in minutes
        #[arg(short, long, default_value = "20")]
        minutes: u32,

        /// SQLite database holding the learned pace (in-memory if omitted)
        #[arg(long)]
        db: Option<PathBuf>,
    },

    /// Aggregate logged visits into region intensity
    Territory {
        /// GeoJSON FeatureCollection of region polygons
        regions: PathBuf,

        /// SQLite database holding the visit collection
        #[arg(long)]
        db: PathBuf,
    },

    /// Show the learned walking pace
    Pace {
        /// SQLite database holding the learned pace
        #[arg(long)]
        db: PathBuf,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| writeln!(buf, "[{:5}] {}", record.level(), record.args()))
        .init();

    let cli = Cli::parse();

    let outcome = match cli.command {
        Commands::Recommend {
            lat,
            lng,
            minutes,
            db,
        } => run_recommend(cli.config.as_deref(), lat, lng, minutes, db.as_deref()).await,
        Commands::Territory { regions, db } => run_territory(&regions, &db),
        Commands::Pace { db } => run_pace(&db),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.notice() {
                Some(notice) => eprintln!("{}", notice),
                None => eprintln!("Error: {}", e),
            }
            ExitCode::FAILURE
        }
    }
}

fn open_store(db: Option<&Path>) -> Result<Arc<dyn KeyValueStore>, WalkError> {
    match db {
        Some(path) => Ok(Arc::new(SqliteStore::new(&path.to_string_lossy())?)),
        None => Ok(Arc::new(MemoryStore::new())),
    }
}

fn load_config(path: Option<&Path>) -> Result<RecommendConfig, WalkError> {
    let config = match path {
        Some(path) => {
            let json = fs::read_to_string(path).map_err(|e| WalkError::Config {
                message: format!("{}: {}", path.display(), e),
            })?;
            RecommendConfig::from_json_str(&json)?
        }
        None => RecommendConfig::default(),
    };
    Ok(config.with_env_overrides())
}

async fn run_recommend(
    config: Option<&Path>,
    lat: f64,
    lng: f64,
    minutes: u32,
    db: Option<&Path>,
) -> Result<(), WalkError> {
    let config = load_config(config)?;
    let pace = PaceModel::load(open_store(db)?);
    let pois = Arc::new(OverpassClient::from_config(&config)?);
    let router = Arc::new(OsrmClient::from_config(&config)?);
    let recommender = Recommender::new(config, pace, pois, router);

    println!("\n{}", "=".repeat(60));
    println!(
        "Recommending {} min walks from ({:.5}, {:.5}) at {:.1} m/min",
        minutes,
        lat,
        lng,
        recommender.meters_per_minute().await
    );
    println!("{}", "=".repeat(60));

    let mut rng = rand::rng();
    let result = recommender
        .recommend(walk_planner::GeoPoint::new(lat, lng), minutes, &mut rng)
        .await?;

    for route in &result.routes {
        println!(
            "  {}  {:<28} {:>8} {:>10}  (score {:.1}, {} points)",
            route.id,
            route.title,
            format_minutes(route.duration_sec),
            format_distance(route.distance_m),
            route.score,
            route.polyline.len()
        );
    }
    if let Some(best) = result.best() {
        println!("\nBest: {} ({})", best.title, format_distance(best.distance_m));
    }
    Ok(())
}

fn run_territory(regions: &Path, db: &Path) -> Result<(), WalkError> {
    let json = fs::read_to_string(regions).map_err(|e| WalkError::InvalidRegion {
        message: format!("{}: {}", regions.display(), e),
    })?;
    let set = RegionSet::from_geojson_str(&json)?;
    let book = VisitBook::load(open_store(Some(db))?, PlaceMatcher::new(MatchConfig::default()));

    println!("\n{}", "=".repeat(60));
    println!(
        "{} regions ({} skipped), {} visited places",
        set.len(),
        set.skipped,
        book.len()
    );
    println!("{}", "=".repeat(60));

    let mut counts: Vec<(String, u32)> = set.aggregate(book.visits()).into_iter().collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    if counts.is_empty() {
        println!("  No visits inside any region");
    }
    for (id, count) in counts {
        let tier = IntensityTier::for_count(count);
        println!("  {:<16} {:>5}  {:?} {}", id, count, tier, tier.color());
    }
    Ok(())
}

fn run_pace(db: &Path) -> Result<(), WalkError> {
    let pace = PaceModel::load(open_store(Some(db))?);
    let mpm = pace.meters_per_minute();
    println!("Pace: {:.1} m/min ({:.1} min/km)", mpm, 1000.0 / mpm);
    for minutes in [10u32, 20, 30, 45] {
        println!(
            "  {:>2} min -> {}",
            minutes,
            format_distance(pace.target_distance(minutes as f64))
        );
    }
    Ok(())
}

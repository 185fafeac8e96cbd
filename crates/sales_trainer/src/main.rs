//! Video-game sales trainer CLI
//!
//! Trains the regressor on a sales CSV, reports held-out RMSE and feature
//! importance, and optionally assesses one hypothetical title.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use vgsales_core::serde_canon::to_canonical_json;
use vgsales_core::{GameFeatures, LoggingConfig, PipelineConfig};
use vgsales_trainer::{Dataset, DatasetFilter, SalesPipeline};

#[derive(Parser, Debug)]
#[command(name = "vgsales-train")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Deterministic global-sales regressor for video games", long_about = None)]
struct Args {
    /// Input CSV dataset (vgsales layout, header row required)
    #[arg(short, long)]
    input: PathBuf,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of boosting trees
    #[arg(long)]
    trees: Option<usize>,

    /// Learning rate (fixed-point, e.g., 50000 = 0.05)
    #[arg(long)]
    learning_rate: Option<i64>,

    /// Maximum tree depth
    #[arg(long)]
    max_depth: Option<usize>,

    /// Held-out fraction (fixed-point, e.g., 250000 = 0.25)
    #[arg(long)]
    test_fraction: Option<i64>,

    /// Target-encoding smoothing strength
    #[arg(long)]
    smoothing: Option<i64>,

    /// Seed for the split shuffle and tree subsampling
    #[arg(long)]
    seed: Option<i64>,

    /// Earliest release year to train on
    #[arg(long)]
    year_min: Option<i32>,

    /// Latest release year to train on
    #[arg(long)]
    year_max: Option<i32>,

    /// Restrict training to these platforms (repeatable)
    #[arg(long = "platform-filter")]
    platform_filter: Vec<String>,

    /// Restrict training to these genres (repeatable)
    #[arg(long = "genre-filter")]
    genre_filter: Vec<String>,

    /// Platform of the title to assess
    #[arg(long)]
    platform: Option<String>,

    /// Publisher of the title to assess
    #[arg(long)]
    publisher: Option<String>,

    /// Developer of the title to assess
    #[arg(long)]
    developer: Option<String>,

    /// Genre of the title to assess
    #[arg(long)]
    genre: Option<String>,

    /// ESRB rating of the title to assess
    #[arg(long)]
    rating: Option<String>,

    #[arg(long, default_value_t = 70.0)]
    critic_score: f64,

    #[arg(long, default_value_t = 50.0)]
    critic_count: f64,

    #[arg(long, default_value_t = 8.0)]
    user_score: f64,

    #[arg(long, default_value_t = 500.0)]
    user_count: f64,

    #[arg(long, default_value_t = 2020)]
    year: i32,

    /// Write the training report as canonical JSON
    #[arg(long)]
    report: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn apply_overrides(&self, config: &mut PipelineConfig) {
        if let Some(trees) = self.trees {
            config.gbdt.num_trees = trees;
        }
        if let Some(lr) = self.learning_rate {
            config.gbdt.learning_rate = lr;
        }
        if let Some(depth) = self.max_depth {
            config.gbdt.max_depth = depth;
        }
        if let Some(fraction) = self.test_fraction {
            config.split.test_fraction = fraction;
        }
        if let Some(smoothing) = self.smoothing {
            config.encoder.smoothing = smoothing;
        }
        if let Some(seed) = self.seed {
            config.split.seed = seed;
        }
    }

    fn filter(&self) -> DatasetFilter {
        DatasetFilter {
            year_min: self.year_min,
            year_max: self.year_max,
            platforms: self.platform_filter.clone(),
            genres: self.genre_filter.clone(),
        }
    }

    /// The title to assess, once every categorical attribute is given
    fn candidate(&self) -> Option<GameFeatures> {
        Some(GameFeatures {
            platform: Some(category(self.platform.as_deref())?),
            publisher: Some(category(self.publisher.as_deref())?),
            developer: Some(category(self.developer.as_deref())?),
            genre: Some(category(self.genre.as_deref())?),
            rating: Some(category(self.rating.as_deref())?),
            critic_score: Some(self.critic_score),
            critic_count: Some(self.critic_count),
            user_score: Some(self.user_score),
            user_count: Some(self.user_count),
            year_of_release: Some(self.year),
        })
    }
}

/// Trimmed like CSV fields; blank counts as missing
fn category(value: Option<&str>) -> Option<String> {
    let trimmed = value?.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn init_logging(config: &LoggingConfig, verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level))
    };

    let installed = if config.format == "compact" {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().compact().with_target(false))
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().pretty())
            .try_init()
    };
    installed.context("Failed to set tracing subscriber")
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => PipelineConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    config
        .apply_env_overrides()
        .context("Invalid VGSALES_* environment override")?;
    args.apply_overrides(&mut config);

    init_logging(&config.logging, args.verbose)?;
    info!("Video-game sales trainer v{}", env!("CARGO_PKG_VERSION"));

    let dataset = Dataset::from_csv(&args.input)
        .with_context(|| format!("Failed to load dataset {}", args.input.display()))?;
    let filter = args.filter();
    let dataset = dataset.filtered(&filter);
    if let Some((first, last)) = dataset.year_span() {
        info!(rows = dataset.len(), first, last, "training window");
    }

    info!("Training configuration:");
    info!("  Trees: {}", config.gbdt.num_trees);
    info!("  Max depth: {}", config.gbdt.max_depth);
    info!("  Learning rate: {} (fixed-point)", config.gbdt.learning_rate);
    info!("  Test fraction: {} (fixed-point)", config.split.test_fraction);
    info!("  Seed: {}", config.split.seed);

    let fitted = SalesPipeline::new(config)
        .fit(&dataset)
        .context("Training failed")?;
    let report = &fitted.report;

    info!("Held-out RMSE: {:.4} million units", report.rmse);
    info!("Feature importance:");
    for importance in &report.feature_importances {
        info!("  {:<16} {:.4}", importance.feature, importance.importance);
    }
    info!("Model hash: {}", report.model_hash);

    if let Some(path) = &args.report {
        let json = to_canonical_json(report).context("Failed to serialize report")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write report {}", path.display()))?;
        info!("Report written to {}", path.display());
    }

    match args.candidate() {
        Some(candidate) => {
            let prediction = fitted
                .assess(&candidate)
                .context("Failed to assess candidate title")?;
            println!(
                "Predicted global sales: {:.2} million units ({})",
                prediction.sales, prediction.verdict
            );
        }
        None if args.platform.is_some()
            || args.publisher.is_some()
            || args.developer.is_some()
            || args.genre.is_some()
            || args.rating.is_some() =>
        {
            warn!("Assessment skipped: --platform, --publisher, --developer, --genre and --rating are all required");
        }
        None => {}
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> Args {
        let mut argv = vec!["vgsales-train", "--input", "sales.csv"];
        argv.extend_from_slice(extra);
        Args::parse_from(argv)
    }

    #[test]
    fn test_candidate_values_are_trimmed() {
        let args = parse(&[
            "--platform", " PS4",
            "--publisher", " Nintendo ",
            "--developer", "Nintendo EAD\t",
            "--genre", "Action ",
            "--rating", " E",
        ]);
        let candidate = args.candidate().unwrap();
        assert_eq!(candidate.platform.as_deref(), Some("PS4"));
        assert_eq!(candidate.publisher.as_deref(), Some("Nintendo"));
        assert_eq!(candidate.developer.as_deref(), Some("Nintendo EAD"));
        assert_eq!(candidate.genre.as_deref(), Some("Action"));
        assert_eq!(candidate.rating.as_deref(), Some("E"));
        assert_eq!(candidate.critic_score, Some(70.0));
    }

    #[test]
    fn test_blank_or_missing_category_skips_candidate() {
        let blank = parse(&[
            "--platform", "PS4",
            "--publisher", "   ",
            "--developer", "Retro",
            "--genre", "Action",
            "--rating", "E",
        ]);
        assert!(blank.candidate().is_none());

        let missing = parse(&["--platform", "PS4"]);
        assert!(missing.candidate().is_none());
    }
}

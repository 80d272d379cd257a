use std::path::{Path, PathBuf};
use std::sync::Arc;

use imago::cli::{Cli, Commands, ConfigAction, IndexAction};
use imago::config::Config;
use imago::detect::{is_supported_image, DetectError, PrecomputedDetector};
use imago::embedding::{EmbeddingIndex, FastEmbedEncoder, TextEncoder};
use imago::error::{ImagoError, Result};
use imago::index::{fix_paths, KeywordIndex, LabelVocabulary};
use imago::linguistic::HeuristicExtractor;
use imago::resolve::{EncoderSimilarity, LabelResolver};
use imago::retrieval::QueryPlanner;

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse_args();

    // Initialize logging
    init_logging(cli.verbose);

    // Handle commands
    match cli.command {
        Commands::Query {
            prompt,
            limit,
            json,
        } => {
            cmd_query(cli.config, &prompt, limit, json)?;
        }
        Commands::Reverse {
            image,
            limit,
            threshold,
            json,
        } => {
            cmd_reverse(cli.config, &image, limit, threshold, json)?;
        }
        Commands::Resolve { token, limit } => {
            cmd_resolve(cli.config, &token, limit)?;
        }
        Commands::Index { action } => {
            cmd_index(cli.config, action)?;
        }
        Commands::Config { action } => {
            cmd_config(cli.config, action)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_filter = if verbose { "imago=debug" } else { "imago=info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    fmt().with_env_filter(filter).with_target(false).init();
}

/// Assemble the full query stack from configuration.
fn build_planner(config: &Config) -> Result<QueryPlanner> {
    let vocabulary = Arc::new(LabelVocabulary::load(&config.index.vocabulary)?);
    tracing::info!(
        "Loaded vocabulary ({} labels) from {}",
        vocabulary.len(),
        config.index.vocabulary.display()
    );

    let encoder: Arc<dyn TextEncoder> = Arc::new(FastEmbedEncoder::new(&config.embedding.model)?);

    let similarity = Arc::new(EncoderSimilarity::new(encoder.clone(), &vocabulary)?);
    let resolver = LabelResolver::new(
        vocabulary.clone(),
        similarity,
        config.resolver.expansion_limit,
    );

    let keyword_index = KeywordIndex::load(&config.index.keyword_index)?;
    keyword_index.validate_against(&vocabulary);

    let embedding_index =
        EmbeddingIndex::load(&config.index.embedding_index, config.embedding.dimension)?;

    let detector = Arc::new(PrecomputedDetector::load(&config.detector.detections_file)?);

    Ok(QueryPlanner::new(
        encoder,
        Arc::new(HeuristicExtractor::new()),
        detector,
        resolver,
        keyword_index,
        embedding_index,
    )?)
}

fn print_results(results: &[PathBuf], json: bool) -> Result<()> {
    if json {
        let paths: Vec<String> = results
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();
        let serialized =
            serde_json::to_string_pretty(&paths).map_err(|e| ImagoError::Json {
                source: e,
                context: "Failed to serialize results".to_string(),
            })?;
        println!("{serialized}");
        return Ok(());
    }

    if results.is_empty() {
        println!("No matching images found.");
    } else {
        for path in results {
            println!("{}", path.display());
        }
    }

    Ok(())
}

fn cmd_query(
    config_path: Option<PathBuf>,
    prompt: &str,
    limit: Option<usize>,
    json: bool,
) -> Result<()> {
    let config = Config::load_or_default(config_path.as_deref())?;
    let planner = build_planner(&config)?;

    let top_k = limit.unwrap_or(config.retrieval.top_k);
    let results = planner.query_by_text(prompt, top_k)?;

    print_results(&results, json)
}

fn cmd_reverse(
    config_path: Option<PathBuf>,
    image: &Path,
    limit: Option<usize>,
    threshold: Option<f32>,
    json: bool,
) -> Result<()> {
    if !is_supported_image(image) {
        return Err(DetectError::UnsupportedImage(image.to_path_buf()).into());
    }

    let config = Config::load_or_default(config_path.as_deref())?;
    let planner = build_planner(&config)?;

    let top_k = limit.unwrap_or(config.retrieval.top_k);
    let threshold = threshold.unwrap_or(config.detector.confidence_threshold);
    let results = planner.query_by_image_objects(image, threshold, top_k)?;

    print_results(&results, json)
}

fn cmd_resolve(config_path: Option<PathBuf>, token: &str, limit: Option<usize>) -> Result<()> {
    let config = Config::load_or_default(config_path.as_deref())?;

    let vocabulary = Arc::new(LabelVocabulary::load(&config.index.vocabulary)?);
    let encoder: Arc<dyn TextEncoder> = Arc::new(FastEmbedEncoder::new(&config.embedding.model)?);
    let similarity = Arc::new(EncoderSimilarity::new(encoder, &vocabulary)?);
    let resolver = LabelResolver::new(
        vocabulary.clone(),
        similarity,
        limit.unwrap_or(config.resolver.expansion_limit),
    );

    let labels = resolver.resolve(token)?;
    if labels.is_empty() {
        println!("No labels resolved for \"{token}\".");
    } else if vocabulary.contains(token) {
        println!("Exact match: {}", labels[0]);
    } else {
        println!("Similar labels for \"{token}\":");
        for label in labels {
            println!("  {label}");
        }
    }

    Ok(())
}

fn cmd_index(config_path: Option<PathBuf>, action: IndexAction) -> Result<()> {
    let config = Config::load_or_default(config_path.as_deref())?;

    match action {
        IndexAction::FixPaths { from, to } => {
            let keyword = fix_paths(&config.index.keyword_index, &from, &to)?;
            println!(
                "Rewrote {} paths in {}",
                keyword,
                config.index.keyword_index.display()
            );

            let embedding = fix_paths(&config.index.embedding_index, &from, &to)?;
            println!(
                "Rewrote {} paths in {}",
                embedding,
                config.index.embedding_index.display()
            );
        }
        IndexAction::Stats => {
            let vocabulary = LabelVocabulary::load(&config.index.vocabulary)?;
            let keyword_index = KeywordIndex::load(&config.index.keyword_index)?;
            let unknown = keyword_index.validate_against(&vocabulary);
            let embedding_index =
                EmbeddingIndex::load(&config.index.embedding_index, config.embedding.dimension)?;

            println!("Vocabulary labels: {}", vocabulary.len());
            println!(
                "Keyword index labels: {} ({} outside vocabulary)",
                keyword_index.len(),
                unknown
            );
            println!("Embedded images: {}", embedding_index.len());
        }
    }

    Ok(())
}

fn cmd_config(config_path: Option<PathBuf>, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = Config::load_or_default(config_path.as_deref())?;
            let content = toml::to_string_pretty(&config)?;
            println!("{content}");
        }
        ConfigAction::Init { force } => {
            let path = match config_path {
                Some(path) => path,
                None => Config::default_path()?,
            };

            if path.exists() && !force {
                return Err(ImagoError::Config(format!(
                    "Config file already exists at {} (use --force to overwrite)",
                    path.display()
                )));
            }

            Config::default().save(&path)?;
            println!("Wrote default configuration to {}", path.display());
        }
        ConfigAction::Validate { file } => {
            let path = match file.or(config_path) {
                Some(path) => path,
                None => Config::default_path()?,
            };

            Config::load(&path)?;
            println!("Configuration at {} is valid.", path.display());
        }
    }

    Ok(())
}

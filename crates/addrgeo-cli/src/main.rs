mod wiring;

use std::path::PathBuf;
use std::time::Duration;

use addrgeo_core::{Location, RawTags, SimilarityWeights, StructuredFields};
use addrgeo_resolver::{
    core_keyword_overlap_ratio, token_overlap, InMemoryGazetteer, SimilarityScorer,
};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "addrgeo-cli")]
#[command(about = "Resolve Chinese addresses to geocoded POIs")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Resolve an address and print the result JSON (`{}` when nothing matched)
    Resolve {
        address: String,
        /// Overall deadline for the whole resolution, in milliseconds
        #[arg(long)]
        deadline_ms: Option<u64>,
    },
    /// Print the similarity sub-scores of two address strings
    Similarity { a: String, b: String },
    /// Map a `<tag>value</tag>` string onto the canonical address fields
    Tags { text: String },
    /// List curated gazetteer entries near a `lng,lat` point, nearest first
    Nearby {
        location: String,
        #[arg(long, default_value = "1000")]
        radius_m: f64,
        #[arg(long, default_value = "1")]
        page: usize,
        #[arg(long, default_value = "10")]
        page_size: usize,
        /// Gazetteer snapshot (defaults to `ADDRGEO_GAZETTEER_PATH`)
        #[arg(long)]
        gazetteer: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Only `resolve` needs the service keys; the offline commands still pick
    // up the log level and scorer weights when the environment is complete.
    let config = addrgeo_core::load_app_config_from_env();
    let log_level = config.as_ref().map_or("info", |c| c.log_level.as_str());
    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(log_level))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Resolve {
            address,
            deadline_ms,
        } => {
            let config = config?;
            let resolver = wiring::build_resolver(&config)?;
            let resolution = match deadline_ms {
                Some(ms) => {
                    let deadline = tokio::time::Instant::now() + Duration::from_millis(ms);
                    resolver.resolve_with_deadline(&address, deadline).await
                }
                None => resolver.resolve(&address).await,
            };
            println!("{}", serde_json::to_string_pretty(&resolution.to_json()?)?);
        }
        Commands::Similarity { a, b } => {
            let weights = config.map(|c| c.pipeline.similarity).unwrap_or_default();
            println!("{}", serde_json::to_string_pretty(&similarity_report(weights, &a, &b))?);
        }
        Commands::Tags { text } => {
            let fields = fields_from_tag_text(&text);
            println!("{}", serde_json::to_string_pretty(&fields)?);
        }
        Commands::Nearby {
            location,
            radius_m,
            page,
            page_size,
            gazetteer,
        } => {
            let Some(origin) = Location::parse(&location) else {
                anyhow::bail!("invalid location {location:?}, expected \"lng,lat\"");
            };
            let path = match gazetteer {
                Some(path) => path,
                None => config?
                    .gazetteer_path
                    .ok_or_else(|| anyhow::anyhow!("no gazetteer snapshot configured"))?,
            };
            let gazetteer = InMemoryGazetteer::load(&path)?;
            let report = nearby_report(&gazetteer, &origin, radius_m, page, page_size);
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

fn similarity_report(weights: SimilarityWeights, a: &str, b: &str) -> serde_json::Value {
    serde_json::json!({
        "token": 100.0 * token_overlap(a, b),
        "structural": core_keyword_overlap_ratio(a, b),
        "score": SimilarityScorer::new(weights).score(a, b),
    })
}

fn nearby_report(
    gazetteer: &InMemoryGazetteer,
    origin: &Location,
    radius_m: f64,
    page: usize,
    page_size: usize,
) -> serde_json::Value {
    gazetteer
        .find_nearby(origin, radius_m, page, page_size)
        .into_iter()
        .map(|hit| {
            serde_json::json!({
                "id": hit.entry.id,
                "name": hit.entry.name,
                "address": hit.entry.address,
                "location": hit.entry.location().to_string(),
                "distance_m": hit.distance_m,
            })
        })
        .collect()
}

fn fields_from_tag_text(text: &str) -> StructuredFields {
    let tags: RawTags = addrgeo_llm::parse_tag_text(text);
    StructuredFields::from_tags(&tags)
}

#[cfg(test)]
mod tests;

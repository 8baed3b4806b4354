//! Demo that analyzes the products given on the command line with default
//! wiring (no external lookup collaborator) and merges each report into an
//! in-memory ledger.

use std::sync::Arc;

use product_sentiment_analyzer::{
    AnalyzerConfig, FrequencyArtifactRenderer, NoopLookup, ReportAggregator, ScoreLedger,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let products: Vec<String> = std::env::args().skip(1).collect();
    if products.is_empty() {
        eprintln!("usage: analyze_demo <product> [<product> ...]");
        std::process::exit(2);
    }

    let cfg = AnalyzerConfig::load_default()?;
    let aggregator = ReportAggregator::new(
        &cfg,
        Arc::new(NoopLookup),
        Arc::new(FrequencyArtifactRenderer::new("generated_artifacts")),
    );
    let ledger = ScoreLedger::in_memory();

    for product in &products {
        let report = aggregator.analyze(product).await;
        println!("{}", serde_json::to_string_pretty(&report)?);
        let entry = ledger.record(&report)?;
        println!(
            "ledger: {} score={} analyses={}",
            entry.product, entry.overall_score, entry.analysis_count
        );
    }

    for entry in ledger.top_n(10)? {
        println!(
            "top: {} score={} tweets={}",
            entry.product, entry.overall_score, entry.tweets_count
        );
    }

    Ok(())
}

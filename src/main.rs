use anyhow::Context;
use conviction_engine::{load_input, Config, ConvictionScorer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "conviction_engine=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::from_env();

    let input_path = std::env::args()
        .nth(1)
        .or_else(|| config.input_path.clone())
        .context("no input file: pass a path or set CONVICTION_INPUT")?;

    let input = load_input(&input_path)
        .await
        .with_context(|| format!("failed to load {}", input_path))?;
    info!(
        path = %input_path,
        spot = input.spot(),
        timeframes = input.timeframes().len(),
        has_options = input.options().is_some(),
        "Scoring input"
    );

    let scorer = ConvictionScorer::new(config.scoring.clone());
    let result = tokio::task::spawn_blocking(move || scorer.score(&input)).await?;

    info!(
        score = result.score,
        direction = result.direction.label(),
        level = result.level.label(),
        action = ?result.recommendation.action,
        risks = result.risk_factors.len(),
        "{}",
        result.trade_setup_text
    );

    let json = if config.pretty {
        serde_json::to_string_pretty(&result)?
    } else {
        serde_json::to_string(&result)?
    };

    match &config.output_path {
        Some(path) => {
            tokio::fs::write(path, json)
                .await
                .with_context(|| format!("failed to write {}", path))?;
            info!("Result written to {}", path);
        }
        None => println!("{}", json),
    }

    Ok(())
}

use std::io::Read;

use anyhow::{Context, bail};
use capture_pipeline::capture::{BrainDump, Capture, CaptureArtifact, SourceType};
use capture_pipeline::config::PipelineConfig;
use capture_pipeline::inference::{
    HttpInferenceService, InferenceConfig, InferenceService, SuggestionBundle,
};
use capture_pipeline::pipeline::annotate;
use chrono::Utc;

const USAGE: &str = "usage: capture-pipeline [--text]
  reads a JSON array of capture artifacts from stdin (or plain brain-dump
  text with --text) and prints the annotated candidates as JSON";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout carries the JSON result
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let mut text_mode = false;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--text" => text_mode = true,
            "-h" | "--help" => {
                println!("{USAGE}");
                return Ok(());
            }
            other => bail!("unknown argument `{other}`\n{USAGE}"),
        }
    }

    let config = PipelineConfig::from_env().context("invalid CAPTURE_* configuration")?;
    let inference = inference_from_env()?;

    let mut input = String::new();
    std::io::stdin()
        .read_to_string(&mut input)
        .context("failed to read stdin")?;

    let now = Utc::now();
    let artifacts: Vec<CaptureArtifact> = if text_mode {
        vec![BrainDump::new(input, now)?.into()]
    } else {
        serde_json::from_str(&input).context("stdin is not a JSON array of capture artifacts")?
    };
    tracing::info!(count = artifacts.len(), "Annotating captures");

    let mut candidates = Vec::with_capacity(artifacts.len());
    for artifact in artifacts {
        let suggestion = match &inference {
            Some(service) => suggest(service, &artifact).await?,
            None => None,
        };
        candidates.push(annotate(artifact, suggestion.as_ref(), now, &config));
    }

    println!("{}", serde_json::to_string_pretty(&candidates)?);
    Ok(())
}

/// `CAPTURE_INFERENCE_URL` enables suggestions; `CAPTURE_INFERENCE_KEY` is optional.
fn inference_from_env() -> anyhow::Result<Option<HttpInferenceService>> {
    let Ok(endpoint) = std::env::var("CAPTURE_INFERENCE_URL") else {
        return Ok(None);
    };
    let mut config = InferenceConfig::new(endpoint);
    if let Ok(key) = std::env::var("CAPTURE_INFERENCE_KEY") {
        config = config.with_api_key(key);
    }
    Ok(Some(HttpInferenceService::new(config)?))
}

async fn suggest(
    service: &HttpInferenceService,
    artifact: &CaptureArtifact,
) -> anyhow::Result<Option<SuggestionBundle>> {
    let text = match artifact {
        CaptureArtifact::Drive(_) => return Ok(None),
        CaptureArtifact::Email(e) => format!("{}\n\n{}", e.subject, e.body),
        CaptureArtifact::BrainDump(d) => d.content().to_string(),
    };
    let source: SourceType = artifact.source_type();
    let bundle = service
        .suggest(source, &text)
        .await
        .with_context(|| format!("inference failed for {}", artifact.id()))?;
    Ok(Some(bundle))
}

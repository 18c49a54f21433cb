//! NDJSON editor service over stdin/stdout.

use std::sync::Arc;

use seamcut_common::config::AppConfig;
use seamcut_render_engine::service::{serve, EditorService};

pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    let service = EditorService::new(Arc::new(super::pipeline(config)));
    tracing::info!("Serving requests on stdin");

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    serve(service, stdin, tokio::io::stdout()).await?;
    Ok(())
}

use std::sync::Arc;

use bridge::{LambdaInvoker, Settings, SqsQueue, Supervisor};
use tokio_util::sync::CancellationToken;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .init();

    let settings = Settings::from_env()?;

    let queue = Arc::new(SqsQueue::connect(&settings.queue).await);
    let invoker = Arc::new(LambdaInvoker::connect(&settings.lambda_endpoint, settings.region()).await);

    let supervisor = Supervisor::start(
        settings.service.clone(),
        &settings.queue,
        queue,
        invoker,
        CancellationToken::new(),
    )
    .await;

    if supervisor.running() == 0 {
        tracing::warn!("No queue bindings are running");
    }

    tokio::signal::ctrl_c().await?;
    tracing::info!("Received shutdown signal, stopping poll loops");

    for report in supervisor.shutdown().await {
        tracing::info!(
            "{} (λ: {}): {} batches, {} messages, {} failed cycles",
            report.queue,
            report.function,
            report.batches,
            report.messages,
            report.failures
        );
    }

    Ok(())
}

use aws_lambda_events::sqs::{SqsBatchResponse, SqsEvent, SqsMessage};
use lambda_runtime::{service_fn, Error, LambdaEvent};

#[tokio::main]
async fn main() -> Result<(), Error> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .without_time()
        .init();

    lambda_runtime::run(service_fn(|event: LambdaEvent<SqsEvent>| async {
        handle(event).await
    }))
    .await
}

async fn handle(event: LambdaEvent<SqsEvent>) -> Result<SqsBatchResponse, Error> {
    tracing::info!("Processing {} SQS records", event.payload.records.len());

    for record in event.payload.records.iter() {
        tracing::info!("{}", describe(record));
    }

    Ok(SqsBatchResponse {
        batch_item_failures: Vec::new(),
    })
}

fn describe(record: &SqsMessage) -> String {
    format!(
        "{} from {}: {}",
        record.message_id.as_deref().unwrap_or("<no id>"),
        record.event_source_arn.as_deref().unwrap_or("<unknown source>"),
        record.body.as_deref().unwrap_or("")
    )
}

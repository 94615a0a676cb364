use aws_config::{BehaviorVersion, Region};
use aws_sdk_sqs::config::Credentials;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde::Serialize;
use serde_json::Value;

const DEFAULT_SQS_ENDPOINT: &str = "http://localstack:4576";
const DEFAULT_QUEUE_URL: &str = "http://localstack:4576/queue/test-sqs";
const DEFAULT_BODY: &str = "test";

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct SentMessage {
    message_id: Option<String>,
    md5_of_message_body: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .without_time()
        .init();

    let endpoint = std::env::var("SQS_ENDPOINT").unwrap_or(DEFAULT_SQS_ENDPOINT.to_string());
    let queue_url = std::env::var("QUEUE_URL").unwrap_or(DEFAULT_QUEUE_URL.to_string());

    let config = aws_config::defaults(BehaviorVersion::latest())
        .endpoint_url(&endpoint)
        .region(Region::new("us-east-1"))
        .credentials_provider(Credentials::new("root", "root", None, None, "local"))
        .load()
        .await;
    let sqs_client = aws_sdk_sqs::Client::new(&config);

    lambda_runtime::run(service_fn(|event: LambdaEvent<Value>| async {
        handle(event, &sqs_client, &queue_url).await
    }))
    .await
}

async fn handle(
    event: LambdaEvent<Value>,
    sqs_client: &aws_sdk_sqs::Client,
    queue_url: &str,
) -> Result<SentMessage, Error> {
    let body = message_body(&event.payload);

    let output = sqs_client
        .send_message()
        .queue_url(queue_url)
        .message_body(body)
        .send()
        .await?;

    tracing::info!("Sent {:?} to {}", output.message_id(), queue_url);

    Ok(SentMessage {
        message_id: output.message_id().map(str::to_string),
        md5_of_message_body: output.md5_of_message_body().map(str::to_string),
    })
}

/// `body` of the triggering event, `test` otherwise
fn message_body(payload: &Value) -> &str {
    payload
        .get("body")
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_BODY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sends_test_by_default() {
        assert_eq!(message_body(&json!({})), "test");
        assert_eq!(message_body(&json!({ "body": 42 })), "test");
    }

    #[test]
    fn event_body_overrides() {
        assert_eq!(message_body(&json!({ "body": "hello" })), "hello");
    }
}

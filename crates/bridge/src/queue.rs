use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_sqs::{
    config::Credentials,
    error::DisplayErrorContext,
    types::{
        DeleteMessageBatchRequestEntry, Message, MessageAttributeValue,
        MessageSystemAttributeName, QueueAttributeName,
    },
    Client,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use domain::{MessageAttribute, QueueRuntimeConfig, ReceivedMessage};
use url::Url;

use crate::error::{Error, Result};

/// Long-poll window of every receive call
pub const WAIT_TIME_SECONDS: i32 = 20;

/// Operations the bridge needs from a queue service
#[async_trait]
pub trait QueueService: Send + Sync {
    /// Idempotent create, only called when auto-creation is enabled
    async fn ensure_queue(&self, name: &str, attributes: &BTreeMap<String, String>) -> Result<()>;

    async fn resolve_url(&self, name: &str) -> Result<String>;

    /// Long-poll receive. No message within the window is an empty batch.
    async fn receive(&self, url: &str, max_messages: i32) -> Result<Vec<ReceivedMessage>>;

    /// Acknowledges the whole batch in one request
    async fn delete_batch(&self, url: &str, messages: &[ReceivedMessage]) -> Result<()>;
}

/// [`QueueService`] over the SQS API of a local queue service
pub struct SqsQueue {
    client: Client,
    host: String,
}

impl SqsQueue {
    pub async fn connect(config: &QueueRuntimeConfig) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .endpoint_url(&config.endpoint)
            .region(Region::new(config.region.clone()));

        if let Some(credentials) = &config.credentials {
            loader = loader.credentials_provider(Credentials::new(
                credentials.access_key_id.clone(),
                credentials.secret_access_key.clone(),
                None,
                None,
                "offline-sqs",
            ));
        }

        let sdk_config = loader.load().await;
        tracing::info!("SQS client initialized for {}", config.endpoint);

        Self {
            client: Client::new(&sdk_config),
            host: config.host.clone(),
        }
    }
}

#[async_trait]
impl QueueService for SqsQueue {
    async fn ensure_queue(&self, name: &str, attributes: &BTreeMap<String, String>) -> Result<()> {
        let attributes: HashMap<QueueAttributeName, String> = attributes
            .iter()
            .map(|(key, value)| (QueueAttributeName::from(key.as_str()), value.clone()))
            .collect();

        self.client
            .create_queue()
            .queue_name(name)
            .set_attributes((!attributes.is_empty()).then_some(attributes))
            .send()
            .await
            .map_err(|e| Error::queue(DisplayErrorContext(e)))?;

        tracing::info!("Queue {} is ready", name);
        Ok(())
    }

    async fn resolve_url(&self, name: &str) -> Result<String> {
        let output = self
            .client
            .get_queue_url()
            .queue_name(name)
            .send()
            .await
            .map_err(|e| Error::queue(DisplayErrorContext(e)))?;

        let url = output.queue_url().ok_or_else(|| Error::MissingQueueUrl {
            queue: name.to_string(),
        })?;

        rewrite_loopback(url, &self.host)
    }

    async fn receive(&self, url: &str, max_messages: i32) -> Result<Vec<ReceivedMessage>> {
        let output = self
            .client
            .receive_message()
            .queue_url(url)
            .max_number_of_messages(max_messages)
            .wait_time_seconds(WAIT_TIME_SECONDS)
            .message_system_attribute_names(MessageSystemAttributeName::All)
            .message_attribute_names("All")
            .send()
            .await
            .map_err(|e| Error::queue(DisplayErrorContext(e)))?;

        output
            .messages
            .unwrap_or_default()
            .into_iter()
            .map(received_message)
            .collect()
    }

    async fn delete_batch(&self, url: &str, messages: &[ReceivedMessage]) -> Result<()> {
        let entries = messages
            .iter()
            .map(|message| {
                DeleteMessageBatchRequestEntry::builder()
                    .id(&message.message_id)
                    .receipt_handle(&message.receipt_handle)
                    .build()
                    .map_err(Error::queue)
            })
            .collect::<Result<Vec<_>>>()?;

        let output = self
            .client
            .delete_message_batch()
            .queue_url(url)
            .set_entries(Some(entries))
            .send()
            .await
            .map_err(|e| Error::queue(DisplayErrorContext(e)))?;

        let failed = output.failed();
        if !failed.is_empty() {
            let ids = failed
                .iter()
                .map(|entry| entry.id().to_string())
                .collect::<Vec<_>>()
                .join(", ");
            return Err(Error::PartialAcknowledgement {
                failed: failed.len(),
                total: messages.len(),
                ids,
            });
        }

        Ok(())
    }
}

/// Points a queue URL that names a loopback host at the configured host.
///
/// Local queue services report `localhost` URLs even when they are reached
/// under another name, e.g. from inside a container network.
pub fn rewrite_loopback(url: &str, host: &str) -> Result<String> {
    let mut parsed = Url::parse(url)?;
    let loopback = matches!(
        parsed.host_str(),
        Some("localhost" | "127.0.0.1" | "[::1]")
    );

    if loopback && parsed.host_str() != Some(host) {
        parsed.set_host(Some(host))?;
    }

    Ok(parsed.to_string())
}

fn received_message(message: Message) -> Result<ReceivedMessage> {
    let message_id = message
        .message_id
        .ok_or_else(|| Error::MalformedMessage("missing message id".to_string()))?;
    let receipt_handle = message.receipt_handle.ok_or_else(|| {
        Error::MalformedMessage(format!("message {message_id} has no receipt handle"))
    })?;

    let attributes = message
        .attributes
        .unwrap_or_default()
        .into_iter()
        .map(|(name, value)| (name.as_str().to_string(), value))
        .collect();

    let message_attributes = message
        .message_attributes
        .unwrap_or_default()
        .into_iter()
        .map(|(name, value)| (name, message_attribute(&value)))
        .collect();

    Ok(ReceivedMessage {
        message_id,
        receipt_handle,
        body: message.body,
        md5_of_body: message.md5_of_body,
        attributes,
        message_attributes,
    })
}

fn message_attribute(value: &MessageAttributeValue) -> MessageAttribute {
    MessageAttribute {
        string_value: value.string_value().map(str::to_string),
        binary_value: value.binary_value().map(|blob| STANDARD.encode(blob.as_ref())),
        string_list_values: value.string_list_values().to_vec(),
        binary_list_values: value
            .binary_list_values()
            .iter()
            .map(|blob| STANDARD.encode(blob.as_ref()))
            .collect(),
        data_type: value.data_type().to_string(),
    }
}

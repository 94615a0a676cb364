use std::collections::BTreeMap;

use derive_new::new;
use serde::Serialize;

use crate::queues::QueueBinding;
use crate::service::ServiceDefinition;

pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_ACCOUNT_ID: &str = "000000000000";
pub const DEFAULT_EVENT_SOURCE: &str = "queue";

/// Message as received from the queue service, alive for one poll cycle
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ReceivedMessage {
    pub message_id: String,
    pub receipt_handle: String,
    pub body: Option<String>,
    pub md5_of_body: Option<String>,
    pub attributes: BTreeMap<String, String>,
    pub message_attributes: BTreeMap<String, MessageAttribute>,
}

/// User-defined message attribute in the function event shape.
/// Binary values are base64-encoded.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageAttribute {
    pub string_value: Option<String>,
    pub binary_value: Option<String>,
    pub string_list_values: Vec<String>,
    pub binary_list_values: Vec<String>,
    pub data_type: String,
}

/// Where the records of an invocation event claim to come from
#[derive(Clone, Debug, Eq, PartialEq, new)]
pub struct EventSource {
    pub arn: String,
    pub region: String,
    pub tag: String,
}

impl EventSource {
    /// Uses the binding's literal ARN when there is one, otherwise synthesizes
    /// one from the provider region, account id and queue name.
    pub fn for_binding(
        binding: &QueueBinding,
        queue_name: &str,
        service: &ServiceDefinition,
        tag: &str,
    ) -> Self {
        let region = service
            .provider
            .region
            .as_deref()
            .unwrap_or(DEFAULT_REGION)
            .to_string();
        let account_id = service
            .provider
            .account_id
            .as_deref()
            .unwrap_or(DEFAULT_ACCOUNT_ID);

        let arn = match &binding.arn {
            Some(arn) => arn.clone(),
            None => format!("arn:aws:sqs:{region}:{account_id}:{queue_name}"),
        };

        Self::new(arn, region, tag.to_string())
    }
}

/// Payload delivered to the function, one record per received message
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct InvocationEvent {
    #[serde(rename = "Records")]
    pub records: Vec<QueueRecord>,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueRecord {
    pub message_id: String,
    pub receipt_handle: String,
    pub body: Option<String>,
    pub attributes: BTreeMap<String, String>,
    pub message_attributes: BTreeMap<String, MessageAttribute>,
    pub md5_of_body: Option<String>,
    pub event_source: String,
    #[serde(rename = "eventSourceARN")]
    pub event_source_arn: String,
    pub aws_region: String,
}

/// Builds the invocation event for a received batch, keeping receive order
pub fn translate(source: &EventSource, messages: &[ReceivedMessage]) -> InvocationEvent {
    let records = messages
        .iter()
        .map(|message| QueueRecord {
            message_id: message.message_id.clone(),
            receipt_handle: message.receipt_handle.clone(),
            body: message.body.clone(),
            attributes: message.attributes.clone(),
            message_attributes: message.message_attributes.clone(),
            md5_of_body: message.md5_of_body.clone(),
            event_source: source.tag.clone(),
            event_source_arn: source.arn.clone(),
            aws_region: source.region.clone(),
        })
        .collect();

    InvocationEvent { records }
}

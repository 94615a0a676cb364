use crate::service::{ArnDefinition, ServiceDefinition, SqsEventDefinition};

/// Batch size when a binding does not set one
pub const DEFAULT_BATCH_SIZE: i32 = 10;

/// Most messages a single receive call may return
pub const MAX_BATCH_SIZE: i32 = 10;

/// Association between one function and one queue event source.
///
/// Built once from the service definition and never modified afterwards.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct QueueBinding {
    pub function: String,
    /// Literal queue ARN
    pub arn: Option<String>,
    /// Explicit queue name
    pub queue_name: Option<String>,
    /// Logical resource referenced through `Fn::GetAtt`
    pub resource: Option<String>,
    pub batch_size: i32,
}

impl QueueBinding {
    pub fn from_definition(function: &str, definition: &SqsEventDefinition) -> Option<Self> {
        let options = match definition {
            SqsEventDefinition::Arn(arn) => {
                return Some(Self {
                    function: function.to_string(),
                    arn: Some(arn.clone()),
                    batch_size: DEFAULT_BATCH_SIZE,
                    ..Default::default()
                })
            }
            SqsEventDefinition::Detailed(options) => options,
        };

        if options.enabled == Some(false) {
            tracing::info!("Skipping disabled queue event of {}", function);
            return None;
        }

        let (arn, resource) = match &options.arn {
            Some(ArnDefinition::Literal(arn)) => (Some(arn.clone()), None),
            Some(ArnDefinition::GetAtt(get_att)) => (None, get_att.resource().map(str::to_string)),
            Some(ArnDefinition::Other(_)) | None => (None, None),
        };

        Some(Self {
            function: function.to_string(),
            arn,
            queue_name: options.queue_name.clone(),
            resource,
            batch_size: clamp_batch_size(function, options.batch_size),
        })
    }

    /// Every enabled (function, queue event) pair, functions in name order
    pub fn collect(service: &ServiceDefinition) -> Vec<Self> {
        service
            .functions
            .iter()
            .flat_map(|(name, function)| {
                function
                    .events
                    .iter()
                    .filter_map(|event| event.sqs.as_ref())
                    .filter_map(move |sqs| Self::from_definition(name, sqs))
            })
            .collect()
    }
}

fn clamp_batch_size(function: &str, batch_size: Option<i32>) -> i32 {
    let requested = batch_size.unwrap_or(DEFAULT_BATCH_SIZE);
    let clamped = requested.clamp(1, MAX_BATCH_SIZE);
    if clamped != requested {
        tracing::warn!(
            "Batch size {} of {} is outside 1..={}, using {}",
            requested,
            function,
            MAX_BATCH_SIZE,
            clamped
        );
    }
    clamped
}

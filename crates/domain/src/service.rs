use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use crate::settings::{OfflineSettings, QueueRuntimeSettings};
use crate::value::PropertyValue;

pub const DEFAULT_STAGE: &str = "dev";

pub type Environment = BTreeMap<String, PropertyValue>;

/// Already-parsed service definition
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ServiceDefinition {
    pub service: String,

    #[serde(default)]
    pub provider: Provider,

    /// Ordered by name so startup is deterministic
    #[serde(default)]
    pub functions: BTreeMap<String, FunctionDefinition>,

    #[serde(default)]
    pub resources: Resources,

    #[serde(default)]
    pub custom: Custom,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provider {
    pub region: Option<String>,
    pub stage: Option<String>,
    pub account_id: Option<String>,
    #[serde(default)]
    pub environment: Environment,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct FunctionDefinition {
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub events: Vec<EventDefinition>,
}

/// One entry of a function's `events` list. Only queue events are kept.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct EventDefinition {
    pub sqs: Option<SqsEventDefinition>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum SqsEventDefinition {
    Arn(String),
    Detailed(SqsEventOptions),
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SqsEventOptions {
    pub arn: Option<ArnDefinition>,
    pub queue_name: Option<String>,
    pub batch_size: Option<i32>,
    pub enabled: Option<bool>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum ArnDefinition {
    Literal(String),
    GetAtt(GetAtt),
    Other(Value),
}

#[derive(Clone, Debug, Deserialize)]
pub struct GetAtt {
    #[serde(rename = "Fn::GetAtt")]
    pub target: GetAttTarget,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum GetAttTarget {
    /// `["Resource", "Arn"]`
    List(Vec<String>),
    /// `"Resource.Arn"`
    Dotted(String),
}

impl GetAtt {
    pub fn resource(&self) -> Option<&str> {
        let resource = match &self.target {
            GetAttTarget::List(parts) => parts.first().map(String::as_str),
            GetAttTarget::Dotted(path) => path.split('.').next(),
        };
        resource.filter(|name| !name.is_empty())
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Resources {
    #[serde(rename = "Resources", default)]
    pub resources: BTreeMap<String, ResourceDefinition>,
}

impl Resources {
    pub fn properties(&self, name: &str) -> Option<&BTreeMap<String, PropertyValue>> {
        self.resources.get(name)?.properties.as_ref()
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ResourceDefinition {
    #[serde(rename = "Properties")]
    pub properties: Option<BTreeMap<String, PropertyValue>>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Custom {
    #[serde(rename = "serverless-offline", default)]
    pub offline: OfflineSettings,

    #[serde(rename = "serverless-offline-sqs-external", default)]
    pub sqs: QueueRuntimeSettings,
}

impl ServiceDefinition {
    pub fn stage(&self) -> &str {
        self.provider.stage.as_deref().unwrap_or(DEFAULT_STAGE)
    }

    /// Name the local function host registers a function under
    pub fn function_identifier(&self, function: &str) -> String {
        format!("{}-{}-{}", self.service, self.stage(), function)
    }

    pub fn function_environment(&self, function: &str) -> Option<&Environment> {
        self.functions.get(function).map(|f| &f.environment)
    }
}

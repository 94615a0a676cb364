use std::collections::BTreeMap;

use crate::errors::{Error, Result};
use crate::service::Resources;
use crate::value::PropertyValue;

use super::QueueBinding;

const QUEUE_NAME_PROPERTY: &str = "QueueName";

/// Name segment of `arn:partition:service:region:account:name`
pub fn queue_name_from_arn(arn: &str) -> Result<String> {
    match arn.split(':').nth(5) {
        Some(name) if !name.is_empty() => Ok(name.to_string()),
        _ => Err(Error::InvalidArn {
            arn: arn.to_string(),
        }),
    }
}

/// Resolves the logical queue name of a binding.
///
/// A literal ARN wins over an explicit queue name, which wins over the
/// `QueueName` property of the referenced resource.
pub fn resolve_queue_name(binding: &QueueBinding, resources: &Resources) -> Result<String> {
    if let Some(arn) = &binding.arn {
        return queue_name_from_arn(arn);
    }

    if let Some(name) = binding.queue_name.as_deref().filter(|name| !name.is_empty()) {
        return Ok(name.to_string());
    }

    let Some(resource) = &binding.resource else {
        return Err(Error::MissingQueueName {
            function: binding.function.clone(),
        });
    };

    resource_properties(resource, resources)?
        .get(QUEUE_NAME_PROPERTY)
        .and_then(PropertyValue::as_resolved)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .ok_or_else(|| Error::MissingQueueNameProperty {
            resource: resource.clone(),
            function: binding.function.clone(),
        })
}

/// Queue creation attributes taken from the referenced resource.
///
/// Dynamic references cannot be resolved locally; they are left out with a
/// warning, as are explicit nulls.
pub fn resolve_creation_properties(
    binding: &QueueBinding,
    resources: &Resources,
) -> Result<BTreeMap<String, String>> {
    let Some(resource) = &binding.resource else {
        return Ok(BTreeMap::new());
    };
    let properties = resource_properties(resource, resources)?;

    let mut attributes = BTreeMap::new();
    for (key, value) in properties {
        if key == QUEUE_NAME_PROPERTY {
            continue;
        }
        match value {
            PropertyValue::Resolved(value) => {
                attributes.insert(key.clone(), value.clone());
            }
            PropertyValue::DynamicReference(_) | PropertyValue::Null => {
                tracing::warn!(
                    "Ignoring property '{}' of {}, it is an unresolvable reference: {}",
                    key,
                    binding.function,
                    value.raw()
                );
            }
        }
    }

    Ok(attributes)
}

fn resource_properties<'a>(
    resource: &str,
    resources: &'a Resources,
) -> Result<&'a BTreeMap<String, PropertyValue>> {
    resources
        .properties(resource)
        .ok_or_else(|| Error::MissingResource {
            resource: resource.to_string(),
        })
}

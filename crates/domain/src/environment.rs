use std::collections::{BTreeMap, BTreeSet};

use crate::service::Environment;
use crate::value::PropertyValue;

pub const REGION_VARIABLE: &str = "AWS_REGION";

/// Environment a single invocation runs with.
///
/// Built per call and handed to the invoker. The process environment is only
/// read, never modified.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct EnvironmentView {
    vars: BTreeMap<String, String>,
    configured: BTreeSet<String>,
}

impl EnvironmentView {
    /// Layers, lowest precedence first: region, process, provider, function.
    pub fn layered<I>(
        region: &str,
        process: I,
        provider: &Environment,
        function: &Environment,
    ) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut view = Self::default();
        view.set_configured(REGION_VARIABLE, region);

        for (key, value) in process {
            view.configured.remove(&key);
            view.vars.insert(key, value);
        }

        for layer in [provider, function] {
            for (key, value) in layer {
                match value {
                    PropertyValue::Resolved(value) => view.set_configured(key, value),
                    PropertyValue::DynamicReference(_) | PropertyValue::Null => {
                        tracing::warn!(
                            "Ignoring environment variable '{}', it is an unresolvable reference: {}",
                            key,
                            value.raw()
                        );
                    }
                }
            }
        }

        view
    }

    fn set_configured(&mut self, key: &str, value: &str) {
        self.vars.insert(key.to_string(), value.to_string());
        self.configured.insert(key.to_string());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Variables whose final value came from the service definition rather
    /// than the inherited process environment
    pub fn configured(&self) -> BTreeMap<&str, &str> {
        self.configured
            .iter()
            .filter_map(|key| Some((key.as_str(), self.vars.get(key)?.as_str())))
            .collect()
    }
}

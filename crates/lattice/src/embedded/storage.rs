//! Per-scope instance storage.

use std::any::Any;
use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};

use crate::errors::{CleanupAggregateError, CleanupFailure, ComponentError};
use crate::scope::ScopeId;

use super::catalog::{ComponentDefinition, Instance};

/// Instances created inside one active scope, kept in creation order.
#[derive(Default)]
pub(crate) struct ScopeStore {
    instances: Vec<(String, Instance)>,
}

impl ScopeStore {
    pub(crate) fn get(&self, name: &str) -> Option<Instance> {
        self.instances
            .iter()
            .find(|(candidate, _)| candidate == name)
            .map(|(_, instance)| Instance::clone(instance))
    }

    pub(crate) fn insert(&mut self, name: String, instance: Instance) {
        self.instances.push((name, instance));
    }

    pub(crate) const fn len(&self) -> usize {
        self.instances.len()
    }

    /// Runs destruction callbacks newest first and releases every instance.
    ///
    /// A panicking callback is recorded as a failure; later callbacks still run.
    pub(crate) fn destroy(
        self,
        scope: &ScopeId,
        definitions: &HashMap<String, ComponentDefinition>,
    ) -> CleanupAggregateError {
        let mut failures = CleanupAggregateError::default();
        for (name, instance) in self.instances.into_iter().rev() {
            let Some(definition) = definitions.get(&name) else {
                continue;
            };
            if let Err(source) = run_destructor(definition, &instance) {
                failures.push(CleanupFailure {
                    scope: scope.clone(),
                    component: name,
                    source,
                });
            }
        }
        failures
    }
}

/// Runs one destruction callback, turning a panic into an error.
pub(crate) fn run_destructor(
    definition: &ComponentDefinition,
    instance: &Instance,
) -> Result<(), ComponentError> {
    catch_unwind(AssertUnwindSafe(|| definition.destroy(instance)))
        .unwrap_or_else(|payload| Err(panic_message(payload.as_ref()).into()))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| (*message).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .map_or_else(
            || String::from("destruction callback panicked"),
            |message| format!("destruction callback panicked: {message}"),
        )
}

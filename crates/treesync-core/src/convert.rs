//! Conversion between plain values and shared containers.
//!
//! [`to_container`] and [`to_plain_value`] are mutual inverses for composite
//! values that contain no callables and no absent sentinels.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::{CallablePolicy, ContainerKind, ConvertError, SharedContainer, Slot, Value};

/// Materializes a composite value as a tree of detached containers.
///
/// Conversion is all-or-nothing: the first unsupported element aborts it and
/// no container is returned. Callables are rejected wherever they appear.
///
/// ```
/// # use treesync_core::{convert, MemoryContainer, Value};
/// let value = Value::from_json_str("{\"foo\":[1,{\"bar\":true}]}")?;
/// let container: MemoryContainer = convert::to_container(&value)?;
/// assert_eq!(convert::to_plain_value(&container), value);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn to_container<C: SharedContainer>(value: &Value) -> Result<C, ConvertError> {
    Materializer::new(CallablePolicy::Reject).container(value)
}

/// Converts any value into a container entry.
///
/// Composites become nested containers, data scalars are stored as-is.
///
/// ```
/// # use treesync_core::{convert, ConvertError, MemoryContainer, Slot, Value};
/// let slot: Slot<MemoryContainer> = convert::to_slot(&Value::from(3))?;
/// assert_eq!(slot, Slot::Scalar(Value::from(3)));
/// assert_eq!(convert::to_slot::<MemoryContainer>(&Value::Void), Err(ConvertError::Absent));
/// # Ok::<(), ConvertError>(())
/// ```
pub fn to_slot<C: SharedContainer>(value: &Value) -> Result<Slot<C>, ConvertError> {
    Materializer::new(CallablePolicy::Reject).slot(value)
}

/// Value-to-container conversion under a [`CallablePolicy`].
///
/// With [`CallablePolicy::Skip`], callable members of mappings are left out
/// of the containers being built and counted. Callables anywhere else are
/// always rejected, since dropping a sequence element would shift its
/// neighbours.
///
/// ```
/// # use treesync_core::{convert::Materializer, Callable, CallablePolicy, MemoryContainer, Value};
/// let value: Value = [
///     ("n".to_string(), Value::from(1)),
///     ("bump".to_string(), Value::from(Callable::new("bump", |_| Value::Null))),
/// ]
/// .into_iter()
/// .collect();
///
/// let mut materializer = Materializer::new(CallablePolicy::Skip);
/// let container: MemoryContainer = materializer.container(&value)?;
/// assert_eq!(container.to_value(), Value::from_json_str("{\"n\":1}")?);
/// assert_eq!(materializer.skipped(), 1);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct Materializer {
    policy: CallablePolicy,
    skipped: usize,
}

impl Materializer {
    /// Creates a materializer applying `policy` to callable mapping members.
    #[must_use]
    pub fn new(policy: CallablePolicy) -> Self {
        Self { policy, skipped: 0 }
    }

    /// Callable members left out so far.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Builds a detached container tree holding the composite `value`.
    pub fn container<C: SharedContainer>(&mut self, value: &Value) -> Result<C, ConvertError> {
        match value {
            Value::Mapping(map) => {
                let container = C::detached(ContainerKind::Mapping);
                for (key, child) in map {
                    if let Value::Callable(callable) = child.as_ref() {
                        if self.policy == CallablePolicy::Skip {
                            debug!(key = %key, name = callable.name(), "leaving out callable");
                            self.skipped += 1;
                            continue;
                        }
                    }
                    container.set(key, self.slot(child)?);
                }
                Ok(container)
            }
            Value::Sequence(items) => {
                let container = C::detached(ContainerKind::Sequence);
                let mut slots = Vec::with_capacity(items.len());
                for item in items {
                    slots.push(self.slot(item)?);
                }
                container.insert(0, slots);
                Ok(container)
            }
            other => Err(ConvertError::ScalarRoot { found: other.shape() }),
        }
    }

    /// Converts `value` into a container entry.
    ///
    /// A callable passed here directly is an error; the policy only governs
    /// mapping members met while building a container.
    pub fn slot<C: SharedContainer>(&mut self, value: &Value) -> Result<Slot<C>, ConvertError> {
        match value {
            Value::Void => Err(ConvertError::Absent),
            Value::Callable(callable) => {
                Err(ConvertError::Callable { name: callable.name().to_string() })
            }
            Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => {
                Ok(Slot::Scalar(value.clone()))
            }
            Value::Mapping(_) | Value::Sequence(_) => Ok(Slot::Container(self.container(value)?)),
        }
    }
}

/// Deep snapshot of a container as a plain value.
pub fn to_plain_value<C: SharedContainer>(container: &C) -> Value {
    match container.kind() {
        ContainerKind::Mapping => {
            let mut map = BTreeMap::new();
            for key in container.keys() {
                if let Some(slot) = container.get(&key) {
                    map.insert(key, Arc::new(slot.to_plain()));
                }
            }
            Value::Mapping(map)
        }
        ContainerKind::Sequence => Value::Sequence(
            container
                .slice(0, container.len())
                .iter()
                .map(|slot| Arc::new(slot.to_plain()))
                .collect(),
        ),
    }
}

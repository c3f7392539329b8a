use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::{ActionKind, EntityId, PowerState};

/// Last known state of one remote entity. Replaced wholesale on every change,
/// never patched in place.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    #[serde(rename = "ref")]
    pub id: EntityId,
    pub display_name: String,
    pub power_state: PowerState,
    pub permitted_actions: BTreeSet<ActionKind>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PayloadError {
    #[error("payload is not an object")]
    NotAnObject,
    #[error("payload for {id} has no power state")]
    MissingPowerState { id: EntityId },
    #[error("payload for {id} has unknown power state {value:?}")]
    UnknownPowerState { id: EntityId, value: String },
}

impl EntitySnapshot {
    pub fn new(
        id: impl Into<EntityId>,
        display_name: impl Into<String>,
        power_state: PowerState,
        permitted_actions: impl IntoIterator<Item = ActionKind>,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            power_state,
            permitted_actions: permitted_actions.into_iter().collect(),
        }
    }

    pub fn permits(&self, action: ActionKind) -> bool {
        self.permitted_actions.contains(&action)
    }

    /// Decode the attributes the engine reads from a raw remote payload.
    ///
    /// Accepts both camelCase and snake_case field names. Action names the
    /// engine does not know are dropped.
    pub fn from_payload(id: EntityId, payload: &Value) -> Result<Self, PayloadError> {
        let obj = payload.as_object().ok_or(PayloadError::NotAnObject)?;
        let field = |camel: &str, snake: &str| obj.get(camel).or_else(|| obj.get(snake));

        let display_name = field("nameLabel", "name_label")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let raw_state = field("powerState", "power_state")
            .and_then(Value::as_str)
            .ok_or_else(|| PayloadError::MissingPowerState { id: id.clone() })?;
        let power_state = PowerState::parse(raw_state).ok_or_else(|| PayloadError::UnknownPowerState {
            id: id.clone(),
            value: raw_state.to_string(),
        })?;

        let permitted_actions = field("myActions", "my_actions")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .filter_map(ActionKind::from_wire)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            id,
            display_name,
            power_state,
            permitted_actions,
        })
    }
}

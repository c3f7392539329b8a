//! Identity resolution for raw remote payloads.
//!
//! Every payload resolves to either a cache key or to "no independent
//! identity". Payloads without identity are never cached standalone; they stay
//! embedded in whatever object carried them.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::{EntityId, EntitySnapshot, PayloadError};

const TYPENAME_FIELD: &str = "__typename";
const STRUCTURAL_KEY_HEX_LEN: usize = 16;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Identity {
    Keyed(EntityId),
    Unidentifiable,
}

impl Identity {
    pub fn key(&self) -> Option<&EntityId> {
        match self {
            Identity::Keyed(id) => Some(id),
            Identity::Unidentifiable => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityPolicy {
    /// Domain-stable unique field, preferred over everything else.
    pub durable_field: String,
    /// Generic id fields tried in order when the durable field is absent.
    pub fallback_fields: Vec<String>,
    /// Typenames that only reference other objects and must not be cached alone.
    pub unidentifiable_typenames: Vec<String>,
}

impl Default for IdentityPolicy {
    fn default() -> Self {
        Self {
            durable_field: "uuid".to_string(),
            fallback_fields: vec!["ref".to_string(), "id".to_string(), "_id".to_string()],
            unidentifiable_typenames: vec!["Interface".to_string()],
        }
    }
}

impl IdentityPolicy {
    /// Resolve the cache key for a raw payload. Pure and total.
    pub fn identity_of(&self, payload: &Value) -> Identity {
        let Some(obj) = payload.as_object() else {
            return Identity::Unidentifiable;
        };
        let typename = obj.get(TYPENAME_FIELD).and_then(Value::as_str);

        if let Some(uuid) = obj.get(&self.durable_field).and_then(scalar_text) {
            return Identity::Keyed(keyed(typename, &uuid));
        }

        if let Some(t) = typename {
            if self.unidentifiable_typenames.iter().any(|u| u == t) {
                return Identity::Unidentifiable;
            }
        }

        for field in &self.fallback_fields {
            if let Some(v) = obj.get(field).and_then(scalar_text) {
                return Identity::Keyed(keyed(typename, &v));
            }
        }

        Identity::Keyed(keyed(typename, &structural_key(payload)))
    }

    /// Resolve identity and decode the snapshot in one step.
    pub fn normalize(&self, payload: &Value) -> Result<Normalized, PayloadError> {
        match self.identity_of(payload) {
            Identity::Keyed(id) => Ok(Normalized::Entity(EntitySnapshot::from_payload(id, payload)?)),
            Identity::Unidentifiable => Ok(Normalized::Unidentifiable),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Normalized {
    Entity(EntitySnapshot),
    Unidentifiable,
}

fn keyed(typename: Option<&str>, value: &str) -> EntityId {
    match typename {
        Some(t) => EntityId(format!("{t}:{value}")),
        None => EntityId(value.to_string()),
    }
}

fn scalar_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn structural_key(payload: &Value) -> String {
    let mut canonical = String::new();
    write_canonical(payload, &mut canonical);
    let digest = Sha256::digest(canonical.as_bytes());
    let mut key = hex::encode(digest);
    key.truncate(STRUCTURAL_KEY_HEX_LEN);
    key
}

/// Key-sorted JSON rendering so that field order never changes the key.
fn write_canonical(v: &Value, out: &mut String) {
    match v {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, k) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(k.clone()).to_string());
                out.push(':');
                write_canonical(&map[k], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        other => out.push_str(&other.to_string()),
    }
}

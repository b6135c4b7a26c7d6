use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::SyncError;

/// Body of an `order:sync` job as it sits on the queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncOrderPayload {
    pub user_id: String,
    pub channel: String,
    pub shop_id: String,
    pub time_from: String,
    pub time_to: String,
}

/// Owner identifiers of a payload, parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatedPayload {
    pub user_id: Uuid,
    pub shop_id: Uuid,
}

impl SyncOrderPayload {
    pub fn from_value(value: &Value) -> Result<Self, SyncError> {
        Ok(Self::deserialize(value)?)
    }

    pub fn validate(&self) -> Result<ValidatedPayload, SyncError> {
        Ok(ValidatedPayload {
            user_id: parse_identifier("user_id", &self.user_id)?,
            shop_id: parse_identifier("shop_id", &self.shop_id)?,
        })
    }
}

fn parse_identifier(field: &'static str, value: &str) -> Result<Uuid, SyncError> {
    Uuid::parse_str(value.trim()).map_err(|source| SyncError::InvalidIdentifier {
        field,
        value: value.to_string(),
        source,
    })
}

use crate::spec::values::Field;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Struct that serializes to Vega spec for the lookup transform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupTransformSpec {
    pub from: String,

    pub key: Field,

    pub fields: Vec<Field>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<Field>>,

    #[serde(rename = "as", skip_serializing_if = "Option::is_none")]
    pub as_: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

use crate::spec::values::Field;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Struct that serializes to Vega spec for the fold transform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoldTransformSpec {
    pub fields: Vec<Field>,

    #[serde(rename = "as", skip_serializing_if = "Option::is_none")]
    pub as_: Option<Vec<String>>,

    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl FoldTransformSpec {
    pub fn as_(&self) -> Vec<String> {
        let as_ = self.as_.clone().unwrap_or_default();
        vec![
            as_.first().cloned().unwrap_or_else(|| "key".to_string()),
            as_.get(1).cloned().unwrap_or_else(|| "value".to_string()),
        ]
    }
}

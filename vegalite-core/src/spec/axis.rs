use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisSpec {
    pub scale: String,

    pub orient: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub grid: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticks: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub zindex: Option<i64>,

    /// Remaining properties, e.g. tickCount, labelAngle, encode
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}


use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegendSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub stroke: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub shape: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub opacity: Option<String>,

    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<Value>,

    /// Remaining properties, e.g. orient, format, encode
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LegendSpec {
    /// Names of the scales this legend is driven by
    pub fn scale_names(&self) -> Vec<&str> {
        [
            &self.fill,
            &self.stroke,
            &self.size,
            &self.shape,
            &self.opacity,
        ]
        .into_iter()
        .flatten()
        .map(|s| s.as_str())
        .collect()
    }
}

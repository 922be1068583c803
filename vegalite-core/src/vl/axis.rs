use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AxisDef {
    pub orient: Option<String>,

    #[serde(default, deserialize_with = "crate::vl::fielddef::double_option")]
    pub title: Option<Option<String>>,

    pub grid: Option<bool>,

    pub domain: Option<bool>,

    pub labels: Option<bool>,

    pub ticks: Option<bool>,

    pub format: Option<String>,

    pub label_angle: Option<f64>,

    pub tick_count: Option<f64>,

    pub zindex: Option<i64>,

    /// Remaining axis properties, passed through unchanged
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

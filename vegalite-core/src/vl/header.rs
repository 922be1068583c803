use serde::Deserialize;
use serde_json::{Map, Value};

/// Title and labels of a facet row or column
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderDef {
    #[serde(default, deserialize_with = "crate::vl::fielddef::double_option")]
    pub title: Option<Option<String>>,

    pub label_angle: Option<f64>,

    pub format: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

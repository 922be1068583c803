use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegendDef {
    pub orient: Option<String>,

    #[serde(default, deserialize_with = "crate::vl::fielddef::double_option")]
    pub title: Option<Option<String>>,

    pub format: Option<String>,

    #[serde(rename = "type")]
    pub type_: Option<String>,

    pub values: Option<Vec<Value>>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

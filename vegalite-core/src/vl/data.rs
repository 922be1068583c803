use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DataFormat {
    #[serde(rename = "type")]
    pub type_: Option<String>,

    /// Explicit parse types; `null` disables parsing of a field
    pub parse: Option<Map<String, Value>>,

    pub property: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Inline values, a url, or a named dataset supplied at runtime
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DataDef {
    pub url: Option<String>,
    pub values: Option<Value>,
    pub name: Option<String>,
    pub format: Option<DataFormat>,
}

impl DataDef {
    pub fn is_url(&self) -> bool {
        self.url.is_some()
    }

    /// Identity used to share one source between models reading the same data
    pub fn key(&self) -> String {
        if let Some(url) = &self.url {
            format!("url:{url}")
        } else if let Some(name) = &self.name {
            format!("name:{name}")
        } else {
            format!("values:{}", self.values.clone().unwrap_or(Value::Null))
        }
    }
}

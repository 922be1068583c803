use crate::spec::values::SignalExpressionSpec;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaleSpec {
    pub name: String,

    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<ScaleDomainSpec>,

    #[serde(rename = "domainRaw", skip_serializing_if = "Option::is_none")]
    pub domain_raw: Option<SignalExpressionSpec>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<ScaleRangeSpec>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub padding: Option<f64>,

    #[serde(rename = "paddingInner", skip_serializing_if = "Option::is_none")]
    pub padding_inner: Option<f64>,

    #[serde(rename = "paddingOuter", skip_serializing_if = "Option::is_none")]
    pub padding_outer: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub zero: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub nice: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub round: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reverse: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub clamp: Option<bool>,

    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl ScaleSpec {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            type_: None,
            domain: None,
            domain_raw: None,
            range: None,
            padding: None,
            padding_inner: None,
            padding_outer: None,
            zero: None,
            nice: None,
            round: None,
            reverse: None,
            clamp: None,
            extra: Default::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScaleDomainSpec {
    FieldReference(ScaleDataReferenceSpec),
    FieldsReference(ScaleDataReferencesSpec),
    FieldsReferences(ScaleFieldsReferencesSpec),
    Signal(SignalExpressionSpec),
    Array(Vec<Value>),
}

/// Union of several fields of one dataset: `{data, fields: [...]}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaleDataReferencesSpec {
    pub data: String,
    pub fields: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<ScaleDomainSortSpec>,
}

/// Union across datasets: `{fields: [{data, field}, [literal values], ...], sort}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaleFieldsReferencesSpec {
    pub fields: Vec<ScaleFieldsEntrySpec>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<ScaleDomainSortSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScaleFieldsEntrySpec {
    Reference(ScaleDataReferenceSpec),
    Array(Vec<Value>),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScaleDataReferenceSpec {
    pub data: String,
    pub field: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<ScaleDomainSortSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScaleDomainSortSpec {
    Bool(bool),
    Object(ScaleDomainSortObject),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScaleDomainSortObject {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub op: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScaleRangeSpec {
    Name(String),
    Step(ScaleRangeStepSpec),
    Scheme(ScaleRangeSchemeSpec),
    Signal(SignalExpressionSpec),
    Array(Vec<ScaleArrayElementSpec>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaleRangeStepSpec {
    pub step: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaleRangeSchemeSpec {
    pub scheme: Value,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub extent: Option<Vec<f64>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScaleArrayElementSpec {
    Signal(SignalExpressionSpec),
    Value(Value),
}

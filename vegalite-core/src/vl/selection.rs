use crate::vl::channel::Channel;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionType {
    Single,
    Multi,
    Interval,
}

impl fmt::Display for SelectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SelectionType::Single => "single",
            SelectionType::Multi => "multi",
            SelectionType::Interval => "interval",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionResolution {
    #[default]
    Global,
    Union,
    Intersect,
}

impl SelectionResolution {
    pub fn name(&self) -> &'static str {
        match self {
            SelectionResolution::Global => "global",
            SelectionResolution::Union => "union",
            SelectionResolution::Intersect => "intersect",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionEmpty {
    #[default]
    All,
    None,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum SelectionBindDef {
    /// `"scales"` or `"legend"`
    Keyword(String),
    /// Input element bindings, either one for all projections or one per field
    Input(Map<String, Value>),
}

/// Options shared by the selection definitions and their config defaults
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionOptions {
    pub on: Option<Value>,
    pub clear: Option<Value>,
    pub fields: Option<Vec<String>>,
    pub encodings: Option<Vec<Channel>>,
    pub resolve: Option<SelectionResolution>,
    pub empty: Option<SelectionEmpty>,
    pub bind: Option<SelectionBindDef>,
    pub init: Option<Value>,
    pub toggle: Option<Value>,
    pub nearest: Option<bool>,
    pub translate: Option<Value>,
    pub zoom: Option<Value>,
    pub mark: Option<Map<String, Value>>,
}

impl SelectionOptions {
    /// Fill unset options from `defaults`
    pub fn with_defaults(&self, defaults: &SelectionOptions) -> SelectionOptions {
        SelectionOptions {
            on: self.on.clone().or_else(|| defaults.on.clone()),
            clear: self.clear.clone().or_else(|| defaults.clear.clone()),
            fields: self.fields.clone().or_else(|| defaults.fields.clone()),
            encodings: self.encodings.clone().or_else(|| defaults.encodings.clone()),
            resolve: self.resolve.or(defaults.resolve),
            empty: self.empty.or(defaults.empty),
            bind: self.bind.clone().or_else(|| defaults.bind.clone()),
            init: self.init.clone().or_else(|| defaults.init.clone()),
            toggle: self.toggle.clone().or_else(|| defaults.toggle.clone()),
            nearest: self.nearest.or(defaults.nearest),
            translate: self.translate.clone().or_else(|| defaults.translate.clone()),
            zoom: self.zoom.clone().or_else(|| defaults.zoom.clone()),
            mark: match (&self.mark, &defaults.mark) {
                (Some(m), Some(d)) => {
                    let mut merged = d.clone();
                    merged.extend(m.clone());
                    Some(merged)
                }
                (m, d) => m.clone().or_else(|| d.clone()),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SelectionDef {
    #[serde(rename = "type")]
    pub type_: SelectionType,

    #[serde(flatten)]
    pub options: SelectionOptions,
}

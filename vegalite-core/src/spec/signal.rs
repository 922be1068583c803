use crate::spec::values::StringOrStringList;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalSpec {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub init: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub update: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub on: Vec<SignalOnSpec>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub bind: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub push: Option<String>,

    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl SignalSpec {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            init: None,
            update: None,
            value: None,
            on: Vec::new(),
            bind: None,
            push: None,
            extra: Default::default(),
        }
    }

    pub fn with_update<S: Into<String>>(mut self, update: S) -> Self {
        self.update = Some(update.into());
        self
    }

    pub fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_on(mut self, on: SignalOnSpec) -> Self {
        self.on.push(on);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalOnSpec {
    pub events: SignalOnEventSpecOrList,
    pub update: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub force: Option<bool>,

    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl SignalOnSpec {
    pub fn new<S: Into<String>>(events: SignalOnEventSpecOrList, update: S) -> Self {
        Self {
            events,
            update: update.into(),
            force: None,
            extra: Default::default(),
        }
    }

    pub fn forced(mut self) -> Self {
        self.force = Some(true);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SignalOnEventSpecOrList {
    List(Vec<SignalOnEventSpec>),
    Scalar(SignalOnEventSpec),
}

impl SignalOnEventSpecOrList {
    pub fn to_vec(&self) -> Vec<SignalOnEventSpec> {
        match self {
            SignalOnEventSpecOrList::List(event_specs) => event_specs.clone(),
            SignalOnEventSpecOrList::Scalar(event_spec) => vec![event_spec.clone()],
        }
    }
}

impl From<SignalOnEventSpec> for SignalOnEventSpecOrList {
    fn from(spec: SignalOnEventSpec) -> Self {
        SignalOnEventSpecOrList::Scalar(spec)
    }
}

impl From<Vec<SignalOnEventSpec>> for SignalOnEventSpecOrList {
    fn from(specs: Vec<SignalOnEventSpec>) -> Self {
        SignalOnEventSpecOrList::List(specs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SignalOnEventSpec {
    Signal(SignalOnSignalEvent),
    Scale(SignalOnScaleEvent),
    Source(SignalOnSourceEvent),
    Selector(String),
}

impl SignalOnEventSpec {
    pub fn signal<S: Into<String>>(name: S) -> Self {
        SignalOnEventSpec::Signal(SignalOnSignalEvent {
            signal: name.into(),
            extra: Default::default(),
        })
    }

    pub fn scale<S: Into<String>>(name: S) -> Self {
        SignalOnEventSpec::Scale(SignalOnScaleEvent {
            scale: name.into(),
            extra: Default::default(),
        })
    }

    pub fn source<S: Into<String>, T: Into<String>>(source: S, type_: T) -> Self {
        SignalOnEventSpec::Source(SignalOnSourceEvent {
            source: Some(source.into()),
            type_: Some(type_.into()),
            markname: None,
            filter: None,
            between: None,
            consume: None,
            extra: Default::default(),
        })
    }

    /// `[start, end] > move` style drag stream
    pub fn between(
        move_event: SignalOnEventSpec,
        start: SignalOnEventSpec,
        end: SignalOnEventSpec,
    ) -> Self {
        match move_event {
            SignalOnEventSpec::Source(mut source) => {
                source.between = Some(vec![start, end]);
                source.consume = Some(true);
                SignalOnEventSpec::Source(source)
            }
            other => other,
        }
    }

    pub fn with_markname<S: Into<String>>(self, markname: S) -> Self {
        match self {
            SignalOnEventSpec::Source(mut source) => {
                source.markname = Some(markname.into());
                SignalOnEventSpec::Source(source)
            }
            other => other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalOnSignalEvent {
    pub signal: String,

    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalOnScaleEvent {
    pub scale: String,

    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalOnSourceEvent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub markname: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<StringOrStringList>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub between: Option<Vec<SignalOnEventSpec>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub consume: Option<bool>,

    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

#[cfg(test)]
mod tests {
    use crate::spec::signal::{SignalOnEventSpec, SignalSpec};

    #[test]
    fn test_signal_null_value_not_dropped() {
        // No value is valid
        let s = r#"{"name":"foo"}"#;
        let sig: SignalSpec = serde_json::from_str(s).unwrap();
        let res = serde_json::to_string(&sig).unwrap();
        assert_eq!(res, s);
    }

    #[test]
    fn test_drag_event_serialization() {
        let drag = SignalOnEventSpec::between(
            SignalOnEventSpec::source("window", "mousemove"),
            SignalOnEventSpec::source("scope", "mousedown"),
            SignalOnEventSpec::source("window", "mouseup"),
        );
        let v = serde_json::to_value(&drag).unwrap();
        assert_eq!(v["type"], "mousemove");
        assert_eq!(v["consume"], true);
        assert_eq!(v["between"][0]["source"], "scope");
    }
}

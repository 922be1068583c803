use crate::error::{Result, VegaLiteError};
use crate::vl::data::DataDef;
use crate::vl::encoding::Encoding;
use crate::vl::fielddef::FieldDef;
use crate::vl::mark::AnyMark;
use crate::vl::resolve::ResolveDef;
use crate::vl::selection::SelectionDef;
use crate::vl::transform::TransformDef;
use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TitleDef {
    Text(String),
    Params {
        text: String,
        #[serde(flatten)]
        extra: Map<String, Value>,
    },
}

/// Properties accepted by every kind of view
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CommonSpec {
    pub name: Option<String>,
    pub title: Option<TitleDef>,
    pub description: Option<String>,
    pub data: Option<DataDef>,
    #[serde(default)]
    pub transform: Vec<TransformDef>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    #[serde(default)]
    pub resolve: ResolveDef,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UnitSpec {
    pub mark: AnyMark,

    #[serde(default)]
    pub encoding: Encoding,

    #[serde(default)]
    pub selection: BTreeMap<String, SelectionDef>,

    #[serde(flatten)]
    pub common: CommonSpec,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LayerSpec {
    pub layer: Vec<GenericSpec>,

    #[serde(flatten)]
    pub common: CommonSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FacetMapping {
    pub row: Option<FieldDef>,
    pub column: Option<FieldDef>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FacetSpec {
    pub facet: FacetMapping,

    pub spec: Box<GenericSpec>,

    #[serde(flatten)]
    pub common: CommonSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RepeatMapping {
    pub row: Option<Vec<String>>,
    pub column: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RepeatSpec {
    pub repeat: RepeatMapping,

    pub spec: Box<GenericSpec>,

    #[serde(flatten)]
    pub common: CommonSpec,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConcatDirection {
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConcatSpec {
    pub direction: ConcatDirection,
    pub concat: Vec<GenericSpec>,
    pub common: CommonSpec,
}

#[derive(Deserialize)]
struct HConcatSpec {
    hconcat: Vec<GenericSpec>,
    #[serde(flatten)]
    common: CommonSpec,
}

#[derive(Deserialize)]
struct VConcatSpec {
    vconcat: Vec<GenericSpec>,
    #[serde(flatten)]
    common: CommonSpec,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GenericSpec {
    Unit(UnitSpec),
    Layer(LayerSpec),
    Facet(FacetSpec),
    Repeat(RepeatSpec),
    Concat(ConcatSpec),
}

impl GenericSpec {
    pub fn common(&self) -> &CommonSpec {
        match self {
            GenericSpec::Unit(s) => &s.common,
            GenericSpec::Layer(s) => &s.common,
            GenericSpec::Facet(s) => &s.common,
            GenericSpec::Repeat(s) => &s.common,
            GenericSpec::Concat(s) => &s.common,
        }
    }

    pub fn common_mut(&mut self) -> &mut CommonSpec {
        match self {
            GenericSpec::Unit(s) => &mut s.common,
            GenericSpec::Layer(s) => &mut s.common,
            GenericSpec::Facet(s) => &mut s.common,
            GenericSpec::Repeat(s) => &mut s.common,
            GenericSpec::Concat(s) => &mut s.common,
        }
    }
}

impl<'de> Deserialize<'de> for GenericSpec {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        let Value::Object(obj) = &value else {
            return Err(de::Error::custom("Invalid spec: expected an object"));
        };
        let parse = |v: Value| -> std::result::Result<GenericSpec, D::Error> {
            if obj.contains_key("layer") {
                serde_json::from_value(v).map(GenericSpec::Layer)
            } else if obj.contains_key("facet") {
                serde_json::from_value(v).map(GenericSpec::Facet)
            } else if obj.contains_key("repeat") {
                serde_json::from_value(v).map(GenericSpec::Repeat)
            } else if obj.contains_key("hconcat") {
                serde_json::from_value::<HConcatSpec>(v).map(|s| {
                    GenericSpec::Concat(ConcatSpec {
                        direction: ConcatDirection::Horizontal,
                        concat: s.hconcat,
                        common: s.common,
                    })
                })
            } else if obj.contains_key("vconcat") {
                serde_json::from_value::<VConcatSpec>(v).map(|s| {
                    GenericSpec::Concat(ConcatSpec {
                        direction: ConcatDirection::Vertical,
                        concat: s.vconcat,
                        common: s.common,
                    })
                })
            } else if obj.contains_key("mark") {
                serde_json::from_value(v).map(GenericSpec::Unit)
            } else {
                let keys: Vec<&str> = obj.keys().map(|k| k.as_str()).collect();
                return Err(de::Error::custom(format!(
                    "Invalid spec with keys [{}]: expected one of mark, layer, facet, repeat, hconcat or vconcat",
                    keys.join(", ")
                )));
            }
            .map_err(de::Error::custom)
        };
        parse(value.clone())
    }
}

/// Root of the input: a view plus properties only valid at the top level
#[derive(Debug, Clone, PartialEq)]
pub struct TopLevelSpec {
    pub spec: GenericSpec,
    pub config: Option<Value>,
    pub padding: Option<Value>,
    pub autosize: Option<Value>,
    pub background: Option<String>,
}

impl TopLevelSpec {
    pub fn from_value(value: &Value) -> Result<Self> {
        let Value::Object(obj) = value else {
            return Err(VegaLiteError::specification(
                "Top-level spec must be a JSON object",
            ));
        };
        let spec: GenericSpec = serde_json::from_value(value.clone())
            .map_err(|err| VegaLiteError::specification(err.to_string()))?;
        let background = match obj.get("background") {
            Some(Value::String(s)) => Some(s.clone()),
            _ => None,
        };
        Ok(Self {
            spec,
            config: obj.get("config").cloned(),
            padding: obj.get("padding").cloned(),
            autosize: obj.get("autosize").cloned(),
            background,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_classify_specs() {
        let spec = TopLevelSpec::from_value(&json!({
            "hconcat": [
                {"mark": "point"},
                {"layer": [{"mark": "bar"}, {"mark": "rule"}]},
                {"facet": {"row": {"field": "a", "type": "nominal"}}, "spec": {"mark": "tick"}}
            ]
        }))
        .unwrap();
        let GenericSpec::Concat(concat) = spec.spec else {
            panic!("expected concat")
        };
        assert_eq!(concat.direction, ConcatDirection::Horizontal);
        assert!(matches!(concat.concat[0], GenericSpec::Unit(_)));
        assert!(matches!(concat.concat[1], GenericSpec::Layer(_)));
        assert!(matches!(concat.concat[2], GenericSpec::Facet(_)));
    }

    #[test]
    fn test_missing_view_key_is_specification_error() {
        let err = TopLevelSpec::from_value(&json!({"data": {"values": []}})).unwrap_err();
        assert!(matches!(err, VegaLiteError::SpecificationError(_, _)));
    }
}

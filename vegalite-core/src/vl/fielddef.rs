use crate::spec::transform::aggregate::AggregateOpSpec;
use crate::spec::transform::stack::StackOffsetSpec;
use crate::spec::values::SortOrderSpec;
use crate::vl::axis::AxisDef;
use crate::vl::channel::Channel;
use crate::vl::header::HeaderDef;
use crate::vl::legend::LegendDef;
use crate::vl::predicate::{LogicalOperand, Predicate};
use crate::vl::scale::ScaleDef;
use crate::vl::timeunit::TimeUnit;
use regex::Regex;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use vegalite_common::escape::datum_access;

lazy_static! {
    static ref NON_WORD_RE: Regex = Regex::new(r"[^A-Za-z0-9_]").unwrap();
}

/// Replace characters that are not valid in identifiers with `_`
pub fn var_name(s: &str) -> String {
    NON_WORD_RE.replace_all(s, "_").to_string()
}

/// Distinguish an absent property from an explicit `null`
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Quantitative,
    Ordinal,
    Temporal,
    Nominal,
}

impl FieldType {
    pub fn is_discrete(&self) -> bool {
        matches!(self, FieldType::Nominal | FieldType::Ordinal)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatChannel {
    Row,
    Column,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RepeatRef {
    pub repeat: RepeatChannel,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum FieldRef {
    Field(String),
    Repeat(RepeatRef),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BinParams {
    pub anchor: Option<f64>,
    pub base: Option<f64>,
    pub divide: Option<Vec<f64>>,
    pub extent: Option<[f64; 2]>,
    pub maxbins: Option<f64>,
    pub minstep: Option<f64>,
    pub nice: Option<bool>,
    pub step: Option<f64>,
    pub steps: Option<Vec<f64>>,
}

impl BinParams {
    /// Unique identifier of these parameters, used in bin field names
    pub fn key(&self) -> String {
        fn num(v: f64) -> String {
            if v.fract() == 0.0 && v.abs() < 1e15 {
                (v as i64).to_string()
            } else {
                v.to_string()
            }
        }
        fn list(v: &[f64]) -> String {
            v.iter().map(|v| num(*v)).collect::<Vec<_>>().join(",")
        }
        let mut key = String::from("bin");
        let mut push = |name: &str, value: Option<String>| {
            if let Some(value) = value {
                key.push_str(&var_name(&format!("_{name}_{value}")));
            }
        };
        push("anchor", self.anchor.map(num));
        push("base", self.base.map(num));
        push("divide", self.divide.as_deref().map(list));
        push("extent", self.extent.as_ref().map(|e| list(e)));
        push("maxbins", self.maxbins.map(num));
        push("minstep", self.minstep.map(num));
        push("nice", self.nice.map(|v| v.to_string()));
        push("step", self.step.map(num));
        push("steps", self.steps.as_deref().map(list));
        key
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum BinDef {
    Bool(bool),
    Params(BinParams),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum StackDef {
    Bool(bool),
    Offset(StackOffsetSpec),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SortField {
    pub field: Option<String>,
    pub op: Option<AggregateOpSpec>,
    pub order: Option<SortOrderSpec>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum SortDef {
    Order(SortOrderSpec),
    Field(SortField),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ConditionDef {
    pub selection: Option<LogicalOperand<String>>,

    pub test: Option<LogicalOperand<Predicate>>,

    #[serde(flatten)]
    pub def: Box<FieldDef>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ConditionList {
    Many(Vec<ConditionDef>),
    One(ConditionDef),
}

impl ConditionList {
    pub fn to_vec(&self) -> Vec<ConditionDef> {
        match self {
            ConditionList::Many(c) => c.clone(),
            ConditionList::One(c) => vec![c.clone()],
        }
    }
}

/// Options for [`FieldDef::vg_field`]
#[derive(Debug, Clone, Default)]
pub struct FieldRefOption<'a> {
    /// Skip the aggregate, bin or time unit prefix
    pub nofn: bool,
    /// Suffix appended only to binned fields
    pub bin_suffix: Option<&'a str>,
    pub suffix: Option<&'a str>,
    pub prefix: Option<&'a str>,
    /// Wrap the name as a `datum[...]` expression
    pub expr: bool,
}

/// Binding of a data field or constant value to a channel
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDef {
    pub field: Option<FieldRef>,

    #[serde(rename = "type")]
    pub type_: Option<FieldType>,

    pub aggregate: Option<AggregateOpSpec>,

    pub bin: Option<BinDef>,

    pub time_unit: Option<TimeUnit>,

    pub value: Option<Value>,

    #[serde(default, deserialize_with = "double_option")]
    pub scale: Option<Option<ScaleDef>>,

    #[serde(default, deserialize_with = "double_option")]
    pub axis: Option<Option<AxisDef>>,

    #[serde(default, deserialize_with = "double_option")]
    pub legend: Option<Option<LegendDef>>,

    pub header: Option<HeaderDef>,

    #[serde(default, deserialize_with = "double_option")]
    pub sort: Option<Option<SortDef>>,

    #[serde(default, deserialize_with = "double_option")]
    pub stack: Option<Option<StackDef>>,

    pub title: Option<String>,

    pub format: Option<String>,

    pub condition: Option<ConditionList>,
}

impl FieldDef {
    pub fn field_name(&self) -> Option<&str> {
        match &self.field {
            Some(FieldRef::Field(f)) => Some(f.as_str()),
            _ => None,
        }
    }

    pub fn is_count(&self) -> bool {
        self.aggregate == Some(AggregateOpSpec::Count)
    }

    /// Defines a field (or a count) rather than a constant value
    pub fn has_field(&self) -> bool {
        self.field.is_some() || self.is_count()
    }

    pub fn is_empty(&self) -> bool {
        !self.has_field() && self.value.is_none() && self.condition.is_none()
    }

    pub fn is_binned(&self) -> bool {
        matches!(self.bin, Some(BinDef::Params(_)) | Some(BinDef::Bool(true)))
    }

    pub fn bin_params(&self, channel: Channel) -> Option<BinParams> {
        match &self.bin {
            Some(BinDef::Bool(true)) => Some(BinParams {
                maxbins: Some(channel.default_maxbins() as f64),
                ..Default::default()
            }),
            Some(BinDef::Params(params)) => Some(params.clone()),
            _ => None,
        }
    }

    /// Field type, inferring quantitative for counts
    pub fn field_type(&self) -> Option<FieldType> {
        self.type_.or_else(|| {
            if self.is_count() {
                Some(FieldType::Quantitative)
            } else {
                None
            }
        })
    }

    pub fn is_discrete(&self) -> bool {
        self.field_type().map(|t| t.is_discrete()).unwrap_or(false)
    }

    pub fn is_continuous(&self) -> bool {
        !self.is_discrete()
    }

    pub fn is_temporal(&self) -> bool {
        self.field_type() == Some(FieldType::Temporal)
    }

    /// Aggregate op, unless the field is binned
    pub fn aggregate_op(&self) -> Option<AggregateOpSpec> {
        if self.is_binned() {
            None
        } else {
            self.aggregate
        }
    }

    /// Name of the field as produced by the data flow, e.g. `sum_b` or
    /// `bin_maxbins_10_b_end`
    pub fn vg_field(&self, channel: Channel, opt: &FieldRefOption) -> String {
        let mut suffix = opt.suffix.map(String::from);
        let field = if self.is_count() && !opt.nofn {
            "count_*".to_string()
        } else {
            let field = self.field_name().unwrap_or_default().to_string();
            let func = if opt.nofn {
                None
            } else if let Some(bin) = self.bin_params(channel) {
                if let Some(bin_suffix) = opt.bin_suffix {
                    suffix = Some(bin_suffix.to_string());
                }
                Some(bin.key())
            } else if let Some(op) = self.aggregate {
                Some(op.name().to_string())
            } else {
                self.time_unit.as_ref().map(|t| t.name())
            };
            match func {
                Some(func) => format!("{func}_{field}"),
                None => field,
            }
        };

        let mut field = field;
        if let Some(suffix) = suffix {
            field = format!("{field}_{suffix}");
        }
        if let Some(prefix) = opt.prefix {
            field = format!("{prefix}_{field}");
        }
        if opt.expr {
            datum_access(&field)
        } else {
            field
        }
    }

    /// Human readable default title, e.g. `SUM(b)`
    pub fn default_title(&self) -> String {
        if self.is_count() {
            return "Number of Records".to_string();
        }
        let field = self.field_name().unwrap_or_default();
        if self.is_binned() {
            format!("BIN({field})")
        } else if let Some(op) = self.aggregate {
            format!("{}({field})", op.name().to_uppercase())
        } else if let Some(unit) = &self.time_unit {
            format!("{}({field})", unit.name().to_uppercase())
        } else {
            field.to_string()
        }
    }

    pub fn title(&self) -> String {
        self.title.clone().unwrap_or_else(|| self.default_title())
    }

    /// Explicit scale definition; `None` when absent or disabled with `null`
    pub fn scale_def(&self) -> Option<&ScaleDef> {
        self.scale.as_ref().and_then(|s| s.as_ref())
    }

    pub fn scale_disabled(&self) -> bool {
        matches!(self.scale, Some(None))
    }

    pub fn axis_def(&self) -> Option<&AxisDef> {
        self.axis.as_ref().and_then(|a| a.as_ref())
    }

    pub fn legend_def(&self) -> Option<&LegendDef> {
        self.legend.as_ref().and_then(|l| l.as_ref())
    }

    pub fn conditions(&self) -> Vec<ConditionDef> {
        self.condition
            .as_ref()
            .map(|c| c.to_vec())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn field_def(v: Value) -> FieldDef {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn test_vg_field_names() {
        let sum = field_def(json!({"field": "b", "type": "quantitative", "aggregate": "sum"}));
        assert_eq!(sum.vg_field(Channel::Y, &Default::default()), "sum_b");

        let count = field_def(json!({"aggregate": "count", "type": "quantitative"}));
        assert_eq!(count.vg_field(Channel::Y, &Default::default()), "count_*");

        let bin = field_def(json!({"field": "b", "type": "quantitative", "bin": true}));
        assert_eq!(bin.vg_field(Channel::X, &Default::default()), "bin_maxbins_10_b");
        assert_eq!(
            bin.vg_field(
                Channel::X,
                &FieldRefOption {
                    bin_suffix: Some("range"),
                    ..Default::default()
                }
            ),
            "bin_maxbins_10_b_range"
        );
        assert_eq!(bin.vg_field(Channel::Color, &Default::default()), "bin_maxbins_6_b");

        let month = field_def(json!({"field": "date", "type": "temporal", "timeUnit": "month"}));
        assert_eq!(
            month.vg_field(
                Channel::X,
                &FieldRefOption {
                    expr: true,
                    ..Default::default()
                }
            ),
            r#"datum["month_date"]"#
        );
    }

    #[test]
    fn test_null_properties_are_distinct_from_absent() {
        let def = field_def(json!({"field": "a", "type": "nominal", "scale": null, "sort": null}));
        assert!(def.scale_disabled());
        assert_eq!(def.sort, Some(None));
        assert_eq!(def.axis, None);
    }

    #[test]
    fn test_bin_params_key() {
        let params = BinParams {
            extent: Some([0.0, 100.0]),
            step: Some(5.0),
            ..Default::default()
        };
        assert_eq!(params.key(), "bin_extent_0_100_step_5");
    }

    #[test]
    fn test_default_title() {
        let sum = field_def(json!({"field": "b", "type": "quantitative", "aggregate": "sum"}));
        assert_eq!(sum.title(), "SUM(b)");
        let count = field_def(json!({"aggregate": "count", "type": "quantitative"}));
        assert_eq!(count.title(), "Number of Records");
    }
}

use crate::spec::transform::aggregate::AggregateOpSpec;
use crate::spec::values::StringOrStringList;
use crate::vl::data::DataDef;
use crate::vl::fielddef::BinDef;
use crate::vl::predicate::{LogicalOperand, Predicate};
use crate::vl::timeunit::TimeUnit;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AggregatedFieldDef {
    pub op: AggregateOpSpec,
    pub field: Option<String>,
    #[serde(rename = "as")]
    pub as_: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LookupData {
    pub data: DataDef,
    pub key: String,
    pub fields: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TransformDef {
    Filter {
        filter: LogicalOperand<Predicate>,
    },
    Calculate {
        calculate: String,
        #[serde(rename = "as")]
        as_: String,
    },
    Bin {
        bin: BinDef,
        field: String,
        #[serde(rename = "as")]
        as_: String,
    },
    TimeUnit {
        #[serde(rename = "timeUnit")]
        time_unit: TimeUnit,
        field: String,
        #[serde(rename = "as")]
        as_: String,
    },
    Aggregate {
        aggregate: Vec<AggregatedFieldDef>,
        #[serde(default)]
        groupby: Vec<String>,
    },
    Lookup {
        lookup: String,
        from: LookupData,
        #[serde(rename = "as")]
        as_: Option<StringOrStringList>,
        default: Option<Value>,
    },
    Flatten {
        flatten: Vec<String>,
        #[serde(rename = "as")]
        as_: Option<Vec<String>>,
    },
    Fold {
        fold: Vec<String>,
        #[serde(rename = "as")]
        as_: Option<Vec<String>>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_transform_variants() {
        let transforms: Vec<TransformDef> = serde_json::from_value(json!([
            {"filter": "datum.a > 0"},
            {"calculate": "datum.a * 2", "as": "b"},
            {"bin": true, "field": "a", "as": "a_binned"},
            {"timeUnit": "month", "field": "t", "as": "m"},
            {"aggregate": [{"op": "sum", "field": "a", "as": "total"}], "groupby": ["c"]},
            {"fold": ["a", "b"]}
        ]))
        .unwrap();
        assert!(matches!(transforms[0], TransformDef::Filter { .. }));
        assert!(matches!(transforms[1], TransformDef::Calculate { .. }));
        assert!(matches!(transforms[2], TransformDef::Bin { .. }));
        assert!(matches!(transforms[3], TransformDef::TimeUnit { .. }));
        assert!(matches!(transforms[4], TransformDef::Aggregate { .. }));
        assert!(matches!(transforms[5], TransformDef::Fold { .. }));
    }
}

use crate::spec::values::Field;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateTransformSpec {
    pub groupby: Vec<Field>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<Option<Field>>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ops: Option<Vec<AggregateOpSpec>>,

    #[serde(rename = "as", skip_serializing_if = "Option::is_none")]
    pub as_: Option<Vec<Option<String>>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cross: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub drop: Option<bool>,

    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateOpSpec {
    Count,
    Valid,
    Missing,
    Distinct,
    Sum,
    Product,
    Mean,
    Average,
    Variance,
    Variancep,
    Stdev,
    Stdevp,
    Stderr,
    Median,
    Q1,
    Q3,
    Ci0,
    Ci1,
    Min,
    Max,
    Argmin,
    Argmax,
    Values,
}

impl AggregateOpSpec {
    pub fn name(&self) -> &'static str {
        use AggregateOpSpec::*;
        match self {
            Count => "count",
            Valid => "valid",
            Missing => "missing",
            Distinct => "distinct",
            Sum => "sum",
            Product => "product",
            Mean => "mean",
            Average => "average",
            Variance => "variance",
            Variancep => "variancep",
            Stdev => "stdev",
            Stdevp => "stdevp",
            Stderr => "stderr",
            Median => "median",
            Q1 => "q1",
            Q3 => "q3",
            Ci0 => "ci0",
            Ci1 => "ci1",
            Min => "min",
            Max => "max",
            Argmin => "argmin",
            Argmax => "argmax",
            Values => "values",
        }
    }

    /// Ops whose results may be stacked, as they add up across groups
    pub fn is_summative(&self) -> bool {
        use AggregateOpSpec::*;
        matches!(self, Count | Sum | Distinct | Valid | Missing)
    }

    /// Ops whose output lies within the range of the raw field, so the raw min/max may
    /// stand in for the aggregated domain
    pub fn shares_domain(&self) -> bool {
        use AggregateOpSpec::*;
        matches!(self, Mean | Average | Median | Q1 | Q3 | Min | Max)
    }
}

impl fmt::Display for AggregateOpSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_op_names_match_serde() {
        for op in [
            AggregateOpSpec::Count,
            AggregateOpSpec::Q1,
            AggregateOpSpec::Variancep,
        ] {
            let v = serde_json::to_value(op).unwrap();
            assert_eq!(v.as_str().unwrap(), op.name());
        }
    }

    #[test]
    fn test_summative_ops() {
        assert!(AggregateOpSpec::Sum.is_summative());
        assert!(AggregateOpSpec::Count.is_summative());
        assert!(!AggregateOpSpec::Mean.is_summative());
        assert!(AggregateOpSpec::Mean.shares_domain());
        assert!(!AggregateOpSpec::Sum.shares_domain());
    }
}

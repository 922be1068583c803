use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScaleType {
    Linear,
    Log,
    Pow,
    Sqrt,
    Time,
    Utc,
    Sequential,
    Ordinal,
    Point,
    Band,
    BinLinear,
    BinOrdinal,
}

/// Groups of scale types that can be merged into one scale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScaleCategory {
    Numeric,
    Time,
    Ordinal,
    BinOrdinal,
    BinLinear,
    OrdinalPosition,
}

impl ScaleType {
    pub fn name(&self) -> &'static str {
        use ScaleType::*;
        match self {
            Linear => "linear",
            Log => "log",
            Pow => "pow",
            Sqrt => "sqrt",
            Time => "time",
            Utc => "utc",
            Sequential => "sequential",
            Ordinal => "ordinal",
            Point => "point",
            Band => "band",
            BinLinear => "bin-linear",
            BinOrdinal => "bin-ordinal",
        }
    }

    /// Type name understood by the rendering runtime
    pub fn vega_name(&self) -> &'static str {
        match self {
            ScaleType::Sequential | ScaleType::BinLinear => "linear",
            t => t.name(),
        }
    }

    pub fn category(&self) -> ScaleCategory {
        use ScaleType::*;
        match self {
            Linear | Log | Pow | Sqrt | Sequential => ScaleCategory::Numeric,
            Time | Utc => ScaleCategory::Time,
            Ordinal => ScaleCategory::Ordinal,
            BinOrdinal => ScaleCategory::BinOrdinal,
            BinLinear => ScaleCategory::BinLinear,
            Point | Band => ScaleCategory::OrdinalPosition,
        }
    }

    /// Tie-break order when merging compatible types; the higher value wins
    pub fn precedence(&self) -> u8 {
        use ScaleType::*;
        match self {
            Point => 10,
            Band => 11,
            Log | Pow | Sqrt => 1,
            _ => 0,
        }
    }

    pub fn is_compatible(&self, other: ScaleType) -> bool {
        let (c1, c2) = (self.category(), other.category());
        c1 == c2
            || (c1 == ScaleCategory::OrdinalPosition && c2 == ScaleCategory::Time)
            || (c2 == ScaleCategory::OrdinalPosition && c1 == ScaleCategory::Time)
    }

    pub fn has_discrete_domain(&self) -> bool {
        matches!(
            self,
            ScaleType::Ordinal | ScaleType::Point | ScaleType::Band | ScaleType::BinOrdinal
        )
    }

    pub fn is_discrete(&self) -> bool {
        matches!(self, ScaleType::Ordinal | ScaleType::Point | ScaleType::Band)
    }

    pub fn is_continuous(&self) -> bool {
        !self.has_discrete_domain()
    }

    pub fn is_bin(&self) -> bool {
        matches!(self, ScaleType::BinLinear | ScaleType::BinOrdinal)
    }

    pub fn is_time(&self) -> bool {
        matches!(self, ScaleType::Time | ScaleType::Utc)
    }

    pub fn supports_zero(&self) -> bool {
        matches!(
            self,
            ScaleType::Linear | ScaleType::Pow | ScaleType::Sqrt | ScaleType::Sequential
        )
    }
}

impl fmt::Display for ScaleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Domain bound to the extent of an interval selection
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SelectionDomain {
    pub selection: String,
    pub field: Option<String>,
    pub encoding: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum DomainDef {
    Array(Vec<Value>),
    Selection(SelectionDomain),
    Keyword(String),
}

impl DomainDef {
    pub fn is_unaggregated(&self) -> bool {
        matches!(self, DomainDef::Keyword(k) if k == "unaggregated")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaleDef {
    #[serde(rename = "type")]
    pub type_: Option<ScaleType>,

    pub domain: Option<DomainDef>,

    pub range: Option<Value>,

    #[serde(default, deserialize_with = "crate::vl::fielddef::double_option")]
    pub range_step: Option<Option<f64>>,

    pub scheme: Option<Value>,

    pub padding: Option<f64>,

    pub padding_inner: Option<f64>,

    pub padding_outer: Option<f64>,

    pub zero: Option<bool>,

    pub nice: Option<Value>,

    pub round: Option<bool>,

    pub reverse: Option<bool>,

    pub clamp: Option<bool>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest(
        a,
        b,
        compatible,
        case(ScaleType::Linear, ScaleType::Log, true),
        case(ScaleType::Point, ScaleType::Band, true),
        case(ScaleType::Band, ScaleType::Time, true),
        case(ScaleType::Ordinal, ScaleType::Point, false),
        case(ScaleType::Linear, ScaleType::Time, false),
        case(ScaleType::BinLinear, ScaleType::BinOrdinal, false)
    )]
    fn test_compatibility(a: ScaleType, b: ScaleType, compatible: bool) {
        assert_eq!(a.is_compatible(b), compatible);
        assert_eq!(b.is_compatible(a), compatible);
    }

    #[test]
    fn test_precedence() {
        assert!(ScaleType::Band.precedence() > ScaleType::Point.precedence());
        assert!(ScaleType::Log.precedence() > ScaleType::Linear.precedence());
    }

    #[test]
    fn test_deserialize_kebab_case() {
        let t: ScaleType = serde_json::from_str("\"bin-ordinal\"").unwrap();
        assert_eq!(t, ScaleType::BinOrdinal);
    }
}

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkType {
    Area,
    Bar,
    Line,
    Point,
    Circle,
    Square,
    Text,
    Tick,
    Rect,
    Rule,
    Arc,
}

impl MarkType {
    pub fn name(&self) -> &'static str {
        use MarkType::*;
        match self {
            Area => "area",
            Bar => "bar",
            Line => "line",
            Point => "point",
            Circle => "circle",
            Square => "square",
            Text => "text",
            Tick => "tick",
            Rect => "rect",
            Rule => "rule",
            Arc => "arc",
        }
    }

    /// Mark type of the emitted scenegraph entry
    pub fn vega_type(&self) -> &'static str {
        use MarkType::*;
        match self {
            Area => "area",
            Bar | Tick | Rect => "rect",
            Line => "line",
            Point | Circle | Square => "symbol",
            Text => "text",
            Rule => "rule",
            Arc => "arc",
        }
    }

    /// Marks drawn as a single path over many data points
    pub fn is_path(&self) -> bool {
        matches!(self, MarkType::Line | MarkType::Area)
    }

    /// Marks that stack by default when the encoding qualifies
    pub fn stacks_by_default(&self) -> bool {
        matches!(self, MarkType::Bar | MarkType::Area | MarkType::Arc)
    }

    pub fn is_stackable(&self) -> bool {
        use MarkType::*;
        matches!(
            self,
            Bar | Area | Arc | Point | Circle | Square | Line | Rule | Text | Tick
        )
    }

    /// Marks whose discrete position scale defaults to band rather than point
    pub fn prefers_band(&self) -> bool {
        matches!(self, MarkType::Bar | MarkType::Rect | MarkType::Rule)
    }

    pub fn is_filled_by_default(&self) -> bool {
        !matches!(
            self,
            MarkType::Point | MarkType::Line | MarkType::Rule
        )
    }
}

impl fmt::Display for MarkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orient {
    Horizontal,
    Vertical,
}

impl fmt::Display for Orient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Orient::Horizontal => f.write_str("horizontal"),
            Orient::Vertical => f.write_str("vertical"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum AnyMark {
    Type(MarkType),
    Def(MarkDef),
}

impl AnyMark {
    pub fn to_def(&self) -> MarkDef {
        match self {
            AnyMark::Type(type_) => MarkDef::new(*type_),
            AnyMark::Def(def) => def.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkDef {
    #[serde(rename = "type")]
    pub type_: MarkType,

    #[serde(default)]
    pub orient: Option<Orient>,

    #[serde(default)]
    pub filled: Option<bool>,

    #[serde(default)]
    pub opacity: Option<f64>,

    #[serde(default)]
    pub color: Option<String>,

    #[serde(default)]
    pub fill: Option<String>,

    #[serde(default)]
    pub stroke: Option<String>,

    #[serde(default)]
    pub size: Option<f64>,

    #[serde(default)]
    pub interpolate: Option<String>,

    #[serde(default)]
    pub tension: Option<f64>,

    #[serde(default)]
    pub style: Option<Value>,

    #[serde(default)]
    pub clip: Option<bool>,

    #[serde(default)]
    pub inner_radius: Option<f64>,

    #[serde(default)]
    pub thickness: Option<f64>,

    /// Remaining visual properties, emitted as constant encodings
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MarkDef {
    pub fn new(type_: MarkType) -> Self {
        Self {
            type_,
            orient: None,
            filled: None,
            opacity: None,
            color: None,
            fill: None,
            stroke: None,
            size: None,
            interpolate: None,
            tension: None,
            style: None,
            clip: None,
            inner_radius: None,
            thickness: None,
            extra: Default::default(),
        }
    }
}

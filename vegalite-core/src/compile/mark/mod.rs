//! Mark encoding of units: one encoder per mark type, plus shared mixins
pub mod arc;
pub mod line;
pub mod mixins;
pub mod point;
pub mod rect;
pub mod rule;
pub mod valueref;

use crate::compile::context::CompileContext;
use crate::compile::log::{message, Diagnostics};
use crate::compile::mark::valueref::group_size;
use crate::compile::model::unit::UnitModel;
use crate::compile::stack::StackProperties;
use crate::error::Result;
use crate::spec::mark::{
    MarkEncodeSpec, MarkEncodingOrList, MarkEncodingsSpec, MarkFacetSpec, MarkFromSpec, MarkSort,
    MarkSpec,
};
use crate::spec::values::{SortOrderOrList, SortOrderSpec, StringOrStringList};
use crate::vl::channel::{Channel, STACK_BY_CHANNELS};
use crate::vl::encoding::Encoding;
use crate::vl::fielddef::{FieldDef, FieldRefOption, SortDef};
use crate::vl::mark::{MarkType, Orient};
use serde_json::Value;
use std::collections::BTreeMap;

/// Properties of the `update` encoding block, keyed by mark property
pub type Channels = BTreeMap<String, MarkEncodingOrList>;

pub fn orient(unit: &UnitModel) -> Orient {
    unit.mark_def.orient.unwrap_or(Orient::Vertical)
}

/// Whether `def` orders a position as a measure would: a typed, unbinned,
/// non-discrete field
fn is_measure_like(def: Option<&FieldDef>) -> bool {
    def.map(|d| d.field_type().is_some() && !d.is_discrete() && !d.is_binned())
        .unwrap_or(false)
}

/// Orientation of bars, ticks, areas and lines, derived from which position
/// channels are ranged, stacked or continuous. Other marks keep `specified`.
pub fn infer_orient(
    mark: MarkType,
    specified: Option<Orient>,
    encoding: &Encoding,
    stack: Option<&StackProperties>,
    diagnostics: &mut Diagnostics,
) -> Option<Orient> {
    if !matches!(
        mark,
        MarkType::Bar | MarkType::Tick | MarkType::Area | MarkType::Line | MarkType::Rule
    ) {
        return specified;
    }

    let has_x2 = encoding.has(Channel::X2);
    let has_y2 = encoding.has(Channel::Y2);
    let ranged = match (has_x2, has_y2) {
        (true, false) => Some(Orient::Horizontal),
        (false, true) => Some(Orient::Vertical),
        _ => None,
    };
    if let Some(actual) = ranged {
        if let Some(original) = specified.filter(|o| *o != actual) {
            diagnostics.warn(message::orient_overridden(original, actual));
        }
        return Some(actual);
    }
    if mark == MarkType::Rule {
        return specified;
    }
    if let Some(stack) = stack {
        return Some(match stack.field_channel {
            Channel::X => Orient::Horizontal,
            _ => Orient::Vertical,
        });
    }
    if specified.is_some() {
        return specified;
    }

    let x = encoding.field_def(Channel::X);
    let y = encoding.field_def(Channel::Y);
    // A tick is drawn across its measure, so it runs opposite to a bar
    let (along_y, along_x) = if mark == MarkType::Tick {
        (Orient::Horizontal, Orient::Vertical)
    } else {
        (Orient::Vertical, Orient::Horizontal)
    };
    let orient = match (is_measure_like(x), is_measure_like(y)) {
        (false, true) => along_y,
        (true, false) => along_x,
        (true, true) => {
            let x_aggregated = x.and_then(|d| d.aggregate_op()).is_some();
            let y_aggregated = y.and_then(|d| d.aggregate_op()).is_some();
            match (x_aggregated, y_aggregated) {
                (true, false) => along_x,
                (false, true) => along_y,
                _ if matches!(mark, MarkType::Line | MarkType::Area) => {
                    if y.map(|d| d.is_temporal()).unwrap_or(false)
                        && !x.map(|d| d.is_temporal()).unwrap_or(false)
                    {
                        Orient::Horizontal
                    } else {
                        Orient::Vertical
                    }
                }
                _ => {
                    diagnostics.warn(message::unclear_orient_continuous(mark));
                    Orient::Vertical
                }
            }
        }
        (false, false) => {
            if x.is_some() && y.is_some() {
                diagnostics.warn(message::unclear_orient_discrete_or_empty(mark));
            }
            Orient::Vertical
        }
    };
    Some(orient)
}

fn style(unit: &UnitModel) -> StringOrStringList {
    match &unit.mark_def.style {
        Some(Value::String(style)) => StringOrStringList::String(style.clone()),
        Some(Value::Array(styles)) => StringOrStringList::StringList(
            styles
                .iter()
                .filter_map(|s| s.as_str().map(String::from))
                .collect(),
        ),
        _ => StringOrStringList::String(unit.mark.name().to_string()),
    }
}

/// Sort of the points along a line or area: the order channel, or the dimension
fn path_sort(unit: &UnitModel) -> Option<MarkSort> {
    let expr = FieldRefOption {
        expr: true,
        ..Default::default()
    };
    if let Some(order) = unit.encoding.field_def(Channel::Order) {
        let descending = matches!(
            order.sort,
            Some(Some(SortDef::Order(SortOrderSpec::Descending)))
        );
        return Some(MarkSort {
            field: StringOrStringList::String(order.vg_field(Channel::Order, &expr)),
            order: descending.then_some(SortOrderOrList::SortOrder(SortOrderSpec::Descending)),
        });
    }
    let dimension = match orient(unit) {
        Orient::Vertical => Channel::X,
        Orient::Horizontal => Channel::Y,
    };
    let def = unit.encoding.field_def(dimension)?;
    Some(MarkSort {
        field: StringOrStringList::String(def.vg_field(dimension, &expr)),
        order: None,
    })
}

/// Marks of a unit with their encodings; `from` is filled in at assembly
pub fn parse_marks(unit: &UnitModel, ctx: &mut CompileContext) -> Result<Vec<MarkSpec>> {
    let mut channels = match unit.mark {
        MarkType::Bar | MarkType::Rect | MarkType::Tick => rect::encode(unit, ctx)?,
        MarkType::Point | MarkType::Circle | MarkType::Square => point::encode(unit, ctx)?,
        MarkType::Text => point::encode_text(unit, ctx)?,
        MarkType::Line | MarkType::Area => line::encode(unit, ctx)?,
        MarkType::Rule => rule::encode(unit, ctx)?,
        MarkType::Arc => arc::encode(unit, ctx)?,
    };
    mixins::tooltip(unit, ctx, &mut channels)?;
    mixins::href(unit, ctx, &mut channels)?;
    mixins::mark_properties(unit, ctx, &mut channels);

    let mut mark = MarkSpec::new(unit.mark.vega_type());
    mark.name = Some(unit.base.get_name("marks"));
    mark.style = Some(style(unit));
    mark.clip = unit.mark_def.clip;
    if unit.mark == MarkType::Line {
        mark.sort = path_sort(unit);
    }
    mark.encode = Some(MarkEncodeSpec {
        encodings: BTreeMap::from([("update".to_string(), MarkEncodingsSpec { channels })]),
    });
    Ok(vec![mark])
}

/// Fields splitting a line or area into one path per series
pub fn path_groupby(unit: &UnitModel) -> Vec<String> {
    if !unit.mark.is_path() {
        return Vec::new();
    }
    let opt = FieldRefOption::default();
    let mut fields: Vec<String> = Vec::new();
    for channel in STACK_BY_CHANNELS {
        for def in unit.encoding.field_defs(channel) {
            if def.has_field() && def.aggregate_op().is_none() {
                let field = def.vg_field(channel, &opt);
                if !fields.contains(&field) {
                    fields.push(field);
                }
            }
        }
    }
    fields
}

/// Marks of a unit reading the dataset `data`. Series of path marks are faceted
/// into a group with one path each.
pub fn assemble_marks(unit: &UnitModel, data: &str) -> Vec<MarkSpec> {
    let groupby = path_groupby(unit);
    let mut marks = unit.marks.clone();
    if groupby.is_empty() {
        for mark in &mut marks {
            mark.from = Some(MarkFromSpec::data(data));
        }
        return marks;
    }

    let facet_name = format!("faceted_path_{}", unit.base.get_name("main"));
    for mark in &mut marks {
        mark.from = Some(MarkFromSpec::data(&facet_name));
    }
    let mut group = MarkSpec::new("group");
    group.name = Some(unit.base.get_name("pathgroup"));
    group.from = Some(MarkFromSpec {
        data: None,
        facet: Some(MarkFacetSpec {
            name: facet_name,
            data: data.to_string(),
            groupby,
        }),
    });
    let update = group.update_channels_mut();
    update.insert("width".to_string(), group_size("width").into());
    update.insert("height".to_string(), group_size("height").into());
    group.marks = marks;
    vec![group]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn infer(mark: MarkType, specified: Option<Orient>, encoding: serde_json::Value) -> (Option<Orient>, Vec<String>) {
        let encoding: Encoding = serde_json::from_value(encoding).unwrap();
        let mut diagnostics = Diagnostics::new();
        let orient = infer_orient(mark, specified, &encoding, None, &mut diagnostics);
        let warnings = diagnostics.warnings().into_iter().map(String::from).collect();
        (orient, warnings)
    }

    #[test]
    fn test_measure_channel_decides_orient() {
        let (orient, warnings) = infer(
            MarkType::Bar,
            None,
            json!({
                "x": {"field": "b", "type": "quantitative", "aggregate": "sum"},
                "y": {"field": "a", "type": "nominal"}
            }),
        );
        assert_eq!(orient, Some(Orient::Horizontal));
        assert!(warnings.is_empty());

        let (orient, _) = infer(
            MarkType::Bar,
            None,
            json!({
                "x": {"field": "a", "type": "quantitative", "bin": true},
                "y": {"aggregate": "count", "type": "quantitative"}
            }),
        );
        assert_eq!(orient, Some(Orient::Vertical));
    }

    #[test]
    fn test_tick_runs_across_its_measure() {
        let (orient, _) = infer(
            MarkType::Tick,
            None,
            json!({"x": {"field": "a", "type": "quantitative"}}),
        );
        assert_eq!(orient, Some(Orient::Vertical));
    }

    #[test]
    fn test_ambiguous_orient_warns() {
        let (orient, warnings) = infer(
            MarkType::Tick,
            None,
            json!({
                "x": {"field": "a", "type": "quantitative"},
                "y": {"field": "b", "type": "quantitative"}
            }),
        );
        assert_eq!(orient, Some(Orient::Vertical));
        assert_eq!(warnings, vec![message::unclear_orient_continuous(MarkType::Tick)]);

        let (_, warnings) = infer(
            MarkType::Line,
            None,
            json!({
                "x": {"field": "a", "type": "quantitative"},
                "y": {"field": "b", "type": "quantitative"}
            }),
        );
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_range_overrides_specified_orient() {
        let (orient, warnings) = infer(
            MarkType::Bar,
            Some(Orient::Vertical),
            json!({
                "x": {"field": "start", "type": "quantitative"},
                "x2": {"field": "end"},
                "y": {"field": "task", "type": "nominal"}
            }),
        );
        assert_eq!(orient, Some(Orient::Horizontal));
        assert_eq!(
            warnings,
            vec![message::orient_overridden(Orient::Vertical, Orient::Horizontal)]
        );
    }

    #[test]
    fn test_point_keeps_specified_orient() {
        let (orient, warnings) = infer(MarkType::Point, None, json!({}));
        assert_eq!(orient, None);
        assert!(warnings.is_empty());
    }
}

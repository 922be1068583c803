use crate::compile::log::{message, Diagnostics};
use crate::compile::model::unit::UnitModel;
use crate::compile::names::NameMap;
use crate::compile::scale::RangeDef;
use crate::compile::split::Explicit;
use crate::spec::scale::{
    ScaleArrayElementSpec, ScaleRangeSchemeSpec, ScaleRangeSpec, ScaleRangeStepSpec,
};
use crate::spec::values::SignalExpressionSpec;
use crate::vl::channel::Channel;
use crate::vl::config::Config;
use crate::vl::fielddef::{FieldDef, FieldType};
use crate::vl::mark::MarkType;
use crate::vl::scale::ScaleType;
use serde_json::{json, Value};

/// Ratio of the symbol size to the range step, keeping neighbouring points apart
const MAX_SIZE_RANGE_STEP_RATIO: f64 = 0.95;
const MIN_FONT_SIZE: f64 = 8.0;
const MAX_FONT_SIZE: f64 = 40.0;
const MIN_STROKE_WIDTH: f64 = 1.0;
const MAX_STROKE_WIDTH: f64 = 4.0;

/// Step of a discrete position scale, or `None` when the range fills the view size
pub fn range_step(
    unit: &UnitModel,
    channel: Channel,
    config: &Config,
    diagnostics: &mut Diagnostics,
) -> Option<f64> {
    let def = unit.encoding.field_def(channel)?;
    let explicit = def.scale_def().and_then(|s| s.range_step);
    if unit.has_fixed_size(channel) {
        if let Some(Some(_)) = explicit {
            diagnostics.warn(message::range_step_dropped(channel));
        }
        return None;
    }
    match explicit {
        Some(step) => step,
        None if channel == Channel::X && unit.mark == MarkType::Text => {
            Some(config.scale.text_x_range_step)
        }
        None => config.scale.range_step,
    }
}

fn explicit_range(def: &FieldDef, diagnostics: &mut Diagnostics) -> Option<ScaleRangeSpec> {
    let scale = def.scale_def()?;
    if let Some(range) = &scale.range {
        match serde_json::from_value::<ScaleRangeSpec>(range.clone()) {
            Ok(spec) => return Some(spec),
            Err(err) => diagnostics.warn(format!("Ignoring invalid scale range: {err}")),
        }
    }
    match &scale.scheme {
        Some(Value::Object(params)) => Some(ScaleRangeSpec::Scheme(ScaleRangeSchemeSpec {
            scheme: params.get("name").cloned().unwrap_or(Value::Null),
            extent: params
                .get("extent")
                .and_then(|e| serde_json::from_value(e.clone()).ok()),
            count: params.get("count").cloned(),
        })),
        Some(scheme) => Some(ScaleRangeSpec::Scheme(ScaleRangeSchemeSpec {
            scheme: scheme.clone(),
            extent: None,
            count: None,
        })),
        None => None,
    }
}

/// Smallest step of the discrete x and y scales of the unit
fn min_xy_step(unit: &UnitModel, config: &Config) -> f64 {
    let steps: Vec<f64> = [Channel::X, Channel::Y]
        .into_iter()
        .filter(|c| {
            unit.scale_types
                .get(c)
                .map(|t| t.is_discrete())
                .unwrap_or(false)
        })
        .filter_map(|c| {
            unit.encoding
                .field_def(c)
                .and_then(|d| d.scale_def())
                .and_then(|s| s.range_step)
                .unwrap_or(config.scale.range_step)
        })
        .collect();
    steps
        .into_iter()
        .reduce(f64::min)
        .or(config.scale.range_step)
        .unwrap_or(21.0)
}

pub fn size_range(unit: &UnitModel, config: &Config) -> (f64, f64) {
    match unit.mark {
        MarkType::Bar | MarkType::Tick => {
            let max = config
                .scale
                .max_bar_size
                .unwrap_or_else(|| min_xy_step(unit, config) - 1.0);
            (config.scale.min_band_size, max)
        }
        MarkType::Text => (MIN_FONT_SIZE, MAX_FONT_SIZE),
        MarkType::Rule | MarkType::Line => (MIN_STROKE_WIDTH, MAX_STROKE_WIDTH),
        _ => {
            let max = config.scale.max_size.unwrap_or_else(|| {
                (MAX_SIZE_RANGE_STEP_RATIO * min_xy_step(unit, config)).powi(2)
            });
            (config.scale.min_size, max)
        }
    }
}

fn values(values: &[f64]) -> ScaleRangeSpec {
    ScaleRangeSpec::Array(
        values
            .iter()
            .map(|v| ScaleArrayElementSpec::Value(json!(v)))
            .collect(),
    )
}

/// Range of the scale of `channel`; `None` leaves the renderer default
pub fn parse_range(
    unit: &UnitModel,
    channel: Channel,
    scale_type: ScaleType,
    config: &Config,
    diagnostics: &mut Diagnostics,
) -> Option<Explicit<RangeDef>> {
    let def = unit.encoding.field_def(channel)?;
    if let Some(spec) = explicit_range(def, diagnostics) {
        return Some(Explicit::explicit(RangeDef::Spec(spec)));
    }

    let range = match channel {
        Channel::X | Channel::Y => {
            let step = if scale_type.is_discrete() {
                range_step(unit, channel, config, diagnostics)
            } else {
                None
            };
            match (step, channel) {
                (Some(step), _) => RangeDef::Step(step),
                (None, Channel::X) => RangeDef::Width(unit.base.get_name("width")),
                (None, _) => RangeDef::Height(unit.base.get_name("height")),
            }
        }
        Channel::Theta => RangeDef::Spec(ScaleRangeSpec::Array(vec![
            ScaleArrayElementSpec::Value(json!(0)),
            ScaleArrayElementSpec::Signal(SignalExpressionSpec::new("2 * PI")),
        ])),
        Channel::Radius => RangeDef::Radius {
            width: unit.base.get_name("width"),
            height: unit.base.get_name("height"),
        },
        Channel::Size => {
            let (min, max) = size_range(unit, config);
            RangeDef::Spec(values(&[min, max]))
        }
        Channel::Opacity => RangeDef::Spec(values(&[
            config.scale.min_opacity,
            config.scale.max_opacity,
        ])),
        Channel::Shape => RangeDef::Spec(ScaleRangeSpec::Name("symbol".to_string())),
        Channel::Color | Channel::Fill | Channel::Stroke => {
            let name = if scale_type == ScaleType::Ordinal {
                if def.field_type() == Some(FieldType::Nominal) {
                    "category"
                } else {
                    "ordinal"
                }
            } else if scale_type == ScaleType::BinOrdinal {
                "ordinal"
            } else if unit.mark == MarkType::Rect {
                "heatmap"
            } else {
                "ramp"
            };
            RangeDef::Spec(ScaleRangeSpec::Name(name.to_string()))
        }
        _ => return None,
    };
    Some(Explicit::implicit(range))
}

/// Range with size signal names resolved through renames
pub fn resolve_range(range: &RangeDef, size_names: &NameMap) -> RangeDef {
    match range {
        RangeDef::Width(name) => RangeDef::Width(size_names.get(name)),
        RangeDef::Height(name) => RangeDef::Height(size_names.get(name)),
        RangeDef::Radius { width, height } => RangeDef::Radius {
            width: size_names.get(width),
            height: size_names.get(height),
        },
        other => other.clone(),
    }
}

pub fn assemble_range(range: &RangeDef, size_names: &NameMap) -> ScaleRangeSpec {
    let signal = |s: String| ScaleArrayElementSpec::Signal(SignalExpressionSpec::new(s));
    match resolve_range(range, size_names) {
        RangeDef::Width(width) => {
            ScaleRangeSpec::Array(vec![ScaleArrayElementSpec::Value(json!(0)), signal(width)])
        }
        RangeDef::Height(height) => {
            ScaleRangeSpec::Array(vec![signal(height), ScaleArrayElementSpec::Value(json!(0))])
        }
        RangeDef::Step(step) => ScaleRangeSpec::Step(ScaleRangeStepSpec {
            step: json!(step),
        }),
        RangeDef::Radius { width, height } => ScaleRangeSpec::Array(vec![
            ScaleArrayElementSpec::Value(json!(0)),
            signal(format!("min({width}, {height}) / 2")),
        ]),
        RangeDef::Spec(spec) => spec,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assemble_position_ranges() {
        let mut names = NameMap::new();
        names.rename("layer_0_width", "width");
        let range = assemble_range(&RangeDef::Width("layer_0_width".to_string()), &names);
        assert_eq!(serde_json::to_value(range).unwrap(), json!([0, {"signal": "width"}]));

        let range = assemble_range(&RangeDef::Height("height".to_string()), &names);
        assert_eq!(serde_json::to_value(range).unwrap(), json!([{"signal": "height"}, 0]));

        let range = assemble_range(&RangeDef::Step(21.0), &names);
        assert_eq!(serde_json::to_value(range).unwrap(), json!({"step": 21.0}));
    }
}

//! Encodings shared by every mark type: color, conditions, text and tooltips
use crate::compile::context::CompileContext;
use crate::compile::mark::valueref::{field_ref, scale_name, scale_type};
use crate::compile::mark::Channels;
use crate::compile::model::unit::UnitModel;
use crate::compile::selection::predicate::{predicate_expr, selection_predicate};
use crate::error::{Result, VegaLiteError};
use crate::spec::mark::{MarkEncodingOrList, MarkEncodingSpec};
use crate::vl::channel::Channel;
use crate::vl::config::{Config, InvalidValues};
use crate::vl::fielddef::{ConditionDef, FieldDef, FieldRefOption, FieldType};
use crate::vl::mark::MarkType;
use serde_json::{json, Value};
use vegalite_common::escape::string_value;

/// Mark properties passed through from the mark definition or config as constants
const VG_MARK_PROPERTIES: [&str; 21] = [
    "align",
    "angle",
    "baseline",
    "cornerRadius",
    "cursor",
    "dx",
    "dy",
    "fillOpacity",
    "font",
    "fontSize",
    "fontStyle",
    "fontWeight",
    "limit",
    "radius",
    "strokeCap",
    "strokeDash",
    "strokeDashOffset",
    "strokeJoin",
    "strokeOpacity",
    "strokeWidth",
    "theta",
];

const DEFAULT_POINT_OPACITY: f64 = 0.7;

fn condition_test(condition: &ConditionDef, ctx: &CompileContext) -> Result<String> {
    match (&condition.selection, &condition.test) {
        (Some(selection), _) => selection_predicate(selection, &ctx.selections),
        (None, Some(test)) => predicate_expr(test, &ctx.selections),
        (None, None) => Err(VegaLiteError::specification(
            "A condition requires either a selection or a test",
        )),
    }
}

/// Reference of a non-positional field or value definition
fn nonposition_ref(
    unit: &UnitModel,
    channel: Channel,
    def: &FieldDef,
    ctx: &CompileContext,
) -> Option<MarkEncodingSpec> {
    if def.has_field() {
        let discrete_bin = def.is_binned()
            && scale_type(unit, channel)
                .map(|t| t.is_discrete())
                .unwrap_or(false);
        let opt = FieldRefOption {
            bin_suffix: discrete_bin.then_some("range"),
            ..Default::default()
        };
        Some(field_ref(unit, channel, def, &opt, ctx))
    } else {
        def.value.clone().map(MarkEncodingSpec::value)
    }
}

/// Prepend the conditions of `def` as test entries ahead of `main`
pub fn with_conditions<F>(
    def: Option<&FieldDef>,
    main: Option<MarkEncodingSpec>,
    ctx: &CompileContext,
    reference: F,
) -> Result<Option<MarkEncodingOrList>>
where
    F: Fn(&FieldDef) -> Option<MarkEncodingSpec>,
{
    let conditions = def.map(|d| d.conditions()).unwrap_or_default();
    if conditions.is_empty() {
        return Ok(main.map(MarkEncodingOrList::from));
    }
    let mut entries = Vec::new();
    for condition in &conditions {
        let test = condition_test(condition, ctx)?;
        if let Some(spec) = reference(condition.def.as_ref()) {
            entries.push(spec.with_test(test));
        }
    }
    entries.extend(main);
    Ok(Some(MarkEncodingOrList::List(entries)))
}

/// Encoding of a non-positional channel, falling back to `default`
pub fn nonposition(
    unit: &UnitModel,
    channel: Channel,
    default: Option<Value>,
    ctx: &CompileContext,
) -> Result<Option<MarkEncodingOrList>> {
    let def = unit.encoding.get(channel);
    let main = def
        .and_then(|d| nonposition_ref(unit, channel, d, ctx))
        .or_else(|| default.map(MarkEncodingSpec::value));
    with_conditions(def, main, ctx, |d| nonposition_ref(unit, channel, d, ctx))
}

pub fn is_filled(unit: &UnitModel) -> bool {
    unit.mark_def
        .filled
        .unwrap_or_else(|| unit.mark.is_filled_by_default())
}

/// Fill and stroke from the color, fill and stroke channels
pub fn color(unit: &UnitModel, ctx: &CompileContext, channels: &mut Channels) -> Result<()> {
    let filled = is_filled(unit);
    let default_color = unit
        .mark_def
        .color
        .clone()
        .map(Value::String)
        .or_else(|| ctx.config.mark_property(unit.mark, "color").cloned());

    let color = nonposition(unit, Channel::Color, default_color, ctx)?;
    let fill = nonposition(
        unit,
        Channel::Fill,
        unit.mark_def.fill.clone().map(Value::String),
        ctx,
    )?;
    let stroke = nonposition(
        unit,
        Channel::Stroke,
        unit.mark_def.stroke.clone().map(Value::String),
        ctx,
    )?;

    if filled {
        if let Some(color) = fill.or(color) {
            channels.insert("fill".to_string(), color);
        }
        if let Some(stroke) = stroke {
            channels.insert("stroke".to_string(), stroke);
        }
    } else {
        if let Some(color) = stroke.or(color) {
            channels.insert("stroke".to_string(), color);
        }
        let fill = fill.unwrap_or_else(|| MarkEncodingSpec::value("transparent").into());
        channels.insert("fill".to_string(), fill);
    }
    Ok(())
}

fn is_point_like(mark: MarkType) -> bool {
    matches!(
        mark,
        MarkType::Point | MarkType::Circle | MarkType::Square | MarkType::Tick
    )
}

pub fn opacity(unit: &UnitModel, ctx: &CompileContext, channels: &mut Channels) -> Result<()> {
    let default = unit
        .mark_def
        .opacity
        .or_else(|| ctx.config.mark_number(unit.mark, "opacity"))
        .or_else(|| {
            (is_point_like(unit.mark) && !unit.encoding.is_aggregate()).then_some(DEFAULT_POINT_OPACITY)
        })
        .map(|o| json!(o));
    if let Some(opacity) = nonposition(unit, Channel::Opacity, default, ctx)? {
        channels.insert("opacity".to_string(), opacity);
    }
    Ok(())
}

/// Signal formatting a field as text
pub fn text_signal(def: &FieldDef, channel: Channel, config: &Config) -> String {
    let discrete_bin = def.is_binned() && def.is_discrete();
    let field = def.vg_field(
        channel,
        &FieldRefOption {
            expr: true,
            bin_suffix: discrete_bin.then_some("range"),
            ..Default::default()
        },
    );
    match def.field_type() {
        Some(FieldType::Quantitative) if !def.is_binned() => {
            let format = def
                .format
                .clone()
                .or_else(|| config.mark_property(MarkType::Text, "format").and_then(|v| v.as_str().map(String::from)))
                .unwrap_or_default();
            format!("format({field}, {})", string_value(&format))
        }
        Some(FieldType::Temporal) => {
            let format = def
                .format
                .clone()
                .or_else(|| def.time_unit.as_ref().map(|u| u.format()))
                .unwrap_or_else(|| "%b %d, %Y".to_string());
            let func = match &def.time_unit {
                Some(unit) if unit.utc => "utcFormat",
                _ => "timeFormat",
            };
            format!("{func}({field}, {})", string_value(&format))
        }
        _ => format!("''+{field}"),
    }
}

fn text_ref(def: &FieldDef, channel: Channel, config: &Config) -> Option<MarkEncodingSpec> {
    if def.has_field() {
        Some(MarkEncodingSpec::signal(text_signal(def, channel, config)))
    } else {
        def.value.clone().map(MarkEncodingSpec::value)
    }
}

pub fn text(unit: &UnitModel, ctx: &CompileContext, channels: &mut Channels) -> Result<()> {
    let def = unit.encoding.get(Channel::Text);
    let main = def.and_then(|d| text_ref(d, Channel::Text, &ctx.config));
    let text = with_conditions(def, main, ctx, |d| text_ref(d, Channel::Text, &ctx.config))?;
    if let Some(text) = text {
        channels.insert("text".to_string(), text);
    }
    Ok(())
}

/// Tooltip from one field, or an object of every listed field keyed by title
pub fn tooltip(unit: &UnitModel, ctx: &CompileContext, channels: &mut Channels) -> Result<()> {
    let defs = unit.encoding.field_defs(Channel::Tooltip);
    let tooltip = match defs.as_slice() {
        [] => None,
        [def] => {
            let main = text_ref(def, Channel::Tooltip, &ctx.config);
            with_conditions(Some(def), main, ctx, |d| text_ref(d, Channel::Tooltip, &ctx.config))?
        }
        defs => {
            let entries: Vec<String> = defs
                .iter()
                .filter(|d| d.has_field())
                .map(|d| {
                    format!(
                        "{}: {}",
                        string_value(&d.title()),
                        text_signal(d, Channel::Tooltip, &ctx.config)
                    )
                })
                .collect();
            Some(MarkEncodingSpec::signal(format!("{{{}}}", entries.join(", "))).into())
        }
    };
    if let Some(tooltip) = tooltip {
        channels.insert("tooltip".to_string(), tooltip);
    }
    Ok(())
}

pub fn href(unit: &UnitModel, ctx: &CompileContext, channels: &mut Channels) -> Result<()> {
    if let Some(href) = nonposition(unit, Channel::Href, None, ctx)? {
        channels.insert("href".to_string(), href);
    }
    Ok(())
}

/// `defined` test of path marks when invalid values are kept: a null or NaN
/// position breaks the path
pub fn defined(unit: &UnitModel, ctx: &CompileContext, channels: &mut Channels) {
    if ctx.config.invalid_values() != InvalidValues::Null {
        return;
    }
    let tests: Vec<String> = [Channel::X, Channel::Y]
        .into_iter()
        .filter(|c| {
            scale_type(unit, *c)
                .map(|t| t.is_continuous())
                .unwrap_or(false)
        })
        .filter_map(|c| {
            let def = unit.encoding.field_def(c)?;
            (!def.is_count()).then(|| {
                let field = def.vg_field(
                    c,
                    &FieldRefOption {
                        expr: true,
                        ..Default::default()
                    },
                );
                format!("{field} !== null && !isNaN({field})")
            })
        })
        .collect();
    if !tests.is_empty() {
        channels.insert(
            "defined".to_string(),
            MarkEncodingSpec::signal(tests.join(" && ")).into(),
        );
    }
}

/// Size channel or the mark size, as `prop`
pub fn size(
    unit: &UnitModel,
    prop: &str,
    default: Option<f64>,
    ctx: &CompileContext,
    channels: &mut Channels,
) -> Result<()> {
    let default = unit
        .mark_def
        .size
        .or_else(|| ctx.config.mark_number(unit.mark, "size"))
        .or(default)
        .map(|s| json!(s));
    if let Some(size) = nonposition(unit, Channel::Size, default, ctx)? {
        channels.insert(prop.to_string(), size);
    }
    Ok(())
}

/// Constant properties from the mark config and the mark definition, which wins
pub fn mark_properties(unit: &UnitModel, ctx: &CompileContext, channels: &mut Channels) {
    for prop in VG_MARK_PROPERTIES {
        let value = unit
            .mark_def
            .extra
            .get(prop)
            .or_else(|| ctx.config.mark_property(unit.mark, prop));
        if let Some(value) = value {
            channels
                .entry(prop.to_string())
                .or_insert_with(|| MarkEncodingSpec::value(value.clone()).into());
        }
    }
    if let Some(interpolate) = &unit.mark_def.interpolate {
        channels.insert(
            "interpolate".to_string(),
            MarkEncodingSpec::value(interpolate.clone()).into(),
        );
    }
    if let Some(tension) = unit.mark_def.tension {
        channels.insert("tension".to_string(), MarkEncodingSpec::value(tension).into());
    }
}

/// Whether the scale of `channel` exists and is discrete
pub fn has_discrete_scale(unit: &UnitModel, channel: Channel, ctx: &CompileContext) -> bool {
    scale_name(unit, channel, ctx).is_some()
        && scale_type(unit, channel)
            .map(|t| t.is_discrete())
            .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def(v: Value) -> FieldDef {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn test_text_signals() {
        let config = Config::from_layers(&[]).unwrap();
        assert_eq!(
            text_signal(&def(json!({"field": "a", "type": "nominal"})), Channel::Text, &config),
            r#"''+datum["a"]"#
        );
        assert_eq!(
            text_signal(
                &def(json!({"field": "b", "type": "quantitative", "aggregate": "mean", "format": ".2f"})),
                Channel::Text,
                &config
            ),
            r#"format(datum["mean_b"], ".2f")"#
        );
        assert_eq!(
            text_signal(
                &def(json!({"field": "d", "type": "temporal", "timeUnit": "month"})),
                Channel::Text,
                &config
            ),
            r#"timeFormat(datum["month_d"], "%b")"#
        );
    }
}

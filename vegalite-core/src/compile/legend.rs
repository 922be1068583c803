//! Legends of the non-positional channels
use crate::compile::context::CompileContext;
use crate::compile::log::Diagnostics;
use crate::compile::mark::mixins::is_filled;
use crate::compile::model::unit::UnitModel;
use crate::compile::selection::transforms::legends::legend_prefix;
use crate::compile::selection::SelectionComponent;
use crate::compile::split::Split;
use crate::spec::legend::LegendSpec;
use crate::vl::channel::Channel;
use crate::vl::fielddef::FieldDef;
use crate::vl::scale::ScaleType;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use vegalite_common::escape::string_value;

const LEGEND_CHANNELS: [Channel; 6] = [
    Channel::Color,
    Channel::Fill,
    Channel::Stroke,
    Channel::Opacity,
    Channel::Size,
    Channel::Shape,
];

#[derive(Debug, Clone, PartialEq)]
pub struct LegendComponent {
    pub channel: Channel,
    /// Legend property (`fill`, `stroke`, `size`, ...) to local scale name
    pub scales: BTreeMap<String, String>,
    pub props: Split,
}

impl LegendComponent {
    /// Absorb the legend of a sibling view
    pub fn merge(&mut self, other: &LegendComponent, diagnostics: &mut Diagnostics) {
        for (prop, scale) in &other.scales {
            self.scales
                .entry(prop.clone())
                .or_insert_with(|| scale.clone());
        }
        self.props.merge(&other.props, "legend", diagnostics);
    }

    pub fn assemble(&self, ctx: &CompileContext) -> LegendSpec {
        let scale = |prop: &str| self.scales.get(prop).map(|s| ctx.scale_names.get(s));
        let mut props = self.props.combine();
        LegendSpec {
            fill: scale("fill"),
            stroke: scale("stroke"),
            size: scale("size"),
            shape: scale("shape"),
            opacity: scale("opacity"),
            type_: props
                .remove("type")
                .and_then(|v| v.as_str().map(String::from)),
            title: props.remove("title"),
            extra: props,
        }
    }
}

/// Legend property a channel's scale is attached to
fn legend_property(unit: &UnitModel, channel: Channel) -> &'static str {
    match channel {
        Channel::Color if is_filled(unit) => "fill",
        Channel::Color | Channel::Stroke => "stroke",
        Channel::Fill => "fill",
        Channel::Size => "size",
        Channel::Shape => "shape",
        _ => "opacity",
    }
}

/// Encode blocks making the entries of `field` clickable for a legend-bound selection
fn selection_encode(selection: &SelectionComponent, field: &str) -> Value {
    let prefix = legend_prefix(field);
    let selected = format!(
        "!length(data({})) || ({name}[{field}] && indexof({name}[{field}], datum.value) >= 0)",
        string_value(&selection.store()),
        name = selection.name,
        field = string_value(field),
    );
    json!({
        "symbols": {
            "name": format!("{prefix}_symbols"),
            "interactive": true,
            "update": {
                "opacity": [{"test": selected, "value": 1}, {"value": 0.2}]
            }
        },
        "labels": {
            "name": format!("{prefix}_labels"),
            "interactive": true,
            "update": {
                "opacity": [{"test": selected, "value": 1}, {"value": 0.35}]
            }
        },
        "entries": {
            "name": format!("{prefix}_entries"),
            "interactive": true,
            "update": {"fill": {"value": "transparent"}}
        }
    })
}

fn parse_legend(
    unit: &UnitModel,
    channel: Channel,
    def: &FieldDef,
    scale_type: ScaleType,
    ctx: &CompileContext,
) -> LegendComponent {
    let legend_def = def.legend_def().cloned().unwrap_or_default();
    let mut props = Split::new();

    match legend_def.title.clone() {
        Some(Some(title)) => props.set("title", title, true),
        Some(None) => {}
        None => props.set("title", def.title(), def.title.is_some()),
    }
    let gradient = channel.is_color() && scale_type.is_continuous() && !scale_type.is_bin();
    if gradient {
        props.set("type", "gradient", false);
    }
    if let Some(unit_fmt) = &def.time_unit {
        props.set("format", unit_fmt.format(), false);
        props.set("formatType", if unit_fmt.utc { "utc" } else { "time" }, false);
    } else if let Some(format) = &def.format {
        props.set("format", format.as_str(), false);
    }

    for (key, value) in ctx.config.legend.iter() {
        if !value.is_null() {
            props.set_if_implicit(key.as_str(), value.clone());
        }
    }

    let mut set = |key: &str, value: Option<Value>| {
        if let Some(value) = value {
            props.set(key, value, true);
        }
    };
    set("orient", legend_def.orient.clone().map(Value::from));
    set("format", legend_def.format.clone().map(Value::from));
    set("type", legend_def.type_.clone().map(Value::from));
    set("values", legend_def.values.clone().map(Value::Array));
    for (key, value) in &legend_def.extra {
        set(key, Some(value.clone()));
    }

    if let Some(field) = def.field_name() {
        let bound = unit.selections.iter().find(|s| {
            s.is_legend_bound() && s.project.first().map(|p| p.field.as_str()) == Some(field)
        });
        if let Some(selection) = bound {
            props.set_if_implicit("encode", selection_encode(selection, field));
        }
    }

    LegendComponent {
        channel,
        scales: BTreeMap::from([(
            legend_property(unit, channel).to_string(),
            unit.scale_name(channel),
        )]),
        props,
    }
}

/// Legends of the channels of a unit with a scale. `legend: null` disables one.
pub fn parse_unit_legends(unit: &UnitModel, ctx: &mut CompileContext) -> BTreeMap<Channel, LegendComponent> {
    let mut legends = BTreeMap::new();
    for channel in LEGEND_CHANNELS {
        let (Some(def), Some(scale_type)) = (
            unit.encoding.field_def(channel),
            unit.scale_types.get(&channel).copied(),
        ) else {
            continue;
        };
        if matches!(def.legend, Some(None)) || !def.has_field() {
            continue;
        }
        legends.insert(channel, parse_legend(unit, channel, def, scale_type, ctx));
    }
    legends
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::model::BuildScope;
    use crate::vl::config::Config;
    use crate::vl::spec::UnitSpec;

    fn legends(spec: Value) -> (BTreeMap<Channel, LegendComponent>, CompileContext) {
        let mut ctx = CompileContext::new(Config::from_layers(&[]).unwrap());
        let spec: UnitSpec = serde_json::from_value(spec).unwrap();
        let unit = UnitModel::new(spec, BuildScope::root(), &mut ctx).unwrap();
        (parse_unit_legends(&unit, &mut ctx), ctx)
    }

    #[test]
    fn test_color_legend_of_filled_and_stroked_marks() {
        let (bar, ctx) = legends(json!({
            "mark": "bar",
            "encoding": {"color": {"field": "c", "type": "nominal"}}
        }));
        let spec = serde_json::to_value(bar[&Channel::Color].assemble(&ctx)).unwrap();
        assert_eq!(spec, json!({"fill": "color", "title": "c"}));

        let (line, ctx) = legends(json!({
            "mark": "line",
            "encoding": {"color": {"field": "c", "type": "quantitative", "legend": {"title": "C"}}}
        }));
        let spec = serde_json::to_value(line[&Channel::Color].assemble(&ctx)).unwrap();
        assert_eq!(spec, json!({"stroke": "color", "type": "gradient", "title": "C"}));
    }

    #[test]
    fn test_disabled_legend() {
        let (legends, _) = legends(json!({
            "mark": "point",
            "encoding": {
                "shape": {"field": "s", "type": "nominal", "legend": null},
                "size": {"field": "q", "type": "quantitative"}
            }
        }));
        assert!(!legends.contains_key(&Channel::Shape));
        assert_eq!(legends[&Channel::Size].scales["size"], "size");
    }
}

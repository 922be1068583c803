//! Axes of the position channels. Each channel gets a main axis (domain, labels,
//! ticks and title) and, for continuous scales, a separate grid-only axis so facets
//! can move the main axis into a header while the grid stays in every cell.
use crate::compile::context::CompileContext;
use crate::compile::log::Diagnostics;
use crate::compile::model::unit::UnitModel;
use crate::compile::scale::domain::bin_signal;
use crate::compile::split::Split;
use crate::spec::axis::AxisSpec;
use crate::vl::axis::AxisDef;
use crate::vl::channel::{Channel, POSITION_SCALE_CHANNELS};
use crate::vl::config::Config;
use crate::vl::fielddef::FieldDef;
use crate::vl::scale::ScaleType;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

/// Properties that belong to the grid axis rather than the main axis
fn is_grid_property(prop: &str) -> bool {
    prop.starts_with("grid")
}

#[derive(Debug, Clone, PartialEq)]
pub struct AxisComponent {
    pub channel: Channel,
    /// Local name of the scale the axis reads
    pub scale: String,
    pub grid_only: bool,
    /// Local name of the size signal driving the default tick count
    pub tick_count_size: Option<String>,
    pub props: Split,
}

impl AxisComponent {
    fn new(channel: Channel, scale: String, grid_only: bool) -> Self {
        Self {
            channel,
            scale,
            grid_only,
            tick_count_size: None,
            props: Split::new(),
        }
    }

    pub fn orient(&self) -> Option<&str> {
        self.props.get("orient").and_then(|v| v.as_str())
    }

    pub fn has_explicit(&self, prop: &str) -> bool {
        self.props
            .get_with_explicit(prop)
            .map(|p| p.explicit)
            .unwrap_or(false)
    }

    /// Absorb the axis of a sibling view. Distinct titles are joined.
    pub fn merge(&mut self, other: &AxisComponent, diagnostics: &mut Diagnostics) {
        let mut other_props = other.props.clone();
        if let (Some(t1), Some(t2)) = (self.props.get("title"), other.props.get("title")) {
            if t1 != t2 && !self.has_explicit("title") && !other.has_explicit("title") {
                let joined = match (t1.as_str(), t2.as_str()) {
                    (Some(t1), Some(t2)) => Value::from(format!("{t1}, {t2}")),
                    _ => t1.clone(),
                };
                self.props.set("title", joined, false);
                other_props.remove("title");
            }
        }
        self.props.merge(&other_props, "axis", diagnostics);
        if self.tick_count_size.is_none() {
            self.tick_count_size = other.tick_count_size.clone();
        }
    }

    pub fn assemble(&self, ctx: &CompileContext) -> AxisSpec {
        let mut props = self.props.combine();
        if let Some(size) = &self.tick_count_size {
            if !props.contains_key("tickCount") {
                let size = ctx.size_names.get(size);
                props.insert("tickCount".to_string(), json!({"signal": format!("ceil({size}/40)")}));
            }
        }
        let mut take = |key: &str| props.remove(key);
        let orient = take("orient")
            .and_then(|v| v.as_str().map(String::from))
            .unwrap_or_else(|| default_orient(self.channel).to_string());
        AxisSpec {
            scale: ctx.scale_names.get(&self.scale),
            orient,
            title: take("title"),
            grid: take("grid").and_then(|v| v.as_bool()),
            domain: take("domain").and_then(|v| v.as_bool()),
            labels: take("labels").and_then(|v| v.as_bool()),
            ticks: take("ticks").and_then(|v| v.as_bool()),
            format: take("format").and_then(|v| v.as_str().map(String::from)),
            zindex: take("zindex").and_then(|v| v.as_i64()),
            extra: props,
        }
    }
}

pub fn default_orient(channel: Channel) -> &'static str {
    match channel {
        Channel::Y => "left",
        Channel::Row => "left",
        Channel::Column => "top",
        _ => "bottom",
    }
}

fn config_layers<'a>(channel: Channel, scale_type: ScaleType, config: &'a Config) -> Vec<&'a Map<String, Value>> {
    let mut layers = vec![&config.axis];
    layers.push(if channel == Channel::Y {
        &config.axis_y
    } else {
        &config.axis_x
    });
    if scale_type == ScaleType::Band {
        layers.push(&config.axis_band);
    }
    layers
}

fn apply_config(axis: &mut AxisComponent, layers: &[&Map<String, Value>]) {
    for layer in layers {
        for (key, value) in layer.iter() {
            if is_grid_property(key) == axis.grid_only && !value.is_null() {
                axis.props.set_if_implicit(key.as_str(), value.clone());
            }
        }
    }
}

fn apply_explicit(axis: &mut AxisComponent, def: &AxisDef) {
    let mut set = |key: &str, value: Option<Value>| {
        if let Some(value) = value {
            if is_grid_property(key) == axis.grid_only {
                axis.props.set(key, value, true);
            }
        }
    };
    if !axis.grid_only {
        set("orient", def.orient.clone().map(Value::from));
        set("domain", def.domain.map(Value::from));
        set("labels", def.labels.map(Value::from));
        set("ticks", def.ticks.map(Value::from));
        set("format", def.format.clone().map(Value::from));
        set("tickCount", def.tick_count.map(Value::from));
        set("zindex", def.zindex.map(Value::from));
    }
    for (key, value) in &def.extra {
        set(key, Some(value.clone()));
    }
}

/// Title of the axis of `channel`, joining the titles of a ranged field pair
fn axis_title(unit: &UnitModel, channel: Channel, def: &FieldDef) -> Option<(Value, bool)> {
    if let Some(title) = def.axis_def().and_then(|a| a.title.clone()) {
        return title.map(|t| (Value::from(t), true));
    }
    let mut title = def.title();
    let explicit = def.title.is_some();
    if let Some(secondary) = channel.secondary().and_then(|c| unit.encoding.field_def(c)) {
        let other = secondary.title();
        if secondary.has_field() && other != title {
            title = format!("{title}, {other}");
        }
    }
    Some((Value::from(title), explicit))
}

fn label_encoding(orient: &str, angle: f64) -> Value {
    let align = if orient == "top" { "left" } else { "right" };
    json!({
        "labels": {
            "update": {
                "angle": {"value": angle},
                "align": {"value": align},
                "baseline": {"value": "middle"}
            }
        }
    })
}

fn main_axis(
    unit: &UnitModel,
    channel: Channel,
    def: &FieldDef,
    scale_type: ScaleType,
    config: &Config,
) -> AxisComponent {
    let mut axis = AxisComponent::new(channel, unit.scale_name(channel), false);
    let axis_def = def.axis_def().cloned().unwrap_or_default();
    let orient = axis_def
        .orient
        .clone()
        .unwrap_or_else(|| default_orient(channel).to_string());

    axis.props.set("orient", orient.as_str(), false);
    if let Some((title, explicit)) = axis_title(unit, channel, def) {
        axis.props.set("title", title, explicit);
    }
    axis.props.set("zindex", 1, false);
    if scale_type.is_continuous() {
        axis.props.set("labelOverlap", true, false);
        if channel == Channel::X {
            axis.props.set("labelFlush", true, false);
        }
        if !def.is_binned() {
            axis.tick_count_size = Some(unit.base.get_name(if channel == Channel::Y {
                "height"
            } else {
                "width"
            }));
        }
    }
    if def.is_binned() && scale_type.is_continuous() {
        // Ticks at bin boundaries come from the bin signal
        let bins = format!("{}_bins", bin_signal(unit, channel, def));
        let values = format!("sequence({bins}.start, {bins}.stop + {bins}.step, {bins}.step)");
        axis.props.set("values", json!({ "signal": values }), false);
    }

    if let Some(unit_fmt) = def.time_unit.as_ref() {
        if !scale_type.is_time() {
            axis.props.set("format", unit_fmt.format(), false);
            axis.props.set("formatType", if unit_fmt.utc { "utc" } else { "time" }, false);
        }
    } else if let Some(format) = &def.format {
        axis.props.set("format", format.as_str(), false);
    }

    let rotate = channel == Channel::X && (scale_type.is_discrete() || def.is_binned());
    match axis_def.label_angle {
        Some(angle) => axis.props.set("encode", label_encoding(&orient, angle), true),
        None if rotate => axis.props.set("encode", label_encoding(&orient, 270.0), false),
        None => {}
    }

    apply_config(&mut axis, &config_layers(channel, scale_type, config));
    apply_explicit(&mut axis, &axis_def);
    axis.props.set_if_implicit("grid", false);
    axis
}

fn grid_axis(
    unit: &UnitModel,
    channel: Channel,
    def: &FieldDef,
    scale_type: ScaleType,
    config: &Config,
) -> Option<AxisComponent> {
    let enabled = def
        .axis_def()
        .and_then(|a| a.grid)
        .unwrap_or(scale_type.is_continuous() && !def.is_binned());
    if !enabled {
        return None;
    }
    let mut axis = AxisComponent::new(channel, unit.scale_name(channel), true);
    let orient = def
        .axis_def()
        .and_then(|a| a.orient.clone())
        .unwrap_or_else(|| default_orient(channel).to_string());
    let other = if channel == Channel::Y { Channel::X } else { Channel::Y };
    axis.props.set("orient", orient, true);
    axis.props.set("grid", true, true);
    if unit.scale_types.contains_key(&other) {
        axis.props.set("gridScale", unit.scale_name(other), true);
    }
    for prop in ["domain", "labels", "ticks"] {
        axis.props.set(prop, false, true);
    }
    axis.props.set("minExtent", 0, true);
    axis.props.set("maxExtent", 0, true);
    axis.props.set("zindex", 0, true);
    if !def.is_binned() {
        axis.tick_count_size = Some(unit.base.get_name(if channel == Channel::Y {
            "height"
        } else {
            "width"
        }));
    }
    apply_config(&mut axis, &config_layers(channel, scale_type, config));
    if let Some(axis_def) = def.axis_def() {
        apply_explicit(&mut axis, axis_def);
    }
    Some(axis)
}

/// Main and grid axes of the position channels of a unit. `axis: null` disables both.
pub fn parse_unit_axes(unit: &UnitModel, ctx: &mut CompileContext) -> BTreeMap<Channel, Vec<AxisComponent>> {
    let mut axes = BTreeMap::new();
    for channel in POSITION_SCALE_CHANNELS {
        let (Some(def), Some(scale_type)) = (
            unit.encoding.field_def(channel),
            unit.scale_types.get(&channel).copied(),
        ) else {
            continue;
        };
        if matches!(def.axis, Some(None)) {
            continue;
        }
        let mut components = vec![main_axis(unit, channel, def, scale_type, &ctx.config)];
        components.extend(grid_axis(unit, channel, def, scale_type, &ctx.config));
        log::debug!(
            "Parsed {} axis component(s) for {channel} of \"{}\"",
            components.len(),
            unit.base.name
        );
        axes.insert(channel, components);
    }
    axes
}

/// Merge the axes of one channel from several views, main with main and grid with grid
pub fn merge_axes(
    merged: &mut Vec<AxisComponent>,
    axes: Vec<AxisComponent>,
    diagnostics: &mut Diagnostics,
) {
    for axis in axes {
        match merged.iter_mut().find(|m| m.grid_only == axis.grid_only) {
            Some(existing) => existing.merge(&axis, diagnostics),
            None => merged.push(axis),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::model::BuildScope;
    use crate::vl::spec::UnitSpec;
    use serde_json::json;

    fn axes(spec: Value) -> (BTreeMap<Channel, Vec<AxisComponent>>, CompileContext) {
        let mut ctx = CompileContext::new(Config::from_layers(&[]).unwrap());
        let spec: UnitSpec = serde_json::from_value(spec).unwrap();
        let unit = UnitModel::new(spec, BuildScope::root(), &mut ctx).unwrap();
        (parse_unit_axes(&unit, &mut ctx), ctx)
    }

    #[test]
    fn test_continuous_axis_has_grid_companion() {
        let (axes, ctx) = axes(json!({
            "mark": "point",
            "encoding": {
                "x": {"field": "a", "type": "quantitative"},
                "y": {"field": "b", "type": "quantitative", "axis": {"title": "B", "orient": "right"}}
            }
        }));
        let x = &axes[&Channel::X];
        assert_eq!(x.len(), 2);
        let main = serde_json::to_value(x[0].assemble(&ctx)).unwrap();
        assert_eq!(main["orient"], "bottom");
        assert_eq!(main["title"], "a");
        assert_eq!(main["grid"], false);
        assert_eq!(main["tickCount"], json!({"signal": "ceil(width/40)"}));
        let grid = serde_json::to_value(x[1].assemble(&ctx)).unwrap();
        assert_eq!(grid["grid"], true);
        assert_eq!(grid["gridScale"], "y");
        assert_eq!(grid["labels"], false);
        assert_eq!(grid["zindex"], 0);

        let y = serde_json::to_value(axes[&Channel::Y][0].assemble(&ctx)).unwrap();
        assert_eq!(y["orient"], "right");
        assert_eq!(y["title"], "B");
        assert_eq!(y["minExtent"], 30);
    }

    #[test]
    fn test_discrete_x_labels_are_rotated() {
        let (axes, ctx) = axes(json!({
            "mark": "bar",
            "encoding": {
                "x": {"field": "a", "type": "ordinal"},
                "y": {"field": "b", "type": "quantitative", "aggregate": "sum", "axis": null}
            }
        }));
        assert!(!axes.contains_key(&Channel::Y));
        let x = &axes[&Channel::X];
        assert_eq!(x.len(), 1);
        let main = serde_json::to_value(x[0].assemble(&ctx)).unwrap();
        assert_eq!(main["encode"]["labels"]["update"]["angle"], json!({"value": 270.0}));
        assert_eq!(main["encode"]["labels"]["update"]["align"], json!({"value": "right"}));
        assert!(main.get("tickCount").is_none());
    }

    #[test]
    fn test_merge_joins_titles() {
        let mut diagnostics = Diagnostics::new();
        let mut a = AxisComponent::new(Channel::Y, "y".to_string(), false);
        a.props.set("title", "a", false);
        let mut b = AxisComponent::new(Channel::Y, "layer_1_y".to_string(), false);
        b.props.set("title", "b", false);
        let mut merged = vec![a];
        merge_axes(&mut merged, vec![b], &mut diagnostics);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].props.get("title"), Some(&json!("a, b")));
        assert!(diagnostics.warnings().is_empty());
    }
}

//! References from mark properties to data fields, scales and group sizes
use crate::compile::context::CompileContext;
use crate::compile::model::unit::UnitModel;
use crate::spec::mark::{MarkEncodingField, MarkEncodingFieldObject, MarkEncodingSpec};
use crate::vl::channel::Channel;
use crate::vl::fielddef::{FieldDef, FieldRefOption};
use crate::vl::scale::ScaleType;
use serde_json::json;
use vegalite_common::escape::string_value;

/// Final name of the scale used by `channel`, if the unit has one
pub fn scale_name(unit: &UnitModel, channel: Channel, ctx: &CompileContext) -> Option<String> {
    let scale_channel = channel.scale_channel();
    unit.scale_types
        .contains_key(&scale_channel)
        .then(|| ctx.scale_names.get(&unit.scale_name(scale_channel)))
}

pub fn scale_type(unit: &UnitModel, channel: Channel) -> Option<ScaleType> {
    unit.scale_types.get(&channel.scale_channel()).copied()
}

/// `{"field": {"group": size}}`
pub fn group_size(size: &str) -> MarkEncodingSpec {
    MarkEncodingSpec {
        field: Some(MarkEncodingField::Object(MarkEncodingFieldObject {
            signal: None,
            datum: None,
            group: Some(size.to_string()),
            parent: None,
        })),
        ..Default::default()
    }
}

/// Half of the group width or height
pub fn group_center(channel: Channel) -> MarkEncodingSpec {
    let size = if channel.scale_channel() == Channel::Y {
        "height"
    } else {
        "width"
    };
    MarkEncodingSpec {
        mult: Some(json!(0.5)),
        ..group_size(size)
    }
}

/// Field of `def`, passed through the scale of `channel` when there is one
pub fn field_ref(
    unit: &UnitModel,
    channel: Channel,
    def: &FieldDef,
    opt: &FieldRefOption,
    ctx: &CompileContext,
) -> MarkEncodingSpec {
    let field = def.vg_field(channel, opt);
    match scale_name(unit, channel, ctx) {
        Some(scale) => MarkEncodingSpec::scaled_field(scale, field),
        None => MarkEncodingSpec::field(field),
    }
}

/// Stacked field with the `start` or `end` suffix
pub fn stack_ref(
    unit: &UnitModel,
    channel: Channel,
    def: &FieldDef,
    suffix: &str,
    ctx: &CompileContext,
) -> MarkEncodingSpec {
    field_ref(
        unit,
        channel,
        def,
        &FieldRefOption {
            suffix: Some(suffix),
            ..Default::default()
        },
        ctx,
    )
}

fn bin_field(def: &FieldDef, channel: Channel, suffix: Option<&str>) -> String {
    def.vg_field(
        channel,
        &FieldRefOption {
            bin_suffix: suffix,
            ..Default::default()
        },
    )
}

/// Reference for a field on a discrete or continuous scale, at the center of its band
/// or bin
pub fn centered_field_ref(
    unit: &UnitModel,
    channel: Channel,
    def: &FieldDef,
    ctx: &CompileContext,
) -> MarkEncodingSpec {
    let scale = scale_name(unit, channel, ctx);
    let scale_type = scale_type(unit, channel);
    let band = scale_type == Some(ScaleType::Band);

    if def.is_binned() {
        if scale_type.map(|t| t.is_discrete()).unwrap_or(false) {
            let mut spec = MarkEncodingSpec::field(bin_field(def, channel, Some("range")));
            spec.scale = scale;
            if band {
                spec.band = Some(json!(0.5));
            }
            return spec;
        }
        if let Some(scale) = scale.filter(|_| scale_type != Some(ScaleType::BinOrdinal)) {
            let start = bin_field(def, channel, None);
            let end = bin_field(def, channel, Some("end"));
            return MarkEncodingSpec::signal(format!(
                "scale({}, 0.5 * datum[{}] + 0.5 * datum[{}])",
                string_value(&scale),
                string_value(&start),
                string_value(&end)
            ));
        }
    }

    let mut spec = field_ref(unit, channel, def, &FieldRefOption::default(), ctx);
    if band {
        spec.band = Some(json!(0.5));
    }
    spec
}

/// Center position of a point-like mark along `channel`
pub fn mid_point(unit: &UnitModel, channel: Channel, ctx: &CompileContext) -> MarkEncodingSpec {
    match unit.encoding.get(channel) {
        Some(def) if def.has_field() => {
            let stacked = unit
                .stack
                .as_ref()
                .map(|s| s.field_channel == channel)
                .unwrap_or(false);
            if stacked {
                stack_ref(unit, channel, def, "end", ctx)
            } else {
                centered_field_ref(unit, channel, def, ctx)
            }
        }
        Some(FieldDef {
            value: Some(value), ..
        }) => MarkEncodingSpec::value(value.clone()),
        _ => group_center(channel),
    }
}

/// Reference of a secondary range channel (`x2`, `y2`)
pub fn secondary_ref(
    unit: &UnitModel,
    channel: Channel,
    ctx: &CompileContext,
) -> Option<MarkEncodingSpec> {
    let def = unit.encoding.get(channel)?;
    if def.has_field() {
        Some(field_ref(unit, channel, def, &FieldRefOption::default(), ctx))
    } else {
        def.value.clone().map(MarkEncodingSpec::value)
    }
}

/// Baseline of bars and areas along a measure channel: zero on the scale, or the
/// bottom or left edge of the group for scales without zero
pub fn zero_ref(unit: &UnitModel, channel: Channel, ctx: &CompileContext) -> MarkEncodingSpec {
    match (scale_name(unit, channel, ctx), scale_type(unit, channel)) {
        (Some(scale), Some(t)) if t.supports_zero() => MarkEncodingSpec {
            scale: Some(scale),
            value: Some(json!(0)),
            ..Default::default()
        },
        _ if channel == Channel::Y => group_size("height"),
        _ => MarkEncodingSpec::value(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_center() {
        assert_eq!(
            serde_json::to_value(group_center(Channel::Y)).unwrap(),
            json!({"field": {"group": "height"}, "mult": 0.5})
        );
        assert_eq!(
            serde_json::to_value(group_center(Channel::X2)).unwrap(),
            json!({"field": {"group": "width"}, "mult": 0.5})
        );
    }
}

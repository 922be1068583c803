//! Arcs of pie and donut charts, centered in the group
use crate::compile::context::CompileContext;
use crate::compile::mark::mixins;
use crate::compile::mark::valueref::{field_ref, stack_ref};
use crate::compile::mark::Channels;
use crate::compile::model::unit::UnitModel;
use crate::error::Result;
use crate::spec::mark::MarkEncodingSpec;
use crate::vl::channel::Channel;
use serde_json::json;

fn set(channels: &mut Channels, prop: &str, spec: MarkEncodingSpec) {
    channels.insert(prop.to_string(), spec.into());
}

pub fn encode(unit: &UnitModel, ctx: &mut CompileContext) -> Result<Channels> {
    let mut channels = Channels::new();
    set(
        &mut channels,
        "x",
        MarkEncodingSpec {
            mult: Some(json!(0.5)),
            ..MarkEncodingSpec::signal("width")
        },
    );
    set(
        &mut channels,
        "y",
        MarkEncodingSpec {
            mult: Some(json!(0.5)),
            ..MarkEncodingSpec::signal("height")
        },
    );

    let stacked = unit
        .stack
        .as_ref()
        .map(|s| s.field_channel == Channel::Theta)
        .unwrap_or(false);
    match unit.encoding.field_def(Channel::Theta) {
        Some(def) if stacked => {
            set(&mut channels, "startAngle", stack_ref(unit, Channel::Theta, def, "end", ctx));
            set(&mut channels, "endAngle", stack_ref(unit, Channel::Theta, def, "start", ctx));
        }
        Some(def) => {
            set(&mut channels, "startAngle", MarkEncodingSpec::value(0));
            set(
                &mut channels,
                "endAngle",
                field_ref(unit, Channel::Theta, def, &Default::default(), ctx),
            );
        }
        None => {
            set(&mut channels, "startAngle", MarkEncodingSpec::value(0));
            set(
                &mut channels,
                "endAngle",
                MarkEncodingSpec::value(2.0 * std::f64::consts::PI),
            );
        }
    }

    let outer = match unit.encoding.field_def(Channel::Radius) {
        Some(def) => field_ref(unit, Channel::Radius, def, &Default::default(), ctx),
        None => MarkEncodingSpec::signal("min(width, height) / 2"),
    };
    set(&mut channels, "outerRadius", outer);
    set(
        &mut channels,
        "innerRadius",
        MarkEncodingSpec::value(unit.mark_def.inner_radius.unwrap_or(0.0)),
    );

    mixins::color(unit, ctx, &mut channels)?;
    mixins::opacity(unit, ctx, &mut channels)?;
    Ok(channels)
}

//! Bars, rects and ticks
use crate::compile::context::CompileContext;
use crate::compile::log::message;
use crate::compile::mark::mixins;
use crate::compile::mark::valueref::{
    centered_field_ref, field_ref, group_center, group_size, mid_point, scale_name, scale_type, secondary_ref,
    stack_ref, zero_ref,
};
use crate::compile::mark::{orient, Channels};
use crate::compile::model::unit::UnitModel;
use crate::error::Result;
use crate::spec::mark::MarkEncodingSpec;
use crate::vl::channel::Channel;
use crate::vl::fielddef::FieldRefOption;
use crate::vl::mark::{MarkType, Orient};
use crate::vl::scale::ScaleType;
use serde_json::json;

const DEFAULT_RANGE_STEP: f64 = 21.0;
const DEFAULT_CONTINUOUS_BAND_SIZE: f64 = 5.0;

struct Props {
    start: &'static str,
    end: &'static str,
    center: &'static str,
    size: &'static str,
}

fn props(channel: Channel) -> Props {
    if channel == Channel::Y {
        Props {
            start: "y",
            end: "y2",
            center: "yc",
            size: "height",
        }
    } else {
        Props {
            start: "x",
            end: "x2",
            center: "xc",
            size: "width",
        }
    }
}

fn set(channels: &mut Channels, prop: &str, spec: MarkEncodingSpec) {
    channels.insert(prop.to_string(), spec.into());
}

fn range_step(ctx: &CompileContext) -> f64 {
    ctx.config.scale.range_step.unwrap_or(DEFAULT_RANGE_STEP)
}

/// Explicit size of the mark along a dimension, from the size channel or mark size
fn explicit_size(
    unit: &UnitModel,
    prop: &str,
    ctx: &CompileContext,
    channels: &mut Channels,
) -> Result<bool> {
    let has_size = unit.encoding.has(Channel::Size) || unit.mark_def.size.is_some();
    if has_size {
        mixins::size(unit, prop, None, ctx, channels)?;
    }
    Ok(has_size)
}

/// Position along the dimension of a bar or along either axis of a rect
fn dimension(
    unit: &UnitModel,
    channel: Channel,
    ctx: &mut CompileContext,
    channels: &mut Channels,
) -> Result<()> {
    let p = props(channel);
    let Some(def) = unit.encoding.field_def(channel) else {
        set(channels, p.center, group_center(channel));
        if !explicit_size(unit, p.size, ctx, channels)? {
            set(channels, p.size, MarkEncodingSpec::value(range_step(ctx) - 1.0));
        }
        return Ok(());
    };
    let secondary = channel.secondary().and_then(|c| secondary_ref(unit, c, ctx));
    let scale = scale_name(unit, channel, ctx);
    let scale_type = scale_type(unit, channel);

    if let Some(end) = secondary {
        set(channels, p.start, field_ref(unit, channel, def, &Default::default(), ctx));
        set(channels, p.end, end);
        return Ok(());
    }

    if def.is_binned() && scale_type.map(|t| !t.is_discrete()).unwrap_or(true) {
        let spacing = if unit.mark == MarkType::Bar {
            ctx.config.mark_number(MarkType::Bar, "binSpacing").unwrap_or(1.0)
        } else {
            0.0
        };
        let mut start = field_ref(unit, channel, def, &Default::default(), ctx);
        let end = field_ref(
            unit,
            channel,
            def,
            &FieldRefOption {
                bin_suffix: Some("end"),
                ..Default::default()
            },
            ctx,
        );
        if spacing > 0.0 {
            start.offset = Some(json!(spacing));
        }
        // Bin start on the secondary end, offset by the bin spacing
        set(channels, p.end, start);
        set(channels, p.start, end);
        return Ok(());
    }

    match (scale, scale_type) {
        (Some(scale), Some(ScaleType::Band)) => {
            let opt = FieldRefOption {
                bin_suffix: def.is_binned().then_some("range"),
                ..Default::default()
            };
            set(channels, p.start, field_ref(unit, channel, def, &opt, ctx));
            if unit.encoding.has(Channel::Size) {
                ctx.diagnostics.warn(message::dropping_size_for_band(unit.mark));
            }
            set(
                channels,
                p.size,
                MarkEncodingSpec {
                    scale: Some(scale),
                    band: Some(json!(true)),
                    ..Default::default()
                },
            );
        }
        (_, scale_type) => {
            set(channels, p.center, centered_field_ref(unit, channel, def, ctx));
            if !explicit_size(unit, p.size, ctx, channels)? {
                let size = if scale_type.map(|t| t.is_discrete()).unwrap_or(false) {
                    range_step(ctx) - 1.0
                } else {
                    ctx.config
                        .mark_number(unit.mark, "continuousBandSize")
                        .unwrap_or(DEFAULT_CONTINUOUS_BAND_SIZE)
                };
                set(channels, p.size, MarkEncodingSpec::value(size));
            }
        }
    }
    Ok(())
}

/// Extent of a bar along its measure, from the baseline or the stack start
fn measure(unit: &UnitModel, channel: Channel, ctx: &CompileContext, channels: &mut Channels) {
    let p = props(channel);
    let stacked = unit.stack.as_ref().filter(|s| s.field_channel == channel);
    match unit.encoding.get(channel) {
        Some(def) if def.has_field() => {
            if stacked.is_some() {
                set(channels, p.start, stack_ref(unit, channel, def, "end", ctx));
                set(channels, p.end, stack_ref(unit, channel, def, "start", ctx));
                return;
            }
            set(channels, p.start, field_ref(unit, channel, def, &Default::default(), ctx));
            let end = channel
                .secondary()
                .and_then(|c| secondary_ref(unit, c, ctx))
                .unwrap_or_else(|| zero_ref(unit, channel, ctx));
            set(channels, p.end, end);
        }
        Some(def) if def.value.is_some() => {
            set(channels, p.start, mid_point(unit, channel, ctx));
            set(channels, p.end, zero_ref(unit, channel, ctx));
        }
        _ => {
            set(channels, p.start, MarkEncodingSpec::value(0));
            let full = if channel == Channel::Y { "height" } else { "width" };
            set(channels, p.end, group_size(full));
        }
    }
}

fn tick(unit: &UnitModel, ctx: &CompileContext, channels: &mut Channels) -> Result<()> {
    set(channels, "xc", mid_point(unit, Channel::X, ctx));
    set(channels, "yc", mid_point(unit, Channel::Y, ctx));
    let thickness = unit
        .mark_def
        .thickness
        .or_else(|| ctx.config.mark_number(MarkType::Tick, "thickness"))
        .unwrap_or(1.0);
    let band_size = ctx
        .config
        .mark_number(MarkType::Tick, "bandSize")
        .unwrap_or_else(|| range_step(ctx) * 3.0 / 4.0);
    let (thin, long) = match orient(unit) {
        Orient::Vertical => ("width", "height"),
        Orient::Horizontal => ("height", "width"),
    };
    set(channels, thin, MarkEncodingSpec::value(thickness));
    mixins::size(unit, long, Some(band_size), ctx, channels)
}

pub fn encode(unit: &UnitModel, ctx: &mut CompileContext) -> Result<Channels> {
    let mut channels = Channels::new();
    match unit.mark {
        MarkType::Tick => tick(unit, ctx, &mut channels)?,
        MarkType::Rect => {
            dimension(unit, Channel::X, ctx, &mut channels)?;
            dimension(unit, Channel::Y, ctx, &mut channels)?;
        }
        _ => match orient(unit) {
            Orient::Vertical => {
                dimension(unit, Channel::X, ctx, &mut channels)?;
                measure(unit, Channel::Y, ctx, &mut channels);
            }
            Orient::Horizontal => {
                dimension(unit, Channel::Y, ctx, &mut channels)?;
                measure(unit, Channel::X, ctx, &mut channels);
            }
        },
    }
    mixins::color(unit, ctx, &mut channels)?;
    mixins::opacity(unit, ctx, &mut channels)?;
    Ok(channels)
}

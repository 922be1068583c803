//! Rules: a segment between two positions, spanning the group when one axis is unset
use crate::compile::context::CompileContext;
use crate::compile::mark::mixins;
use crate::compile::mark::valueref::{group_size, mid_point, secondary_ref};
use crate::compile::mark::Channels;
use crate::compile::model::unit::UnitModel;
use crate::error::Result;
use crate::spec::mark::MarkEncodingSpec;
use crate::vl::channel::Channel;

fn set(channels: &mut Channels, prop: &str, spec: MarkEncodingSpec) {
    channels.insert(prop.to_string(), spec.into());
}

/// Position along `channel`: a range when the secondary channel is set, the full
/// group extent when `span` is set, otherwise a single point
fn position(
    unit: &UnitModel,
    channel: Channel,
    span: bool,
    ctx: &CompileContext,
    channels: &mut Channels,
) {
    let (start, end, size) = if channel == Channel::Y {
        ("y", "y2", "height")
    } else {
        ("x", "x2", "width")
    };
    let secondary = channel.secondary().and_then(|c| secondary_ref(unit, c, ctx));
    if let Some(secondary) = secondary {
        set(channels, start, mid_point(unit, channel, ctx));
        set(channels, end, secondary);
    } else if span {
        set(channels, start, MarkEncodingSpec::value(0));
        set(channels, end, group_size(size));
    } else {
        set(channels, start, mid_point(unit, channel, ctx));
    }
}

pub fn encode(unit: &UnitModel, ctx: &mut CompileContext) -> Result<Channels> {
    let mut channels = Channels::new();
    let has = |c| unit.encoding.has(c);
    let has_x = has(Channel::X) || has(Channel::X2);
    let has_y = has(Channel::Y) || has(Channel::Y2);

    // A rule with only x is vertical and spans the height; only y spans the width
    position(unit, Channel::X, has_y && !has_x, ctx, &mut channels);
    position(unit, Channel::Y, has_x && !has_y, ctx, &mut channels);

    mixins::color(unit, ctx, &mut channels)?;
    channels.remove("fill");
    mixins::opacity(unit, ctx, &mut channels)?;
    mixins::size(unit, "strokeWidth", None, ctx, &mut channels)?;
    Ok(channels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::model::BuildScope;
    use crate::vl::config::Config;
    use crate::vl::spec::UnitSpec;
    use serde_json::json;

    #[test]
    fn test_vertical_rule_spans_height() {
        let mut ctx = CompileContext::new(Config::from_layers(&[]).unwrap());
        let spec: UnitSpec = serde_json::from_value(json!({
            "mark": "rule",
            "encoding": {"x": {"value": 10}}
        }))
        .unwrap();
        let unit = UnitModel::new(spec, BuildScope::root(), &mut ctx).unwrap();
        let encoded = serde_json::to_value(encode(&unit, &mut ctx).unwrap()).unwrap();
        assert_eq!(encoded["x"], json!({"value": 10}));
        assert_eq!(encoded["y"], json!({"value": 0}));
        assert_eq!(encoded["y2"], json!({"field": {"group": "height"}}));
        assert_eq!(encoded["stroke"], json!({"value": "#4c78a8"}));
    }
}

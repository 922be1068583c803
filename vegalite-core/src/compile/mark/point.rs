//! Point-like marks positioned at a single x/y: symbols and text
use crate::compile::context::CompileContext;
use crate::compile::mark::mixins;
use crate::compile::mark::valueref::mid_point;
use crate::compile::mark::Channels;
use crate::compile::model::unit::UnitModel;
use crate::error::Result;
use crate::spec::mark::MarkEncodingSpec;
use crate::vl::channel::Channel;
use crate::vl::mark::MarkType;
use serde_json::Value;

fn position(unit: &UnitModel, ctx: &CompileContext, channels: &mut Channels) {
    channels.insert("x".to_string(), mid_point(unit, Channel::X, ctx).into());
    channels.insert("y".to_string(), mid_point(unit, Channel::Y, ctx).into());
}

/// Symbols of point, circle and square marks
pub fn encode(unit: &UnitModel, ctx: &mut CompileContext) -> Result<Channels> {
    let mut channels = Channels::new();
    position(unit, ctx, &mut channels);
    mixins::color(unit, ctx, &mut channels)?;
    mixins::opacity(unit, ctx, &mut channels)?;
    mixins::size(unit, "size", None, ctx, &mut channels)?;

    let shape = match unit.mark {
        MarkType::Circle => Some(Value::from("circle")),
        MarkType::Square => Some(Value::from("square")),
        _ => ctx.config.mark_property(MarkType::Point, "shape").cloned(),
    };
    if let Some(shape) = mixins::nonposition(unit, Channel::Shape, shape, ctx)? {
        channels.insert("shape".to_string(), shape);
    }
    Ok(channels)
}

pub fn encode_text(unit: &UnitModel, ctx: &mut CompileContext) -> Result<Channels> {
    let mut channels = Channels::new();
    position(unit, ctx, &mut channels);
    mixins::color(unit, ctx, &mut channels)?;
    mixins::opacity(unit, ctx, &mut channels)?;
    mixins::text(unit, ctx, &mut channels)?;
    mixins::size(unit, "fontSize", None, ctx, &mut channels)?;
    if !channels.contains_key("align") && !unit.mark_def.extra.contains_key("align") {
        channels.insert("align".to_string(), MarkEncodingSpec::value("center").into());
    }
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
    fn test_filled_point_without_fields() {
        let mut ctx = CompileContext::new(Config::from_layers(&[]).unwrap());
        let spec: UnitSpec =
            serde_json::from_value(json!({"mark": {"type": "point", "filled": true}})).unwrap();
        let unit = UnitModel::new(spec, BuildScope::root(), &mut ctx).unwrap();
        let channels = encode(&unit, &mut ctx).unwrap();
        let encoded = serde_json::to_value(&channels).unwrap();
        assert_eq!(encoded["fill"], json!({"value": "#4c78a8"}));
        assert_eq!(encoded["opacity"], json!({"value": 0.7}));
        assert_eq!(encoded["x"], json!({"field": {"group": "width"}, "mult": 0.5}));
        assert!(encoded.get("stroke").is_none());
    }
}

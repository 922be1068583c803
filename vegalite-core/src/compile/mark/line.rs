//! Lines and areas
use crate::compile::context::CompileContext;
use crate::compile::mark::mixins;
use crate::compile::mark::valueref::{mid_point, secondary_ref, stack_ref, zero_ref};
use crate::compile::mark::{orient, Channels};
use crate::compile::model::unit::UnitModel;
use crate::error::Result;
use crate::spec::mark::MarkEncodingSpec;
use crate::vl::channel::Channel;
use crate::vl::mark::{MarkType, Orient};

/// Baseline of an area along its measure channel
fn area_baseline(unit: &UnitModel, measure: Channel, ctx: &CompileContext) -> MarkEncodingSpec {
    let stacked = unit
        .stack
        .as_ref()
        .filter(|s| s.field_channel == measure)
        .and_then(|_| unit.encoding.field_def(measure));
    if let Some(def) = stacked {
        return stack_ref(unit, measure, def, "start", ctx);
    }
    measure
        .secondary()
        .and_then(|c| secondary_ref(unit, c, ctx))
        .unwrap_or_else(|| zero_ref(unit, measure, ctx))
}

pub fn encode(unit: &UnitModel, ctx: &mut CompileContext) -> Result<Channels> {
    let mut channels = Channels::new();
    channels.insert("x".to_string(), mid_point(unit, Channel::X, ctx).into());
    channels.insert("y".to_string(), mid_point(unit, Channel::Y, ctx).into());

    if unit.mark == MarkType::Area {
        let (measure, end, orient_value) = match orient(unit) {
            Orient::Vertical => (Channel::Y, "y2", "vertical"),
            Orient::Horizontal => (Channel::X, "x2", "horizontal"),
        };
        channels.insert(end.to_string(), area_baseline(unit, measure, ctx).into());
        channels.insert(
            "orient".to_string(),
            MarkEncodingSpec::value(orient_value).into(),
        );
        mixins::color(unit, ctx, &mut channels)?;
    } else {
        mixins::color(unit, ctx, &mut channels)?;
        // Lines are stroked only
        channels.remove("fill");
        mixins::size(unit, "strokeWidth", None, ctx, &mut channels)?;
    }
    mixins::opacity(unit, ctx, &mut channels)?;
    mixins::defined(unit, ctx, &mut channels);
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
    fn test_line_is_stroked() {
        let mut ctx = CompileContext::new(Config::from_layers(&[]).unwrap());
        let spec: UnitSpec = serde_json::from_value(json!({"mark": "line"})).unwrap();
        let unit = UnitModel::new(spec, BuildScope::root(), &mut ctx).unwrap();
        let encoded = serde_json::to_value(encode(&unit, &mut ctx).unwrap()).unwrap();
        assert_eq!(encoded["stroke"], json!({"value": "#4c78a8"}));
        assert!(encoded.get("fill").is_none());
        assert!(encoded.get("y2").is_none());
    }
}

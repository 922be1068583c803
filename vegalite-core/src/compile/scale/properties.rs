use crate::compile::log::{message, Diagnostics};
use crate::compile::split::Split;
use crate::vl::channel::Channel;
use crate::vl::config::Config;
use crate::vl::fielddef::{FieldDef, FieldType};
use crate::vl::mark::MarkType;
use crate::vl::scale::ScaleType;
use serde_json::Value;

fn supports_property(prop: &str, scale_type: ScaleType, channel: Channel) -> bool {
    match prop {
        "paddingInner" | "paddingOuter" => scale_type == ScaleType::Band,
        "padding" => scale_type.is_discrete() || channel.is_position(),
        "zero" => scale_type.supports_zero() || scale_type == ScaleType::Log,
        "nice" | "clamp" => scale_type.is_continuous() && !scale_type.is_bin(),
        _ => true,
    }
}

/// Padding, zero, nice and the other scale properties of `channel`
pub fn parse_properties(
    def: &FieldDef,
    channel: Channel,
    scale_type: ScaleType,
    mark: MarkType,
    has_explicit_domain: bool,
    config: &Config,
    diagnostics: &mut Diagnostics,
) -> Split {
    let mut props = Split::new();

    if let Some(scale) = def.scale_def() {
        let explicit: Vec<(&str, Option<Value>)> = vec![
            ("padding", scale.padding.map(Value::from)),
            ("paddingInner", scale.padding_inner.map(Value::from)),
            ("paddingOuter", scale.padding_outer.map(Value::from)),
            ("zero", scale.zero.map(Value::from)),
            ("nice", scale.nice.clone()),
            ("round", scale.round.map(Value::from)),
            ("reverse", scale.reverse.map(Value::from)),
            ("clamp", scale.clamp.map(Value::from)),
        ];
        for (prop, value) in explicit {
            let Some(value) = value else { continue };
            if supports_property(prop, scale_type, channel) {
                props.set(prop, value, true);
            } else {
                diagnostics.warn(message::scale_property_not_work_with_scale_type(
                    scale_type, prop, channel,
                ));
            }
        }
        for (prop, value) in &scale.extra {
            props.set(prop.as_str(), value.clone(), true);
        }
    }

    if channel.is_position() {
        match scale_type {
            ScaleType::Band if props.get("padding").is_none() => {
                let inner = match mark {
                    MarkType::Bar => config.scale.bar_band_padding_inner,
                    MarkType::Rect => config.scale.rect_band_padding_inner,
                    _ => config.scale.band_padding_inner,
                };
                props.set_if_implicit("paddingInner", inner);
                props.set_if_implicit("paddingOuter", config.band_padding_outer());
            }
            ScaleType::Point => props.set_if_implicit("padding", config.scale.point_padding),
            t if t.is_continuous() && matches!(mark, MarkType::Bar | MarkType::Rect | MarkType::Tick) => {
                if let Some(padding) = config.scale.continuous_padding {
                    props.set_if_implicit("padding", padding);
                }
            }
            _ => {}
        }
    }

    let quantitative = def.field_type() == Some(FieldType::Quantitative);
    let zero_channel = channel.is_position()
        || matches!(channel, Channel::Size | Channel::Theta | Channel::Radius);
    if zero_channel
        && quantitative
        && scale_type.supports_zero()
        && !def.is_binned()
        && !has_explicit_domain
    {
        props.set_if_implicit("zero", true);
    }

    if channel.is_position()
        && matches!(
            scale_type,
            ScaleType::Linear | ScaleType::Log | ScaleType::Pow | ScaleType::Sqrt
        )
        && !has_explicit_domain
    {
        props.set_if_implicit("nice", true);
    }
    props
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(def: Value, channel: Channel, scale_type: ScaleType, mark: MarkType) -> (Value, Diagnostics) {
        let def: FieldDef = serde_json::from_value(def).unwrap();
        let config = Config::from_layers(&[]).unwrap();
        let mut diagnostics = Diagnostics::new();
        let props = parse_properties(&def, channel, scale_type, mark, false, &config, &mut diagnostics);
        (Value::Object(props.combine()), diagnostics)
    }

    #[test]
    fn test_band_padding_for_bars() {
        let (props, _) = parse(
            json!({"field": "a", "type": "nominal"}),
            Channel::X,
            ScaleType::Band,
            MarkType::Bar,
        );
        assert_eq!(props, json!({"paddingInner": 0.1, "paddingOuter": 0.05}));
    }

    #[test]
    fn test_quantitative_position_zero_and_nice() {
        let (props, _) = parse(
            json!({"field": "b", "type": "quantitative", "aggregate": "sum"}),
            Channel::Y,
            ScaleType::Linear,
            MarkType::Bar,
        );
        assert_eq!(props, json!({"nice": true, "zero": true}));
    }

    #[test]
    fn test_explicit_zero_wins() {
        let (props, _) = parse(
            json!({"field": "b", "type": "quantitative", "scale": {"zero": false}}),
            Channel::Y,
            ScaleType::Linear,
            MarkType::Point,
        );
        assert_eq!(props["zero"], json!(false));
    }

    #[test]
    fn test_unsupported_property_dropped() {
        let (props, diagnostics) = parse(
            json!({"field": "a", "type": "nominal", "scale": {"paddingInner": 0.3}}),
            Channel::X,
            ScaleType::Point,
            MarkType::Point,
        );
        assert!(props.get("paddingInner").is_none());
        assert_eq!(props["padding"], json!(0.5));
        assert_eq!(diagnostics.warnings().len(), 1);
    }
}

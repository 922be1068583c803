use crate::compile::log::{message, Diagnostics};
use crate::error::{Result, VegaLiteError};
use crate::vl::channel::Channel;
use crate::vl::fielddef::{FieldDef, FieldType};
use crate::vl::mark::MarkType;
use crate::vl::scale::ScaleType;

/// Scale type implied by the channel, field and mark
pub fn default_scale_type(channel: Channel, def: &FieldDef, mark: MarkType) -> ScaleType {
    match def.field_type().unwrap_or(FieldType::Nominal) {
        FieldType::Nominal | FieldType::Ordinal => discrete_type(channel, mark),
        FieldType::Temporal => {
            if channel.is_color() {
                ScaleType::Sequential
            } else if channel.has_discrete_range() {
                ScaleType::Ordinal
            } else if def.time_unit.as_ref().map(|u| u.utc).unwrap_or(false) {
                ScaleType::Utc
            } else {
                ScaleType::Time
            }
        }
        FieldType::Quantitative => {
            if def.is_binned() {
                if channel.is_position() || matches!(channel, Channel::Size | Channel::Opacity) {
                    ScaleType::BinLinear
                } else if channel.has_discrete_range() {
                    ScaleType::Ordinal
                } else {
                    ScaleType::BinOrdinal
                }
            } else if channel.is_color() {
                ScaleType::Sequential
            } else if channel.has_discrete_range() {
                ScaleType::Ordinal
            } else if channel == Channel::Radius {
                ScaleType::Sqrt
            } else {
                ScaleType::Linear
            }
        }
    }
}

fn discrete_type(channel: Channel, mark: MarkType) -> ScaleType {
    match channel {
        Channel::X | Channel::Y | Channel::Theta => {
            if mark.prefers_band() || channel == Channel::Theta {
                ScaleType::Band
            } else {
                ScaleType::Point
            }
        }
        Channel::Size | Channel::Opacity | Channel::Radius => ScaleType::Point,
        _ => ScaleType::Ordinal,
    }
}

fn works_with_channel(scale_type: ScaleType, channel: Channel) -> bool {
    match channel {
        Channel::X | Channel::Y | Channel::Theta | Channel::Radius => !matches!(
            scale_type,
            ScaleType::Ordinal | ScaleType::Sequential | ScaleType::BinOrdinal
        ),
        Channel::Shape => scale_type == ScaleType::Ordinal,
        Channel::Size | Channel::Opacity => !matches!(scale_type, ScaleType::Band),
        _ => !matches!(scale_type, ScaleType::Band | ScaleType::Point),
    }
}

fn works_with_field_def(scale_type: ScaleType, def: &FieldDef) -> bool {
    match def.field_type().unwrap_or(FieldType::Nominal) {
        FieldType::Nominal => scale_type.has_discrete_domain(),
        FieldType::Ordinal => scale_type.has_discrete_domain(),
        FieldType::Temporal => {
            scale_type.is_time() || scale_type.is_discrete() || scale_type == ScaleType::Sequential
        }
        FieldType::Quantitative => {
            if def.is_binned() {
                scale_type.is_bin() || scale_type.is_discrete()
            } else {
                !scale_type.is_bin() && !scale_type.is_time()
            }
        }
    }
}

/// Resolve the scale type of `channel`, checking an explicit type against the channel
/// and field. `has_range_step` tells whether a discrete position range would be
/// sized by a step.
pub fn scale_type(
    channel: Channel,
    def: &FieldDef,
    mark: MarkType,
    has_range_step: bool,
    diagnostics: &mut Diagnostics,
) -> Result<ScaleType> {
    let default = default_scale_type(channel, def, mark);
    let resolved = match def.scale_def().and_then(|s| s.type_) {
        None => default,
        // An ordinal position scale means its discrete position equivalent
        Some(ScaleType::Ordinal) if channel.is_position() => {
            let discrete = discrete_type(channel, mark);
            diagnostics.warn(message::scale_type_not_work_with_channel(
                channel,
                ScaleType::Ordinal,
                discrete,
            ));
            discrete
        }
        Some(explicit) if !works_with_channel(explicit, channel) => {
            diagnostics.warn(message::scale_type_not_work_with_channel(
                channel, explicit, default,
            ));
            default
        }
        Some(explicit) if !works_with_field_def(explicit, def) => {
            diagnostics.warn(message::scale_type_not_work_with_field_def(explicit, default));
            default
        }
        Some(explicit) => explicit,
    };

    if channel.is_position()
        && resolved == ScaleType::Point
        && matches!(mark, MarkType::Rect | MarkType::Bar)
        && !has_range_step
    {
        return Err(VegaLiteError::compilation(
            message::scale_type_not_work_with_mark(mark, resolved),
        ));
    }
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::{json, Value};

    fn def(v: Value) -> FieldDef {
        serde_json::from_value(v).unwrap()
    }

    #[rstest(
        channel,
        mark,
        field_def,
        expected,
        case(Channel::X, MarkType::Bar, json!({"field": "a", "type": "nominal"}), ScaleType::Band),
        case(Channel::X, MarkType::Point, json!({"field": "a", "type": "ordinal"}), ScaleType::Point),
        case(Channel::Color, MarkType::Point, json!({"field": "a", "type": "nominal"}), ScaleType::Ordinal),
        case(Channel::Shape, MarkType::Point, json!({"field": "a", "type": "nominal"}), ScaleType::Ordinal),
        case(Channel::Size, MarkType::Point, json!({"field": "a", "type": "ordinal"}), ScaleType::Point),
        case(Channel::Y, MarkType::Line, json!({"field": "a", "type": "temporal"}), ScaleType::Time),
        case(Channel::X, MarkType::Line, json!({"field": "a", "type": "temporal", "timeUnit": "utcmonth"}), ScaleType::Utc),
        case(Channel::Color, MarkType::Rect, json!({"field": "a", "type": "quantitative"}), ScaleType::Sequential),
        case(Channel::X, MarkType::Bar, json!({"field": "a", "type": "quantitative", "bin": true}), ScaleType::BinLinear),
        case(Channel::Color, MarkType::Point, json!({"field": "a", "type": "quantitative", "bin": true}), ScaleType::BinOrdinal),
        case(Channel::Y, MarkType::Point, json!({"field": "a", "type": "quantitative"}), ScaleType::Linear),
        case(Channel::Radius, MarkType::Arc, json!({"field": "a", "type": "quantitative"}), ScaleType::Sqrt)
    )]
    fn test_default_scale_type(channel: Channel, mark: MarkType, field_def: Value, expected: ScaleType) {
        assert_eq!(default_scale_type(channel, &def(field_def), mark), expected);
    }

    #[test]
    fn test_explicit_type_kept_when_valid() {
        let field_def = def(json!({"field": "a", "type": "quantitative", "scale": {"type": "log"}}));
        let mut diagnostics = Diagnostics::new();
        let t = scale_type(Channel::Y, &field_def, MarkType::Point, true, &mut diagnostics).unwrap();
        assert_eq!(t, ScaleType::Log);
        assert!(diagnostics.warnings().is_empty());
    }

    #[test]
    fn test_explicit_type_incompatible_with_field_falls_back() {
        let field_def = def(json!({"field": "a", "type": "nominal", "scale": {"type": "linear"}}));
        let mut diagnostics = Diagnostics::new();
        let t = scale_type(Channel::Color, &field_def, MarkType::Point, true, &mut diagnostics).unwrap();
        assert_eq!(t, ScaleType::Ordinal);
        assert_eq!(diagnostics.warnings().len(), 1);
    }

    #[test]
    fn test_ordinal_on_position_becomes_discrete_position() {
        let field_def = def(json!({
            "field": "a", "type": "quantitative", "bin": true, "scale": {"type": "ordinal"}
        }));
        let mut diagnostics = Diagnostics::new();
        let t = scale_type(Channel::X, &field_def, MarkType::Bar, true, &mut diagnostics).unwrap();
        assert_eq!(t, ScaleType::Band);
    }

    #[test]
    fn test_rect_with_point_scale_without_step_fails() {
        let field_def = def(json!({"field": "a", "type": "nominal", "scale": {"type": "point"}}));
        let err = scale_type(Channel::X, &field_def, MarkType::Rect, false, &mut Diagnostics::new())
            .unwrap_err();
        assert!(err.to_string().contains("rect"));
        assert!(err.to_string().contains("point"));
    }
}

//! Width and height of views, and the signals carrying them
use crate::compile::context::CompileContext;
use crate::compile::log::Diagnostics;
use crate::compile::model::unit::UnitModel;
use crate::compile::model::Model;
use crate::compile::names::NameMap;
use crate::compile::scale::{RangeDef, ScaleComponent};
use crate::compile::split::{default_tie_breaker, merge_values_with_explicit, Explicit};
use crate::spec::signal::SignalSpec;
use crate::vl::channel::Channel;
use crate::vl::mark::MarkType;
use crate::vl::scale::ScaleType;
use serde_json::{json, Value};
use std::fmt;
use vegalite_common::escape::string_value;

const DEFAULT_RANGE_STEP: f64 = 21.0;

#[derive(Debug, Clone, PartialEq)]
pub enum LayoutSize {
    Fixed(f64),
    /// Grows with the cardinality of the discrete scale `scale` (a local name)
    Step { scale: String, step: f64 },
    /// Owned by the parent the size was merged into
    Merged,
}

impl fmt::Display for LayoutSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutSize::Fixed(size) => write!(f, "{size}"),
            LayoutSize::Step { scale, step } => write!(f, "step {step} of scale {scale}"),
            LayoutSize::Merged => f.write_str("merged"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayoutSizeComponent {
    pub width: Option<Explicit<LayoutSize>>,
    pub height: Option<Explicit<LayoutSize>>,
}

impl LayoutSizeComponent {
    pub fn get(&self, channel: Channel) -> Option<&Explicit<LayoutSize>> {
        if channel == Channel::Y {
            self.height.as_ref()
        } else {
            self.width.as_ref()
        }
    }

    pub fn set(&mut self, channel: Channel, size: Option<Explicit<LayoutSize>>) {
        if channel == Channel::Y {
            self.height = size;
        } else {
            self.width = size;
        }
    }
}

pub fn size_type(channel: Channel) -> &'static str {
    if channel == Channel::Y {
        "height"
    } else {
        "width"
    }
}

/// Size of a unit along `channel` (x for width, y for height)
pub fn parse_unit_size(unit: &UnitModel, channel: Channel, ctx: &CompileContext) -> Explicit<LayoutSize> {
    let fixed = if channel == Channel::Y {
        unit.fixed_height
    } else {
        unit.fixed_width
    };
    if let Some(size) = fixed {
        return Explicit::explicit(LayoutSize::Fixed(size));
    }

    let view = if channel == Channel::Y {
        ctx.config.view.height
    } else {
        ctx.config.view.width
    };
    if !unit.scale_types.contains_key(&channel) {
        let size = if channel == Channel::X && unit.mark == MarkType::Text {
            ctx.config.scale.text_x_range_step
        } else {
            ctx.config.scale.range_step.unwrap_or(DEFAULT_RANGE_STEP)
        };
        return Explicit::implicit(LayoutSize::Fixed(size));
    }

    let local = unit.scale_name(channel);
    match ctx.scale(&local) {
        Some(scale) if scale.scale_type().has_discrete_domain() => match &scale.range {
            Some(Explicit {
                value: RangeDef::Step(step),
                ..
            }) => Explicit::implicit(LayoutSize::Step {
                scale: local,
                step: *step,
            }),
            _ => Explicit::implicit(LayoutSize::Fixed(view)),
        },
        _ => Explicit::implicit(LayoutSize::Fixed(view)),
    }
}

/// Size shared by the children of a layer. Step sizes are compared by the scale
/// their local scale name was merged into.
pub fn merge_sizes(
    sizes: Vec<Explicit<LayoutSize>>,
    size_type: &str,
    scale_names: &NameMap,
    diagnostics: &mut Diagnostics,
) -> Option<Explicit<LayoutSize>> {
    sizes
        .into_iter()
        .map(|size| match size.value {
            LayoutSize::Step { scale, step } => Explicit::new(
                LayoutSize::Step {
                    scale: scale_names.get(&scale),
                    step,
                },
                size.explicit,
            ),
            _ => size,
        })
        .reduce(|merged, size| {
            merge_values_with_explicit(merged, size, diagnostics, default_tie_breaker(size_type, "layout"))
        })
}

fn number(v: Option<&Value>) -> Option<f64> {
    v.and_then(|v| v.as_f64())
}

/// `bandspace(...) * step` expression sizing a view by its discrete scale
pub fn step_size_expr(name: &str, scale: &ScaleComponent, step: f64) -> String {
    let padding = number(scale.props.get("padding"));
    let outer = number(scale.props.get("paddingOuter"))
        .or(padding)
        .unwrap_or(0.0);
    let inner = if scale.scale_type() == ScaleType::Band {
        number(scale.props.get("paddingInner"))
            .or(padding)
            .unwrap_or(0.0)
    } else {
        1.0
    };
    format!(
        "bandspace(domain({}).length, {inner}, {outer}) * {step}",
        string_value(name).replace('"', "'")
    )
}

fn size_signal(name: String, size: &LayoutSize, ctx: &CompileContext) -> Option<SignalSpec> {
    match size {
        LayoutSize::Fixed(value) => Some(SignalSpec::new(name).with_value(json!(value))),
        LayoutSize::Step { scale, step } => {
            let component = ctx.scale(scale)?;
            let scale_name = ctx.scale_names.get(scale);
            Some(SignalSpec::new(name).with_update(step_size_expr(&scale_name, component, *step)))
        }
        LayoutSize::Merged => None,
    }
}

/// Signals of every owned size in the subtree. A fixed size of the root is emitted as
/// the chart width or height instead.
pub fn assemble_size_signals(
    model: &Model,
    is_root: bool,
    ctx: &CompileContext,
    signals: &mut Vec<SignalSpec>,
) {
    for channel in [Channel::X, Channel::Y] {
        let base = model.base();
        let Some(size) = base.component.layout_size.get(channel) else {
            continue;
        };
        if is_root && matches!(size.value, LayoutSize::Fixed(_)) {
            continue;
        }
        let name = ctx.size_names.get(&base.get_name(size_type(channel)));
        if let Some(signal) = size_signal(name, &size.value, ctx) {
            signals.push(signal);
        }
    }
    for child in model.children() {
        assemble_size_signals(child, false, ctx, signals);
    }
}

/// Fixed width and height of the root view
pub fn root_size(model: &Model) -> (Option<Value>, Option<Value>) {
    let fixed = |channel| match model.base().component.layout_size.get(channel) {
        Some(Explicit {
            value: LayoutSize::Fixed(size),
            ..
        }) => Some(json!(size)),
        _ => None,
    };
    (fixed(Channel::X), fixed(Channel::Y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::split::Split;

    fn band_scale() -> ScaleComponent {
        let mut props = Split::new();
        props.set("paddingInner", 0.1, false);
        props.set("paddingOuter", 0.05, false);
        ScaleComponent {
            name: "x".to_string(),
            channel: Channel::X,
            type_: Explicit::implicit(ScaleType::Band),
            domains: vec![],
            domain_explicit: false,
            domain_raw: None,
            range: Some(Explicit::implicit(RangeDef::Step(21.0))),
            props,
        }
    }

    #[test]
    fn test_step_size_expression() {
        assert_eq!(
            step_size_expr("x", &band_scale(), 21.0),
            "bandspace(domain('x').length, 0.1, 0.05) * 21"
        );

        let mut point = band_scale();
        point.type_ = Explicit::implicit(ScaleType::Point);
        point.props = Split::new();
        point.props.set("padding", 0.5, false);
        assert_eq!(
            step_size_expr("x", &point, 21.0),
            "bandspace(domain('x').length, 1, 0.5) * 21"
        );
    }

    #[test]
    fn test_explicit_size_wins_merge() {
        let mut diagnostics = Diagnostics::new();
        let merged = merge_sizes(
            vec![
                Explicit::implicit(LayoutSize::Fixed(200.0)),
                Explicit::explicit(LayoutSize::Fixed(300.0)),
            ],
            "width",
            &NameMap::new(),
            &mut diagnostics,
        );
        assert_eq!(merged.map(|m| m.value), Some(LayoutSize::Fixed(300.0)));
        assert!(diagnostics.warnings().is_empty());
    }

    #[test]
    fn test_steps_of_one_merged_scale_agree() {
        let mut scale_names = NameMap::new();
        scale_names.rename("layer_0_x", "x");
        scale_names.rename("layer_1_x", "x");
        let step = |scale: &str| {
            Explicit::implicit(LayoutSize::Step {
                scale: scale.to_string(),
                step: 21.0,
            })
        };
        let mut diagnostics = Diagnostics::new();
        let merged = merge_sizes(
            vec![step("layer_0_x"), step("layer_1_x")],
            "width",
            &scale_names,
            &mut diagnostics,
        );
        assert_eq!(
            merged.map(|m| m.value),
            Some(LayoutSize::Step {
                scale: "x".to_string(),
                step: 21.0
            })
        );
        assert!(diagnostics.warnings().is_empty());
    }

    #[test]
    fn test_conflicting_fixed_sizes_warn() {
        let mut diagnostics = Diagnostics::new();
        merge_sizes(
            vec![
                Explicit::explicit(LayoutSize::Fixed(200.0)),
                Explicit::explicit(LayoutSize::Fixed(300.0)),
            ],
            "width",
            &NameMap::new(),
            &mut diagnostics,
        );
        assert_eq!(
            diagnostics.warnings(),
            vec!["Conflicting layout property \"width\" (200 and 300). Using 200."]
        );
    }
}

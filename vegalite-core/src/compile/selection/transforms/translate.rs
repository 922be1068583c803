use crate::compile::selection::events::parse_selector;
use crate::compile::selection::interval::BRUSH;
use crate::compile::selection::transforms::{find_signal, TransformCompiler};
use crate::compile::selection::{SelectionAssemblyScope, SelectionComponent};
use crate::error::{Result, ResultWithContext};
use crate::spec::signal::{SignalOnEventSpec, SignalOnSpec, SignalSpec};
use crate::vl::channel::Channel;
use crate::vl::scale::ScaleType;
use crate::vl::selection::SelectionType;
use serde_json::json;
use vegalite_common::escape::string_value;

const ANCHOR: &str = "_translate_anchor";
const DELTA: &str = "_translate_delta";

/// Dragging an interval brush, or panning the scales it is bound to
pub struct Translate;

impl TransformCompiler for Translate {
    fn has(&self, selection: &SelectionComponent) -> bool {
        selection.type_ == SelectionType::Interval && selection.translate.is_some()
    }

    fn signals(
        &self,
        scope: &SelectionAssemblyScope,
        selection: &SelectionComponent,
        mut signals: Vec<SignalSpec>,
    ) -> Result<Vec<SignalSpec>> {
        let Some(translate) = &selection.translate else {
            return Ok(signals);
        };
        let name = &selection.name;
        let scale_bound = selection.is_scale_bound();
        let anchor = format!("{name}{ANCHOR}");
        let delta = format!("{name}{DELTA}");

        let mut events = parse_selector(translate, "scope")
            .with_context(|| format!("Parsing translate events of selection {name}"))?;
        let mut starts = Vec::new();
        for event in events.iter_mut() {
            if let SignalOnEventSpec::Source(source) = event {
                if let Some(start) = source.between.as_mut().and_then(|b| b.first_mut()) {
                    if !scale_bound {
                        *start = start.clone().with_markname(format!("{name}{BRUSH}"));
                    }
                    starts.push(start.clone());
                }
            }
        }

        let extent = |channel: Channel| -> Option<String> {
            let projection = selection.projection(channel)?;
            Some(if scale_bound {
                format!("domain({})", string_value(scope.scale_name(channel)?))
            } else {
                format!("slice({})", projection.visual_signal(name)?)
            })
        };
        let mut update = "{x: x(unit), y: y(unit)".to_string();
        for channel in [Channel::X, Channel::Y] {
            if let Some(extent) = extent(channel) {
                update.push_str(&format!(", extent_{channel}: {extent}"));
            }
        }
        update.push('}');

        signals.push(
            SignalSpec::new(&anchor)
                .with_value(json!({}))
                .with_on(SignalOnSpec::new(starts.into(), update)),
        );
        signals.push(
            SignalSpec::new(&delta).with_value(json!({})).with_on(SignalOnSpec::new(
                events.into(),
                format!("{{x: {anchor}.x - x(unit), y: {anchor}.y - y(unit)}}"),
            )),
        );

        for channel in [Channel::X, Channel::Y] {
            let Some(projection) = selection.projection(channel) else {
                continue;
            };
            let target = if scale_bound {
                Some(projection.data_signal(name))
            } else {
                projection.visual_signal(name)
            };
            let Some(index) = target.and_then(|t| find_signal(&signals, &t)) else {
                continue;
            };
            let size = scope.size(channel);
            let scale_type = scope.scale_type(channel);
            let sign = if scale_bound && channel == Channel::X {
                "-"
            } else {
                ""
            };
            let extent = format!("{anchor}.extent_{channel}");
            let offset = if scale_bound {
                format!("{sign}{delta}.{channel} / {size}")
            } else {
                format!("{sign}{delta}.{channel} / span({extent})")
            };
            let pan = match (scale_bound, scale_type) {
                (true, Some(ScaleType::Log)) => "panLog",
                (true, Some(ScaleType::Pow)) => "panPow",
                _ => "panLinear",
            };
            let exponent = match (scale_bound, scale_type) {
                (true, Some(ScaleType::Pow)) => format!(
                    ", {}",
                    scope
                        .scales
                        .get(&channel)
                        .and_then(|s| s.exponent)
                        .unwrap_or(1.0)
                ),
                _ => String::new(),
            };
            let update = format!("{pan}({extent}, {offset}{exponent})");
            signals[index].on.push(SignalOnSpec::new(
                SignalOnEventSpec::signal(&delta).into(),
                if scale_bound {
                    update
                } else {
                    format!("clampRange({update}, 0, {size})")
                },
            ));
        }
        Ok(signals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::selection::{
        assembly_scope_fixture, selection_fixture, Projection, ProjectionType,
    };
    use crate::vl::mark::MarkType;

    #[test]
    fn test_brush_translation() {
        let mut selection = selection_fixture("brush", SelectionType::Interval);
        selection.translate = Some("[mousedown, window:mouseup] > window:mousemove!".to_string());
        selection.project = vec![Projection {
            field: "a".to_string(),
            channel: Some(Channel::X),
            type_: ProjectionType::Range,
        }];
        let signals = Translate
            .signals(
                &assembly_scope_fixture(MarkType::Point),
                &selection,
                vec![SignalSpec::new("brush_x")],
            )
            .unwrap();
        let anchor = serde_json::to_value(&signals[1]).unwrap();
        assert_eq!(anchor["name"], "brush_translate_anchor");
        assert_eq!(anchor["on"][0]["events"][0]["markname"], "brush_brush");
        assert_eq!(
            anchor["on"][0]["update"],
            "{x: x(unit), y: y(unit), extent_x: slice(brush_x)}"
        );
        assert_eq!(
            signals[0].on[0].update,
            "clampRange(panLinear(brush_translate_anchor.extent_x, brush_translate_delta.x / span(brush_translate_anchor.extent_x)), 0, width)"
        );
    }
}

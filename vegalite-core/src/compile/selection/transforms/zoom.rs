use crate::compile::selection::events::parse_selector;
use crate::compile::selection::interval::BRUSH;
use crate::compile::selection::transforms::{find_signal, TransformCompiler};
use crate::compile::selection::{SelectionAssemblyScope, SelectionComponent};
use crate::error::{Result, ResultWithContext};
use crate::spec::signal::{SignalOnEventSpec, SignalOnSpec, SignalSpec};
use crate::vl::channel::Channel;
use crate::vl::scale::ScaleType;
use crate::vl::selection::SelectionType;
use vegalite_common::escape::string_value;

const ANCHOR: &str = "_zoom_anchor";
const DELTA: &str = "_zoom_delta";

/// Wheel zooming of an interval brush, or of the scales it is bound to
pub struct Zoom;

impl TransformCompiler for Zoom {
    fn has(&self, selection: &SelectionComponent) -> bool {
        selection.type_ == SelectionType::Interval && selection.zoom.is_some()
    }

    fn signals(
        &self,
        scope: &SelectionAssemblyScope,
        selection: &SelectionComponent,
        mut signals: Vec<SignalSpec>,
    ) -> Result<Vec<SignalSpec>> {
        let Some(zoom) = &selection.zoom else {
            return Ok(signals);
        };
        let name = &selection.name;
        let scale_bound = selection.is_scale_bound();
        let anchor = format!("{name}{ANCHOR}");
        let delta = format!("{name}{DELTA}");

        let mut events = parse_selector(zoom, "scope")
            .with_context(|| format!("Parsing zoom events of selection {name}"))?;
        if !scale_bound {
            events = events
                .into_iter()
                .map(|e| e.with_markname(format!("{name}{BRUSH}")))
                .collect();
        }

        let coord = |channel: Channel| -> String {
            match scope.scale_name(channel) {
                Some(scale) if scale_bound => {
                    format!("invert({}, {channel}(unit))", string_value(scale))
                }
                _ => format!("{channel}(unit)"),
            }
        };
        signals.push(
            SignalSpec::new(&anchor).with_on(SignalOnSpec::new(
                events.clone().into(),
                format!("{{x: {}, y: {}}}", coord(Channel::X), coord(Channel::Y)),
            )),
        );
        signals.push(
            SignalSpec::new(&delta).with_on(
                SignalOnSpec::new(
                    events.into(),
                    "pow(1.001, event.deltaY * pow(16, event.deltaMode))",
                )
                .forced(),
            ),
        );

        for channel in [Channel::X, Channel::Y] {
            let Some(projection) = selection.projection(channel) else {
                continue;
            };
            let (target, base) = if scale_bound {
                let Some(scale) = scope.scale_name(channel) else {
                    continue;
                };
                (
                    Some(projection.data_signal(name)),
                    format!("domain({})", string_value(scale)),
                )
            } else {
                let visual = projection.visual_signal(name);
                let base = visual.clone().unwrap_or_default();
                (visual, base)
            };
            let Some(index) = target.and_then(|t| find_signal(&signals, &t)) else {
                continue;
            };
            let scale_type = scope.scale_type(channel);
            let (zoom_fn, exponent) = match (scale_bound, scale_type) {
                (true, Some(ScaleType::Log)) => ("zoomLog", String::new()),
                (true, Some(ScaleType::Pow)) => (
                    "zoomPow",
                    format!(
                        ", {}",
                        scope
                            .scales
                            .get(&channel)
                            .and_then(|s| s.exponent)
                            .unwrap_or(1.0)
                    ),
                ),
                _ => ("zoomLinear", String::new()),
            };
            let update = format!("{zoom_fn}({base}, {anchor}.{channel}, {delta}{exponent})");
            let size = scope.size(channel);
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
        assembly_scope_fixture, selection_fixture, Projection, ProjectionType, ScaleInfo,
    };
    use crate::vl::mark::MarkType;
    use crate::vl::selection::SelectionBindDef;

    #[test]
    fn test_zoom_scale_bound_domain() {
        let mut selection = selection_fixture("grid", SelectionType::Interval);
        selection.zoom = Some("wheel!".to_string());
        selection.bind = Some(SelectionBindDef::Keyword("scales".to_string()));
        selection.project = vec![Projection {
            field: "Horsepower".to_string(),
            channel: Some(Channel::X),
            type_: ProjectionType::Range,
        }];
        let mut scope = assembly_scope_fixture(MarkType::Point);
        scope.scales.insert(
            Channel::X,
            ScaleInfo {
                name: "x".to_string(),
                type_: ScaleType::Linear,
                exponent: None,
            },
        );
        let signals = Zoom
            .signals(&scope, &selection, vec![SignalSpec::new("grid_Horsepower")])
            .unwrap();
        assert_eq!(
            signals[1].on[0].update,
            "{x: invert(\"x\", x(unit)), y: y(unit)}"
        );
        assert!(matches!(
            &signals[1].on[0].events.to_vec()[0],
            SignalOnEventSpec::Source(source) if source.markname.is_none()
        ));
        assert_eq!(signals[2].on[0].force, Some(true));
        assert_eq!(
            signals[0].on[0].update,
            "zoomLinear(domain(\"x\"), grid_zoom_anchor.x, grid_zoom_delta)"
        );
    }
}

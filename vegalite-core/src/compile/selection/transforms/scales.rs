use crate::compile::log::{message, Diagnostics};
use crate::compile::selection::transforms::{find_signal, TransformCompiler};
use crate::compile::selection::{SelectionAssemblyScope, SelectionComponent, UnitSelectionScope};
use crate::error::Result;
use crate::spec::signal::SignalSpec;
use crate::vl::selection::{SelectionResolution, SelectionType};
use serde_json::{json, Value};

/// Interval selections bound to the scales of their projected channels
pub struct Scales;

impl TransformCompiler for Scales {
    fn has(&self, selection: &SelectionComponent) -> bool {
        selection.type_ == SelectionType::Interval
            && selection.resolve == SelectionResolution::Global
            && selection.is_scale_bound()
    }

    fn parse(
        &self,
        selection: &mut SelectionComponent,
        scope: &UnitSelectionScope,
        diagnostics: &mut Diagnostics,
    ) -> Result<()> {
        let mut bound = Vec::new();
        for projection in &selection.project {
            let Some(channel) = projection.channel else {
                continue;
            };
            match scope.scale_types.get(&channel.scale_channel()) {
                Some(scale_type) if scale_type.is_continuous() && !scale_type.is_bin() => {
                    bound.push(channel)
                }
                _ => diagnostics.warn(message::scale_bindings_continuous()),
            }
        }
        selection.scales = bound;
        Ok(())
    }

    fn signals(
        &self,
        scope: &SelectionAssemblyScope,
        selection: &SelectionComponent,
        mut signals: Vec<SignalSpec>,
    ) -> Result<Vec<SignalSpec>> {
        // Nested units push their domains into the top-level signals
        if scope.nested {
            for channel in &selection.scales {
                let Some(projection) = selection.projection(*channel) else {
                    continue;
                };
                if let Some(index) = find_signal(&signals, &projection.data_signal(&selection.name)) {
                    let signal = &mut signals[index];
                    signal.push = Some("outer".to_string());
                    signal.value = None;
                    signal.update = None;
                }
            }
        }
        Ok(signals)
    }

    fn top_level_signals(
        &self,
        scope: &SelectionAssemblyScope,
        selection: &SelectionComponent,
        mut signals: Vec<SignalSpec>,
    ) -> Result<Vec<SignalSpec>> {
        if !scope.nested {
            return Ok(signals);
        }
        let data_signals: Vec<String> = selection
            .scales
            .iter()
            .filter_map(|channel| selection.projection(*channel))
            .map(|p| p.data_signal(&selection.name))
            .filter(|name| find_signal(&signals, name).is_none())
            .collect();
        if data_signals.is_empty() {
            return Ok(signals);
        }
        if let Some(index) = find_signal(&signals, &selection.name) {
            let mut update = "{".to_string();
            for (i, data_signal) in data_signals.iter().enumerate() {
                if i > 0 {
                    update.push_str(", ");
                }
                update.push_str(&format!("{}: {data_signal}", json!(field_of(selection, data_signal))));
            }
            update.push('}');
            signals[index].update = Some(update);
        }
        signals.extend(data_signals.into_iter().map(SignalSpec::new));
        Ok(signals)
    }
}

fn field_of(selection: &SelectionComponent, data_signal: &str) -> Value {
    selection
        .project
        .iter()
        .find(|p| p.data_signal(&selection.name) == data_signal)
        .map(|p| Value::String(p.field.clone()))
        .unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::selection::{
        assembly_scope_fixture, selection_fixture, Projection, ProjectionType,
    };
    use crate::vl::channel::Channel;
    use crate::vl::encoding::Encoding;
    use crate::vl::mark::MarkType;
    use crate::vl::scale::ScaleType;
    use crate::vl::selection::SelectionBindDef;
    use std::collections::BTreeMap;

    fn grid() -> SelectionComponent {
        let mut selection = selection_fixture("grid", SelectionType::Interval);
        selection.bind = Some(SelectionBindDef::Keyword("scales".to_string()));
        selection.project = vec![
            Projection {
                field: "Horsepower".to_string(),
                channel: Some(Channel::X),
                type_: ProjectionType::Range,
            },
            Projection {
                field: "Origin".to_string(),
                channel: Some(Channel::Y),
                type_: ProjectionType::Enumerated,
            },
        ];
        selection
    }

    #[test]
    fn test_only_continuous_scales_bind() {
        let mut selection = grid();
        let encoding = Encoding::default();
        let mut scale_types = BTreeMap::new();
        scale_types.insert(Channel::X, ScaleType::Linear);
        scale_types.insert(Channel::Y, ScaleType::Band);
        let scope = UnitSelectionScope {
            encoding: &encoding,
            scale_types: &scale_types,
            unit_name: "\"\"".to_string(),
        };
        let mut diagnostics = Diagnostics::new();
        Scales.parse(&mut selection, &scope, &mut diagnostics).unwrap();
        assert_eq!(selection.scales, vec![Channel::X]);
        assert_eq!(diagnostics.warnings().len(), 1);
    }

    #[test]
    fn test_nested_units_push_outer() {
        let mut selection = grid();
        selection.scales = vec![Channel::X];
        let mut scope = assembly_scope_fixture(MarkType::Point);
        scope.nested = true;
        let unit = Scales
            .signals(&scope, &selection, vec![SignalSpec::new("grid_Horsepower").with_update("[0, 1]")])
            .unwrap();
        assert_eq!(unit[0].push.as_deref(), Some("outer"));
        assert!(unit[0].update.is_none());

        let top = Scales
            .top_level_signals(&scope, &selection, vec![SignalSpec::new("grid")])
            .unwrap();
        assert_eq!(top[0].update.as_deref(), Some("{\"Horsepower\": grid_Horsepower}"));
        assert_eq!(top[1].name, "grid_Horsepower");
    }
}

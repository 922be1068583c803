use crate::compile::selection::multi::DATUM;
use crate::compile::selection::transforms::{find_signal, TransformCompiler};
use crate::compile::selection::{
    init_value, SelectionAssemblyScope, SelectionComponent, TUPLE, TUPLE_FIELDS,
};
use crate::error::Result;
use crate::spec::signal::{SignalOnSpec, SignalSpec};
use crate::vl::selection::{SelectionBindDef, SelectionResolution, SelectionType};
use serde_json::{Map, Value};
use vegalite_common::escape::string_value;

/// Single selections driven by input widgets bound to their data signals
pub struct Inputs;

fn bindings(selection: &SelectionComponent) -> Option<&Map<String, Value>> {
    match &selection.bind {
        Some(SelectionBindDef::Input(map)) => Some(map),
        _ => None,
    }
}

impl TransformCompiler for Inputs {
    fn has(&self, selection: &SelectionComponent) -> bool {
        selection.type_ == SelectionType::Single
            && selection.resolve == SelectionResolution::Global
            && bindings(selection).is_some()
    }

    fn top_level_signals(
        &self,
        _scope: &SelectionAssemblyScope,
        selection: &SelectionComponent,
        mut signals: Vec<SignalSpec>,
    ) -> Result<Vec<SignalSpec>> {
        let Some(bind) = bindings(selection) else {
            return Ok(signals);
        };
        let datum = if selection.nearest { DATUM } else { "datum" };
        for projection in &selection.project {
            let name = projection.data_signal(&selection.name);
            if find_signal(&signals, &name).is_some() {
                continue;
            }
            let value = selection
                .init
                .as_ref()
                .and_then(|init| init_value(init, projection))
                .cloned()
                .unwrap_or(Value::Null);
            let binding = bind
                .get(&projection.field)
                .or_else(|| projection.channel.and_then(|c| bind.get(c.name())))
                .cloned()
                .unwrap_or_else(|| Value::Object(bind.clone()));
            let mut signal = SignalSpec::new(name).with_value(value);
            if !selection.events.is_empty() {
                signal = signal.with_on(SignalOnSpec::new(
                    selection.events.clone().into(),
                    format!(
                        "datum && item().mark.marktype !== 'group' ? {datum}[{}] : null",
                        string_value(&projection.field)
                    ),
                ));
            }
            signal.bind = Some(binding);
            signals.insert(0, signal);
        }
        Ok(signals)
    }

    fn signals(
        &self,
        _scope: &SelectionAssemblyScope,
        selection: &SelectionComponent,
        mut signals: Vec<SignalSpec>,
    ) -> Result<Vec<SignalSpec>> {
        let name = &selection.name;
        let Some(index) = find_signal(&signals, &format!("{name}{TUPLE}")) else {
            return Ok(signals);
        };
        let values: Vec<String> = selection
            .project
            .iter()
            .map(|p| p.data_signal(name))
            .collect();
        let checks: Vec<String> = values.iter().map(|v| format!("{v} !== null")).collect();
        let tuple = &mut signals[index];
        tuple.update = Some(format!(
            "{} ? {{fields: {name}{TUPLE_FIELDS}, values: [{}]}} : null",
            checks.join(" && "),
            values.join(", ")
        ));
        tuple.on.clear();
        Ok(signals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::selection::events::parse_selector;
    use crate::compile::selection::{
        assembly_scope_fixture, selection_fixture, Projection, ProjectionType,
    };
    use crate::vl::mark::MarkType;
    use serde_json::json;

    fn cyl() -> SelectionComponent {
        let mut selection = selection_fixture("CylYr", SelectionType::Single);
        selection.events = parse_selector("mouseover", "scope").unwrap();
        selection.bind = serde_json::from_value(json!({
            "Cylinders": {"input": "range", "min": 3, "max": 8, "step": 1}
        }))
        .ok();
        selection.init = Some(json!({"Cylinders": 4}));
        selection.project = vec![Projection {
            field: "Cylinders".to_string(),
            channel: None,
            type_: ProjectionType::Enumerated,
        }];
        selection
    }

    #[test]
    fn test_input_signals_are_bound() {
        let selection = cyl();
        let scope = assembly_scope_fixture(MarkType::Point);
        let signals = Inputs
            .top_level_signals(&scope, &selection, vec![SignalSpec::new("CylYr")])
            .unwrap();
        let input = serde_json::to_value(&signals[0]).unwrap();
        assert_eq!(input["name"], "CylYr_Cylinders");
        assert_eq!(input["value"], 4);
        assert_eq!(input["bind"], json!({"input": "range", "min": 3, "max": 8, "step": 1}));
        assert_eq!(
            input["on"][0]["update"],
            "datum && item().mark.marktype !== 'group' ? datum[\"Cylinders\"] : null"
        );
    }

    #[test]
    fn test_tuple_reads_inputs() {
        let selection = cyl();
        let scope = assembly_scope_fixture(MarkType::Point);
        let signals = Inputs
            .signals(&scope, &selection, crate::compile::selection::multi::signals(&selection))
            .unwrap();
        assert!(signals[0].on.is_empty());
        assert_eq!(
            signals[0].update.as_deref(),
            Some("CylYr_Cylinders !== null ? {fields: CylYr_tuple_fields, values: [CylYr_Cylinders]} : null")
        );
    }
}

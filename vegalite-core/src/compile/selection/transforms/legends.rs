use crate::compile::log::{message, Diagnostics};
use crate::compile::selection::transforms::{find_signal, TransformCompiler};
use crate::compile::selection::{
    SelectionAssemblyScope, SelectionComponent, UnitSelectionScope, TUPLE, TUPLE_FIELDS,
};
use crate::error::Result;
use crate::spec::signal::{SignalOnEventSpec, SignalOnSpec, SignalSpec};
use crate::vl::fielddef::var_name;
use serde_json::Value;

/// Prefix of the legend encode blocks that select values of `field`
pub fn legend_prefix(field: &str) -> String {
    format!("{}_legend", var_name(field))
}

/// Selections bound to the legend of their single projected field
pub struct Legends;

impl Legends {
    fn legend_signal(selection: &SelectionComponent) -> Option<String> {
        let projection = selection.project.first()?;
        Some(format!(
            "{}_{}_legend",
            selection.name,
            var_name(&projection.field)
        ))
    }
}

impl TransformCompiler for Legends {
    fn has(&self, selection: &SelectionComponent) -> bool {
        selection.is_legend_bound()
    }

    fn parse(
        &self,
        selection: &mut SelectionComponent,
        _scope: &UnitSelectionScope,
        diagnostics: &mut Diagnostics,
    ) -> Result<()> {
        if selection.project.len() != 1 {
            diagnostics.warn(message::legend_bindings_require_projection(&selection.name));
            selection.bind = None;
        }
        Ok(())
    }

    fn top_level_signals(
        &self,
        _scope: &SelectionAssemblyScope,
        selection: &SelectionComponent,
        mut signals: Vec<SignalSpec>,
    ) -> Result<Vec<SignalSpec>> {
        let (Some(name), Some(projection)) =
            (Self::legend_signal(selection), selection.project.first())
        else {
            return Ok(signals);
        };
        if find_signal(&signals, &name).is_some() {
            return Ok(signals);
        }
        let prefix = legend_prefix(&projection.field);
        let clicks: Vec<SignalOnEventSpec> = ["symbols", "labels", "entries"]
            .iter()
            .map(|part| {
                SignalOnEventSpec::source("view", "click").with_markname(format!("{prefix}_{part}"))
            })
            .collect();
        let signal = SignalSpec::new(&name)
            .with_value(Value::Null)
            .with_on(
                SignalOnSpec::new(
                    clicks.into(),
                    "datum.value || item().items[0].items[0].datum.value",
                )
                .forced(),
            )
            .with_on(
                SignalOnSpec::new(
                    SignalOnEventSpec::source("view", "click").into(),
                    format!("!event.item || !datum ? null : {name}"),
                )
                .forced(),
            );
        signals.insert(0, signal);
        Ok(signals)
    }

    fn signals(
        &self,
        _scope: &SelectionAssemblyScope,
        selection: &SelectionComponent,
        mut signals: Vec<SignalSpec>,
    ) -> Result<Vec<SignalSpec>> {
        let Some(legend) = Self::legend_signal(selection) else {
            return Ok(signals);
        };
        if let Some(index) = find_signal(&signals, &format!("{}{TUPLE}", selection.name)) {
            signals[index].on.push(
                SignalOnSpec::new(
                    SignalOnEventSpec::signal(&legend).into(),
                    format!(
                        "{legend} !== null ? {{fields: {}{TUPLE_FIELDS}, values: [{legend}]}} : null",
                        selection.name
                    ),
                )
                .forced(),
            );
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
    use crate::vl::selection::{SelectionBindDef, SelectionType};

    fn origin() -> SelectionComponent {
        let mut selection = selection_fixture("industry", SelectionType::Multi);
        selection.bind = Some(SelectionBindDef::Keyword("legend".to_string()));
        selection.project = vec![Projection {
            field: "series".to_string(),
            channel: None,
            type_: ProjectionType::Enumerated,
        }];
        selection
    }

    #[test]
    fn test_legend_signal_listens_to_entries() {
        let scope = assembly_scope_fixture(MarkType::Area);
        let signals = Legends
            .top_level_signals(&scope, &origin(), vec![SignalSpec::new("industry")])
            .unwrap();
        assert_eq!(signals[0].name, "industry_series_legend");
        let events = serde_json::to_value(&signals[0].on[0].events).unwrap();
        assert_eq!(events[0]["markname"], "series_legend_symbols");
        assert_eq!(events[2]["markname"], "series_legend_entries");
    }

    #[test]
    fn test_tuple_follows_legend() {
        let scope = assembly_scope_fixture(MarkType::Area);
        let signals = Legends
            .signals(&scope, &origin(), vec![SignalSpec::new("industry_tuple")])
            .unwrap();
        assert_eq!(
            signals[0].on[0].update,
            "industry_series_legend !== null ? {fields: industry_tuple_fields, values: [industry_series_legend]} : null"
        );
    }
}

use crate::compile::selection::transforms::TransformCompiler;
use crate::compile::selection::{unit_scope_expr, SelectionAssemblyScope, SelectionComponent, TUPLE};
use crate::error::Result;
use crate::spec::signal::{SignalOnSpec, SignalSpec};
use crate::vl::selection::SelectionType;
use serde_json::json;

pub const TOGGLE: &str = "_toggle";

/// Shift-click style accumulation for multi selections
pub struct Toggle;

impl TransformCompiler for Toggle {
    fn has(&self, selection: &SelectionComponent) -> bool {
        selection.type_ == SelectionType::Multi && selection.toggle.is_some()
    }

    fn signals(
        &self,
        _scope: &SelectionAssemblyScope,
        selection: &SelectionComponent,
        mut signals: Vec<SignalSpec>,
    ) -> Result<Vec<SignalSpec>> {
        let mut toggle = SignalSpec::new(format!("{}{TOGGLE}", selection.name)).with_value(json!(false));
        if let Some(expr) = &selection.toggle {
            if !selection.events.is_empty() {
                toggle = toggle.with_on(SignalOnSpec::new(selection.events.clone().into(), expr));
            }
        }
        signals.push(toggle);
        Ok(signals)
    }

    fn modify_expr(&self, selection: &SelectionComponent, _expr: String) -> String {
        let tuple = format!("{}{TUPLE}", selection.name);
        let toggle = format!("{}{TOGGLE}", selection.name);
        format!(
            "{toggle} ? null : {tuple}, {toggle} ? null : {}, {toggle} ? {tuple} : null",
            unit_scope_expr(selection)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::selection::selection_fixture;
    use crate::vl::selection::SelectionResolution;

    #[test]
    fn test_modify_expr() {
        let mut selection = selection_fixture("paintbrush", SelectionType::Multi);
        selection.toggle = Some("event.shiftKey".to_string());
        assert_eq!(
            Toggle.modify_expr(&selection, String::new()),
            "paintbrush_toggle ? null : paintbrush_tuple, paintbrush_toggle ? null : true, paintbrush_toggle ? paintbrush_tuple : null"
        );

        selection.resolve = SelectionResolution::Union;
        assert_eq!(
            Toggle.modify_expr(&selection, String::new()),
            "paintbrush_toggle ? null : paintbrush_tuple, paintbrush_toggle ? null : {unit: \"\"}, paintbrush_toggle ? paintbrush_tuple : null"
        );
    }
}

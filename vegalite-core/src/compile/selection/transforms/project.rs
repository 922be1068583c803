use crate::compile::selection::transforms::{find_signal, TransformCompiler};
use crate::compile::selection::{SelectionAssemblyScope, SelectionComponent, TUPLE_FIELDS};
use crate::error::Result;
use crate::spec::signal::SignalSpec;

/// Declares the projected fields referenced by every stored tuple
pub struct Project;

impl TransformCompiler for Project {
    fn has(&self, selection: &SelectionComponent) -> bool {
        !selection.project.is_empty()
    }

    fn signals(
        &self,
        _scope: &SelectionAssemblyScope,
        selection: &SelectionComponent,
        mut signals: Vec<SignalSpec>,
    ) -> Result<Vec<SignalSpec>> {
        let name = format!("{}{TUPLE_FIELDS}", selection.name);
        if find_signal(&signals, &name).is_none() {
            signals.push(SignalSpec::new(name).with_value(selection.tuple_fields()));
        }
        Ok(signals)
    }
}

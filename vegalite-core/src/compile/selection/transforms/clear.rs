use crate::compile::selection::transforms::toggle::TOGGLE;
use crate::compile::selection::transforms::{find_signal, TransformCompiler};
use crate::compile::selection::{SelectionAssemblyScope, SelectionComponent, TUPLE};
use crate::error::Result;
use crate::spec::signal::{SignalOnSpec, SignalSpec};
use crate::vl::selection::SelectionType;

/// Resets the selection on the `clear` event stream
pub struct Clear;

fn add_clear(signals: &mut [SignalSpec], index: Option<usize>, selection: &SelectionComponent, update: &str) {
    if let Some(signal) = index.and_then(|i| signals.get_mut(i)) {
        signal
            .on
            .push(SignalOnSpec::new(selection.clear.clone().into(), update));
    }
}

impl TransformCompiler for Clear {
    fn has(&self, selection: &SelectionComponent) -> bool {
        !selection.clear.is_empty()
    }

    fn signals(
        &self,
        _scope: &SelectionAssemblyScope,
        selection: &SelectionComponent,
        mut signals: Vec<SignalSpec>,
    ) -> Result<Vec<SignalSpec>> {
        if selection.type_ == SelectionType::Interval {
            for projection in &selection.project {
                let visual = projection
                    .visual_signal(&selection.name)
                    .and_then(|name| find_signal(&signals, &name));
                match visual {
                    Some(index) => add_clear(&mut signals, Some(index), selection, "[0, 0]"),
                    None => {
                        let data = find_signal(&signals, &projection.data_signal(&selection.name));
                        add_clear(&mut signals, data, selection, "null");
                    }
                }
            }
        } else {
            let tuple = find_signal(&signals, &format!("{}{TUPLE}", selection.name));
            add_clear(&mut signals, tuple, selection, "null");
            let toggle = find_signal(&signals, &format!("{}{TOGGLE}", selection.name));
            add_clear(&mut signals, toggle, selection, "false");
        }
        Ok(signals)
    }

    fn top_level_signals(
        &self,
        _scope: &SelectionAssemblyScope,
        selection: &SelectionComponent,
        mut signals: Vec<SignalSpec>,
    ) -> Result<Vec<SignalSpec>> {
        if super::inputs::Inputs.has(selection) {
            for projection in &selection.project {
                let index = find_signal(&signals, &projection.data_signal(&selection.name));
                add_clear(&mut signals, index, selection, "null");
            }
        }
        Ok(signals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::selection::events::parse_selector;
    use crate::compile::selection::multi;
    use crate::compile::selection::{assembly_scope_fixture, selection_fixture};
    use crate::vl::mark::MarkType;

    #[test]
    fn test_clear_tuple() {
        let mut selection = selection_fixture("pts", SelectionType::Single);
        selection.events = parse_selector("click", "scope").unwrap();
        selection.clear = parse_selector("dblclick", "scope").unwrap();
        let scope = assembly_scope_fixture(MarkType::Point);
        let signals = Clear
            .signals(&scope, &selection, multi::signals(&selection))
            .unwrap();
        assert_eq!(signals[0].on.len(), 2);
        assert_eq!(signals[0].on[1].update, "null");
    }
}

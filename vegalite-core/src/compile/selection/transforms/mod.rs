//! Optional behaviors layered on top of the basic selection signals.
//!
//! Every compiler is asked whether it applies to a selection through
//! [`TransformCompiler::has`]; the ones that do get a chance to amend the
//! selection at parse time and the signals, modify expression and marks at
//! assembly time. They run in the order of [`transform_compilers`].
pub mod clear;
pub mod inputs;
pub mod legends;
pub mod nearest;
pub mod project;
pub mod scales;
pub mod toggle;
pub mod translate;
pub mod zoom;

use crate::compile::log::Diagnostics;
use crate::compile::selection::{SelectionAssemblyScope, SelectionComponent, UnitSelectionScope};
use crate::error::Result;
use crate::spec::mark::MarkSpec;
use crate::spec::signal::SignalSpec;

pub trait TransformCompiler: Sync {
    fn has(&self, selection: &SelectionComponent) -> bool;

    fn parse(
        &self,
        _selection: &mut SelectionComponent,
        _scope: &UnitSelectionScope,
        _diagnostics: &mut Diagnostics,
    ) -> Result<()> {
        Ok(())
    }

    fn signals(
        &self,
        _scope: &SelectionAssemblyScope,
        _selection: &SelectionComponent,
        signals: Vec<SignalSpec>,
    ) -> Result<Vec<SignalSpec>> {
        Ok(signals)
    }

    fn top_level_signals(
        &self,
        _scope: &SelectionAssemblyScope,
        _selection: &SelectionComponent,
        signals: Vec<SignalSpec>,
    ) -> Result<Vec<SignalSpec>> {
        Ok(signals)
    }

    fn modify_expr(&self, _selection: &SelectionComponent, expr: String) -> String {
        expr
    }

    fn marks(
        &self,
        _scope: &SelectionAssemblyScope,
        _selection: &SelectionComponent,
        marks: Vec<MarkSpec>,
        _diagnostics: &mut Diagnostics,
    ) -> Result<Vec<MarkSpec>> {
        Ok(marks)
    }
}

pub fn transform_compilers() -> [&'static dyn TransformCompiler; 9] {
    [
        &project::Project,
        &toggle::Toggle,
        &nearest::Nearest,
        &clear::Clear,
        &translate::Translate,
        &zoom::Zoom,
        &scales::Scales,
        &legends::Legends,
        &inputs::Inputs,
    ]
}

/// Index of the signal named `name`
pub(crate) fn find_signal(signals: &[SignalSpec], name: &str) -> Option<usize> {
    signals.iter().position(|s| s.name == name)
}

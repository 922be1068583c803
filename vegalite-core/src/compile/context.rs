use crate::compile::data::DataFlow;
use crate::compile::log::Diagnostics;
use crate::compile::names::NameMap;
use crate::compile::scale::ScaleComponent;
use crate::compile::selection::SelectionInfo;
use crate::vl::config::Config;
use std::collections::{BTreeMap, HashMap};

/// State shared by every node of the model tree during one compilation
#[derive(Debug)]
pub struct CompileContext {
    pub config: Config,
    pub diagnostics: Diagnostics,
    /// Redirects local scale names to the name of the scale they were merged into
    pub scale_names: NameMap,
    /// Redirects local width/height signal names the same way
    pub size_names: NameMap,
    pub dataflow: DataFlow,
    /// Selections of every unit, keyed by selection name
    pub selections: BTreeMap<String, SelectionInfo>,
    /// Owned scale components keyed by their final name, filled once all scales are parsed
    pub scales: HashMap<String, ScaleComponent>,
}

impl CompileContext {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            diagnostics: Diagnostics::new(),
            scale_names: NameMap::new(),
            size_names: NameMap::new(),
            dataflow: DataFlow::new(),
            selections: Default::default(),
            scales: Default::default(),
        }
    }

    /// The owned component a (possibly merged) local scale name resolves to
    pub fn scale(&self, local_name: &str) -> Option<&ScaleComponent> {
        self.scales.get(&self.scale_names.get(local_name))
    }
}

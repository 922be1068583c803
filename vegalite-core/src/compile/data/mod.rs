//! Data flow graph built by the data pass and serialized into datasets at assembly
pub mod assemble;
pub mod parse;

use crate::spec::transform::aggregate::AggregateOpSpec;
use crate::spec::transform::flatten::FlattenTransformSpec;
use crate::spec::transform::fold::FoldTransformSpec;
use crate::spec::transform::formula::FormulaTransformSpec;
use crate::spec::transform::stack::StackTransformSpec;
use crate::vl::data::DataDef;
use crate::vl::fielddef::BinParams;
use crate::vl::predicate::{LogicalOperand, Predicate};
use petgraph::prelude::{DiGraph, EdgeRef, NodeIndex};
use petgraph::{Incoming, Outgoing};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};

#[derive(Debug, Clone, PartialEq)]
pub struct SourceNode {
    pub data: DataDef,
    /// Source read only through a lookup, never faceted or rendered from
    pub secondary: bool,
}

/// Type coercions, keyed by field, e.g. `{"date": "date"}`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParseNode {
    pub fields: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinItem {
    pub field: String,
    pub params: BinParams,
    pub start: String,
    pub end: String,
    /// Formatted `start - end` label field, required by discrete scales and legends
    pub range: Option<String>,
    /// Prefix of the extent and bins signal names
    pub signal: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BinNode {
    pub bins: BTreeMap<String, BinItem>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregateNode {
    pub dimensions: BTreeSet<String>,
    /// field -> op -> output name
    pub measures: BTreeMap<String, BTreeMap<AggregateOpSpec, String>>,
}

impl AggregateNode {
    pub fn add_measure(&mut self, field: &str, op: AggregateOpSpec, as_: String) {
        self.measures
            .entry(field.to_string())
            .or_default()
            .insert(op, as_);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LookupNode {
    pub secondary: NodeIndex,
    pub lookup: String,
    pub key: String,
    pub fields: Option<Vec<String>>,
    pub as_: Option<Vec<String>>,
    pub default: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutputNode {
    /// Dataset name required by the reader, e.g. `row_domain`
    pub fixed_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DataFlowNode {
    Source(SourceNode),
    Parse(ParseNode),
    Identifier,
    Filter(LogicalOperand<Predicate>),
    Formula(FormulaTransformSpec),
    Bin(BinNode),
    TimeUnit(BTreeMap<String, FormulaTransformSpec>),
    Aggregate(AggregateNode),
    /// Fields whose null or NaN values are filtered out
    FilterInvalid(BTreeSet<String>),
    Stack(StackTransformSpec),
    Lookup(LookupNode),
    Flatten(FlattenTransformSpec),
    Fold(FoldTransformSpec),
    Output(OutputNode),
}

impl DataFlowNode {
    pub fn output() -> Self {
        DataFlowNode::Output(OutputNode { fixed_name: None })
    }

    pub fn named_output<S: Into<String>>(name: S) -> Self {
        DataFlowNode::Output(OutputNode {
            fixed_name: Some(name.into()),
        })
    }
}

/// Directed acyclic graph of data flow nodes; edges point from parent to child
#[derive(Debug, Clone, Default)]
pub struct DataFlow {
    graph: DiGraph<DataFlowNode, ()>,
    sources: HashMap<String, NodeIndex>,
}

impl DataFlow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, node: DataFlowNode, parent: Option<NodeIndex>) -> NodeIndex {
        let index = self.graph.add_node(node);
        if let Some(parent) = parent {
            self.graph.add_edge(parent, index, ());
        }
        index
    }

    /// Source node for `data`, shared between all readers of the same data
    pub fn source(&mut self, data: &DataDef, secondary: bool) -> NodeIndex {
        let key = data.key();
        if let Some(index) = self.sources.get(&key) {
            return *index;
        }
        let index = self.add(
            DataFlowNode::Source(SourceNode {
                data: data.clone(),
                secondary,
            }),
            None,
        );
        self.sources.insert(key, index);
        index
    }

    pub fn node(&self, index: NodeIndex) -> Option<&DataFlowNode> {
        self.graph.node_weight(index)
    }

    pub fn node_mut(&mut self, index: NodeIndex) -> Option<&mut DataFlowNode> {
        self.graph.node_weight_mut(index)
    }

    /// Children in insertion order
    pub fn children(&self, index: NodeIndex) -> Vec<NodeIndex> {
        let mut children: Vec<NodeIndex> = self
            .graph
            .edges_directed(index, Outgoing)
            .map(|edge| edge.target())
            .collect();
        children.sort();
        children
    }

    pub fn parent(&self, index: NodeIndex) -> Option<NodeIndex> {
        self.graph
            .edges_directed(index, Incoming)
            .map(|edge| edge.source())
            .next()
    }

    /// Nodes without a parent, in insertion order
    pub fn roots(&self) -> Vec<NodeIndex> {
        self.graph
            .node_indices()
            .filter(|index| self.parent(*index).is_none())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sources_are_shared_by_key() {
        let mut flow = DataFlow::new();
        let data = DataDef {
            url: Some("data/cars.json".to_string()),
            ..Default::default()
        };
        let a = flow.source(&data, false);
        let b = flow.source(&data, false);
        assert_eq!(a, b);

        let other = DataDef {
            values: Some(json!([{"a": 1}])),
            ..Default::default()
        };
        let c = flow.source(&other, false);
        assert_ne!(a, c);
        assert_eq!(flow.roots(), vec![a, c]);
    }

    #[test]
    fn test_children_keep_insertion_order() {
        let mut flow = DataFlow::new();
        let root = flow.add(DataFlowNode::Identifier, None);
        let first = flow.add(DataFlowNode::output(), Some(root));
        let second = flow.add(DataFlowNode::named_output("row_domain"), Some(root));
        assert_eq!(flow.children(root), vec![first, second]);
        assert_eq!(flow.parent(second), Some(root));
        assert_eq!(flow.len(), 3);
    }
}

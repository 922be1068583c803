use crate::compile::data::{AggregateNode, BinNode, DataFlow, DataFlowNode, LookupNode, SourceNode};
use crate::compile::selection::predicate::predicate_expr;
use crate::compile::selection::SelectionInfo;
use crate::error::{Result, ResultWithContext, VegaLiteError};
use crate::spec::data::{DataFormatParseSpec, DataFormatSpec, DataSpec};
use crate::spec::transform::aggregate::AggregateTransformSpec;
use crate::spec::transform::bin::{BinExtent, BinTransformSpec};
use crate::spec::transform::extent::ExtentTransformSpec;
use crate::spec::transform::filter::FilterTransformSpec;
use crate::spec::transform::formula::FormulaTransformSpec;
use crate::spec::transform::identifier::IdentifierTransformSpec;
use crate::spec::transform::lookup::LookupTransformSpec;
use crate::spec::transform::TransformSpec;
use crate::spec::values::{Field, SignalExpressionSpec, StringOrSignalSpec};
use petgraph::prelude::NodeIndex;
use std::collections::{BTreeMap, HashMap};
use vegalite_common::escape::{datum_access, string_value};

/// Datasets serialized from a [`DataFlow`], plus the dataset name each output node resolved to
#[derive(Debug, Clone, Default)]
pub struct AssembledData {
    pub datasets: Vec<DataSpec>,
    output_names: HashMap<NodeIndex, String>,
}

impl AssembledData {
    /// Name of the dataset holding the rows of an output node
    pub fn name(&self, node: NodeIndex) -> Result<String> {
        self.output_names
            .get(&node)
            .cloned()
            .with_context(|| format!("No dataset was assembled for data node {}", node.index()))
    }
}

pub fn assemble_data(
    flow: &DataFlow,
    selections: &BTreeMap<String, SelectionInfo>,
) -> Result<AssembledData> {
    let mut roots = flow.roots();
    // Lookup sources are emitted before the datasets reading them
    roots.sort_by_key(|index| {
        let secondary = matches!(
            flow.node(*index),
            Some(DataFlowNode::Source(SourceNode { secondary: true, .. }))
        );
        (!secondary, *index)
    });

    let mut assembler = DataAssembler {
        flow,
        selections,
        source_names: Default::default(),
        datasets: Vec::new(),
        output_names: Default::default(),
        source_index: 0,
        data_index: 0,
    };
    for root in &roots {
        assembler.name_source(*root)?;
    }
    for root in roots {
        assembler.walk_source(root)?;
    }

    Ok(AssembledData {
        datasets: assembler.datasets,
        output_names: assembler.output_names,
    })
}

struct DataAssembler<'a> {
    flow: &'a DataFlow,
    selections: &'a BTreeMap<String, SelectionInfo>,
    source_names: HashMap<NodeIndex, String>,
    datasets: Vec<DataSpec>,
    output_names: HashMap<NodeIndex, String>,
    source_index: usize,
    data_index: usize,
}

/// A dataset that only forwards its source so far
fn pass_through(source: &str) -> DataSpec {
    let mut dataset = DataSpec::new("");
    dataset.source = Some(source.to_string());
    dataset
}

fn is_pass_through(dataset: &DataSpec) -> bool {
    dataset.name.is_empty() && dataset.transform.is_empty()
}

impl<'a> DataAssembler<'a> {
    fn name_source(&mut self, index: NodeIndex) -> Result<()> {
        let Some(DataFlowNode::Source(source)) = self.flow.node(index) else {
            return Err(VegaLiteError::internal(format!(
                "Data flow root {} is not a source",
                index.index()
            )));
        };
        let name = match &source.data.name {
            Some(name) => name.clone(),
            None => {
                let name = format!("source_{}", self.source_index);
                self.source_index += 1;
                name
            }
        };
        self.source_names.insert(index, name);
        Ok(())
    }

    fn next_name(&mut self) -> String {
        let name = format!("data_{}", self.data_index);
        self.data_index += 1;
        name
    }

    fn source_name(&self, index: NodeIndex) -> Result<String> {
        self.source_names
            .get(&index)
            .cloned()
            .with_context(|| format!("Unnamed data source {}", index.index()))
    }

    fn walk_source(&mut self, index: NodeIndex) -> Result<()> {
        let Some(DataFlowNode::Source(source)) = self.flow.node(index) else {
            return Err(VegaLiteError::internal("Expected a data source"));
        };
        let name = self.source_name(index)?;
        let mut dataset = DataSpec::new(&name);
        dataset.url = source.data.url.clone().map(StringOrSignalSpec::String);
        dataset.values = source.data.values.clone();
        let mut format = source.data.format.as_ref().map(|format| DataFormatSpec {
            type_: format.type_.clone(),
            parse: None,
            property: format.property.clone(),
            extra: format
                .extra
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        });

        let mut children = self.flow.children(index);
        if let [only] = children.as_slice() {
            if let Some(DataFlowNode::Parse(parse)) = self.flow.node(*only) {
                if !parse.fields.is_empty() {
                    let format = format.get_or_insert_with(|| DataFormatSpec {
                        type_: None,
                        parse: None,
                        property: None,
                        extra: Default::default(),
                    });
                    format.parse = Some(DataFormatParseSpec::Object(parse.fields.clone()));
                }
                children = self.flow.children(*only);
            }
        }
        dataset.format = format;
        self.datasets.push(dataset);
        self.walk_children(&children, pass_through(&name))
    }

    fn walk(&mut self, index: NodeIndex, mut dataset: DataSpec) -> Result<()> {
        let node = self
            .flow
            .node(index)
            .with_context(|| format!("Missing data node {}", index.index()))?;
        let children = self.flow.children(index);
        match node {
            DataFlowNode::Source(_) => {
                return Err(VegaLiteError::internal("Data source with a parent"));
            }
            DataFlowNode::Output(output) => {
                if is_pass_through(&dataset) && output.fixed_name.is_none() {
                    let source = dataset.source.clone().unwrap_or_default();
                    self.output_names.insert(index, source);
                } else {
                    if dataset.name.is_empty() {
                        dataset.name = match &output.fixed_name {
                            Some(name) => name.clone(),
                            None => self.next_name(),
                        };
                    }
                    let name = dataset.name.clone();
                    self.output_names.insert(index, name.clone());
                    self.datasets.push(dataset);
                    return self.walk_children(&children, pass_through(&name));
                }
            }
            node => {
                let transforms = self
                    .transforms(node)
                    .with_context(|| format!("Assembling data node {}", index.index()))?;
                dataset.transform.extend(transforms);
            }
        }
        self.walk_children(&children, dataset)
    }

    fn walk_children(&mut self, children: &[NodeIndex], mut dataset: DataSpec) -> Result<()> {
        match children {
            // Leaves without an output are never read
            [] => Ok(()),
            [child] => self.walk(*child, dataset),
            _ => {
                let source = if is_pass_through(&dataset) {
                    dataset.source.clone().unwrap_or_default()
                } else {
                    dataset.name = self.next_name();
                    let name = dataset.name.clone();
                    self.datasets.push(dataset);
                    name
                };
                for child in children {
                    self.walk(*child, pass_through(&source))?;
                }
                Ok(())
            }
        }
    }

    fn transforms(&self, node: &DataFlowNode) -> Result<Vec<TransformSpec>> {
        Ok(match node {
            DataFlowNode::Source(_) | DataFlowNode::Output(_) => Vec::new(),
            DataFlowNode::Parse(parse) => parse
                .fields
                .iter()
                .filter_map(|(field, type_)| parse_formula(field, type_))
                .map(TransformSpec::Formula)
                .collect(),
            DataFlowNode::Identifier => vec![TransformSpec::Identifier(IdentifierTransformSpec {
                as_: "_vgsid_".to_string(),
                extra: Default::default(),
            })],
            DataFlowNode::Filter(predicate) => {
                let expr = predicate_expr(predicate, self.selections)?;
                vec![TransformSpec::Filter(FilterTransformSpec::new(expr))]
            }
            DataFlowNode::Formula(formula) => vec![TransformSpec::Formula(formula.clone())],
            DataFlowNode::Bin(bin) => bin_transforms(bin),
            DataFlowNode::TimeUnit(formulas) => formulas
                .values()
                .cloned()
                .map(TransformSpec::Formula)
                .collect(),
            DataFlowNode::Aggregate(aggregate) => {
                vec![TransformSpec::Aggregate(aggregate_transform(aggregate))]
            }
            DataFlowNode::FilterInvalid(fields) => {
                if fields.is_empty() {
                    Vec::new()
                } else {
                    let clauses: Vec<String> = fields
                        .iter()
                        .map(|field| {
                            let field = datum_access(field);
                            format!("{field} !== null && !isNaN({field})")
                        })
                        .collect();
                    vec![TransformSpec::Filter(FilterTransformSpec::new(
                        clauses.join(" && "),
                    ))]
                }
            }
            DataFlowNode::Stack(stack) => vec![TransformSpec::Stack(stack.clone())],
            DataFlowNode::Lookup(lookup) => {
                vec![TransformSpec::Lookup(self.lookup_transform(lookup)?)]
            }
            DataFlowNode::Flatten(flatten) => vec![TransformSpec::Flatten(flatten.clone())],
            DataFlowNode::Fold(fold) => vec![TransformSpec::Fold(fold.clone())],
        })
    }

    fn lookup_transform(&self, lookup: &LookupNode) -> Result<LookupTransformSpec> {
        let from = self.source_name(lookup.secondary)?;
        let (fields, values) = match &lookup.fields {
            Some(fields) => (
                vec![Field::from(lookup.lookup.as_str())],
                Some(fields.iter().map(|f| Field::from(f.as_str())).collect()),
            ),
            None => (vec![Field::from(lookup.lookup.as_str())], None),
        };
        Ok(LookupTransformSpec {
            from,
            key: Field::from(lookup.key.as_str()),
            fields,
            values,
            as_: lookup.as_.clone(),
            default: lookup.default.clone(),
            extra: Default::default(),
        })
    }
}

/// Formula coercing a field to the parse type, or `None` when no coercion applies
fn parse_formula(field: &str, type_: &str) -> Option<FormulaTransformSpec> {
    let field_ref = datum_access(field);
    let expr = match type_ {
        "number" => format!("toNumber({field_ref})"),
        "boolean" => format!("toBoolean({field_ref})"),
        "string" => format!("toString({field_ref})"),
        "date" => format!("toDate({field_ref})"),
        "flatten" => return None,
        other => {
            let pattern = other
                .strip_prefix("date:")
                .or_else(|| other.strip_prefix("utc:"))?;
            let pattern = pattern.trim_matches(|c| c == '\'' || c == '"');
            let func = if other.starts_with("utc:") {
                "utcParse"
            } else {
                "timeParse"
            };
            format!("{func}({field_ref},{})", string_value(pattern))
        }
    };
    Some(FormulaTransformSpec::new(expr, field))
}

fn bin_transforms(bin: &BinNode) -> Vec<TransformSpec> {
    let mut transforms = Vec::new();
    for item in bin.bins.values() {
        let extent = match item.params.extent {
            Some(extent) => BinExtent::Value(extent),
            None => {
                let signal = format!("{}_extent", item.signal);
                transforms.push(TransformSpec::Extent(ExtentTransformSpec {
                    field: item.field.clone(),
                    signal: Some(signal.clone()),
                    extra: Default::default(),
                }));
                BinExtent::Signal(SignalExpressionSpec::new(signal))
            }
        };
        let params = &item.params;
        transforms.push(TransformSpec::Bin(Box::new(BinTransformSpec {
            field: Field::from(item.field.as_str()),
            extent,
            signal: Some(format!("{}_bins", item.signal)),
            as_: Some(vec![item.start.clone(), item.end.clone()]),
            anchor: params.anchor,
            maxbins: params.maxbins,
            base: params.base,
            step: params.step,
            steps: params.steps.clone(),
            minstep: params.minstep,
            divide: params.divide.clone(),
            nice: params.nice,
            extra: Default::default(),
        })));
        if let Some(range) = &item.range {
            let (start, end) = (datum_access(&item.start), datum_access(&item.end));
            transforms.push(TransformSpec::Formula(FormulaTransformSpec::new(
                format!("{start} === null || isNaN({start}) ? \"null\" : format({start}, \"\") + \" - \" + format({end}, \"\")"),
                range.clone(),
            )));
        }
    }
    transforms
}

fn aggregate_transform(aggregate: &AggregateNode) -> AggregateTransformSpec {
    let mut ops = Vec::new();
    let mut fields = Vec::new();
    let mut as_ = Vec::new();
    for (field, measures) in &aggregate.measures {
        for (op, name) in measures {
            ops.push(*op);
            fields.push(if field == "*" {
                None
            } else {
                Some(Field::from(field.as_str()))
            });
            as_.push(Some(name.clone()));
        }
    }
    AggregateTransformSpec {
        groupby: aggregate
            .dimensions
            .iter()
            .map(|d| Field::from(d.as_str()))
            .collect(),
        fields: (!fields.is_empty()).then_some(fields),
        ops: (!ops.is_empty()).then_some(ops),
        as_: (!as_.is_empty()).then_some(as_),
        cross: None,
        drop: None,
        extra: Default::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::data::{OutputNode, ParseNode};
    use crate::spec::transform::aggregate::AggregateOpSpec;
    use crate::vl::data::DataDef;
    use serde_json::json;

    fn source(flow: &mut DataFlow) -> NodeIndex {
        flow.source(
            &DataDef {
                url: Some("data/cars.json".to_string()),
                ..Default::default()
            },
            false,
        )
    }

    #[test]
    fn test_parse_folds_into_format() {
        let mut flow = DataFlow::new();
        let src = source(&mut flow);
        let mut fields = BTreeMap::new();
        fields.insert("date".to_string(), "date".to_string());
        let parse = flow.add(DataFlowNode::Parse(ParseNode { fields }), Some(src));
        let out = flow.add(DataFlowNode::output(), Some(parse));

        let assembled = assemble_data(&flow, &Default::default()).unwrap();
        assert_eq!(assembled.datasets.len(), 1);
        assert_eq!(
            serde_json::to_value(&assembled.datasets[0]).unwrap(),
            json!({"name": "source_0", "url": "data/cars.json", "format": {"parse": {"date": "date"}}})
        );
        assert_eq!(assembled.name(out).unwrap(), "source_0");
    }

    #[test]
    fn test_transforms_get_a_new_dataset() {
        let mut flow = DataFlow::new();
        let src = source(&mut flow);
        let mut aggregate = AggregateNode::default();
        aggregate.dimensions.insert("a".to_string());
        aggregate.add_measure("b", AggregateOpSpec::Sum, "sum_b".to_string());
        let agg = flow.add(DataFlowNode::Aggregate(aggregate), Some(src));
        let out = flow.add(DataFlowNode::output(), Some(agg));

        let assembled = assemble_data(&flow, &Default::default()).unwrap();
        assert_eq!(assembled.datasets.len(), 2);
        assert_eq!(assembled.name(out).unwrap(), "data_0");
        assert_eq!(
            serde_json::to_value(&assembled.datasets[1]).unwrap(),
            json!({
                "name": "data_0",
                "source": "source_0",
                "transform": [{
                    "type": "aggregate",
                    "groupby": ["a"],
                    "fields": ["b"],
                    "ops": ["sum"],
                    "as": ["sum_b"]
                }]
            })
        );
    }

    #[test]
    fn test_branches_and_fixed_names() {
        let mut flow = DataFlow::new();
        let src = source(&mut flow);
        let main = flow.add(DataFlowNode::output(), Some(src));
        let mut aggregate = AggregateNode::default();
        aggregate.dimensions.insert("a".to_string());
        let agg = flow.add(DataFlowNode::Aggregate(aggregate), Some(main));
        let row = flow.add(
            DataFlowNode::Output(OutputNode {
                fixed_name: Some("row_domain".to_string()),
            }),
            Some(agg),
        );
        let mut invalid = std::collections::BTreeSet::new();
        invalid.insert("b".to_string());
        let filter = flow.add(DataFlowNode::FilterInvalid(invalid), Some(main));
        let child = flow.add(DataFlowNode::output(), Some(filter));

        let assembled = assemble_data(&flow, &Default::default()).unwrap();
        let names: Vec<&str> = assembled.datasets.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["source_0", "row_domain", "data_0"]);
        assert_eq!(assembled.name(main).unwrap(), "source_0");
        assert_eq!(assembled.name(row).unwrap(), "row_domain");
        assert_eq!(assembled.name(child).unwrap(), "data_0");
        assert_eq!(
            serde_json::to_value(&assembled.datasets[2].transform[0]).unwrap(),
            json!({"type": "filter", "expr": "datum[\"b\"] !== null && !isNaN(datum[\"b\"])"})
        );
    }
}

//! Building the data flow of each view during the data pass
use crate::compile::context::CompileContext;
use crate::compile::data::{
    AggregateNode, BinItem, BinNode, DataFlow, DataFlowNode, LookupNode, ParseNode,
};
use crate::compile::log::message;
use crate::compile::model::unit::UnitModel;
use crate::compile::model::ModelBase;
use crate::compile::scale::domain::{can_use_unaggregated, unaggregated_fields, wants_unaggregated};
use crate::compile::selection::uses_selection_id;
use crate::compile::stack::stack_transform;
use crate::error::Result;
use crate::spec::transform::aggregate::AggregateOpSpec;
use crate::spec::transform::flatten::FlattenTransformSpec;
use crate::spec::transform::fold::FoldTransformSpec;
use crate::spec::transform::formula::FormulaTransformSpec;
use crate::spec::values::Field;
use crate::vl::channel::Channel;
use crate::vl::config::InvalidValues;
use crate::vl::data::DataDef;
use crate::vl::fielddef::{
    var_name, BinDef, BinParams, FieldDef, FieldRefOption, FieldType, SortDef,
};
use crate::vl::transform::TransformDef;
use petgraph::prelude::NodeIndex;
use std::collections::{BTreeMap, BTreeSet};

/// Data nodes of a unit read by its marks and scales
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitData {
    pub main: NodeIndex,
    /// Rows before aggregation, when a domain is sorted by another field
    pub raw: Option<NodeIndex>,
}

/// Head of the data flow of a view: the parse node of its own source, or the
/// output of its parent
pub fn parse_source(
    data: Option<&DataDef>,
    parent: Option<NodeIndex>,
    flow: &mut DataFlow,
) -> Option<NodeIndex> {
    let Some(data) = data else {
        return parent;
    };
    let source = flow.source(data, false);
    let existing = flow
        .children(source)
        .into_iter()
        .find(|child| matches!(flow.node(*child), Some(DataFlowNode::Parse(_))));
    if let Some(parse) = existing {
        return Some(parse);
    }
    let fields = data
        .format
        .as_ref()
        .and_then(|f| f.parse.as_ref())
        .map(|parse| {
            parse
                .iter()
                .filter_map(|(field, type_)| type_.as_str().map(|t| (field.clone(), t.to_string())))
                .collect()
        })
        .unwrap_or_default();
    Some(flow.add(DataFlowNode::Parse(ParseNode { fields }), Some(source)))
}

/// Source standing in for a view without any data
pub fn empty_source(ctx: &mut CompileContext) -> NodeIndex {
    ctx.diagnostics.info(message::no_data());
    let data = DataDef::default();
    parse_source(Some(&data), None, &mut ctx.dataflow)
        .unwrap_or_else(|| ctx.dataflow.source(&data, false))
}

/// The parse node directly below the source feeding `head`
fn source_parse(flow: &DataFlow, head: NodeIndex) -> Option<NodeIndex> {
    let mut node = head;
    loop {
        let parent = flow.parent(node)?;
        if let Some(DataFlowNode::Source(_)) = flow.node(parent) {
            return matches!(flow.node(node), Some(DataFlowNode::Parse(_))).then_some(node);
        }
        node = parent;
    }
}

/// Explicit parse entries of the source feeding `head`, including disabled ones
fn explicit_parse_fields(flow: &DataFlow, head: NodeIndex) -> BTreeSet<String> {
    let mut node = head;
    loop {
        match flow.node(node) {
            Some(DataFlowNode::Source(source)) => {
                return source
                    .data
                    .format
                    .as_ref()
                    .and_then(|f| f.parse.as_ref())
                    .map(|p| p.keys().cloned().collect())
                    .unwrap_or_default();
            }
            _ => match flow.parent(node) {
                Some(parent) => node = parent,
                None => return BTreeSet::new(),
            },
        }
    }
}

/// Parse types implied by field definitions: dates for temporal fields, numbers for
/// quantitative ones
pub fn implicit_parse<'a, I>(defs: I) -> BTreeMap<String, String>
where
    I: IntoIterator<Item = &'a FieldDef>,
{
    let mut parse = BTreeMap::new();
    for def in defs {
        let Some(field) = def.field_name() else {
            continue;
        };
        if def.is_temporal() || def.time_unit.is_some() {
            parse.insert(field.to_string(), "date".to_string());
        } else if def.type_ == Some(FieldType::Quantitative) && !def.is_count() {
            parse.insert(field.to_string(), "number".to_string());
        }
    }
    parse
}

/// Add implicit parse types to the parse node of the source feeding `head`. Fields
/// produced by transforms or explicitly parsed are left alone.
pub fn add_implicit_parse(
    flow: &mut DataFlow,
    head: NodeIndex,
    fields: BTreeMap<String, String>,
    produced: &BTreeSet<String>,
) {
    let explicit = explicit_parse_fields(flow, head);
    let Some(parse_node) = source_parse(flow, head) else {
        return;
    };
    if let Some(DataFlowNode::Parse(parse)) = flow.node_mut(parse_node) {
        for (field, type_) in fields {
            if produced.contains(&field) || explicit.contains(&field) {
                continue;
            }
            parse.fields.entry(field).or_insert(type_);
        }
    }
}

/// Fields created by the transforms of a view
pub fn produced_fields(transforms: &[TransformDef]) -> BTreeSet<String> {
    let mut fields = BTreeSet::new();
    for transform in transforms {
        match transform {
            TransformDef::Filter { .. } => {}
            TransformDef::Calculate { as_, .. }
            | TransformDef::TimeUnit { as_, .. }
            | TransformDef::Bin { as_, .. } => {
                fields.insert(as_.clone());
            }
            TransformDef::Aggregate { aggregate, .. } => {
                fields.extend(aggregate.iter().map(|a| a.as_.clone()));
            }
            TransformDef::Lookup { as_, from, .. } => {
                if let Some(as_) = as_ {
                    fields.extend(as_.to_vec());
                }
                fields.extend(from.fields.iter().flatten().cloned());
            }
            TransformDef::Flatten { flatten, as_ } => {
                fields.extend(as_.clone().unwrap_or_else(|| flatten.clone()));
            }
            TransformDef::Fold { as_, .. } => {
                let as_ = as_.clone().unwrap_or_default();
                fields.insert(as_.first().cloned().unwrap_or_else(|| "key".to_string()));
                fields.insert(as_.get(1).cloned().unwrap_or_else(|| "value".to_string()));
            }
        }
    }
    fields
}

fn transform_bin_params(bin: &BinDef) -> BinParams {
    match bin {
        BinDef::Params(params) => params.clone(),
        BinDef::Bool(_) => BinParams {
            maxbins: Some(10.0),
            ..Default::default()
        },
    }
}

/// Nodes of the `transform` array of a view, appended below `head`
pub fn parse_transforms(
    base: &ModelBase,
    mut head: NodeIndex,
    ctx: &mut CompileContext,
) -> Result<NodeIndex> {
    for transform in &base.common.transform {
        let node = match transform {
            TransformDef::Filter { filter } => DataFlowNode::Filter(filter.clone()),
            TransformDef::Calculate { calculate, as_ } => {
                DataFlowNode::Formula(FormulaTransformSpec::new(calculate.clone(), as_.clone()))
            }
            TransformDef::Bin { bin, field, as_ } => {
                let item = BinItem {
                    field: field.clone(),
                    params: transform_bin_params(bin),
                    start: as_.clone(),
                    end: format!("{as_}_end"),
                    range: None,
                    signal: var_name(&base.get_name(as_)),
                };
                DataFlowNode::Bin(BinNode {
                    bins: BTreeMap::from([(as_.clone(), item)]),
                })
            }
            TransformDef::TimeUnit {
                time_unit,
                field,
                as_,
            } => DataFlowNode::TimeUnit(BTreeMap::from([(
                as_.clone(),
                FormulaTransformSpec::new(time_unit.field_expr(field), as_.clone()),
            )])),
            TransformDef::Aggregate { aggregate, groupby } => {
                let mut node = AggregateNode {
                    dimensions: groupby.iter().cloned().collect(),
                    measures: Default::default(),
                };
                for measure in aggregate {
                    let field = measure.field.clone().unwrap_or_else(|| "*".to_string());
                    node.add_measure(&field, measure.op, measure.as_.clone());
                }
                DataFlowNode::Aggregate(node)
            }
            TransformDef::Lookup {
                lookup,
                from,
                as_,
                default,
            } => DataFlowNode::Lookup(LookupNode {
                secondary: ctx.dataflow.source(&from.data, true),
                lookup: lookup.clone(),
                key: from.key.clone(),
                fields: from.fields.clone(),
                as_: as_.as_ref().map(|a| a.to_vec()),
                default: default.clone(),
            }),
            TransformDef::Flatten { flatten, as_ } => DataFlowNode::Flatten(FlattenTransformSpec {
                fields: flatten.iter().map(|f| Field::from(f.as_str())).collect(),
                as_: as_.clone(),
                extra: Default::default(),
            }),
            TransformDef::Fold { fold, as_ } => DataFlowNode::Fold(FoldTransformSpec {
                fields: fold.iter().map(|f| Field::from(f.as_str())).collect(),
                as_: as_.clone(),
                extra: Default::default(),
            }),
        };
        head = ctx.dataflow.add(node, Some(head));
    }
    Ok(head)
}

/// Bin and time unit nodes for the binned or time-unit fields of `defs`.
/// `needs_range` tells which channels read the formatted bin range.
pub fn parse_bin_and_time_unit<F>(
    base: &ModelBase,
    defs: &[(Channel, &FieldDef)],
    needs_range: F,
    mut head: NodeIndex,
    flow: &mut DataFlow,
) -> NodeIndex
where
    F: Fn(Channel, &FieldDef) -> bool,
{
    let mut bins = BinNode::default();
    let mut time_units = BTreeMap::new();
    for (channel, def) in defs {
        let Some(field) = def.field_name() else {
            continue;
        };
        if let Some(params) = def.bin_params(*channel) {
            let start = def.vg_field(*channel, &FieldRefOption::default());
            let suffixed = |suffix| {
                def.vg_field(
                    *channel,
                    &FieldRefOption {
                        bin_suffix: Some(suffix),
                        ..Default::default()
                    },
                )
            };
            let range = needs_range(*channel, def).then(|| suffixed("range"));
            let item = bins.bins.entry(start.clone()).or_insert_with(|| BinItem {
                field: field.to_string(),
                params,
                start: start.clone(),
                end: suffixed("end"),
                range: None,
                signal: var_name(&base.get_name(&start)),
            });
            if item.range.is_none() {
                item.range = range;
            }
        } else if let Some(unit) = &def.time_unit {
            let as_ = def.vg_field(*channel, &FieldRefOption::default());
            time_units.insert(
                as_.clone(),
                FormulaTransformSpec::new(unit.field_expr(field), as_),
            );
        }
    }
    if !bins.bins.is_empty() {
        head = flow.add(DataFlowNode::Bin(bins), Some(head));
    }
    if !time_units.is_empty() {
        head = flow.add(DataFlowNode::TimeUnit(time_units), Some(head));
    }
    head
}

fn bin_fields(def: &FieldDef, channel: Channel, with_range: bool) -> Vec<String> {
    let field = |suffix| {
        def.vg_field(
            channel,
            &FieldRefOption {
                bin_suffix: suffix,
                ..Default::default()
            },
        )
    };
    let mut fields = vec![field(None), field(Some("end"))];
    if with_range {
        fields.push(field(Some("range")));
    }
    fields
}

/// Whether a binned field of `channel` is shown as formatted ranges
fn unit_needs_bin_range(unit: &UnitModel, channel: Channel, def: &FieldDef) -> bool {
    def.is_discrete()
        || unit
            .scale_types
            .get(&channel)
            .map(|t| t.is_discrete())
            .unwrap_or(false)
}

/// Aggregation implied by the encoding; `None` when no channel aggregates
fn encoding_aggregate(unit: &UnitModel, ctx: &CompileContext) -> Option<AggregateNode> {
    if !unit.encoding.is_aggregate() {
        return None;
    }
    let mut node = AggregateNode::default();
    let opt = FieldRefOption::default();
    for (channel, def) in unit.encoding.all_field_defs() {
        match def.aggregate_op() {
            Some(op) => {
                let field = if op == AggregateOpSpec::Count {
                    "*"
                } else {
                    def.field_name().unwrap_or("*")
                };
                node.add_measure(field, op, def.vg_field(channel, &opt));

                let has_scale = unit.scale_types.get(&channel);
                if let Some(scale_type) = has_scale {
                    let explicit = def
                        .scale_def()
                        .and_then(|s| s.domain.as_ref())
                        .map(|d| d.is_unaggregated())
                        .unwrap_or(false);
                    if (explicit || wants_unaggregated(def, &ctx.config))
                        && can_use_unaggregated(def, *scale_type).is_ok()
                    {
                        let (min, max) = unaggregated_fields(def);
                        node.add_measure(field, AggregateOpSpec::Min, min);
                        node.add_measure(field, AggregateOpSpec::Max, max);
                    }
                }
            }
            None if def.is_binned() => {
                node.dimensions.extend(bin_fields(
                    def,
                    channel,
                    unit_needs_bin_range(unit, channel, def),
                ));
            }
            None => {
                node.dimensions.insert(def.vg_field(channel, &opt));
            }
        }
    }
    node.dimensions.extend(unit.facet_fields.iter().cloned());
    Some(node)
}

/// Continuous scale fields whose null and NaN values are dropped
fn invalid_filter_fields(unit: &UnitModel) -> BTreeSet<String> {
    let opt = FieldRefOption::default();
    unit.scale_types
        .iter()
        .filter(|(_, scale_type)| scale_type.is_continuous() && !scale_type.is_bin())
        .filter_map(|(channel, _)| {
            let def = unit.encoding.field_def(*channel)?;
            let continuous = matches!(
                def.field_type(),
                Some(FieldType::Quantitative) | Some(FieldType::Temporal)
            );
            (continuous && !def.is_count() && !def.is_binned()).then(|| def.vg_field(*channel, &opt))
        })
        .collect()
}

fn sorts_by_other_field(unit: &UnitModel) -> bool {
    unit.encoding
        .all_field_defs()
        .iter()
        .any(|(_, def)| matches!(def.sort, Some(Some(SortDef::Field(_)))))
}

/// Data flow of a unit from its head to the output read by its marks
pub fn parse_unit_data(
    unit: &UnitModel,
    parent: Option<NodeIndex>,
    ctx: &mut CompileContext,
) -> Result<UnitData> {
    let mut head = match parse_source(unit.base.common.data.as_ref(), parent, &mut ctx.dataflow) {
        Some(head) => head,
        None => empty_source(ctx),
    };

    let produced = produced_fields(&unit.base.common.transform);
    let defs = unit.encoding.all_field_defs();
    let parse = implicit_parse(defs.iter().map(|(_, def)| *def));
    add_implicit_parse(&mut ctx.dataflow, head, parse, &produced);

    if unit
        .selection_defs
        .values()
        .any(|def| uses_selection_id(def, &ctx.config))
    {
        head = ctx.dataflow.add(DataFlowNode::Identifier, Some(head));
    }
    head = parse_transforms(&unit.base, head, ctx)?;
    head = parse_bin_and_time_unit(
        &unit.base,
        &defs,
        |channel, def| unit_needs_bin_range(unit, channel, def),
        head,
        &mut ctx.dataflow,
    );

    let mut raw = None;
    if let Some(aggregate) = encoding_aggregate(unit, ctx) {
        if sorts_by_other_field(unit) {
            head = ctx.dataflow.add(DataFlowNode::output(), Some(head));
            raw = Some(head);
        }
        head = ctx
            .dataflow
            .add(DataFlowNode::Aggregate(aggregate), Some(head));
    }

    if ctx.config.invalid_values() == InvalidValues::Filter {
        let fields = invalid_filter_fields(unit);
        if !fields.is_empty() {
            head = ctx
                .dataflow
                .add(DataFlowNode::FilterInvalid(fields), Some(head));
        }
    }

    if let Some(stack) = &unit.stack {
        if let Some(transform) = stack_transform(stack, &unit.encoding, &unit.facet_fields) {
            head = ctx.dataflow.add(DataFlowNode::Stack(transform), Some(head));
        }
    }

    let main = ctx.dataflow.add(DataFlowNode::output(), Some(head));
    Ok(UnitData { main, raw })
}

/// Data flow of a composite view; `None` when neither the view nor its ancestors
/// define data
pub fn parse_composite_data(
    base: &ModelBase,
    parent: Option<NodeIndex>,
    ctx: &mut CompileContext,
) -> Result<Option<NodeIndex>> {
    let own_data = base.common.data.is_some();
    let head = parse_source(base.common.data.as_ref(), parent, &mut ctx.dataflow);
    let head = match head {
        Some(head) => head,
        None if base.common.transform.is_empty() => return Ok(None),
        None => empty_source(ctx),
    };
    if !own_data && base.common.transform.is_empty() {
        return Ok(Some(head));
    }
    let head = parse_transforms(base, head, ctx)?;
    Ok(Some(ctx.dataflow.add(DataFlowNode::output(), Some(head))))
}

/// Distinct values of a facet field, read by the header groups
pub fn parse_facet_domain(
    name: String,
    field: String,
    main: NodeIndex,
    flow: &mut DataFlow,
) -> NodeIndex {
    let aggregate = flow.add(
        DataFlowNode::Aggregate(AggregateNode {
            dimensions: BTreeSet::from([field]),
            measures: Default::default(),
        }),
        Some(main),
    );
    flow.add(DataFlowNode::named_output(name), Some(aggregate))
}

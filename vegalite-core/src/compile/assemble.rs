//! Assembly of the parsed model tree into the output spec
use crate::compile::context::CompileContext;
use crate::compile::data::assemble::AssembledData;
use crate::compile::header::assemble_headers;
use crate::compile::layout_size::{assemble_size_signals, root_size, size_type};
use crate::compile::log::message;
use crate::compile::mark::assemble_marks;
use crate::compile::model::facet::FacetModel;
use crate::compile::model::unit::UnitModel;
use crate::compile::model::Model;
use crate::compile::scale::domain::rename_domain_data;
use crate::compile::selection::{
    assemble_store, assemble_top_level_signals, assemble_unit_marks, assemble_unit_signals,
    unit_signal, ScaleInfo, SelectionAssemblyScope,
};
use crate::error::{Result, ResultWithContext};
use crate::spec::axis::AxisSpec;
use crate::spec::chart::ChartSpec;
use crate::spec::legend::LegendSpec;
use crate::spec::mark::{MarkEncodingSpec, MarkFacetSpec, MarkFromSpec, MarkSort, MarkSpec};
use crate::spec::scale::ScaleSpec;
use crate::spec::signal::SignalSpec;
use crate::spec::title::TitleSpec;
use crate::spec::values::{SortOrderOrList, SortOrderSpec, StringOrStringList, ValueOrSignalSpec};
use crate::vl::channel::Channel;
use crate::vl::spec::{TitleDef, TopLevelSpec};
use petgraph::prelude::NodeIndex;
use serde_json::{json, Value};
use std::collections::HashMap;
use vegalite_common::escape::datum_access;

/// Name under which the rows of one facet cell are visible inside the cell group
const FACET_DATA: &str = "facet";

/// Signals, scales, guides and marks of one group of the output
#[derive(Debug, Clone, Default)]
pub struct GroupContent {
    pub signals: Vec<SignalSpec>,
    pub scales: Vec<ScaleSpec>,
    pub axes: Vec<AxisSpec>,
    pub legends: Vec<LegendSpec>,
    pub marks: Vec<MarkSpec>,
    pub layout: Option<Value>,
}

impl GroupContent {
    fn extend(&mut self, other: GroupContent) {
        self.signals.extend(other.signals);
        self.scales.extend(other.scales);
        self.axes.extend(other.axes);
        self.legends.extend(other.legends);
        self.marks.extend(other.marks);
    }

    fn into_group(self, mut group: MarkSpec) -> MarkSpec {
        group.signals = self.signals;
        group.scales = self.scales;
        group.axes = self.axes;
        group.legends = self.legends;
        group.marks = self.marks;
        group.layout = self.layout;
        group
    }
}

/// Where a subtree is assembled
#[derive(Debug, Clone, Copy, Default)]
struct AssembleScope {
    /// Inside a group mark rather than at the top level
    nested: bool,
    /// Data node whose rows are partitioned by the enclosing facet cell
    cell_data: Option<NodeIndex>,
}

struct Assembler<'a> {
    ctx: &'a mut CompileContext,
    data: &'a AssembledData,
}

impl<'a> Assembler<'a> {
    fn data_name(&self, node: NodeIndex, scope: AssembleScope) -> Result<String> {
        if scope.cell_data == Some(node) {
            Ok(FACET_DATA.to_string())
        } else {
            self.data.name(node)
        }
    }

    fn size_name(&self, model: &Model, channel: Channel) -> String {
        self.ctx
            .size_names
            .get(&model.base().get_name(size_type(channel)))
    }

    fn content(&mut self, model: &Model, scope: AssembleScope) -> Result<GroupContent> {
        let mut content = GroupContent::default();
        let base = model.base();

        let cell_name = match scope.cell_data {
            Some(node) => Some(self.data.name(node)?),
            None => None,
        };
        for scale in base.component.scales.values() {
            let mut spec = scale.assemble(self.data, &self.ctx.size_names, &mut self.ctx.diagnostics)?;
            if let (Some(domain), Some(cell_name)) = (spec.domain.as_mut(), cell_name.as_ref()) {
                rename_domain_data(domain, cell_name, FACET_DATA);
            }
            content.scales.push(spec);
        }
        let ctx = &*self.ctx;
        if !matches!(model, Model::Facet(_)) {
            for axes in base.component.axes.values() {
                content.axes.extend(axes.iter().map(|axis| axis.assemble(ctx)));
            }
        }
        for legend in base.component.legends.values() {
            content.legends.push(legend.assemble(ctx));
        }

        match model {
            Model::Unit(unit) => self.unit(unit, scope, &mut content)?,
            Model::Layer(layer) => {
                for child in &layer.children {
                    content.extend(self.content(child, scope)?);
                }
            }
            Model::Repeat(concat) | Model::Concat(concat) => {
                for child in &concat.children {
                    let child_content = self.content(
                        child,
                        AssembleScope {
                            nested: true,
                            ..scope
                        },
                    )?;
                    let mut group = MarkSpec::new("group");
                    group.name = Some(child.base().get_name("group"));
                    if matches!(child, Model::Unit(_) | Model::Layer(_)) {
                        group.style = Some(StringOrStringList::String("cell".to_string()));
                    }
                    for channel in [Channel::X, Channel::Y] {
                        if child.base().component.layout_size.get(channel).is_some() {
                            let signal = self.size_name(child, channel);
                            group.update_channels_mut().insert(
                                size_type(channel).to_string(),
                                MarkEncodingSpec::signal(signal).into(),
                            );
                        }
                    }
                    content.marks.push(child_content.into_group(group));
                }
                content.layout = Some(concat.layout());
            }
            Model::Facet(facet) => self.facet(facet, &mut content)?,
        }
        Ok(content)
    }

    fn unit(&mut self, unit: &UnitModel, scope: AssembleScope, content: &mut GroupContent) -> Result<()> {
        let data = self.data_name(unit.main_data()?, scope)?;
        let marks = assemble_marks(unit, &data);
        if unit.selections.is_empty() {
            content.marks.extend(marks);
            return Ok(());
        }
        let selection_scope = self.selection_scope(unit, scope.nested);
        content.signals.extend(assemble_unit_signals(
            &selection_scope,
            &unit.selections,
            &mut self.ctx.diagnostics,
        )?);
        content.marks.extend(assemble_unit_marks(
            &selection_scope,
            &unit.selections,
            marks,
            &mut self.ctx.diagnostics,
        )?);
        Ok(())
    }

    fn selection_scope(&self, unit: &UnitModel, nested: bool) -> SelectionAssemblyScope {
        let scales = unit
            .scale_types
            .iter()
            .map(|(channel, scale_type)| {
                let local = unit.scale_name(*channel);
                let component = self.ctx.scale(&local);
                let info = ScaleInfo {
                    name: self.ctx.scale_names.get(&local),
                    type_: component.map(|s| s.scale_type()).unwrap_or(*scale_type),
                    exponent: component
                        .and_then(|s| s.props.get("exponent"))
                        .and_then(|v| v.as_f64()),
                };
                (*channel, info)
            })
            .collect();
        let size = |channel| {
            if nested {
                self.ctx
                    .size_names
                    .get(&unit.base.get_name(size_type(channel)))
            } else {
                size_type(channel).to_string()
            }
        };
        SelectionAssemblyScope {
            unit_name: unit.selection_unit_name(),
            mark: unit.mark,
            marks_name: unit.base.get_name("marks"),
            voronoi_name: unit.base.get_name("voronoi"),
            width: size(Channel::X),
            height: size(Channel::Y),
            scales,
            nested,
        }
    }

    fn facet(&mut self, facet: &FacetModel, content: &mut GroupContent) -> Result<()> {
        content.marks.extend(assemble_headers(facet, &*self.ctx, self.data)?);

        let cell_scope = AssembleScope {
            nested: true,
            cell_data: facet.cell_data,
        };
        let cell_content = self.content(&facet.child, cell_scope)?;

        let mut cell = MarkSpec::new("group");
        cell.name = Some(facet.base.get_name("cell"));
        cell.style = Some(StringOrStringList::String("cell".to_string()));
        if let Some(cell_data) = facet.cell_data {
            let fields: Vec<String> = [Channel::Row, Channel::Column]
                .into_iter()
                .filter_map(|channel| facet.facet_field(channel))
                .collect();
            cell.from = Some(MarkFromSpec {
                data: None,
                facet: Some(MarkFacetSpec {
                    name: FACET_DATA.to_string(),
                    data: self.data.name(cell_data)?,
                    groupby: fields.clone(),
                }),
            });
            cell.sort = Some(MarkSort {
                field: StringOrStringList::StringList(fields.iter().map(|f| datum_access(f)).collect()),
                order: Some(SortOrderOrList::SortOrderList(vec![
                    SortOrderSpec::Ascending;
                    fields.len()
                ])),
            });
        }
        for channel in [Channel::X, Channel::Y] {
            let signal = self.size_name(&facet.child, channel);
            cell.update_channels_mut().insert(
                size_type(channel).to_string(),
                MarkEncodingSpec::signal(signal).into(),
            );
        }
        content.marks.push(cell_content.into_group(cell));

        let columns = match facet.column_domain {
            Some(domain) => json!({"signal": format!("length(data('{}'))", self.data.name(domain)?)}),
            None => json!(1),
        };
        content.layout = Some(json!({
            "padding": {"row": 10, "column": 10},
            "offset": 10,
            "columns": columns,
            "bounds": "full",
            "align": "all"
        }));
        Ok(())
    }
}

fn is_fit(autosize: &Value) -> bool {
    match autosize {
        Value::String(s) => s == "fit",
        Value::Object(obj) => obj.get("type").and_then(|t| t.as_str()) == Some("fit"),
        _ => false,
    }
}

fn title_spec(title: &TitleDef) -> TitleSpec {
    let (text, extra) = match title {
        TitleDef::Text(text) => (text.clone(), HashMap::new()),
        TitleDef::Params { text, extra } => (
            text.clone(),
            extra.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        ),
    };
    TitleSpec {
        text: ValueOrSignalSpec::Value(Value::from(text)),
        orient: None,
        anchor: None,
        extra,
    }
}

/// The top-level output spec of a fully parsed model tree
pub fn assemble_chart(
    model: &Model,
    top: &TopLevelSpec,
    data: &AssembledData,
    ctx: &mut CompileContext,
) -> Result<ChartSpec> {
    let mut chart = ChartSpec {
        schema: crate::spec::chart::default_schema(),
        ..Default::default()
    };

    let autosize = top
        .autosize
        .clone()
        .or_else(|| ctx.config.autosize.clone())
        .unwrap_or_else(|| Value::from("pad"));
    chart.autosize = Some(if is_fit(&autosize) && !matches!(model, Model::Unit(_) | Model::Layer(_)) {
        ctx.diagnostics.warn(message::autosize_fit_not_supported());
        Value::from("pad")
    } else {
        autosize
    });
    chart.padding = top.padding.clone().or_else(|| ctx.config.padding.clone());
    chart.background = top.background.clone().or_else(|| ctx.config.background.clone());
    chart.description = model.base().common.description.clone();
    chart.title = model.base().common.title.as_ref().map(title_spec);
    let (width, height) = root_size(model);
    chart.width = width;
    chart.height = height;

    let units = model.units();
    for unit in &units {
        chart.data.extend(unit.selections.iter().map(assemble_store));
    }
    chart.data.extend(data.datasets.iter().cloned());

    let mut signals = Vec::new();
    assemble_size_signals(model, true, ctx, &mut signals);
    let has_selections = units.iter().any(|u| !u.selections.is_empty());
    if has_selections {
        signals.push(unit_signal());
    }

    let content = Assembler {
        ctx: &mut *ctx,
        data,
    }
        .content(model, AssembleScope::default())
        .with_context(|| "Assembling the output spec".to_string())?;
    signals.extend(content.signals);

    let assembler = Assembler {
        ctx: &mut *ctx,
        data,
    };
    for unit in &units {
        if unit.selections.is_empty() {
            continue;
        }
        let nested = !matches!(model, Model::Unit(_) | Model::Layer(_)) || !unit.facet_fields.is_empty();
        let scope = assembler.selection_scope(unit, nested);
        signals = assemble_top_level_signals(&scope, &unit.selections, signals)?;
    }
    chart.signals = signals;
    chart.scales = content.scales;
    chart.axes = content.axes;
    chart.legends = content.legends;
    chart.marks = content.marks;
    chart.layout = content.layout;
    Ok(chart)
}

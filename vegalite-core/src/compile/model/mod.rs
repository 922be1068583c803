//! The model tree mirroring the nesting of the input views, and the compile passes run over it
pub mod concat;
pub mod facet;
pub mod layer;
pub mod unit;

use crate::compile::axis::AxisComponent;
use crate::compile::context::CompileContext;
use crate::compile::layout_size::LayoutSizeComponent;
use crate::compile::legend::LegendComponent;
use crate::compile::repeater::RepeatValues;
use crate::compile::resolve::{CompositionKind, ResolveComponent};
use crate::compile::scale::ScaleComponent;
use crate::error::{Result, VegaLiteError};
use crate::vl::channel::Channel;
use crate::vl::fielddef::var_name;
use crate::vl::spec::{CommonSpec, GenericSpec};
use concat::ConcatModel;
use facet::FacetModel;
use layer::LayerModel;
use petgraph::prelude::NodeIndex;
use std::collections::{BTreeMap, HashMap};
use unit::UnitModel;

/// Progress of a model through the compile passes. Every pass requires the previous
/// stage, so a pass cannot run on a node twice or out of order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Constructed,
    DataParsed,
    SelectionParsed,
    ScaleParsed,
    LayoutSizeParsed,
    MarkParsed,
    GuidesParsed,
}

/// Compilation state filled in by the passes
#[derive(Debug, Clone, Default)]
pub struct Component {
    /// Scales owned by this node; merged child scales are removed from the child
    pub scales: BTreeMap<Channel, ScaleComponent>,
    pub axes: BTreeMap<Channel, Vec<AxisComponent>>,
    pub legends: BTreeMap<Channel, LegendComponent>,
    pub resolve: ResolveComponent,
    pub layout_size: LayoutSizeComponent,
    /// Output node of the data flow read by the node's marks and children
    pub main_data: Option<NodeIndex>,
}

#[derive(Debug, Clone)]
pub struct ModelBase {
    pub name: String,
    pub common: CommonSpec,
    pub component: Component,
    stage: Stage,
}

impl ModelBase {
    pub fn new(name: String, common: CommonSpec) -> Self {
        Self {
            name,
            common,
            component: Default::default(),
            stage: Stage::Constructed,
        }
    }

    /// Name scoped to this node, e.g. `concat_0_x`
    pub fn get_name(&self, suffix: &str) -> String {
        if self.name.is_empty() {
            var_name(suffix)
        } else {
            var_name(&format!("{}_{suffix}", self.name))
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn advance(&mut self, from: Stage, to: Stage) -> Result<()> {
        if self.stage != from {
            return Err(VegaLiteError::internal(format!(
                "Cannot move model \"{}\" to {to:?}: expected stage {from:?}, found {:?}",
                self.name, self.stage
            )));
        }
        self.stage = to;
        Ok(())
    }
}

/// What a node inherits from its ancestors while the tree is built
#[derive(Debug, Clone, Default)]
pub struct BuildScope {
    pub name: String,
    pub width: Option<f64>,
    pub height: Option<f64>,
    /// Facet fields partitioning the data of every descendant unit
    pub facet_fields: Vec<String>,
    /// Expression appended to the unit name of selections inside facet cells
    pub facet_unit_suffix: String,
    pub repeat: Option<RepeatValues>,
}

impl BuildScope {
    pub fn root() -> Self {
        Self::default()
    }

    /// Scope of a child named `name`, keeping the facet context
    pub fn child(&self, name: String) -> Self {
        Self {
            name,
            width: None,
            height: None,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone)]
pub enum Model {
    Unit(UnitModel),
    Layer(LayerModel),
    Facet(FacetModel),
    Repeat(ConcatModel),
    Concat(ConcatModel),
}

impl Model {
    pub fn build(spec: GenericSpec, scope: BuildScope, ctx: &mut CompileContext) -> Result<Model> {
        Ok(match spec {
            GenericSpec::Unit(spec) => Model::Unit(UnitModel::new(spec, scope, ctx)?),
            GenericSpec::Layer(spec) => Model::Layer(LayerModel::new(spec, scope, ctx)?),
            GenericSpec::Facet(spec) => Model::Facet(FacetModel::new(spec, scope, ctx)?),
            GenericSpec::Repeat(spec) => Model::Repeat(ConcatModel::new_repeat(spec, scope, ctx)?),
            GenericSpec::Concat(spec) => Model::Concat(ConcatModel::new_concat(spec, scope, ctx)?),
        })
    }

    pub fn base(&self) -> &ModelBase {
        match self {
            Model::Unit(m) => &m.base,
            Model::Layer(m) => &m.base,
            Model::Facet(m) => &m.base,
            Model::Repeat(m) | Model::Concat(m) => &m.base,
        }
    }

    pub fn base_mut(&mut self) -> &mut ModelBase {
        match self {
            Model::Unit(m) => &mut m.base,
            Model::Layer(m) => &mut m.base,
            Model::Facet(m) => &mut m.base,
            Model::Repeat(m) | Model::Concat(m) => &mut m.base,
        }
    }

    pub fn kind(&self) -> Option<CompositionKind> {
        match self {
            Model::Unit(_) => None,
            Model::Layer(_) => Some(CompositionKind::Layer),
            Model::Facet(_) => Some(CompositionKind::Facet),
            Model::Repeat(_) => Some(CompositionKind::Repeat),
            Model::Concat(_) => Some(CompositionKind::Concat),
        }
    }

    pub fn children(&self) -> &[Model] {
        match self {
            Model::Unit(_) => &[],
            Model::Layer(m) => &m.children,
            Model::Facet(m) => std::slice::from_ref(m.child.as_ref()),
            Model::Repeat(m) | Model::Concat(m) => &m.children,
        }
    }

    /// Units of the subtree in depth-first order
    pub fn units(&self) -> Vec<&UnitModel> {
        match self {
            Model::Unit(unit) => vec![unit],
            other => other.children().iter().flat_map(|c| c.units()).collect(),
        }
    }

    pub fn parse_data(&mut self, parent: Option<NodeIndex>, ctx: &mut CompileContext) -> Result<()> {
        self.base_mut().advance(Stage::Constructed, Stage::DataParsed)?;
        match self {
            Model::Unit(m) => m.parse_data(parent, ctx),
            Model::Layer(m) => m.parse_data(parent, ctx),
            Model::Facet(m) => m.parse_data(parent, ctx),
            Model::Repeat(m) | Model::Concat(m) => m.parse_data(parent, ctx),
        }
    }

    pub fn parse_selection(&mut self, ctx: &mut CompileContext) -> Result<()> {
        self.base_mut()
            .advance(Stage::DataParsed, Stage::SelectionParsed)?;
        match self {
            Model::Unit(m) => m.parse_selection(ctx),
            Model::Layer(m) => m.children.iter_mut().try_for_each(|c| c.parse_selection(ctx)),
            Model::Facet(m) => m.child.parse_selection(ctx),
            Model::Repeat(m) | Model::Concat(m) => {
                m.children.iter_mut().try_for_each(|c| c.parse_selection(ctx))
            }
        }
    }

    pub fn parse_scale(&mut self, ctx: &mut CompileContext) -> Result<()> {
        self.base_mut()
            .advance(Stage::SelectionParsed, Stage::ScaleParsed)?;
        match self {
            Model::Unit(m) => m.parse_scale(ctx),
            Model::Layer(m) => m.parse_scale(ctx),
            Model::Facet(m) => m.parse_scale(ctx),
            Model::Repeat(m) | Model::Concat(m) => m.parse_scale(ctx),
        }
    }

    pub fn parse_layout_size(&mut self, ctx: &mut CompileContext) -> Result<()> {
        self.base_mut()
            .advance(Stage::ScaleParsed, Stage::LayoutSizeParsed)?;
        match self {
            Model::Unit(m) => m.parse_layout_size(ctx),
            Model::Layer(m) => m.parse_layout_size(ctx),
            Model::Facet(m) => m.child.parse_layout_size(ctx),
            Model::Repeat(m) | Model::Concat(m) => m
                .children
                .iter_mut()
                .try_for_each(|c| c.parse_layout_size(ctx)),
        }
    }

    pub fn parse_mark(&mut self, ctx: &mut CompileContext) -> Result<()> {
        self.base_mut()
            .advance(Stage::LayoutSizeParsed, Stage::MarkParsed)?;
        match self {
            Model::Unit(m) => m.parse_mark(ctx),
            Model::Layer(m) => m.children.iter_mut().try_for_each(|c| c.parse_mark(ctx)),
            Model::Facet(m) => m.child.parse_mark(ctx),
            Model::Repeat(m) | Model::Concat(m) => {
                m.children.iter_mut().try_for_each(|c| c.parse_mark(ctx))
            }
        }
    }

    /// Axes and legends, merged bottom-up like scales
    pub fn parse_guides(&mut self, ctx: &mut CompileContext) -> Result<()> {
        self.base_mut()
            .advance(Stage::MarkParsed, Stage::GuidesParsed)?;
        match self {
            Model::Unit(m) => m.parse_guides(ctx),
            Model::Layer(m) => m.parse_guides(ctx),
            Model::Facet(m) => m.parse_guides(ctx),
            Model::Repeat(m) | Model::Concat(m) => m.parse_guides(ctx),
        }
    }

    /// Owned scales of the subtree, keyed by name
    pub fn collect_scales(&self, scales: &mut HashMap<String, ScaleComponent>) {
        for scale in self.base().component.scales.values() {
            scales.insert(scale.name.clone(), scale.clone());
        }
        for child in self.children() {
            child.collect_scales(scales);
        }
    }

    /// Assert that every node of the subtree finished the passes
    pub fn check_stage(&self, stage: Stage) -> Result<()> {
        if self.base().stage() != stage {
            return Err(VegaLiteError::internal(format!(
                "Model \"{}\" is at stage {:?} instead of {stage:?}",
                self.base().name,
                self.base().stage()
            )));
        }
        self.children().iter().try_for_each(|c| c.check_stage(stage))
    }
}

/// Move the legends of `children` up into `base` when their scales are shared.
/// The first child defining a legend for a channel wins.
pub fn merge_child_legends(
    base: &mut ModelBase,
    children: &mut [Model],
    ctx: &mut CompileContext,
) {
    use crate::compile::resolve::{parse_guide_resolve, GuideKind};
    use crate::vl::resolve::ResolveMode;

    let channels: Vec<Channel> = children
        .iter()
        .flat_map(|c| c.base().component.legends.keys().copied())
        .collect::<std::collections::BTreeSet<_>>()
        .into_iter()
        .collect();
    for channel in channels {
        let scale_mode = base
            .component
            .resolve
            .scale
            .get(&channel)
            .copied()
            .unwrap_or(ResolveMode::Shared);
        let mode = parse_guide_resolve(
            &base.common.resolve,
            scale_mode,
            GuideKind::Legend,
            channel,
            &mut ctx.diagnostics,
        );
        base.component.resolve.legend.insert(channel, mode);
        if mode == ResolveMode::Independent {
            continue;
        }
        let mut merged: Option<LegendComponent> = None;
        for child in children.iter_mut() {
            if let Some(legend) = child.base_mut().component.legends.remove(&channel) {
                match merged.as_mut() {
                    None => merged = Some(legend),
                    Some(merged) => merged.merge(&legend, &mut ctx.diagnostics),
                }
            }
        }
        if let Some(merged) = merged {
            base.component.legends.insert(channel, merged);
        }
    }
}

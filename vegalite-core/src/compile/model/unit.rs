use crate::compile::axis::parse_unit_axes;
use crate::compile::context::CompileContext;
use crate::compile::data::parse::{parse_unit_data, UnitData};
use crate::compile::layout_size::parse_unit_size;
use crate::compile::legend::parse_unit_legends;
use crate::compile::log::Diagnostics;
use crate::compile::mark::{infer_orient, parse_marks};
use crate::compile::model::{BuildScope, ModelBase};
use crate::compile::scale::parse_unit_scales;
use crate::compile::scale::scale_type::scale_type;
use crate::compile::selection::{parse_unit_selections, SelectionComponent, UnitSelectionScope};
use crate::compile::stack::{stack, StackProperties};
use crate::error::{Result, ResultWithContext};
use crate::spec::mark::MarkSpec;
use crate::vl::channel::{Channel, SCALE_CHANNELS};
use crate::vl::config::Config;
use crate::vl::encoding::Encoding;
use crate::vl::mark::{MarkDef, MarkType};
use crate::vl::scale::ScaleType;
use crate::vl::selection::SelectionDef;
use crate::vl::spec::UnitSpec;
use petgraph::prelude::NodeIndex;
use std::collections::BTreeMap;
use vegalite_common::escape::string_value;

/// A single mark with its encoding
#[derive(Debug, Clone)]
pub struct UnitModel {
    pub base: ModelBase,
    pub mark_def: MarkDef,
    pub mark: MarkType,
    pub encoding: Encoding,
    pub selection_defs: BTreeMap<String, SelectionDef>,
    pub selections: Vec<SelectionComponent>,
    /// Scale type of every channel with a scale, resolved at construction
    pub scale_types: BTreeMap<Channel, ScaleType>,
    pub stack: Option<StackProperties>,
    pub fixed_width: Option<f64>,
    pub fixed_height: Option<f64>,
    /// Fields of the enclosing facets, kept through aggregation and stacking
    pub facet_fields: Vec<String>,
    pub facet_unit_suffix: String,
    /// Marks with their encodings, without `from`
    pub marks: Vec<MarkSpec>,
    data: Option<UnitData>,
}

/// Whether a discrete position scale of `channel` would be sized by a step
fn has_range_step(
    channel: Channel,
    unit_spec: &UnitSpec,
    mark: MarkType,
    fixed: Option<f64>,
    config: &Config,
) -> bool {
    if !channel.is_position() || fixed.is_some() {
        return false;
    }
    let explicit = unit_spec
        .encoding
        .field_def(channel)
        .and_then(|d| d.scale_def())
        .and_then(|s| s.range_step);
    match explicit {
        Some(step) => step.is_some(),
        None => config.scale.range_step.is_some() || (channel == Channel::X && mark == MarkType::Text),
    }
}

fn parse_scale_types(
    spec: &UnitSpec,
    mark: MarkType,
    fixed_width: Option<f64>,
    fixed_height: Option<f64>,
    config: &Config,
    diagnostics: &mut Diagnostics,
) -> Result<BTreeMap<Channel, ScaleType>> {
    let mut types = BTreeMap::new();
    for channel in SCALE_CHANNELS {
        let Some(def) = spec.encoding.field_def(channel) else {
            continue;
        };
        if def.scale_disabled() {
            continue;
        }
        let fixed = if channel == Channel::Y {
            fixed_height
        } else {
            fixed_width
        };
        let range_step = has_range_step(channel, spec, mark, fixed, config);
        types.insert(
            channel,
            scale_type(channel, def, mark, range_step, diagnostics)
                .with_context(|| format!("Resolving the {channel} scale type"))?,
        );
    }
    Ok(types)
}

impl UnitModel {
    pub fn new(spec: UnitSpec, scope: BuildScope, ctx: &mut CompileContext) -> Result<Self> {
        let mut mark_def = spec.mark.to_def();
        let mark = mark_def.type_;
        let fixed_width = spec.common.width.or(scope.width);
        let fixed_height = spec.common.height.or(scope.height);
        let scale_types = parse_scale_types(
            &spec,
            mark,
            fixed_width,
            fixed_height,
            &ctx.config,
            &mut ctx.diagnostics,
        )?;
        let stack = stack(mark, &spec.encoding, ctx.config.stack, &mut ctx.diagnostics);
        mark_def.orient = infer_orient(
            mark,
            mark_def.orient,
            &spec.encoding,
            stack.as_ref(),
            &mut ctx.diagnostics,
        );
        log::debug!("Built unit \"{}\" with mark {mark}", scope.name);

        Ok(Self {
            base: ModelBase::new(scope.name, spec.common),
            mark_def,
            mark,
            encoding: spec.encoding,
            selection_defs: spec.selection,
            selections: Vec::new(),
            scale_types,
            stack,
            fixed_width,
            fixed_height,
            facet_fields: scope.facet_fields,
            facet_unit_suffix: scope.facet_unit_suffix,
            marks: Vec::new(),
            data: None,
        })
    }

    /// Local name of the scale of `channel`, before any merge
    pub fn scale_name(&self, channel: Channel) -> String {
        self.base.get_name(channel.scale_channel().name())
    }

    pub fn has_fixed_size(&self, channel: Channel) -> bool {
        if channel == Channel::Y {
            self.fixed_height.is_some()
        } else {
            self.fixed_width.is_some()
        }
    }

    pub fn main_data(&self) -> Result<NodeIndex> {
        self.data
            .map(|d| d.main)
            .with_context(|| format!("Data of unit \"{}\" is not parsed", self.base.name))
    }

    /// Rows before aggregation; the main data when the unit does not aggregate
    pub fn raw_data(&self) -> Result<NodeIndex> {
        let data = self
            .data
            .with_context(|| format!("Data of unit \"{}\" is not parsed", self.base.name))?;
        Ok(data.raw.unwrap_or(data.main))
    }

    /// Expression of the unit name recorded in selection tuples
    pub fn selection_unit_name(&self) -> String {
        format!("{}{}", string_value(&self.base.name), self.facet_unit_suffix)
    }

    pub fn parse_data(&mut self, parent: Option<NodeIndex>, ctx: &mut CompileContext) -> Result<()> {
        let data = parse_unit_data(self, parent, ctx)?;
        self.data = Some(data);
        self.base.component.main_data = Some(data.main);
        Ok(())
    }

    pub fn parse_selection(&mut self, ctx: &mut CompileContext) -> Result<()> {
        let scope = UnitSelectionScope {
            encoding: &self.encoding,
            scale_types: &self.scale_types,
            unit_name: self.selection_unit_name(),
        };
        self.selections = parse_unit_selections(
            &self.selection_defs,
            &scope,
            &ctx.config,
            &mut ctx.diagnostics,
        )?;
        for selection in &self.selections {
            ctx.selections.insert(selection.name.clone(), selection.info());
        }
        Ok(())
    }

    pub fn parse_scale(&mut self, ctx: &mut CompileContext) -> Result<()> {
        self.base.component.scales = parse_unit_scales(self, ctx)?;
        Ok(())
    }

    pub fn parse_layout_size(&mut self, ctx: &mut CompileContext) -> Result<()> {
        for channel in [Channel::X, Channel::Y] {
            let size = parse_unit_size(self, channel, ctx);
            self.base.component.layout_size.set(channel, Some(size));
        }
        Ok(())
    }

    pub fn parse_mark(&mut self, ctx: &mut CompileContext) -> Result<()> {
        self.marks = parse_marks(self, ctx)?;
        Ok(())
    }

    pub fn parse_guides(&mut self, ctx: &mut CompileContext) -> Result<()> {
        self.base.component.axes = parse_unit_axes(self, ctx);
        self.base.component.legends = parse_unit_legends(self, ctx);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn build(spec: serde_json::Value) -> (UnitModel, CompileContext) {
        let mut ctx = CompileContext::new(Config::from_layers(&[]).unwrap());
        let spec: UnitSpec = serde_json::from_value(spec).unwrap();
        let unit = UnitModel::new(spec, BuildScope::root(), &mut ctx).unwrap();
        (unit, ctx)
    }

    #[test]
    fn test_scale_types_and_stack() {
        let (unit, _) = build(json!({
            "mark": "bar",
            "encoding": {
                "x": {"field": "a", "type": "ordinal"},
                "y": {"field": "b", "type": "quantitative", "aggregate": "sum"},
                "color": {"field": "c", "type": "nominal"}
            }
        }));
        assert_eq!(unit.scale_types[&Channel::X], ScaleType::Band);
        assert_eq!(unit.scale_types[&Channel::Y], ScaleType::Linear);
        assert_eq!(unit.scale_types[&Channel::Color], ScaleType::Ordinal);
        let stack = unit.stack.unwrap();
        assert_eq!(stack.field_channel, Channel::Y);
        assert_eq!(stack.groupby_channel, Some(Channel::X));
    }

    #[test]
    fn test_disabled_scale_and_fixed_size() {
        let (unit, _) = build(json!({
            "mark": "point",
            "width": 300,
            "encoding": {
                "x": {"field": "a", "type": "quantitative"},
                "color": {"field": "c", "type": "nominal", "scale": null}
            }
        }));
        assert!(unit.scale_types.contains_key(&Channel::X));
        assert!(!unit.scale_types.contains_key(&Channel::Color));
        assert!(unit.has_fixed_size(Channel::X));
        assert!(!unit.has_fixed_size(Channel::Y));
        assert_eq!(unit.selection_unit_name(), "\"\"");
        assert!(unit.main_data().is_err());
    }
}

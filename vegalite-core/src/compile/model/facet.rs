use crate::compile::context::CompileContext;
use crate::compile::data::parse::{parse_bin_and_time_unit, parse_composite_data, parse_facet_domain};
use crate::compile::data::DataFlowNode;
use crate::compile::log::message;
use crate::compile::model::{merge_child_legends, BuildScope, Model, ModelBase};
use crate::compile::resolve::{parse_guide_resolve, CompositionKind, GuideKind};
use crate::compile::scale::parse_composite_scales;
use crate::error::Result;
use crate::vl::channel::Channel;
use crate::vl::fielddef::{FieldDef, FieldRefOption};
use crate::vl::resolve::ResolveMode;
use crate::vl::spec::{FacetMapping, FacetSpec};
use petgraph::prelude::NodeIndex;
use vegalite_common::escape::string_value;

/// A view repeated in a grid of cells, one per value of the row and column fields
#[derive(Debug, Clone)]
pub struct FacetModel {
    pub base: ModelBase,
    pub facet: FacetMapping,
    pub child: Box<Model>,
    /// Distinct row and column values, read by the header groups
    pub row_domain: Option<NodeIndex>,
    pub column_domain: Option<NodeIndex>,
    /// Data partitioned into the cells
    pub cell_data: Option<NodeIndex>,
}

impl FacetModel {
    pub fn new(spec: FacetSpec, scope: BuildScope, ctx: &mut CompileContext) -> Result<Self> {
        let base = ModelBase::new(scope.name.clone(), spec.common);
        let facet = spec.facet;

        let mut child_scope = BuildScope {
            width: base.common.width,
            height: base.common.height,
            ..scope.child(base.get_name("child"))
        };
        for (channel, def) in facet_defs(&facet) {
            if !def.is_discrete() {
                ctx.diagnostics
                    .warn(message::facet_channel_should_be_discrete(channel));
            }
            let field = def.vg_field(channel, &FieldRefOption::default());
            child_scope.facet_unit_suffix.push_str(&format!(
                " + {} + (facet[{}])",
                string_value(&format!("__facet_{}_", channel.name())),
                string_value(&field)
            ));
            child_scope.facet_fields.push(field);
        }

        let child = Model::build(*spec.spec, child_scope, ctx)?;
        log::debug!("Built facet \"{}\"", base.name);
        Ok(Self {
            base,
            facet,
            child: Box::new(child),
            row_domain: None,
            column_domain: None,
            cell_data: None,
        })
    }

    /// Field of the row or column facet as found in the data
    pub fn facet_field(&self, channel: Channel) -> Option<String> {
        self.facet_def(channel)
            .map(|def| def.vg_field(channel, &FieldRefOption::default()))
    }

    pub fn facet_def(&self, channel: Channel) -> Option<&FieldDef> {
        match channel {
            Channel::Row => self.facet.row.as_ref(),
            Channel::Column => self.facet.column.as_ref(),
            _ => None,
        }
    }

    pub fn parse_data(&mut self, parent: Option<NodeIndex>, ctx: &mut CompileContext) -> Result<()> {
        let mut head = parse_composite_data(&self.base, parent, ctx)?.or(parent);
        if let Some(node) = head {
            let defs = facet_defs(&self.facet);
            let derived = defs
                .iter()
                .any(|(_, def)| def.is_binned() || def.time_unit.is_some());
            if derived {
                let node = parse_bin_and_time_unit(&self.base, &defs, |_, _| false, node, &mut ctx.dataflow);
                head = Some(ctx.dataflow.add(DataFlowNode::output(), Some(node)));
            }
        }
        self.base.component.main_data = head;
        self.child.parse_data(head, ctx)?;

        let cell_data = match self.child.units().first() {
            Some(unit) => unit.main_data()?,
            None => return Ok(()),
        };
        self.cell_data = Some(cell_data);
        for channel in [Channel::Row, Channel::Column] {
            let Some(field) = self.facet_field(channel) else {
                continue;
            };
            let name = self.base.get_name(&format!("{}_domain", channel.name()));
            let domain = parse_facet_domain(name, field, cell_data, &mut ctx.dataflow);
            match channel {
                Channel::Row => self.row_domain = Some(domain),
                _ => self.column_domain = Some(domain),
            }
        }
        Ok(())
    }

    pub fn parse_scale(&mut self, ctx: &mut CompileContext) -> Result<()> {
        parse_composite_scales(
            &mut self.base,
            CompositionKind::Facet,
            std::slice::from_mut(self.child.as_mut()),
            ctx,
        )
    }

    /// Shared axes are drawn once in the headers: their main axis moves up to the
    /// facet while the grid companion stays in every cell
    pub fn parse_guides(&mut self, ctx: &mut CompileContext) -> Result<()> {
        self.child.parse_guides(ctx)?;
        for channel in [Channel::X, Channel::Y] {
            let scale_mode = self
                .base
                .component
                .resolve
                .scale
                .get(&channel)
                .copied()
                .unwrap_or(ResolveMode::Shared);
            let mode = parse_guide_resolve(
                &self.base.common.resolve,
                scale_mode,
                GuideKind::Axis,
                channel,
                &mut ctx.diagnostics,
            );
            self.base.component.resolve.axis.insert(channel, mode);
            if mode == ResolveMode::Independent {
                continue;
            }
            let child_axes = &mut self.child.base_mut().component.axes;
            let Some(axes) = child_axes.remove(&channel) else {
                continue;
            };
            let (grid, main): (Vec<_>, Vec<_>) = axes.into_iter().partition(|a| a.grid_only);
            if !grid.is_empty() {
                child_axes.insert(channel, grid);
            }
            if !main.is_empty() {
                self.base.component.axes.insert(channel, main);
            }
        }
        merge_child_legends(
            &mut self.base,
            std::slice::from_mut(self.child.as_mut()),
            ctx,
        );
        Ok(())
    }
}

fn facet_defs(facet: &FacetMapping) -> Vec<(Channel, &FieldDef)> {
    let mut defs = Vec::new();
    if let Some(row) = &facet.row {
        defs.push((Channel::Row, row));
    }
    if let Some(column) = &facet.column {
        defs.push((Channel::Column, column));
    }
    defs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vl::config::Config;
    use crate::vl::spec::GenericSpec;
    use serde_json::json;

    #[test]
    fn test_child_scope() {
        let mut ctx = CompileContext::new(Config::from_layers(&[]).unwrap());
        let spec: GenericSpec = serde_json::from_value(json!({
            "facet": {"row": {"field": "r", "type": "nominal"}},
            "spec": {"mark": "point", "encoding": {"x": {"field": "a", "type": "quantitative"}}}
        }))
        .unwrap();
        let model = Model::build(spec, BuildScope::root(), &mut ctx).unwrap();
        let unit = model.units()[0];
        assert_eq!(unit.base.name, "child");
        assert_eq!(unit.facet_fields, vec!["r".to_string()]);
        assert_eq!(
            unit.selection_unit_name(),
            r#""child" + "__facet_row_" + (facet["r"])"#
        );
        assert!(ctx.diagnostics.warnings().is_empty());
    }

    #[test]
    fn test_continuous_facet_field_warns() {
        let mut ctx = CompileContext::new(Config::from_layers(&[]).unwrap());
        let spec: FacetSpec = serde_json::from_value(json!({
            "facet": {"column": {"field": "q", "type": "quantitative"}},
            "spec": {"mark": "point"}
        }))
        .unwrap();
        FacetModel::new(spec, BuildScope::root(), &mut ctx).unwrap();
        assert_eq!(
            ctx.diagnostics.warnings(),
            vec![message::facet_channel_should_be_discrete(Channel::Column)]
        );
    }
}

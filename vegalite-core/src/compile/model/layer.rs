use crate::compile::axis::merge_axes;
use crate::compile::context::CompileContext;
use crate::compile::data::parse::parse_composite_data;
use crate::compile::layout_size::{merge_sizes, size_type, LayoutSize};
use crate::compile::log::message;
use crate::compile::model::{merge_child_legends, BuildScope, Model, ModelBase};
use crate::compile::resolve::{parse_guide_resolve, CompositionKind, GuideKind};
use crate::compile::scale::parse_composite_scales;
use crate::compile::split::Explicit;
use crate::error::{Result, VegaLiteError};
use crate::vl::channel::{Channel, POSITION_SCALE_CHANNELS};
use crate::vl::resolve::ResolveMode;
use crate::vl::spec::{GenericSpec, LayerSpec};
use petgraph::prelude::NodeIndex;

/// Views drawn on top of each other in one group
#[derive(Debug, Clone)]
pub struct LayerModel {
    pub base: ModelBase,
    pub children: Vec<Model>,
}

fn opposite_orient(orient: &str) -> &'static str {
    match orient {
        "left" => "right",
        "right" => "left",
        "top" => "bottom",
        _ => "top",
    }
}

impl LayerModel {
    pub fn new(spec: LayerSpec, scope: BuildScope, ctx: &mut CompileContext) -> Result<Self> {
        if spec.layer.is_empty() {
            return Err(VegaLiteError::specification(message::composite_without_children(
                "layer",
            )));
        }
        let base = ModelBase::new(scope.name.clone(), spec.common);
        let width = base.common.width.or(scope.width);
        let height = base.common.height.or(scope.height);

        let mut children = Vec::with_capacity(spec.layer.len());
        for (i, child) in spec.layer.into_iter().enumerate() {
            if !matches!(child, GenericSpec::Unit(_) | GenericSpec::Layer(_)) {
                return Err(VegaLiteError::specification(
                    "A layer can only contain unit or layer views",
                ));
            }
            let child_scope = BuildScope {
                width,
                height,
                ..scope.child(base.get_name(&format!("layer_{i}")))
            };
            children.push(Model::build(child, child_scope, ctx)?);
        }
        log::debug!("Built layer \"{}\" with {} children", base.name, children.len());
        Ok(Self { base, children })
    }

    pub fn parse_data(&mut self, parent: Option<NodeIndex>, ctx: &mut CompileContext) -> Result<()> {
        let head = parse_composite_data(&self.base, parent, ctx)?.or(parent);
        self.base.component.main_data = head;
        for child in &mut self.children {
            child.parse_data(head, ctx)?;
        }
        Ok(())
    }

    pub fn parse_scale(&mut self, ctx: &mut CompileContext) -> Result<()> {
        parse_composite_scales(&mut self.base, CompositionKind::Layer, &mut self.children, ctx)
    }

    /// Layers share one size; the children sizes are redirected to the layer's
    pub fn parse_layout_size(&mut self, ctx: &mut CompileContext) -> Result<()> {
        for child in &mut self.children {
            child.parse_layout_size(ctx)?;
        }
        for channel in [Channel::X, Channel::Y] {
            let size_type = size_type(channel);
            let sizes: Vec<Explicit<LayoutSize>> = self
                .children
                .iter()
                .filter_map(|c| c.base().component.layout_size.get(channel).cloned())
                .filter(|s| s.value != LayoutSize::Merged)
                .collect();
            let merged = merge_sizes(sizes, size_type, &ctx.scale_names, &mut ctx.diagnostics);
            let name = self.base.get_name(size_type);
            for child in &mut self.children {
                let child_base = child.base_mut();
                ctx.size_names.rename(child_base.get_name(size_type), name.as_str());
                child_base
                    .component
                    .layout_size
                    .set(channel, Some(Explicit::implicit(LayoutSize::Merged)));
            }
            self.base.component.layout_size.set(channel, merged);
        }
        Ok(())
    }

    /// Child axes move up to the layer: shared axes are merged into one, independent
    /// ones are kept side by side with later axes on the opposite side
    pub fn parse_guides(&mut self, ctx: &mut CompileContext) -> Result<()> {
        for child in &mut self.children {
            child.parse_guides(ctx)?;
        }
        for channel in POSITION_SCALE_CHANNELS {
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

            let mut merged = Vec::new();
            let mut used_orients: Vec<String> = Vec::new();
            for child in &mut self.children {
                let Some(mut axes) = child.base_mut().component.axes.remove(&channel) else {
                    continue;
                };
                match mode {
                    ResolveMode::Shared => merge_axes(&mut merged, axes, &mut ctx.diagnostics),
                    ResolveMode::Independent => {
                        let orient = axes
                            .iter()
                            .find(|a| !a.grid_only)
                            .and_then(|a| a.orient().map(String::from));
                        if let Some(orient) = orient {
                            let explicit = axes.iter().any(|a| !a.grid_only && a.has_explicit("orient"));
                            let orient = if used_orients.contains(&orient) && !explicit {
                                let flipped = opposite_orient(&orient).to_string();
                                for axis in &mut axes {
                                    axis.props.set("orient", flipped.as_str(), false);
                                }
                                flipped
                            } else {
                                orient
                            };
                            used_orients.push(orient);
                        }
                        merged.extend(axes);
                    }
                }
            }
            if !merged.is_empty() {
                self.base.component.axes.insert(channel, merged);
            }
        }
        merge_child_legends(&mut self.base, &mut self.children, ctx);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vl::config::Config;
    use serde_json::json;

    fn build(spec: serde_json::Value) -> (Model, CompileContext) {
        let mut ctx = CompileContext::new(Config::from_layers(&[]).unwrap());
        let spec: GenericSpec = serde_json::from_value(spec).unwrap();
        let model = Model::build(spec, BuildScope::root(), &mut ctx).unwrap();
        (model, ctx)
    }

    #[test]
    fn test_children_are_named_after_the_layer() {
        let (model, _) = build(json!({
            "width": 300,
            "layer": [{"mark": "bar"}, {"mark": "rule"}]
        }));
        let names: Vec<&str> = model.children().iter().map(|c| c.base().name.as_str()).collect();
        assert_eq!(names, vec!["layer_0", "layer_1"]);
        assert_eq!(model.units()[1].fixed_width, Some(300.0));
    }

    #[test]
    fn test_empty_layer_is_rejected() {
        let mut ctx = CompileContext::new(Config::from_layers(&[]).unwrap());
        let spec: LayerSpec = serde_json::from_value(json!({"layer": []})).unwrap();
        let err = LayerModel::new(spec, BuildScope::root(), &mut ctx).unwrap_err();
        assert!(matches!(err, VegaLiteError::SpecificationError(_, _)));
    }
}

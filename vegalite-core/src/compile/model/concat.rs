use crate::compile::context::CompileContext;
use crate::compile::data::parse::parse_composite_data;
use crate::compile::log::message;
use crate::compile::model::{merge_child_legends, BuildScope, Model, ModelBase};
use crate::compile::repeater::{replace_repeat_refs, RepeatValues};
use crate::compile::resolve::{parse_guide_resolve, CompositionKind, GuideKind};
use crate::compile::scale::parse_composite_scales;
use crate::error::{Result, VegaLiteError};
use crate::vl::channel::POSITION_SCALE_CHANNELS;
use crate::vl::fielddef::var_name;
use crate::vl::resolve::ResolveMode;
use crate::vl::spec::{ConcatDirection, ConcatSpec, RepeatSpec};
use petgraph::prelude::NodeIndex;
use serde_json::{json, Value};

/// Views laid out in a grid: explicit concatenations and repeated views alike
#[derive(Debug, Clone)]
pub struct ConcatModel {
    pub base: ModelBase,
    pub children: Vec<Model>,
    pub kind: CompositionKind,
    /// Number of grid columns
    pub columns: usize,
}

impl ConcatModel {
    pub fn new_concat(spec: ConcatSpec, scope: BuildScope, ctx: &mut CompileContext) -> Result<Self> {
        let kind_name = match spec.direction {
            ConcatDirection::Horizontal => "hconcat",
            ConcatDirection::Vertical => "vconcat",
        };
        if spec.concat.is_empty() {
            return Err(VegaLiteError::specification(message::composite_without_children(
                kind_name,
            )));
        }
        let base = ModelBase::new(scope.name.clone(), spec.common);
        let columns = match spec.direction {
            ConcatDirection::Horizontal => spec.concat.len(),
            ConcatDirection::Vertical => 1,
        };
        let mut children = Vec::with_capacity(spec.concat.len());
        for (i, child) in spec.concat.into_iter().enumerate() {
            let child_scope = scope.child(base.get_name(&format!("concat_{i}")));
            children.push(Model::build(child, child_scope, ctx)?);
        }
        log::debug!("Built {kind_name} \"{}\" with {} children", base.name, children.len());
        Ok(Self {
            base,
            children,
            kind: CompositionKind::Concat,
            columns,
        })
    }

    /// One child per combination of the repeated row and column fields, with the
    /// repeat references of each copy replaced by its fields
    pub fn new_repeat(spec: RepeatSpec, scope: BuildScope, ctx: &mut CompileContext) -> Result<Self> {
        let rows = spec.repeat.row.clone().unwrap_or_default();
        let columns = spec.repeat.column.clone().unwrap_or_default();
        if rows.is_empty() && columns.is_empty() {
            return Err(VegaLiteError::specification(message::composite_without_children(
                "repeat",
            )));
        }
        let base = ModelBase::new(scope.name.clone(), spec.common);
        let row_values: Vec<Option<String>> = if rows.is_empty() {
            vec![None]
        } else {
            rows.into_iter().map(Some).collect()
        };
        let column_values: Vec<Option<String>> = if columns.is_empty() {
            vec![None]
        } else {
            columns.into_iter().map(Some).collect()
        };

        let mut children = Vec::with_capacity(row_values.len() * column_values.len());
        for row in &row_values {
            for column in &column_values {
                let values = RepeatValues {
                    row: row.clone(),
                    column: column.clone(),
                };
                let mut child_spec = spec.spec.as_ref().clone();
                replace_repeat_refs(&mut child_spec, &values, &mut ctx.diagnostics);

                let mut name = "child".to_string();
                if let Some(row) = row {
                    name.push_str(&format!("__row_{}", var_name(row)));
                }
                if let Some(column) = column {
                    name.push_str(&format!("__column_{}", var_name(column)));
                }
                let child_scope = BuildScope {
                    repeat: Some(values),
                    ..scope.child(base.get_name(&name))
                };
                children.push(Model::build(child_spec, child_scope, ctx)?);
            }
        }
        log::debug!("Built repeat \"{}\" with {} children", base.name, children.len());
        Ok(Self {
            base,
            children,
            kind: CompositionKind::Repeat,
            columns: column_values.len(),
        })
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
        parse_composite_scales(&mut self.base, self.kind, &mut self.children, ctx)
    }

    /// Axes stay with the child views, which are laid out apart. Shared legends merge.
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
                .unwrap_or(ResolveMode::Independent);
            let mode = parse_guide_resolve(
                &self.base.common.resolve,
                scale_mode,
                GuideKind::Axis,
                channel,
                &mut ctx.diagnostics,
            );
            self.base.component.resolve.axis.insert(channel, mode);
        }
        merge_child_legends(&mut self.base, &mut self.children, ctx);
        Ok(())
    }

    /// Vega grid layout of the children
    pub fn layout(&self) -> Value {
        let align = match self.kind {
            CompositionKind::Repeat => "all",
            _ => "each",
        };
        json!({
            "padding": {"row": 10, "column": 10},
            "offset": 10,
            "columns": self.columns,
            "bounds": "full",
            "align": align
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vl::channel::Channel;
    use crate::vl::config::Config;
    use crate::vl::spec::GenericSpec;

    fn build(spec: Value) -> Model {
        let mut ctx = CompileContext::new(Config::from_layers(&[]).unwrap());
        let spec: GenericSpec = serde_json::from_value(spec).unwrap();
        Model::build(spec, BuildScope::root(), &mut ctx).unwrap()
    }

    #[test]
    fn test_repeat_children() {
        let model = build(json!({
            "repeat": {"row": ["a", "b"], "column": ["c"]},
            "spec": {
                "mark": "point",
                "encoding": {
                    "x": {"field": {"repeat": "column"}, "type": "quantitative"},
                    "y": {"field": {"repeat": "row"}, "type": "quantitative"}
                }
            }
        }));
        let Model::Repeat(repeat) = &model else {
            panic!("expected repeat")
        };
        assert_eq!(repeat.columns, 1);
        let names: Vec<&str> = model.children().iter().map(|c| c.base().name.as_str()).collect();
        assert_eq!(names, vec!["child__row_a__column_c", "child__row_b__column_c"]);
        let units = model.units();
        assert_eq!(units[1].encoding.field_def(Channel::Y).unwrap().field_name(), Some("b"));
        assert_eq!(repeat.layout()["align"], "all");
    }

    #[test]
    fn test_hconcat_layout() {
        let model = build(json!({"hconcat": [{"mark": "bar"}, {"mark": "point"}, {"mark": "tick"}]}));
        let Model::Concat(concat) = &model else {
            panic!("expected concat")
        };
        assert_eq!(concat.children[2].base().name, "concat_2");
        assert_eq!(concat.layout()["columns"], 3);
    }
}

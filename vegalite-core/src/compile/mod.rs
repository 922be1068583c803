//! The compile pipeline: a model tree is built from the normalized spec, every pass
//! runs over the whole tree in order, and the result is assembled into a Vega spec
pub mod assemble;
pub mod axis;
pub mod context;
pub mod data;
pub mod header;
pub mod layout_size;
pub mod legend;
pub mod log;
pub mod mark;
pub mod model;
pub mod names;
pub mod repeater;
pub mod resolve;
pub mod scale;
pub mod selection;
pub mod split;
pub mod stack;

use crate::compile::assemble::assemble_chart;
use crate::compile::context::CompileContext;
use crate::compile::data::assemble::assemble_data;
use crate::compile::log::Diagnostic;
use crate::compile::model::{BuildScope, Model, Stage};
use crate::error::{Result, ResultWithContext};
use crate::normalize::normalize;
use crate::spec::chart::ChartSpec;
use crate::vl::config::Config;
use crate::vl::spec::TopLevelSpec;
use serde_json::Value;

#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    /// Config layered between the built-in defaults and the config of the spec
    pub config: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct CompileOutput {
    pub spec: ChartSpec,
    pub diagnostics: Vec<Diagnostic>,
}

/// Compile a Vega-Lite spec into a Vega spec
pub fn compile(spec: &Value, options: &CompileOptions) -> Result<CompileOutput> {
    let mut top = TopLevelSpec::from_value(spec)?;

    let layers: Vec<&Value> = options
        .config
        .iter()
        .chain(top.config.iter())
        .collect();
    let config = Config::from_layers(&layers).with_context(|| "Resolving the config")?;
    let mut ctx = CompileContext::new(config);

    top.spec = normalize(top.spec, &mut ctx.diagnostics);
    let mut model = Model::build(top.spec.clone(), BuildScope::root(), &mut ctx)?;

    model.parse_data(None, &mut ctx)?;
    model.parse_selection(&mut ctx)?;
    model.parse_scale(&mut ctx)?;
    model.collect_scales(&mut ctx.scales);
    model.parse_layout_size(&mut ctx)?;
    model.parse_mark(&mut ctx)?;
    model.parse_guides(&mut ctx)?;
    model.check_stage(Stage::GuidesParsed)?;
    ::log::debug!(
        "Parsed {} units with {} data nodes",
        model.units().len(),
        ctx.dataflow.len()
    );

    let data = assemble_data(&ctx.dataflow, &ctx.selections)?;
    let spec = assemble_chart(&model, &top, &data, &mut ctx)?;
    Ok(CompileOutput {
        spec,
        diagnostics: ctx.diagnostics.into_vec(),
    })
}

/// Compile and serialize the output spec
pub fn compile_to_value(spec: &Value, options: &CompileOptions) -> Result<(Value, Vec<Diagnostic>)> {
    let output = compile(spec, options)?;
    Ok((serde_json::to_value(output.spec)?, output.diagnostics))
}

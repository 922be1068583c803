//! Scale components: parsed per unit, merged upwards through shared compositions,
//! and assembled where their owner is assembled
pub mod domain;
pub mod properties;
pub mod range;
pub mod scale_type;

use crate::compile::context::CompileContext;
use crate::compile::data::assemble::AssembledData;
use crate::compile::log::{message, Diagnostics};
use crate::compile::model::unit::UnitModel;
use crate::compile::model::{Model, ModelBase};
use crate::compile::names::NameMap;
use crate::compile::resolve::{requested_scale_resolve, CompositionKind};
use crate::compile::split::{default_tie_breaker, merge_values_with_explicit, Explicit, Split};
use crate::error::{Result, ResultWithContext};
use crate::spec::scale::{ScaleDomainSortSpec, ScaleRangeSpec, ScaleSpec};
use crate::spec::values::SignalExpressionSpec;
use crate::vl::channel::Channel;
use crate::vl::resolve::ResolveMode;
use crate::vl::scale::ScaleType;
use petgraph::prelude::NodeIndex;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum DomainPart {
    Data {
        data: NodeIndex,
        field: String,
        sort: Option<ScaleDomainSortSpec>,
    },
    Literal(Vec<Value>),
    Signal(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum RangeDef {
    /// `[0, width]`, naming the width signal
    Width(String),
    /// `[height, 0]`
    Height(String),
    Step(f64),
    /// `[0, min(width, height) / 2]`
    Radius { width: String, height: String },
    Spec(ScaleRangeSpec),
}

impl RangeDef {
    /// Ranges spanning the size signals of the owning view
    pub fn is_view_extent(&self) -> bool {
        matches!(
            self,
            RangeDef::Width(_) | RangeDef::Height(_) | RangeDef::Radius { .. }
        )
    }

    pub fn same_kind(&self, other: &RangeDef) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

impl fmt::Display for RangeDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RangeDef::Width(width) => write!(f, "[0, {width}]"),
            RangeDef::Height(height) => write!(f, "[{height}, 0]"),
            RangeDef::Step(step) => write!(f, "{{\"step\": {step}}}"),
            RangeDef::Radius { width, height } => write!(f, "[0, min({width}, {height}) / 2]"),
            RangeDef::Spec(spec) => match serde_json::to_string(spec) {
                Ok(s) => f.write_str(&s),
                Err(_) => f.write_str("range"),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScaleComponent {
    pub name: String,
    pub channel: Channel,
    pub type_: Explicit<ScaleType>,
    pub domains: Vec<DomainPart>,
    pub domain_explicit: bool,
    pub domain_raw: Option<String>,
    pub range: Option<Explicit<RangeDef>>,
    pub props: Split,
}

impl ScaleComponent {
    pub fn scale_type(&self) -> ScaleType {
        self.type_.value
    }

    /// Absorb a scale of the same channel from a sibling view
    pub fn merge(&mut self, other: ScaleComponent, size_names: &NameMap, diagnostics: &mut Diagnostics) {
        let t1 = std::mem::replace(&mut self.type_, Explicit::implicit(ScaleType::Linear));
        self.type_ = merge_values_with_explicit(t1, other.type_, diagnostics, |v1, v2, _| {
            if v2.value.precedence() > v1.value.precedence() {
                v2
            } else {
                v1
            }
        });

        for part in other.domains {
            if !self.domains.contains(&part) {
                self.domains.push(part);
            }
        }
        self.domain_explicit |= other.domain_explicit;
        if self.domain_raw.is_none() {
            self.domain_raw = other.domain_raw;
        }

        let resolve = |r: Explicit<RangeDef>| Explicit::new(range::resolve_range(&r.value, size_names), r.explicit);
        self.range = match (self.range.take(), other.range) {
            (Some(r1), Some(r2)) if r1.value.is_view_extent() && r1.value.same_kind(&r2.value) => {
                Some(if r2.explicit && !r1.explicit { r2 } else { r1 })
            }
            (Some(r1), Some(r2)) => Some(merge_values_with_explicit(
                resolve(r1),
                resolve(r2),
                diagnostics,
                default_tie_breaker("range", "scale"),
            )),
            (r1, r2) => r1.or(r2),
        };
        self.props.merge(&other.props, "scale", diagnostics);
    }

    pub fn assemble(
        &self,
        data: &AssembledData,
        size_names: &NameMap,
        diagnostics: &mut Diagnostics,
    ) -> Result<ScaleSpec> {
        let mut spec = ScaleSpec::new(&self.name);
        spec.type_ = Some(self.scale_type().vega_name().to_string());
        let entries = domain::resolve_parts(&self.domains, data)?;
        spec.domain = domain::union_domains(entries, diagnostics)
            .with_context(|| format!("Assembling the domain of scale {}", self.name))?;
        spec.domain_raw = self.domain_raw.clone().map(SignalExpressionSpec::new);
        spec.range = self
            .range
            .as_ref()
            .map(|r| range::assemble_range(&r.value, size_names));
        for (prop, value) in self.props.combine() {
            match prop.as_str() {
                "padding" => spec.padding = value.as_f64(),
                "paddingInner" => spec.padding_inner = value.as_f64(),
                "paddingOuter" => spec.padding_outer = value.as_f64(),
                "zero" => spec.zero = value.as_bool(),
                "nice" => spec.nice = Some(value),
                "round" => spec.round = value.as_bool(),
                "reverse" => spec.reverse = value.as_bool(),
                "clamp" => spec.clamp = value.as_bool(),
                _ => {
                    spec.extra.insert(prop, value);
                }
            }
        }
        Ok(spec)
    }
}

/// Scales of every channel of a unit with a scale
pub fn parse_unit_scales(
    unit: &UnitModel,
    ctx: &mut CompileContext,
) -> Result<BTreeMap<Channel, ScaleComponent>> {
    let mut scales = BTreeMap::new();
    for (channel, scale_type) in &unit.scale_types {
        let (channel, scale_type) = (*channel, *scale_type);
        let def = unit
            .encoding
            .field_def(channel)
            .with_context(|| format!("No field definition for the {channel} scale"))?;
        let explicit_type = def.scale_def().and_then(|s| s.type_) == Some(scale_type);

        let domain = domain::parse_unit_domain(unit, channel, scale_type, ctx)?;
        let range = range::parse_range(unit, channel, scale_type, &ctx.config, &mut ctx.diagnostics);
        let props = properties::parse_properties(
            def,
            channel,
            scale_type,
            unit.mark,
            domain.explicit,
            &ctx.config,
            &mut ctx.diagnostics,
        );
        scales.insert(
            channel,
            ScaleComponent {
                name: unit.scale_name(channel),
                channel,
                type_: Explicit::new(scale_type, explicit_type),
                domains: domain.parts,
                domain_explicit: domain.explicit,
                domain_raw: domain.raw,
                range,
                props,
            },
        );
    }
    Ok(scales)
}

/// Merge the scales of children that share a channel into `base`. Channels whose child
/// scales have incompatible types stay independent.
pub fn parse_composite_scales(
    base: &mut ModelBase,
    kind: CompositionKind,
    children: &mut [Model],
    ctx: &mut CompileContext,
) -> Result<()> {
    for child in children.iter_mut() {
        child.parse_scale(ctx)?;
    }

    let channels: BTreeSet<Channel> = children
        .iter()
        .flat_map(|c| c.base().component.scales.keys().copied())
        .collect();
    for channel in channels {
        let mut mode = requested_scale_resolve(&base.common.resolve, kind, channel);
        if mode == ResolveMode::Shared {
            let types: Vec<ScaleType> = children
                .iter()
                .filter_map(|c| c.base().component.scales.get(&channel))
                .map(|s| s.scale_type())
                .collect();
            if let Some(first) = types.first() {
                if let Some(other) = types.iter().find(|t| !first.is_compatible(**t)) {
                    ctx.diagnostics
                        .warn(message::incompatible_scale_types(channel, *first, *other));
                    mode = ResolveMode::Independent;
                }
            }
        }
        base.component.resolve.scale.insert(channel, mode);
        if mode == ResolveMode::Independent {
            continue;
        }

        let name = base.get_name(channel.name());
        let mut merged: Option<ScaleComponent> = None;
        for child in children.iter_mut() {
            let Some(scale) = child.base_mut().component.scales.remove(&channel) else {
                continue;
            };
            ctx.scale_names.rename(&scale.name, &name);
            match merged.as_mut() {
                None => {
                    merged = Some(ScaleComponent {
                        name: name.clone(),
                        ..scale
                    })
                }
                Some(merged) => merged.merge(scale, &ctx.size_names, &mut ctx.diagnostics),
            }
        }
        if let Some(merged) = merged {
            base.component.scales.insert(channel, merged);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn component(name: &str, type_: ScaleType, field: &str) -> ScaleComponent {
        ScaleComponent {
            name: name.to_string(),
            channel: Channel::Y,
            type_: Explicit::implicit(type_),
            domains: vec![DomainPart::Data {
                data: NodeIndex::new(0),
                field: field.to_string(),
                sort: None,
            }],
            domain_explicit: false,
            domain_raw: None,
            range: Some(Explicit::implicit(RangeDef::Height(format!("{name}_height")))),
            props: Split::new(),
        }
    }

    #[test]
    fn test_merge_takes_higher_precedence_type() {
        let mut names = NameMap::new();
        names.rename("layer_0_height", "height");
        names.rename("layer_1_height", "height");
        let mut a = component("layer_0", ScaleType::Linear, "a");
        let b = component("layer_1", ScaleType::Log, "b");
        let mut diagnostics = Diagnostics::new();
        a.merge(b, &names, &mut diagnostics);
        assert_eq!(a.scale_type(), ScaleType::Log);
        assert_eq!(a.domains.len(), 2);
        assert_eq!(
            a.range.map(|r| r.value),
            Some(RangeDef::Height("height".to_string()))
        );
        assert!(diagnostics.warnings().is_empty());
    }

    #[test]
    fn test_assemble_props() {
        let mut scale = component("y", ScaleType::Linear, "a");
        scale.props.set("zero", true, false);
        scale.props.set("exponent", 2, true);
        let mut flow = crate::compile::data::DataFlow::new();
        let source = flow.source(
            &crate::vl::data::DataDef {
                name: Some("table".to_string()),
                ..Default::default()
            },
            false,
        );
        let out = flow.add(crate::compile::data::DataFlowNode::output(), Some(source));
        scale.domains = vec![DomainPart::Data {
            data: out,
            field: "a".to_string(),
            sort: None,
        }];
        let data = crate::compile::data::assemble::assemble_data(&flow, &Default::default()).unwrap();
        let spec = scale
            .assemble(&data, &NameMap::new(), &mut Diagnostics::new())
            .unwrap();
        assert_eq!(
            serde_json::to_value(spec).unwrap(),
            json!({
                "name": "y",
                "type": "linear",
                "domain": {"data": "table", "field": "a"},
                "range": [{"signal": "y_height"}, 0],
                "zero": true,
                "exponent": 2
            })
        );
    }
}

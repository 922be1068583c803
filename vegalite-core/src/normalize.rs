//! Rewrites applied to the input before any model is built: facet shorthands become
//! facet views, ranged lines become rules, and invalid channel definitions are dropped
use crate::compile::log::{message, Diagnostics};
use crate::vl::channel::{Channel, FACET_CHANNELS};
use crate::vl::encoding::{ChannelDef, Encoding};
use crate::vl::fielddef::{FieldDef, FieldType};
use crate::vl::mark::{AnyMark, MarkType};
use crate::vl::spec::{CommonSpec, FacetMapping, FacetSpec, GenericSpec, UnitSpec};

/// Kind of view enclosing the spec being normalized
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Parent {
    None,
    Layer,
    Facet,
    Other,
}

/// Normalize a spec and every view nested in it
pub fn normalize(spec: GenericSpec, diagnostics: &mut Diagnostics) -> GenericSpec {
    normalize_spec(spec, Parent::None, diagnostics)
}

fn normalize_spec(spec: GenericSpec, parent: Parent, diagnostics: &mut Diagnostics) -> GenericSpec {
    match spec {
        GenericSpec::Unit(unit) => normalize_unit(unit, parent, diagnostics),
        GenericSpec::Layer(mut layer) => {
            layer.layer = layer
                .layer
                .into_iter()
                .map(|child| normalize_spec(child, Parent::Layer, diagnostics))
                .collect();
            GenericSpec::Layer(layer)
        }
        GenericSpec::Facet(mut facet) => {
            facet.spec = Box::new(normalize_spec(*facet.spec, Parent::Facet, diagnostics));
            GenericSpec::Facet(facet)
        }
        GenericSpec::Repeat(mut repeat) => {
            repeat.spec = Box::new(normalize_spec(*repeat.spec, Parent::Other, diagnostics));
            GenericSpec::Repeat(repeat)
        }
        GenericSpec::Concat(mut concat) => {
            concat.concat = concat
                .concat
                .into_iter()
                .map(|child| normalize_spec(child, Parent::Other, diagnostics))
                .collect();
            GenericSpec::Concat(concat)
        }
    }
}

fn first_def(def: ChannelDef) -> Option<FieldDef> {
    match def {
        ChannelDef::Single(def) => Some(def),
        ChannelDef::List(defs) => defs.into_iter().next(),
    }
}

fn normalize_unit(mut unit: UnitSpec, parent: Parent, diagnostics: &mut Diagnostics) -> GenericSpec {
    ranged_line_to_rule(&mut unit, diagnostics);
    let mark = unit.mark.to_def().type_;
    normalize_encoding(&mut unit.encoding, mark, diagnostics);
    drop_range_steps(&mut unit, diagnostics);

    let facet_channels: Vec<Channel> = FACET_CHANNELS
        .into_iter()
        .filter(|c| unit.encoding.has(*c))
        .collect();
    if facet_channels.is_empty() {
        return GenericSpec::Unit(unit);
    }
    if matches!(parent, Parent::Layer | Parent::Facet) {
        diagnostics.warn(message::facet_channel_dropped(&facet_channels));
        for channel in facet_channels {
            unit.encoding.remove(channel);
        }
        return GenericSpec::Unit(unit);
    }

    let facet = FacetMapping {
        row: unit.encoding.remove(Channel::Row).and_then(first_def),
        column: unit.encoding.remove(Channel::Column).and_then(first_def),
    };
    // The facet takes over the data and everything describing the whole view
    let common = CommonSpec {
        name: unit.common.name.take(),
        title: unit.common.title.take(),
        description: unit.common.description.take(),
        data: unit.common.data.take(),
        transform: std::mem::take(&mut unit.common.transform),
        width: None,
        height: None,
        resolve: std::mem::take(&mut unit.common.resolve),
    };
    GenericSpec::Facet(FacetSpec {
        facet,
        spec: Box::new(GenericSpec::Unit(unit)),
        common,
    })
}

/// A line with an explicit `x2` or `y2` draws separate segments: a rule
fn ranged_line_to_rule(unit: &mut UnitSpec, diagnostics: &mut Diagnostics) {
    if unit.mark.to_def().type_ != MarkType::Line {
        return;
    }
    let has_x2 = unit.encoding.has(Channel::X2);
    let has_y2 = unit.encoding.has(Channel::Y2);
    if !has_x2 && !has_y2 {
        return;
    }
    diagnostics.warn(message::line_with_range(has_x2, has_y2));
    unit.mark = match &unit.mark {
        AnyMark::Type(_) => AnyMark::Type(MarkType::Rule),
        AnyMark::Def(def) => {
            let mut def = def.clone();
            def.type_ = MarkType::Rule;
            AnyMark::Def(def)
        }
    };
}

fn inferred_type(def: &FieldDef) -> FieldType {
    if def.time_unit.is_some() {
        FieldType::Temporal
    } else if def.is_binned() || def.aggregate.is_some() {
        FieldType::Quantitative
    } else {
        FieldType::Nominal
    }
}

fn type_name(type_: FieldType) -> &'static str {
    match type_ {
        FieldType::Quantitative => "quantitative",
        FieldType::Ordinal => "ordinal",
        FieldType::Temporal => "temporal",
        FieldType::Nominal => "nominal",
    }
}

/// Drop channels the mark cannot draw and definitions without field or value, and
/// fill in missing field types
fn normalize_encoding(encoding: &mut Encoding, mark: MarkType, diagnostics: &mut Diagnostics) {
    for channel in encoding.keys() {
        if !channel.supports_mark(mark) {
            diagnostics.warn(message::incompatible_channel(channel, mark));
            encoding.remove(channel);
            continue;
        }
        let Some(channel_def) = encoding.channels.get_mut(&channel) else {
            continue;
        };
        let keep = match channel_def {
            ChannelDef::Single(def) => !def.is_empty(),
            ChannelDef::List(defs) => {
                defs.retain(|def| !def.is_empty());
                !defs.is_empty()
            }
        };
        if !keep {
            diagnostics.warn(message::empty_field_def(channel));
            encoding.remove(channel);
        }
    }

    for (channel, channel_def) in encoding.channels.iter_mut() {
        let defs: Vec<&mut FieldDef> = match channel_def {
            ChannelDef::Single(def) => vec![def],
            ChannelDef::List(defs) => defs.iter_mut().collect(),
        };
        for def in defs {
            if def.field.is_some() && def.type_.is_none() {
                let inferred = inferred_type(def);
                diagnostics.warn(message::missing_field_type(*channel, type_name(inferred)));
                def.type_ = Some(inferred);
            }
        }
    }
    // Definitions nested in conditions
    encoding.visit_field_defs_mut(&mut |def| {
        if def.field.is_some() && def.type_.is_none() {
            def.type_ = Some(inferred_type(def));
        }
    });
}

/// A fixed width or height leaves no room for a range step on the same axis
fn drop_range_steps(unit: &mut UnitSpec, diagnostics: &mut Diagnostics) {
    for (channel, fixed) in [
        (Channel::X, unit.common.width.is_some()),
        (Channel::Y, unit.common.height.is_some()),
    ] {
        if !fixed {
            continue;
        }
        let Some(ChannelDef::Single(def)) = unit.encoding.channels.get_mut(&channel) else {
            continue;
        };
        if let Some(Some(scale)) = def.scale.as_mut() {
            if matches!(scale.range_step, Some(Some(_))) {
                diagnostics.warn(message::range_step_dropped(channel));
                scale.range_step = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn normalized(spec: serde_json::Value) -> (GenericSpec, Diagnostics) {
        let mut diagnostics = Diagnostics::new();
        let spec: GenericSpec = serde_json::from_value(spec).unwrap();
        (normalize(spec, &mut diagnostics), diagnostics)
    }

    #[test]
    fn test_facet_shorthand() {
        let (spec, diagnostics) = normalized(json!({
            "data": {"url": "cars.json"},
            "width": 100,
            "mark": "point",
            "encoding": {
                "row": {"field": "Origin", "type": "nominal"},
                "x": {"field": "Horsepower", "type": "quantitative"}
            }
        }));
        let GenericSpec::Facet(facet) = spec else {
            panic!("expected a facet")
        };
        assert_eq!(facet.facet.row.unwrap().field_name(), Some("Origin"));
        assert!(facet.facet.column.is_none());
        assert!(facet.common.data.is_some());
        let GenericSpec::Unit(unit) = *facet.spec else {
            panic!("expected a unit")
        };
        assert!(unit.common.data.is_none());
        assert_eq!(unit.common.width, Some(100.0));
        assert!(!unit.encoding.has(Channel::Row));
        assert!(diagnostics.warnings().is_empty());
    }

    #[test]
    fn test_facet_channel_dropped_in_layer() {
        let (spec, diagnostics) = normalized(json!({
            "layer": [{
                "mark": "point",
                "encoding": {"column": {"field": "a", "type": "nominal"}}
            }]
        }));
        let GenericSpec::Layer(layer) = spec else {
            panic!("expected a layer")
        };
        assert!(matches!(&layer.layer[0], GenericSpec::Unit(u) if !u.encoding.has(Channel::Column)));
        assert_eq!(
            diagnostics.warnings(),
            vec![message::facet_channel_dropped(&[Channel::Column])]
        );
    }

    #[test]
    fn test_ranged_line_becomes_rule() {
        let (spec, diagnostics) = normalized(json!({
            "mark": "line",
            "encoding": {
                "x": {"field": "a", "type": "quantitative"},
                "x2": {"field": "b"},
                "y": {"field": "c", "type": "nominal"}
            }
        }));
        let GenericSpec::Unit(unit) = spec else {
            panic!("expected a unit")
        };
        assert_eq!(unit.mark.to_def().type_, MarkType::Rule);
        assert_eq!(diagnostics.warnings()[0], message::line_with_range(true, false));
    }

    #[test]
    fn test_invalid_channels_are_dropped_and_types_inferred() {
        let (spec, diagnostics) = normalized(json!({
            "mark": "bar",
            "encoding": {
                "shape": {"field": "s", "type": "nominal"},
                "color": {},
                "x": {"field": "a"},
                "y": {"field": "b", "aggregate": "mean"}
            }
        }));
        let GenericSpec::Unit(unit) = spec else {
            panic!("expected a unit")
        };
        assert!(!unit.encoding.has(Channel::Shape));
        assert!(!unit.encoding.has(Channel::Color));
        assert_eq!(unit.encoding.get(Channel::X).unwrap().type_, Some(FieldType::Nominal));
        assert_eq!(
            unit.encoding.get(Channel::Y).unwrap().type_,
            Some(FieldType::Quantitative)
        );
        let warnings = diagnostics.warnings();
        assert!(warnings.contains(&message::incompatible_channel(Channel::Shape, MarkType::Bar).as_str()));
        assert!(warnings.contains(&message::empty_field_def(Channel::Color).as_str()));
        assert!(warnings.contains(&message::missing_field_type(Channel::X, "nominal").as_str()));
        assert!(warnings.contains(&message::missing_field_type(Channel::Y, "quantitative").as_str()));
    }
}

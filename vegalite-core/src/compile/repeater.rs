//! Replacement of `{"repeat": ...}` field references in the children of a repeat view
use crate::compile::log::{message, Diagnostics};
use crate::vl::encoding::{ChannelDef, Encoding};
use crate::vl::fielddef::{FieldDef, FieldRef, RepeatChannel};
use crate::vl::spec::GenericSpec;

/// Fields iterated by a repeat view for one of its cells
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RepeatValues {
    pub row: Option<String>,
    pub column: Option<String>,
}

impl RepeatValues {
    fn get(&self, channel: RepeatChannel) -> Option<&String> {
        match channel {
            RepeatChannel::Row => self.row.as_ref(),
            RepeatChannel::Column => self.column.as_ref(),
        }
    }
}

/// Replace the repeat reference of `def`; `false` when the repeated value does not exist
fn replace_field(def: &mut FieldDef, values: &RepeatValues, diagnostics: &mut Diagnostics) -> bool {
    let channel = match &def.field {
        Some(FieldRef::Repeat(repeat)) => repeat.repeat,
        _ => return true,
    };
    match values.get(channel) {
        Some(field) => {
            def.field = Some(FieldRef::Field(field.clone()));
            true
        }
        None => {
            let name = match channel {
                RepeatChannel::Row => "row",
                RepeatChannel::Column => "column",
            };
            diagnostics.warn(message::no_such_repeated_value(name));
            false
        }
    }
}

fn replace_in_encoding(encoding: &mut Encoding, values: &RepeatValues, diagnostics: &mut Diagnostics) {
    let channels = encoding.keys();
    for channel in channels {
        let Some(channel_def) = encoding.channels.get_mut(&channel) else {
            continue;
        };
        let keep = match channel_def {
            ChannelDef::Single(def) => replace_field(def, values, diagnostics),
            ChannelDef::List(defs) => {
                defs.retain_mut(|def| replace_field(def, values, diagnostics));
                !defs.is_empty()
            }
        };
        if !keep {
            encoding.remove(channel);
        }
    }
    // References left in conditions
    encoding.visit_field_defs_mut(&mut |def| {
        replace_field(def, values, diagnostics);
    });
}

/// Replace repeat references throughout `spec`. Nested repeat views keep their own
/// references, which they resolve themselves.
pub fn replace_repeat_refs(spec: &mut GenericSpec, values: &RepeatValues, diagnostics: &mut Diagnostics) {
    match spec {
        GenericSpec::Unit(unit) => replace_in_encoding(&mut unit.encoding, values, diagnostics),
        GenericSpec::Layer(layer) => {
            for child in &mut layer.layer {
                replace_repeat_refs(child, values, diagnostics);
            }
        }
        GenericSpec::Facet(facet) => {
            for def in [&mut facet.facet.row, &mut facet.facet.column] {
                if let Some(field_def) = def {
                    if !replace_field(field_def, values, diagnostics) {
                        *def = None;
                    }
                }
            }
            replace_repeat_refs(&mut facet.spec, values, diagnostics);
        }
        GenericSpec::Concat(concat) => {
            for child in &mut concat.concat {
                replace_repeat_refs(child, values, diagnostics);
            }
        }
        GenericSpec::Repeat(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vl::channel::Channel;
    use serde_json::json;

    #[test]
    fn test_replace_in_layer() {
        let mut spec: GenericSpec = serde_json::from_value(json!({
            "layer": [{
                "mark": "point",
                "encoding": {
                    "x": {"field": {"repeat": "column"}, "type": "quantitative"},
                    "y": {"field": {"repeat": "row"}, "type": "quantitative"},
                    "color": {"field": "c", "type": "nominal"}
                }
            }]
        }))
        .unwrap();
        let values = RepeatValues {
            row: Some("a".to_string()),
            column: Some("b".to_string()),
        };
        let mut diagnostics = Diagnostics::new();
        replace_repeat_refs(&mut spec, &values, &mut diagnostics);
        let GenericSpec::Layer(layer) = spec else {
            panic!("expected layer")
        };
        let GenericSpec::Unit(unit) = &layer.layer[0] else {
            panic!("expected unit")
        };
        assert_eq!(unit.encoding.get(Channel::X).unwrap().field_name(), Some("b"));
        assert_eq!(unit.encoding.get(Channel::Y).unwrap().field_name(), Some("a"));
        assert_eq!(unit.encoding.get(Channel::Color).unwrap().field_name(), Some("c"));
        assert!(diagnostics.warnings().is_empty());
    }

    #[test]
    fn test_missing_repeat_value_drops_channel() {
        let mut spec: GenericSpec = serde_json::from_value(json!({
            "mark": "bar",
            "encoding": {"y": {"field": {"repeat": "row"}, "type": "quantitative"}}
        }))
        .unwrap();
        let mut diagnostics = Diagnostics::new();
        replace_repeat_refs(&mut spec, &RepeatValues::default(), &mut diagnostics);
        let GenericSpec::Unit(unit) = spec else {
            panic!("expected unit")
        };
        assert!(!unit.encoding.has(Channel::Y));
        assert_eq!(diagnostics.warnings().len(), 1);
    }
}

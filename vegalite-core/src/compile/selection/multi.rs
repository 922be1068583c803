//! Tuple signal of point selections (`single` and `multi`)
use crate::compile::selection::{SelectionComponent, TUPLE, TUPLE_FIELDS};
use crate::spec::signal::{SignalOnSpec, SignalSpec};
use vegalite_common::escape::string_value;

/// Datum under the pointer, looking through voronoi cells
pub const DATUM: &str = "(item().isVoronoi ? datum.datum : datum)";

pub fn signals(selection: &SelectionComponent) -> Vec<SignalSpec> {
    let name = &selection.name;
    let values: Vec<String> = selection
        .project
        .iter()
        .map(|p| format!("{DATUM}[{}]", string_value(&p.field)))
        .collect();
    let update = format!(
        "datum && item().mark.marktype !== 'group' ? {{unit: {}, fields: {name}{TUPLE_FIELDS}, values: [{}]}} : null",
        selection.unit_name,
        values.join(", ")
    );

    let mut tuple = SignalSpec::new(format!("{name}{TUPLE}"));
    if !selection.events.is_empty() {
        tuple = tuple.with_on(SignalOnSpec::new(selection.events.clone().into(), update).forced());
    }
    vec![tuple]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::selection::{selection_fixture, Projection, ProjectionType};
    use crate::spec::signal::SignalOnEventSpec;
    use crate::vl::selection::SelectionType;
    use serde_json::json;

    #[test]
    fn test_tuple_signal() {
        let mut selection = selection_fixture("pts", SelectionType::Single);
        selection.events = vec![SignalOnEventSpec::source("scope", "click")];
        selection.project = vec![Projection {
            field: "_vgsid_".to_string(),
            channel: None,
            type_: ProjectionType::Enumerated,
        }];
        let signals = signals(&selection);
        assert_eq!(
            serde_json::to_value(&signals[0]).unwrap(),
            json!({
                "name": "pts_tuple",
                "on": [{
                    "events": [{"source": "scope", "type": "click"}],
                    "update": "datum && item().mark.marktype !== 'group' ? {unit: \"\", fields: pts_tuple_fields, values: [(item().isVoronoi ? datum.datum : datum)[\"_vgsid_\"]]} : null",
                    "force": true
                }]
            })
        );
    }
}

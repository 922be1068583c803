mod util;

use serde_json::{json, Value};
use util::{compiled, find_mark};
use vegalite_core::compile;
use vegalite_core::error::VegaLiteError;

fn names(items: &Value) -> Vec<&str> {
    items
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|item| item["name"].as_str())
        .collect()
}

fn scatter(selection: Value) -> Value {
    json!({
        "data": {"values": [{"a": 1, "b": 2, "c": "x"}, {"a": 3, "b": 4, "c": "y"}]},
        "mark": "point",
        "selection": selection,
        "encoding": {
            "x": {"field": "a", "type": "quantitative"},
            "y": {"field": "b", "type": "quantitative"}
        }
    })
}

#[test]
fn test_interval_brush() {
    let (chart, _) = compiled(scatter(json!({"brush": {"type": "interval"}})));

    assert_eq!(names(&chart["data"])[0], "brush_store");
    assert_eq!(
        names(&chart["marks"]),
        vec!["brush_brush_bg", "marks", "brush_brush"]
    );

    let signals = names(&chart["signals"]);
    for name in ["unit", "brush_x", "brush_y", "brush_scale_trigger", "brush_tuple", "brush"] {
        assert!(signals.contains(&name), "missing signal {name} in {signals:?}");
    }
    let brush = chart["signals"]
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["name"] == "brush")
        .unwrap();
    assert_eq!(
        brush["update"],
        r#"vlSelectionResolve("brush_store", "union")"#
    );
}

#[test]
fn test_scale_bound_interval_has_no_brush() {
    let (chart, _) = compiled(scatter(json!({
        "grid": {"type": "interval", "bind": "scales"}
    })));
    assert_eq!(names(&chart["marks"]), vec!["marks"]);
    assert!(names(&chart["signals"]).contains(&"grid_scale_trigger"));

    let x = chart["scales"]
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["name"] == "x")
        .unwrap();
    assert_eq!(x["domainRaw"], json!({"signal": "grid[\"a\"]"}));
}

#[test]
fn test_conditional_color() {
    let mut spec = scatter(json!({"pick": {"type": "single"}}));
    spec["encoding"]["color"] = json!({
        "condition": {"selection": "pick", "value": "firebrick"},
        "value": "grey"
    });
    let (chart, _) = compiled(spec);
    let point = find_mark(&chart["marks"], "marks").unwrap();
    let stroke = point["encode"]["update"]["stroke"].as_array().unwrap();
    assert_eq!(stroke.len(), 2);
    assert_eq!(
        stroke[0]["test"],
        r#"!(length(data("pick_store"))) || (vlSelectionTest("pick_store", datum))"#
    );
    assert_eq!(stroke[0]["value"], "firebrick");
    assert_eq!(stroke[1], json!({"value": "grey"}));
}

#[test]
fn test_filter_by_selection_in_sibling_view() {
    let (chart, _) = compiled(json!({
        "data": {"values": [{"a": 1, "b": 2}]},
        "hconcat": [
            {
                "mark": "point",
                "selection": {"brush": {"type": "interval", "encodings": ["x"]}},
                "encoding": {"x": {"field": "a", "type": "quantitative"}}
            },
            {
                "mark": "point",
                "transform": [{"filter": {"selection": "brush"}}],
                "encoding": {"x": {"field": "b", "type": "quantitative"}}
            }
        ]
    }));
    let filters: Vec<&Value> = chart["data"]
        .as_array()
        .unwrap()
        .iter()
        .flat_map(|d| d["transform"].as_array().into_iter().flatten())
        .filter(|t| t["type"] == "filter")
        .collect();
    assert!(filters
        .iter()
        .any(|t| t["expr"] == r#"!(length(data("brush_store"))) || (vlSelectionTest("brush_store", datum))"#));
}

#[test]
fn test_filter_by_unknown_selection() {
    let spec = json!({
        "data": {"values": [{"a": 1}]},
        "mark": "point",
        "transform": [{"filter": {"selection": "missing"}}],
        "encoding": {"x": {"field": "a", "type": "quantitative"}}
    });
    let err = compile(&spec, &Default::default()).unwrap_err();
    assert!(matches!(err, VegaLiteError::CompilationError(_, _)));
}

mod util;

use rstest::rstest;
use serde_json::{json, Value};
use util::{compiled, find_mark, scale_names};
use vegalite_core::compile::log::message;
use vegalite_core::error::VegaLiteError;
use vegalite_core::{compile, CompileOptions};

#[test]
fn test_aggregated_bar() {
    let (chart, _) = compiled(json!({
        "data": {"values": [{"a": "A", "b": 28}, {"a": "B", "b": 55}]},
        "mark": "bar",
        "encoding": {
            "x": {"field": "a", "type": "ordinal"},
            "y": {"field": "b", "type": "quantitative", "aggregate": "sum"}
        }
    }));
    let update = &chart["marks"][0]["encode"]["update"];
    assert_eq!(chart["marks"][0]["type"], "rect");
    assert_eq!(update["x"], json!({"scale": "x", "field": "a"}));
    assert_eq!(update["width"], json!({"scale": "x", "band": true}));
    assert_eq!(update["y"], json!({"scale": "y", "field": "sum_b"}));
    assert_eq!(update["y2"], json!({"scale": "y", "value": 0}));

    assert_eq!(scale_names(&chart), vec!["x", "y"]);
    assert_eq!(chart["scales"][0]["type"], "band");
    assert_eq!(chart["scales"][1]["type"], "linear");
}

#[test]
fn test_layer_with_independent_x_scales() {
    let (chart, _) = compiled(json!({
        "layer": [
            {
                "data": {"values": [{"a": 1}, {"a": 2}]},
                "mark": "point",
                "encoding": {"x": {"field": "a", "type": "quantitative"}}
            },
            {
                "data": {"values": [{"a": 10}, {"a": 20}]},
                "mark": "tick",
                "encoding": {"x": {"field": "a", "type": "quantitative"}}
            }
        ],
        "resolve": {"scale": {"x": "independent"}}
    }));
    let names = scale_names(&chart);
    assert!(names.contains(&"layer_0_x".to_string()));
    assert!(names.contains(&"layer_1_x".to_string()));
    assert!(!names.contains(&"x".to_string()));

    let domain_data = |name: &str| {
        chart["scales"]
            .as_array()
            .unwrap()
            .iter()
            .find(|s| s["name"] == name)
            .map(|s| s["domain"]["data"].clone())
            .unwrap()
    };
    assert_ne!(domain_data("layer_0_x"), domain_data("layer_1_x"));

    let point = find_mark(&chart["marks"], "layer_0_marks").unwrap();
    assert_eq!(point["encode"]["update"]["x"]["scale"], "layer_0_x");
    let tick = find_mark(&chart["marks"], "layer_1_marks").unwrap();
    assert_eq!(tick["encode"]["update"]["xc"]["scale"], "layer_1_x");
}

#[rstest]
#[case("quantitative")]
#[case("ordinal")]
fn test_shared_layer_scales_merge_quietly(#[case] x_type: &str) {
    let (chart, diagnostics) = compiled(json!({
        "data": {"values": [{"a": 1, "b": 2}, {"a": 3, "b": 4}]},
        "layer": [
            {
                "mark": "point",
                "encoding": {
                    "x": {"field": "a", "type": x_type},
                    "y": {"field": "b", "type": "quantitative"}
                }
            },
            {
                "mark": "line",
                "encoding": {
                    "x": {"field": "a", "type": x_type},
                    "y": {"field": "b", "type": "quantitative"}
                }
            }
        ]
    }));
    assert!(diagnostics.is_empty(), "unexpected diagnostics: {diagnostics:?}");
    assert_eq!(scale_names(&chart), vec!["x", "y"]);
}

#[test]
fn test_line_breaks_on_invalid_values_when_kept() {
    let encoding = json!({
        "x": {"field": "a", "type": "quantitative"},
        "y": {"field": "b", "type": "quantitative"}
    });
    let (chart, _) = compiled(json!({
        "data": {"values": [{"a": 1, "b": 2}, {"a": 2, "b": null}]},
        "mark": "line",
        "encoding": encoding,
        "config": {"invalidValues": null}
    }));
    assert_eq!(
        chart["marks"][0]["encode"]["update"]["defined"],
        json!({"signal": r#"datum["a"] !== null && !isNaN(datum["a"]) && datum["b"] !== null && !isNaN(datum["b"])"#})
    );

    let (chart, _) = compiled(json!({
        "data": {"values": [{"a": 1, "b": 2}, {"a": 2, "b": null}]},
        "mark": "line",
        "encoding": encoding
    }));
    assert_eq!(chart["marks"][0]["encode"]["update"]["defined"], Value::Null);
    let filters: Vec<&Value> = chart["data"]
        .as_array()
        .unwrap()
        .iter()
        .flat_map(|d| d["transform"].as_array().into_iter().flatten())
        .filter(|t| t["type"] == "filter")
        .collect();
    assert!(!filters.is_empty());
}

#[test]
fn test_facet_shares_y_axis() {
    let (chart, _) = compiled(json!({
        "data": {"values": [{"r": "u", "a": 1, "b": 2}, {"r": "v", "a": 3, "b": 4}]},
        "facet": {"row": {"field": "r", "type": "nominal"}},
        "spec": {
            "mark": "point",
            "encoding": {
                "x": {"field": "a", "type": "quantitative"},
                "y": {"field": "b", "type": "quantitative"}
            }
        }
    }));
    assert_eq!(chart["axes"], Value::Null);

    let cell = find_mark(&chart["marks"], "cell").unwrap();
    assert_eq!(cell["from"]["facet"]["name"], "facet");
    assert_eq!(cell["from"]["facet"]["groupby"], json!(["r"]));
    for axis in cell["axes"].as_array().into_iter().flatten() {
        assert_eq!(axis["labels"], false, "main axis left in the cell: {axis}");
    }
    let marks = find_mark(&cell["marks"], "child_marks").unwrap();
    assert_eq!(marks["from"]["data"], "facet");

    let row_header = find_mark(&chart["marks"], "row_header").unwrap();
    let header_axes = row_header["axes"].as_array().unwrap();
    assert_eq!(header_axes.len(), 1);
    assert_eq!(header_axes[0]["scale"], "y");
    assert_eq!(header_axes[0]["orient"], "left");
    assert!(find_mark(&chart["marks"], "row_title").is_some());

    let column_footer = find_mark(&chart["marks"], "column_footer").unwrap();
    assert_eq!(column_footer["axes"][0]["scale"], "x");

    assert_eq!(chart["layout"]["columns"], 1);
    assert_eq!(chart["layout"]["align"], "all");
}

#[test]
fn test_binned_field_on_ordinal_scale() {
    let (chart, _) = compiled(json!({
        "data": {"values": [{"a": 1.5}, {"a": 7.25}, {"a": 3}]},
        "mark": "bar",
        "encoding": {
            "x": {"field": "a", "bin": true, "type": "ordinal"},
            "y": {"aggregate": "count", "type": "quantitative"}
        }
    }));
    let x = &chart["scales"][0];
    assert_eq!(x["name"], "x");
    assert_eq!(x["type"], "band");
    assert_eq!(x["domain"]["field"], "bin_maxbins_10_a_range");
    assert_eq!(
        x["domain"]["sort"],
        json!({"field": "bin_maxbins_10_a", "op": "min"})
    );
    let update = &chart["marks"][0]["encode"]["update"];
    assert_eq!(
        update["x"],
        json!({"scale": "x", "field": "bin_maxbins_10_a_range"})
    );
    assert_eq!(update["y"], json!({"scale": "y", "field": "count_*"}));
}

#[test]
fn test_repeat_columns() {
    let (chart, _) = compiled(json!({
        "data": {"values": [{"a": 1, "b": 2, "c": 3}]},
        "repeat": {"column": ["a", "b"]},
        "spec": {
            "mark": "point",
            "encoding": {
                "x": {"field": {"repeat": "column"}, "type": "quantitative"},
                "y": {"field": "c", "type": "quantitative"}
            }
        }
    }));
    assert_eq!(chart["layout"]["columns"], 2);
    let first = find_mark(&chart["marks"], "child__column_a_group").unwrap();
    let second = find_mark(&chart["marks"], "child__column_b_group").unwrap();
    assert_eq!(first["style"], "cell");
    let first_x = find_mark(&first["marks"], "child__column_a_marks").unwrap();
    assert_eq!(first_x["encode"]["update"]["x"]["field"], "a");
    let second_x = find_mark(&second["marks"], "child__column_b_marks").unwrap();
    assert_eq!(second_x["encode"]["update"]["x"]["field"], "b");
}

#[test]
fn test_fit_autosize_on_concat_warns() {
    let (chart, diagnostics) = compiled(json!({
        "autosize": "fit",
        "data": {"values": [{"a": 1}]},
        "hconcat": [
            {"mark": "point", "encoding": {"x": {"field": "a", "type": "quantitative"}}},
            {"mark": "tick", "encoding": {"x": {"field": "a", "type": "quantitative"}}}
        ]
    }));
    assert_eq!(chart["autosize"], "pad");
    assert!(diagnostics.contains(&message::autosize_fit_not_supported()));
    assert_eq!(chart["layout"]["columns"], 2);
}

#[test]
fn test_config_option_layers_under_spec_config() {
    let spec = json!({
        "data": {"values": [{"a": 1}]},
        "mark": "point",
        "encoding": {"x": {"field": "a", "type": "quantitative"}},
        "config": {"padding": 12}
    });
    let options = CompileOptions {
        config: Some(json!({"padding": 3, "background": "white"})),
    };
    let output = compile(&spec, &options).unwrap();
    let chart = serde_json::to_value(&output.spec).unwrap();
    assert_eq!(chart["padding"], 12);
    assert_eq!(chart["background"], "white");
}

#[rstest]
#[case(json!([1, 2, 3]))]
#[case(json!({"data": {"values": []}}))]
#[case(json!({"hconcat": []}))]
#[case(json!({"layer": [{"repeat": {"row": ["a"]}, "spec": {"mark": "point"}}]}))]
fn test_invalid_specs_are_rejected(#[case] spec: Value) {
    let err = compile(&spec, &Default::default()).unwrap_err();
    assert!(
        matches!(err, VegaLiteError::SpecificationError(_, _)),
        "unexpected error: {err}"
    );
}

#[test]
fn test_outputs_reference_defined_scales() {
    for spec in [
        json!({
            "data": {"values": [{"a": 1, "b": 2, "c": "x"}]},
            "mark": "line",
            "encoding": {
                "x": {"field": "a", "type": "quantitative"},
                "y": {"field": "b", "type": "quantitative"},
                "color": {"field": "c", "type": "nominal"}
            }
        }),
        json!({
            "data": {"values": [{"a": 1, "b": 2, "c": "x"}]},
            "facet": {"column": {"field": "c", "type": "nominal"}},
            "spec": {
                "mark": "bar",
                "encoding": {
                    "x": {"field": "c", "type": "nominal"},
                    "y": {"field": "b", "type": "quantitative", "aggregate": "mean"}
                }
            }
        }),
    ] {
        let output = compile(&spec, &Default::default()).unwrap();
        output.spec.validate_scale_references().unwrap();
    }
}

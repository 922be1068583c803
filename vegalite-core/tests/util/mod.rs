#![allow(dead_code)]

use serde_json::Value;
use vegalite_core::{compile, CompileOptions};

/// Compile `spec` with default options, returning the output and its diagnostic messages
pub fn compiled(spec: Value) -> (Value, Vec<String>) {
    let _ = env_logger::builder().is_test(true).try_init();
    let output = compile(&spec, &CompileOptions::default()).unwrap();
    let messages = output
        .diagnostics
        .iter()
        .map(|d| d.message.clone())
        .collect();
    (serde_json::to_value(&output.spec).unwrap(), messages)
}

/// Mark named `name` in an array of marks
pub fn find_mark<'a>(marks: &'a Value, name: &str) -> Option<&'a Value> {
    marks.as_array()?.iter().find(|m| m["name"] == name)
}

pub fn scale_names(chart: &Value) -> Vec<String> {
    chart["scales"]
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|s| s["name"].as_str().map(String::from))
        .collect()
}

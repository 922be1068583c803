//! Test expressions over selection stores
use crate::compile::log::message;
use crate::compile::selection::{SelectionInfo, STORE};
use crate::error::{Result, VegaLiteError};
use crate::vl::fielddef::var_name;
use crate::vl::predicate::{LogicalOperand, Predicate};
use crate::vl::selection::{SelectionEmpty, SelectionResolution};
use std::collections::BTreeMap;
use vegalite_common::escape::string_value;

/// Expression testing `datum` against a boolean composition of selections.
/// Stores of selections that select everything while empty short-circuit the test.
pub fn selection_predicate(
    op: &LogicalOperand<String>,
    selections: &BTreeMap<String, SelectionInfo>,
) -> Result<String> {
    let mut stores: Vec<String> = Vec::new();
    let test = op.expr(&mut |name: &String| {
        let name = var_name(name);
        let selection = selections
            .get(&name)
            .ok_or_else(|| VegaLiteError::compilation(message::no_such_selection(&name)))?;
        let store = string_value(&format!("{name}{STORE}"));
        if selection.empty != SelectionEmpty::None && !stores.contains(&store) {
            stores.push(store.clone());
        }
        Ok(match selection.resolve {
            SelectionResolution::Global => format!("vlSelectionTest({store}, datum)"),
            resolve => format!(
                "vlSelectionTest({store}, datum, {})",
                string_value(resolve.name())
            ),
        })
    })?;

    if stores.is_empty() {
        Ok(format!("({test})"))
    } else {
        let guards: Vec<String> = stores
            .iter()
            .map(|store| format!("length(data({store}))"))
            .collect();
        Ok(format!("!({}) || ({test})", guards.join(" || ")))
    }
}

/// Expression for a filter or condition test
pub fn predicate_expr(
    op: &LogicalOperand<Predicate>,
    selections: &BTreeMap<String, SelectionInfo>,
) -> Result<String> {
    op.expr(&mut |predicate: &Predicate| match predicate {
        Predicate::Expr(expr) => Ok(expr.clone()),
        Predicate::Field(field) => Ok(field.expr()),
        Predicate::Selection { selection } => selection_predicate(selection, selections),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vl::selection::SelectionType;
    use serde_json::json;

    fn selections() -> BTreeMap<String, SelectionInfo> {
        let info = |name: &str, resolve, empty| SelectionInfo {
            name: name.to_string(),
            type_: SelectionType::Interval,
            resolve,
            empty,
            project: vec![],
        };
        let mut selections = BTreeMap::new();
        selections.insert(
            "brush".to_string(),
            info("brush", SelectionResolution::Global, SelectionEmpty::All),
        );
        selections.insert(
            "pts".to_string(),
            info("pts", SelectionResolution::Intersect, SelectionEmpty::None),
        );
        selections
    }

    #[test]
    fn test_single_selection() {
        let op = LogicalOperand::Leaf("brush".to_string());
        assert_eq!(
            selection_predicate(&op, &selections()).unwrap(),
            r#"!(length(data("brush_store"))) || (vlSelectionTest("brush_store", datum))"#
        );
    }

    #[test]
    fn test_empty_none_has_no_guard() {
        let op = LogicalOperand::Leaf("pts".to_string());
        assert_eq!(
            selection_predicate(&op, &selections()).unwrap(),
            r#"(vlSelectionTest("pts_store", datum, "intersect"))"#
        );
    }

    #[test]
    fn test_composition() {
        let op: LogicalOperand<String> =
            serde_json::from_value(json!({"and": ["brush", {"not": "pts"}]})).unwrap();
        assert_eq!(
            selection_predicate(&op, &selections()).unwrap(),
            r#"!(length(data("brush_store"))) || ((vlSelectionTest("brush_store", datum)) && (!(vlSelectionTest("pts_store", datum, "intersect"))))"#
        );
    }

    #[test]
    fn test_unknown_selection_is_an_error() {
        let op = LogicalOperand::Leaf("nope".to_string());
        let err = selection_predicate(&op, &selections()).unwrap_err();
        assert!(matches!(err, VegaLiteError::CompilationError(_, _)));
    }

    #[test]
    fn test_mixed_filter() {
        let op: LogicalOperand<Predicate> = serde_json::from_value(json!({
            "or": ["datum.a > 1", {"field": "b", "equal": 2}]
        }))
        .unwrap();
        assert_eq!(
            predicate_expr(&op, &selections()).unwrap(),
            r#"(datum.a > 1) || (datum["b"]===2)"#
        );
    }
}

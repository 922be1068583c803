use crate::error::Result;
use crate::vl::timeunit::TimeUnit;
use serde::Deserialize;
use serde_json::Value;
use vegalite_common::escape::datum_access;

/// Boolean composition of leaf operands
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum LogicalOperand<T> {
    Not { not: Box<LogicalOperand<T>> },
    And { and: Vec<LogicalOperand<T>> },
    Or { or: Vec<LogicalOperand<T>> },
    Leaf(T),
}

impl<T> LogicalOperand<T> {
    /// Build an expression string, compiling each leaf with `leaf`
    pub fn expr<F>(&self, leaf: &mut F) -> Result<String>
    where
        F: FnMut(&T) -> Result<String>,
    {
        Ok(match self {
            LogicalOperand::Not { not } => format!("!({})", not.expr(leaf)?),
            LogicalOperand::And { and } => Self::join(and, " && ", leaf)?,
            LogicalOperand::Or { or } => Self::join(or, " || ", leaf)?,
            LogicalOperand::Leaf(t) => leaf(t)?,
        })
    }

    fn join<F>(operands: &[LogicalOperand<T>], op: &str, leaf: &mut F) -> Result<String>
    where
        F: FnMut(&T) -> Result<String>,
    {
        let parts = operands
            .iter()
            .map(|o| Ok(format!("({})", o.expr(leaf)?)))
            .collect::<Result<Vec<_>>>()?;
        Ok(parts.join(op))
    }

    pub fn for_each_leaf<F: FnMut(&T)>(&self, f: &mut F) {
        match self {
            LogicalOperand::Not { not } => not.for_each_leaf(f),
            LogicalOperand::And { and: ops } | LogicalOperand::Or { or: ops } => {
                for op in ops {
                    op.for_each_leaf(f)
                }
            }
            LogicalOperand::Leaf(t) => f(t),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldPredicate {
    pub field: String,
    pub time_unit: Option<TimeUnit>,
    pub equal: Option<Value>,
    pub range: Option<[Value; 2]>,
    pub one_of: Option<Vec<Value>>,
    pub lt: Option<Value>,
    pub lte: Option<Value>,
    pub gt: Option<Value>,
    pub gte: Option<Value>,
}

impl FieldPredicate {
    pub fn expr(&self) -> String {
        let field = match &self.time_unit {
            Some(unit) => format!("time({})", unit.field_expr(&self.field)),
            None => datum_access(&self.field),
        };
        let mut clauses: Vec<String> = Vec::new();
        if let Some(equal) = &self.equal {
            clauses.push(format!("{field}==={equal}"));
        }
        if let Some([lo, hi]) = &self.range {
            match (lo.is_null(), hi.is_null()) {
                (false, false) => clauses.push(format!("inrange({field}, [{lo}, {hi}])")),
                (false, true) => clauses.push(format!("{field}>={lo}")),
                (true, false) => clauses.push(format!("{field}<={hi}")),
                (true, true) => {}
            }
        }
        if let Some(one_of) = &self.one_of {
            let values: Vec<String> = one_of.iter().map(|v| v.to_string()).collect();
            clauses.push(format!("indexof([{}], {field}) !== -1", values.join(",")));
        }
        for (op, value) in [
            ("<", &self.lt),
            ("<=", &self.lte),
            (">", &self.gt),
            (">=", &self.gte),
        ] {
            if let Some(value) = value {
                clauses.push(format!("{field}{op}{value}"));
            }
        }
        if clauses.is_empty() {
            "true".to_string()
        } else {
            clauses.join(" && ")
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Predicate {
    Selection {
        selection: LogicalOperand<String>,
    },
    Field(FieldPredicate),
    Expr(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_predicates() {
        let p: Predicate = serde_json::from_value(json!({"field": "a", "equal": "x"})).unwrap();
        let Predicate::Field(p) = p else {
            panic!("expected field predicate")
        };
        assert_eq!(p.expr(), r#"datum["a"]==="x""#);

        let p: FieldPredicate =
            serde_json::from_value(json!({"field": "a", "range": [0, 5]})).unwrap();
        assert_eq!(p.expr(), r#"inrange(datum["a"], [0, 5])"#);

        let p: FieldPredicate =
            serde_json::from_value(json!({"field": "a", "oneOf": [1, 2]})).unwrap();
        assert_eq!(p.expr(), r#"indexof([1,2], datum["a"]) !== -1"#);
    }

    #[test]
    fn test_logical_composition() {
        let op: LogicalOperand<Predicate> = serde_json::from_value(json!({
            "and": ["datum.a > 1", {"not": "datum.b"}]
        }))
        .unwrap();
        let expr = op
            .expr(&mut |p| match p {
                Predicate::Expr(e) => Ok(e.clone()),
                _ => Ok("?".to_string()),
            })
            .unwrap();
        assert_eq!(expr, "(datum.a > 1) && (!(datum.b))");
    }

    #[test]
    fn test_selection_predicate() {
        let op: LogicalOperand<Predicate> =
            serde_json::from_value(json!({"selection": {"or": ["a", "b"]}})).unwrap();
        let mut names = Vec::new();
        op.for_each_leaf(&mut |p| {
            if let Predicate::Selection { selection } = p {
                selection.for_each_leaf(&mut |s| names.push(s.clone()))
            }
        });
        assert_eq!(names, vec!["a", "b"]);
    }
}

//! Values tagged with whether the user specified them
use crate::compile::log::{message, Diagnostics};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt::{Debug, Display};

#[derive(Debug, Clone, PartialEq)]
pub struct Explicit<T> {
    pub value: T,
    pub explicit: bool,
}

impl<T> Explicit<T> {
    pub fn explicit(value: T) -> Self {
        Self {
            value,
            explicit: true,
        }
    }

    pub fn implicit(value: T) -> Self {
        Self {
            value,
            explicit: false,
        }
    }

    pub fn new(value: T, explicit: bool) -> Self {
        Self { value, explicit }
    }
}

/// Merge two values: an explicit value beats an implicit one, equal values
/// keep `v1`, and anything else is decided by `tie_breaker`
pub fn merge_values_with_explicit<T, F>(
    v1: Explicit<T>,
    v2: Explicit<T>,
    diagnostics: &mut Diagnostics,
    tie_breaker: F,
) -> Explicit<T>
where
    T: PartialEq + Debug,
    F: FnOnce(Explicit<T>, Explicit<T>, &mut Diagnostics) -> Explicit<T>,
{
    if v1.explicit && !v2.explicit {
        return v1;
    }
    if v2.explicit && !v1.explicit {
        return v2;
    }
    if v1.value == v2.value {
        return v1;
    }
    tie_breaker(v1, v2, diagnostics)
}

/// Warn about the conflict and keep the first value
pub fn default_tie_breaker<'a, T: Display + 'a>(
    property: &'a str,
    property_of: &'a str,
) -> impl FnOnce(Explicit<T>, Explicit<T>, &mut Diagnostics) -> Explicit<T> + 'a {
    move |v1, v2, diagnostics| {
        diagnostics.warn(message::merge_conflicting_property(
            property,
            property_of,
            &v1.value,
            &v2.value,
        ));
        v1
    }
}

/// Property bag of an axis or legend
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Split {
    props: BTreeMap<String, Explicit<Value>>,
}

impl Split {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set<S: Into<String>, V: Into<Value>>(&mut self, key: S, value: V, explicit: bool) {
        self.props
            .insert(key.into(), Explicit::new(value.into(), explicit));
    }

    /// Set `key` unless it already holds an explicit value
    pub fn set_if_implicit<S: Into<String>, V: Into<Value>>(&mut self, key: S, value: V) {
        let key = key.into();
        if !self.props.get(&key).map(|e| e.explicit).unwrap_or(false) {
            self.set(key, value, false);
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.props.get(key).map(|e| &e.value)
    }

    pub fn get_with_explicit(&self, key: &str) -> Option<&Explicit<Value>> {
        self.props.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Explicit<Value>> {
        self.props.remove(key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.props.keys().cloned().collect()
    }

    /// Merge `other` into this bag property by property
    pub fn merge(&mut self, other: &Split, property_of: &str, diagnostics: &mut Diagnostics) {
        for (key, v2) in &other.props {
            let merged = match self.props.remove(key) {
                Some(v1) => merge_values_with_explicit(
                    v1,
                    v2.clone(),
                    diagnostics,
                    default_tie_breaker(key, property_of),
                ),
                None => v2.clone(),
            };
            self.props.insert(key.clone(), merged);
        }
    }

    /// Flatten into a JSON object, dropping null values
    pub fn combine(&self) -> Map<String, Value> {
        self.props
            .iter()
            .filter(|(_, v)| !v.value.is_null())
            .map(|(k, v)| (k.clone(), v.value.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_explicit_beats_implicit() {
        let mut diagnostics = Diagnostics::new();
        let merged = merge_values_with_explicit(
            Explicit::implicit(1),
            Explicit::explicit(2),
            &mut diagnostics,
            default_tie_breaker("zero", "scale"),
        );
        assert_eq!(merged, Explicit::explicit(2));
        assert!(diagnostics.entries().is_empty());
    }

    #[test]
    fn test_conflict_keeps_first_and_warns() {
        let mut diagnostics = Diagnostics::new();
        let merged = merge_values_with_explicit(
            Explicit::explicit("a"),
            Explicit::explicit("b"),
            &mut diagnostics,
            default_tie_breaker("orient", "axis"),
        );
        assert_eq!(merged.value, "a");
        assert_eq!(diagnostics.warnings().len(), 1);
    }

    #[test]
    fn test_split_merge() {
        let mut diagnostics = Diagnostics::new();
        let mut s1 = Split::new();
        s1.set("orient", "bottom", false);
        s1.set("title", "a", true);
        let mut s2 = Split::new();
        s2.set("orient", "top", true);
        s2.set("grid", true, false);
        s1.merge(&s2, "axis", &mut diagnostics);
        assert_eq!(
            Value::Object(s1.combine()),
            json!({"orient": "top", "title": "a", "grid": true})
        );
    }
}

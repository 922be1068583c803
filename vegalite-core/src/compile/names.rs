use std::collections::HashMap;

/// Rename table for scale and signal names that were merged into an ancestor.
/// Lookups follow the chain of renames to its end.
#[derive(Debug, Clone, Default)]
pub struct NameMap {
    map: HashMap<String, String>,
}

impl NameMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rename<S: Into<String>, T: Into<String>>(&mut self, old_name: S, new_name: T) {
        let (old_name, new_name) = (old_name.into(), new_name.into());
        if old_name != new_name {
            self.map.insert(old_name, new_name);
        }
    }

    pub fn has(&self, name: &str) -> bool {
        self.map.contains_key(name)
    }

    pub fn get(&self, name: &str) -> String {
        let mut current = name;
        // A chain can be at most as long as the map, which bounds accidental cycles
        for _ in 0..=self.map.len() {
            match self.map.get(current) {
                Some(next) => current = next,
                None => break,
            }
        }
        current.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_name_maps_to_itself() {
        let names = NameMap::new();
        assert_eq!(names.get("x"), "x");
    }

    #[test]
    fn test_rename_is_transitive() {
        let mut names = NameMap::new();
        names.rename("a", "b");
        names.rename("b", "c");
        assert_eq!(names.get("a"), "c");
        assert_eq!(names.get("b"), "c");
        assert_eq!(names.get("c"), "c");
    }

    #[test]
    fn test_rename_after_lookup() {
        let mut names = NameMap::new();
        names.rename("layer_0_x", "x");
        assert_eq!(names.get("layer_0_x"), "x");
        names.rename("x", "concat_0_x");
        assert_eq!(names.get("layer_0_x"), "concat_0_x");
    }

    #[test]
    fn test_self_rename_is_ignored() {
        let mut names = NameMap::new();
        names.rename("x", "x");
        assert!(!names.has("x"));
        assert_eq!(names.get("x"), "x");
    }
}

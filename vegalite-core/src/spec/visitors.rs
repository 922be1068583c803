use crate::error::{Result, VegaLiteError};
use crate::spec::axis::AxisSpec;
use crate::spec::chart::ChartVisitor;
use crate::spec::legend::LegendSpec;
use crate::spec::mark::MarkSpec;
use crate::spec::scale::ScaleSpec;
use std::collections::HashSet;

/// Collects scale definitions and references per group scope, then checks
/// that each reference is resolvable from its scope
#[derive(Clone, Debug, Default)]
pub struct ScaleReferenceVisitor {
    definitions: HashSet<(Vec<u32>, String)>,
    references: Vec<(Vec<u32>, String, String)>,
}

impl ScaleReferenceVisitor {
    pub fn new() -> Self {
        Self::default()
    }

    fn add_reference(&mut self, scope: &[u32], scale: &str, referrer: String) {
        self.references
            .push((Vec::from(scope), scale.to_string(), referrer));
    }

    fn add_mark_references(&mut self, mark: &MarkSpec, scope: &[u32]) {
        let Some(encode) = &mark.encode else {
            return;
        };
        let referrer = format!(
            "{} mark {}",
            mark.type_,
            mark.name.clone().unwrap_or_default()
        );
        for encodings in encode.encodings.values() {
            for (channel, encoding) in &encodings.channels {
                for entry in encoding.to_vec() {
                    if let Some(scale) = &entry.scale {
                        self.add_reference(scope, scale, format!("{referrer} ({channel})"));
                    }
                }
            }
        }
    }

    fn is_visible(&self, scope: &[u32], name: &str) -> bool {
        (0..=scope.len()).any(|len| {
            self.definitions
                .contains(&(Vec::from(&scope[..len]), name.to_string()))
        })
    }

    pub fn finish(&self) -> Result<()> {
        for (scope, name, referrer) in &self.references {
            if !self.is_visible(scope, name) {
                return Err(VegaLiteError::internal(format!(
                    "Undefined scale {name} referenced by {referrer} at scope {scope:?}"
                )));
            }
        }
        Ok(())
    }
}

impl ChartVisitor for ScaleReferenceVisitor {
    fn visit_scale(&mut self, scale: &ScaleSpec, scope: &[u32]) -> Result<()> {
        self.definitions
            .insert((Vec::from(scope), scale.name.clone()));
        Ok(())
    }

    fn visit_axis(&mut self, axis: &AxisSpec, scope: &[u32]) -> Result<()> {
        self.add_reference(scope, &axis.scale, format!("{} axis", axis.orient));
        Ok(())
    }

    fn visit_legend(&mut self, legend: &LegendSpec, scope: &[u32]) -> Result<()> {
        for scale in legend.scale_names() {
            self.add_reference(scope, scale, "legend".to_string());
        }
        Ok(())
    }

    fn visit_non_group_mark(&mut self, mark: &MarkSpec, scope: &[u32]) -> Result<()> {
        self.add_mark_references(mark, scope);
        Ok(())
    }

    fn visit_group_mark(&mut self, mark: &MarkSpec, scope: &[u32]) -> Result<()> {
        // Group encodings are evaluated in the enclosing scope
        let parent = &scope[..scope.len().saturating_sub(1)];
        self.add_mark_references(mark, parent);
        Ok(())
    }
}

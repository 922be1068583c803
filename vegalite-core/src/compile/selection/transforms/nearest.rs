use crate::compile::log::{message, Diagnostics};
use crate::compile::selection::transforms::TransformCompiler;
use crate::compile::selection::{SelectionAssemblyScope, SelectionComponent};
use crate::error::Result;
use crate::spec::mark::{MarkEncodingSpec, MarkFromSpec, MarkSpec};
use crate::vl::channel::Channel;
use crate::vl::selection::SelectionType;
use serde_json::json;

/// Voronoi cells over the marks so that point selections pick the closest datum
pub struct Nearest;

impl TransformCompiler for Nearest {
    fn has(&self, selection: &SelectionComponent) -> bool {
        selection.type_ != SelectionType::Interval && selection.nearest
    }

    fn marks(
        &self,
        scope: &SelectionAssemblyScope,
        selection: &SelectionComponent,
        mut marks: Vec<MarkSpec>,
        diagnostics: &mut Diagnostics,
    ) -> Result<Vec<MarkSpec>> {
        if scope.mark.is_path() {
            diagnostics.warn(message::nearest_not_supported_for_continuous(scope.mark));
            return Ok(marks);
        }
        let has_x = selection.projection(Channel::X).is_some();
        let has_y = selection.projection(Channel::Y).is_some();
        let coord = |projected: bool, axis: &str| {
            if projected || (!has_x && !has_y) {
                format!("datum.datum.{axis} || 0")
            } else {
                "0".to_string()
            }
        };

        let mut cell = MarkSpec::new("path");
        cell.name = Some(scope.voronoi_name.clone());
        cell.from = Some(MarkFromSpec::data(&scope.marks_name));
        let update = cell.update_channels_mut();
        update.insert("fill".into(), MarkEncodingSpec::value("transparent").into());
        update.insert("strokeWidth".into(), MarkEncodingSpec::value(0.35).into());
        update.insert("stroke".into(), MarkEncodingSpec::value("transparent").into());
        update.insert("isVoronoi".into(), MarkEncodingSpec::value(true).into());
        cell.transform.push(json!({
            "type": "voronoi",
            "x": {"expr": coord(has_x, "x")},
            "y": {"expr": coord(has_y, "y")},
            "size": [{"signal": scope.width}, {"signal": scope.height}]
        }));

        let mut index = 0;
        let mut exists = false;
        for (i, mark) in marks.iter().enumerate() {
            match mark.name.as_deref() {
                Some(name) if name == scope.marks_name => index = i,
                Some(name) if name == scope.voronoi_name => exists = true,
                _ => {}
            }
        }
        if !exists {
            let at = (index + 1).min(marks.len());
            marks.insert(at, cell);
        }
        Ok(marks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::selection::{assembly_scope_fixture, selection_fixture};
    use crate::vl::mark::MarkType;

    #[test]
    fn test_voronoi_follows_marks() {
        let mut selection = selection_fixture("pts", SelectionType::Single);
        selection.nearest = true;
        let mut mark = MarkSpec::new("symbol");
        mark.name = Some("marks".to_string());
        let marks = Nearest
            .marks(&assembly_scope_fixture(MarkType::Point), &selection, vec![mark], &mut Diagnostics::new())
            .unwrap();
        assert_eq!(marks.len(), 2);
        assert_eq!(marks[1].name.as_deref(), Some("voronoi"));
        assert_eq!(marks[1].transform[0]["x"]["expr"], "datum.datum.x || 0");
    }

    #[test]
    fn test_path_marks_are_skipped() {
        let mut selection = selection_fixture("pts", SelectionType::Single);
        selection.nearest = true;
        let mut diagnostics = Diagnostics::new();
        let marks = Nearest
            .marks(&assembly_scope_fixture(MarkType::Line), &selection, vec![], &mut diagnostics)
            .unwrap();
        assert!(marks.is_empty());
        assert_eq!(diagnostics.warnings().len(), 1);
    }
}

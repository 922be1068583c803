//! Whether a unit stacks its measure, and how
use crate::compile::log::{message, Diagnostics};
use crate::spec::transform::stack::{StackOffsetSpec, StackTransformSpec};
use crate::spec::values::{CompareSpec, Field, SortOrderOrList, SortOrderSpec, StringOrStringList};
use crate::vl::channel::{Channel, STACK_BY_CHANNELS};
use crate::vl::encoding::Encoding;
use crate::vl::fielddef::{FieldDef, FieldRefOption, SortDef, StackDef};
use crate::vl::mark::MarkType;
use crate::vl::scale::ScaleType;

#[derive(Debug, Clone, PartialEq)]
pub struct StackProperties {
    /// Dimension channel the stacks are grouped by
    pub groupby_channel: Option<Channel>,
    /// Measure channel that is stacked
    pub field_channel: Channel,
    /// Non-positional channels splitting each stack into layers
    pub stack_by: Vec<(Channel, FieldDef)>,
    pub offset: StackOffsetSpec,
}

impl StackProperties {
    pub fn field_def<'a>(&self, encoding: &'a Encoding) -> Option<&'a FieldDef> {
        encoding.field_def(self.field_channel)
    }

    /// Fields of the stack-by channels, as produced by the data flow
    pub fn stack_by_fields(&self) -> Vec<String> {
        self.stack_by
            .iter()
            .map(|(channel, def)| def.vg_field(*channel, &FieldRefOption::default()))
            .collect()
    }
}

fn is_aggregate_measure(def: Option<&FieldDef>) -> bool {
    def.map(|d| d.aggregate_op().is_some()).unwrap_or(false)
}

/// Stack properties of a unit, or `None` when it does not qualify for stacking
pub fn stack(
    mark: MarkType,
    encoding: &Encoding,
    default_offset: StackOffsetSpec,
    diagnostics: &mut Diagnostics,
) -> Option<StackProperties> {
    if !mark.is_stackable() {
        return None;
    }

    let stack_by: Vec<(Channel, FieldDef)> = STACK_BY_CHANNELS
        .iter()
        .flat_map(|channel| {
            encoding
                .field_defs(*channel)
                .into_iter()
                .filter(|def| def.has_field() && def.aggregate_op().is_none())
                .map(|def| (*channel, def.clone()))
        })
        .collect();

    let (field_channel, groupby_channel) = if mark == MarkType::Arc {
        encoding.field_def(Channel::Theta)?;
        (Channel::Theta, None)
    } else {
        let x = encoding.field_def(Channel::X);
        let y = encoding.field_def(Channel::Y);
        match (is_aggregate_measure(x), is_aggregate_measure(y)) {
            (true, false) => (Channel::X, y.map(|_| Channel::Y)),
            (false, true) => (Channel::Y, x.map(|_| Channel::X)),
            _ => return None,
        }
    };
    let field_def = encoding.field_def(field_channel)?;

    if stack_by.is_empty() {
        return None;
    }

    let offset = match &field_def.stack {
        Some(None) | Some(Some(StackDef::Bool(false))) => return None,
        Some(Some(StackDef::Bool(true))) => default_offset,
        Some(Some(StackDef::Offset(offset))) => *offset,
        None if mark.stacks_by_default() => default_offset,
        None => return None,
    };

    if let Some(scale_type) = field_def.scale_def().and_then(|s| s.type_) {
        if scale_type != ScaleType::Linear {
            diagnostics.warn(message::cannot_stack_non_linear_scale(scale_type));
        }
    }
    if let Some(secondary) = field_channel.secondary() {
        if encoding.has_field(secondary) {
            diagnostics.warn(message::cannot_stack_range_mark(field_channel));
            return None;
        }
    }
    if let Some(op) = field_def.aggregate_op() {
        if !op.is_summative() {
            diagnostics.warn(message::stack_non_summative_aggregate(op.name()));
            return None;
        }
    }

    Some(StackProperties {
        groupby_channel,
        field_channel,
        stack_by,
        offset,
    })
}

/// Stack transform of a unit; `extra_groupby` holds the facet fields
pub fn stack_transform(
    stack: &StackProperties,
    encoding: &Encoding,
    extra_groupby: &[String],
) -> Option<StackTransformSpec> {
    let field_def = stack.field_def(encoding)?;
    let opt = FieldRefOption::default();
    let mut groupby: Vec<Field> = Vec::new();
    if let Some(channel) = stack.groupby_channel {
        if let Some(def) = encoding.field_def(channel) {
            groupby.push(Field::from(def.vg_field(channel, &opt)));
        }
    }
    groupby.extend(extra_groupby.iter().map(|f| Field::from(f.as_str())));

    let order_defs: Vec<&FieldDef> = encoding
        .field_defs(Channel::Order)
        .into_iter()
        .filter(|d| d.has_field())
        .collect();
    let sort = if order_defs.is_empty() {
        let fields = stack.stack_by_fields();
        let orders = vec![SortOrderSpec::Descending; fields.len()];
        CompareSpec {
            field: StringOrStringList::StringList(fields),
            order: Some(SortOrderOrList::SortOrderList(orders)),
        }
    } else {
        let fields = order_defs
            .iter()
            .map(|d| d.vg_field(Channel::Order, &opt))
            .collect();
        let orders = order_defs
            .iter()
            .map(|d| match &d.sort {
                Some(Some(SortDef::Order(order))) => *order,
                _ => SortOrderSpec::Ascending,
            })
            .collect();
        CompareSpec {
            field: StringOrStringList::StringList(fields),
            order: Some(SortOrderOrList::SortOrderList(orders)),
        }
    };

    let field = field_def.vg_field(stack.field_channel, &opt);
    Some(StackTransformSpec {
        field: Field::from(field.as_str()),
        groupby: Some(groupby),
        sort: Some(sort),
        as_: Some(vec![format!("{field}_start"), format!("{field}_end")]),
        offset: Some(stack.offset),
        extra: Default::default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::transform::TransformSpec;
    use rstest::rstest;
    use serde_json::{json, Value};

    fn check(mark: MarkType, encoding: Value) -> Option<StackProperties> {
        let encoding: Encoding = serde_json::from_value(encoding).unwrap();
        stack(mark, &encoding, StackOffsetSpec::Zero, &mut Diagnostics::new())
    }

    #[test]
    fn test_stacked_bar() {
        let stack = check(
            MarkType::Bar,
            json!({
                "x": {"field": "a", "type": "nominal"},
                "y": {"aggregate": "sum", "field": "b", "type": "quantitative"},
                "color": {"field": "c", "type": "nominal"}
            }),
        )
        .unwrap();
        assert_eq!(stack.field_channel, Channel::Y);
        assert_eq!(stack.groupby_channel, Some(Channel::X));
        assert_eq!(stack.stack_by_fields(), vec!["c"]);
        assert_eq!(stack.offset, StackOffsetSpec::Zero);
    }

    #[rstest(
        mark,
        encoding,
        case::no_stack_by(MarkType::Bar, json!({
            "x": {"field": "a", "type": "nominal"},
            "y": {"aggregate": "sum", "field": "b", "type": "quantitative"}
        })),
        case::both_aggregated(MarkType::Bar, json!({
            "x": {"aggregate": "sum", "field": "a", "type": "quantitative"},
            "y": {"aggregate": "sum", "field": "b", "type": "quantitative"},
            "color": {"field": "c", "type": "nominal"}
        })),
        case::non_summative(MarkType::Bar, json!({
            "x": {"field": "a", "type": "nominal"},
            "y": {"aggregate": "mean", "field": "b", "type": "quantitative"},
            "color": {"field": "c", "type": "nominal"}
        })),
        case::ranged(MarkType::Bar, json!({
            "x": {"field": "a", "type": "nominal"},
            "y": {"aggregate": "sum", "field": "b", "type": "quantitative"},
            "y2": {"field": "b2", "type": "quantitative"},
            "color": {"field": "c", "type": "nominal"}
        })),
        case::not_by_default(MarkType::Point, json!({
            "x": {"field": "a", "type": "nominal"},
            "y": {"aggregate": "sum", "field": "b", "type": "quantitative"},
            "color": {"field": "c", "type": "nominal"}
        })),
        case::disabled(MarkType::Bar, json!({
            "x": {"field": "a", "type": "nominal"},
            "y": {"aggregate": "sum", "field": "b", "type": "quantitative", "stack": null},
            "color": {"field": "c", "type": "nominal"}
        }))
    )]
    fn test_does_not_stack(mark: MarkType, encoding: Value) {
        assert_eq!(check(mark, encoding), None);
    }

    #[test]
    fn test_arc_stacks_theta() {
        let stack = check(
            MarkType::Arc,
            json!({
                "theta": {"field": "value", "type": "quantitative"},
                "color": {"field": "category", "type": "nominal"}
            }),
        )
        .unwrap();
        assert_eq!(stack.field_channel, Channel::Theta);
        assert_eq!(stack.groupby_channel, None);
    }

    #[test]
    fn test_stack_transform() {
        let encoding: Encoding = serde_json::from_value(json!({
            "x": {"field": "a", "type": "nominal"},
            "y": {"aggregate": "sum", "field": "b", "type": "quantitative", "stack": "normalize"},
            "color": {"field": "c", "type": "nominal"}
        }))
        .unwrap();
        let stack = stack(MarkType::Bar, &encoding, StackOffsetSpec::Zero, &mut Diagnostics::new()).unwrap();
        let transform = stack_transform(&stack, &encoding, &[]).unwrap();
        assert_eq!(
            serde_json::to_value(TransformSpec::Stack(transform)).unwrap(),
            json!({
                "type": "stack",
                "field": "sum_b",
                "groupby": ["a"],
                "sort": {"field": ["c"], "order": ["descending"]},
                "as": ["sum_b_start", "sum_b_end"],
                "offset": "normalize"
            })
        );
    }
}

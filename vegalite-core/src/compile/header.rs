//! Header groups of a facet: the row and column titles, one label per row or column,
//! and the shared axes drawn once per row or column
use crate::compile::context::CompileContext;
use crate::compile::data::assemble::AssembledData;
use crate::compile::model::facet::FacetModel;
use crate::error::Result;
use crate::spec::axis::AxisSpec;
use crate::spec::mark::{MarkEncodingSpec, MarkFromSpec, MarkSort, MarkSpec};
use crate::spec::title::TitleSpec;
use crate::spec::values::{SignalExpressionSpec, SortOrderOrList, SortOrderSpec, StringOrStringList, ValueOrSignalSpec};
use crate::vl::channel::Channel;
use crate::vl::fielddef::FieldDef;
use serde_json::{Map, Value};
use std::collections::HashMap;
use vegalite_common::escape::{datum_access, string_value};

const HEADER_OFFSET: f64 = 10.0;

/// Header config and header definition properties with the given prefix, e.g. the
/// `labelColor` of `label` properties becomes the title `color`
fn prefixed_properties(config: &Map<String, Value>, def: Option<&FieldDef>, prefix: &str) -> HashMap<String, Value> {
    let mut props = HashMap::new();
    let extra = def.and_then(|d| d.header.as_ref()).map(|h| &h.extra);
    for (key, value) in config.iter().chain(extra.into_iter().flatten()) {
        let Some(rest) = key.strip_prefix(prefix) else {
            continue;
        };
        let mut chars = rest.chars();
        let Some(first) = chars.next() else {
            continue;
        };
        if value.is_null() {
            continue;
        }
        let prop = first.to_lowercase().chain(chars).collect::<String>();
        props.insert(prop, value.clone());
    }
    props
}

/// Expression of a header label: the facet value of the enclosing group, formatted
fn label_expr(def: &FieldDef, field: &str) -> String {
    let value = format!("parent[{}]", string_value(field));
    let header = def.header.as_ref();
    if let Some(unit) = &def.time_unit {
        let format = header
            .and_then(|h| h.format.clone())
            .unwrap_or_else(|| unit.format());
        let func = if unit.utc { "utcFormat" } else { "timeFormat" };
        format!("{func}({value}, {})", string_value(&format))
    } else if let Some(format) = header.and_then(|h| h.format.as_ref()).or(def.format.as_ref()) {
        format!("format({value}, {})", string_value(format))
    } else {
        format!("''+{value}")
    }
}

/// Group holding the field title of a row or column facet
fn title_group(facet: &FacetModel, channel: Channel, def: &FieldDef, config: &Map<String, Value>) -> Option<MarkSpec> {
    let text = match def.header.as_ref().map(|h| h.title.clone()) {
        Some(Some(Some(title))) => title,
        Some(Some(None)) => return None,
        _ => def.title(),
    };
    let mut extra = prefixed_properties(config, Some(def), "title");
    extra.insert("style".to_string(), Value::from("guide-title"));
    extra.insert("offset".to_string(), Value::from(HEADER_OFFSET));
    let mut group = MarkSpec::new("group");
    group.name = Some(facet.base.get_name(&format!("{}_title", channel.name())));
    group.role = Some(format!("{}-title", channel.name()));
    group.title = Some(TitleSpec {
        text: ValueOrSignalSpec::Value(Value::from(text)),
        orient: Some(title_orient(channel).to_string()),
        anchor: None,
        extra,
    });
    Some(group)
}

fn title_orient(channel: Channel) -> &'static str {
    if channel == Channel::Row {
        "left"
    } else {
        "top"
    }
}

/// A header or footer group of the row or column facet, repeated for every value of the
/// facet field when there is one
#[allow(clippy::too_many_arguments)]
fn header_group(
    facet: &FacetModel,
    channel: Channel,
    kind: &str,
    axes: Vec<AxisSpec>,
    with_labels: bool,
    size_signal: &str,
    ctx: &CompileContext,
    data: &AssembledData,
) -> Result<MarkSpec> {
    let mut group = MarkSpec::new("group");
    group.name = Some(facet.base.get_name(&format!("{}_{kind}", channel.name())));
    group.role = Some(format!("{}-{kind}", channel.name()));

    let domain = match channel {
        Channel::Row => facet.row_domain,
        _ => facet.column_domain,
    };
    if let (Some(domain), Some(field), Some(def)) =
        (domain, facet.facet_field(channel), facet.facet_def(channel))
    {
        group.from = Some(MarkFromSpec::data(data.name(domain)?));
        group.sort = Some(MarkSort {
            field: StringOrStringList::String(datum_access(&field)),
            order: Some(SortOrderOrList::SortOrder(SortOrderSpec::Ascending)),
        });
        if with_labels {
            let mut extra = prefixed_properties(&ctx.config.header, Some(def), "label");
            if let Some(angle) = def.header.as_ref().and_then(|h| h.label_angle) {
                extra.insert("angle".to_string(), Value::from(angle));
            }
            extra.insert("style".to_string(), Value::from("guide-label"));
            extra.insert("offset".to_string(), Value::from(HEADER_OFFSET));
            group.title = Some(TitleSpec {
                text: ValueOrSignalSpec::Signal(SignalExpressionSpec::new(label_expr(def, &field))),
                orient: Some(title_orient(channel).to_string()),
                anchor: None,
                extra,
            });
        }
    }

    let size = if channel == Channel::Row { "height" } else { "width" };
    group
        .update_channels_mut()
        .insert(size.to_string(), MarkEncodingSpec::signal(size_signal).into());
    group.axes = axes;
    Ok(group)
}

/// Title, header and footer groups of a facet, in layout order
pub fn assemble_headers(
    facet: &FacetModel,
    ctx: &CompileContext,
    data: &AssembledData,
) -> Result<Vec<MarkSpec>> {
    let child = facet.child.base();
    let cell_width = ctx.size_names.get(&child.get_name("width"));
    let cell_height = ctx.size_names.get(&child.get_name("height"));

    let mut groups = Vec::new();
    for channel in [Channel::Row, Channel::Column] {
        if let Some(def) = facet.facet_def(channel) {
            groups.extend(title_group(facet, channel, def, &ctx.config.header));
        }
    }

    // Shared axes of the cells, split by the side of the grid they sit on
    let mut sides: [Vec<AxisSpec>; 4] = Default::default();
    for (channel, axes) in &facet.base.component.axes {
        for axis in axes {
            let axis = axis.assemble(ctx);
            let index = match (*channel, axis.orient.as_str()) {
                (Channel::Y, "right") => 1,
                (Channel::Y, _) => 0,
                (_, "top") => 2,
                _ => 3,
            };
            sides[index].push(axis);
        }
    }
    let [row_header, row_footer, column_header, column_footer] = sides;

    let has_row = facet.facet_def(Channel::Row).is_some();
    let has_column = facet.facet_def(Channel::Column).is_some();
    if has_row || !row_header.is_empty() {
        groups.push(header_group(facet, Channel::Row, "header", row_header, true, &cell_height, ctx, data)?);
    }
    if !row_footer.is_empty() {
        groups.push(header_group(facet, Channel::Row, "footer", row_footer, false, &cell_height, ctx, data)?);
    }
    if has_column || !column_header.is_empty() {
        groups.push(header_group(
            facet,
            Channel::Column,
            "header",
            column_header,
            true,
            &cell_width,
            ctx,
            data,
        )?);
    }
    if !column_footer.is_empty() {
        groups.push(header_group(
            facet,
            Channel::Column,
            "footer",
            column_footer,
            false,
            &cell_width,
            ctx,
            data,
        )?);
    }
    Ok(groups)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn def(value: Value) -> FieldDef {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_label_expressions() {
        assert_eq!(
            label_expr(&def(json!({"field": "a", "type": "nominal"})), "a"),
            r#"''+parent["a"]"#
        );
        assert_eq!(
            label_expr(
                &def(json!({"field": "q", "type": "ordinal", "header": {"format": ".1f"}})),
                "q"
            ),
            r#"format(parent["q"], ".1f")"#
        );
    }

    #[test]
    fn test_prefixed_header_properties() {
        let config: Map<String, Value> = serde_json::from_value(json!({
            "labelColor": "red",
            "titleFontSize": 14,
            "labelLimit": null
        }))
        .unwrap();
        let labels = prefixed_properties(&config, None, "label");
        assert_eq!(labels, HashMap::from([("color".to_string(), json!("red"))]));
        let titles = prefixed_properties(&config, None, "title");
        assert_eq!(titles, HashMap::from([("fontSize".to_string(), json!(14))]));
    }
}

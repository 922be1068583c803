//! Signals and brush marks of interval selections
use crate::compile::log::{message, Diagnostics};
use crate::compile::selection::{
    init_value, Projection, SelectionAssemblyScope, SelectionComponent, TUPLE, TUPLE_FIELDS,
};
use crate::error::Result;
use crate::spec::mark::{
    MarkEncodeSpec, MarkEncodingField, MarkEncodingFieldObject, MarkEncodingOrList,
    MarkEncodingSpec, MarkEncodingsSpec, MarkSpec,
};
use crate::spec::signal::{SignalOnEventSpec, SignalOnSpec, SignalSpec};
use crate::spec::values::StringOrStringList;
use crate::vl::channel::Channel;
use crate::vl::selection::SelectionResolution;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use vegalite_common::escape::string_value;

pub const BRUSH: &str = "_brush";
pub const SCALE_TRIGGER: &str = "_scale_trigger";

/// Events of the selection with the brush start filtered out of drags on the brush itself
fn brush_events(selection: &SelectionComponent) -> Vec<SignalOnEventSpec> {
    let mut events = selection.events.clone();
    if selection.translate.is_none() || selection.is_scale_bound() {
        return events;
    }
    let filter = format!(
        "!event.item || event.item.mark.name !== {}",
        string_value(&format!("{}{BRUSH}", selection.name))
    );
    for event in events.iter_mut() {
        let SignalOnEventSpec::Source(source) = event else {
            continue;
        };
        let Some(SignalOnEventSpec::Source(start)) =
            source.between.as_mut().and_then(|b| b.first_mut())
        else {
            continue;
        };
        let mut filters = start.filter.take().map(|f| f.to_vec()).unwrap_or_default();
        if !filters.contains(&filter) {
            filters.push(filter.clone());
        }
        start.filter = Some(if filters.len() == 1 {
            StringOrStringList::String(filters.remove(0))
        } else {
            StringOrStringList::StringList(filters)
        });
    }
    events
}

fn init_pair(selection: &SelectionComponent, projection: &Projection) -> Option<[Value; 2]> {
    let init = selection.init.as_ref()?;
    match init_value(init, projection)? {
        Value::Array(pair) if pair.len() == 2 => Some([pair[0].clone(), pair[1].clone()]),
        _ => None,
    }
}

fn channel_signals(
    scope: &SelectionAssemblyScope,
    selection: &SelectionComponent,
    projection: &Projection,
    channel: Channel,
    events: &[SignalOnEventSpec],
) -> Vec<SignalSpec> {
    let data_name = projection.data_signal(&selection.name);
    if selection.is_scale_bound() {
        return vec![SignalSpec::new(data_name)];
    }
    let visual_name = projection
        .visual_signal(&selection.name)
        .unwrap_or_else(|| format!("{}_{channel}", selection.name));
    let scale_name = string_value(scope.scale_name(channel).unwrap_or(channel.name()));
    let continuous = scope
        .scale_type(channel)
        .map(|t| t.is_continuous() && !t.is_bin())
        .unwrap_or(false);
    let size = scope.size(channel);
    let coord = format!("{channel}(unit)");

    let mut visual = SignalSpec::new(&visual_name);
    for event in events {
        let SignalOnEventSpec::Source(source) = event else {
            continue;
        };
        let Some(start) = source.between.as_ref().and_then(|b| b.first()) else {
            continue;
        };
        visual.on.push(SignalOnSpec::new(
            start.clone().into(),
            format!("[{coord}, {coord}]"),
        ));
        visual.on.push(SignalOnSpec::new(
            event.clone().into(),
            format!("[{visual_name}[0], clamp({coord}, 0, {size})]"),
        ));
    }
    visual.on.push(SignalOnSpec::new(
        SignalOnEventSpec::signal(format!("{}{SCALE_TRIGGER}", selection.name)).into(),
        if continuous {
            format!("[scale({scale_name}, {data_name}[0]), scale({scale_name}, {data_name}[1])]")
        } else {
            "[0, 0]".to_string()
        },
    ));

    let mut data = SignalSpec::new(&data_name).with_on(SignalOnSpec::new(
        SignalOnEventSpec::signal(&visual_name).into(),
        format!("{visual_name}[0] === {visual_name}[1] ? null : invert({scale_name}, {visual_name})"),
    ));

    match init_pair(selection, projection) {
        Some([lo, hi]) => {
            visual.init = Some(format!(
                "[scale({scale_name}, {lo}), scale({scale_name}, {hi})]"
            ));
            data.init = Some(format!("[{lo}, {hi}]"));
        }
        None => visual.value = Some(json!([])),
    }
    vec![visual, data]
}

/// Extent signals per projected channel, the scale trigger and the tuple signal
pub fn signals(
    scope: &SelectionAssemblyScope,
    selection: &SelectionComponent,
    diagnostics: &mut Diagnostics,
) -> Result<Vec<SignalSpec>> {
    let name = &selection.name;
    let scale_bound = selection.is_scale_bound();
    let events = brush_events(selection);
    let mut signals = Vec::new();
    let mut data_signals = Vec::new();
    let mut triggers: Vec<(String, String)> = Vec::new();

    for projection in &selection.project {
        let Some(channel) = projection.channel.filter(|c| c.is_position()) else {
            let channel = projection.channel.unwrap_or(Channel::Detail);
            diagnostics.warn(message::interval_supports_position_only(channel));
            continue;
        };
        signals.extend(channel_signals(scope, selection, projection, channel, &events));

        let data_name = projection.data_signal(name);
        let scale = scope.scale_name(channel).unwrap_or(channel.name()).to_string();
        let scale_str = string_value(&scale);
        let to_num = if scope
            .scale_type(channel)
            .map(|t| t.is_continuous())
            .unwrap_or(false)
        {
            "+"
        } else {
            ""
        };
        let current = if scale_bound {
            format!("domain({scale_str})")
        } else {
            let visual = projection
                .visual_signal(name)
                .unwrap_or_else(|| format!("{name}_{channel}"));
            format!("invert({scale_str}, {visual})")
        };
        triggers.push((
            scale,
            format!(
                "(!isArray({data_name}) || ({to_num}{current}[0] === {to_num}{data_name}[0] && {to_num}{current}[1] === {to_num}{data_name}[1]))"
            ),
        ));
        data_signals.push(data_name);
    }

    let trigger_name = format!("{name}{SCALE_TRIGGER}");
    let exprs: Vec<&str> = triggers.iter().map(|(_, e)| e.as_str()).collect();
    let mut trigger = SignalSpec::new(&trigger_name).with_value(json!({}));
    if !triggers.is_empty() {
        trigger = trigger.with_on(SignalOnSpec::new(
            triggers
                .iter()
                .map(|(scale, _)| SignalOnEventSpec::scale(scale))
                .collect::<Vec<_>>()
                .into(),
            format!("{} ? {trigger_name} : {{}}", exprs.join(" && ")),
        ));
    }
    signals.push(trigger);

    let update = format!(
        "unit: {}, fields: {name}{TUPLE_FIELDS}, values",
        selection.unit_name
    );
    let mut tuple = SignalSpec::new(format!("{name}{TUPLE}"));
    if !data_signals.is_empty() {
        tuple = tuple.with_on(SignalOnSpec::new(
            vec![SignalOnEventSpec::signal(data_signals.join(" || "))].into(),
            format!(
                "{} ? {{{update}: [{}]}} : null",
                data_signals.join(" && "),
                data_signals.join(", ")
            ),
        ));
    }
    if selection.init.is_some() {
        let pairs: Option<Vec<String>> = selection
            .project
            .iter()
            .filter(|p| p.channel.map(|c| c.is_position()).unwrap_or(false))
            .map(|p| init_pair(selection, p).map(|[lo, hi]| format!("[{lo}, {hi}]")))
            .collect();
        if let Some(pairs) = pairs {
            tuple.init = Some(format!("{{{update}: [{}]}}", pairs.join(", ")));
        }
    }
    signals.push(tuple);
    Ok(signals)
}

fn encoding(mut entries: Vec<MarkEncodingSpec>) -> MarkEncodingOrList {
    match entries.len() {
        1 => entries.remove(0).into(),
        _ => MarkEncodingOrList::List(entries),
    }
}

/// Background and foreground brush rects around the marks of the unit
pub fn marks(selection: &SelectionComponent, marks: Vec<MarkSpec>) -> Vec<MarkSpec> {
    if selection.is_scale_bound() {
        return marks;
    }
    let name = &selection.name;
    let visual = |channel: Channel| {
        selection
            .projection(channel)
            .and_then(|p| p.visual_signal(name))
    };
    let (x, y) = (visual(Channel::X), visual(Channel::Y));
    let store = format!("data({})", string_value(&selection.store()));

    let group_extent = |group: &str| MarkEncodingSpec {
        field: Some(MarkEncodingField::Object(MarkEncodingFieldObject {
            signal: None,
            datum: None,
            group: Some(group.to_string()),
            parent: None,
        })),
        ..Default::default()
    };
    let bound = |signal: &Option<String>, index: usize, fallback: MarkEncodingSpec| match signal {
        Some(signal) => MarkEncodingSpec::signal(format!("{signal}[{index}]")),
        None => fallback,
    };
    let mut update: BTreeMap<String, Vec<MarkEncodingSpec>> = BTreeMap::new();
    update.insert("x".into(), vec![bound(&x, 0, MarkEncodingSpec::value(0))]);
    update.insert("y".into(), vec![bound(&y, 0, MarkEncodingSpec::value(0))]);
    update.insert("x2".into(), vec![bound(&x, 1, group_extent("width"))]);
    update.insert("y2".into(), vec![bound(&y, 1, group_extent("height"))]);

    if selection.resolve == SelectionResolution::Global {
        let test = format!(
            "{store}.length && {store}[0].unit === {}",
            selection.unit_name
        );
        for entries in update.values_mut() {
            let main = entries.remove(0).with_test(&test);
            *entries = vec![main, MarkEncodingSpec::value(0)];
        }
    }

    let mut style = selection.mark.clone();
    let fill = style.remove("fill").unwrap_or(json!("#333"));
    let fill_opacity = style.remove("fillOpacity").unwrap_or(json!(0.125));
    let cursor = style.remove("cursor");

    let non_empty: Vec<String> = [&x, &y]
        .into_iter()
        .flatten()
        .map(|v| format!("{v}[0] !== {v}[1]"))
        .collect();
    let mut stroke_update = update.clone();
    for (key, value) in style {
        stroke_update.insert(
            key,
            vec![
                MarkEncodingSpec::value(value).with_test(non_empty.join(" && ")),
                MarkEncodingSpec::value(Value::Null),
            ],
        );
    }

    let brush = |mark_name: String,
                 enter: Vec<(&str, MarkEncodingSpec)>,
                 update: BTreeMap<String, Vec<MarkEncodingSpec>>| {
        let mut encodings = BTreeMap::new();
        encodings.insert(
            "enter".to_string(),
            MarkEncodingsSpec {
                channels: enter
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), v.into()))
                    .collect(),
            },
        );
        encodings.insert(
            "update".to_string(),
            MarkEncodingsSpec {
                channels: update.into_iter().map(|(k, v)| (k, encoding(v))).collect(),
            },
        );
        MarkSpec {
            name: Some(mark_name),
            clip: Some(true),
            encode: Some(MarkEncodeSpec { encodings }),
            ..MarkSpec::new("rect")
        }
    };

    let background = brush(
        format!("{name}{BRUSH}_bg"),
        vec![
            ("fill", MarkEncodingSpec::value(fill)),
            ("fillOpacity", MarkEncodingSpec::value(fill_opacity)),
        ],
        update,
    );
    let mut enter = vec![("fill", MarkEncodingSpec::value("transparent"))];
    if let Some(cursor) = cursor {
        enter.push(("cursor", MarkEncodingSpec::value(cursor)));
    }
    let foreground = brush(format!("{name}{BRUSH}"), enter, stroke_update);

    let mut result = Vec::with_capacity(marks.len() + 2);
    result.push(background);
    result.extend(marks);
    result.push(foreground);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::selection::events::parse_selector;
    use crate::compile::selection::{
        selection_fixture, Projection, ProjectionType, ScaleInfo,
    };
    use crate::vl::mark::MarkType;
    use crate::vl::scale::ScaleType;
    use crate::vl::selection::{SelectionBindDef, SelectionType};

    fn scope() -> SelectionAssemblyScope {
        let mut scales = BTreeMap::new();
        scales.insert(
            Channel::X,
            ScaleInfo {
                name: "x".to_string(),
                type_: ScaleType::Linear,
                exponent: None,
            },
        );
        SelectionAssemblyScope {
            unit_name: "\"\"".to_string(),
            mark: MarkType::Point,
            marks_name: "marks".to_string(),
            voronoi_name: "voronoi".to_string(),
            width: "width".to_string(),
            height: "height".to_string(),
            scales,
            nested: false,
        }
    }

    fn brush() -> SelectionComponent {
        let mut selection = selection_fixture("brush", SelectionType::Interval);
        selection.events =
            parse_selector("[mousedown, window:mouseup] > window:mousemove!", "scope").unwrap();
        selection.project = vec![Projection {
            field: "Horsepower".to_string(),
            channel: Some(Channel::X),
            type_: ProjectionType::Range,
        }];
        selection.mark = json!({"fill": "#333", "fillOpacity": 0.125, "stroke": "white"})
            .as_object()
            .cloned()
            .unwrap();
        selection
    }

    #[test]
    fn test_brush_signals() {
        let signals = signals(&scope(), &brush(), &mut Diagnostics::new()).unwrap();
        let names: Vec<&str> = signals.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["brush_x", "brush_Horsepower", "brush_scale_trigger", "brush_tuple"]
        );
        assert_eq!(signals[0].value, Some(json!([])));
        assert_eq!(
            signals[0].on[1].update,
            "[brush_x[0], clamp(x(unit), 0, width)]"
        );
        assert_eq!(
            signals[1].on[0].update,
            "brush_x[0] === brush_x[1] ? null : invert(\"x\", brush_x)"
        );
        assert_eq!(
            signals[3].on[0].update,
            "brush_Horsepower ? {unit: \"\", fields: brush_tuple_fields, values: [brush_Horsepower]} : null"
        );
    }

    #[test]
    fn test_scale_bound_signals() {
        let mut selection = brush();
        selection.bind = Some(SelectionBindDef::Keyword("scales".to_string()));
        selection.scales = vec![Channel::X];
        let signals = signals(&scope(), &selection, &mut Diagnostics::new()).unwrap();
        assert_eq!(signals[0], SignalSpec::new("brush_Horsepower"));
        assert_eq!(signals[1].name, "brush_scale_trigger");
        assert!(signals[1].on[0].update.contains("+domain(\"x\")[0] === +brush_Horsepower[0]"));
        assert!(marks(&selection, vec![]).is_empty());
    }

    #[test]
    fn test_brush_marks() {
        let marks = marks(&brush(), vec![MarkSpec::new("symbol")]);
        let names: Vec<Option<String>> = marks.iter().map(|m| m.name.clone()).collect();
        assert_eq!(
            names,
            vec![Some("brush_brush_bg".to_string()), None, Some("brush_brush".to_string())]
        );
        let fg = serde_json::to_value(&marks[2]).unwrap();
        assert_eq!(
            fg["encode"]["update"]["x"],
            json!([
                {"test": "data(\"brush_store\").length && data(\"brush_store\")[0].unit === \"\"", "signal": "brush_x[0]"},
                {"value": 0}
            ])
        );
        assert_eq!(
            fg["encode"]["update"]["y2"][0]["field"],
            json!({"group": "height"})
        );
        assert_eq!(
            fg["encode"]["update"]["stroke"],
            json!([{"test": "brush_x[0] !== brush_x[1]", "value": "white"}, {"value": null}])
        );
    }
}

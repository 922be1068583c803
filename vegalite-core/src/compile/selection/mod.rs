//! Interactive selections compiled into signals, store datasets and brush marks
pub mod events;
pub mod interval;
pub mod multi;
pub mod predicate;
pub mod transforms;

use crate::compile::log::{message, Diagnostics};
use crate::compile::selection::events::parse_selector;
use crate::compile::selection::transforms::transform_compilers;
use crate::error::{Result, ResultWithContext};
use crate::spec::data::DataSpec;
use crate::spec::mark::MarkSpec;
use crate::spec::signal::{SignalOnEventSpec, SignalOnSpec, SignalSpec};
use crate::vl::channel::Channel;
use crate::vl::config::Config;
use crate::vl::encoding::Encoding;
use crate::vl::fielddef::{var_name, FieldRefOption};
use crate::vl::mark::MarkType;
use crate::vl::scale::ScaleType;
use crate::vl::selection::{
    SelectionBindDef, SelectionDef, SelectionEmpty, SelectionOptions, SelectionResolution,
    SelectionType,
};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use vegalite_common::escape::string_value;

pub const STORE: &str = "_store";
pub const TUPLE: &str = "_tuple";
pub const TUPLE_FIELDS: &str = "_tuple_fields";
pub const MODIFY: &str = "_modify";
pub const SELECTION_ID: &str = "_vgsid_";

/// Whether a projection holds one value per field or an extent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionType {
    Enumerated,
    Range,
}

impl ProjectionType {
    pub fn code(&self) -> &'static str {
        match self {
            ProjectionType::Enumerated => "E",
            ProjectionType::Range => "R",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    pub field: String,
    pub channel: Option<Channel>,
    pub type_: ProjectionType,
}

impl Projection {
    /// Signal holding the data-space value of this projection
    pub fn data_signal(&self, selection: &str) -> String {
        var_name(&format!("{selection}_{}", self.field))
    }

    /// Signal holding the pixel-space extent of this projection
    pub fn visual_signal(&self, selection: &str) -> Option<String> {
        self.channel
            .map(|channel| var_name(&format!("{selection}_{channel}")))
    }

    fn to_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("type".to_string(), json!(self.type_.code()));
        obj.insert("field".to_string(), json!(self.field));
        if let Some(channel) = self.channel {
            obj.insert("channel".to_string(), json!(channel.name()));
        }
        Value::Object(obj)
    }
}

/// Compiled state of one named selection of a unit
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionComponent {
    pub name: String,
    pub type_: SelectionType,
    /// Expression evaluating to the name of the owning unit
    pub unit_name: String,
    pub events: Vec<SignalOnEventSpec>,
    pub clear: Vec<SignalOnEventSpec>,
    pub project: Vec<Projection>,
    pub resolve: SelectionResolution,
    pub empty: SelectionEmpty,
    pub bind: Option<SelectionBindDef>,
    pub init: Option<Value>,
    pub toggle: Option<String>,
    pub nearest: bool,
    pub translate: Option<String>,
    pub zoom: Option<String>,
    pub mark: Map<String, Value>,
    /// Channels whose scale domains are driven by this selection
    pub scales: Vec<Channel>,
}

impl SelectionComponent {
    pub fn projection(&self, channel: Channel) -> Option<&Projection> {
        self.project.iter().find(|p| p.channel == Some(channel))
    }

    pub fn is_scale_bound(&self) -> bool {
        matches!(&self.bind, Some(SelectionBindDef::Keyword(k)) if k == "scales")
    }

    pub fn is_legend_bound(&self) -> bool {
        matches!(&self.bind, Some(SelectionBindDef::Keyword(k)) if k == "legend")
    }

    pub fn store(&self) -> String {
        format!("{}{STORE}", self.name)
    }

    pub fn tuple_fields(&self) -> Value {
        Value::Array(self.project.iter().map(|p| p.to_json()).collect())
    }

    pub fn info(&self) -> SelectionInfo {
        SelectionInfo {
            name: self.name.clone(),
            type_: self.type_,
            resolve: self.resolve,
            empty: self.empty,
            project: self
                .project
                .iter()
                .map(|p| (p.channel, p.field.clone()))
                .collect(),
        }
    }
}

/// What other views need to know about a selection to reference it
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionInfo {
    pub name: String,
    pub type_: SelectionType,
    pub resolve: SelectionResolution,
    pub empty: SelectionEmpty,
    pub project: Vec<(Option<Channel>, String)>,
}

impl SelectionInfo {
    /// Projected field for a channel, or the only projected field
    pub fn field(&self, channel: Option<Channel>) -> Option<&str> {
        match channel {
            Some(channel) => self
                .project
                .iter()
                .find(|(c, _)| *c == Some(channel))
                .map(|(_, f)| f.as_str()),
            None => self.project.first().map(|(_, f)| f.as_str()),
        }
    }
}

/// Selection options filled from the config defaults of the selection type.
/// Default fields are skipped when encodings are given, and vice versa.
pub fn resolved_options(def: &SelectionDef, config: &Config) -> SelectionOptions {
    let mut defaults = match def.type_ {
        SelectionType::Single => config.selection.single.clone(),
        SelectionType::Multi => config.selection.multi.clone(),
        SelectionType::Interval => config.selection.interval.clone(),
    };
    if def.options.encodings.is_some() {
        defaults.fields = None;
    }
    if def.options.fields.is_some() {
        defaults.encodings = None;
    }
    def.options.with_defaults(&defaults)
}

pub fn uses_selection_id(def: &SelectionDef, config: &Config) -> bool {
    resolved_options(def, config)
        .fields
        .map(|fields| fields.iter().any(|f| f == SELECTION_ID))
        .unwrap_or(false)
}

/// What a unit exposes to its selections while they are parsed
pub struct UnitSelectionScope<'a> {
    pub encoding: &'a Encoding,
    pub scale_types: &'a BTreeMap<Channel, ScaleType>,
    pub unit_name: String,
}

/// Event selector of an interval option; `true` picks the config default
fn selector_string(value: &Option<Value>, default: &Option<Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Bool(true)) => match default {
            Some(Value::String(s)) => Some(s.clone()),
            _ => None,
        },
        _ => None,
    }
}

pub fn parse_unit_selections(
    defs: &BTreeMap<String, SelectionDef>,
    scope: &UnitSelectionScope,
    config: &Config,
    diagnostics: &mut Diagnostics,
) -> Result<Vec<SelectionComponent>> {
    let mut selections = Vec::new();
    for (name, def) in defs {
        let options = resolved_options(def, config);
        let name = var_name(name);

        let events = match &options.on {
            Some(Value::String(on)) => parse_selector(on, "scope")
                .with_context(|| format!("Parsing events of selection {name}"))?,
            Some(other) => serde_json::from_value::<Vec<SignalOnEventSpec>>(other.clone())
                .or_else(|_| serde_json::from_value(other.clone()).map(|e| vec![e]))
                .with_context(|| format!("Invalid events of selection {name}"))?,
            None => Vec::new(),
        };
        let clear = match &options.clear {
            Some(Value::String(clear)) => parse_selector(clear, "scope")?,
            _ => Vec::new(),
        };

        let mut project: Vec<Projection> = Vec::new();
        for field in options.fields.iter().flatten() {
            if !project.iter().any(|p| &p.field == field) {
                project.push(Projection {
                    field: field.clone(),
                    channel: None,
                    type_: ProjectionType::Enumerated,
                });
            }
        }
        for channel in options.encodings.iter().flatten() {
            let Some(field_def) = scope.encoding.field_def(*channel) else {
                diagnostics.warn(message::cannot_project_on_channel_without_field(*channel));
                continue;
            };
            let field = if field_def.time_unit.is_some() {
                field_def.vg_field(*channel, &FieldRefOption::default())
            } else {
                field_def.field_name().unwrap_or_default().to_string()
            };
            let type_ = match (def.type_, scope.scale_types.get(&channel.scale_channel())) {
                (SelectionType::Interval, Some(scale_type))
                    if scale_type.is_continuous() && !scale_type.is_bin() =>
                {
                    ProjectionType::Range
                }
                _ => ProjectionType::Enumerated,
            };
            match project.iter_mut().find(|p| p.field == field) {
                Some(existing) => existing.channel = existing.channel.or(Some(*channel)),
                None => project.push(Projection {
                    field,
                    channel: Some(*channel),
                    type_,
                }),
            }
        }

        let toggle = match (&def.type_, &options.toggle) {
            (SelectionType::Multi, Some(Value::String(expr))) => Some(expr.clone()),
            (SelectionType::Multi, Some(Value::Bool(true))) => Some("event.shiftKey".to_string()),
            _ => None,
        };
        let interval = def.type_ == SelectionType::Interval;

        let mut component = SelectionComponent {
            name: name.clone(),
            type_: def.type_,
            unit_name: scope.unit_name.clone(),
            events,
            clear,
            project,
            resolve: options.resolve.unwrap_or_default(),
            empty: options.empty.unwrap_or_default(),
            bind: options.bind.clone(),
            init: options.init.clone(),
            toggle,
            nearest: options.nearest.unwrap_or(false),
            translate: if interval {
                selector_string(&options.translate, &config.selection.interval.translate)
            } else {
                None
            },
            zoom: if interval {
                selector_string(&options.zoom, &config.selection.interval.zoom)
            } else {
                None
            },
            mark: options.mark.clone().unwrap_or_default(),
            scales: Vec::new(),
        };

        for compiler in transform_compilers() {
            if compiler.has(&component) {
                compiler.parse(&mut component, scope, diagnostics)?;
            }
        }
        selections.push(component);
    }
    Ok(selections)
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScaleInfo {
    pub name: String,
    pub type_: ScaleType,
    pub exponent: Option<f64>,
}

/// Names and types of the scales and sizes of a unit, resolved for assembly
#[derive(Debug, Clone)]
pub struct SelectionAssemblyScope {
    pub unit_name: String,
    pub mark: MarkType,
    pub marks_name: String,
    pub voronoi_name: String,
    pub width: String,
    pub height: String,
    pub scales: BTreeMap<Channel, ScaleInfo>,
    /// Whether the unit signals live in a group mark rather than at the top level
    pub nested: bool,
}

impl SelectionAssemblyScope {
    pub fn scale_name(&self, channel: Channel) -> Option<&str> {
        self.scales.get(&channel).map(|s| s.name.as_str())
    }

    pub fn scale_type(&self, channel: Channel) -> Option<ScaleType> {
        self.scales.get(&channel).map(|s| s.type_)
    }

    pub fn size(&self, channel: Channel) -> &str {
        if channel == Channel::Y {
            &self.height
        } else {
            &self.width
        }
    }
}

/// Second argument of `modify`: which store entries the new tuple replaces
pub fn unit_scope_expr(selection: &SelectionComponent) -> String {
    match selection.resolve {
        SelectionResolution::Global => "true".to_string(),
        _ => format!("{{unit: {}}}", selection.unit_name),
    }
}

pub fn modify_expr(selection: &SelectionComponent) -> String {
    format!("{}{TUPLE}, {}", selection.name, unit_scope_expr(selection))
}

/// Signals declared in the scope of the unit owning the selections
pub fn assemble_unit_signals(
    scope: &SelectionAssemblyScope,
    selections: &[SelectionComponent],
    diagnostics: &mut Diagnostics,
) -> Result<Vec<SignalSpec>> {
    let mut signals = Vec::new();
    for selection in selections {
        let mut modify = modify_expr(selection);
        match selection.type_ {
            SelectionType::Interval => {
                signals.extend(interval::signals(scope, selection, diagnostics)?)
            }
            _ => signals.extend(multi::signals(selection)),
        }
        for compiler in transform_compilers() {
            if compiler.has(selection) {
                signals = compiler.signals(scope, selection, signals)?;
                modify = compiler.modify_expr(selection, modify);
            }
        }
        let store = string_value(&selection.store());
        signals.push(SignalSpec::new(format!("{}{MODIFY}", selection.name)).with_on(
            SignalOnSpec::new(
                SignalOnEventSpec::signal(format!("{}{TUPLE}", selection.name)).into(),
                format!("modify({store}, {modify})"),
            ),
        ));
    }
    Ok(signals)
}

/// Signals declared once at the top level of the output
pub fn assemble_top_level_signals(
    scope: &SelectionAssemblyScope,
    selections: &[SelectionComponent],
    mut signals: Vec<SignalSpec>,
) -> Result<Vec<SignalSpec>> {
    for selection in selections {
        if !signals.iter().any(|s| s.name == selection.name) {
            let resolve = match selection.resolve {
                SelectionResolution::Global => SelectionResolution::Union,
                other => other,
            };
            let multi = if selection.type_ == SelectionType::Multi {
                ", true"
            } else {
                ""
            };
            signals.push(SignalSpec::new(&selection.name).with_update(format!(
                "vlSelectionResolve({}, {}{multi})",
                string_value(&selection.store()),
                string_value(resolve.name())
            )));
        }
        for compiler in transform_compilers() {
            if compiler.has(selection) {
                signals = compiler.top_level_signals(scope, selection, signals)?;
            }
        }
    }
    Ok(signals)
}

/// Signal tracking the unit group under the pointer, required by every selection
pub fn unit_signal() -> SignalSpec {
    SignalSpec::new("unit").with_value(json!({})).with_on(
        SignalOnSpec::new(
            SignalOnEventSpec::Selector("mousemove".to_string()).into(),
            "isTuple(group()) ? group() : unit",
        ),
    )
}

/// Brush and voronoi marks around the marks of a unit
pub fn assemble_unit_marks(
    scope: &SelectionAssemblyScope,
    selections: &[SelectionComponent],
    mut marks: Vec<MarkSpec>,
    diagnostics: &mut Diagnostics,
) -> Result<Vec<MarkSpec>> {
    for selection in selections {
        if selection.type_ == SelectionType::Interval {
            marks = interval::marks(selection, marks);
        }
        for compiler in transform_compilers() {
            if compiler.has(selection) {
                marks = compiler.marks(scope, selection, marks, diagnostics)?;
            }
        }
    }
    Ok(marks)
}

/// Store dataset of a selection, holding initial tuples when `init` is given
pub fn assemble_store(selection: &SelectionComponent) -> DataSpec {
    let mut store = DataSpec::new(selection.store());
    if let Some(init) = &selection.init {
        let inits: Vec<&Value> = match init {
            Value::Array(items) if selection.type_ == SelectionType::Multi => items.iter().collect(),
            other => vec![other],
        };
        let unit = serde_json::from_str::<String>(&selection.unit_name).unwrap_or_default();
        let tuples: Vec<Value> = inits
            .into_iter()
            .filter_map(|init| {
                let values: Option<Vec<Value>> = selection
                    .project
                    .iter()
                    .map(|p| init_value(init, p).cloned())
                    .collect();
                values.map(|values| {
                    json!({"unit": unit, "fields": selection.tuple_fields(), "values": values})
                })
            })
            .collect();
        if !tuples.is_empty() {
            store.values = Some(Value::Array(tuples));
        }
    }
    store
}

/// Initial value of a projection, keyed by field or by channel
pub fn init_value<'a>(init: &'a Value, projection: &Projection) -> Option<&'a Value> {
    init.get(&projection.field).or_else(|| {
        projection
            .channel
            .and_then(|channel| init.get(channel.name()))
    })
}

#[cfg(test)]
pub(crate) fn selection_fixture(name: &str, type_: SelectionType) -> SelectionComponent {
    SelectionComponent {
        name: name.to_string(),
        type_,
        unit_name: "\"\"".to_string(),
        events: Vec::new(),
        clear: Vec::new(),
        project: Vec::new(),
        resolve: SelectionResolution::Global,
        empty: SelectionEmpty::All,
        bind: None,
        init: None,
        toggle: None,
        nearest: false,
        translate: None,
        zoom: None,
        mark: Default::default(),
        scales: Vec::new(),
    }
}

#[cfg(test)]
pub(crate) fn assembly_scope_fixture(mark: MarkType) -> SelectionAssemblyScope {
    SelectionAssemblyScope {
        unit_name: "\"\"".to_string(),
        mark,
        marks_name: "marks".to_string(),
        voronoi_name: "voronoi".to_string(),
        width: "width".to_string(),
        height: "height".to_string(),
        scales: BTreeMap::new(),
        nested: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config() -> Config {
        Config::from_layers(&[]).unwrap()
    }

    fn encoding() -> Encoding {
        serde_json::from_value(json!({
            "x": {"field": "Horsepower", "type": "quantitative"},
            "y": {"field": "Origin", "type": "nominal"}
        }))
        .unwrap()
    }

    fn parse(defs: Value) -> Vec<SelectionComponent> {
        let defs: BTreeMap<String, SelectionDef> = serde_json::from_value(defs).unwrap();
        let encoding = encoding();
        let mut scale_types = BTreeMap::new();
        scale_types.insert(Channel::X, ScaleType::Linear);
        scale_types.insert(Channel::Y, ScaleType::Point);
        let scope = UnitSelectionScope {
            encoding: &encoding,
            scale_types: &scale_types,
            unit_name: "\"\"".to_string(),
        };
        parse_unit_selections(&defs, &scope, &config(), &mut Diagnostics::new()).unwrap()
    }

    #[test]
    fn test_single_defaults_to_selection_id() {
        let selections = parse(json!({"pts": {"type": "single"}}));
        assert_eq!(selections[0].project[0].field, SELECTION_ID);
        assert_eq!(selections[0].clear.len(), 1);
    }

    #[test]
    fn test_encodings_replace_default_fields() {
        let selections = parse(json!({"pts": {"type": "single", "encodings": ["y"]}}));
        assert_eq!(selections[0].project.len(), 1);
        assert_eq!(selections[0].project[0].field, "Origin");
        assert_eq!(selections[0].project[0].channel, Some(Channel::Y));
    }

    #[test]
    fn test_interval_projection_types() {
        let selections = parse(json!({"brush": {"type": "interval"}}));
        let project = &selections[0].project;
        assert_eq!(project[0].type_, ProjectionType::Range);
        assert_eq!(project[1].type_, ProjectionType::Enumerated);
        assert_eq!(project[0].visual_signal("brush").unwrap(), "brush_x");
        assert_eq!(project[0].data_signal("brush"), "brush_Horsepower");
    }

    #[test]
    fn test_store_with_init() {
        let selections = parse(json!({"pts": {"type": "single", "fields": ["Origin"], "init": {"Origin": "USA"}}}));
        let store = assemble_store(&selections[0]);
        assert_eq!(
            serde_json::to_value(store).unwrap(),
            json!({
                "name": "pts_store",
                "values": [{"unit": "", "fields": [{"type": "E", "field": "Origin"}], "values": ["USA"]}]
            })
        );
    }
}

//! Scale domains of units, and their union when scales are merged
use crate::compile::context::CompileContext;
use crate::compile::data::assemble::AssembledData;
use crate::compile::log::{message, Diagnostics};
use crate::compile::model::unit::UnitModel;
use crate::compile::scale::DomainPart;
use crate::compile::selection::STORE;
use crate::error::{Result, ResultWithContext, VegaLiteError};
use crate::spec::scale::{
    ScaleDataReferenceSpec, ScaleDataReferencesSpec, ScaleDomainSortObject, ScaleDomainSortSpec,
    ScaleDomainSpec, ScaleFieldsEntrySpec, ScaleFieldsReferencesSpec,
};
use crate::spec::transform::aggregate::AggregateOpSpec;
use crate::spec::transform::stack::StackOffsetSpec;
use crate::spec::values::{SignalExpressionSpec, SortOrderSpec};
use crate::vl::channel::Channel;
use crate::vl::config::Config;
use crate::vl::fielddef::{var_name, FieldDef, FieldRefOption, SortDef};
use crate::vl::scale::{DomainDef, ScaleType, SelectionDomain};
use crate::vl::selection::SelectionType;
use itertools::Itertools;
use serde_json::{json, Value};
use vegalite_common::escape::string_value;

/// Domain of one scale of a unit
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnitDomain {
    pub parts: Vec<DomainPart>,
    pub explicit: bool,
    /// Signal overriding the data-driven domain while it is defined
    pub raw: Option<String>,
}

/// Whether the domain of `def` is computed from the raw field before aggregation
pub fn wants_unaggregated(def: &FieldDef, config: &Config) -> bool {
    match def.scale_def().and_then(|s| s.domain.as_ref()) {
        Some(domain) => domain.is_unaggregated(),
        None => config.scale.use_unaggregated_domain,
    }
}

/// `Err` holds the reason an unaggregated domain cannot be used
pub fn can_use_unaggregated(
    def: &FieldDef,
    scale_type: ScaleType,
) -> std::result::Result<AggregateOpSpec, String> {
    let field = def.field_name().unwrap_or_default();
    let Some(op) = def.aggregate_op() else {
        return Err(message::unaggregate_domain_has_no_effect_for_raw_field(field));
    };
    if !op.shares_domain() {
        return Err(message::unaggregate_domain_with_non_shared_domain_op(op));
    }
    if scale_type == ScaleType::Log {
        return Err(message::unaggregated_domain_with_log_scale(field));
    }
    Ok(op)
}

/// Names of the min and max measures standing in for an unaggregated domain
pub fn unaggregated_fields(def: &FieldDef) -> (String, String) {
    let field = def.field_name().unwrap_or_default();
    (format!("min_{field}"), format!("max_{field}"))
}

/// Name prefix of the extent and bins signals of a binned field
pub fn bin_signal(unit: &UnitModel, channel: Channel, def: &FieldDef) -> String {
    var_name(
        &unit
            .base
            .get_name(&def.vg_field(channel, &FieldRefOption::default())),
    )
}

fn domain_sort(def: &FieldDef, field: &str) -> (Option<ScaleDomainSortSpec>, bool) {
    match &def.sort {
        Some(None) => (None, false),
        None | Some(Some(SortDef::Order(SortOrderSpec::Ascending))) => {
            (Some(ScaleDomainSortSpec::Bool(true)), false)
        }
        Some(Some(SortDef::Order(SortOrderSpec::Descending))) => (
            Some(ScaleDomainSortSpec::Object(ScaleDomainSortObject {
                field: Some(field.to_string()),
                op: Some("min".to_string()),
                order: Some("descending".to_string()),
            })),
            false,
        ),
        Some(Some(SortDef::Field(sort))) => {
            let op = sort.op.unwrap_or(AggregateOpSpec::Min);
            let object = ScaleDomainSortObject {
                field: if op == AggregateOpSpec::Count {
                    None
                } else {
                    Some(sort.field.clone().unwrap_or_else(|| field.to_string()))
                },
                op: Some(op.name().to_string()),
                order: sort.order.map(|o| match o {
                    SortOrderSpec::Ascending => "ascending".to_string(),
                    SortOrderSpec::Descending => "descending".to_string(),
                }),
            };
            // Sorting by an aggregate of another field reads the rows before aggregation
            (Some(ScaleDomainSortSpec::Object(object)), true)
        }
    }
}

fn selection_domain_signal(
    domain: &SelectionDomain,
    channel: Channel,
    ctx: &CompileContext,
) -> Result<String> {
    let name = var_name(&domain.selection);
    let selection = ctx
        .selections
        .get(&name)
        .ok_or_else(|| VegaLiteError::compilation(message::no_such_selection(&name)))?;
    let function = match selection.type_ {
        SelectionType::Interval => "vlIntervalDomain",
        _ => "vlMultiDomain",
    };
    let (encoding, field) = match (&domain.encoding, &domain.field) {
        (None, None) => (Some(channel.name().to_string()), None),
        (encoding, field) => (encoding.clone(), field.clone()),
    };
    let arg = |v: Option<String>| v.map(|v| string_value(&v)).unwrap_or("null".to_string());
    Ok(format!(
        "{function}({}, {}, {})",
        string_value(&format!("{name}{STORE}")),
        arg(encoding),
        arg(field)
    ))
}

/// Domain of the scale of `channel` in `unit`, including its secondary range channel
pub fn parse_unit_domain(
    unit: &UnitModel,
    channel: Channel,
    scale_type: ScaleType,
    ctx: &mut CompileContext,
) -> Result<UnitDomain> {
    let def = unit
        .encoding
        .field_def(channel)
        .with_context(|| format!("No field definition for the {channel} scale"))?;
    let mut domain = UnitDomain::default();

    let mut unaggregated = false;
    match def.scale_def().and_then(|s| s.domain.as_ref()) {
        Some(DomainDef::Array(values)) => {
            if def.is_binned() {
                ctx.diagnostics.warn(message::conflicted_domain(channel));
            } else {
                domain.parts.push(DomainPart::Literal(values.clone()));
                domain.explicit = true;
                return Ok(domain);
            }
        }
        Some(DomainDef::Selection(selection)) => {
            domain.raw = Some(selection_domain_signal(selection, channel, ctx)?);
        }
        Some(DomainDef::Keyword(keyword)) if keyword == "unaggregated" => {
            match can_use_unaggregated(def, scale_type) {
                Ok(_) => unaggregated = true,
                Err(reason) => ctx.diagnostics.warn(reason),
            }
        }
        Some(DomainDef::Keyword(keyword)) => {
            return Err(VegaLiteError::compilation(format!(
                "Invalid domain \"{keyword}\" for the {channel} scale"
            )));
        }
        None => {
            unaggregated = ctx.config.scale.use_unaggregated_domain
                && can_use_unaggregated(def, scale_type).is_ok();
        }
    }

    for selection in &unit.selections {
        if !selection.scales.contains(&channel) {
            continue;
        }
        if let Some(projection) = selection.projection(channel) {
            domain.raw = Some(format!(
                "{}[{}]",
                selection.name,
                string_value(&projection.field)
            ));
        }
    }

    domain
        .parts
        .extend(field_domain(unit, channel, def, scale_type, unaggregated)?);

    if let Some(secondary) = channel.secondary() {
        if let Some(def2) = unit.encoding.field_def(secondary).filter(|d| d.has_field()) {
            let main = unit.main_data()?;
            domain.parts.push(DomainPart::Data {
                data: main,
                field: def2.vg_field(secondary, &FieldRefOption::default()),
                sort: None,
            });
        }
    }
    Ok(domain)
}

fn field_domain(
    unit: &UnitModel,
    channel: Channel,
    def: &FieldDef,
    scale_type: ScaleType,
    unaggregated: bool,
) -> Result<Vec<DomainPart>> {
    let main = unit.main_data()?;
    let opt = FieldRefOption::default();
    let field = def.vg_field(channel, &opt);
    let data = |field: String| DomainPart::Data {
        data: main,
        field,
        sort: None,
    };

    if let Some(stack) = unit.stack.as_ref().filter(|s| s.field_channel == channel) {
        return Ok(match stack.offset {
            StackOffsetSpec::Normalize => vec![DomainPart::Literal(vec![json!(0), json!(1)])],
            StackOffsetSpec::Center => {
                vec![data(format!("{field}_start")), data(format!("{field}_end"))]
            }
            StackOffsetSpec::Zero => vec![data(format!("{field}_end"))],
        });
    }

    if def.is_binned() {
        if scale_type.is_discrete() {
            let range = def.vg_field(
                channel,
                &FieldRefOption {
                    bin_suffix: Some("range"),
                    ..Default::default()
                },
            );
            return Ok(vec![DomainPart::Data {
                data: main,
                field: range,
                sort: Some(ScaleDomainSortSpec::Object(ScaleDomainSortObject {
                    field: Some(field),
                    op: Some("min".to_string()),
                    order: None,
                })),
            }]);
        }
        if scale_type == ScaleType::BinOrdinal {
            let signal = bin_signal(unit, channel, def);
            return Ok(vec![DomainPart::Signal(format!(
                "sequence({signal}_bins.start, {signal}_bins.stop + {signal}_bins.step, {signal}_bins.step)"
            ))]);
        }
        return Ok(vec![data(field.clone()), data(format!("{field}_end"))]);
    }

    if unaggregated {
        let (min, max) = unaggregated_fields(def);
        return Ok(vec![data(min), data(max)]);
    }

    if scale_type.has_discrete_domain() {
        let (sort, raw) = domain_sort(def, &field);
        let node = if raw { unit.raw_data()? } else { main };
        return Ok(vec![DomainPart::Data {
            data: node,
            field,
            sort,
        }]);
    }
    Ok(vec![data(field)])
}

/// A domain part with its data node resolved to a dataset name
#[derive(Debug, Clone, PartialEq)]
pub enum DomainEntry {
    Ref(ScaleDataReferenceSpec),
    Literal(Vec<Value>),
    Signal(String),
}

pub fn resolve_parts(parts: &[DomainPart], data: &AssembledData) -> Result<Vec<DomainEntry>> {
    parts
        .iter()
        .map(|part| {
            Ok(match part {
                DomainPart::Data { data: node, field, sort } => {
                    DomainEntry::Ref(ScaleDataReferenceSpec {
                        data: data.name(*node)?,
                        field: field.clone(),
                        sort: sort.clone(),
                    })
                }
                DomainPart::Literal(values) => DomainEntry::Literal(values.clone()),
                DomainPart::Signal(signal) => DomainEntry::Signal(signal.clone()),
            })
        })
        .collect()
}

fn without_sort(entry: &DomainEntry) -> DomainEntry {
    match entry {
        DomainEntry::Ref(reference) => DomainEntry::Ref(ScaleDataReferenceSpec {
            sort: None,
            ..reference.clone()
        }),
        other => other.clone(),
    }
}

fn single_domain(entry: DomainEntry) -> ScaleDomainSpec {
    match entry {
        DomainEntry::Ref(reference) => ScaleDomainSpec::FieldReference(reference),
        DomainEntry::Literal(values) => ScaleDomainSpec::Array(values),
        DomainEntry::Signal(signal) => ScaleDomainSpec::Signal(SignalExpressionSpec::new(signal)),
    }
}

fn sort_key(sort: &ScaleDomainSortSpec) -> String {
    serde_json::to_string(sort).unwrap_or_default()
}

/// Union of the domain entries of every scale merged into one
pub fn union_domains(
    entries: Vec<DomainEntry>,
    diagnostics: &mut Diagnostics,
) -> Result<Option<ScaleDomainSpec>> {
    let mut entries: Vec<DomainEntry> = entries.into_iter().fold(Vec::new(), |mut acc, e| {
        if !acc.contains(&e) {
            acc.push(e);
        }
        acc
    });
    match entries.len() {
        0 => return Ok(None),
        1 => return Ok(entries.pop().map(single_domain)),
        _ => {}
    }
    if entries.iter().any(|e| matches!(e, DomainEntry::Signal(_))) {
        return Err(VegaLiteError::compilation(
            "A signal domain cannot be unioned with other domains",
        ));
    }

    let sorts: Vec<ScaleDomainSortSpec> = entries
        .iter()
        .filter_map(|e| match e {
            DomainEntry::Ref(reference) => reference.sort.clone(),
            _ => None,
        })
        .unique_by(sort_key)
        .collect();
    let unique: Vec<DomainEntry> = entries.iter().map(without_sort).fold(Vec::new(), |mut acc, e| {
        if !acc.contains(&e) {
            acc.push(e);
        }
        acc
    });

    if unique.len() == 1 {
        let sort = match sorts.len() {
            0 => None,
            1 => sorts.into_iter().next(),
            _ => {
                diagnostics.warn(message::more_than_one_sort());
                Some(ScaleDomainSortSpec::Bool(true))
            }
        };
        return Ok(unique.into_iter().next().map(|entry| match entry {
            DomainEntry::Ref(reference) => {
                ScaleDomainSpec::FieldReference(ScaleDataReferenceSpec { sort, ..reference })
            }
            other => single_domain(other),
        }));
    }

    let simple: Vec<ScaleDomainSortSpec> = sorts
        .into_iter()
        .map(|sort| match &sort {
            ScaleDomainSortSpec::Bool(_) => sort,
            ScaleDomainSortSpec::Object(object) if object.op.as_deref() == Some("count") => sort,
            ScaleDomainSortSpec::Object(_) => {
                diagnostics.warn(message::domain_sort_dropped(sort_key(&sort)));
                ScaleDomainSortSpec::Bool(true)
            }
        })
        .unique_by(sort_key)
        .collect();
    let sort = match simple.len() {
        0 => None,
        1 => simple.into_iter().next(),
        _ => {
            diagnostics.warn(message::more_than_one_sort());
            Some(ScaleDomainSortSpec::Bool(true))
        }
    };

    let datasets: Vec<Option<&str>> = unique
        .iter()
        .map(|e| match e {
            DomainEntry::Ref(reference) => Some(reference.data.as_str()),
            _ => None,
        })
        .unique()
        .collect();
    if let [Some(data)] = datasets.as_slice() {
        let data = data.to_string();
        let fields = unique
            .into_iter()
            .filter_map(|e| match e {
                DomainEntry::Ref(reference) => Some(reference.field),
                _ => None,
            })
            .collect();
        return Ok(Some(ScaleDomainSpec::FieldsReference(ScaleDataReferencesSpec {
            data,
            fields,
            sort,
        })));
    }

    // Unions across datasets are order independent
    let mut fields: Vec<ScaleFieldsEntrySpec> = unique
        .into_iter()
        .filter_map(|e| match e {
            DomainEntry::Ref(reference) => Some(ScaleFieldsEntrySpec::Reference(reference)),
            DomainEntry::Literal(values) => Some(ScaleFieldsEntrySpec::Array(values)),
            DomainEntry::Signal(_) => None,
        })
        .collect();
    fields.sort_by_key(|f| serde_json::to_string(f).unwrap_or_default());
    Ok(Some(ScaleDomainSpec::FieldsReferences(ScaleFieldsReferencesSpec {
        fields,
        sort: Some(ScaleDomainSortSpec::Bool(true)),
    })))
}

/// Point domain references to dataset `from` at dataset `to` instead
pub fn rename_domain_data(domain: &mut ScaleDomainSpec, from: &str, to: &str) {
    let rename = |data: &mut String| {
        if data == from {
            *data = to.to_string();
        }
    };
    match domain {
        ScaleDomainSpec::FieldReference(reference) => rename(&mut reference.data),
        ScaleDomainSpec::FieldsReference(references) => rename(&mut references.data),
        ScaleDomainSpec::FieldsReferences(references) => {
            for entry in &mut references.fields {
                if let ScaleFieldsEntrySpec::Reference(reference) = entry {
                    rename(&mut reference.data);
                }
            }
        }
        ScaleDomainSpec::Signal(_) | ScaleDomainSpec::Array(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(data: &str, field: &str, sort: Option<ScaleDomainSortSpec>) -> DomainEntry {
        DomainEntry::Ref(ScaleDataReferenceSpec {
            data: data.to_string(),
            field: field.to_string(),
            sort,
        })
    }

    fn union(entries: Vec<DomainEntry>) -> Value {
        let domain = union_domains(entries, &mut Diagnostics::new()).unwrap();
        serde_json::to_value(domain).unwrap()
    }

    #[test]
    fn test_single_domain_passes_through() {
        let sort = Some(ScaleDomainSortSpec::Bool(true));
        assert_eq!(
            union(vec![entry("main", "a", sort)]),
            json!({"data": "main", "field": "a", "sort": true})
        );
        assert_eq!(
            union(vec![DomainEntry::Literal(vec![json!(0), json!(1)])]),
            json!([0, 1])
        );
    }

    #[test]
    fn test_union_is_idempotent() {
        let a = entry("main", "a", None);
        assert_eq!(union(vec![a.clone(), a.clone()]), union(vec![a]));
    }

    #[test]
    fn test_union_same_data() {
        assert_eq!(
            union(vec![entry("main", "a", None), entry("main", "b", None)]),
            json!({"data": "main", "fields": ["a", "b"]})
        );
    }

    #[test]
    fn test_conflicting_sorts_of_one_field() {
        let mut diagnostics = Diagnostics::new();
        let descending = ScaleDomainSortSpec::Object(ScaleDomainSortObject {
            field: Some("a".to_string()),
            op: Some("min".to_string()),
            order: Some("descending".to_string()),
        });
        let domain = union_domains(
            vec![
                entry("main", "a", Some(ScaleDomainSortSpec::Bool(true))),
                entry("main", "a", Some(descending)),
            ],
            &mut diagnostics,
        )
        .unwrap();
        assert_eq!(
            serde_json::to_value(domain).unwrap(),
            json!({"data": "main", "field": "a", "sort": true})
        );
        assert_eq!(diagnostics.warnings().len(), 1);
    }

    #[test]
    fn test_union_across_data_is_commutative() {
        let a = entry("data_0", "a", Some(ScaleDomainSortSpec::Bool(true)));
        let b = entry("data_1", "b", Some(ScaleDomainSortSpec::Bool(true)));
        let ab = union(vec![a.clone(), b.clone()]);
        let ba = union(vec![b, a]);
        assert_eq!(ab, ba);
        assert_eq!(
            ab,
            json!({
                "fields": [
                    {"data": "data_0", "field": "a"},
                    {"data": "data_1", "field": "b"}
                ],
                "sort": true
            })
        );
    }

    #[test]
    fn test_literal_kept_in_union() {
        let domain = union(vec![
            entry("data_0", "a", None),
            DomainEntry::Literal(vec![json!("x")]),
        ]);
        let fields = domain["fields"].as_array().unwrap();
        assert_eq!(fields.len(), 2);
        assert!(fields.contains(&json!(["x"])));
    }

    #[test]
    fn test_signal_cannot_be_unioned() {
        let result = union_domains(
            vec![entry("data_0", "a", None), DomainEntry::Signal("s".to_string())],
            &mut Diagnostics::new(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_rename_domain_data() {
        let mut domain = ScaleDomainSpec::FieldReference(ScaleDataReferenceSpec {
            data: "data_0".to_string(),
            field: "a".to_string(),
            sort: None,
        });
        rename_domain_data(&mut domain, "data_0", "facet");
        assert_eq!(
            serde_json::to_value(domain).unwrap(),
            json!({"data": "facet", "field": "a"})
        );
    }
}

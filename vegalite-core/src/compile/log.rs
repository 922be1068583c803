//! Diagnostics collected while compiling
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticLevel {
    Warn,
    Info,
    Debug,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.level, self.message)
    }
}

/// Sink for recoverable problems. Each entry is also forwarded to the `log` facade.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warn<S: Into<String>>(&mut self, message: S) {
        let message = message.into();
        ::log::warn!("{}", message);
        self.push(DiagnosticLevel::Warn, message);
    }

    pub fn info<S: Into<String>>(&mut self, message: S) {
        let message = message.into();
        ::log::info!("{}", message);
        self.push(DiagnosticLevel::Info, message);
    }

    pub fn debug<S: Into<String>>(&mut self, message: S) {
        let message = message.into();
        ::log::debug!("{}", message);
        self.push(DiagnosticLevel::Debug, message);
    }

    fn push(&mut self, level: DiagnosticLevel, message: String) {
        self.entries.push(Diagnostic { level, message })
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn warnings(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|d| d.level == DiagnosticLevel::Warn)
            .map(|d| d.message.as_str())
            .collect()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.entries
    }
}

pub mod message {
    use crate::vl::channel::Channel;
    use crate::vl::mark::MarkType;
    use crate::vl::scale::ScaleType;
    use std::fmt::Display;

    pub fn incompatible_channel(channel: Channel, mark: MarkType) -> String {
        format!("{channel} dropped as it is incompatible with \"{mark}\".")
    }

    pub fn facet_channel_dropped(channels: &[Channel]) -> String {
        let names: Vec<&str> = channels.iter().map(|c| c.name()).collect();
        format!(
            "Facet encoding dropped as {} {} not supported in a nested view.",
            names.join(" and "),
            if names.len() > 1 { "are" } else { "is" }
        )
    }

    pub fn facet_channel_should_be_discrete(channel: Channel) -> String {
        format!("{channel} encoding should be discrete (ordinal / nominal / binned).")
    }

    pub fn empty_field_def(channel: Channel) -> String {
        format!("Dropping {channel} from channel as it does not contain any field or value.")
    }

    pub fn missing_field_type(channel: Channel, inferred: &str) -> String {
        format!("Missing type for channel \"{channel}\", using \"{inferred}\" instead.")
    }

    pub fn line_with_range(has_x2: bool, has_y2: bool) -> String {
        let channels = match (has_x2, has_y2) {
            (true, true) => "x2 and y2",
            (true, false) => "x2",
            _ => "y2",
        };
        format!("Line mark is for continuous lines and thus cannot be used with {channels}. We will use the rule mark (line segments) instead.")
    }

    pub fn unclear_orient_continuous(mark: MarkType) -> String {
        format!("Cannot clearly determine orientation for \"{mark}\" since both x and y channel encode continuous fields. In this case, we use vertical by default")
    }

    pub fn unclear_orient_discrete_or_empty(mark: MarkType) -> String {
        format!("Cannot clearly determine orientation for \"{mark}\" since both x and y channel encode discrete or empty fields.")
    }

    pub fn orient_overridden(original: impl Display, actual: impl Display) -> String {
        format!("Specified orient \"{original}\" overridden with \"{actual}\"")
    }

    pub fn cannot_stack_range_mark(channel: Channel) -> String {
        format!("Cannot stack \"{channel}\" if there is already \"{channel}2\"")
    }

    pub fn cannot_stack_non_linear_scale(scale_type: ScaleType) -> String {
        format!("Cannot stack non-linear scale ({scale_type})")
    }

    pub fn stack_non_summative_aggregate(op: impl Display) -> String {
        format!("Stacking is not applied since the aggregate function is non-summative (\"{op}\")")
    }

    pub fn scale_type_not_work_with_channel(
        channel: Channel,
        scale_type: ScaleType,
        default: ScaleType,
    ) -> String {
        format!("Channel \"{channel}\" does not work with \"{scale_type}\" scale. We are using \"{default}\" scale instead.")
    }

    pub fn scale_type_not_work_with_field_def(scale_type: ScaleType, default: ScaleType) -> String {
        format!("FieldDef does not work with \"{scale_type}\" scale. We are using \"{default}\" scale instead.")
    }

    pub fn scale_type_not_work_with_mark(mark: MarkType, scale_type: ScaleType) -> String {
        format!("Scale type \"{scale_type}\" does not work with mark \"{mark}\".")
    }

    pub fn scale_property_not_work_with_scale_type(
        scale_type: ScaleType,
        prop: &str,
        channel: Channel,
    ) -> String {
        format!("Scale type \"{scale_type}\" does not work with scale property \"{prop}\" on channel \"{channel}\"; dropping it.")
    }

    pub fn incompatible_scale_types(channel: Channel, t1: ScaleType, t2: ScaleType) -> String {
        format!("Scale types \"{t1}\" and \"{t2}\" for channel \"{channel}\" are incompatible; resolving the channel as independent.")
    }

    pub fn independent_scale_means_independent_guide(channel: Channel) -> String {
        format!("Setting the scale to be independent for \"{channel}\" means we also have to set the guide (axis or legend) to be independent.")
    }

    pub fn merge_conflicting_property(
        property: &str,
        property_of: &str,
        v1: impl Display,
        v2: impl Display,
    ) -> String {
        format!("Conflicting {property_of} property \"{property}\" ({v1} and {v2}). Using {v1}.")
    }

    pub fn merge_conflicting_domains(property: &str, property_of: &str) -> String {
        format!("Conflicting {property_of} property \"{property}\". Using the union of the domains.")
    }

    pub fn domain_sort_dropped(sort: impl Display) -> String {
        format!("Dropping sort property {sort} as unioned domains only support boolean or op 'count'.")
    }

    pub fn more_than_one_sort() -> String {
        "Domains that should be unioned has conflicting sort properties. Sort will be set to the first sort.".to_string()
    }

    pub fn unaggregate_domain_has_no_effect_for_raw_field(field: &str) -> String {
        format!("Using unaggregated domain with raw field has no effect ({field}).")
    }

    pub fn unaggregate_domain_with_non_shared_domain_op(op: impl Display) -> String {
        format!("Unaggregated domain not applicable for \"{op}\" since it produces values outside the origin domain of the source data.")
    }

    pub fn unaggregated_domain_with_log_scale(field: &str) -> String {
        format!("Unaggregated domain is currently unsupported for log scale ({field}).")
    }

    pub fn conflicted_domain(channel: Channel) -> String {
        format!("Cannot set a custom domain for the binned field of channel \"{channel}\"; dropping the custom domain.")
    }

    pub fn dropping_size_for_band(mark: MarkType) -> String {
        format!("Dropping size as the {mark} width is already determined by the band scale.")
    }

    pub fn range_step_dropped(channel: Channel) -> String {
        format!("rangeStep for \"{channel}\" is dropped as the size is explicitly specified.")
    }

    pub fn autosize_fit_not_supported() -> String {
        "Autosize \"fit\" only works for single views and layered views. Using \"pad\" instead.".to_string()
    }

    pub fn cannot_project_on_channel_without_field(channel: Channel) -> String {
        format!("Cannot project a selection on encoding channel \"{channel}\", which has no field.")
    }

    pub fn no_such_selection(name: &str) -> String {
        format!("Cannot find a selection named \"{name}\"")
    }

    pub fn legend_bindings_require_projection(name: &str) -> String {
        format!("Legend bindings are only supported for selections over an individual field or encoding channel ({name}).")
    }

    pub fn scale_bindings_continuous() -> String {
        "Scale bindings are currently only supported for scales with unbinned, continuous domains.".to_string()
    }

    pub fn interval_supports_position_only(channel: Channel) -> String {
        format!("Interval selections only support x and y encoding channels; dropping \"{channel}\".")
    }

    pub fn nearest_not_supported_for_continuous(mark: MarkType) -> String {
        format!("The \"nearest\" transform is not supported for {mark} marks.")
    }

    pub fn invalid_field_type_for_count_aggregate(field: &str) -> String {
        format!("Invalid field type for count aggregate of \"{field}\"; using quantitative.")
    }

    pub fn no_such_repeated_value(channel: impl Display) -> String {
        format!("Unknown repeated value \"{channel}\".")
    }

    pub fn composite_without_children(kind: &str) -> String {
        format!("A {kind} view requires at least one child view.")
    }

    pub fn no_data() -> String {
        "The view has no data; an empty dataset is used.".to_string()
    }
}

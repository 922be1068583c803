//! Whether scales and guides of a composition are shared by its children
use crate::compile::log::{message, Diagnostics};
use crate::vl::channel::Channel;
use crate::vl::resolve::{ResolveDef, ResolveMode};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositionKind {
    Layer,
    Facet,
    Concat,
    Repeat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuideKind {
    Axis,
    Legend,
}

/// Resolution decided for each channel at one composite node
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolveComponent {
    pub scale: BTreeMap<Channel, ResolveMode>,
    pub axis: BTreeMap<Channel, ResolveMode>,
    pub legend: BTreeMap<Channel, ResolveMode>,
}

pub fn default_scale_resolve(kind: CompositionKind, channel: Channel) -> ResolveMode {
    match kind {
        CompositionKind::Layer | CompositionKind::Facet => ResolveMode::Shared,
        CompositionKind::Concat | CompositionKind::Repeat => {
            if channel.is_position() {
                ResolveMode::Independent
            } else {
                ResolveMode::Shared
            }
        }
    }
}

/// Scale resolution requested for `channel`, before type compatibility is checked
pub fn requested_scale_resolve(
    resolve: &ResolveDef,
    kind: CompositionKind,
    channel: Channel,
) -> ResolveMode {
    resolve
        .scale
        .get(&channel)
        .copied()
        .unwrap_or_else(|| default_scale_resolve(kind, channel))
}

/// Guide resolution of `channel`. An independent scale always gets independent guides.
pub fn parse_guide_resolve(
    resolve: &ResolveDef,
    scale_mode: ResolveMode,
    guide: GuideKind,
    channel: Channel,
    diagnostics: &mut Diagnostics,
) -> ResolveMode {
    let explicit = match guide {
        GuideKind::Axis => resolve.axis.get(&channel),
        GuideKind::Legend => resolve.legend.get(&channel),
    };
    match (scale_mode, explicit) {
        (ResolveMode::Independent, Some(ResolveMode::Shared)) => {
            diagnostics.warn(message::independent_scale_means_independent_guide(channel));
            ResolveMode::Independent
        }
        (ResolveMode::Independent, _) => ResolveMode::Independent,
        (ResolveMode::Shared, Some(mode)) => *mode,
        (ResolveMode::Shared, None) => ResolveMode::Shared,
    }
}

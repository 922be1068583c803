use crate::vl::channel::Channel;
use serde::Deserialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolveMode {
    Shared,
    Independent,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ResolveDef {
    #[serde(default)]
    pub scale: BTreeMap<Channel, ResolveMode>,

    #[serde(default)]
    pub axis: BTreeMap<Channel, ResolveMode>,

    #[serde(default)]
    pub legend: BTreeMap<Channel, ResolveMode>,
}

use crate::vl::channel::Channel;
use crate::vl::fielddef::{ConditionList, FieldDef};
use serde::Deserialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ChannelDef {
    List(Vec<FieldDef>),
    Single(FieldDef),
}

impl ChannelDef {
    pub fn defs(&self) -> Vec<&FieldDef> {
        match self {
            ChannelDef::List(defs) => defs.iter().collect(),
            ChannelDef::Single(def) => vec![def],
        }
    }

    fn defs_mut(&mut self) -> Vec<&mut FieldDef> {
        match self {
            ChannelDef::List(defs) => defs.iter_mut().collect(),
            ChannelDef::Single(def) => vec![def],
        }
    }
}

/// Mapping from channels to field or value definitions
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct Encoding {
    pub channels: BTreeMap<Channel, ChannelDef>,
}

impl Encoding {
    pub fn get(&self, channel: Channel) -> Option<&FieldDef> {
        self.channels
            .get(&channel)
            .and_then(|def| def.defs().into_iter().next())
    }

    /// The definition of `channel` when it encodes a field
    pub fn field_def(&self, channel: Channel) -> Option<&FieldDef> {
        self.get(channel).filter(|def| def.has_field())
    }

    pub fn field_defs(&self, channel: Channel) -> Vec<&FieldDef> {
        self.channels
            .get(&channel)
            .map(|def| def.defs())
            .unwrap_or_default()
    }

    pub fn has(&self, channel: Channel) -> bool {
        self.channels.contains_key(&channel)
    }

    pub fn has_field(&self, channel: Channel) -> bool {
        self.field_defs(channel).iter().any(|def| def.has_field())
    }

    pub fn keys(&self) -> Vec<Channel> {
        self.channels.keys().copied().collect()
    }

    pub fn remove(&mut self, channel: Channel) -> Option<ChannelDef> {
        self.channels.remove(&channel)
    }

    pub fn insert(&mut self, channel: Channel, def: FieldDef) {
        self.channels.insert(channel, ChannelDef::Single(def));
    }

    /// All field definitions (not values) paired with their channels
    pub fn all_field_defs(&self) -> Vec<(Channel, &FieldDef)> {
        self.channels
            .iter()
            .flat_map(|(channel, def)| def.defs().into_iter().map(move |d| (*channel, d)))
            .filter(|(_, def)| def.has_field())
            .collect()
    }

    pub fn is_aggregate(&self) -> bool {
        self.all_field_defs()
            .iter()
            .any(|(_, def)| def.aggregate_op().is_some())
    }

    /// Apply `f` to every definition, including those nested in conditions
    pub fn visit_field_defs_mut<F: FnMut(&mut FieldDef)>(&mut self, f: &mut F) {
        for def in self.channels.values_mut() {
            for field_def in def.defs_mut() {
                f(field_def);
                match &mut field_def.condition {
                    Some(ConditionList::One(c)) => f(c.def.as_mut()),
                    Some(ConditionList::Many(cs)) => {
                        for c in cs {
                            f(c.def.as_mut())
                        }
                    }
                    None => {}
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_encoding_lookup() {
        let encoding: Encoding = serde_json::from_value(json!({
            "x": {"field": "a", "type": "ordinal"},
            "color": {"value": "red"},
            "detail": [{"field": "b", "type": "nominal"}, {"field": "c", "type": "nominal"}]
        }))
        .unwrap();
        assert!(encoding.has_field(Channel::X));
        assert!(encoding.has(Channel::Color));
        assert!(!encoding.has_field(Channel::Color));
        assert_eq!(encoding.field_defs(Channel::Detail).len(), 2);
        assert_eq!(encoding.all_field_defs().len(), 3);
    }
}

use crate::error::Result;
use crate::spec::transform::stack::StackOffsetSpec;
use crate::vl::mark::MarkType;
use crate::vl::selection::SelectionOptions;
use serde::Deserialize;
use serde_json::{json, Map, Value};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ViewConfig {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaleConfig {
    pub range_step: Option<f64>,
    pub text_x_range_step: f64,
    pub band_padding_inner: f64,
    pub band_padding_outer: Option<f64>,
    pub bar_band_padding_inner: f64,
    pub rect_band_padding_inner: f64,
    pub point_padding: f64,
    pub continuous_padding: Option<f64>,
    pub min_band_size: f64,
    pub min_size: f64,
    pub max_size: Option<f64>,
    pub max_bar_size: Option<f64>,
    pub min_opacity: f64,
    pub max_opacity: f64,
    pub use_unaggregated_domain: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvalidValues {
    Filter,
    Null,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SelectionConfig {
    pub single: SelectionOptions,
    pub multi: SelectionOptions,
    pub interval: SelectionOptions,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub view: ViewConfig,
    pub mark: Map<String, Value>,
    pub scale: ScaleConfig,
    pub axis: Map<String, Value>,
    pub axis_x: Map<String, Value>,
    pub axis_y: Map<String, Value>,
    pub axis_band: Map<String, Value>,
    pub legend: Map<String, Value>,
    pub header: Map<String, Value>,
    pub selection: SelectionConfig,
    pub range: Map<String, Value>,
    pub invalid_values: Option<InvalidValues>,
    pub stack: StackOffsetSpec,
    pub count_title: String,
    pub padding: Option<Value>,
    pub autosize: Option<Value>,
    pub background: Option<String>,

    /// Per-mark configs (`bar`, `point`, ...) and any other config keys
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Built-in defaults; user config is deep-merged on top of these
pub fn default_config_value() -> Value {
    json!({
        "view": {"width": 200, "height": 200},
        "mark": {"color": "#4c78a8"},
        "bar": {"binSpacing": 1, "continuousBandSize": 5},
        "point": {},
        "line": {},
        "area": {},
        "rect": {},
        "text": {"baseline": "middle"},
        "tick": {"thickness": 1},
        "rule": {},
        "arc": {},
        "scale": {
            "rangeStep": 21,
            "textXRangeStep": 90,
            "bandPaddingInner": 0.1,
            "bandPaddingOuter": null,
            "barBandPaddingInner": 0.1,
            "rectBandPaddingInner": 0,
            "pointPadding": 0.5,
            "continuousPadding": null,
            "minBandSize": 2,
            "minSize": 9,
            "maxSize": null,
            "maxBarSize": null,
            "minOpacity": 0.3,
            "maxOpacity": 0.8,
            "useUnaggregatedDomain": false
        },
        "axis": {},
        "axisX": {},
        "axisY": {"minExtent": 30},
        "axisBand": {},
        "legend": {},
        "header": {},
        "selection": {
            "single": {"on": "click", "fields": ["_vgsid_"], "resolve": "global", "empty": "all", "clear": "dblclick"},
            "multi": {"on": "click", "fields": ["_vgsid_"], "toggle": "event.shiftKey", "resolve": "global", "empty": "all", "clear": "dblclick"},
            "interval": {
                "on": "[mousedown, window:mouseup] > window:mousemove!",
                "encodings": ["x", "y"],
                "translate": "[mousedown, window:mouseup] > window:mousemove!",
                "zoom": "wheel!",
                "mark": {"fill": "#333", "fillOpacity": 0.125, "stroke": "white"},
                "resolve": "global",
                "clear": "dblclick"
            }
        },
        "range": {},
        "invalidValues": "filter",
        "stack": "zero",
        "countTitle": "Number of Records",
        "padding": 5,
        "autosize": null,
        "background": null
    })
}

/// Recursively merge `overlay` into `base`; objects merge key by key and
/// every other value replaces the base value
pub fn merge_deep(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(key) {
                    Some(existing) => merge_deep(existing, value),
                    None => {
                        base.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (base, overlay) => *base = overlay.clone(),
    }
}

impl Config {
    /// Resolve config from the built-in defaults and each layer in order
    pub fn from_layers(layers: &[&Value]) -> Result<Self> {
        let mut value = default_config_value();
        for layer in layers {
            merge_deep(&mut value, layer);
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Mark property from the specific mark config, falling back to `mark`
    pub fn mark_property(&self, mark: MarkType, prop: &str) -> Option<&Value> {
        self.extra
            .get(mark.name())
            .and_then(|c| c.get(prop))
            .or_else(|| self.mark.get(prop))
            .filter(|v| !v.is_null())
    }

    pub fn mark_number(&self, mark: MarkType, prop: &str) -> Option<f64> {
        self.mark_property(mark, prop).and_then(|v| v.as_f64())
    }

    pub fn band_padding_outer(&self) -> f64 {
        self.scale
            .band_padding_outer
            .unwrap_or(self.scale.band_padding_inner / 2.0)
    }

    pub fn invalid_values(&self) -> InvalidValues {
        // An explicit null keeps invalid values and breaks paths instead
        self.invalid_values.unwrap_or(InvalidValues::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::from_layers(&[]).unwrap();
        assert_eq!(config.view.width, 200.0);
        assert_eq!(config.scale.range_step, Some(21.0));
        assert_eq!(config.band_padding_outer(), 0.05);
        assert_eq!(config.invalid_values(), InvalidValues::Filter);
        assert_eq!(
            config.mark_number(MarkType::Bar, "continuousBandSize"),
            Some(5.0)
        );
        assert_eq!(
            config.mark_property(MarkType::Point, "color"),
            Some(&json!("#4c78a8"))
        );
    }

    #[test]
    fn test_merge_layers() {
        let user = json!({"view": {"width": 300}, "scale": {"rangeStep": null}});
        let config = Config::from_layers(&[&user]).unwrap();
        assert_eq!(config.view.width, 300.0);
        assert_eq!(config.view.height, 200.0);
        assert_eq!(config.scale.range_step, None);

        let null_invalid = json!({"invalidValues": null});
        let config = Config::from_layers(&[&null_invalid]).unwrap();
        assert_eq!(config.invalid_values(), InvalidValues::Null);
    }
}

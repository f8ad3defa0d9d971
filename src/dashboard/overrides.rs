//! Field matchers and field-config properties for panel overrides.

use serde::Serialize;
use serde_json::{json, Value};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatcherConfig {
    pub id: String,
    pub options: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DynamicConfigValue {
    pub id: String,
    pub value: Value,
}

/// One entry of `fieldConfig.overrides`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldOverride {
    pub matcher: MatcherConfig,
    pub properties: Vec<DynamicConfigValue>,
}

impl FieldOverride {
    pub fn new(matcher: MatcherConfig) -> Self {
        Self {
            matcher,
            properties: Vec::new(),
        }
    }

    pub fn with(mut self, property: DynamicConfigValue) -> Self {
        self.properties.push(property);
        self
    }
}

fn matcher(id: &str, options: impl Into<Value>) -> MatcherConfig {
    MatcherConfig {
        id: id.to_string(),
        options: options.into(),
    }
}

fn property(id: &str, value: impl Into<Value>) -> DynamicConfigValue {
    DynamicConfigValue {
        id: id.to_string(),
        value: value.into(),
    }
}

pub fn by_query(ref_id: &str) -> MatcherConfig {
    matcher("byFrameRefID", ref_id)
}

pub fn by_name(name: &str) -> MatcherConfig {
    matcher("byName", name)
}

pub fn by_regex(regex: &str) -> MatcherConfig {
    matcher("byRegexp", regex)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Time,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Time => "time",
        }
    }
}

pub fn by_type(field_type: FieldType) -> MatcherConfig {
    matcher("byType", field_type.as_str())
}

pub fn fixed_color_scheme(color: &str) -> DynamicConfigValue {
    property("color", json!({"fixedColor": color, "mode": "fixed"}))
}

pub fn unit(unit: &str) -> DynamicConfigValue {
    property("unit", unit)
}

pub fn fill_opacity(opacity: i64) -> DynamicConfigValue {
    property("custom.fillOpacity", opacity)
}

pub fn negative_y() -> DynamicConfigValue {
    property("custom.transform", "negative-Y")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementMode {
    Hidden,
    Auto,
    Left,
    Right,
}

impl PlacementMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlacementMode::Hidden => "hidden",
            PlacementMode::Auto => "auto",
            PlacementMode::Left => "left",
            PlacementMode::Right => "right",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackMode {
    /// Series are not stacked
    Unstacked,
    /// Series are stacked as absolute numbers
    Normal,
    /// Series are stacked as percents
    Percent,
}

impl StackMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            StackMode::Unstacked => "none",
            StackMode::Normal => "normal",
            StackMode::Percent => "percent",
        }
    }
}

pub fn stack(mode: StackMode) -> DynamicConfigValue {
    property("custom.stacking", json!({"group": false, "mode": mode.as_str()}))
}

pub fn axis_placement(placement: PlacementMode) -> DynamicConfigValue {
    property("custom.axisPlacement", placement.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_serializes_to_grafana_shape() {
        let over = FieldOverride::new(by_regex("errors.*"))
            .with(fixed_color_scheme("red"))
            .with(negative_y());
        let value = serde_json::to_value(&over).unwrap();
        assert_eq!(
            value,
            json!({
                "matcher": {"id": "byRegexp", "options": "errors.*"},
                "properties": [
                    {"id": "color", "value": {"fixedColor": "red", "mode": "fixed"}},
                    {"id": "custom.transform", "value": "negative-Y"}
                ]
            })
        );
    }

    #[test]
    fn test_stack_and_axis_values() {
        assert_eq!(stack(StackMode::Percent).value, json!({"group": false, "mode": "percent"}));
        assert_eq!(stack(StackMode::Unstacked).value["mode"], "none");
        assert_eq!(axis_placement(PlacementMode::Right).value, json!("right"));
        assert_eq!(by_type(FieldType::Time).options, json!("time"));
        assert_eq!(by_query("A").id, "byFrameRefID");
    }
}

//! Builds a Grafana dashboard from a catalog of Prometheus metrics.
//!
//! Metrics are grouped by phase into row panels; each metric gets a panel
//! matching its type, laid out two per row on Grafana's 24 column grid.

use serde_json::{json, Value};
use std::collections::BTreeMap;

use super::overrides::{self, FieldOverride};
use super::query::{prometheus_query, QueryVariable};
use super::variable::DataSourceRef;
use super::Dashboard;

const GRID_WIDTH: u32 = 24;
const PANEL_WIDTH: u32 = 12;
const PANEL_HEIGHT: u32 = 8;

/// Represents a metric type for dashboard panel generation
#[derive(Debug, Clone, PartialEq)]
pub enum MetricType {
    Counter,
    Histogram,
    Gauge,
}

/// Represents a metric definition
#[derive(Debug, Clone)]
pub struct MetricDef {
    pub name: String,
    pub metric_type: MetricType,
    pub description: String,
    pub unit: Option<String>,
    pub phase: String,
}

impl MetricDef {
    pub fn new(name: &str, metric_type: MetricType, description: &str, phase: &str) -> Self {
        Self {
            name: name.to_string(),
            metric_type,
            description: description.to_string(),
            unit: None,
            phase: phase.to_string(),
        }
    }

    pub fn with_unit(mut self, unit: &str) -> Self {
        self.unit = Some(unit.to_string());
        self
    }
}

/// Dashboard builder for generating Grafana dashboards
pub struct DashboardBuilder {
    uid: String,
    title: String,
    metrics: Vec<MetricDef>,
    datasource: DataSourceRef,
    tags: Vec<String>,
    variables: Vec<QueryVariable>,
}

impl DashboardBuilder {
    pub fn new(uid: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            title: title.into(),
            metrics: Vec::new(),
            datasource: DataSourceRef::prometheus("prometheus"),
            tags: vec!["generated".to_string()],
            variables: Vec::new(),
        }
    }

    /// Set the datasource every panel queries
    pub fn with_datasource(mut self, datasource: DataSourceRef) -> Self {
        self.datasource = datasource;
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn with_variable(mut self, variable: QueryVariable) -> Self {
        self.variables.push(variable);
        self
    }

    /// Add a metric definition
    pub fn add_metric(mut self, metric: MetricDef) -> Self {
        self.metrics.push(metric);
        self
    }

    /// Prometheus' own metrics, which the local dev Prometheus scrapes out of the box.
    pub fn prometheus_overview(datasource: DataSourceRef) -> Self {
        Self::new("prometheus-overview", "Prometheus Overview")
            .with_datasource(datasource)
            .with_tag("prometheus")
            .add_metric(MetricDef::new(
                "prometheus_http_requests_total",
                MetricType::Counter,
                "HTTP requests",
                "http",
            ))
            .add_metric(
                MetricDef::new(
                    "prometheus_http_request_duration_seconds",
                    MetricType::Histogram,
                    "HTTP request duration",
                    "http",
                )
                .with_unit("s"),
            )
            .add_metric(MetricDef::new(
                "prometheus_tsdb_head_series",
                MetricType::Gauge,
                "Head series",
                "tsdb",
            ))
            .add_metric(MetricDef::new(
                "prometheus_tsdb_head_samples_appended_total",
                MetricType::Counter,
                "Samples appended",
                "tsdb",
            ))
            .add_metric(
                MetricDef::new(
                    "prometheus_target_interval_length_seconds",
                    MetricType::Histogram,
                    "Scrape interval length",
                    "scrape",
                )
                .with_unit("s"),
            )
            .add_metric(
                MetricDef::new(
                    "process_resident_memory_bytes",
                    MetricType::Gauge,
                    "Resident memory",
                    "process",
                )
                .with_unit("bytes"),
            )
    }

    fn targets(&self, exprs: Vec<(String, &str)>) -> Value {
        let targets: Vec<_> = exprs
            .into_iter()
            .zip(["A", "B", "C", "D"])
            .map(|((expr, legend), ref_id)| {
                prometheus_query(&expr, legend)
                    .ref_id(ref_id)
                    .datasource(self.datasource.clone())
            })
            .collect();
        json!(targets)
    }

    fn timeseries_panel(&self, metric: &MetricDef, targets: Value, unit: &str, panel_id: u32, x: u32, y: u32) -> Value {
        let legend_override = FieldOverride::new(overrides::by_name("p99")).with(overrides::fill_opacity(0));
        json!({
            "id": panel_id,
            "gridPos": { "x": x, "y": y, "w": PANEL_WIDTH, "h": PANEL_HEIGHT },
            "type": "timeseries",
            "title": metric.description,
            "description": metric.name,
            "datasource": self.datasource,
            "targets": targets,
            "fieldConfig": {
                "defaults": {
                    "unit": unit,
                    "custom": {
                        "drawStyle": "line",
                        "lineInterpolation": "linear",
                        "lineWidth": 1,
                        "fillOpacity": 10,
                        "spanNulls": true
                    }
                },
                "overrides": [legend_override]
            },
            "options": {
                "legend": {
                    "calcs": ["mean", "lastNotNull"],
                    "displayMode": "table",
                    "placement": "bottom"
                }
            }
        })
    }

    fn counter_panel(&self, metric: &MetricDef, panel_id: u32, x: u32, y: u32) -> Value {
        let targets = self.targets(vec![(format!("rate({}[5m])", metric.name), "{{instance}}")]);
        self.timeseries_panel(metric, targets, "ops", panel_id, x, y)
    }

    fn histogram_panel(&self, metric: &MetricDef, panel_id: u32, x: u32, y: u32) -> Value {
        let unit = metric.unit.as_deref().unwrap_or("short");
        let quantile =
            |q: &str| format!("histogram_quantile({}, sum(rate({}_bucket[5m])) by (le))", q, metric.name);
        let targets = self.targets(vec![
            (quantile("0.5"), "p50"),
            (quantile("0.95"), "p95"),
            (quantile("0.99"), "p99"),
        ]);
        self.timeseries_panel(metric, targets, unit, panel_id, x, y)
    }

    fn gauge_panel(&self, metric: &MetricDef, panel_id: u32, x: u32, y: u32) -> Value {
        let unit = metric.unit.as_deref().unwrap_or("short");
        json!({
            "id": panel_id,
            "gridPos": { "x": x, "y": y, "w": PANEL_WIDTH, "h": PANEL_HEIGHT },
            "type": "stat",
            "title": metric.description,
            "description": metric.name,
            "datasource": self.datasource,
            "targets": self.targets(vec![(metric.name.clone(), "{{instance}}")]),
            "fieldConfig": {
                "defaults": {
                    "unit": unit,
                    "thresholds": {
                        "mode": "absolute",
                        "steps": [{ "color": "green", "value": null }]
                    }
                }
            },
            "options": {
                "orientation": "auto",
                "textMode": "auto",
                "colorMode": "background",
                "graphMode": "area",
                "justifyMode": "auto"
            }
        })
    }

    fn panels(&self) -> Vec<Value> {
        let mut panels = Vec::new();
        let mut panel_id = 1;
        let mut current_y = 0;

        // BTreeMap keeps phases in a stable order
        let mut phases: BTreeMap<&str, Vec<&MetricDef>> = BTreeMap::new();
        for metric in &self.metrics {
            phases.entry(metric.phase.as_str()).or_default().push(metric);
        }

        for (phase, metrics) in phases {
            panels.push(json!({
                "id": panel_id,
                "type": "row",
                "title": phase.to_uppercase(),
                "gridPos": { "x": 0, "y": current_y, "w": GRID_WIDTH, "h": 1 },
                "collapsed": false
            }));
            panel_id += 1;
            current_y += 1;

            let mut x_offset = 0;
            for metric in metrics {
                let panel = match metric.metric_type {
                    MetricType::Counter => self.counter_panel(metric, panel_id, x_offset, current_y),
                    MetricType::Histogram => self.histogram_panel(metric, panel_id, x_offset, current_y),
                    MetricType::Gauge => self.gauge_panel(metric, panel_id, x_offset, current_y),
                };
                panels.push(panel);
                panel_id += 1;

                x_offset += PANEL_WIDTH;
                if x_offset >= GRID_WIDTH {
                    x_offset = 0;
                    current_y += PANEL_HEIGHT;
                }
            }

            if x_offset > 0 {
                current_y += PANEL_HEIGHT;
            }
        }

        panels
    }

    pub fn build(&self) -> Dashboard {
        Dashboard::new(self.uid.clone(), self.title.clone())
            .with_field("tags", json!(self.tags))
            .with_field("timezone", "browser")
            .with_field("schemaVersion", 39)
            .with_field("refresh", "10s")
            .with_field("time", json!({ "from": "now-1h", "to": "now" }))
            .with_field("templating", json!({ "list": self.variables }))
            .with_field("panels", Value::Array(self.panels()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_are_grouped_and_sorted_by_phase() {
        let dashboard = DashboardBuilder::prometheus_overview(DataSourceRef::uid("prom")).build();
        let panels = dashboard.field("panels").unwrap().as_array().unwrap();
        let rows: Vec<&str> = panels
            .iter()
            .filter(|p| p["type"] == "row")
            .map(|p| p["title"].as_str().unwrap())
            .collect();
        assert_eq!(rows, vec!["HTTP", "PROCESS", "SCRAPE", "TSDB"]);
        assert_eq!(dashboard.uid, "prometheus-overview");
    }

    #[test]
    fn test_panel_layout_wraps_after_two_columns() {
        let dashboard = DashboardBuilder::new("grid", "Grid")
            .add_metric(MetricDef::new("a_total", MetricType::Counter, "A", "p"))
            .add_metric(MetricDef::new("b_total", MetricType::Counter, "B", "p"))
            .add_metric(MetricDef::new("c", MetricType::Gauge, "C", "p"))
            .build();
        let panels = dashboard.field("panels").unwrap().as_array().unwrap();
        assert_eq!(panels.len(), 4);
        assert_eq!(panels[1]["gridPos"]["x"], 0);
        assert_eq!(panels[2]["gridPos"]["x"], 12);
        assert_eq!(panels[3]["gridPos"]["x"], 0);
        assert_eq!(panels[3]["gridPos"]["y"], 9);
        assert_eq!(panels[3]["type"], "stat");
    }

    #[test]
    fn test_histogram_panel_has_quantile_targets() {
        let dashboard = DashboardBuilder::new("h", "H")
            .add_metric(MetricDef::new("req_seconds", MetricType::Histogram, "Latency", "http").with_unit("s"))
            .build();
        let panel = &dashboard.field("panels").unwrap()[1];
        let targets = panel["targets"].as_array().unwrap();
        assert_eq!(targets.len(), 3);
        assert_eq!(targets[2]["refId"], "C");
        assert_eq!(targets[2]["legendFormat"], "p99");
        assert_eq!(panel["fieldConfig"]["defaults"]["unit"], "s");
    }
}

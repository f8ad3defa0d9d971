//! Prometheus targets and query-backed template variables.

use serde::Serialize;

use super::variable::DataSourceRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PromQueryFormat {
    TimeSeries,
    Table,
    Heatmap,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrometheusQuery {
    pub expr: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legend_format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<PromQueryFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ref_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datasource: Option<DataSourceRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instant: Option<bool>,
}

impl PrometheusQuery {
    pub fn new(expr: impl Into<String>) -> Self {
        Self {
            expr: expr.into(),
            ..Default::default()
        }
    }

    pub fn legend_format(mut self, legend: impl Into<String>) -> Self {
        self.legend_format = Some(legend.into());
        self
    }

    pub fn format(mut self, format: PromQueryFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn ref_id(mut self, ref_id: impl Into<String>) -> Self {
        self.ref_id = Some(ref_id.into());
        self
    }

    pub fn datasource(mut self, datasource: DataSourceRef) -> Self {
        self.datasource = Some(datasource);
        self
    }

    pub fn instant(mut self, instant: bool) -> Self {
        self.instant = Some(instant);
        self
    }
}

pub fn prometheus_query(expr: &str, legend: &str) -> PrometheusQuery {
    PrometheusQuery::new(expr).legend_format(legend)
}

pub fn table_prometheus_query(expr: &str, ref_id: &str) -> PrometheusQuery {
    PrometheusQuery::new(expr)
        .format(PromQueryFormat::Table)
        .ref_id(ref_id)
}

/// When a query variable re-runs its query. Serialized as Grafana's numeric codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableRefresh {
    Never = 0,
    OnDashboardLoad = 1,
    OnTimeRangeChanged = 2,
}

impl Serialize for VariableRefresh {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(*self as u8)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableSort {
    Disabled = 0,
    AlphabeticalAsc = 1,
    AlphabeticalDesc = 2,
    NumericalAsc = 3,
    NumericalDesc = 4,
}

impl Serialize for VariableSort {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(*self as u8)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariableOption {
    pub selected: bool,
    pub text: Vec<String>,
    pub value: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryVariable {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub name: String,
    pub label: String,
    pub query: String,
    pub datasource: DataSourceRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<VariableOption>,
    pub refresh: VariableRefresh,
    pub sort: VariableSort,
    pub multi: bool,
    pub include_all: bool,
}

/// Multi-value variable refreshed on time range change, sorted alphabetically,
/// with an "All" option. When `all` is set, "All" is the current selection.
pub fn query_variable(
    name: &str,
    label: &str,
    query: &str,
    datasource: DataSourceRef,
    all: bool,
    all_selected: bool,
) -> QueryVariable {
    let current = all.then(|| VariableOption {
        selected: all_selected,
        text: vec!["All".to_string()],
        value: vec!["$__all".to_string()],
    });

    QueryVariable {
        kind: "query",
        name: name.to_string(),
        label: label.to_string(),
        query: query.to_string(),
        datasource,
        current,
        refresh: VariableRefresh::OnTimeRangeChanged,
        sort: VariableSort::AlphabeticalAsc,
        multi: true,
        include_all: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_table_query_sets_format_and_ref() {
        let value = serde_json::to_value(table_prometheus_query("up", "B")).unwrap();
        assert_eq!(value, json!({"expr": "up", "format": "table", "refId": "B"}));
    }

    #[test]
    fn test_query_variable_defaults() {
        let var = query_variable(
            "job",
            "Job",
            "label_values(up, job)",
            DataSourceRef::uid("$datasource"),
            true,
            false,
        );
        let value = serde_json::to_value(&var).unwrap();
        assert_eq!(value["type"], "query");
        assert_eq!(value["refresh"], 2);
        assert_eq!(value["sort"], 1);
        assert_eq!(value["multi"], true);
        assert_eq!(value["includeAll"], true);
        assert_eq!(value["current"]["value"], json!(["$__all"]));
        assert_eq!(value["current"]["selected"], false);

        let without_all = query_variable("job", "Job", "q", DataSourceRef::default(), false, false);
        assert!(without_all.current.is_none());
    }
}

use serde::Serialize;
use std::fmt;

/// Reference to a datasource, by uid and optionally by type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DataSourceRef {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
}

impl DataSourceRef {
    pub fn uid(uid: impl Into<String>) -> Self {
        Self {
            kind: None,
            uid: Some(uid.into()),
        }
    }

    pub fn prometheus(uid: impl Into<String>) -> Self {
        Self {
            kind: Some("prometheus".to_string()),
            uid: Some(uid.into()),
        }
    }
}

/// Name of a dashboard constant, typically the datasource variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DashboardConstant(pub &'static str);

impl DashboardConstant {
    pub fn as_var(&self) -> String {
        format!("${}", self.0)
    }

    /// Datasource reference resolved through the variable.
    pub fn as_datasource(&self) -> DataSourceRef {
        DataSourceRef::uid(self.as_var())
    }
}

impl fmt::Display for DashboardConstant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DashboardVariable(pub &'static str);

impl DashboardVariable {
    pub fn as_var(&self) -> String {
        format!("${}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Pixel(pub u32);

impl fmt::Display for Pixel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}px", self.0)
    }
}

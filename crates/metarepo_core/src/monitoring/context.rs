//! Per-request correlation identifiers.

use uuid::Uuid;

/// Correlation data attached to one logical request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MonitoringContext {
    /// Correlation id shared by every call that belongs to one flow.
    pub cid: String,
    pub reqid: String,
    /// Resource the request targets, e.g. `projects`.
    pub resource: String,
    pub operation: String,
}

impl MonitoringContext {
    pub fn new(cid: impl Into<String>, reqid: impl Into<String>) -> Self {
        Self {
            cid: cid.into(),
            reqid: reqid.into(),
            resource: String::new(),
            operation: String::new(),
        }
    }

    /// Fresh context with random correlation and request ids.
    pub fn generate() -> Self {
        Self::new(Uuid::new_v4().to_string(), Uuid::new_v4().to_string())
    }

    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = resource.into();
        self
    }

    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = operation.into();
        self
    }
}

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure reported by a core operation.
///
/// Every expected failure in the ledgers, the allocation engine and the
/// coordinator is one of these; none of them is fatal to the process.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WarehouseError {
    /// Product, agent or order id is unknown
    #[error("{0}")]
    NotFound(String),

    /// Missing or malformed required fields
    #[error("{0}")]
    InvalidParameters(String),

    /// Agent not idle, insufficient inventory, capacity exceeded, location mismatch
    #[error("{0}")]
    PreconditionFailed(String),

    #[error("{0}")]
    NoAgentAvailable(String),

    /// Unknown agent kind or action name
    #[error("{0}")]
    UnknownAction(String),
}

/// Serializable discriminant of [`WarehouseError`], reported as `error` in results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    InvalidParameters,
    PreconditionFailed,
    NoAgentAvailable,
    UnknownAction,
}

impl WarehouseError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WarehouseError::NotFound(_) => ErrorKind::NotFound,
            WarehouseError::InvalidParameters(_) => ErrorKind::InvalidParameters,
            WarehouseError::PreconditionFailed(_) => ErrorKind::PreconditionFailed,
            WarehouseError::NoAgentAvailable(_) => ErrorKind::NoAgentAvailable,
            WarehouseError::UnknownAction(_) => ErrorKind::UnknownAction,
        }
    }

    pub fn product_not_found(product_id: &str) -> Self {
        WarehouseError::NotFound(format!("Product {} not found", product_id))
    }

    pub fn agv_not_found(agv_id: &str) -> Self {
        WarehouseError::NotFound(format!("AGV {} not found", agv_id))
    }

    pub fn order_not_found(order_id: &str) -> Self {
        WarehouseError::NotFound(format!("Order {} not found", order_id))
    }

    /// Same kind, message rewritten by `f`
    pub fn map_message(self, f: impl FnOnce(String) -> String) -> Self {
        match self {
            WarehouseError::NotFound(m) => WarehouseError::NotFound(f(m)),
            WarehouseError::InvalidParameters(m) => WarehouseError::InvalidParameters(f(m)),
            WarehouseError::PreconditionFailed(m) => WarehouseError::PreconditionFailed(f(m)),
            WarehouseError::NoAgentAvailable(m) => WarehouseError::NoAgentAvailable(f(m)),
            WarehouseError::UnknownAction(m) => WarehouseError::UnknownAction(f(m)),
        }
    }
}

pub type CoreResult<T> = Result<T, WarehouseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_serializes_snake_case() {
        let err = WarehouseError::NoAgentAvailable("none".to_string());
        assert_eq!(
            serde_json::to_value(err.kind()).unwrap(),
            serde_json::json!("no_agent_available")
        );
    }

    #[test]
    fn test_display_is_message() {
        let err = WarehouseError::product_not_found("P009");
        assert_eq!(err.to_string(), "Product P009 not found");
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_map_message_keeps_kind() {
        let err = WarehouseError::PreconditionFailed("over capacity".to_string())
            .map_message(|m| format!("{} (completed steps: move)", m));
        assert_eq!(err.kind(), ErrorKind::PreconditionFailed);
        assert_eq!(err.to_string(), "over capacity (completed steps: move)");
    }
}

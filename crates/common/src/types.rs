use serde::{Deserialize, Serialize};

/// Marketplace order identifier.
///
/// Wraps the marketplace's string identifier to provide type safety and
/// prevent mixing up order ids with other string-based identifiers
/// (shipping ids, document numbers).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    /// Creates an order id from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for OrderId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for OrderId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Key under which a saga run's step log is retained.
///
/// Derived from the order id, so a re-run of the same order replaces its
/// retained log and observers watching one order keep a stable key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcessId(String);

impl ProcessId {
    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&OrderId> for ProcessId {
    fn from(order_id: &OrderId) -> Self {
        Self(order_id.as_str().to_string())
    }
}

impl From<String> for ProcessId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for ProcessId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl std::fmt::Display for ProcessId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_id_roundtrips_through_serde() {
        let id = OrderId::new("2000012345678");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"2000012345678\"");
        let back: OrderId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn process_id_tracks_order_id() {
        let order_id = OrderId::new("2000012345678");
        let process_id = ProcessId::from(&order_id);
        assert_eq!(process_id.as_str(), order_id.as_str());
    }
}

//! Order status lifecycle.

use serde::{Deserialize, Serialize};

/// The status of an order in its lifecycle.
///
/// Status transitions:
/// ```text
/// Open ──► Shipped
/// ```
///
/// An Open order doubles as the customer's cart; Shipped is terminal and
/// the lines become immutable. All mutation paths go through the
/// capability checks below rather than comparing the variant ad hoc.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    /// Order is the customer's cart; lines can be added/removed.
    #[default]
    Open,

    /// Order has been shipped (terminal state).
    Shipped,
}

impl OrderStatus {
    /// Returns true if lines can be modified in this status.
    pub fn can_modify_items(&self) -> bool {
        matches!(self, OrderStatus::Open)
    }

    /// Returns true if the order can be shipped from this status.
    pub fn can_ship(&self) -> bool {
        matches!(self, OrderStatus::Open)
    }

    /// Returns true if this is a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Shipped)
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Open => "Open",
            OrderStatus::Shipped => "Shipped",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "Open" => Ok(OrderStatus::Open),
            "Shipped" => Ok(OrderStatus::Shipped),
            other => Err(format!("unknown order status: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_status_is_open() {
        assert_eq!(OrderStatus::default(), OrderStatus::Open);
    }

    #[test]
    fn open_can_modify_items() {
        assert!(OrderStatus::Open.can_modify_items());
        assert!(!OrderStatus::Shipped.can_modify_items());
    }

    #[test]
    fn open_can_ship() {
        assert!(OrderStatus::Open.can_ship());
        assert!(!OrderStatus::Shipped.can_ship());
    }

    #[test]
    fn shipped_is_terminal() {
        assert!(!OrderStatus::Open.is_terminal());
        assert!(OrderStatus::Shipped.is_terminal());
    }

    #[test]
    fn display_and_parse() {
        assert_eq!(OrderStatus::Open.to_string(), "Open");
        assert_eq!("Shipped".parse::<OrderStatus>().unwrap(), OrderStatus::Shipped);
        assert!("Draft".parse::<OrderStatus>().is_err());
    }
}

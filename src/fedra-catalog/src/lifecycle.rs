//! Data source lifecycle states and allowed transitions.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a data source.
///
/// ```text
/// Created -> Connecting -> Connected -> Active
///                 |            |           |
///                 +-> Failed <-+-----------+-> Disconnected
/// Disconnected | Failed -> Connecting   (reconnect)
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DataSourceStatus {
    #[default]
    Created,
    Connecting,
    Connected,
    Active,
    Disconnected,
    Failed(String),
}

impl DataSourceStatus {
    /// Whether the lifecycle allows moving from `self` to `next`.
    pub fn can_transition_to(&self, next: &DataSourceStatus) -> bool {
        use DataSourceStatus::*;
        matches!(
            (self, next),
            (Created, Connecting)
                | (Connecting, Connected)
                | (Connecting, Failed(_))
                | (Connected, Active)
                | (Connected | Active, Disconnected)
                | (Connected | Active, Failed(_))
                | (Disconnected | Failed(_), Connecting)
        )
    }

    /// Whether the source is usable for queries.
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Connected | Self::Active)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Created => "CREATED",
            Self::Connecting => "CONNECTING",
            Self::Connected => "CONNECTED",
            Self::Active => "ACTIVE",
            Self::Disconnected => "DISCONNECTED",
            Self::Failed(_) => "FAILED",
        }
    }
}

impl std::fmt::Display for DataSourceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Failed(reason) => write!(f, "FAILED({reason})"),
            other => f.write_str(other.name()),
        }
    }
}

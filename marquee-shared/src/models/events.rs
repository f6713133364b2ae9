use uuid::Uuid;

/// What happened to a hold
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HoldEventKind {
    Started,
    Cancelled,
    Released,
    AlreadyPaid,
    RollbackFailed,
    ShutDown,
}

impl HoldEventKind {
    /// True for every kind that ends a hold's timer
    pub fn is_terminal(&self) -> bool {
        !matches!(self, HoldEventKind::Started)
    }
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct HoldEvent {
    pub seat_id: Uuid,
    pub hold_id: Uuid,
    pub kind: HoldEventKind,
    pub timestamp: i64,
}

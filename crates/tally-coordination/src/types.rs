//! Shared types for the tally core.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;
use tally_constants::MAX_ACTOR_ID_LEN;

use crate::error::TallyError;

/// Identifier of a voting actor.
///
/// Non-empty after trimming and at most [`MAX_ACTOR_ID_LEN`] bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ActorId(String);

impl ActorId {
    /// Validate and wrap an identifier. Surrounding whitespace is trimmed.
    pub fn new(id: impl AsRef<str>) -> Result<Self, TallyError> {
        let raw = id.as_ref();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(TallyError::InvalidActor {
                value: raw.to_string(),
                reason: "identifier is empty".to_string(),
            });
        }
        if trimmed.len() > MAX_ACTOR_ID_LEN as usize {
            return Err(TallyError::InvalidActor {
                value: raw.to_string(),
                reason: format!("identifier exceeds {} bytes", MAX_ACTOR_ID_LEN),
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Borrow the identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ActorId {
    type Error = TallyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ActorId> for String {
    fn from(id: ActorId) -> Self {
        id.0
    }
}

impl FromStr for ActorId {
    type Err = TallyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Vote category. The set is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Top rating.
    Delicious,
    /// Middle rating.
    Average,
    /// Bottom rating.
    Poor,
}

impl Category {
    /// Number of categories.
    pub const COUNT: usize = 3;

    /// All categories in display order.
    pub const ALL: [Category; Self::COUNT] = [Category::Delicious, Category::Average, Category::Poor];

    /// Lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Delicious => "delicious",
            Category::Average => "average",
            Category::Poor => "poor",
        }
    }

    /// Slot of this category in a fixed-size counter array.
    pub fn index(&self) -> usize {
        match self {
            Category::Delicious => 0,
            Category::Average => 1,
            Category::Poor => 2,
        }
    }

    /// Round-robin assignment: the `i`-th actor of a burst gets `ALL[i % 3]`.
    pub fn round_robin(i: usize) -> Category {
        Self::ALL[i % Self::COUNT]
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = TallyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "delicious" => Ok(Category::Delicious),
            "average" => Ok(Category::Average),
            "poor" => Ok(Category::Poor),
            _ => Err(TallyError::InvalidCategory { value: s.to_string() }),
        }
    }
}

/// Where an actor is in the voting lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "category", rename_all = "kebab-case")]
pub enum VoteStatus {
    /// Registered, no vote yet.
    Unvoted,
    /// A vote request is inside (or queued for) the critical section.
    Pending,
    /// Vote counted.
    Committed(Category),
}

impl VoteStatus {
    /// True once a vote has been counted.
    pub fn is_committed(&self) -> bool {
        matches!(self, VoteStatus::Committed(_))
    }
}

/// Why a vote request was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RejectReason {
    /// Actor already committed a vote.
    Duplicate,
    /// Actor has another request in flight.
    InProgress,
    /// Category outside the closed set.
    InvalidCategory,
    /// Empty or oversized actor identifier.
    InvalidActor,
    /// Lock wait queue at capacity.
    QueueFull,
    /// Ledger at capacity.
    RosterFull,
    /// Lock hand-off never reached the requester.
    Abandoned,
}

impl RejectReason {
    /// Kebab-case name used in event output.
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::Duplicate => "duplicate",
            RejectReason::InProgress => "in-progress",
            RejectReason::InvalidCategory => "invalid-category",
            RejectReason::InvalidActor => "invalid-actor",
            RejectReason::QueueFull => "queue-full",
            RejectReason::RosterFull => "roster-full",
            RejectReason::Abandoned => "abandoned",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum EventKind {
    /// Actor now holds the lock.
    LockAcquired,
    /// Actor queued behind the holder.
    LockBlocked,
    /// Actor gave the lock up.
    LockReleased,
    /// Vote counted.
    VoteCommitted,
    /// Vote turned away.
    VoteRejected {
        /// Why.
        reason: RejectReason,
    },
    /// Critical section captured the current count.
    CounterRead {
        /// Captured value.
        value: u64,
    },
    /// Critical section wrote its result back.
    CounterWritten {
        /// Value written.
        value: u64,
    },
    /// Operator toggled protection.
    ProtectionChanged {
        /// New mode.
        enabled: bool,
    },
    /// Actor joined (or re-joined) the roster.
    ActorRegistered,
}

impl EventKind {
    /// Kebab-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::LockAcquired => "lock-acquired",
            EventKind::LockBlocked => "lock-blocked",
            EventKind::LockReleased => "lock-released",
            EventKind::VoteCommitted => "vote-committed",
            EventKind::VoteRejected { .. } => "vote-rejected",
            EventKind::CounterRead { .. } => "counter-read",
            EventKind::CounterWritten { .. } => "counter-written",
            EventKind::ProtectionChanged { .. } => "protection-changed",
            EventKind::ActorRegistered => "actor-registered",
        }
    }
}

/// Immutable record of something the core did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Position in the log, strictly increasing from 1.
    pub seq: u64,
    /// What happened.
    #[serde(flatten)]
    pub kind: EventKind,
    /// Who it happened to. `None` for operator actions and unparseable actors.
    pub actor: Option<ActorId>,
    /// Category involved, if any.
    pub category: Option<Category>,
    /// When (Unix ms).
    pub timestamp_ms: u64,
}

impl Event {
    /// One-line description for an activity stream.
    pub fn describe(&self) -> String {
        let actor = self.actor.as_ref().map(ActorId::as_str).unwrap_or("<unknown>");
        let category = self.category.map(|c| c.as_str()).unwrap_or("-");
        match self.kind {
            EventKind::LockAcquired => format!("{actor} acquired system lock."),
            EventKind::LockBlocked => format!("{actor} blocked: waiting for mutex..."),
            EventKind::LockReleased => format!("{actor} released lock."),
            EventKind::VoteCommitted => format!("{actor} vote recorded: {category}"),
            EventKind::VoteRejected { reason } => format!("{actor} vote rejected ({reason})"),
            EventKind::CounterRead { value } => format!("{actor} READ count_{category} = {value}"),
            EventKind::CounterWritten { value } => format!("{actor} WRITE count_{category} = {value}"),
            EventKind::ProtectionChanged { enabled: true } => "MUTEX: ON (SAFE)".to_string(),
            EventKind::ProtectionChanged { enabled: false } => "MUTEX: OFF (DANGEROUS)".to_string(),
            EventKind::ActorRegistered => format!("{actor} joined."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actor_id_validation() {
        assert_eq!(ActorId::new("  Student_101 ").unwrap().as_str(), "Student_101");
        assert!(matches!(ActorId::new(""), Err(TallyError::InvalidActor { .. })));
        assert!(matches!(ActorId::new("   "), Err(TallyError::InvalidActor { .. })));
        let long = "x".repeat(MAX_ACTOR_ID_LEN as usize + 1);
        assert!(matches!(ActorId::new(&long), Err(TallyError::InvalidActor { .. })));
    }

    #[test]
    fn test_category_parse() {
        assert_eq!("Delicious".parse::<Category>().unwrap(), Category::Delicious);
        assert_eq!(" poor ".parse::<Category>().unwrap(), Category::Poor);
        let err = "tasty".parse::<Category>().unwrap_err();
        assert_eq!(err, TallyError::InvalidCategory {
            value: "tasty".to_string()
        });
    }

    #[test]
    fn test_round_robin_cycles_all_categories() {
        let assigned: Vec<Category> = (0..4).map(Category::round_robin).collect();
        assert_eq!(assigned, vec![Category::Delicious, Category::Average, Category::Poor, Category::Delicious]);
    }

    #[test]
    fn test_event_serializes_flat() {
        let event = Event {
            seq: 7,
            kind: EventKind::VoteRejected {
                reason: RejectReason::Duplicate,
            },
            actor: Some(ActorId::new("a").unwrap()),
            category: Some(Category::Average),
            timestamp_ms: 1_000,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "vote-rejected");
        assert_eq!(json["reason"], "duplicate");
        assert_eq!(json["actor"], "a");
        assert_eq!(json["category"], "average");
        assert_eq!(event.kind.as_str(), "vote-rejected");
    }

    #[test]
    fn test_vote_status_serialization() {
        let json = serde_json::to_value(VoteStatus::Committed(Category::Poor)).unwrap();
        assert_eq!(json["state"], "committed");
        assert_eq!(json["category"], "poor");
        let json = serde_json::to_value(VoteStatus::Unvoted).unwrap();
        assert_eq!(json["state"], "unvoted");
    }

    #[test]
    fn test_describe_uses_activity_wording() {
        let event = Event {
            seq: 1,
            kind: EventKind::LockBlocked,
            actor: Some(ActorId::new("Student_102").unwrap()),
            category: None,
            timestamp_ms: 0,
        };
        assert_eq!(event.describe(), "Student_102 blocked: waiting for mutex...");
    }
}

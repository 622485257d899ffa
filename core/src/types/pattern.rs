//! `Pattern` and `PatternSnapshot` (spec §3), with the tagged-variant
//! `PatternMetadata` design called for in spec §9 in place of a dynamic dict.

use super::ids::{EntityId, PatternId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Bitmask over Monday(bit 0) .. Sunday(bit 6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekdayMask(pub u8);

impl WeekdayMask {
    pub const MON: u8 = 1 << 0;
    pub const TUE: u8 = 1 << 1;
    pub const WED: u8 = 1 << 2;
    pub const THU: u8 = 1 << 3;
    pub const FRI: u8 = 1 << 4;
    pub const SAT: u8 = 1 << 5;
    pub const SUN: u8 = 1 << 6;
    pub const WEEKDAYS: u8 = Self::MON | Self::TUE | Self::WED | Self::THU | Self::FRI;
    pub const WEEKEND: u8 = Self::SAT | Self::SUN;

    #[must_use]
    pub fn single(weekday: chrono::Weekday) -> Self {
        use chrono::Weekday::{Fri, Mon, Sat, Sun, Thu, Tue, Wed};
        Self(match weekday {
            Mon => Self::MON,
            Tue => Self::TUE,
            Wed => Self::WED,
            Thu => Self::THU,
            Fri => Self::FRI,
            Sat => Self::SAT,
            Sun => Self::SUN,
        })
    }

    #[must_use]
    pub fn contains(&self, weekday: chrono::Weekday) -> bool {
        self.0 & Self::single(weekday).0 != 0
    }

    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self(self.0 | other.0)
    }

    #[must_use]
    pub fn popcount(&self) -> u32 {
        self.0.count_ones()
    }
}

impl fmt::Display for WeekdayMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:07b}", self.0)
    }
}

/// Which entity triggered the pattern, A or B, in a co-occurrence pair.
/// The anchor of a `Pattern` is always the trigger ("A"); this field only
/// documents that a reverse-direction pattern (B triggers, A follows) is a
/// distinct row, never merged with this one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    AnchorTriggersPartner,
    PartnerTriggersAnchor,
}

/// Kind-specific pattern payload. A tagged variant in place of a dynamic
/// dict (spec §9).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PatternMetadata {
    TimeOfDay {
        hour: u8,
        weekday_mask: WeekdayMask,
    },
    CoOccurrence {
        partner: EntityId,
        window_s: u64,
        direction: Direction,
    },
    Anomaly {
        /// Rough signature: (state transition, time-of-day bucket).
        signature: String,
    },
}

impl PatternMetadata {
    #[must_use]
    pub fn kind(&self) -> PatternKind {
        match self {
            PatternMetadata::TimeOfDay { .. } => PatternKind::TimeOfDay,
            PatternMetadata::CoOccurrence { .. } => PatternKind::CoOccurrence,
            PatternMetadata::Anomaly { .. } => PatternKind::Anomaly,
        }
    }

    /// A canonical string used for the `(kind, anchor, canonicalized
    /// metadata)` uniqueness invariant (spec §3, §8 property 6).
    #[must_use]
    pub fn canonical_key(&self) -> String {
        match self {
            PatternMetadata::TimeOfDay { hour, weekday_mask } => {
                format!("time_of_day:{hour}:{weekday_mask}")
            }
            PatternMetadata::CoOccurrence {
                partner,
                window_s,
                direction,
            } => {
                format!("co_occurrence:{partner}:{window_s}:{direction:?}")
            }
            PatternMetadata::Anomaly { signature } => format!("anomaly:{signature}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    TimeOfDay,
    CoOccurrence,
    Anomaly,
}

impl fmt::Display for PatternKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PatternKind::TimeOfDay => "time_of_day",
            PatternKind::CoOccurrence => "co_occurrence",
            PatternKind::Anomaly => "anomaly",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Rising,
    Stable,
    Falling,
}

/// A recurring, statistically supported behavior detected in the event
/// stream (spec §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    pub id: PatternId,
    pub anchor: EntityId,
    pub metadata: PatternMetadata,
    confidence: f64,
    pub occurrences: usize,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub confidence_history_count: usize,
    pub trend: Trend,
    pub trend_strength: f64,
}

impl Pattern {
    /// # Errors
    /// Returns `Error::InvalidInput` if `confidence` is outside `[0,1]` or
    /// `occurrences < min_support` (spec §3 insertion invariant).
    pub fn new(
        anchor: EntityId,
        metadata: PatternMetadata,
        confidence: f64,
        occurrences: usize,
        min_support: usize,
        now: DateTime<Utc>,
    ) -> crate::Result<Self> {
        if !(0.0..=1.0).contains(&confidence) {
            return Err(crate::Error::InvalidInput(format!(
                "pattern confidence must be in [0,1], got {confidence}"
            )));
        }
        if occurrences < min_support {
            return Err(crate::Error::InvalidInput(format!(
                "pattern occurrences {occurrences} below min_support {min_support}"
            )));
        }
        Ok(Self {
            id: PatternId::new(),
            anchor,
            metadata,
            confidence,
            occurrences,
            first_seen: now,
            last_seen: now,
            confidence_history_count: 1,
            trend: Trend::Stable,
            trend_strength: 0.0,
        })
    }

    #[must_use]
    pub fn kind(&self) -> PatternKind {
        self.metadata.kind()
    }

    #[must_use]
    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    /// Clamped setter; never stores a value outside `[0,1]` (spec §8 property 2).
    pub fn set_confidence(&mut self, value: f64) {
        self.confidence = value.clamp(0.0, 1.0);
    }

    /// `(kind, anchor, canonicalized metadata)` uniqueness key (spec §3, §8 property 6).
    #[must_use]
    pub fn identity_key(&self) -> String {
        format!("{}:{}:{}", self.kind(), self.anchor, self.metadata.canonical_key())
    }
}

/// One re-observation of a pattern, appended once per daily run (spec §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternSnapshot {
    pub pattern_id: PatternId,
    pub observed_confidence: f64,
    pub observed_occurrences: usize,
    pub recorded_at: DateTime<Utc>,
}

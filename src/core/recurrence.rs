//! Recurrence date arithmetic.
//!
//! Day based frequencies add an exact number of days. Month based frequencies
//! use calendar arithmetic and clamp to the last valid day of the target month,
//! so Jan 31 + 1 month is Feb 29 in a leap year and Feb 28 otherwise. The time of
//! day is always preserved.

use chrono::{DateTime, Days, Months, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How often a recurring item is charged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    /// Every day
    Daily,
    /// Every 7 days
    Weekly,
    /// Every 15 days (half a month, not two weeks)
    Biweekly,
    /// Every calendar month
    Monthly,
    /// Every 3 calendar months
    Quarterly,
    /// Every 6 calendar months
    Biannual,
    /// Every calendar year
    Yearly,
}

/// A single step on the calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Exact number of days
    Days(u64),
    /// Calendar months, clamped to the end of the target month
    Months(u32),
}

impl Frequency {
    /// All frequencies, shortest first.
    pub const ALL: [Self; 7] = [
        Self::Daily,
        Self::Weekly,
        Self::Biweekly,
        Self::Monthly,
        Self::Quarterly,
        Self::Biannual,
        Self::Yearly,
    ];

    /// Text stored in the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Biweekly => "biweekly",
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::Biannual => "biannual",
            Self::Yearly => "yearly",
        }
    }

    /// The calendar step one period of this frequency represents.
    #[must_use]
    pub const fn step(self) -> Step {
        match self {
            Self::Daily => Step::Days(1),
            Self::Weekly => Step::Days(7),
            Self::Biweekly => Step::Days(15),
            Self::Monthly => Step::Months(1),
            Self::Quarterly => Step::Months(3),
            Self::Biannual => Step::Months(6),
            Self::Yearly => Step::Months(12),
        }
    }

    /// Parses stored text, treating anything unrecognised as monthly.
    #[must_use]
    pub fn parse_lossy(text: &str) -> Self {
        text.parse().unwrap_or_else(|()| {
            tracing::warn!("Unknown frequency '{text}', scheduling as monthly");
            Self::Monthly
        })
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|f| f.as_str() == normalized)
            .ok_or(())
    }
}

/// Computes the occurrence that follows `current` for the given frequency.
///
/// The result is strictly later than `current` except at the end of chrono's
/// range: a step that would overflow saturates at `DateTime::<Utc>::MAX_UTC`,
/// so `MAX_UTC` (or anything within one period of it) maps to `MAX_UTC`.
#[must_use]
pub fn compute_next_occurrence(current: DateTime<Utc>, frequency: Frequency) -> DateTime<Utc> {
    let next = match frequency.step() {
        Step::Days(days) => current.checked_add_days(Days::new(days)),
        Step::Months(months) => current.checked_add_months(Months::new(months)),
    };
    next.unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Same as [`compute_next_occurrence`] for a frequency stored as text.
#[must_use]
pub fn compute_next_occurrence_from_text(
    current: DateTime<Utc>,
    frequency: &str,
) -> DateTime<Utc> {
    compute_next_occurrence(current, Frequency::parse_lossy(frequency))
}

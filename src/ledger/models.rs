//! Ledger data models

use crate::core_types::{EntryId, MinorUnits, UserId};
use crate::money::from_minor_units;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::fmt;

/// Ledger entry type
///
/// IDs are stored as SMALLINT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i16)]
pub enum EntryType {
    Credit = 0,
    Withdrawal = 1,
}

impl EntryType {
    #[inline]
    pub fn id(&self) -> i16 {
        *self as i16
    }

    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            0 => Some(EntryType::Credit),
            1 => Some(EntryType::Withdrawal),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EntryType::Credit => "CREDIT",
            EntryType::Withdrawal => "WITHDRAWAL",
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Immutable ledger entry
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerEntry {
    pub id: EntryId,
    pub order_number: String,
    pub user_id: UserId,
    /// Always non-negative; direction comes from `entry_type`
    pub amount: MinorUnits,
    pub entry_type: EntryType,
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    pub fn amount_decimal(&self) -> Decimal {
        from_minor_units(self.amount)
    }
}

/// Aggregated sum of one entry type for one user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeSum {
    pub entry_type: EntryType,
    pub total: MinorUnits,
}

/// User-visible balance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BalanceSummary {
    pub current: Decimal,
    pub withdrawn: Decimal,
}

impl BalanceSummary {
    /// Derive the summary from per-type sums; missing types count as zero.
    pub fn from_sums(sums: &[TypeSum]) -> Self {
        let total_of = |t: EntryType| -> MinorUnits {
            sums.iter()
                .filter(|s| s.entry_type == t)
                .map(|s| s.total)
                .sum()
        };

        let credited = total_of(EntryType::Credit);
        let withdrawn = total_of(EntryType::Withdrawal);

        Self {
            current: from_minor_units(credited - withdrawn),
            withdrawn: from_minor_units(withdrawn),
        }
    }
}

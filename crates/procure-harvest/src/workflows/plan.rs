use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of a procurement plan as exposed by the portal's report filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationType {
    Annual,
    LongTerm,
}

impl DurationType {
    /// Harvest order used by a run.
    pub const ALL: [DurationType; 2] = [DurationType::Annual, DurationType::LongTerm];

    /// Option text shown in the portal's duration selector.
    pub fn portal_label(self) -> &'static str {
        match self {
            DurationType::Annual => "Годовой",
            DurationType::LongTerm => "Долгосрочный",
        }
    }

    /// Folder under the storage root that receives this type's reports.
    pub fn folder_name(self) -> &'static str {
        match self {
            DurationType::Annual => "ГПЗ",
            DurationType::LongTerm => "ДПЗ",
        }
    }
}

impl fmt::Display for DurationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.portal_label())
    }
}

/// Purchase number taken from a report row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PurchaseId(pub String);

impl PurchaseId {
    /// Value the portal writes when a plan line has no purchase yet.
    pub const SENTINEL: &'static str = "-";

    /// Returns `None` for the sentinel and for blank cells.
    pub fn from_cell(value: &str) -> Option<Self> {
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed == Self::SENTINEL {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PurchaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Runs report on the plan of the year before `today`.
pub fn default_plan_year(today: NaiveDate) -> i32 {
    today.year() - 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_and_blank_cells_are_not_purchases() {
        assert_eq!(PurchaseId::from_cell("-"), None);
        assert_eq!(PurchaseId::from_cell("  - "), None);
        assert_eq!(PurchaseId::from_cell(""), None);
        assert_eq!(
            PurchaseId::from_cell(" 1234567-ОК1 "),
            Some(PurchaseId("1234567-ОК1".to_string()))
        );
    }

    #[test]
    fn plan_year_is_previous_calendar_year() {
        let today = NaiveDate::from_ymd_opt(2026, 1, 3).expect("valid date");
        assert_eq!(default_plan_year(today), 2025);
    }

    #[test]
    fn duration_types_carry_portal_labels_and_folders() {
        assert_eq!(DurationType::Annual.portal_label(), "Годовой");
        assert_eq!(DurationType::LongTerm.folder_name(), "ДПЗ");
        assert_eq!(DurationType::ALL[0], DurationType::Annual);
    }
}

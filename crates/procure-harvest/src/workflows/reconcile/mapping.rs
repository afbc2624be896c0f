use std::collections::HashMap;

/// Summary written when no mapping entry matches a row.
pub const UNMAPPED_SUMMARY: &str = "-";
/// Separator between labels when several entries match the same row.
pub const LABEL_SEPARATOR: &str = " / ";
/// Header of the mapping column holding the summary label.
pub const SUMMARY_LABEL_COLUMN: &str = "Для отчета КЦ КМГ";

/// One line of the static status mapping file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingEntry {
    pub purchase_status: String,
    pub contract_status: String,
    pub summary_label: String,
}

impl MappingEntry {
    pub fn new(purchase_status: &str, contract_status: &str, summary_label: &str) -> Self {
        Self {
            purchase_status: purchase_status.to_string(),
            contract_status: contract_status.to_string(),
            summary_label: summary_label.to_string(),
        }
    }
}

/// Read-only lookup from `(purchase status, contract status)` to summary labels.
#[derive(Debug, Clone, Default)]
pub struct MappingTable {
    entries: Vec<MappingEntry>,
    labels: HashMap<(String, String), Vec<String>>,
}

impl MappingTable {
    pub fn new(entries: Vec<MappingEntry>) -> Self {
        let mut labels: HashMap<(String, String), Vec<String>> = HashMap::new();
        for entry in &entries {
            let label = entry.summary_label.trim();
            if label.is_empty() {
                continue;
            }
            labels
                .entry(status_key(&entry.purchase_status, &entry.contract_status))
                .or_default()
                .push(label.to_string());
        }

        Self { entries, labels }
    }

    pub fn entries(&self) -> &[MappingEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Labels matching the pair, in file order.
    pub fn labels_for(&self, purchase_status: &str, contract_status: &str) -> &[String] {
        self.labels
            .get(&status_key(purchase_status, contract_status))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Never empty: joined labels, or [`UNMAPPED_SUMMARY`].
    pub fn summary_for(&self, purchase_status: &str, contract_status: &str) -> String {
        let labels = self.labels_for(purchase_status, contract_status);
        if labels.is_empty() {
            UNMAPPED_SUMMARY.to_string()
        } else {
            labels.join(LABEL_SEPARATOR)
        }
    }
}

/// Statuses match exactly once surrounding whitespace is gone.
fn status_key(purchase_status: &str, contract_status: &str) -> (String, String) {
    (
        purchase_status.trim().to_string(),
        contract_status.trim().to_string(),
    )
}

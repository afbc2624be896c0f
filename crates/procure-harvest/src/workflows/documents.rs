use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{info, warn};

use crate::portal::{DriverError, ElementHandle, PortalDriver};
use crate::workflows::downloads::{DownloadWatcher, WatchError};
use crate::workflows::filing::{dotted_extension, relocate, sanitize_file_name};
use crate::workflows::plan::PurchaseId;

/// A downloadable attachment listed on a purchase page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentLink {
    pub element: ElementHandle,
    pub label: String,
}

#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error(transparent)]
    Watch(#[from] WatchError),
    #[error("failed to trigger download: {0}")]
    Trigger(#[from] DriverError),
    #[error("failed to move {} to {}: {source}", from.display(), to.display())]
    Relocate {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug)]
pub struct DocumentFailure {
    pub label: String,
    pub error: DocumentError,
}

#[derive(Debug)]
pub struct FetchResult {
    pub purchase_id: PurchaseId,
    pub saved: Vec<PathBuf>,
    pub failures: Vec<DocumentFailure>,
}

impl FetchResult {
    fn empty(purchase_id: &PurchaseId) -> Self {
        Self {
            purchase_id: purchase_id.clone(),
            saved: Vec::new(),
            failures: Vec::new(),
        }
    }
}

/// Downloads every attachment of one purchase, one click at a time.
#[derive(Debug, Clone)]
pub struct DocumentBatchFetcher {
    watcher: DownloadWatcher,
    download_dir: PathBuf,
    timeout: Duration,
}

impl DocumentBatchFetcher {
    pub fn new(watcher: DownloadWatcher, download_dir: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            watcher,
            download_dir: download_dir.into(),
            timeout,
        }
    }

    /// Saves each document as `{purchase_id} - {label}{ext}` in `destination_dir`.
    /// A failing document is logged and recorded; the batch carries on.
    pub fn fetch_documents<D: PortalDriver + ?Sized>(
        &self,
        driver: &D,
        purchase_id: &PurchaseId,
        links: &[DocumentLink],
        destination_dir: &Path,
    ) -> FetchResult {
        let mut result = FetchResult::empty(purchase_id);
        if links.is_empty() {
            info!(purchase = %purchase_id, "purchase has no documents");
            return result;
        }

        for (position, link) in links.iter().enumerate() {
            match self.fetch_one(driver, purchase_id, position, link, destination_dir) {
                Ok(path) => result.saved.push(path),
                Err(error) => {
                    warn!(
                        purchase = %purchase_id,
                        document = %link.label,
                        %error,
                        "unable to download purchase document"
                    );
                    result.failures.push(DocumentFailure {
                        label: link.label.clone(),
                        error,
                    });
                }
            }
        }

        info!(
            purchase = %purchase_id,
            saved = result.saved.len(),
            failed = result.failures.len(),
            "purchase documents processed"
        );
        result
    }

    fn fetch_one<D: PortalDriver + ?Sized>(
        &self,
        driver: &D,
        purchase_id: &PurchaseId,
        position: usize,
        link: &DocumentLink,
        destination_dir: &Path,
    ) -> Result<PathBuf, DocumentError> {
        // Fresh baseline per click so each arrival is attributed to its own link.
        let baseline = self.watcher.snapshot(&self.download_dir)?;
        driver.click(&link.element)?;
        let event = self
            .watcher
            .await_new_file(&self.download_dir, &baseline, self.timeout)?;

        let target = destination_dir.join(document_file_name(
            purchase_id,
            &link.label,
            position,
            &dotted_extension(&event.path),
        ));
        relocate(&event.path, &target).map_err(|source| DocumentError::Relocate {
            from: event.path.clone(),
            to: target.clone(),
            source,
        })?;
        Ok(target)
    }
}

fn document_file_name(
    purchase_id: &PurchaseId,
    label: &str,
    position: usize,
    extension: &str,
) -> String {
    let mut label = sanitize_file_name(label);
    if label.is_empty() {
        label = format!("Документ {}", position + 1);
    }
    format!(
        "{} - {}{}",
        sanitize_file_name(purchase_id.as_str()),
        label,
        extension
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_joins_purchase_and_label() {
        let purchase = PurchaseId("1234567-1".to_string());
        assert_eq!(
            document_file_name(&purchase, "Техническая спецификация", 0, ".pdf"),
            "1234567-1 - Техническая спецификация.pdf"
        );
        assert_eq!(
            document_file_name(&purchase, " / ", 2, ".zip"),
            "1234567-1 - _.zip"
        );
        assert_eq!(
            document_file_name(&purchase, "  ", 2, ""),
            "1234567-1 - Документ 3"
        );
    }
}

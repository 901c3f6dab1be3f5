use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of the resale certificate order that owns a generated document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CertificateId(pub String);

impl fmt::Display for CertificateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Location of a persisted document as reported by the object store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredDocument {
    pub path: String,
    pub url: String,
    pub stored_at: DateTime<Utc>,
}

/// Object storage that accepts an opaque byte buffer under a target path.
pub trait DocumentStore: Send + Sync {
    fn put(&self, path: &str, bytes: &[u8]) -> Result<StoredDocument, StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("object storage unavailable: {0}")]
    Unavailable(String),
    #[error("object storage rejected '{path}': {reason}")]
    Rejected { path: String, reason: String },
}

/// Completion state of one certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateRecord {
    pub certificate_id: CertificateId,
    pub document: StoredDocument,
    pub content_hash: String,
    pub completed_at: DateTime<Utc>,
}

impl CertificateRecord {
    pub fn view(&self) -> CertificateView {
        CertificateView {
            certificate_id: self.certificate_id.clone(),
            status: "completed",
            document_url: self.document.url.clone(),
            completed_at: self.completed_at,
        }
    }
}

/// Record storage for generated certificates.
pub trait CertificateRepository: Send + Sync {
    /// Insert or replace the record for `record.certificate_id`.
    fn save(&self, record: CertificateRecord) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &CertificateId) -> Result<Option<CertificateRecord>, RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Public representation returned by the HTTP layer.
#[derive(Debug, Clone, Serialize)]
pub struct CertificateView {
    pub certificate_id: CertificateId,
    pub status: &'static str,
    pub document_url: String,
    pub completed_at: DateTime<Utc>,
}

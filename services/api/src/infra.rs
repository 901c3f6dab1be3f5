use chrono::Utc;
use metrics_exporter_prometheus::PrometheusHandle;
use resale_cert::certificate::{
    CertificateId, CertificateRecord, CertificateRepository, DocumentStore, FieldManifest,
    FieldMapper, RepositoryError, StoreError, StoredDocument,
};
use resale_cert::error::AppError;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Object store kept in process memory; documents are addressed with `memory://` URLs.
#[derive(Default, Clone)]
pub(crate) struct InMemoryDocumentStore {
    objects: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl DocumentStore for InMemoryDocumentStore {
    fn put(&self, path: &str, bytes: &[u8]) -> Result<StoredDocument, StoreError> {
        if path.is_empty() {
            return Err(StoreError::Rejected {
                path: path.to_string(),
                reason: "empty object path".to_string(),
            });
        }

        let mut guard = self.objects.lock().unwrap_or_else(PoisonError::into_inner);
        guard.insert(path.to_string(), bytes.to_vec());
        Ok(StoredDocument {
            path: path.to_string(),
            url: format!("memory://{path}"),
            stored_at: Utc::now(),
        })
    }
}

impl InMemoryDocumentStore {
    #[cfg(test)]
    pub(crate) fn object(&self, path: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .cloned()
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryCertificateRepository {
    records: Arc<Mutex<HashMap<CertificateId, CertificateRecord>>>,
}

impl CertificateRepository for InMemoryCertificateRepository {
    fn save(&self, record: CertificateRecord) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        guard.insert(record.certificate_id.clone(), record);
        Ok(())
    }

    fn fetch(&self, id: &CertificateId) -> Result<Option<CertificateRecord>, RepositoryError> {
        let guard = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(guard.get(id).cloned())
    }
}

/// Mapper over the manifest at `path`, or the bundled manifest when none is given.
pub(crate) fn load_mapper(path: Option<&Path>) -> Result<FieldMapper, AppError> {
    let manifest = match path {
        Some(path) => FieldManifest::from_path(path)?,
        None => FieldManifest::standard()?,
    };
    Ok(FieldMapper::new(manifest))
}

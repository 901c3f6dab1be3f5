use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use axum::http::StatusCode;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use super::data::ApplicationData;
use super::descriptor::FieldDescriptor;
use super::filler::{DocumentFiller, FillError, FillOptions, FillReport, DEFAULT_FONT_SIZE};
use super::mapper::FieldMapper;
use super::repository::{
    CertificateId, CertificateRecord, CertificateRepository, DocumentStore, RepositoryError,
    StoreError, StoredDocument,
};
use crate::config::DocumentConfig;

/// Body accepted by the preview, render and generate operations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CertificateRequest {
    #[serde(default)]
    pub certificate_id: Option<CertificateId>,
    /// IANA zone for rendered dates; the configured default applies when absent.
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub application: ApplicationData,
}

/// A filled template that has not been persisted.
#[derive(Debug)]
pub struct RenderedCertificate {
    pub bytes: Vec<u8>,
    pub report: FillReport,
    pub content_hash: String,
}

#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub default_timezone: Option<String>,
    pub storage_prefix: String,
    /// Maximum number of generated documents remembered by content hash; `0` disables reuse.
    pub cache_capacity: usize,
    pub font_size: f32,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            default_timezone: None,
            storage_prefix: "resale-certificates".to_string(),
            cache_capacity: 64,
            font_size: DEFAULT_FONT_SIZE,
        }
    }
}

impl From<&DocumentConfig> for ServiceSettings {
    fn from(config: &DocumentConfig) -> Self {
        Self {
            default_timezone: config.default_timezone.clone(),
            storage_prefix: config.storage_prefix.clone(),
            cache_capacity: config.cache_capacity,
            font_size: config.font_size,
        }
    }
}

/// Map, fill, and store pipeline for resale certificates.
pub struct ResaleCertificateService<S, R> {
    mapper: Arc<FieldMapper>,
    filler: DocumentFiller,
    template: Arc<[u8]>,
    store: Arc<S>,
    repository: Arc<R>,
    settings: ServiceSettings,
    cache: Mutex<DocumentCache>,
}

static CERTIFICATE_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_certificate_id() -> CertificateId {
    let id = CERTIFICATE_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    CertificateId(format!("cert-{id:06}"))
}

impl<S, R> ResaleCertificateService<S, R>
where
    S: DocumentStore + 'static,
    R: CertificateRepository + 'static,
{
    pub fn new(
        mapper: Arc<FieldMapper>,
        template: impl Into<Arc<[u8]>>,
        store: Arc<S>,
        repository: Arc<R>,
        settings: ServiceSettings,
    ) -> Self {
        let cache = Mutex::new(DocumentCache::new(settings.cache_capacity));
        Self {
            mapper,
            filler: DocumentFiller::new(FillOptions {
                font_size: settings.font_size,
            }),
            template: template.into(),
            store,
            repository,
            settings,
            cache,
        }
    }

    pub fn mapper(&self) -> &FieldMapper {
        &self.mapper
    }

    /// Descriptors the mapper produces for `request`, without touching the template.
    pub fn preview(&self, request: &CertificateRequest) -> Vec<FieldDescriptor> {
        let timezone = request
            .timezone
            .as_deref()
            .or(self.settings.default_timezone.as_deref());
        self.mapper.map(&request.application, timezone)
    }

    /// Fill a fresh copy of the template and return its bytes.
    pub fn render(
        &self,
        request: &CertificateRequest,
    ) -> Result<RenderedCertificate, CertificateServiceError> {
        let descriptors = self.preview(request);
        let content_hash = content_hash(&descriptors)?;
        let filled = self.filler.fill(&self.template, &descriptors)?;

        Ok(RenderedCertificate {
            bytes: filled.bytes,
            report: filled.report,
            content_hash,
        })
    }

    /// Render, persist, and record completion for one certificate.
    ///
    /// Identical descriptor sets reuse the previously stored document.
    pub fn generate(
        &self,
        request: &CertificateRequest,
    ) -> Result<CertificateRecord, CertificateServiceError> {
        let certificate_id = request
            .certificate_id
            .clone()
            .unwrap_or_else(next_certificate_id);
        let descriptors = self.preview(request);
        let content_hash = content_hash(&descriptors)?;

        let document = match self.cached(&content_hash) {
            Some(document) => {
                debug!(certificate = %certificate_id, hash = %content_hash, "reusing stored document");
                document
            }
            None => {
                let filled = self.filler.fill(&self.template, &descriptors)?;
                let path = format!("{}/{}.pdf", self.settings.storage_prefix, content_hash);
                let document = self.store.put(&path, &filled.bytes)?;
                self.remember(content_hash.clone(), document.clone());
                document
            }
        };

        let record = CertificateRecord {
            certificate_id,
            document,
            content_hash,
            completed_at: Utc::now(),
        };
        self.repository.save(record.clone())?;

        info!(
            certificate = %record.certificate_id,
            url = %record.document.url,
            "resale certificate generated"
        );
        Ok(record)
    }

    pub fn get(
        &self,
        certificate_id: &CertificateId,
    ) -> Result<CertificateRecord, CertificateServiceError> {
        let record = self
            .repository
            .fetch(certificate_id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(record)
    }

    fn cached(&self, content_hash: &str) -> Option<StoredDocument> {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(content_hash)
    }

    fn remember(&self, content_hash: String, document: StoredDocument) {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(content_hash, document);
    }
}

/// SHA-256 of the serialized descriptor list, hex encoded.
pub fn content_hash(descriptors: &[FieldDescriptor]) -> Result<String, serde_json::Error> {
    let serialized = serde_json::to_vec(descriptors)?;
    let mut hasher = Sha256::new();
    hasher.update(&serialized);
    Ok(format!("{:x}", hasher.finalize()))
}

/// Insertion-ordered, bounded map; the oldest entry goes first.
#[derive(Debug)]
struct DocumentCache {
    capacity: usize,
    order: VecDeque<String>,
    entries: HashMap<String, StoredDocument>,
}

impl DocumentCache {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            order: VecDeque::with_capacity(capacity),
            entries: HashMap::with_capacity(capacity),
        }
    }

    fn get(&self, key: &str) -> Option<StoredDocument> {
        self.entries.get(key).cloned()
    }

    fn insert(&mut self, key: String, document: StoredDocument) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.insert(key.clone(), document).is_none() {
            self.order.push_back(key);
        }
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CertificateServiceError {
    #[error(transparent)]
    Fill(#[from] FillError),
    #[error("could not hash field descriptors: {0}")]
    Hash(#[from] serde_json::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl CertificateServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Fill(_) | Self::Hash(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Store(_) | Self::Repository(RepositoryError::Unavailable(_)) => {
                StatusCode::BAD_GATEWAY
            }
            Self::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        }
    }

    /// Message safe to return to API callers; template internals stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            Self::Fill(_) | Self::Hash(_) => "could not generate document".to_string(),
            Self::Store(_) => "could not store document".to_string(),
            Self::Repository(RepositoryError::NotFound) => "certificate not found".to_string(),
            Self::Repository(RepositoryError::Unavailable(_)) => {
                "certificate records unavailable".to_string()
            }
        }
    }
}

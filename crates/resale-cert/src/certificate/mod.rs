//! Resale certificate field mapping and form filling.
//!
//! [`FieldMapper`] projects an [`ApplicationData`] tree onto the field names of one template
//! revision; [`DocumentFiller`] writes the resulting descriptors into the template. The
//! service and router wire both to storage and HTTP.

pub mod aliases;
pub mod data;
pub mod descriptor;
pub mod document;
pub(crate) mod families;
pub mod filler;
pub mod format;
pub mod manifest;
pub mod mapper;
pub(crate) mod mapping;
pub mod repository;
pub mod router;
pub mod rules;
pub mod service;

#[cfg(test)]
mod tests;

pub use data::ApplicationData;
pub use descriptor::{FieldDescriptor, FieldValue};
pub use document::{FieldFault, FormDocument, FormField, FormValue, PdfForm};
pub use filler::{
    DocumentFiller, FieldFailure, FillError, FillOptions, FillReport, FilledDocument,
    DEFAULT_FONT_SIZE,
};
pub use manifest::{FieldKind, FieldManifest, ManifestEntry, ManifestError, RUNTIME_CHECKBOXES};
pub use mapper::FieldMapper;
pub use repository::{
    CertificateId, CertificateRecord, CertificateRepository, CertificateView, DocumentStore,
    RepositoryError, StoreError, StoredDocument,
};
pub use router::certificate_router;
pub use service::{
    content_hash, CertificateRequest, CertificateServiceError, RenderedCertificate,
    ResaleCertificateService, ServiceSettings,
};

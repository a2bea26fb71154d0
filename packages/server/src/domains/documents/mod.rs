//! Signature and document capture for the provider signup wizard.

pub mod capture;
pub mod preview;

pub use capture::{
    decode_signature_data_url, validate_document, DocumentError, DocumentFile, DocumentKind,
    MAX_DOCUMENT_BYTES,
};
pub use preview::{PreviewContent, PreviewHandle, PreviewRegistry};

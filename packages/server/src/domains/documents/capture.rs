//! Document capture: size and type checks for wizard uploads, and decoding
//! of drawn signatures submitted as data URLs.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Hard upload limit for every document kind (5MB).
pub const MAX_DOCUMENT_BYTES: usize = 5 * 1024 * 1024;

/// Content types accepted for practising certificates.
pub const CERTIFICATE_CONTENT_TYPES: &[&str] = &["application/pdf", "image/jpeg", "image/png"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    ProfilePicture,
    Certificate,
    Signature,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 3] = [
        DocumentKind::ProfilePicture,
        DocumentKind::Certificate,
        DocumentKind::Signature,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::ProfilePicture => "profile_picture",
            DocumentKind::Certificate => "certificate",
            DocumentKind::Signature => "signature",
        }
    }

    fn accepts(&self, content_type: &str) -> bool {
        match self {
            DocumentKind::Certificate => CERTIFICATE_CONTENT_TYPES.contains(&content_type),
            DocumentKind::ProfilePicture | DocumentKind::Signature => {
                content_type.starts_with("image/")
            }
        }
    }

    fn allowed_description(&self) -> String {
        match self {
            DocumentKind::Certificate => CERTIFICATE_CONTENT_TYPES.join(", "),
            DocumentKind::ProfilePicture | DocumentKind::Signature => "image/*".to_string(),
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentKind::ProfilePicture => write!(f, "Profile picture"),
            DocumentKind::Certificate => write!(f, "Certificate"),
            DocumentKind::Signature => write!(f, "Signature"),
        }
    }
}

impl std::str::FromStr for DocumentKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "profile_picture" => Ok(DocumentKind::ProfilePicture),
            "certificate" => Ok(DocumentKind::Certificate),
            "signature" => Ok(DocumentKind::Signature),
            _ => Err(anyhow::anyhow!("Invalid document kind: {}", s)),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DocumentError {
    #[error("{kind} file is empty")]
    Empty { kind: DocumentKind },

    #[error("{kind} file is too large ({size} bytes); the maximum size is 5MB")]
    FileTooLarge {
        kind: DocumentKind,
        size: usize,
        max: usize,
    },

    #[error("{kind} must be one of {allowed} (got {content_type})")]
    UnsupportedType {
        kind: DocumentKind,
        content_type: String,
        allowed: String,
    },

    #[error("Invalid signature image: {0}")]
    InvalidSignature(String),
}

/// A file selected or drawn in the wizard, held in memory until upload.
#[derive(Clone, PartialEq, Eq)]
pub struct DocumentFile {
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

impl fmt::Debug for DocumentFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentFile")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("size", &self.data.len())
            .finish()
    }
}

impl DocumentFile {
    /// Build a file, guessing the content type from the name when the
    /// client did not send one.
    pub fn new(file_name: impl Into<String>, content_type: Option<&str>, data: Bytes) -> Self {
        let file_name = file_name.into();
        let content_type = match content_type.map(normalize_content_type) {
            Some(ct) if !ct.is_empty() && ct != "application/octet-stream" => ct,
            _ => mime_guess::from_path(&file_name)
                .first_or_octet_stream()
                .essence_str()
                .to_string(),
        };
        Self {
            file_name,
            content_type,
            data,
        }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Extension used for the storage object name.
    pub fn extension(&self) -> String {
        match self.content_type.as_str() {
            "application/pdf" => return "pdf".to_string(),
            "image/jpeg" => return "jpg".to_string(),
            "image/png" => return "png".to_string(),
            "image/webp" => return "webp".to_string(),
            _ => {}
        }
        if let Some((_, ext)) = self.file_name.rsplit_once('.') {
            if !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()) {
                return ext.to_ascii_lowercase();
            }
        }
        mime_guess::get_mime_extensions_str(&self.content_type)
            .and_then(|exts| exts.first())
            .map(|ext| ext.to_string())
            .unwrap_or_else(|| "bin".to_string())
    }
}

fn normalize_content_type(raw: &str) -> String {
    let essence = raw.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
    match essence.as_str() {
        "image/jpg" | "image/pjpeg" => "image/jpeg".to_string(),
        _ => essence,
    }
}

/// Check a file against the size and type rules for its slot.
pub fn validate_document(kind: DocumentKind, file: &DocumentFile) -> Result<(), DocumentError> {
    if file.data.is_empty() {
        return Err(DocumentError::Empty { kind });
    }
    if file.size() > MAX_DOCUMENT_BYTES {
        return Err(DocumentError::FileTooLarge {
            kind,
            size: file.size(),
            max: MAX_DOCUMENT_BYTES,
        });
    }
    if !kind.accepts(&file.content_type) {
        return Err(DocumentError::UnsupportedType {
            kind,
            content_type: file.content_type.clone(),
            allowed: kind.allowed_description(),
        });
    }
    Ok(())
}

/// Decode a canvas export (`data:image/png;base64,...`) into a signature file.
pub fn decode_signature_data_url(data_url: &str) -> Result<DocumentFile, DocumentError> {
    let rest = data_url
        .strip_prefix("data:")
        .ok_or_else(|| DocumentError::InvalidSignature("expected a data URL".to_string()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| DocumentError::InvalidSignature("missing data".to_string()))?;
    let content_type = header
        .strip_suffix(";base64")
        .ok_or_else(|| DocumentError::InvalidSignature("expected base64 data".to_string()))?;

    let data = STANDARD
        .decode(payload.trim())
        .map_err(|e| DocumentError::InvalidSignature(e.to_string()))?;

    let file = DocumentFile::new("signature.png", Some(content_type), Bytes::from(data));
    validate_document(DocumentKind::Signature, &file)?;
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, content_type: &str, size: usize) -> DocumentFile {
        DocumentFile::new(name, Some(content_type), Bytes::from(vec![1u8; size]))
    }

    #[test]
    fn test_certificate_pdf_within_limit_is_accepted() {
        let cert = file("licence.pdf", "application/pdf", 1024);
        assert_eq!(validate_document(DocumentKind::Certificate, &cert), Ok(()));
    }

    #[test]
    fn test_six_megabyte_certificate_is_rejected() {
        let cert = file("licence.pdf", "application/pdf", 6 * 1024 * 1024);
        let err = validate_document(DocumentKind::Certificate, &cert).unwrap_err();
        assert!(matches!(err, DocumentError::FileTooLarge { size, .. } if size == 6 * 1024 * 1024));
    }

    #[test]
    fn test_exactly_five_megabytes_is_accepted() {
        let cert = file("licence.png", "image/png", MAX_DOCUMENT_BYTES);
        assert!(validate_document(DocumentKind::Certificate, &cert).is_ok());
    }

    #[test]
    fn test_certificate_rejects_word_documents() {
        let cert = file(
            "licence.docx",
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            10,
        );
        assert!(matches!(
            validate_document(DocumentKind::Certificate, &cert),
            Err(DocumentError::UnsupportedType { .. })
        ));
    }

    #[test]
    fn test_profile_picture_accepts_any_image_but_not_pdf() {
        let webp = file("me.webp", "image/webp", 10);
        assert!(validate_document(DocumentKind::ProfilePicture, &webp).is_ok());

        let pdf = file("me.pdf", "application/pdf", 10);
        assert!(validate_document(DocumentKind::ProfilePicture, &pdf).is_err());
    }

    #[test]
    fn test_empty_file_is_rejected() {
        let empty = file("me.png", "image/png", 0);
        assert_eq!(
            validate_document(DocumentKind::ProfilePicture, &empty),
            Err(DocumentError::Empty {
                kind: DocumentKind::ProfilePicture
            })
        );
    }

    #[test]
    fn test_content_type_guessed_from_name() {
        let guessed = DocumentFile::new("scan.PDF", None, Bytes::from_static(b"%PDF"));
        assert_eq!(guessed.content_type, "application/pdf");
        assert_eq!(guessed.extension(), "pdf");
    }

    #[test]
    fn test_content_type_aliases_are_normalized() {
        let jpg = DocumentFile::new("me", Some("image/jpg; charset=binary"), Bytes::from_static(b"x"));
        assert_eq!(jpg.content_type, "image/jpeg");
        assert_eq!(jpg.extension(), "jpg");
    }

    #[test]
    fn test_decode_signature_data_url() {
        let url = format!("data:image/png;base64,{}", STANDARD.encode(b"\x89PNG fake"));
        let sig = decode_signature_data_url(&url).unwrap();
        assert_eq!(sig.content_type, "image/png");
        assert_eq!(&sig.data[..], b"\x89PNG fake");
    }

    #[test]
    fn test_decode_signature_rejects_non_data_url() {
        assert!(matches!(
            decode_signature_data_url("https://example.com/sig.png"),
            Err(DocumentError::InvalidSignature(_))
        ));
        assert!(matches!(
            decode_signature_data_url("data:image/png;base64,%%%"),
            Err(DocumentError::InvalidSignature(_))
        ));
    }

    #[test]
    fn test_document_kind_parse() {
        assert_eq!(
            "certificate".parse::<DocumentKind>().unwrap(),
            DocumentKind::Certificate
        );
        assert!("passport".parse::<DocumentKind>().is_err());
    }
}

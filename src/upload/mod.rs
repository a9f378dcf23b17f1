//! Upload session: the documents a user has lined up for one analysis.
//!
//! Files are checked as they are attached (size and type), and the session
//! refuses to produce a submission until every required slot is filled.
//! Nothing here touches the network.

pub mod manifest;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use thiserror::Error;

use crate::config::schema::UploadConfig;

pub use manifest::{DocumentSlot, SlotSpec};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// A document that cannot be submitted, reported before any request is made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadError {
    #[error("file {name} is {size} bytes, over the {limit}-byte limit")]
    FileTooLarge { name: String, size: u64, limit: u64 },

    #[error("file {name} must be one of: {allowed}")]
    UnsupportedType { name: String, allowed: String },

    #[error("missing required documents: {}", labels(.0))]
    MissingDocuments(Vec<DocumentSlot>),

    #[error("cannot read {name}: {reason}")]
    Unreadable { name: String, reason: String },
}

fn labels(slots: &[DocumentSlot]) -> String {
    slots
        .iter()
        .map(|slot| slot.label())
        .collect::<Vec<_>>()
        .join(", ")
}

// ---------------------------------------------------------------------------
// Files and policy
// ---------------------------------------------------------------------------

/// A local file picked for a slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachedFile {
    pub path: PathBuf,
    pub name: String,
    pub size: u64,
}

impl AttachedFile {
    /// Describe a file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let metadata =
            fs::metadata(path).with_context(|| format!("cannot read {}", path.display()))?;
        if !metadata.is_file() {
            anyhow::bail!("{} is not a regular file", path.display());
        }
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .with_context(|| format!("{} has no usable file name", path.display()))?
            .to_string();
        Ok(Self {
            path: path.to_path_buf(),
            name,
            size: metadata.len(),
        })
    }

    /// Lowercase extension, empty when there is none.
    pub fn extension(&self) -> String {
        Path::new(&self.name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default()
    }
}

/// Size and type rules applied on attach.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPolicy {
    pub max_file_bytes: u64,
    pub allowed_extensions: Vec<String>,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self::from_config(&UploadConfig::default())
    }
}

impl UploadPolicy {
    pub fn from_config(config: &UploadConfig) -> Self {
        Self {
            max_file_bytes: config.max_file_bytes,
            allowed_extensions: config
                .allowed_extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
        }
    }

    pub fn check(&self, file: &AttachedFile) -> Result<(), UploadError> {
        if file.size > self.max_file_bytes {
            return Err(UploadError::FileTooLarge {
                name: file.name.clone(),
                size: file.size,
                limit: self.max_file_bytes,
            });
        }
        let ext = file.extension();
        if !self.allowed_extensions.iter().any(|allowed| *allowed == ext) {
            return Err(UploadError::UnsupportedType {
                name: file.name.clone(),
                allowed: self.allowed_extensions.join(", "),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

const PROGRESS_STEP: u8 = 10;

#[derive(Debug, Clone)]
struct SlotState {
    file: AttachedFile,
    /// Cosmetic 0–100 counter; no real transfer happens before submission.
    progress: u8,
}

/// Slot → file map for one submission.
#[derive(Debug, Clone, Default)]
pub struct UploadSession {
    policy: UploadPolicy,
    slots: BTreeMap<DocumentSlot, SlotState>,
}

/// Files ready to send, in manifest order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub documents: Vec<(DocumentSlot, AttachedFile)>,
}

impl Submission {
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

impl UploadSession {
    pub fn new(policy: UploadPolicy) -> Self {
        Self {
            policy,
            slots: BTreeMap::new(),
        }
    }

    /// Attach a file to a slot, replacing any previous one.
    ///
    /// A rejected file leaves the slot exactly as it was.
    pub fn attach(&mut self, slot: DocumentSlot, file: AttachedFile) -> Result<(), UploadError> {
        self.policy.check(&file)?;
        self.slots.insert(slot, SlotState { file, progress: 0 });
        Ok(())
    }

    pub fn detach(&mut self, slot: DocumentSlot) -> Option<AttachedFile> {
        self.slots.remove(&slot).map(|state| state.file)
    }

    pub fn file(&self, slot: DocumentSlot) -> Option<&AttachedFile> {
        self.slots.get(&slot).map(|state| &state.file)
    }

    pub fn progress(&self, slot: DocumentSlot) -> Option<u8> {
        self.slots.get(&slot).map(|state| state.progress)
    }

    /// Step every attached slot's progress counter toward 100.
    pub fn advance_progress(&mut self) {
        for state in self.slots.values_mut() {
            state.progress = state.progress.saturating_add(PROGRESS_STEP).min(100);
        }
    }

    pub fn attached_count(&self) -> usize {
        self.slots.len()
    }

    /// Required slots that have no file yet, in manifest order.
    pub fn missing_required(&self) -> Vec<DocumentSlot> {
        DocumentSlot::ALL
            .into_iter()
            .filter(|slot| slot.spec().required && !self.slots.contains_key(slot))
            .collect()
    }

    pub fn is_ready_to_submit(&self) -> bool {
        self.missing_required().is_empty()
    }

    /// The submission, or the list of required slots still empty.
    pub fn submit(&self) -> Result<Submission, UploadError> {
        let missing = self.missing_required();
        if !missing.is_empty() {
            return Err(UploadError::MissingDocuments(missing));
        }
        Ok(Submission {
            documents: self
                .slots
                .iter()
                .map(|(slot, state)| (*slot, state.file.clone()))
                .collect(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, size: u64) -> AttachedFile {
        AttachedFile {
            path: PathBuf::from(name),
            name: name.to_string(),
            size,
        }
    }

    fn full_session() -> UploadSession {
        let mut session = UploadSession::default();
        for slot in DocumentSlot::ALL {
            session
                .attach(slot, file(&format!("{}.pdf", slot.key()), 1024))
                .unwrap();
        }
        session
    }

    #[test]
    fn oversized_file_is_rejected_without_mutation() {
        let mut session = UploadSession::default();
        session.attach(DocumentSlot::Gst, file("gst.pdf", 10)).unwrap();

        let err = session
            .attach(DocumentSlot::Gst, file("big.pdf", 16 * 1024 * 1024 + 1))
            .unwrap_err();
        assert!(matches!(err, UploadError::FileTooLarge { .. }));
        assert_eq!(session.file(DocumentSlot::Gst).unwrap().name, "gst.pdf");
    }

    #[test]
    fn file_at_limit_is_accepted() {
        let mut session = UploadSession::default();
        assert!(
            session
                .attach(DocumentSlot::Gst, file("gst.pdf", 16 * 1024 * 1024))
                .is_ok()
        );
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let mut session = UploadSession::default();
        let err = session
            .attach(DocumentSlot::Gst, file("gst.txt", 10))
            .unwrap_err();
        assert!(matches!(err, UploadError::UnsupportedType { .. }));
        assert!(session.file(DocumentSlot::Gst).is_none());

        let err = session
            .attach(DocumentSlot::Pan, file("no_extension", 10))
            .unwrap_err();
        assert!(matches!(err, UploadError::UnsupportedType { .. }));
    }

    #[test]
    fn extension_check_is_case_insensitive() {
        let mut session = UploadSession::default();
        assert!(session.attach(DocumentSlot::Pan, file("PAN.JPEG", 10)).is_ok());
    }

    #[test]
    fn size_is_checked_before_type() {
        let mut session = UploadSession::default();
        let err = session
            .attach(DocumentSlot::Gst, file("huge.txt", u64::MAX))
            .unwrap_err();
        assert!(matches!(err, UploadError::FileTooLarge { .. }));
    }

    #[test]
    fn readiness_tracks_required_slots() {
        let mut session = UploadSession::default();
        for slot in DocumentSlot::ALL {
            assert!(!session.is_ready_to_submit());
            session
                .attach(slot, file(&format!("{}.png", slot.key()), 1))
                .unwrap();
        }
        assert!(session.is_ready_to_submit());

        session.detach(DocumentSlot::Udyam);
        assert!(!session.is_ready_to_submit());
        assert_eq!(session.missing_required(), vec![DocumentSlot::Udyam]);
    }

    #[test]
    fn submit_lists_missing_slots() {
        let mut session = UploadSession::default();
        session.attach(DocumentSlot::Pan, file("pan.pdf", 1)).unwrap();

        match session.submit() {
            Err(UploadError::MissingDocuments(missing)) => assert_eq!(
                missing,
                vec![
                    DocumentSlot::Gst,
                    DocumentSlot::Udyam,
                    DocumentSlot::Quotation,
                    DocumentSlot::Signature
                ]
            ),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn submit_returns_documents_in_manifest_order() {
        let submission = full_session().submit().unwrap();
        let slots: Vec<DocumentSlot> = submission.documents.iter().map(|(s, _)| *s).collect();
        assert_eq!(slots, DocumentSlot::ALL.to_vec());
    }

    #[test]
    fn progress_resets_on_attach_and_caps_at_100() {
        let mut session = full_session();
        assert_eq!(session.progress(DocumentSlot::Gst), Some(0));
        for _ in 0..15 {
            session.advance_progress();
        }
        assert_eq!(session.progress(DocumentSlot::Gst), Some(100));

        session.attach(DocumentSlot::Gst, file("gst2.pdf", 1)).unwrap();
        assert_eq!(session.progress(DocumentSlot::Gst), Some(0));
        assert_eq!(session.progress(DocumentSlot::Pan), Some(100));
    }

    #[test]
    fn missing_documents_message_names_labels() {
        let err = UploadError::MissingDocuments(vec![DocumentSlot::Gst, DocumentSlot::Pan]);
        assert_eq!(
            err.to_string(),
            "missing required documents: GST Certificate, PAN Card"
        );
    }

    #[test]
    fn attached_file_reads_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Quotation.PDF");
        fs::write(&path, b"%PDF-1.4").unwrap();

        let attached = AttachedFile::from_path(&path).unwrap();
        assert_eq!(attached.name, "Quotation.PDF");
        assert_eq!(attached.size, 8);
        assert_eq!(attached.extension(), "pdf");
        assert!(AttachedFile::from_path(dir.path()).is_err());
    }
}

//! The fixed set of documents a tender submission needs.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// One document slot in a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentSlot {
    Gst,
    Pan,
    Udyam,
    Quotation,
    Signature,
}

/// Static description of a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SlotSpec {
    pub label: &'static str,
    pub description: &'static str,
    pub required: bool,
    /// Example of what the service looks for in this document.
    pub expected_pattern: &'static str,
    pub help_text: &'static str,
}

impl DocumentSlot {
    /// All slots in manifest order.
    pub const ALL: [DocumentSlot; 5] = [
        Self::Gst,
        Self::Pan,
        Self::Udyam,
        Self::Quotation,
        Self::Signature,
    ];

    /// Short key, e.g. `"gst"`.
    pub fn key(self) -> &'static str {
        match self {
            Self::Gst => "gst",
            Self::Pan => "pan",
            Self::Udyam => "udyam",
            Self::Quotation => "quotation",
            Self::Signature => "signature",
        }
    }

    /// Multipart form field the service reads this slot from.
    pub fn form_field(self) -> &'static str {
        match self {
            Self::Gst => "gst_file",
            Self::Pan => "pan_file",
            Self::Udyam => "udyam_file",
            Self::Quotation => "quotation_file",
            Self::Signature => "signature_file",
        }
    }

    pub fn spec(self) -> SlotSpec {
        match self {
            Self::Gst => SlotSpec {
                label: "GST Certificate",
                description: "GSTIN verification document (PDF/Image)",
                required: true,
                expected_pattern: "27ABCDE1234F1Z5",
                help_text: "15-character GSTIN format with state code",
            },
            Self::Pan => SlotSpec {
                label: "PAN Card",
                description: "Permanent Account Number card (PDF/Image)",
                required: true,
                expected_pattern: "ABCDE1234F",
                help_text: "10-character PAN format",
            },
            Self::Udyam => SlotSpec {
                label: "Udyam Certificate",
                description: "MSME/Udyam registration certificate",
                required: true,
                expected_pattern: "UDYAM-MH-01-1234567",
                help_text: "UDYAM-State-District-Registration",
            },
            Self::Quotation => SlotSpec {
                label: "Quotation Document",
                description: "Commercial quotation with pricing",
                required: true,
                expected_pattern: "Include company name, date, price",
                help_text: "Must include company details and pricing",
            },
            Self::Signature => SlotSpec {
                label: "Signature Document",
                description: "Signed authorization document (PDF/Image)",
                required: true,
                expected_pattern: "Authorized signature",
                help_text: "Document with valid signature",
            },
        }
    }

    pub fn label(self) -> &'static str {
        self.spec().label
    }

    /// Guess the slot from a file name.
    ///
    /// The lowercase name is split on non-alphanumeric characters and a slot
    /// matches when its key is one of the words. Names that match no slot,
    /// or more than one, give `None`.
    pub fn infer_from_file_name(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        let words: Vec<&str> = lower
            .split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();
        let mut matches = Self::ALL
            .into_iter()
            .filter(|slot| words.contains(&slot.key()));
        match (matches.next(), matches.next()) {
            (Some(slot), None) => Some(slot),
            _ => None,
        }
    }
}

impl fmt::Display for DocumentSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for DocumentSlot {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        let key = lower.strip_suffix("_file").unwrap_or(&lower);
        Self::ALL
            .into_iter()
            .find(|slot| slot.key() == key)
            .ok_or_else(|| format!("unknown document slot '{s}'"))
    }
}

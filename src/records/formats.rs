//! Local format checks for extracted identifiers.
//!
//! The analysis service publishes the patterns it extracts with. Re-checking
//! the extracted values locally lets the client flag a value that came back
//! but does not look like the identifier it claims to be.

use std::sync::LazyLock;

use regex::Regex;

static GSTIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9]{2}[A-Z]{5}[0-9]{4}[A-Z][1-9A-Z]Z[0-9A-Z]$").expect("GSTIN regex must compile")
});

static PAN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{5}[0-9]{4}[A-Z]$").expect("PAN regex must compile"));

static UDYAM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^UDYAM-[A-Z]{2}-[0-9]{2}-[0-9]{6,7}$").expect("Udyam regex must compile")
});

static DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(0?[1-9]|[12][0-9]|3[01])[/\-](0?[1-9]|1[012])[/\-](19|20)\d{2}$")
        .expect("date regex must compile")
});

static PRICE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(INR|Rs\.?|₹)\s?([0-9]{1,3}(?:,[0-9]{2,3})+|[0-9]+)(?:\.[0-9]{2})?$")
        .expect("price regex must compile")
});

/// Identifier formats the client knows how to check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldFormat {
    Gstin,
    Pan,
    Udyam,
    QuotationDate,
    Price,
}

impl FieldFormat {
    /// Format for an extracted field name, if the field has one.
    pub fn for_field(field: &str) -> Option<Self> {
        match field {
            "gst_number" => Some(Self::Gstin),
            "pan_number" => Some(Self::Pan),
            "udyam_number" => Some(Self::Udyam),
            "quotation_date" => Some(Self::QuotationDate),
            "quotation_price" => Some(Self::Price),
            _ => None,
        }
    }

    /// Example of a well-formed value.
    pub fn example(self) -> &'static str {
        match self {
            Self::Gstin => "27ABCDE1234F1Z5",
            Self::Pan => "ABCDE1234F",
            Self::Udyam => "UDYAM-MH-01-1234567",
            Self::QuotationDate => "15/12/2023",
            Self::Price => "₹ 1,50,000.00",
        }
    }

    /// Whether the whole value, trimmed, has this format.
    pub fn matches(self, value: &str) -> bool {
        let re = match self {
            Self::Gstin => &*GSTIN_RE,
            Self::Pan => &*PAN_RE,
            Self::Udyam => &*UDYAM_RE,
            Self::QuotationDate => &*DATE_RE,
            Self::Price => &*PRICE_RE,
        };
        re.is_match(value.trim())
    }
}

/// Check an extracted field against its known format.
///
/// `None` when the field has no known format or the value is empty.
pub fn check_field(field: &str, value: &str) -> Option<bool> {
    if value.trim().is_empty() {
        return None;
    }
    FieldFormat::for_field(field).map(|format| format.matches(value))
}

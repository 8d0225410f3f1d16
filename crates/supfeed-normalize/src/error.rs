use std::collections::BTreeMap;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ViolationKind {
    LegacyAvailableTag,
    ForbiddenToken,
    MalformedStructure,
    MissingId,
    MissingPicture,
    VendorCodeMismatch,
    MissingKeywords,
    KeywordsWithoutSeparator,
    PriceOutOfBounds,
    DeniedParam,
    DuplicateId,
}

impl std::fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ViolationKind::LegacyAvailableTag => "legacy <available> tag",
            ViolationKind::ForbiddenToken => "forbidden token",
            ViolationKind::MalformedStructure => "malformed offer structure",
            ViolationKind::MissingId => "missing offer id",
            ViolationKind::MissingPicture => "missing picture",
            ViolationKind::VendorCodeMismatch => "vendorCode differs from id",
            ViolationKind::MissingKeywords => "missing keywords",
            ViolationKind::KeywordsWithoutSeparator => "keywords without separator",
            ViolationKind::PriceOutOfBounds => "price out of bounds",
            ViolationKind::DeniedParam => "denied param",
            ViolationKind::DuplicateId => "duplicate offer id",
        };
        f.write_str(label)
    }
}

/// One failed check. `subject` is the offer id, or a line reference for
/// checks that are not tied to an offer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub kind: ViolationKind,
    pub subject: String,
}

impl Violation {
    #[must_use]
    pub fn new(kind: ViolationKind, subject: impl Into<String>) -> Self {
        Self {
            kind,
            subject: subject.into(),
        }
    }
}

/// Every violation found in one feed, reported together.
#[derive(Debug, Error)]
#[error("feed validation failed: {summary}")]
pub struct ValidationError {
    violations: Vec<Violation>,
    summary: String,
}

impl ValidationError {
    /// Groups `violations` by kind; the message quotes at most `sample_size`
    /// subjects per kind.
    #[must_use]
    pub fn new(violations: Vec<Violation>, sample_size: usize) -> Self {
        let mut by_kind: BTreeMap<ViolationKind, Vec<&str>> = BTreeMap::new();
        for v in &violations {
            by_kind.entry(v.kind).or_default().push(&v.subject);
        }

        let summary = by_kind
            .iter()
            .map(|(kind, subjects)| {
                let mut sample = subjects
                    .iter()
                    .take(sample_size)
                    .copied()
                    .collect::<Vec<_>>()
                    .join(", ");
                if subjects.len() > sample_size {
                    sample.push_str(", ...");
                }
                format!("{kind} ({}): {sample}", subjects.len())
            })
            .collect::<Vec<_>>()
            .join("; ");

        Self {
            violations,
            summary,
        }
    }

    #[must_use]
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    #[must_use]
    pub fn count(&self, kind: ViolationKind) -> usize {
        self.violations.iter().filter(|v| v.kind == kind).count()
    }

    #[must_use]
    pub fn has(&self, kind: ViolationKind) -> bool {
        self.violations.iter().any(|v| v.kind == kind)
    }
}

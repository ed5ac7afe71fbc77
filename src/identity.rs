//! Item identity resolution
//!
//! Maps an item's self-referencing API URL onto the `(kind, id)` pair that
//! names its file in the local cache. Identity is derived from the URL, never
//! stored separately: the path segment selects the collection kind and the
//! trailing component is the numeric id.

use std::fmt;

/// Collection kind of a cached item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    /// An invoice from the `/invoices` collection
    Invoice,
    /// A credit note from the `/credit_notes` collection
    CreditNote,
}

impl ItemKind {
    /// Directory name under the cache root for this kind
    pub fn directory(&self) -> &'static str {
        match self {
            ItemKind::Invoice => "invoices",
            ItemKind::CreditNote => "credit_notes",
        }
    }

    /// Filename prefix for items of this kind
    pub fn file_prefix(&self) -> &'static str {
        match self {
            ItemKind::Invoice => "invoice",
            ItemKind::CreditNote => "credit_note",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_prefix())
    }
}

/// Resolved identity of a fetched item
///
/// `(kind, id)` is unique and immutable for the item's lifetime in this
/// system; the cache never rewrites a file once one exists for an identity.
///
/// # Examples
///
/// ```
/// use freeagent_cache::identity::{ItemIdentity, ItemKind};
///
/// let id = ItemIdentity::from_url("https://api.freeagent.com/v2/invoices/694948").unwrap();
/// assert_eq!(id.kind(), ItemKind::Invoice);
/// assert_eq!(id.id(), 694948);
/// assert_eq!(id.file_name(), "invoice_694948.json");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ItemIdentity {
    kind: ItemKind,
    id: u64,
}

impl ItemIdentity {
    /// Resolve an identity from an item's self-referencing URL
    ///
    /// The URL path must contain an `invoices` or `credit_notes` segment and
    /// end in a positive decimal integer.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::UnrecognisedKind`] when the path matches
    /// neither known collection, and [`IdentityError::InvalidId`] when the
    /// trailing component is not a positive integer. Callers treat both as
    /// per-item failures: the item is skipped, the page continues.
    pub fn from_url(url: &str) -> Result<Self, IdentityError> {
        let path = url.trim_end_matches('/');
        let segments: Vec<&str> = path.split('/').collect();

        let kind = if segments.contains(&"credit_notes") {
            ItemKind::CreditNote
        } else if segments.contains(&"invoices") {
            ItemKind::Invoice
        } else {
            return Err(IdentityError::UnrecognisedKind(url.to_string()));
        };

        let last = segments
            .last()
            .copied()
            .ok_or_else(|| IdentityError::InvalidId(url.to_string()))?;
        let id: u64 = last
            .parse()
            .map_err(|_| IdentityError::InvalidId(url.to_string()))?;
        if id == 0 {
            return Err(IdentityError::InvalidId(url.to_string()));
        }

        Ok(Self { kind, id })
    }

    /// Get the collection kind
    pub fn kind(&self) -> ItemKind {
        self.kind
    }

    /// Get the numeric id
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Canonical filename for this identity, e.g. `invoice_694948.json`
    pub fn file_name(&self) -> String {
        format!("{}_{}.json", self.kind.file_prefix(), self.id)
    }
}

impl fmt::Display for ItemIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.kind.file_prefix(), self.id)
    }
}

/// Errors that can occur while resolving an item identity
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// URL path matches neither known collection segment
    #[error("unrecognised item kind in URL: {0}")]
    UnrecognisedKind(String),

    /// Trailing path component is not a positive integer
    #[error("invalid item id in URL: {0}")]
    InvalidId(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_invoice() {
        let id = ItemIdentity::from_url("https://api.freeagent.com/v2/invoices/694948").unwrap();
        assert_eq!(id.kind(), ItemKind::Invoice);
        assert_eq!(id.id(), 694948);
        assert_eq!(id.file_name(), "invoice_694948.json");
    }

    #[test]
    fn test_resolve_credit_note() {
        let id =
            ItemIdentity::from_url("https://api.freeagent.com/v2/credit_notes/694947").unwrap();
        assert_eq!(id.kind(), ItemKind::CreditNote);
        assert_eq!(id.id(), 694947);
        assert_eq!(id.file_name(), "credit_note_694947.json");
    }

    #[test]
    fn test_trailing_slash_is_tolerated() {
        let id = ItemIdentity::from_url("https://api.freeagent.com/v2/invoices/42/").unwrap();
        assert_eq!(id.id(), 42);
    }

    #[test]
    fn test_unknown_collection_rejected() {
        let err = ItemIdentity::from_url("https://api.freeagent.com/v2/contacts/123").unwrap_err();
        assert!(matches!(err, IdentityError::UnrecognisedKind(_)));
    }

    #[test]
    fn test_non_numeric_id_rejected() {
        let err = ItemIdentity::from_url("https://api.freeagent.com/v2/invoices/abc").unwrap_err();
        assert!(matches!(err, IdentityError::InvalidId(_)));
    }

    #[test]
    fn test_zero_id_rejected() {
        let err = ItemIdentity::from_url("https://api.freeagent.com/v2/invoices/0").unwrap_err();
        assert!(matches!(err, IdentityError::InvalidId(_)));
    }
}

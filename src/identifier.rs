// Identifier Codec
// Converts legacy identifiers (auto-increment integers, opaque UIDs) into
// generic resource names and back. Pure functions: malformed input is an
// error value, never a panic.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Namespace used for organisation 1
pub const DEFAULT_NAMESPACE: &str = "default";
const ORG_NAMESPACE_PREFIX: &str = "org-";

/// Legacy record kinds served by this crate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordKind {
    Annotation,
    Correlation,
}

impl RecordKind {
    /// Name prefix for integer-keyed kinds. UID-keyed kinds have none.
    pub const fn name_prefix(self) -> Option<&'static str> {
        match self {
            RecordKind::Annotation => Some("a-"),
            RecordKind::Correlation => None,
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKind::Annotation => write!(f, "annotation"),
            RecordKind::Correlation => write!(f, "correlation"),
        }
    }
}

/// Identifier as the legacy API exposes it
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LegacyId {
    Numeric(i64),
    Uid(String),
}

impl LegacyId {
    pub fn numeric(&self) -> Option<i64> {
        match self {
            LegacyId::Numeric(id) => Some(*id),
            LegacyId::Uid(_) => None,
        }
    }

    pub fn uid(&self) -> Option<&str> {
        match self {
            LegacyId::Uid(uid) => Some(uid),
            LegacyId::Numeric(_) => None,
        }
    }
}

impl fmt::Display for LegacyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LegacyId::Numeric(id) => write!(f, "{id}"),
            LegacyId::Uid(uid) => write!(f, "{uid}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MalformedName {
    #[error("{kind} name {name:?} does not start with {prefix:?}")]
    MissingPrefix {
        kind: RecordKind,
        name: String,
        prefix: &'static str,
    },

    #[error("{kind} name {name:?} does not end in a non-negative decimal id")]
    InvalidNumber { kind: RecordKind, name: String },

    #[error("{kind} name cannot be empty")]
    Empty { kind: RecordKind },

    #[error("identifier {id} does not fit the {kind} naming scheme")]
    WrongIdKind { kind: RecordKind, id: String },

    #[error("namespace {0:?} does not map to an organisation")]
    Namespace(String),
}

/// Encode a legacy identifier into a resource name
pub fn encode(kind: RecordKind, id: &LegacyId) -> Result<String, MalformedName> {
    match (kind.name_prefix(), id) {
        (Some(prefix), LegacyId::Numeric(raw)) if *raw >= 0 => Ok(format!("{prefix}{raw}")),
        (None, LegacyId::Uid(uid)) if !uid.is_empty() => Ok(uid.clone()),
        (None, LegacyId::Uid(_)) => Err(MalformedName::Empty { kind }),
        _ => Err(MalformedName::WrongIdKind {
            kind,
            id: id.to_string(),
        }),
    }
}

/// Decode a resource name back into the legacy identifier
pub fn decode(kind: RecordKind, name: &str) -> Result<LegacyId, MalformedName> {
    let Some(prefix) = kind.name_prefix() else {
        if name.is_empty() {
            return Err(MalformedName::Empty { kind });
        }
        return Ok(LegacyId::Uid(name.to_string()));
    };

    let digits = name
        .strip_prefix(prefix)
        .ok_or_else(|| MalformedName::MissingPrefix {
            kind,
            name: name.to_string(),
            prefix,
        })?;

    // i64::from_str accepts a leading '+'; the name scheme does not
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(MalformedName::InvalidNumber {
            kind,
            name: name.to_string(),
        });
    }

    digits
        .parse::<i64>()
        .map(LegacyId::Numeric)
        .map_err(|_| MalformedName::InvalidNumber {
            kind,
            name: name.to_string(),
        })
}

/// Resource name for an annotation id
pub fn annotation_name(id: i64) -> Result<String, MalformedName> {
    encode(RecordKind::Annotation, &LegacyId::Numeric(id))
}

/// Annotation id carried by a resource name
pub fn annotation_id(name: &str) -> Result<i64, MalformedName> {
    match decode(RecordKind::Annotation, name)? {
        LegacyId::Numeric(id) => Ok(id),
        LegacyId::Uid(uid) => Err(MalformedName::WrongIdKind {
            kind: RecordKind::Annotation,
            id: uid,
        }),
    }
}

/// Namespace holding an organisation's resources
pub fn namespace_for_org(org_id: i64) -> String {
    if org_id == 1 {
        DEFAULT_NAMESPACE.to_string()
    } else {
        format!("{ORG_NAMESPACE_PREFIX}{org_id}")
    }
}

/// Organisation owning a namespace
pub fn org_for_namespace(namespace: &str) -> Result<i64, MalformedName> {
    if namespace == DEFAULT_NAMESPACE {
        return Ok(1);
    }
    namespace
        .strip_prefix(ORG_NAMESPACE_PREFIX)
        .filter(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|digits| digits.parse::<i64>().ok())
        .filter(|org| *org >= 1)
        .ok_or_else(|| MalformedName::Namespace(namespace.to_string()))
}

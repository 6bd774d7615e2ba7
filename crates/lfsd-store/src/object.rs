// SPDX-License-Identifier: AGPL-3.0
// Copyright (C) 2026 LFSD Contributors

//! On-disk object format
//!
//! Every object file starts with a fixed-width header line
//!
//! ```text
//! S <sourceOid>\n
//! ```
//!
//! followed by the payload. A zero `sourceOid` marks a whole object whose
//! payload is the real content. Any other `sourceOid` names the object the
//! payload is a delta against.

use crate::error::{StoreError, StoreResult};
use crate::oid::{Oid, OID_HEX_LEN};

/// Length of the `S <64 hex>\n` header in bytes
pub const HEADER_LEN: usize = 2 + OID_HEX_LEN + 1;

/// How an object's payload relates to its real content
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectEncoding {
    /// The payload is the content itself
    Whole(Vec<u8>),

    /// The payload is a delta producing this object's content from `base`
    DeltaAgainst {
        /// Object the delta is applied to
        base: Oid,
        /// Codec output
        delta: Vec<u8>,
    },
}

/// One stored version of a tracked file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentObject {
    /// Digest of the real content
    pub oid: Oid,
    /// Payload and its relation to other objects
    pub encoding: ObjectEncoding,
}

impl ContentObject {
    /// A whole object holding `content`
    pub fn whole(oid: Oid, content: Vec<u8>) -> Self {
        Self {
            oid,
            encoding: ObjectEncoding::Whole(content),
        }
    }

    /// An object stored as a delta against `base`
    pub fn delta(oid: Oid, base: Oid, delta: Vec<u8>) -> Self {
        Self {
            oid,
            encoding: ObjectEncoding::DeltaAgainst { base, delta },
        }
    }

    /// The header's `sourceOid`: zero for whole objects
    pub fn source_oid(&self) -> Oid {
        match &self.encoding {
            ObjectEncoding::Whole(_) => Oid::ZERO,
            ObjectEncoding::DeltaAgainst { base, .. } => *base,
        }
    }

    /// Bytes following the header
    pub fn payload(&self) -> &[u8] {
        match &self.encoding {
            ObjectEncoding::Whole(content) => content,
            ObjectEncoding::DeltaAgainst { delta, .. } => delta,
        }
    }

    /// Whether the payload is the real content
    pub fn is_whole(&self) -> bool {
        matches!(self.encoding, ObjectEncoding::Whole(_))
    }

    /// Serialize to the on-disk format
    pub fn to_bytes(&self) -> Vec<u8> {
        let payload = self.payload();
        let mut bytes = Vec::with_capacity(HEADER_LEN + payload.len());
        bytes.extend_from_slice(b"S ");
        bytes.extend_from_slice(self.source_oid().to_hex().as_bytes());
        bytes.push(b'\n');
        bytes.extend_from_slice(payload);
        bytes
    }

    /// Parse raw file bytes stored under `oid`
    ///
    /// Fails with [`StoreError::BadObjectHeader`] if the file is shorter than
    /// the header, does not start with `S `, carries anything other than 64
    /// lowercase hex digits, or lacks the terminating newline.
    pub fn parse(oid: Oid, bytes: &[u8]) -> StoreResult<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(StoreError::bad_header(
                oid,
                format!("file is {} bytes, header needs {}", bytes.len(), HEADER_LEN),
            ));
        }
        if &bytes[..2] != b"S " {
            return Err(StoreError::bad_header(oid, "missing 'S ' prefix"));
        }
        if bytes[HEADER_LEN - 1] != b'\n' {
            return Err(StoreError::bad_header(oid, "header is not newline-terminated"));
        }

        let hex = std::str::from_utf8(&bytes[2..HEADER_LEN - 1])
            .map_err(|_| StoreError::bad_header(oid, "source oid is not ASCII"))?;
        let source = Oid::from_hex(hex)
            .map_err(|_| StoreError::bad_header(oid, format!("invalid source oid '{}'", hex)))?;

        let payload = bytes[HEADER_LEN..].to_vec();
        Ok(if source.is_zero() {
            Self::whole(oid, payload)
        } else {
            Self::delta(oid, source, payload)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whole_object_layout() {
        let oid = Oid::hash(b"hello");
        let bytes = ContentObject::whole(oid, b"hello".to_vec()).to_bytes();

        assert_eq!(bytes.len(), HEADER_LEN + 5);
        assert!(bytes.starts_with(b"S 0000"));
        assert_eq!(bytes[HEADER_LEN - 1], b'\n');
        assert_eq!(&bytes[HEADER_LEN..], b"hello");
    }

    #[test]
    fn test_parse_delta_object() {
        let oid = Oid::hash(b"old");
        let base = Oid::hash(b"new");
        let bytes = ContentObject::delta(oid, base, vec![1, 2, 3]).to_bytes();

        let parsed = ContentObject::parse(oid, &bytes).unwrap();
        assert_eq!(parsed.source_oid(), base);
        assert_eq!(parsed.payload(), &[1, 2, 3]);
        assert!(!parsed.is_whole());
    }

    #[test]
    fn test_empty_payload_is_allowed() {
        let oid = Oid::hash(b"");
        let bytes = ContentObject::whole(oid, Vec::new()).to_bytes();
        let parsed = ContentObject::parse(oid, &bytes).unwrap();
        assert!(parsed.is_whole());
        assert!(parsed.payload().is_empty());
    }

    #[test]
    fn test_rejects_short_file() {
        let oid = Oid::hash(b"x");
        let err = ContentObject::parse(oid, b"S 1234").unwrap_err();
        assert!(matches!(err, StoreError::BadObjectHeader { .. }));
    }

    #[test]
    fn test_rejects_wrong_prefix() {
        let oid = Oid::hash(b"x");
        let mut bytes = ContentObject::whole(oid, b"x".to_vec()).to_bytes();
        bytes[0] = b'D';
        assert!(ContentObject::parse(oid, &bytes).is_err());
    }

    #[test]
    fn test_rejects_uppercase_source() {
        let oid = Oid::hash(b"x");
        let mut bytes = ContentObject::delta(oid, Oid::hash(b"y"), vec![0]).to_bytes();
        for b in &mut bytes[2..HEADER_LEN - 1] {
            b.make_ascii_uppercase();
        }
        let has_letters = bytes[2..HEADER_LEN - 1].iter().any(|b| b.is_ascii_uppercase());
        if has_letters {
            assert!(ContentObject::parse(oid, &bytes).is_err());
        }
    }

    #[test]
    fn test_rejects_missing_newline() {
        let oid = Oid::hash(b"x");
        let mut bytes = ContentObject::whole(oid, b"x".to_vec()).to_bytes();
        bytes[HEADER_LEN - 1] = b' ';
        assert!(ContentObject::parse(oid, &bytes).is_err());
    }
}

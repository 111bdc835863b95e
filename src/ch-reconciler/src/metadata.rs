// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Auxiliary object metadata stored inside the native comment field.
//!
//! ClickHouse has no column for the cluster an object was created on, so the
//! cluster travels next to the user's comment as a small JSON document:
//!
//! ```text
//! {"comment":"orders","cluster":"main"}
//! ```
//!
//! The document is interpolated into a single-quoted `COMMENT '...'` literal,
//! so single quotes are escaped on the way in and unescaped on the way out.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// The logical payload persisted in an object's comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentPayload {
    pub comment: String,
    pub cluster: String,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MetadataError {
    #[error("malformed metadata in comment {raw:?}: {reason}")]
    Malformed { raw: String, reason: String },
}

/// Serializes `comment` and `cluster` into a payload that can be placed
/// verbatim between the quotes of a `COMMENT '...'` clause.
pub fn encode(comment: &str, cluster: &str) -> String {
    let payload = CommentPayload {
        comment: comment.to_string(),
        cluster: cluster.to_string(),
    };
    // Serializing two string fields cannot fail.
    let json = serde_json::to_string(&payload).unwrap_or_default();
    json.replace('\'', "\\'")
}

/// Parses a payload produced by [`encode`].
///
/// Fails if the unescaped text is not JSON or lacks either field.
pub fn decode(raw: &str) -> Result<CommentPayload, MetadataError> {
    let unescaped = raw.replace("\\'", "'");
    serde_json::from_str(&unescaped).map_err(|e| MetadataError::Malformed {
        raw: raw.to_string(),
        reason: e.to_string(),
    })
}

/// Decodes `raw`, falling back to treating the whole string as a free-form
/// comment placed on `default_cluster`.
///
/// Objects created outside this crate, or before the payload existed, carry
/// plain comments. The decode failure is logged and handed back so the caller
/// can surface it as a warning.
pub fn decode_or_fallback(
    raw: &str,
    default_cluster: &str,
) -> (CommentPayload, Option<MetadataError>) {
    match decode(raw) {
        Ok(payload) => (payload, None),
        Err(err) => {
            warn!(comment = raw, default_cluster, "falling back to raw comment: {err}");
            let payload = CommentPayload {
                comment: raw.to_string(),
                cluster: default_cluster.to_string(),
            };
            (payload, Some(err))
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn encodes_fields_in_order() {
        assert_eq!(encode("orders", ""), r#"{"comment":"orders","cluster":""}"#);
        assert_eq!(
            encode("it's here", "main"),
            r#"{"comment":"it\'s here","cluster":"main"}"#
        );
    }

    #[test]
    fn decodes_escaped_quotes() {
        let payload = decode(r#"{"comment":"it\'s here","cluster":"main"}"#).unwrap();
        assert_eq!(payload.comment, "it's here");
        assert_eq!(payload.cluster, "main");
    }

    #[test]
    fn missing_field_is_malformed() {
        let err = decode(r#"{"comment":"only comment"}"#).unwrap_err();
        assert!(matches!(err, MetadataError::Malformed { .. }));
    }

    #[test]
    fn plain_comment_falls_back_to_default_cluster() {
        let (payload, err) = decode_or_fallback("legacy comment", "main");
        assert_eq!(payload.comment, "legacy comment");
        assert_eq!(payload.cluster, "main");
        assert!(err.is_some());

        let (payload, err) = decode_or_fallback(&encode("new", "other"), "main");
        assert_eq!(payload.cluster, "other");
        assert!(err.is_none());
    }

    proptest! {
        #[test]
        fn decode_inverts_encode(comment in ".*", cluster in "[a-z_']{0,12}") {
            let payload = decode(&encode(&comment, &cluster)).unwrap();
            prop_assert_eq!(payload.comment, comment);
            prop_assert_eq!(payload.cluster, cluster);
        }
    }
}

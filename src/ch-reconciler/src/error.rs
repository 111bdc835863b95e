// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Error types for reconciliation calls.
//!
//! # Error Hierarchy
//!
//! ```text
//! ReconcileError
//!   ├── Validation(ValidationError)  - rejected before any statement ran
//!   ├── NotFound                     - object absent from the catalog
//!   ├── HasDependents                - database still holds tables
//!   ├── Execution(ConnectionError)   - a statement failed
//!   ├── Catalog(ConnectionError)     - a catalog read failed
//!   └── RollbackFailed               - role creation failed and so did its cleanup
//! ```
//!
//! Metadata decode failures are not errors; they are reported as
//! [`Warning`]s next to the read result.

use std::fmt;

use thiserror::Error;

use crate::client::ConnectionError;
use crate::metadata::MetadataError;
use crate::models::ObjectKind;
use crate::validate::ValidationError;

/// The operation a reconciliation call was attempting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Update,
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
        })
    }
}

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("invalid {kind} '{name}': {source}")]
    Validation {
        kind: ObjectKind,
        name: String,
        #[source]
        source: ValidationError,
    },
    #[error(
        "{kind} '{name}' not found. If the server is part of a cluster, the object may only be \
         visible on other nodes; try configuring a default cluster"
    )]
    NotFound { kind: ObjectKind, name: String },
    #[error(
        "cannot delete database '{database}': it still contains tables {list}",
        list = .names.join(", ")
    )]
    HasDependents {
        database: String,
        names: Vec<String>,
    },
    #[error("failed to {operation} {kind} '{name}': {source}")]
    Execution {
        kind: ObjectKind,
        name: String,
        operation: Operation,
        #[source]
        source: ConnectionError,
    },
    #[error("failed to read {kind} '{name}' from the catalog: {source}")]
    Catalog {
        kind: ObjectKind,
        name: String,
        #[source]
        source: ConnectionError,
    },
    #[error(
        "failed to {operation} {kind} '{name}': {source}; cleaning up with DROP ROLE also failed: {rollback}"
    )]
    RollbackFailed {
        kind: ObjectKind,
        name: String,
        operation: Operation,
        #[source]
        source: ConnectionError,
        rollback: ConnectionError,
    },
}

impl ReconcileError {
    pub(crate) fn validation(kind: ObjectKind, name: &str, source: ValidationError) -> Self {
        ReconcileError::Validation {
            kind,
            name: name.to_string(),
            source,
        }
    }

    pub(crate) fn not_found(kind: ObjectKind, name: &str) -> Self {
        ReconcileError::NotFound {
            kind,
            name: name.to_string(),
        }
    }

    pub(crate) fn execution(
        kind: ObjectKind,
        name: &str,
        operation: Operation,
        source: ConnectionError,
    ) -> Self {
        ReconcileError::Execution {
            kind,
            name: name.to_string(),
            operation,
            source,
        }
    }

    pub(crate) fn catalog(kind: ObjectKind, name: &str, source: ConnectionError) -> Self {
        ReconcileError::Catalog {
            kind,
            name: name.to_string(),
            source,
        }
    }

    /// Whether retrying the same call could succeed. Validation failures,
    /// missing objects and blocked deletes are terminal for the call.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ReconcileError::Execution { .. }
                | ReconcileError::Catalog { .. }
                | ReconcileError::RollbackFailed { .. }
        )
    }
}

/// A non-fatal diagnostic attached to a read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub kind: ObjectKind,
    pub name: String,
    pub summary: String,
    pub detail: String,
}

impl Warning {
    pub(crate) fn malformed_metadata(kind: ObjectKind, name: &str, err: &MetadataError) -> Self {
        Warning {
            kind,
            name: name.to_string(),
            summary: format!("unable to decode metadata for {kind} '{name}'"),
            detail: format!("{err}; the raw comment is kept and the default cluster is used instead"),
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.summary, self.detail)
    }
}

// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Desired and observed shapes of the managed objects.
//!
//! `Desired*` values are built by the caller for one reconciliation call.
//! `Observed*` values are built from catalog rows by
//! [`crate::client::introspection`] and discarded after the diff.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::list::UniqueList;

/// Database name that scopes a role to every database (`*.*`).
pub const ALL_DATABASES: &str = "*";

/// The kind of object an operation targets, used in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Database,
    Table,
    Role,
    User,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ObjectKind::Database => "database",
            ObjectKind::Table => "table",
            ObjectKind::Role => "role",
            ObjectKind::User => "user",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DesiredDatabase {
    pub name: String,
    #[serde(default)]
    pub cluster: Option<String>,
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: String,
}

impl Column {
    pub fn new(name: impl Into<String>, column_type: impl Into<String>) -> Self {
        Column {
            name: name.into(),
            column_type: column_type.into(),
        }
    }
}

/// One `PARTITION BY` item: a column, optionally wrapped in a transform.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PartitionClause {
    pub by: String,
    #[serde(default)]
    pub function: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DesiredTable {
    pub database: String,
    pub name: String,
    #[serde(default)]
    pub cluster: Option<String>,
    pub engine: String,
    #[serde(default)]
    pub engine_params: Vec<String>,
    #[serde(default)]
    pub columns: Vec<Column>,
    #[serde(default)]
    pub order_by: Vec<String>,
    #[serde(default)]
    pub partition_by: Vec<PartitionClause>,
    #[serde(default)]
    pub comment: String,
}

impl DesiredTable {
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    /// The `database.name` pair this table is addressed by.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.database, self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DesiredRole {
    pub name: String,
    pub database: String,
    #[serde(default)]
    pub privileges: UniqueList<String>,
}

/// A user password. Never printed, logged or serialized back out.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Password(String);

impl Password {
    pub fn new(password: impl Into<String>) -> Self {
        Password(password.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(<redacted>)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DesiredUser {
    pub name: String,
    pub password: Password,
    #[serde(default)]
    pub roles: UniqueList<String>,
}

/// A `(role, access type, database)` triple as stored in `system.grants`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Grant {
    pub role_name: String,
    pub access_type: String,
    pub database: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedDatabase {
    pub name: String,
    pub engine: String,
    pub data_path: String,
    pub metadata_path: String,
    pub uuid: String,
    pub comment: String,
    pub cluster: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedTable {
    pub database: String,
    pub name: String,
    pub engine: String,
    pub engine_full: String,
    pub engine_params: Vec<String>,
    pub columns: Vec<Column>,
    pub comment: String,
    pub cluster: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedRole {
    pub name: String,
    pub grants: Vec<Grant>,
}

impl ObservedRole {
    /// Access types granted to the role, in catalog order.
    pub fn privileges(&self) -> UniqueList<String> {
        self.grants.iter().map(|g| g.access_type.clone()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedUser {
    pub name: String,
    pub default_roles: Vec<String>,
}

impl ObservedUser {
    pub fn roles(&self) -> UniqueList<String> {
        self.default_roles.iter().cloned().collect()
    }
}

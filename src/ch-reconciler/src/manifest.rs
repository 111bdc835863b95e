// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Desired state documents.
//!
//! A manifest is a TOML file declaring the objects to create:
//!
//! ```toml
//! [[databases]]
//! name = "shop"
//!
//! [[tables]]
//! database = "shop"
//! name = "orders"
//! engine = "MergeTree"
//! columns = [{ name = "id", type = "Int64" }]
//! order_by = ["id"]
//!
//! [[roles]]
//! name = "reader"
//! database = "shop"
//! privileges = ["SELECT"]
//!
//! [[users]]
//! name = "alice"
//! password = "hunter2"
//! roles = ["reader"]
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::cluster;
use crate::config::{ConfigError, ReconcilerConfig, read_file};
use crate::error::ReconcileError;
use crate::models::{DesiredDatabase, DesiredRole, DesiredTable, DesiredUser, ObjectKind};
use crate::reconcile::role_grants;
use crate::sql::{self, Statement};
use crate::validate;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct Manifest {
    pub databases: Vec<DesiredDatabase>,
    pub tables: Vec<DesiredTable>,
    pub roles: Vec<DesiredRole>,
    pub users: Vec<DesiredUser>,
}

impl Manifest {
    pub fn from_toml_str(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = read_file(path)?;
        Self::from_toml_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    fn validate(&self) -> Result<(), ReconcileError> {
        for database in &self.databases {
            validate::validate_database(database).map_err(|err| {
                ReconcileError::validation(ObjectKind::Database, &database.name, err)
            })?;
        }
        for table in &self.tables {
            validate::validate_table(table).map_err(|err| {
                ReconcileError::validation(ObjectKind::Table, &table.qualified_name(), err)
            })?;
        }
        for role in &self.roles {
            validate::validate_role(role)
                .map_err(|err| ReconcileError::validation(ObjectKind::Role, &role.name, err))?;
        }
        for user in &self.users {
            validate::validate_user(user)
                .map_err(|err| ReconcileError::validation(ObjectKind::User, &user.name, err))?;
        }
        Ok(())
    }
}

/// Renders the statements that create every object in `manifest` on an
/// empty server.
///
/// Nothing is rendered unless every object validates. Statements come out
/// databases first, then tables, roles and users, each group in manifest
/// order.
pub fn plan_manifest(
    manifest: &Manifest,
    config: &ReconcilerConfig,
) -> Result<Vec<Statement>, ReconcileError> {
    manifest.validate()?;

    let placement = |explicit: &Option<String>| {
        cluster::resolve(
            explicit.as_deref().unwrap_or_default(),
            &config.default_cluster,
        )
    };

    let mut statements = Vec::new();
    for database in &manifest.databases {
        statements.push(sql::create_database(database, &placement(&database.cluster)));
    }
    for table in &manifest.tables {
        statements.push(sql::create_table(table, &placement(&table.cluster)));
    }
    for role in &manifest.roles {
        statements.push(sql::create_role(&role.name));
        statements.extend(role_grants(role));
    }
    for user in &manifest.users {
        statements.push(sql::create_user(
            &user.name,
            &user.password,
            user.roles.as_slice(),
        ));
    }
    Ok(statements)
}

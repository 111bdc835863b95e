// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Allow-lists and referential checks applied before any statement is built.
//!
//! Every function here is pure. The reconcilers call the object level
//! validators ([`validate_database`], [`validate_table`], [`validate_role`],
//! [`validate_user`]) first and issue nothing when they fail.

use itertools::Itertools;
use thiserror::Error;

use crate::models::{ALL_DATABASES, DesiredDatabase, DesiredRole, DesiredTable, DesiredUser};

pub const SUPPORTED_COLUMN_TYPES: &[&str] = &[
    "UInt8",
    "UInt16",
    "UInt32",
    "UInt64",
    "UInt128",
    "UInt256",
    "Int8",
    "Int16",
    "Int32",
    "Int64",
    "Int128",
    "Int256",
    "Float32",
    "Float64",
    "Bool",
    "String",
    "UUID",
    "Date",
    "Date32",
    "DateTime",
    "DateTime64",
    "LowCardinality",
    "JSON",
];

pub const SUPPORTED_ENGINES: &[&str] = &[
    "ReplicatedMergeTree",
    "ReplicatedReplacingMergeTree",
    "Distributed",
    "MergeTree",
    "ReplacingMergeTree",
];

pub const SUPPORTED_PARTITION_FUNCTIONS: &[&str] = &["toYYYYMM", "toYYYYMMDD", "toYYYYMMDDhhmmss"];

/// Privileges grantable on a single database.
pub const DATABASE_PRIVILEGES: &[&str] = &[
    "SELECT",
    "INSERT",
    "ALTER",
    "CREATE DATABASE",
    "CREATE TABLE",
    "CREATE VIEW",
    "CREATE DICTIONARY",
    "DROP DATABASE",
    "DROP TABLE",
    "DROP DICTIONARY",
    "DROP VIEW",
    "SHOW TABLES",
    "dictGet",
];

/// Privileges only grantable on `*.*`.
pub const GLOBAL_PRIVILEGES: &[&str] = &["REMOTE", "SYSTEM RELOAD DICTIONARY"];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("name must not be empty")]
    EmptyName,
    #[error(
        "unsupported column type '{0}', expected one of: {list}",
        list = SUPPORTED_COLUMN_TYPES.join(", ")
    )]
    UnsupportedType(String),
    #[error(
        "unsupported table engine '{0}', expected one of: {list}",
        list = SUPPORTED_ENGINES.join(", ")
    )]
    UnsupportedEngine(String),
    #[error(
        "unsupported partition function '{0}', expected none or one of: {list}",
        list = SUPPORTED_PARTITION_FUNCTIONS.join(", ")
    )]
    UnsupportedPartitionFunction(String),
    #[error("'{0}' is not a declared column")]
    UnknownColumn(String),
    #[error(
        "'{0}' is not an allowed privilege, expected one of: {list}",
        list = allowed_privileges().join(", ")
    )]
    UnknownPrivilege(String),
    #[error("global privilege '{privilege}' can only be granted on '*', not on '{database}'")]
    GlobalPrivilegeScopeViolation { privilege: String, database: String },
    #[error("role grants span more than one database: {list}", list = .0.join(", "))]
    MixedDatabaseScope(Vec<String>),
}

fn allowed_privileges() -> Vec<&'static str> {
    DATABASE_PRIVILEGES
        .iter()
        .chain(GLOBAL_PRIVILEGES)
        .copied()
        .collect()
}

pub fn is_global_privilege(privilege: &str) -> bool {
    GLOBAL_PRIVILEGES.contains(&privilege)
}

pub fn validate_column_type(column_type: &str) -> Result<(), ValidationError> {
    if SUPPORTED_COLUMN_TYPES.contains(&column_type) {
        Ok(())
    } else {
        Err(ValidationError::UnsupportedType(column_type.to_string()))
    }
}

pub fn validate_engine(engine: &str) -> Result<(), ValidationError> {
    if SUPPORTED_ENGINES.contains(&engine) {
        Ok(())
    } else {
        Err(ValidationError::UnsupportedEngine(engine.to_string()))
    }
}

/// An absent or empty function is allowed and means "partition by the raw
/// column".
pub fn validate_partition_function(function: Option<&str>) -> Result<(), ValidationError> {
    match function {
        None | Some("") => Ok(()),
        Some(f) if SUPPORTED_PARTITION_FUNCTIONS.contains(&f) => Ok(()),
        Some(f) => Err(ValidationError::UnsupportedPartitionFunction(f.to_string())),
    }
}

/// Checks that every `ORDER BY` and `PARTITION BY` reference names a
/// declared column.
pub fn validate_column_references(table: &DesiredTable) -> Result<(), ValidationError> {
    let references = table
        .order_by
        .iter()
        .chain(table.partition_by.iter().map(|p| &p.by));
    for name in references {
        if !table.has_column(name) {
            return Err(ValidationError::UnknownColumn(name.clone()));
        }
    }
    Ok(())
}

pub fn validate_privilege_set<'a, I>(database: &str, privileges: I) -> Result<(), ValidationError>
where
    I: IntoIterator<Item = &'a String>,
{
    for privilege in privileges {
        if !DATABASE_PRIVILEGES.contains(&privilege.as_str()) && !is_global_privilege(privilege) {
            return Err(ValidationError::UnknownPrivilege(privilege.clone()));
        }
        if is_global_privilege(privilege) && database != ALL_DATABASES {
            return Err(ValidationError::GlobalPrivilegeScopeViolation {
                privilege: privilege.clone(),
                database: database.to_string(),
            });
        }
    }
    Ok(())
}

/// Checks that a set of observed grants is scoped to at most one database.
pub fn validate_single_scope<'a, I>(databases: I) -> Result<(), ValidationError>
where
    I: IntoIterator<Item = &'a String>,
{
    let databases: Vec<String> = databases.into_iter().unique().cloned().collect();
    if databases.len() > 1 {
        Err(ValidationError::MixedDatabaseScope(databases))
    } else {
        Ok(())
    }
}

fn validate_name(name: &str) -> Result<(), ValidationError> {
    if name.is_empty() {
        Err(ValidationError::EmptyName)
    } else {
        Ok(())
    }
}

pub fn validate_database(database: &DesiredDatabase) -> Result<(), ValidationError> {
    validate_name(&database.name)
}

pub fn validate_table(table: &DesiredTable) -> Result<(), ValidationError> {
    validate_name(&table.database)?;
    validate_name(&table.name)?;
    validate_engine(&table.engine)?;
    for column in &table.columns {
        validate_name(&column.name)?;
        validate_column_type(&column.column_type)?;
    }
    for clause in &table.partition_by {
        validate_partition_function(clause.function.as_deref())?;
    }
    validate_column_references(table)
}

pub fn validate_role(role: &DesiredRole) -> Result<(), ValidationError> {
    validate_name(&role.name)?;
    validate_name(&role.database)?;
    validate_privilege_set(&role.database, &role.privileges)
}

pub fn validate_user(user: &DesiredUser) -> Result<(), ValidationError> {
    validate_name(&user.name)?;
    for role in &user.roles {
        validate_name(role)?;
    }
    Ok(())
}

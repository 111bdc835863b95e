// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Introspection API for reading the ClickHouse system catalog.
//!
//! Rows from `system.databases`, `system.tables`, `system.columns`,
//! `system.roles`, `system.grants` and `system.users` are scanned into the
//! row structs below and reassembled into the `Observed*` models. Metadata
//! payloads stored in comments are decoded here, falling back to the raw
//! comment when they do not parse.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::client::connection::{Connection, ConnectionError, Row, scan};
use crate::metadata::{self, MetadataError};
use crate::models::{Column, Grant, ObservedDatabase, ObservedRole, ObservedTable, ObservedUser};
use crate::sql::quote_literal;

/// Matches the engine call opening `engine_full`, e.g. `ReplacingMergeTree(`.
static ENGINE_CALL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\w+\(").expect("valid regex"));

#[derive(Debug, Deserialize)]
struct DatabaseRow {
    name: String,
    engine: String,
    data_path: String,
    metadata_path: String,
    uuid: String,
    comment: String,
}

#[derive(Debug, Deserialize)]
struct TableRow {
    database: String,
    name: String,
    engine_full: String,
    engine: String,
    comment: String,
}

#[derive(Debug, Deserialize)]
struct ColumnRow {
    name: String,
    #[serde(rename = "type")]
    column_type: String,
}

#[derive(Debug, Deserialize)]
struct NameRow {
    name: String,
}

#[derive(Debug, Deserialize)]
struct GrantRow {
    role_name: String,
    access_type: String,
    /// `NULL` for grants on `*.*`.
    database: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserRow {
    name: String,
    default_roles_list: Vec<String>,
}

/// A catalog object together with the metadata decode failure, if its
/// comment had to be taken verbatim.
pub type Decoded<T> = (T, Option<MetadataError>);

/// API for introspecting ClickHouse catalog objects.
///
/// All methods are read-only.
pub struct IntrospectionApi<'a, C> {
    conn: &'a C,
}

impl<'a, C: Connection> IntrospectionApi<'a, C> {
    pub(crate) fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    fn query(&self, query: String) -> Result<Vec<Row>, ConnectionError> {
        self.conn
            .query(&query)
            .map_err(|source| ConnectionError::Query { query, source })
    }

    fn query_as<T: for<'de> Deserialize<'de>>(
        &self,
        relation: &'static str,
        query: String,
    ) -> Result<Vec<T>, ConnectionError> {
        self.query(query)?
            .into_iter()
            .map(|row| scan(relation, row))
            .collect()
    }

    /// Get a database by name.
    ///
    /// `default_cluster` stands in for the cluster when the comment carries
    /// no metadata payload.
    pub fn get_database(
        &self,
        name: &str,
        default_cluster: &str,
    ) -> Result<Option<Decoded<ObservedDatabase>>, ConnectionError> {
        let query = format!(
            "SELECT name, engine, data_path, metadata_path, uuid, comment FROM system.databases WHERE name = {}",
            quote_literal(name)
        );
        let rows: Vec<DatabaseRow> = self.query_as("system.databases", query)?;
        Ok(rows
            .into_iter()
            .next()
            .map(|row| map_database(row, default_cluster)))
    }

    /// List every database visible to the connection.
    pub fn list_databases(
        &self,
        default_cluster: &str,
    ) -> Result<Vec<Decoded<ObservedDatabase>>, ConnectionError> {
        let query = "SELECT name, engine, data_path, metadata_path, uuid, comment FROM system.databases ORDER BY name".to_string();
        let rows: Vec<DatabaseRow> = self.query_as("system.databases", query)?;
        Ok(rows
            .into_iter()
            .map(|row| map_database(row, default_cluster))
            .collect())
    }

    /// Names of the tables whose catalog `database` is `database`.
    pub fn list_table_names(&self, database: &str) -> Result<Vec<String>, ConnectionError> {
        let query = format!(
            "SELECT name FROM system.tables WHERE database = {} ORDER BY name",
            quote_literal(database)
        );
        let rows: Vec<NameRow> = self.query_as("system.tables", query)?;
        Ok(rows.into_iter().map(|row| row.name).collect())
    }

    /// Get a table and its columns, in declaration order.
    pub fn get_table(
        &self,
        database: &str,
        name: &str,
        default_cluster: &str,
    ) -> Result<Option<Decoded<ObservedTable>>, ConnectionError> {
        let query = format!(
            "SELECT database, name, engine_full, engine, comment FROM system.tables WHERE database = {} AND name = {}",
            quote_literal(database),
            quote_literal(name)
        );
        let rows: Vec<TableRow> = self.query_as("system.tables", query)?;
        let Some(row) = rows.into_iter().next() else {
            return Ok(None);
        };

        let query = format!(
            "SELECT name, type FROM system.columns WHERE database = {} AND table = {} ORDER BY position",
            quote_literal(database),
            quote_literal(name)
        );
        let columns: Vec<ColumnRow> = self.query_as("system.columns", query)?;
        let columns = columns
            .into_iter()
            .map(|c| Column::new(c.name, c.column_type))
            .collect();

        let (payload, warning) = metadata::decode_or_fallback(&row.comment, default_cluster);
        let table = ObservedTable {
            engine_params: parse_engine_params(&row.engine_full),
            database: row.database,
            name: row.name,
            engine: row.engine,
            engine_full: row.engine_full,
            columns,
            comment: payload.comment,
            cluster: payload.cluster,
        };
        Ok(Some((table, warning)))
    }

    /// Get a role and its grants.
    pub fn get_role(&self, name: &str) -> Result<Option<ObservedRole>, ConnectionError> {
        let query = format!(
            "SELECT name FROM system.roles WHERE name = {}",
            quote_literal(name)
        );
        let rows: Vec<NameRow> = self.query_as("system.roles", query)?;
        let Some(role) = rows.into_iter().next() else {
            return Ok(None);
        };

        let query = format!(
            "SELECT role_name, access_type, database FROM system.grants WHERE role_name = {}",
            quote_literal(name)
        );
        let grants: Vec<GrantRow> = self.query_as("system.grants", query)?;
        let grants = grants
            .into_iter()
            .map(|g| Grant {
                role_name: g.role_name,
                access_type: g.access_type,
                database: g.database.unwrap_or_default(),
            })
            .collect();
        Ok(Some(ObservedRole {
            name: role.name,
            grants,
        }))
    }

    /// Get a user and its default roles.
    pub fn get_user(&self, name: &str) -> Result<Option<ObservedUser>, ConnectionError> {
        let query = format!(
            "SELECT name, default_roles_list FROM system.users WHERE name = {}",
            quote_literal(name)
        );
        let rows: Vec<UserRow> = self.query_as("system.users", query)?;
        Ok(rows.into_iter().next().map(|row| ObservedUser {
            name: row.name,
            default_roles: row.default_roles_list,
        }))
    }
}

fn map_database(row: DatabaseRow, default_cluster: &str) -> Decoded<ObservedDatabase> {
    let (payload, warning) = metadata::decode_or_fallback(&row.comment, default_cluster);
    let database = ObservedDatabase {
        name: row.name,
        engine: row.engine,
        data_path: row.data_path,
        metadata_path: row.metadata_path,
        uuid: row.uuid,
        comment: payload.comment,
        cluster: payload.cluster,
    };
    (database, warning)
}

/// Recovers the engine parameters from an `engine_full` string.
///
/// Arguments are split on top level commas only. Nested calls such as
/// `rand()` and quoted literals such as `'/tables/{shard}/my table'` come
/// back as single arguments, verbatim apart from surrounding whitespace.
/// An unterminated argument list yields no parameters.
pub fn parse_engine_params(engine_full: &str) -> Vec<String> {
    let Some(call) = ENGINE_CALL.find(engine_full) else {
        return Vec::new();
    };

    let mut params = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut chars = engine_full[call.end()..].chars();
    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            current.push(c);
            if c == '\\' {
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' | '`' => {
                quote = Some(c);
                current.push(c);
            }
            '(' => {
                depth += 1;
                current.push(c);
            }
            ')' if depth == 0 => {
                push_param(&mut params, &current);
                return params;
            }
            ')' => {
                depth -= 1;
                current.push(c);
            }
            ',' if depth == 0 => push_param(&mut params, &std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    Vec::new()
}

fn push_param(params: &mut Vec<String>, raw: &str) {
    let param = raw.trim();
    if !param.is_empty() {
        params.push(param.to_string());
    }
}

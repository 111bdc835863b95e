// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::client::execute::ExecuteApi;
use crate::client::introspection::IntrospectionApi;

/// Error type produced by a [`Connection`] implementation.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A result row keyed by column name.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// The two primitives supplied by the connection layer.
///
/// Calls block until the server answers. Implementations must be shareable
/// across threads; reconciliations of different objects may run
/// concurrently on one connection.
pub trait Connection: Send + Sync {
    /// Executes a statement that returns no rows.
    fn execute(&self, statement: &str) -> Result<(), BoxError>;

    /// Runs a query and returns its rows.
    fn query(&self, query: &str) -> Result<Vec<Row>, BoxError>;
}

impl<C: Connection + ?Sized> Connection for &C {
    fn execute(&self, statement: &str) -> Result<(), BoxError> {
        (**self).execute(statement)
    }

    fn query(&self, query: &str) -> Result<Vec<Row>, BoxError> {
        (**self).query(query)
    }
}

impl<C: Connection + ?Sized> Connection for Box<C> {
    fn execute(&self, statement: &str) -> Result<(), BoxError> {
        (**self).execute(statement)
    }

    fn query(&self, query: &str) -> Result<Vec<Row>, BoxError> {
        (**self).query(query)
    }
}

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("failed to execute `{statement}`: {source}")]
    Execute { statement: String, source: BoxError },
    #[error("catalog query failed: {source}\n  Query: {query}")]
    Query { query: String, source: BoxError },
    #[error("unexpected row shape from {relation}: {source}")]
    Scan {
        relation: &'static str,
        source: serde_json::Error,
    },
}

/// Maps a row onto `T` by column name.
///
/// Missing or mistyped columns fail the scan instead of defaulting.
pub fn scan<T: DeserializeOwned>(relation: &'static str, row: Row) -> Result<T, ConnectionError> {
    serde_json::from_value(serde_json::Value::Object(row))
        .map_err(|source| ConnectionError::Scan { relation, source })
}

/// A handle on a [`Connection`] exposing catalog reads and statement
/// execution.
pub struct Client<C> {
    conn: C,
}

impl<C: Connection> Client<C> {
    pub fn new(conn: C) -> Self {
        Client { conn }
    }

    /// Access the introspection API for reading the system catalog.
    pub fn introspection(&self) -> IntrospectionApi<'_, C> {
        IntrospectionApi::new(&self.conn)
    }

    /// Access the execute API for running DDL/DCL statements.
    pub fn execution(&self) -> ExecuteApi<'_, C> {
        ExecuteApi::new(&self.conn)
    }

    pub fn connection(&self) -> &C {
        &self.conn
    }

    pub fn into_connection(self) -> C {
        self.conn
    }
}

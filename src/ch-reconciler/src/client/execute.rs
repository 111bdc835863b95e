// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Execution of synthesized statements.

use tracing::debug;

use crate::client::connection::{Connection, ConnectionError};
use crate::sql::Statement;

/// API for running DDL/DCL statements.
///
/// Statements are logged and reported in their redacted form only.
pub struct ExecuteApi<'a, C> {
    conn: &'a C,
}

impl<'a, C: Connection> ExecuteApi<'a, C> {
    pub(crate) fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    pub fn execute(&self, statement: &Statement) -> Result<(), ConnectionError> {
        debug!(statement = %statement, "executing");
        self.conn
            .execute(statement.sql())
            .map_err(|source| ConnectionError::Execute {
                statement: statement.redacted().to_string(),
                source,
            })
    }

    /// Executes `statements` in order, stopping at the first failure.
    pub fn execute_all<'s, I>(&self, statements: I) -> Result<(), ConnectionError>
    where
        I: IntoIterator<Item = &'s Statement>,
    {
        for statement in statements {
            self.execute(statement)?;
        }
        Ok(())
    }
}

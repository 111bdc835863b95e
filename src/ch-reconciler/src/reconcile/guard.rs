// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Pre-flight check that a database is empty before it is dropped.
//!
//! The check and the drop are separate round trips. A table created in
//! between is dropped along with the database.

use tracing::debug;

use crate::client::Connection;
use crate::error::ReconcileError;
use crate::models::ObjectKind;
use crate::reconcile::Reconciler;

/// Fails with [`ReconcileError::HasDependents`] when `tables` is non-empty.
pub fn check_dependents(database: &str, tables: Vec<String>) -> Result<(), ReconcileError> {
    if tables.is_empty() {
        Ok(())
    } else {
        Err(ReconcileError::HasDependents {
            database: database.to_string(),
            names: tables,
        })
    }
}

impl<'a, C: Connection> Reconciler<'a, C> {
    pub(crate) fn ensure_no_dependents(&self, database: &str) -> Result<(), ReconcileError> {
        let tables = self
            .client
            .introspection()
            .list_table_names(database)
            .map_err(|err| ReconcileError::catalog(ObjectKind::Database, database, err))?;
        debug!(database, dependents = tables.len(), "checked dependents");
        check_dependents(database, tables)
    }
}

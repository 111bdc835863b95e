// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use tracing::info;

use crate::client::Connection;
use crate::error::{Operation, ReconcileError};
use crate::models::{DesiredDatabase, ObjectKind, ObservedDatabase};
use crate::reconcile::{Observed, Reconciler};
use crate::sql;
use crate::validate;

const KIND: ObjectKind = ObjectKind::Database;

impl<'a, C: Connection> Reconciler<'a, C> {
    pub fn create_database(
        &self,
        desired: &DesiredDatabase,
    ) -> Result<Observed<ObservedDatabase>, ReconcileError> {
        validate::validate_database(desired)
            .map_err(|err| ReconcileError::validation(KIND, &desired.name, err))?;

        let placement = self.placement(desired.cluster.as_deref());
        let statement = sql::create_database(desired, &placement);
        self.execute(KIND, &desired.name, Operation::Create, &statement)?;
        info!(database = %desired.name, %placement, "created database");

        self.read_database(&desired.name)
    }

    pub fn read_database(&self, name: &str) -> Result<Observed<ObservedDatabase>, ReconcileError> {
        let found = self
            .client
            .introspection()
            .get_database(name, &self.config.default_cluster)
            .map_err(|err| ReconcileError::catalog(KIND, name, err))?;
        match found {
            Some((database, err)) => Ok(Observed::decoded(KIND, name, database, err)),
            None => Err(ReconcileError::not_found(KIND, name)),
        }
    }

    /// Every database visible to the connection, including system ones.
    pub fn list_databases(&self) -> Result<Vec<Observed<ObservedDatabase>>, ReconcileError> {
        let databases = self
            .client
            .introspection()
            .list_databases(&self.config.default_cluster)
            .map_err(|err| ReconcileError::catalog(KIND, "*", err))?;
        Ok(databases
            .into_iter()
            .map(|(database, err)| {
                let name = database.name.clone();
                Observed::decoded(KIND, &name, database, err)
            })
            .collect())
    }

    /// Drops a database on the cluster recorded in its metadata.
    ///
    /// Refuses with [`ReconcileError::HasDependents`] while the database
    /// still contains tables.
    pub fn delete_database(&self, name: &str) -> Result<(), ReconcileError> {
        let observed = self.read_database(name)?.object;
        self.ensure_no_dependents(name)?;

        let placement = self.placement(Some(observed.cluster.as_str()));
        let statement = sql::drop_database(name, &placement);
        self.execute(KIND, name, Operation::Delete, &statement)?;
        info!(database = %name, %placement, "dropped database");
        Ok(())
    }
}

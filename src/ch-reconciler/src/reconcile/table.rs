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
use crate::models::{DesiredTable, ObjectKind, ObservedTable};
use crate::reconcile::{Observed, Reconciler};
use crate::sql;
use crate::validate;

const KIND: ObjectKind = ObjectKind::Table;

/// Whether converging `observed` to `desired` needs a drop and re-create.
///
/// Tables have no in-place update: columns, engine and engine parameters
/// are fixed at creation.
pub fn requires_replacement(desired: &DesiredTable, observed: &ObservedTable) -> bool {
    desired.columns != observed.columns
        || desired.engine != observed.engine
        || desired.engine_params != observed.engine_params
}

impl<'a, C: Connection> Reconciler<'a, C> {
    pub fn create_table(
        &self,
        desired: &DesiredTable,
    ) -> Result<Observed<ObservedTable>, ReconcileError> {
        let name = desired.qualified_name();
        validate::validate_table(desired)
            .map_err(|err| ReconcileError::validation(KIND, &name, err))?;

        let placement = self.placement(desired.cluster.as_deref());
        let statement = sql::create_table(desired, &placement);
        self.execute(KIND, &name, Operation::Create, &statement)?;
        info!(table = %name, %placement, "created table");

        self.read_table(&desired.database, &desired.name)
    }

    pub fn read_table(
        &self,
        database: &str,
        name: &str,
    ) -> Result<Observed<ObservedTable>, ReconcileError> {
        let qualified = format!("{database}.{name}");
        let found = self
            .client
            .introspection()
            .get_table(database, name, &self.config.default_cluster)
            .map_err(|err| ReconcileError::catalog(KIND, &qualified, err))?;
        match found {
            Some((table, err)) => Ok(Observed::decoded(KIND, &qualified, table, err)),
            None => Err(ReconcileError::not_found(KIND, &qualified)),
        }
    }

    pub fn delete_table(&self, database: &str, name: &str) -> Result<(), ReconcileError> {
        let observed = self.read_table(database, name)?.object;
        let qualified = format!("{database}.{name}");
        let placement = self.placement(Some(observed.cluster.as_str()));
        let statement = sql::drop_table(database, name, &placement);
        self.execute(KIND, &qualified, Operation::Delete, &statement)?;
        info!(table = %qualified, %placement, "dropped table");
        Ok(())
    }
}

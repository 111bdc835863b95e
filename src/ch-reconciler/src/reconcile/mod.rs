// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Create, read, update and delete for each managed object kind.
//!
//! Every call follows the same shape: validate the desired description,
//! read whatever observed state the call depends on, synthesize the
//! statements, execute them in order and, where the object still exists,
//! re-read it as the new source of truth. Nothing is cached between calls,
//! so one [`Reconciler`] can serve concurrent calls for distinct objects.
//! Callers must serialize calls that target the same object.

mod database;
mod guard;
mod role;
mod table;
mod user;

pub use guard::check_dependents;
pub use role::{
    PrivilegeDelta, RolePhase, RolePlan, RoleStep, diff_privileges, plan_role_update,
    role_from_observed,
};
pub(crate) use role::role_grants;
pub use table::requires_replacement;
pub use user::{RoleMembershipDelta, diff_roles};

use crate::client::{Client, Connection};
use crate::cluster::{self, ClusterPlacement};
use crate::config::ReconcilerConfig;
use crate::error::{Operation, ReconcileError, Warning};
use crate::metadata::MetadataError;
use crate::models::ObjectKind;
use crate::sql::Statement;

/// An observed object and the warnings produced while reading it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observed<T> {
    pub object: T,
    pub warnings: Vec<Warning>,
}

impl<T> Observed<T> {
    fn new(object: T) -> Self {
        Observed {
            object,
            warnings: Vec::new(),
        }
    }

    fn decoded(kind: ObjectKind, name: &str, object: T, err: Option<MetadataError>) -> Self {
        let warnings = err
            .iter()
            .map(|err| Warning::malformed_metadata(kind, name, err))
            .collect();
        Observed { object, warnings }
    }
}

pub struct Reconciler<'a, C> {
    client: &'a Client<C>,
    config: &'a ReconcilerConfig,
}

impl<'a, C: Connection> Reconciler<'a, C> {
    pub fn new(client: &'a Client<C>, config: &'a ReconcilerConfig) -> Self {
        Reconciler { client, config }
    }

    pub fn config(&self) -> &ReconcilerConfig {
        self.config
    }

    fn placement(&self, explicit: Option<&str>) -> ClusterPlacement {
        cluster::resolve(explicit.unwrap_or_default(), &self.config.default_cluster)
    }

    fn execute(
        &self,
        kind: ObjectKind,
        name: &str,
        operation: Operation,
        statement: &Statement,
    ) -> Result<(), ReconcileError> {
        self.client
            .execution()
            .execute(statement)
            .map_err(|source| ReconcileError::execution(kind, name, operation, source))
    }

    fn execute_all(
        &self,
        kind: ObjectKind,
        name: &str,
        operation: Operation,
        statements: &[Statement],
    ) -> Result<(), ReconcileError> {
        self.client
            .execution()
            .execute_all(statements)
            .map_err(|source| ReconcileError::execution(kind, name, operation, source))
    }
}

// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Role reconciliation.
//!
//! An update is planned up front as an ordered list of [`RoleStep`]s, each
//! tagged with the [`RolePhase`] that produced it:
//!
//! ```text
//! Start -> NameChanged? -> DatabaseChanged? -> Diffing -> Applying -> Done
//! ```
//!
//! Creation has a single `Applying` phase and ends in `RolledBack` when a
//! grant fails, after dropping the half-created role.
//!
//! When the database scope changes, the role is first stripped with
//! `REVOKE ALL` and its previously observed privileges are granted again on
//! the new database; the privilege delta is then applied on top. A delta
//! grant can therefore repeat a privilege the re-grant already covered.
//! ClickHouse accepts duplicate grants, and the sequence matches what
//! existing deployments were converged with, so it is kept as is.

use std::fmt;

use tracing::{debug, info, warn};

use crate::client::{Connection, ConnectionError};
use crate::cluster::ClusterPlacement;
use crate::error::{Operation, ReconcileError};
use crate::list::UniqueList;
use crate::models::{ALL_DATABASES, DesiredRole, ObjectKind, ObservedRole};
use crate::reconcile::{Observed, Reconciler};
use crate::sql::{self, Statement};
use crate::validate::{self, ValidationError};

const KIND: ObjectKind = ObjectKind::Role;

/// Privileges to add and remove, by access type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrivilegeDelta {
    pub to_grant: UniqueList<String>,
    pub to_revoke: UniqueList<String>,
}

impl PrivilegeDelta {
    pub fn is_empty(&self) -> bool {
        self.to_grant.is_empty() && self.to_revoke.is_empty()
    }
}

pub fn diff_privileges(
    observed: &UniqueList<String>,
    desired: &UniqueList<String>,
) -> PrivilegeDelta {
    PrivilegeDelta {
        to_grant: desired.difference(observed),
        to_revoke: observed.difference(desired),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RolePhase {
    Start,
    NameChanged,
    DatabaseChanged,
    Diffing,
    Applying,
    Done,
    RolledBack,
}

impl fmt::Display for RolePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RolePhase::Start => "start",
            RolePhase::NameChanged => "name changed",
            RolePhase::DatabaseChanged => "database changed",
            RolePhase::Diffing => "diffing",
            RolePhase::Applying => "applying",
            RolePhase::Done => "done",
            RolePhase::RolledBack => "rolled back",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleStep {
    pub phase: RolePhase,
    pub statement: Statement,
}

/// The statements that move an existing role to its desired shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RolePlan {
    pub delta: PrivilegeDelta,
    pub steps: Vec<RoleStep>,
}

impl RolePlan {
    pub fn statements(&self) -> impl Iterator<Item = &Statement> {
        self.steps.iter().map(|step| &step.statement)
    }

    /// The phases an update passes through after `Start`, in order.
    ///
    /// `Diffing` follows the rename and scope change and precedes the
    /// delta; phases without statements are left out, except `Diffing`
    /// and `Done`.
    pub fn phases(&self) -> Vec<RolePhase> {
        let mut phases = Vec::new();
        for step in &self.steps {
            if step.phase == RolePhase::Applying && !phases.contains(&RolePhase::Diffing) {
                phases.push(RolePhase::Diffing);
            }
            if phases.last() != Some(&step.phase) {
                phases.push(step.phase);
            }
        }
        if !phases.contains(&RolePhase::Diffing) {
            phases.push(RolePhase::Diffing);
        }
        phases.push(RolePhase::Done);
        phases
    }
}

/// The database a role's grants are scoped to.
///
/// Grants on `*.*` carry no database and count as [`ALL_DATABASES`], so a
/// role holding both database and global grants spans two scopes and is
/// rejected. A role without grants has no scope.
fn observed_scope(role: &ObservedRole) -> Result<Option<String>, ValidationError> {
    let scopes: UniqueList<String> = role
        .grants
        .iter()
        .map(|grant| {
            if grant.database.is_empty() {
                ALL_DATABASES.to_string()
            } else {
                grant.database.clone()
            }
        })
        .collect();
    validate::validate_single_scope(&scopes)?;
    Ok(scopes.iter().next().cloned())
}

/// Reassembles catalog grants into the shape a role is declared in.
pub fn role_from_observed(role: &ObservedRole) -> Result<DesiredRole, ValidationError> {
    let database = observed_scope(role)?.unwrap_or_else(|| ALL_DATABASES.to_string());
    Ok(DesiredRole {
        name: role.name.clone(),
        database,
        privileges: role.privileges(),
    })
}

fn grant_steps(
    phase: RolePhase,
    role: &str,
    database: &str,
    privileges: &UniqueList<String>,
) -> Vec<RoleStep> {
    sql::group_by_scope(database, privileges)
        .into_iter()
        .map(|(target, privileges)| RoleStep {
            phase,
            statement: sql::grant_privileges(role, &privileges, &target),
        })
        .collect()
}

/// The grants issued right after `CREATE ROLE`, one per scope group.
pub(crate) fn role_grants(desired: &DesiredRole) -> Vec<Statement> {
    grant_steps(
        RolePhase::Applying,
        &desired.name,
        &desired.database,
        &desired.privileges,
    )
    .into_iter()
    .map(|step| step.statement)
    .collect()
}

fn revoke_steps(role: &str, database: &str, privileges: &UniqueList<String>) -> Vec<RoleStep> {
    sql::group_by_scope(database, privileges)
        .into_iter()
        .map(|(target, privileges)| RoleStep {
            phase: RolePhase::Applying,
            statement: sql::revoke_privileges(role, &privileges, &target),
        })
        .collect()
}

/// Plans the update of `observed` to `desired`.
///
/// The rename comes first so every later statement addresses the role by
/// its new name. Grants are applied before revokes.
pub fn plan_role_update(
    observed: &ObservedRole,
    desired: &DesiredRole,
    placement: &ClusterPlacement,
) -> Result<RolePlan, ValidationError> {
    let scope = observed_scope(observed)?;
    let observed_privileges = observed.privileges();
    let name = desired.name.as_str();
    let mut steps = Vec::new();

    if observed.name != desired.name {
        steps.push(RoleStep {
            phase: RolePhase::NameChanged,
            statement: sql::rename_role(&observed.name, name, placement),
        });
    }

    if scope.as_deref().is_some_and(|scope| scope != desired.database) {
        steps.push(RoleStep {
            phase: RolePhase::DatabaseChanged,
            statement: sql::revoke_all(name),
        });
        steps.extend(grant_steps(
            RolePhase::DatabaseChanged,
            name,
            &desired.database,
            &observed_privileges,
        ));
    }

    let delta = diff_privileges(&observed_privileges, &desired.privileges);
    steps.extend(grant_steps(
        RolePhase::Applying,
        name,
        &desired.database,
        &delta.to_grant,
    ));
    steps.extend(revoke_steps(name, &desired.database, &delta.to_revoke));

    Ok(RolePlan { delta, steps })
}

fn log_phase(role: &str, phase: RolePhase) {
    debug!(role, %phase, "role reconciliation phase");
}

impl<'a, C: Connection> Reconciler<'a, C> {
    /// Creates a role and grants its privileges.
    ///
    /// If any grant fails the role is dropped again and the grant error is
    /// returned.
    pub fn create_role(
        &self,
        desired: &DesiredRole,
    ) -> Result<Observed<DesiredRole>, ReconcileError> {
        validate::validate_role(desired)
            .map_err(|err| ReconcileError::validation(KIND, &desired.name, err))?;
        let name = desired.name.as_str();

        log_phase(name, RolePhase::Applying);
        self.execute(KIND, name, Operation::Create, &sql::create_role(name))?;

        for statement in role_grants(desired) {
            if let Err(source) = self.client.execution().execute(&statement) {
                return Err(self.roll_back_role(name, source));
            }
        }
        log_phase(name, RolePhase::Done);
        info!(role = name, database = %desired.database, "created role");

        self.read_role(name)
    }

    fn roll_back_role(&self, name: &str, source: ConnectionError) -> ReconcileError {
        warn!(role = name, "grant failed, dropping partially created role");
        match self.client.execution().execute(&sql::drop_role(name)) {
            Ok(()) => {
                log_phase(name, RolePhase::RolledBack);
                ReconcileError::execution(KIND, name, Operation::Create, source)
            }
            Err(rollback) => ReconcileError::RollbackFailed {
                kind: KIND,
                name: name.to_string(),
                operation: Operation::Create,
                source,
                rollback,
            },
        }
    }

    pub fn read_role(&self, name: &str) -> Result<Observed<DesiredRole>, ReconcileError> {
        let observed = self.observe_role(name)?;
        let role = role_from_observed(&observed)
            .map_err(|err| ReconcileError::validation(KIND, name, err))?;
        Ok(Observed::new(role))
    }

    fn observe_role(&self, name: &str) -> Result<ObservedRole, ReconcileError> {
        self.client
            .introspection()
            .get_role(name)
            .map_err(|err| ReconcileError::catalog(KIND, name, err))?
            .ok_or_else(|| ReconcileError::not_found(KIND, name))
    }

    /// Moves the role currently named `current_name` to `desired`.
    ///
    /// Statements already executed when one fails are not compensated.
    pub fn update_role(
        &self,
        current_name: &str,
        desired: &DesiredRole,
    ) -> Result<Observed<DesiredRole>, ReconcileError> {
        validate::validate_role(desired)
            .map_err(|err| ReconcileError::validation(KIND, &desired.name, err))?;
        log_phase(current_name, RolePhase::Start);

        let observed = self.observe_role(current_name)?;
        let plan = plan_role_update(&observed, desired, &self.placement(None))
            .map_err(|err| ReconcileError::validation(KIND, current_name, err))?;

        for phase in plan.phases() {
            log_phase(&desired.name, phase);
            if phase == RolePhase::Diffing {
                debug!(
                    role = %desired.name,
                    grant = ?plan.delta.to_grant,
                    revoke = ?plan.delta.to_revoke,
                    "computed privilege delta"
                );
            }
            for step in plan.steps.iter().filter(|step| step.phase == phase) {
                self.execute(KIND, &desired.name, Operation::Update, &step.statement)?;
            }
        }

        self.read_role(&desired.name)
    }

    pub fn delete_role(&self, name: &str) -> Result<(), ReconcileError> {
        self.observe_role(name)?;
        self.execute(KIND, name, Operation::Delete, &sql::drop_role(name))?;
        info!(role = name, "dropped role");
        Ok(())
    }
}

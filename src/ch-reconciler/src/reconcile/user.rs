// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use tracing::{debug, info};

use crate::client::Connection;
use crate::error::{Operation, ReconcileError};
use crate::list::UniqueList;
use crate::models::{DesiredUser, ObjectKind, ObservedUser};
use crate::reconcile::{Observed, Reconciler};
use crate::sql::{self, Statement};
use crate::validate;

const KIND: ObjectKind = ObjectKind::User;

/// Role memberships to add and remove.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleMembershipDelta {
    pub to_grant: UniqueList<String>,
    pub to_revoke: UniqueList<String>,
}

pub fn diff_roles(
    observed: &UniqueList<String>,
    desired: &UniqueList<String>,
) -> RoleMembershipDelta {
    RoleMembershipDelta {
        to_grant: desired.difference(observed),
        to_revoke: observed.difference(desired),
    }
}

/// Statements that move `observed` to `desired`.
///
/// Membership changes address the user by its current name and precede
/// the `ALTER USER`, which renames, re-keys when `password_changed`, and
/// resets the default roles.
fn plan_user_update(
    observed: &ObservedUser,
    desired: &DesiredUser,
    password_changed: bool,
) -> Vec<Statement> {
    let delta = diff_roles(&observed.roles(), &desired.roles);
    debug!(
        user = %observed.name,
        grant = ?delta.to_grant,
        revoke = ?delta.to_revoke,
        "computed role membership delta"
    );

    let mut statements = Vec::new();
    if !delta.to_grant.is_empty() {
        statements.push(sql::grant_roles(delta.to_grant.as_slice(), &observed.name));
    }
    if !delta.to_revoke.is_empty() {
        statements.push(sql::revoke_roles(delta.to_revoke.as_slice(), &observed.name));
    }
    let new_name = (observed.name != desired.name).then_some(desired.name.as_str());
    let password = password_changed.then_some(&desired.password);
    statements.push(sql::alter_user(
        &observed.name,
        new_name,
        password,
        desired.roles.as_slice(),
    ));
    statements
}

impl<'a, C: Connection> Reconciler<'a, C> {
    pub fn create_user(
        &self,
        desired: &DesiredUser,
    ) -> Result<Observed<ObservedUser>, ReconcileError> {
        validate::validate_user(desired)
            .map_err(|err| ReconcileError::validation(KIND, &desired.name, err))?;

        let statement =
            sql::create_user(&desired.name, &desired.password, desired.roles.as_slice());
        self.execute(KIND, &desired.name, Operation::Create, &statement)?;
        info!(user = %desired.name, "created user");

        self.read_user(&desired.name)
    }

    pub fn read_user(&self, name: &str) -> Result<Observed<ObservedUser>, ReconcileError> {
        let user = self
            .client
            .introspection()
            .get_user(name)
            .map_err(|err| ReconcileError::catalog(KIND, name, err))?
            .ok_or_else(|| ReconcileError::not_found(KIND, name))?;
        Ok(Observed::new(user))
    }

    /// Moves the user currently named `current_name` to `desired`.
    ///
    /// The password is only sent when `password_changed` is set, since the
    /// catalog cannot tell whether it differs.
    pub fn update_user(
        &self,
        current_name: &str,
        desired: &DesiredUser,
        password_changed: bool,
    ) -> Result<Observed<ObservedUser>, ReconcileError> {
        validate::validate_user(desired)
            .map_err(|err| ReconcileError::validation(KIND, &desired.name, err))?;

        let observed = self.read_user(current_name)?.object;
        let statements = plan_user_update(&observed, desired, password_changed);
        self.execute_all(KIND, current_name, Operation::Update, &statements)?;
        info!(user = %desired.name, "updated user");

        self.read_user(&desired.name)
    }

    pub fn delete_user(&self, name: &str) -> Result<(), ReconcileError> {
        self.read_user(name)?;
        self.execute(KIND, name, Operation::Delete, &sql::drop_user(name))?;
        info!(user = name, "dropped user");
        Ok(())
    }
}

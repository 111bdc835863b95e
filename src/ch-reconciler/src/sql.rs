// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! DDL/DCL synthesis.
//!
//! All statement text is produced here through [`StatementBuilder`], which
//! joins clauses with single spaces, drops empty clauses, and keeps a
//! redacted rendering alongside the real one so that secrets never reach
//! logs or error messages.
//!
//! The functions expect validated input; see [`crate::validate`].

use std::fmt;

use itertools::Itertools;

use crate::cluster::ClusterPlacement;
use crate::metadata;
use crate::models::{ALL_DATABASES, DesiredDatabase, DesiredTable, Password};
use crate::validate::is_global_privilege;

/// The database whose grants must be issued as `GRANT CURRENT GRANTS`.
const SYSTEM_DATABASE: &str = "system";

const REDACTED: &str = "'<redacted>'";

/// A rendered statement.
///
/// `Display` shows the redacted form; only [`Statement::sql`] exposes the
/// text sent to the server.
#[derive(Clone, PartialEq, Eq)]
pub struct Statement {
    sql: String,
    redacted: String,
}

impl Statement {
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn redacted(&self) -> &str {
        &self.redacted
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.redacted)
    }
}

impl fmt::Debug for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Statement").field(&self.redacted).finish()
    }
}

/// Accumulates space-separated clauses of a single statement.
#[derive(Debug, Default)]
pub struct StatementBuilder {
    sql: Vec<String>,
    redacted: Vec<String>,
}

impl StatementBuilder {
    pub fn new(head: impl Into<String>) -> Self {
        let mut builder = StatementBuilder::default();
        builder.push(head);
        builder
    }

    /// Appends a clause. Empty clauses are skipped.
    pub fn push(&mut self, clause: impl Into<String>) -> &mut Self {
        let clause = clause.into();
        if !clause.is_empty() {
            self.redacted.push(clause.clone());
            self.sql.push(clause);
        }
        self
    }

    /// Appends a string literal whose content must not be displayed.
    pub fn push_secret(&mut self, secret: &str) -> &mut Self {
        self.sql.push(quote_literal(secret));
        self.redacted.push(REDACTED.to_string());
        self
    }

    pub fn build(&self) -> Statement {
        Statement {
            sql: self.sql.join(" "),
            redacted: self.redacted.join(" "),
        }
    }
}

/// Renders `value` as a single-quoted string literal.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

fn comment_clause(comment: &str, cluster: &str) -> String {
    format!("COMMENT '{}'", metadata::encode(comment, cluster))
}

pub fn create_database(database: &DesiredDatabase, placement: &ClusterPlacement) -> Statement {
    StatementBuilder::new(format!("CREATE DATABASE {}", database.name))
        .push(placement.clause())
        .push(comment_clause(&database.comment, placement.cluster()))
        .build()
}

pub fn drop_database(name: &str, placement: &ClusterPlacement) -> Statement {
    StatementBuilder::new(format!("DROP DATABASE {name}"))
        .push(placement.clause())
        .push("SYNC")
        .build()
}

fn partition_item(by: &str, function: Option<&str>) -> String {
    match function {
        Some(f) if !f.is_empty() => format!("{f}({by})"),
        _ => by.to_string(),
    }
}

pub fn create_table(table: &DesiredTable, placement: &ClusterPlacement) -> Statement {
    let mut builder = StatementBuilder::new(format!("CREATE TABLE {}", table.qualified_name()));
    builder.push(placement.clause());
    if !table.columns.is_empty() {
        let columns = table
            .columns
            .iter()
            .map(|c| format!("{} {}", c.name, c.column_type))
            .join(", ");
        builder.push(format!("({columns})"));
    }
    builder.push(format!(
        "ENGINE = {}({})",
        table.engine,
        table.engine_params.join(", ")
    ));
    if !table.order_by.is_empty() {
        builder.push(format!("ORDER BY ({})", table.order_by.join(", ")));
    }
    if !table.partition_by.is_empty() {
        let clauses = table
            .partition_by
            .iter()
            .map(|p| partition_item(&p.by, p.function.as_deref()))
            .join(", ");
        builder.push(format!("PARTITION BY ({clauses})"));
    }
    builder
        .push(comment_clause(&table.comment, placement.cluster()))
        .build()
}

pub fn drop_table(database: &str, name: &str, placement: &ClusterPlacement) -> Statement {
    StatementBuilder::new(format!("DROP TABLE {database}.{name}"))
        .push(placement.clause())
        .push("SYNC")
        .build()
}

pub fn create_role(name: &str) -> Statement {
    StatementBuilder::new(format!("CREATE ROLE {name}")).build()
}

pub fn drop_role(name: &str) -> Statement {
    StatementBuilder::new(format!("DROP ROLE {name}")).build()
}

pub fn rename_role(old: &str, new: &str, placement: &ClusterPlacement) -> Statement {
    StatementBuilder::new(format!("ALTER ROLE {old} RENAME TO {new}"))
        .push(placement.clause())
        .build()
}

/// The `<db>.*` target of a privilege; the wildcard database yields `*.*`.
fn privilege_target(database: &str) -> String {
    format!("{database}.*")
}

/// Splits `privileges` into the groups that share one `GRANT` target.
///
/// Database level privileges target `database`; global ones always target
/// `*.*`. Groups are returned database scope first and are never empty.
pub fn group_by_scope<'a, I>(database: &str, privileges: I) -> Vec<(String, Vec<String>)>
where
    I: IntoIterator<Item = &'a String>,
{
    let (global, scoped): (Vec<String>, Vec<String>) = privileges
        .into_iter()
        .cloned()
        .partition(|p| is_global_privilege(p));
    let mut groups = Vec::new();
    if database == ALL_DATABASES {
        let all: Vec<String> = scoped.into_iter().chain(global).collect();
        if !all.is_empty() {
            groups.push((ALL_DATABASES.to_string(), all));
        }
        return groups;
    }
    if !scoped.is_empty() {
        groups.push((database.to_string(), scoped));
    }
    if !global.is_empty() {
        groups.push((ALL_DATABASES.to_string(), global));
    }
    groups
}

pub fn grant_privileges(role: &str, privileges: &[String], database: &str) -> Statement {
    let privileges = privileges.join(", ");
    let target = privilege_target(database);
    if database == SYSTEM_DATABASE {
        StatementBuilder::new(format!(
            "GRANT CURRENT GRANTS ({privileges} ON {target}) TO {role}"
        ))
        .build()
    } else {
        StatementBuilder::new(format!("GRANT {privileges} ON {target} TO {role}")).build()
    }
}

pub fn revoke_privileges(role: &str, privileges: &[String], database: &str) -> Statement {
    StatementBuilder::new(format!(
        "REVOKE {} ON {} FROM {role}",
        privileges.join(", "),
        privilege_target(database)
    ))
    .build()
}

pub fn revoke_all(role: &str) -> Statement {
    StatementBuilder::new(format!("REVOKE ALL ON *.* FROM {role}")).build()
}

pub fn create_user(name: &str, password: &Password, roles: &[String]) -> Statement {
    let mut builder = StatementBuilder::new(format!(
        "CREATE USER {name} IDENTIFIED WITH sha256_password BY"
    ));
    builder.push_secret(password.expose());
    if !roles.is_empty() {
        builder.push(format!("DEFAULT ROLE {}", roles.join(", ")));
    }
    builder.build()
}

/// `ALTER USER` that optionally renames and re-keys the user, and always
/// resets its default roles.
pub fn alter_user(
    current: &str,
    new_name: Option<&str>,
    password: Option<&Password>,
    roles: &[String],
) -> Statement {
    let mut builder = StatementBuilder::new(format!("ALTER USER {current}"));
    if let Some(new_name) = new_name {
        builder.push(format!("RENAME TO {new_name}"));
    }
    if let Some(password) = password {
        builder.push("IDENTIFIED WITH sha256_password BY");
        builder.push_secret(password.expose());
    }
    if roles.is_empty() {
        builder.push("DEFAULT ROLE NONE");
    } else {
        builder.push(format!("DEFAULT ROLE {}", roles.join(", ")));
    }
    builder.build()
}

pub fn grant_roles(roles: &[String], user: &str) -> Statement {
    StatementBuilder::new(format!("GRANT {} TO {user}", roles.join(", "))).build()
}

pub fn revoke_roles(roles: &[String], user: &str) -> Statement {
    StatementBuilder::new(format!("REVOKE {} FROM {user}", roles.join(", "))).build()
}

pub fn drop_user(name: &str) -> Statement {
    StatementBuilder::new(format!("DROP USER {name}")).build()
}

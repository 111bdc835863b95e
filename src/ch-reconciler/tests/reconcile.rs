// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! End-to-end reconciliation against an in-memory connection.

use ch_reconciler::client::mock::MockConnection;
use ch_reconciler::client::{Client, ConnectionError};
use ch_reconciler::list::UniqueList;
use ch_reconciler::metadata::encode;
use ch_reconciler::models::{
    Column, DesiredDatabase, DesiredRole, DesiredTable, DesiredUser, PartitionClause, Password,
};
use ch_reconciler::validate::ValidationError;
use ch_reconciler::{ReconcileError, Reconciler, ReconcilerConfig};
use serde_json::json;

fn client() -> Client<MockConnection> {
    Client::new(MockConnection::new())
}

fn list(items: &[&str]) -> UniqueList<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn role(name: &str, database: &str, privileges: &[&str]) -> DesiredRole {
    DesiredRole {
        name: name.into(),
        database: database.into(),
        privileges: list(privileges),
    }
}

fn grants(role: &str, grants: &[(&str, &str)]) -> Vec<serde_json::Value> {
    grants
        .iter()
        .map(|(access_type, database)| {
            json!({"role_name": role, "access_type": access_type, "database": database})
        })
        .collect()
}

fn orders() -> DesiredTable {
    DesiredTable {
        database: "shop".into(),
        name: "orders".into(),
        cluster: None,
        engine: "ReplacingMergeTree".into(),
        engine_params: vec!["ts".into()],
        columns: vec![Column::new("id", "Int64"), Column::new("ts", "DateTime")],
        order_by: vec!["id".into()],
        partition_by: vec![PartitionClause {
            by: "ts".into(),
            function: Some("toYYYYMM".into()),
        }],
        comment: "orders".into(),
    }
}

#[test]
fn create_table_executes_and_rereads() {
    let client = client();
    client.connection().on_query(
        "FROM system.tables WHERE database = 'shop' AND name = 'orders'",
        vec![json!({
            "database": "shop",
            "name": "orders",
            "engine_full": "ReplacingMergeTree(ts) PARTITION BY toYYYYMM(ts) ORDER BY id",
            "engine": "ReplacingMergeTree",
            "comment": encode("orders", ""),
        })],
    );
    client.connection().on_query(
        "FROM system.columns",
        vec![
            json!({"name": "id", "type": "Int64"}),
            json!({"name": "ts", "type": "DateTime"}),
        ],
    );
    let config = ReconcilerConfig::default();
    let reconciler = Reconciler::new(&client, &config);

    let observed = reconciler.create_table(&orders()).unwrap();
    assert_eq!(
        client.connection().executed(),
        vec![
            r#"CREATE TABLE shop.orders (id Int64, ts DateTime) ENGINE = ReplacingMergeTree(ts) ORDER BY (id) PARTITION BY (toYYYYMM(ts)) COMMENT '{"comment":"orders","cluster":""}'"#
        ]
    );
    assert!(observed.warnings.is_empty());
    assert_eq!(observed.object.engine_params, vec!["ts"]);
    assert!(!ch_reconciler::reconcile::requires_replacement(
        &orders(),
        &observed.object
    ));
}

#[test]
fn invalid_table_issues_nothing() {
    let client = client();
    let config = ReconcilerConfig::default();
    let mut table = orders();
    table.order_by = vec!["missing".into()];

    let err = Reconciler::new(&client, &config)
        .create_table(&table)
        .unwrap_err();
    assert!(matches!(
        err,
        ReconcileError::Validation {
            source: ValidationError::UnknownColumn(ref name),
            ..
        } if name == "missing"
    ));
    assert!(client.connection().executed().is_empty());
    assert!(client.connection().queries().is_empty());
}

#[test]
fn database_with_tables_is_not_dropped() {
    let client = client();
    client.connection().on_query(
        "FROM system.databases",
        vec![json!({
            "name": "shop",
            "engine": "Atomic",
            "data_path": "",
            "metadata_path": "",
            "uuid": "",
            "comment": encode("", ""),
        })],
    );
    client
        .connection()
        .on_query("SELECT name FROM system.tables", vec![json!({"name": "orders"})]);
    let config = ReconcilerConfig::default();

    let err = Reconciler::new(&client, &config)
        .delete_database("shop")
        .unwrap_err();
    match err {
        ReconcileError::HasDependents { database, names } => {
            assert_eq!(database, "shop");
            assert_eq!(names, vec!["orders"]);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(client.connection().executed().is_empty());
}

#[test]
fn create_database_on_default_cluster() {
    let client = client();
    client.connection().on_query(
        "FROM system.databases",
        vec![json!({
            "name": "shop",
            "engine": "Replicated",
            "data_path": "",
            "metadata_path": "",
            "uuid": "",
            "comment": encode("the shop", "main"),
        })],
    );
    let config = ReconcilerConfig::new("main");
    let desired = DesiredDatabase {
        name: "shop".into(),
        cluster: None,
        comment: "the shop".into(),
    };

    let observed = Reconciler::new(&client, &config)
        .create_database(&desired)
        .unwrap();
    assert_eq!(
        client.connection().executed(),
        vec![r#"CREATE DATABASE shop ON CLUSTER main COMMENT '{"comment":"the shop","cluster":"main"}'"#]
    );
    assert_eq!(observed.object.cluster, "main");
    assert_eq!(observed.object.comment, "the shop");
}

#[test]
fn reconciling_unchanged_role_issues_nothing() {
    let client = client();
    client
        .connection()
        .on_query("FROM system.roles", vec![json!({"name": "reader"})]);
    client.connection().on_query(
        "FROM system.grants",
        grants("reader", &[("SELECT", "shop"), ("INSERT", "shop")]),
    );
    let config = ReconcilerConfig::default();
    let reconciler = Reconciler::new(&client, &config);
    let desired = role("reader", "shop", &["SELECT", "INSERT"]);

    let first = reconciler.update_role("reader", &desired).unwrap();
    let second = reconciler.update_role("reader", &desired).unwrap();
    assert!(client.connection().executed().is_empty());
    assert_eq!(first.object, desired);
    assert_eq!(second.object, desired);
}

#[test]
fn role_update_grants_then_revokes() {
    let client = client();
    client
        .connection()
        .on_query("FROM system.roles", vec![json!({"name": "reader"})]);
    client
        .connection()
        .on_query(
            "FROM system.grants",
            grants("reader", &[("SELECT", "shop"), ("INSERT", "shop")]),
        )
        .on_query(
            "FROM system.grants",
            grants("reader", &[("SELECT", "shop"), ("ALTER", "shop")]),
        );
    let config = ReconcilerConfig::default();

    let observed = Reconciler::new(&client, &config)
        .update_role("reader", &role("reader", "shop", &["SELECT", "ALTER"]))
        .unwrap();
    assert_eq!(
        client.connection().executed(),
        vec![
            "GRANT ALTER ON shop.* TO reader",
            "REVOKE INSERT ON shop.* FROM reader",
        ]
    );
    assert_eq!(observed.object.privileges, list(&["SELECT", "ALTER"]));
}

#[test]
fn role_update_of_missing_role_is_not_found() {
    let client = client();
    let config = ReconcilerConfig::default();
    let err = Reconciler::new(&client, &config)
        .update_role("ghost", &role("ghost", "shop", &["SELECT"]))
        .unwrap_err();
    assert!(matches!(err, ReconcileError::NotFound { .. }));
    assert!(client.connection().executed().is_empty());
}

#[test]
fn failed_grant_drops_the_new_role() {
    let client = client();
    client.connection().fail_on("GRANT");
    let config = ReconcilerConfig::default();

    let err = Reconciler::new(&client, &config)
        .create_role(&role("ops", "*", &["SELECT", "REMOTE"]))
        .unwrap_err();
    assert!(matches!(
        err,
        ReconcileError::Execution {
            source: ConnectionError::Execute { .. },
            ..
        }
    ));
    assert_eq!(
        client.connection().executed(),
        vec!["CREATE ROLE ops", "DROP ROLE ops"]
    );
}

#[test]
fn failed_rollback_reports_both_errors() {
    let client = client();
    client.connection().fail_on("GRANT").fail_on("DROP ROLE");
    let config = ReconcilerConfig::default();

    let err = Reconciler::new(&client, &config)
        .create_role(&role("ops", "shop", &["SELECT"]))
        .unwrap_err();
    assert!(matches!(err, ReconcileError::RollbackFailed { .. }));
    assert!(err.to_string().contains("DROP ROLE"));
    assert_eq!(client.connection().executed(), vec!["CREATE ROLE ops"]);
}

#[test]
fn global_privilege_on_database_is_rejected() {
    let client = client();
    let config = ReconcilerConfig::default();
    let err = Reconciler::new(&client, &config)
        .create_role(&role("ops", "shop", &["REMOTE"]))
        .unwrap_err();
    assert!(matches!(
        err,
        ReconcileError::Validation {
            source: ValidationError::GlobalPrivilegeScopeViolation { .. },
            ..
        }
    ));
    assert!(client.connection().executed().is_empty());
}

#[test]
fn user_update_renames_after_membership_changes() {
    let client = client();
    client.connection().on_query(
        "FROM system.users WHERE name = 'alice'",
        vec![json!({"name": "alice", "default_roles_list": ["reader", "writer"]})],
    );
    client.connection().on_query(
        "FROM system.users WHERE name = 'alicia'",
        vec![json!({"name": "alicia", "default_roles_list": ["reader"]})],
    );
    let config = ReconcilerConfig::default();
    let desired = DesiredUser {
        name: "alicia".into(),
        password: Password::new("correct horse"),
        roles: list(&["reader"]),
    };

    let observed = Reconciler::new(&client, &config)
        .update_user("alice", &desired, true)
        .unwrap();
    assert_eq!(
        client.connection().executed(),
        vec![
            "REVOKE writer FROM alice",
            "ALTER USER alice RENAME TO alicia IDENTIFIED WITH sha256_password BY 'correct horse' DEFAULT ROLE reader",
        ]
    );
    assert_eq!(observed.object.name, "alicia");
}

#[test]
fn failed_statement_error_is_redacted() {
    let client = client();
    client.connection().fail_on("CREATE USER");
    let config = ReconcilerConfig::default();
    let desired = DesiredUser {
        name: "bob".into(),
        password: Password::new("sup3rs3cret"),
        roles: UniqueList::new(),
    };

    let err = Reconciler::new(&client, &config)
        .create_user(&desired)
        .unwrap_err();
    assert!(err.is_retryable());
    assert!(!err.to_string().contains("sup3rs3cret"));
    assert!(err.to_string().contains("<redacted>"));
}

#[test]
fn create_role_grants_and_rereads() {
    let client = client();
    client
        .connection()
        .on_query("FROM system.roles", vec![json!({"name": "writer"})]);
    client.connection().on_query(
        "FROM system.grants",
        grants("writer", &[("SELECT", "shop"), ("INSERT", "shop")]),
    );
    let config = ReconcilerConfig::default();
    let desired = role("writer", "shop", &["SELECT", "INSERT"]);

    let observed = Reconciler::new(&client, &config)
        .create_role(&desired)
        .unwrap();
    assert_eq!(
        client.connection().executed(),
        vec!["CREATE ROLE writer", "GRANT SELECT, INSERT ON shop.* TO writer"]
    );
    assert_eq!(observed.object, desired);
}

#[test]
fn role_update_renames_then_moves_scope() {
    let client = client();
    client
        .connection()
        .on_query("FROM system.roles WHERE name = 'reader'", vec![json!({"name": "reader"})])
        .on_query("FROM system.roles WHERE name = 'analyst'", vec![json!({"name": "analyst"})]);
    client
        .connection()
        .on_query(
            "WHERE role_name = 'reader'",
            grants("reader", &[("SELECT", "shop"), ("INSERT", "shop")]),
        )
        .on_query(
            "WHERE role_name = 'analyst'",
            grants("analyst", &[("SELECT", "billing"), ("ALTER", "billing")]),
        );
    let config = ReconcilerConfig::default();
    let desired = role("analyst", "billing", &["SELECT", "ALTER"]);

    let observed = Reconciler::new(&client, &config)
        .update_role("reader", &desired)
        .unwrap();
    assert_eq!(
        client.connection().executed(),
        vec![
            "ALTER ROLE reader RENAME TO analyst",
            "REVOKE ALL ON *.* FROM analyst",
            "GRANT SELECT, INSERT ON billing.* TO analyst",
            "GRANT ALTER ON billing.* TO analyst",
            "REVOKE INSERT ON billing.* FROM analyst",
        ]
    );
    assert_eq!(observed.object, desired);
}

#[test]
fn existing_objects_are_dropped() {
    let client = client();
    client
        .connection()
        .on_query("FROM system.roles", vec![json!({"name": "reader"})]);
    client.connection().on_query(
        "FROM system.users",
        vec![json!({"name": "alice", "default_roles_list": []})],
    );
    client.connection().on_query(
        "FROM system.tables WHERE database = 'shop' AND name = 'orders'",
        vec![json!({
            "database": "shop",
            "name": "orders",
            "engine_full": "MergeTree ORDER BY id",
            "engine": "MergeTree",
            "comment": encode("orders", "analytics"),
        })],
    );
    let config = ReconcilerConfig::new("main");
    let reconciler = Reconciler::new(&client, &config);

    reconciler.delete_role("reader").unwrap();
    reconciler.delete_user("alice").unwrap();
    reconciler.delete_table("shop", "orders").unwrap();
    assert_eq!(
        client.connection().executed(),
        vec![
            "DROP ROLE reader",
            "DROP USER alice",
            "DROP TABLE shop.orders ON CLUSTER analytics SYNC",
        ]
    );
}

#[test]
fn deleting_missing_objects_is_not_found() {
    let client = client();
    let config = ReconcilerConfig::default();
    let reconciler = Reconciler::new(&client, &config);

    for err in [
        reconciler.delete_role("ghost").unwrap_err(),
        reconciler.delete_user("ghost").unwrap_err(),
        reconciler.delete_table("shop", "ghost").unwrap_err(),
        reconciler.delete_database("ghost").unwrap_err(),
    ] {
        assert!(matches!(err, ReconcileError::NotFound { .. }), "{err}");
    }
    assert!(client.connection().executed().is_empty());
}

#[test]
fn create_user_with_roles_rereads() {
    let client = client();
    client.connection().on_query(
        "FROM system.users WHERE name = 'carol'",
        vec![json!({"name": "carol", "default_roles_list": ["reader"]})],
    );
    let config = ReconcilerConfig::default();
    let desired = DesiredUser {
        name: "carol".into(),
        password: Password::new("hunter2"),
        roles: list(&["reader"]),
    };

    let observed = Reconciler::new(&client, &config)
        .create_user(&desired)
        .unwrap();
    assert_eq!(
        client.connection().executed(),
        vec!["CREATE USER carol IDENTIFIED WITH sha256_password BY 'hunter2' DEFAULT ROLE reader"]
    );
    assert_eq!(observed.object.default_roles, vec!["reader"]);
}

#[test]
fn listed_databases_carry_their_own_warnings() {
    let client = client();
    client.connection().on_query(
        "FROM system.databases",
        vec![
            json!({
                "name": "legacy",
                "engine": "Atomic",
                "data_path": "",
                "metadata_path": "",
                "uuid": "",
                "comment": "hand made",
            }),
            json!({
                "name": "shop",
                "engine": "Atomic",
                "data_path": "",
                "metadata_path": "",
                "uuid": "",
                "comment": encode("the shop", "analytics"),
            }),
        ],
    );
    let config = ReconcilerConfig::new("main");

    let databases = Reconciler::new(&client, &config).list_databases().unwrap();
    assert_eq!(databases.len(), 2);
    assert_eq!(databases[0].object.comment, "hand made");
    assert_eq!(databases[0].object.cluster, "main");
    assert_eq!(databases[0].warnings.len(), 1);
    assert_eq!(databases[0].warnings[0].name, "legacy");
    assert_eq!(databases[1].object.cluster, "analytics");
    assert!(databases[1].warnings.is_empty());
}

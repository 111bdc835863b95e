// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Reconciliation engine for ClickHouse objects.
//!
//! An operator declares databases, tables, roles and users; this crate turns
//! those declarations into the DDL/DCL statements that converge a live server
//! towards them. The pieces, leaf first:
//!
//! - [`metadata`] smuggles a free-form comment and the owning cluster through
//!   the engine's native `COMMENT` field.
//! - [`cluster`] decides which cluster an operation runs on.
//! - [`validate`] rejects descriptions that must never reach the server.
//! - [`sql`] renders statements.
//! - [`client`] reads the system catalog into observed objects and executes
//!   statements through a caller supplied [`client::Connection`].
//! - [`reconcile`] drives create, read, update and delete for each resource
//!   kind, including the privilege diff and role rollback.
//! - [`manifest`] loads a TOML desired state document and renders it
//!   offline.
//!
//! The crate keeps no state between calls. Configuration travels in a
//! [`config::ReconcilerConfig`] passed to every [`reconcile::Reconciler`].

pub mod client;
pub mod cluster;
pub mod config;
pub mod error;
pub mod list;
pub mod manifest;
pub mod metadata;
pub mod models;
pub mod reconcile;
pub mod sql;
pub mod validate;

pub use client::{Client, Connection};
pub use config::ReconcilerConfig;
pub use error::ReconcileError;
pub use reconcile::Reconciler;

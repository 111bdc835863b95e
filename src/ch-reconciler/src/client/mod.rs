// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Access to a ClickHouse server through a caller supplied connection.

mod connection;
pub mod execute;
pub mod introspection;
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

pub use connection::{BoxError, Client, Connection, ConnectionError, Row, scan};
pub use execute::ExecuteApi;
pub use introspection::IntrospectionApi;

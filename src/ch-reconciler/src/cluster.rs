// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Cluster placement for DDL statements.

use std::fmt;

/// The cluster an operation runs on, if any.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClusterPlacement {
    cluster: String,
}

impl ClusterPlacement {
    /// The effective cluster name; empty when the statement runs on a single
    /// node.
    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    pub fn is_clustered(&self) -> bool {
        !self.cluster.is_empty()
    }

    /// The `ON CLUSTER <name>` fragment, or an empty string.
    pub fn clause(&self) -> String {
        if self.is_clustered() {
            format!("ON CLUSTER {}", self.cluster)
        } else {
            String::new()
        }
    }
}

impl fmt::Display for ClusterPlacement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_clustered() {
            write!(f, "cluster '{}'", self.cluster)
        } else {
            f.write_str("local node")
        }
    }
}

/// Resolves the effective cluster: `explicit` wins when non-empty, otherwise
/// `default` applies.
pub fn resolve(explicit: &str, default: &str) -> ClusterPlacement {
    let cluster = if explicit.is_empty() { default } else { explicit };
    ClusterPlacement {
        cluster: cluster.to_string(),
    }
}

// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! In-memory [`Connection`] for exercising reconciliation without a server.
//!
//! Queries are answered from canned responses registered by substring; the
//! first registration whose pattern occurs in the query wins. Registering
//! several responses for one pattern serves them in order and then keeps
//! repeating the last one. Unmatched queries return no rows. Executed
//! statements are recorded, and statements matching a failure pattern are
//! rejected.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use crate::client::connection::{BoxError, Connection, Row};

#[derive(Debug, Default)]
struct State {
    responses: Vec<(String, VecDeque<Vec<Row>>)>,
    failures: Vec<String>,
    executed: Vec<String>,
    queries: Vec<String>,
}

#[derive(Debug, Default)]
pub struct MockConnection {
    state: Mutex<State>,
}

fn into_row(value: serde_json::Value) -> Row {
    match value {
        serde_json::Value::Object(map) => map,
        other => {
            let mut row = Row::new();
            row.insert("value".to_string(), other);
            row
        }
    }
}

impl MockConnection {
    pub fn new() -> Self {
        MockConnection::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Answers queries containing `pattern` with `rows`.
    pub fn on_query(&self, pattern: &str, rows: Vec<serde_json::Value>) -> &Self {
        let rows: Vec<Row> = rows.into_iter().map(into_row).collect();
        let mut state = self.state();
        match state.responses.iter().position(|(p, _)| p == pattern) {
            Some(i) => state.responses[i].1.push_back(rows),
            None => state
                .responses
                .push((pattern.to_string(), VecDeque::from([rows]))),
        }
        self
    }

    /// Fails every statement or query containing `pattern`.
    pub fn fail_on(&self, pattern: &str) -> &Self {
        self.state().failures.push(pattern.to_string());
        self
    }

    /// Statements executed so far, in order.
    pub fn executed(&self) -> Vec<String> {
        self.state().executed.clone()
    }

    /// Queries run so far, in order.
    pub fn queries(&self) -> Vec<String> {
        self.state().queries.clone()
    }

    fn check_failure(state: &State, text: &str) -> Result<(), BoxError> {
        match state.failures.iter().find(|p| text.contains(p.as_str())) {
            Some(pattern) => Err(format!("injected failure matching '{pattern}'").into()),
            None => Ok(()),
        }
    }
}

impl Connection for MockConnection {
    fn execute(&self, statement: &str) -> Result<(), BoxError> {
        let mut state = self.state();
        Self::check_failure(&state, statement)?;
        state.executed.push(statement.to_string());
        Ok(())
    }

    fn query(&self, query: &str) -> Result<Vec<Row>, BoxError> {
        let mut state = self.state();
        state.queries.push(query.to_string());
        Self::check_failure(&state, query)?;
        let Some((_, queue)) = state
            .responses
            .iter_mut()
            .find(|(pattern, _)| query.contains(pattern.as_str()))
        else {
            return Ok(Vec::new());
        };
        let rows = if queue.len() > 1 {
            queue.pop_front().unwrap_or_default()
        } else {
            queue.front().cloned().unwrap_or_default()
        };
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn responses_are_served_in_order_then_repeated() {
        let conn = MockConnection::new();
        conn.on_query("system.roles", vec![json!({"name": "a"})])
            .on_query("system.roles", vec![]);
        assert_eq!(conn.query("SELECT name FROM system.roles").unwrap().len(), 1);
        assert!(conn.query("SELECT name FROM system.roles").unwrap().is_empty());
        assert!(conn.query("SELECT name FROM system.roles").unwrap().is_empty());
    }

    #[test]
    fn failures_are_not_recorded() {
        let conn = MockConnection::new();
        conn.fail_on("GRANT");
        assert!(conn.execute("CREATE ROLE a").is_ok());
        assert!(conn.execute("GRANT SELECT ON *.* TO a").is_err());
        assert_eq!(conn.executed(), vec!["CREATE ROLE a"]);
    }
}

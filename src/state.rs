// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::relay::IntentSubmitter;
use crate::tracker::ExecutionTracker;

#[derive(Clone)]
pub struct AppState {
    /// Read side: status queries.
    pub tracker: Arc<ExecutionTracker>,
    /// Write side: starts pipeline runs in the background.
    pub submitter: Arc<dyn IntentSubmitter>,
}

impl AppState {
    pub fn new(tracker: Arc<ExecutionTracker>, submitter: Arc<dyn IntentSubmitter>) -> Self {
        Self { tracker, submitter }
    }
}

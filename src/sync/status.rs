// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Turns a cycle outcome into the persisted status document and the requeue
//! decision. The status is rebuilt from scratch every cycle; nothing is
//! patched incrementally.

use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::constants::conditions;
use crate::sync::orchestrator::CycleOutcome;
use crate::types::configset::{Condition, ConfigSetStatus, Reconciliation};

/// Reduce a finished cycle into a fresh status.
pub fn reduce_cycle(
    previous: Option<&ConfigSetStatus>,
    outcome: &CycleOutcome,
    generation: Option<i64>,
    revision: &str,
    now: DateTime<Utc>,
) -> ConfigSetStatus {
    let mut status = ConfigSetStatus {
        observed_generation: generation,
        last_reconciled_at: Some(now.to_rfc3339_opts(SecondsFormat::Nanos, true)),
        last_attempted_revision: Some(revision.to_string()),
        last_applied_revision: previous.and_then(|p| p.last_applied_revision.clone()),
        failures: outcome.failures.clone(),
        disabled: outcome.disabled.clone(),
        conditions: Vec::new(),
    };

    let ready = if outcome.failures.is_empty() {
        status.last_applied_revision = Some(revision.to_string());
        ready_condition(
            previous,
            conditions::STATUS_TRUE,
            conditions::REASON_RECONCILIATION_SUCCEEDED,
            format!("Applied revision: {revision}"),
            generation,
            now,
        )
    } else {
        ready_condition(
            previous,
            conditions::STATUS_FALSE,
            conditions::REASON_RECONCILIATION_FAILED,
            format!("Attempted revision: {revision}"),
            generation,
            now,
        )
    };
    status.conditions.push(ready);

    status
}

/// Reduce a cycle that never reached the targets. The per-target record lists
/// cannot be recomputed, so the previous ones are carried over.
pub fn reduce_setup_failure(
    previous: Option<&ConfigSetStatus>,
    generation: Option<i64>,
    message: &str,
    now: DateTime<Utc>,
) -> ConfigSetStatus {
    let mut status = previous.cloned().unwrap_or_default();

    status.observed_generation = generation;
    status.last_reconciled_at = Some(now.to_rfc3339_opts(SecondsFormat::Nanos, true));
    status.conditions = vec![ready_condition(
        previous,
        conditions::STATUS_FALSE,
        conditions::REASON_SETUP_FAILED,
        format!("Setup failed: {message}"),
        generation,
        now,
    )];

    status
}

/// Pick the delay until the next cycle.
pub fn requeue_after(
    reconciliation: &Reconciliation,
    failed: bool,
) -> crate::error::Result<Duration> {
    if failed {
        reconciliation.retry_interval()
    } else {
        reconciliation.interval()
    }
}

// The transition timestamp only moves when the status value actually flips;
// watchers use it for change detection.
fn ready_condition(
    previous: Option<&ConfigSetStatus>,
    status: &str,
    reason: &str,
    message: String,
    generation: Option<i64>,
    now: DateTime<Utc>,
) -> Condition {
    let last_transition_time = previous
        .and_then(|p| {
            p.conditions
                .iter()
                .find(|c| c.condition_type == conditions::READY)
        })
        .filter(|c| c.status == status)
        .and_then(|c| c.last_transition_time.clone())
        .unwrap_or_else(|| now.to_rfc3339_opts(SecondsFormat::Secs, true));

    Condition {
        condition_type: conditions::READY.to_string(),
        status: status.to_string(),
        reason: reason.to_string(),
        message,
        last_transition_time: Some(last_transition_time),
        observed_generation: generation,
    }
}

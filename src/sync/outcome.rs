// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Per-target result bookkeeping. Render, ownership and apply problems are
//! independent dimensions; they are combined here with explicit merge rules
//! instead of ad hoc string concatenation.

use crate::types::configset::{DisabledRecord, DisabledTarget, FailureRecord};

/// Result of applying one generated object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectOutcome {
    Applied,
    /// The object carries the reconcile-disable marker; its content was left
    /// untouched. Not a failure.
    Disabled {
        kind: &'static str,
        name: String,
        namespace: String,
    },
    Failed(String),
    /// Not attempted because an earlier apply for the same target failed
    Skipped,
}

impl ObjectOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, ObjectOutcome::Failed(_))
    }
}

/// Result of one full target pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetOutcome {
    /// The target never reached the apply stage (render error or pre-flight
    /// ownership conflict); the message aggregates every blocking reason.
    Failed { name: String, message: String },
    /// Both objects went through the apply engine, each with its own result
    Processed {
        name: String,
        config_map: ObjectOutcome,
        secret: ObjectOutcome,
    },
}

/// Reduce target outcomes into the status record lists. Failure messages for
/// one target are space-joined into a single entry; each disabled object kind
/// produces its own record. Output is sorted regardless of completion order.
pub fn collect(outcomes: &[TargetOutcome]) -> (Vec<FailureRecord>, Vec<DisabledRecord>) {
    let mut failures = Vec::new();
    let mut disabled = Vec::new();

    for outcome in outcomes {
        match outcome {
            TargetOutcome::Failed { name, message } => failures.push(FailureRecord {
                name: name.clone(),
                message: message.clone(),
            }),
            TargetOutcome::Processed {
                name,
                config_map,
                secret,
            } => {
                let mut messages = Vec::new();
                for object in [config_map, secret] {
                    match object {
                        ObjectOutcome::Failed(message) => messages.push(message.clone()),
                        ObjectOutcome::Disabled {
                            kind,
                            name: object_name,
                            namespace,
                        } => disabled.push(DisabledRecord {
                            name: name.clone(),
                            kind: (*kind).to_string(),
                            target: DisabledTarget {
                                name: object_name.clone(),
                                namespace: namespace.clone(),
                            },
                        }),
                        ObjectOutcome::Applied | ObjectOutcome::Skipped => {}
                    }
                }

                if !messages.is_empty() {
                    failures.push(FailureRecord {
                        name: name.clone(),
                        message: messages.join(" "),
                    });
                }
            }
        }
    }

    failures.sort_by(|a, b| a.name.cmp(&b.name));
    disabled.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.kind.cmp(&b.kind)));

    (failures, disabled)
}

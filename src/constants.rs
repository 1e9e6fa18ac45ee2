// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

/// The operator name, used as the generated-by label value
pub const OPERATOR_NAME: &str = "weft-operator";

/// Finalizer added to every ConfigSet under management
pub const FINALIZER: &str = "weft.dev/finalizer";

/// Default key prefix for labels and annotations owned by the operator.
/// The effective prefix is injected through [`crate::config::Config`].
pub const DEFAULT_LABEL_PREFIX: &str = "weft.dev";

/// Label key suffixes appended to the injected prefix
pub mod labels {
    /// Marks an object as generated by this operator
    pub const GENERATED_BY: &str = "generated-by";
    /// API group of the owning resource
    pub const OWNER_API_GROUP: &str = "owner-api-group";
    /// API version of the owning resource
    pub const OWNER_API_VERSION: &str = "owner-api-version";
    /// Kind of the owning resource
    pub const OWNER_KIND: &str = "owner-kind";
    /// Name of the owning resource
    pub const OWNER_NAME: &str = "owner-name";
    /// Namespace of the owning resource
    pub const OWNER_NAMESPACE: &str = "owner-namespace";
    /// Revision of the source tree the object was rendered from
    pub const REVISION: &str = "revision";
    /// Opt-out switch: set to [`DISABLED`] to pin an object's content
    pub const RECONCILE: &str = "reconcile";

    pub const ENABLED: &str = "enabled";
    pub const DISABLED: &str = "disabled";
}

/// Condition types and reasons persisted into ConfigSet status
pub mod conditions {
    /// Ready indicates the resource is fully reconciled. When False, the
    /// resource should be considered in the process of reconciling and not
    /// a representation of actual state.
    pub const READY: &str = "Ready";

    pub const REASON_RECONCILIATION_SUCCEEDED: &str = "ReconciliationSucceeded";
    pub const REASON_RECONCILIATION_FAILED: &str = "ReconciliationFailed";
    pub const REASON_SETUP_FAILED: &str = "SetupFailed";

    pub const STATUS_TRUE: &str = "True";
    pub const STATUS_FALSE: &str = "False";
}

/// CRD polling configuration
pub mod crd {
    /// Initial polling interval in seconds when waiting for CRD
    pub const POLL_INTERVAL_SECS: u64 = 10;
    /// Maximum polling interval in seconds (exponential backoff cap)
    pub const POLL_MAX_INTERVAL_SECS: u64 = 60;
}

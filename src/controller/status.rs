//! Status derivation and conditions management for SqliteDatabase resources
//!
//! The phase is a pure function of the live workload state, recomputed from
//! scratch on every pass. Conditions are an additive layer on top: they keep
//! their transition timestamps when the status value is unchanged.

use chrono::Utc;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{ListParams, Patch, PatchParams};
use kube::{Api, ResourceExt};

use crate::controller::error::Result;
use crate::controller::Context;
use crate::crd::{Condition, DatabasePhase, SqliteDatabase, SqliteDatabaseStatus};
use crate::resources::common::FIELD_MANAGER;

/// Standard condition types following Kubernetes conventions
pub mod condition_types {
    /// Database workload is ready to accept connections
    pub const READY: &str = "Ready";
    /// Database spec passed validation
    pub const CONFIG_VALID: &str = "ConfigurationValid";
}

/// Condition status values
pub mod condition_status {
    pub const TRUE: &str = "True";
    pub const FALSE: &str = "False";
}

/// Derive the lifecycle phase from the live workload.
///
/// Memoryless by design: there is no transition history and no guard on any
/// edge. A workload that cannot be read always maps back to `Creating`.
pub fn derive_phase(deployment: Option<&Deployment>) -> (DatabasePhase, bool) {
    match deployment {
        None => (DatabasePhase::Creating, false),
        Some(deploy) => {
            let ready_replicas = deploy
                .status
                .as_ref()
                .and_then(|s| s.ready_replicas)
                .unwrap_or(0);
            if ready_replicas > 0 {
                (DatabasePhase::Ready, true)
            } else {
                (DatabasePhase::Pending, false)
            }
        }
    }
}

/// Builder for creating and updating status conditions
pub struct ConditionBuilder {
    conditions: Vec<Condition>,
    generation: Option<i64>,
}

impl ConditionBuilder {
    /// Create from existing conditions
    pub fn from_existing(existing: Vec<Condition>, generation: Option<i64>) -> Self {
        Self {
            conditions: existing,
            generation,
        }
    }

    /// Set a condition, updating if it exists or adding if it doesn't
    pub fn set_condition(mut self, type_: &str, status: &str, reason: &str, message: &str) -> Self {
        let now = Utc::now().to_rfc3339();

        if let Some(existing) = self.conditions.iter_mut().find(|c| c.type_ == type_) {
            if existing.status != status {
                existing.status = status.to_string();
                existing.last_transition_time = now;
            }
            existing.reason = reason.to_string();
            existing.message = message.to_string();
            existing.observed_generation = self.generation;
        } else {
            self.conditions.push(Condition {
                type_: type_.to_string(),
                status: status.to_string(),
                reason: reason.to_string(),
                message: message.to_string(),
                last_transition_time: now,
                observed_generation: self.generation,
            });
        }
        self
    }

    /// Set the Ready condition
    pub fn ready(self, is_ready: bool, reason: &str, message: &str) -> Self {
        let status = if is_ready {
            condition_status::TRUE
        } else {
            condition_status::FALSE
        };
        self.set_condition(condition_types::READY, status, reason, message)
    }

    /// Set the ConfigurationValid condition
    pub fn config_valid(self, is_valid: bool, reason: &str, message: &str) -> Self {
        let status = if is_valid {
            condition_status::TRUE
        } else {
            condition_status::FALSE
        };
        self.set_condition(condition_types::CONFIG_VALID, status, reason, message)
    }

    /// Build the conditions list
    pub fn build(self) -> Vec<Condition> {
        self.conditions
    }
}

/// Status manager for SqliteDatabase resources
pub struct StatusManager<'a> {
    db: &'a SqliteDatabase,
    ctx: &'a Context,
    ns: &'a str,
}

impl<'a> StatusManager<'a> {
    /// Create a new status manager
    pub fn new(db: &'a SqliteDatabase, ctx: &'a Context, ns: &'a str) -> Self {
        Self { db, ctx, ns }
    }

    /// Recompute the status from live workload state and persist it
    pub async fn refresh(&self) -> Result<()> {
        let name = self.db.name_any();

        // A fetch failure here re-enters Creating; the workload may simply
        // not exist yet
        let deployments: Api<Deployment> = Api::namespaced(self.ctx.client.clone(), self.ns);
        let deployment = deployments.get(&name).await.ok();

        let (phase, ready) = derive_phase(deployment.as_ref());
        let pod_name = self.find_pod(&name).await;

        let generation = self.db.metadata.generation;
        let existing = self.db.status.as_ref();
        let existing_conditions = existing.map(|s| s.conditions.clone()).unwrap_or_default();

        let (reason, message) = match phase {
            DatabasePhase::Creating => ("Creating", "Workload has not been created yet"),
            DatabasePhase::Pending => ("Pending", "Workload has no ready replicas"),
            DatabasePhase::Ready => ("WorkloadReady", "Database is ready to accept connections"),
        };

        let conditions = ConditionBuilder::from_existing(existing_conditions, generation)
            .ready(ready, reason, message)
            .config_valid(true, "SpecValid", "Spec passed validation")
            .build();

        let status = SqliteDatabaseStatus {
            phase,
            ready,
            // Not derived by the operator; carried forward untouched
            database_size: existing.and_then(|s| s.database_size.clone()),
            last_backup: existing.and_then(|s| s.last_backup.clone()),
            pod_name,
            conditions,
        };

        self.update(status).await
    }

    /// Record a validation failure on the conditions without changing the phase
    pub async fn set_validation_failed(&self, message: &str) -> Result<()> {
        self.set_error_condition("InvalidSpec", message, false).await
    }

    /// Record a reconciliation failure on the conditions without changing the phase
    pub async fn set_reconcile_failed(&self, message: &str) -> Result<()> {
        self.set_error_condition("ReconcileError", message, true).await
    }

    async fn set_error_condition(
        &self,
        reason: &str,
        message: &str,
        config_valid: bool,
    ) -> Result<()> {
        let generation = self.db.metadata.generation;
        let existing = self.db.status.as_ref();
        let existing_conditions = existing.map(|s| s.conditions.clone()).unwrap_or_default();

        let mut builder = ConditionBuilder::from_existing(existing_conditions, generation)
            .ready(false, reason, message);
        if !config_valid {
            builder = builder.config_valid(false, reason, message);
        }
        let conditions = builder.build();

        let status = SqliteDatabaseStatus {
            phase: existing.map(|s| s.phase).unwrap_or_default(),
            ready: false,
            database_size: existing.and_then(|s| s.database_size.clone()),
            last_backup: existing.and_then(|s| s.last_backup.clone()),
            pod_name: existing.and_then(|s| s.pod_name.clone()),
            conditions,
        };

        self.update(status).await
    }

    /// Persist the status subresource via a merge patch
    pub async fn update(&self, status: SqliteDatabaseStatus) -> Result<()> {
        let api: Api<SqliteDatabase> = Api::namespaced(self.ctx.client.clone(), self.ns);
        let name = self.db.name_any();

        let patch = serde_json::json!({
            "status": status
        });

        api.patch_status(
            &name,
            &PatchParams::apply(FIELD_MANAGER),
            &Patch::Merge(&patch),
        )
        .await?;

        Ok(())
    }

    /// Best-effort lookup of a pod running this database
    async fn find_pod(&self, db_name: &str) -> Option<String> {
        let pods: Api<Pod> = Api::namespaced(self.ctx.client.clone(), self.ns);
        let label_selector = format!("app={}", db_name);

        match pods.list(&ListParams::default().labels(&label_selector)).await {
            Ok(pods) => pods.items.first().and_then(|p| p.metadata.name.clone()),
            Err(_) => None,
        }
    }
}

//! Reconciliation logic for SqliteDatabase resources
//!
//! One pass drives the four dependents (PVC, init ConfigMap, Deployment,
//! Service) toward the state computed from the spec, then derives the status
//! from the live workload. Each step short-circuits the rest on failure; the
//! runtime's error policy decides when to re-invoke.

use std::sync::Arc;
use std::time::Duration;

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{ConfigMap, PersistentVolumeClaim, Service};
use kube::api::{Patch, PatchParams};
use kube::runtime::controller::Action;
use kube::{Api, ResourceExt};
use serde::de::DeserializeOwned;
use tracing::{debug, error, info, instrument, warn};

use crate::controller::context::Context;
use crate::controller::error::{BackoffConfig, Error, Result};
use crate::controller::status::StatusManager;
use crate::controller::validation;
use crate::crd::SqliteDatabase;
use crate::resources::common::{self, FIELD_MANAGER};
use crate::resources::{configmap, deployment, pvc, service};

/// Interval between periodic status refreshes
const REQUEUE_INTERVAL: Duration = Duration::from_secs(30);

/// Main reconciliation function
#[instrument(skip(db, ctx), fields(name = %db.name_any(), namespace = db.namespace().unwrap_or_default()))]
pub async fn reconcile(db: Arc<SqliteDatabase>, ctx: Arc<Context>) -> Result<Action> {
    let ns = db
        .namespace()
        .ok_or(Error::MissingObjectKey("metadata.namespace"))?;

    info!("Reconciling SqliteDatabase");

    // No finalizer: dependents carry owner references, so the garbage
    // collector cascades deletion without any cleanup code here
    if db.metadata.deletion_timestamp.is_some() {
        debug!("Resource is being deleted, owner references handle cleanup");
        return Ok(Action::await_change());
    }

    let status_manager = StatusManager::new(&db, &ctx, &ns);

    // Invalid specs never reach a builder; the failure lands on the
    // conditions instead of producing an injected command or a bad PVC
    if let Err(e) = validation::validate_spec(&db) {
        warn!("Spec validation failed: {}", e);
        let _ = status_manager.set_validation_failed(&e.to_string()).await;
        return Err(e);
    }

    let result = reconcile_dependents(&db, &ctx, &ns).await;

    match result {
        Ok(()) => {
            status_manager.refresh().await?;
            debug!("Reconciliation completed successfully");
            Ok(Action::requeue(REQUEUE_INTERVAL))
        }
        Err(e) => {
            error!("Reconciliation failed: {}", e);
            // Best effort: surface the failure on the conditions
            let _ = status_manager.set_reconcile_failed(&e.to_string()).await;
            Err(e)
        }
    }
}

/// Error policy for the controller with exponential backoff
pub fn error_policy(db: Arc<SqliteDatabase>, error: &Error, _ctx: Arc<Context>) -> Action {
    let name = db.name_any();
    let backoff = BackoffConfig::default();

    let delay = backoff.delay_for_error(error, 0);

    if error.is_retryable() {
        warn!(
            "Retryable error for {}: {}, requeuing in {:?}",
            name, error, delay
        );
    } else {
        error!(
            "Non-retryable error for {}: {}, requeuing in {:?} for manual intervention",
            name, error, delay
        );
    }

    Action::requeue(delay)
}

/// Ensure all dependents, in fixed order, short-circuiting on failure
async fn reconcile_dependents(db: &SqliteDatabase, ctx: &Context, ns: &str) -> Result<()> {
    ensure_pvc(db, ctx, ns).await?;
    ensure_init_configmap(db, ctx, ns).await?;
    ensure_deployment(db, ctx, ns).await?;
    ensure_service(db, ctx, ns).await?;
    Ok(())
}

/// Ensure the storage PersistentVolumeClaim
async fn ensure_pvc(db: &SqliteDatabase, ctx: &Context, ns: &str) -> Result<()> {
    let api: Api<PersistentVolumeClaim> = Api::namespaced(ctx.client.clone(), ns);
    let desired = pvc::generate_pvc(db);
    let name = desired.name_any();

    match api.get_opt(&name).await? {
        Some(current) if !pvc::needs_update(&current, &desired) => {
            debug!("PVC {} is up to date", name);
            Ok(())
        }
        _ => apply_resource(ctx, ns, &desired).await,
    }
}

/// Ensure the init ConfigMap when bootstrap SQL is present
///
/// When `initSQL` is cleared a previously created ConfigMap is left in place;
/// it is orphaned until the owner cascade removes it with the resource.
async fn ensure_init_configmap(db: &SqliteDatabase, ctx: &Context, ns: &str) -> Result<()> {
    let api: Api<ConfigMap> = Api::namespaced(ctx.client.clone(), ns);
    let name = common::init_configmap_name(&db.name_any());

    // The live object only matters when there is SQL to reconcile against
    let current = match db.spec.init_sql() {
        Some(_) => api.get_opt(&name).await?,
        None => None,
    };

    match configmap::plan(db, current.as_ref()) {
        configmap::InitConfigMapAction::Leave => {
            debug!("No bootstrap SQL; any existing ConfigMap {} is left in place", name);
            Ok(())
        }
        configmap::InitConfigMapAction::Skip => {
            debug!("ConfigMap {} is up to date", name);
            Ok(())
        }
        configmap::InitConfigMapAction::Apply => {
            let init_sql = db.spec.init_sql().unwrap_or_default();
            let desired = configmap::generate_init_configmap(db, init_sql);
            apply_resource(ctx, ns, &desired).await
        }
    }
}

/// Ensure the workload Deployment
///
/// Besides the replica count and command, this keeps the optional init
/// volume/mount pair in sync with whether `initSQL` is currently non-empty.
async fn ensure_deployment(db: &SqliteDatabase, ctx: &Context, ns: &str) -> Result<()> {
    let api: Api<Deployment> = Api::namespaced(ctx.client.clone(), ns);
    let desired = deployment::generate_deployment(db);
    let name = desired.name_any();

    match api.get_opt(&name).await? {
        Some(current) if !deployment::needs_update(&current, &desired) => {
            debug!("Deployment {} is up to date", name);
            Ok(())
        }
        _ => apply_resource(ctx, ns, &desired).await,
    }
}

/// Ensure the endpoint Service
async fn ensure_service(db: &SqliteDatabase, ctx: &Context, ns: &str) -> Result<()> {
    let api: Api<Service> = Api::namespaced(ctx.client.clone(), ns);
    let desired = service::generate_service(db);
    let name = desired.name_any();

    match api.get_opt(&name).await? {
        Some(current) if !service::needs_update(&current, &desired) => {
            debug!("Service {} is up to date", name);
            Ok(())
        }
        _ => apply_resource(ctx, ns, &desired).await,
    }
}

/// Apply a Kubernetes resource using server-side apply
///
/// Server-side apply only takes ownership of the fields this operator sets,
/// so concurrent mutation of unrelated fields by other actors survives. A
/// 409 from a lost write race surfaces as a retryable error.
async fn apply_resource<T>(ctx: &Context, ns: &str, resource: &T) -> Result<()>
where
    T: kube::Resource<Scope = k8s_openapi::NamespaceResourceScope>
        + serde::Serialize
        + DeserializeOwned
        + Clone
        + std::fmt::Debug,
    <T as kube::Resource>::DynamicType: Default,
{
    let api: Api<T> = Api::namespaced(ctx.client.clone(), ns);
    let name = resource.name_any();

    let patch = Patch::Apply(resource);
    let params = PatchParams::apply(FIELD_MANAGER).force();

    api.patch(&name, &params, &patch).await?;
    debug!("Applied resource: {}", name);

    Ok(())
}

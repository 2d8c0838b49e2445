//! Init ConfigMap generation for bootstrap SQL

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::ConfigMap;
use kube::core::ObjectMeta;
use kube::ResourceExt;

use crate::crd::SqliteDatabase;
use crate::resources::common::{
    init_configmap_name, owner_reference, owner_reference_missing, standard_labels, INIT_SQL_KEY,
};

/// Generate the `<name>-init` ConfigMap holding the bootstrap SQL
///
/// Only called when `initSQL` is non-empty. The SQL text is stored verbatim
/// under a single fixed key; the workload mounts it read-only and feeds it
/// to the engine on startup.
pub fn generate_init_configmap(db: &SqliteDatabase, init_sql: &str) -> ConfigMap {
    let db_name = db.name_any();

    ConfigMap {
        metadata: ObjectMeta {
            name: Some(init_configmap_name(&db_name)),
            namespace: db.namespace(),
            labels: Some(standard_labels(&db_name)),
            owner_references: Some(vec![owner_reference(db)]),
            ..Default::default()
        },
        data: Some(BTreeMap::from([(
            INIT_SQL_KEY.to_string(),
            init_sql.to_string(),
        )])),
        ..Default::default()
    }
}

/// Check whether the live ConfigMap differs from the desired one in its
/// data or has lost the owner reference.
pub fn needs_update(current: &ConfigMap, desired: &ConfigMap) -> bool {
    owner_reference_missing(&current.metadata, &desired.metadata) || current.data != desired.data
}

/// What a reconciliation pass does with the init ConfigMap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitConfigMapAction {
    /// Create or rewrite the ConfigMap
    Apply,
    /// Live object already matches; no write
    Skip,
    /// No bootstrap SQL in the spec: nothing is written, and an existing
    /// ConfigMap from a previously non-empty value is left in place until
    /// the owner cascade collects it
    Leave,
}

/// Decide the action for the init ConfigMap from the spec and the live object.
///
/// Pure decision function; the ensure step executes whatever it returns.
pub fn plan(db: &SqliteDatabase, current: Option<&ConfigMap>) -> InitConfigMapAction {
    let Some(init_sql) = db.spec.init_sql() else {
        return InitConfigMapAction::Leave;
    };

    let desired = generate_init_configmap(db, init_sql);
    match current {
        Some(current) if !needs_update(current, &desired) => InitConfigMapAction::Skip,
        _ => InitConfigMapAction::Apply,
    }
}

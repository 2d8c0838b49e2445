//! Common utilities for Kubernetes resource generation
//!
//! Shared constants, labels, and owner-reference wiring used by all
//! resource generators.

use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::ResourceExt;

use crate::crd::SqliteDatabase;

/// API version for the SqliteDatabase CRD
pub const API_VERSION: &str = "database.example.com/v1";

/// Kind for the SqliteDatabase CRD
pub const KIND: &str = "SqliteDatabase";

/// Operator field manager name for server-side apply
pub const FIELD_MANAGER: &str = "sqlite-operator";

/// Container image running the SQLite engine
pub const SQLITE_IMAGE: &str = "keinos/sqlite3:latest";

/// Mount path for the database volume
pub const DATA_MOUNT_PATH: &str = "/data";

/// Mount path for the bootstrap SQL volume
pub const INIT_MOUNT_PATH: &str = "/init";

/// Key in the init ConfigMap holding the bootstrap SQL
pub const INIT_SQL_KEY: &str = "init.sql";

/// Port exposed by the database workload and service
pub const DATABASE_PORT: i32 = 8080;

/// Name of the PersistentVolumeClaim for a database
pub fn storage_name(db_name: &str) -> String {
    format!("{}-storage", db_name)
}

/// Name of the init ConfigMap for a database
pub fn init_configmap_name(db_name: &str) -> String {
    format!("{}-init", db_name)
}

/// Name of the Service for a database
pub fn service_name(db_name: &str) -> String {
    format!("{}-service", db_name)
}

/// Generate an owner reference for a SqliteDatabase
///
/// Every dependent carries this reference so the garbage collector removes
/// it when the database resource is deleted. The operator never deletes
/// dependents itself.
pub fn owner_reference(db: &SqliteDatabase) -> OwnerReference {
    OwnerReference {
        api_version: API_VERSION.to_string(),
        kind: KIND.to_string(),
        name: db.name_any(),
        uid: db.metadata.uid.clone().unwrap_or_default(),
        controller: Some(true),
        block_owner_deletion: Some(true),
    }
}

/// Check whether the live object has lost the controller owner reference
/// carried by the desired object.
///
/// Cascade deletion depends on the reference being present, so every
/// up-to-date check treats a stripped reference as a difference and the
/// next apply re-asserts ownership.
pub fn owner_reference_missing(
    current: &kube::core::ObjectMeta,
    desired: &kube::core::ObjectMeta,
) -> bool {
    let Some(want) = desired.owner_references.as_ref().and_then(|refs| refs.first()) else {
        return false;
    };

    !current.owner_references.as_ref().is_some_and(|refs| {
        refs.iter()
            .any(|r| r.uid == want.uid && r.kind == want.kind && r.name == want.name)
    })
}

/// Labels selecting the workload pods for a database
///
/// The Service selector and the Deployment selector both match on this set,
/// so it must stay stable across reconciliations.
pub fn selector_labels(db_name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([("app".to_string(), db_name.to_string())])
}

/// Standard labels for all resources belonging to a SqliteDatabase
pub fn standard_labels(db_name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("app".to_string(), db_name.to_string()),
        ("app.kubernetes.io/name".to_string(), db_name.to_string()),
        (
            "app.kubernetes.io/component".to_string(),
            "sqlite".to_string(),
        ),
        (
            "app.kubernetes.io/managed-by".to_string(),
            FIELD_MANAGER.to_string(),
        ),
    ])
}

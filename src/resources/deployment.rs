//! Deployment generation for the SQLite workload
//!
//! The workload runs a single container that (a) applies the bootstrap SQL
//! when an init volume is mounted, tolerating failure since the database
//! file may already be initialized, and (b) checkpoints the database file
//! over itself with a 30 second busy-timeout.
//!
//! The database file name never appears inside the shell command string.
//! It is exported through an environment variable and expanded by the shell
//! at runtime, so spec values cannot inject shell syntax. Validation
//! additionally restricts the name to a path-safe character set before any
//! builder runs.

use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    ConfigMapVolumeSource, Container, ContainerPort, EnvVar,
    PersistentVolumeClaimVolumeSource, PodSpec, PodTemplateSpec, Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use kube::core::ObjectMeta;
use kube::ResourceExt;

use crate::crd::SqliteDatabase;
use crate::resources::common::{
    init_configmap_name, owner_reference, owner_reference_missing, selector_labels,
    standard_labels, storage_name, DATABASE_PORT, DATA_MOUNT_PATH, INIT_MOUNT_PATH, INIT_SQL_KEY,
    SQLITE_IMAGE,
};

/// Environment variable carrying the database file name into the container
pub const DATABASE_NAME_ENV: &str = "SQLITE_DATABASE";

/// Busy-timeout passed to the engine's backup step, in milliseconds
const BUSY_TIMEOUT_MS: u32 = 30_000;

/// Volume name for the database storage claim
const STORAGE_VOLUME: &str = "storage";

/// Volume name for the bootstrap SQL ConfigMap
const INIT_VOLUME: &str = "init-sql";

/// Build the container startup script.
///
/// The script only ever references the database through `$SQLITE_DATABASE`;
/// no spec value is interpolated into it.
pub fn container_script(has_init: bool) -> String {
    let db_file = format!("{}/${{{}}}.db", DATA_MOUNT_PATH, DATABASE_NAME_ENV);
    let mut steps = Vec::new();
    if has_init {
        // The database file may already be initialized; a failing init run
        // must not prevent the backup step.
        steps.push(format!(
            "sqlite3 \"{}\" < {}/{} || true",
            db_file, INIT_MOUNT_PATH, INIT_SQL_KEY
        ));
    }
    steps.push(format!(
        "sqlite3 \"{}\" '.timeout {}' \".backup {}\"",
        db_file, BUSY_TIMEOUT_MS, db_file
    ));
    steps.join("; ")
}

/// Generate the `<name>` Deployment for the database workload
pub fn generate_deployment(db: &SqliteDatabase) -> Deployment {
    let db_name = db.name_any();
    let has_init = db.spec.init_sql().is_some();

    let mut volume_mounts = vec![VolumeMount {
        name: STORAGE_VOLUME.to_string(),
        mount_path: DATA_MOUNT_PATH.to_string(),
        ..Default::default()
    }];
    let mut volumes = vec![Volume {
        name: STORAGE_VOLUME.to_string(),
        persistent_volume_claim: Some(PersistentVolumeClaimVolumeSource {
            claim_name: storage_name(&db_name),
            ..Default::default()
        }),
        ..Default::default()
    }];

    // The init volume pair tracks whether initSQL is currently non-empty,
    // so clearing the field also removes the mount on the next pass.
    if has_init {
        volume_mounts.push(VolumeMount {
            name: INIT_VOLUME.to_string(),
            mount_path: INIT_MOUNT_PATH.to_string(),
            read_only: Some(true),
            ..Default::default()
        });
        volumes.push(Volume {
            name: INIT_VOLUME.to_string(),
            config_map: Some(ConfigMapVolumeSource {
                name: init_configmap_name(&db_name),
                ..Default::default()
            }),
            ..Default::default()
        });
    }

    let container = Container {
        name: "sqlite".to_string(),
        image: Some(SQLITE_IMAGE.to_string()),
        command: Some(vec![
            "sh".to_string(),
            "-c".to_string(),
            container_script(has_init),
        ]),
        env: Some(vec![EnvVar {
            name: DATABASE_NAME_ENV.to_string(),
            value: Some(db.spec.database_name.clone()),
            ..Default::default()
        }]),
        volume_mounts: Some(volume_mounts),
        ports: Some(vec![ContainerPort {
            container_port: DATABASE_PORT,
            protocol: Some("TCP".to_string()),
            ..Default::default()
        }]),
        ..Default::default()
    };

    Deployment {
        metadata: ObjectMeta {
            name: Some(db_name.clone()),
            namespace: db.namespace(),
            labels: Some(standard_labels(&db_name)),
            owner_references: Some(vec![owner_reference(db)]),
            ..Default::default()
        },
        spec: Some(DeploymentSpec {
            replicas: Some(db.spec.replica_count()),
            selector: LabelSelector {
                match_labels: Some(selector_labels(&db_name)),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(selector_labels(&db_name)),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![container],
                    volumes: Some(volumes),
                    ..Default::default()
                }),
                ..Default::default()
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Check whether the live Deployment differs from the desired one in any
/// field this operator owns.
///
/// The live object carries server-side defaults the operator never sets,
/// so only the managed subset is compared: the owner reference, replica
/// count, container image, command, environment, mounts, and the pod volumes.
pub fn needs_update(current: &Deployment, desired: &Deployment) -> bool {
    if owner_reference_missing(&current.metadata, &desired.metadata) {
        return true;
    }

    let current_spec = current.spec.as_ref();
    let desired_spec = desired.spec.as_ref();

    if current_spec.and_then(|s| s.replicas) != desired_spec.and_then(|s| s.replicas) {
        return true;
    }

    let current_pod = current_spec.and_then(|s| s.template.spec.as_ref());
    let desired_pod = desired_spec.and_then(|s| s.template.spec.as_ref());

    let current_container = current_pod.and_then(|p| p.containers.first());
    let desired_container = desired_pod.and_then(|p| p.containers.first());

    match (current_container, desired_container) {
        (Some(cur), Some(want)) => {
            if cur.image != want.image
                || cur.command != want.command
                || cur.env != want.env
                || cur.volume_mounts != want.volume_mounts
            {
                return true;
            }
        }
        _ => return true,
    }

    let volume_names = |pod: Option<&PodSpec>| -> Vec<String> {
        pod.and_then(|p| p.volumes.as_ref())
            .map(|vs| vs.iter().map(|v| v.name.clone()).collect())
            .unwrap_or_default()
    };

    volume_names(current_pod) != volume_names(desired_pod)
}

//! PersistentVolumeClaim generation for the database volume

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{
    PersistentVolumeClaim, PersistentVolumeClaimSpec, VolumeResourceRequirements,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use kube::core::ObjectMeta;
use kube::ResourceExt;

use crate::crd::SqliteDatabase;
use crate::resources::common::{
    owner_reference, owner_reference_missing, standard_labels, storage_name,
};

/// Generate the `<name>-storage` PersistentVolumeClaim
///
/// Capacity comes from `storage.size`, then the deprecated `storageSize`
/// alias, then "1Gi". The claim is single-writer since SQLite does not
/// support concurrent writers across nodes.
pub fn generate_pvc(db: &SqliteDatabase) -> PersistentVolumeClaim {
    let db_name = db.name_any();

    PersistentVolumeClaim {
        metadata: ObjectMeta {
            name: Some(storage_name(&db_name)),
            namespace: db.namespace(),
            labels: Some(standard_labels(&db_name)),
            owner_references: Some(vec![owner_reference(db)]),
            ..Default::default()
        },
        spec: Some(PersistentVolumeClaimSpec {
            access_modes: Some(vec!["ReadWriteOnce".to_string()]),
            resources: Some(VolumeResourceRequirements {
                requests: Some(BTreeMap::from([(
                    "storage".to_string(),
                    Quantity(db.spec.effective_storage_size().to_string()),
                )])),
                ..Default::default()
            }),
            storage_class_name: db.spec.storage.storage_class.clone(),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Check whether the live claim differs from the desired one in any field
/// this operator owns.
///
/// Requested capacity, the storage class, and the owner reference are
/// compared; access modes are immutable after creation and everything else
/// belongs to the cluster.
pub fn needs_update(current: &PersistentVolumeClaim, desired: &PersistentVolumeClaim) -> bool {
    if owner_reference_missing(&current.metadata, &desired.metadata) {
        return true;
    }

    let current_requests = current
        .spec
        .as_ref()
        .and_then(|s| s.resources.as_ref())
        .and_then(|r| r.requests.as_ref());
    let desired_requests = desired
        .spec
        .as_ref()
        .and_then(|s| s.resources.as_ref())
        .and_then(|r| r.requests.as_ref());

    if current_requests != desired_requests {
        return true;
    }

    let desired_class = desired.spec.as_ref().and_then(|s| s.storage_class_name.as_ref());
    let current_class = current.spec.as_ref().and_then(|s| s.storage_class_name.as_ref());

    // An unset desired class means "platform default"; the live object will
    // have the defaulted class filled in, which is not a difference.
    desired_class.is_some() && desired_class != current_class
}

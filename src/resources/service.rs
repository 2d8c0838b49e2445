//! Service generation for the database endpoint
//!
//! Each database gets a single cluster-internal service routing to its
//! workload pods by the `app` label.

use k8s_openapi::api::core::v1::{Service, ServicePort, ServiceSpec};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::core::ObjectMeta;
use kube::ResourceExt;

use crate::crd::SqliteDatabase;
use crate::resources::common::{
    owner_reference, owner_reference_missing, selector_labels, service_name, standard_labels,
    DATABASE_PORT,
};

/// Generate the `<name>-service` ClusterIP Service
pub fn generate_service(db: &SqliteDatabase) -> Service {
    let db_name = db.name_any();

    Service {
        metadata: ObjectMeta {
            name: Some(service_name(&db_name)),
            namespace: db.namespace(),
            labels: Some(standard_labels(&db_name)),
            owner_references: Some(vec![owner_reference(db)]),
            ..Default::default()
        },
        spec: Some(ServiceSpec {
            selector: Some(selector_labels(&db_name)),
            ports: Some(vec![ServicePort {
                port: DATABASE_PORT,
                target_port: Some(IntOrString::Int(DATABASE_PORT)),
                protocol: Some("TCP".to_string()),
                ..Default::default()
            }]),
            type_: Some("ClusterIP".to_string()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Check whether the live Service differs from the desired one in any field
/// this operator owns (owner reference, selector, ports, type).
pub fn needs_update(current: &Service, desired: &Service) -> bool {
    if owner_reference_missing(&current.metadata, &desired.metadata) {
        return true;
    }

    let current_spec = current.spec.as_ref();
    let desired_spec = desired.spec.as_ref();

    let selector = |s: Option<&ServiceSpec>| s.and_then(|s| s.selector.clone());
    if selector(current_spec) != selector(desired_spec) {
        return true;
    }

    let ports = |s: Option<&ServiceSpec>| -> Vec<(i32, Option<IntOrString>)> {
        s.and_then(|s| s.ports.as_ref())
            .map(|ps| {
                ps.iter()
                    .map(|p| (p.port, p.target_port.clone()))
                    .collect()
            })
            .unwrap_or_default()
    };
    if ports(current_spec) != ports(desired_spec) {
        return true;
    }

    let type_ = |s: Option<&ServiceSpec>| s.and_then(|s| s.type_.clone());
    type_(current_spec) != type_(desired_spec)
}

//! Unit tests for resource generators
//!
//! Tests for PVC, ConfigMap, Deployment, and Service generation, plus the
//! up-to-date predicates that make a no-change pass issue zero writes.

use crate::fixtures::{create_test_db, SqliteDatabaseBuilder};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use kube::ResourceExt;
use sqlite_operator::resources::{configmap, deployment, pvc, service};

mod pvc_tests {
    use super::*;

    fn requested_storage(claim: &k8s_openapi::api::core::v1::PersistentVolumeClaim) -> Quantity {
        claim
            .spec
            .as_ref()
            .unwrap()
            .resources
            .as_ref()
            .unwrap()
            .requests
            .as_ref()
            .unwrap()
            .get("storage")
            .unwrap()
            .clone()
    }

    #[test]
    fn test_pvc_name_and_namespace() {
        let db = create_test_db("mydb", "default");
        let claim = pvc::generate_pvc(&db);
        assert_eq!(claim.name_any(), "mydb-storage");
        assert_eq!(claim.namespace(), Some("default".to_string()));
    }

    #[test]
    fn test_pvc_capacity_from_nested_field() {
        let db = SqliteDatabaseBuilder::new("mydb", "default")
            .with_storage_size("5Gi")
            .build();
        let claim = pvc::generate_pvc(&db);
        assert_eq!(requested_storage(&claim), Quantity("5Gi".to_string()));
    }

    #[test]
    fn test_pvc_capacity_from_legacy_field() {
        let db = SqliteDatabaseBuilder::new("mydb", "default")
            .with_legacy_storage_size("2Gi")
            .build();
        let claim = pvc::generate_pvc(&db);
        assert_eq!(requested_storage(&claim), Quantity("2Gi".to_string()));
    }

    #[test]
    fn test_pvc_capacity_default() {
        let db = create_test_db("mydb", "default");
        let claim = pvc::generate_pvc(&db);
        assert_eq!(requested_storage(&claim), Quantity("1Gi".to_string()));
    }

    #[test]
    fn test_pvc_nested_field_wins_over_legacy() {
        let db = SqliteDatabaseBuilder::new("mydb", "default")
            .with_storage_size("5Gi")
            .with_legacy_storage_size("2Gi")
            .build();
        let claim = pvc::generate_pvc(&db);
        assert_eq!(requested_storage(&claim), Quantity("5Gi".to_string()));
    }

    #[test]
    fn test_pvc_access_mode_is_single_writer() {
        let db = create_test_db("mydb", "default");
        let claim = pvc::generate_pvc(&db);
        assert_eq!(
            claim.spec.as_ref().unwrap().access_modes,
            Some(vec!["ReadWriteOnce".to_string()])
        );
    }

    #[test]
    fn test_pvc_storage_class() {
        let db = create_test_db("mydb", "default");
        let claim = pvc::generate_pvc(&db);
        assert_eq!(claim.spec.as_ref().unwrap().storage_class_name, None);

        let db = SqliteDatabaseBuilder::new("mydb", "default")
            .with_storage_class("fast-ssd")
            .build();
        let claim = pvc::generate_pvc(&db);
        assert_eq!(
            claim.spec.as_ref().unwrap().storage_class_name,
            Some("fast-ssd".to_string())
        );
    }

    #[test]
    fn test_pvc_owner_reference() {
        let db = create_test_db("mydb", "default");
        let claim = pvc::generate_pvc(&db);
        let owners = claim.metadata.owner_references.as_ref().unwrap();
        assert_eq!(owners.len(), 1);
        assert_eq!(owners[0].kind, "SqliteDatabase");
        assert_eq!(owners[0].name, "mydb");
        assert!(owners[0].controller.unwrap_or(false));
    }

    #[test]
    fn test_pvc_unchanged_needs_no_update() {
        let db = create_test_db("mydb", "default");
        let desired = pvc::generate_pvc(&db);
        assert!(!pvc::needs_update(&desired.clone(), &desired));
    }

    #[test]
    fn test_pvc_capacity_change_needs_update() {
        let db = create_test_db("mydb", "default");
        let current = pvc::generate_pvc(&db);
        let grown = SqliteDatabaseBuilder::new("mydb", "default")
            .with_storage_size("10Gi")
            .build();
        let desired = pvc::generate_pvc(&grown);
        assert!(pvc::needs_update(&current, &desired));
    }

    #[test]
    fn test_pvc_defaulted_storage_class_is_not_a_diff() {
        // The live object has the cluster default filled in; an unset desired
        // class must not force a write
        let db = create_test_db("mydb", "default");
        let mut current = pvc::generate_pvc(&db);
        current.spec.as_mut().unwrap().storage_class_name = Some("standard".to_string());
        let desired = pvc::generate_pvc(&db);
        assert!(!pvc::needs_update(&current, &desired));
    }
}

mod configmap_tests {
    use super::*;

    #[test]
    fn test_configmap_holds_sql_verbatim() {
        let sql = "CREATE TABLE users (id INTEGER PRIMARY KEY);\n";
        let db = SqliteDatabaseBuilder::new("mydb", "default")
            .with_init_sql(sql)
            .build();
        let cm = configmap::generate_init_configmap(&db, db.spec.init_sql().unwrap());

        assert_eq!(cm.name_any(), "mydb-init");
        assert_eq!(
            cm.data.as_ref().unwrap().get("init.sql"),
            Some(&sql.to_string())
        );
    }

    #[test]
    fn test_configmap_owner_reference() {
        let db = SqliteDatabaseBuilder::new("mydb", "default")
            .with_init_sql("SELECT 1;")
            .build();
        let cm = configmap::generate_init_configmap(&db, "SELECT 1;");
        let owners = cm.metadata.owner_references.as_ref().unwrap();
        assert_eq!(owners[0].name, "mydb");
    }

    #[test]
    fn test_cleared_init_sql_leaves_existing_configmap() {
        let with_init = SqliteDatabaseBuilder::new("mydb", "default")
            .with_init_sql("SELECT 1;")
            .build();
        let existing = configmap::generate_init_configmap(&with_init, "SELECT 1;");

        // Toggling initSQL back to empty takes no action at all: the pass
        // neither rewrites nor deletes the ConfigMap, which survives until
        // the owner cascade collects it
        let cleared = create_test_db("mydb", "default");
        assert_eq!(
            configmap::plan(&cleared, Some(&existing)),
            configmap::InitConfigMapAction::Leave
        );
        assert_eq!(
            configmap::plan(&cleared, None),
            configmap::InitConfigMapAction::Leave
        );
    }

    #[test]
    fn test_init_configmap_plan_applies_and_skips() {
        let db = SqliteDatabaseBuilder::new("mydb", "default")
            .with_init_sql("SELECT 1;")
            .build();

        // First pass creates, matching live object skips, changed SQL rewrites
        assert_eq!(
            configmap::plan(&db, None),
            configmap::InitConfigMapAction::Apply
        );
        let live = configmap::generate_init_configmap(&db, "SELECT 1;");
        assert_eq!(
            configmap::plan(&db, Some(&live)),
            configmap::InitConfigMapAction::Skip
        );
        let stale = configmap::generate_init_configmap(&db, "SELECT 2;");
        assert_eq!(
            configmap::plan(&db, Some(&stale)),
            configmap::InitConfigMapAction::Apply
        );
    }

    #[test]
    fn test_configmap_unchanged_needs_no_update() {
        let db = SqliteDatabaseBuilder::new("mydb", "default")
            .with_init_sql("SELECT 1;")
            .build();
        let desired = configmap::generate_init_configmap(&db, "SELECT 1;");
        assert!(!configmap::needs_update(&desired.clone(), &desired));

        let changed = configmap::generate_init_configmap(&db, "SELECT 2;");
        assert!(configmap::needs_update(&desired, &changed));
    }
}

mod deployment_tests {
    use super::*;

    #[test]
    fn test_deployment_name_and_selector() {
        let db = create_test_db("mydb", "default");
        let deploy = deployment::generate_deployment(&db);

        assert_eq!(deploy.name_any(), "mydb");
        let selector = deploy
            .spec
            .as_ref()
            .unwrap()
            .selector
            .match_labels
            .as_ref()
            .unwrap();
        assert_eq!(selector.get("app"), Some(&"mydb".to_string()));
    }

    #[test]
    fn test_deployment_replicas_default_to_one() {
        let db = create_test_db("mydb", "default");
        let deploy = deployment::generate_deployment(&db);
        assert_eq!(deploy.spec.as_ref().unwrap().replicas, Some(1));
    }

    #[test]
    fn test_deployment_replicas_from_spec() {
        let db = SqliteDatabaseBuilder::new("mydb", "default")
            .with_replicas(3)
            .build();
        let deploy = deployment::generate_deployment(&db);
        assert_eq!(deploy.spec.as_ref().unwrap().replicas, Some(3));
    }

    #[test]
    fn test_deployment_database_name_passed_by_env_not_command() {
        let db = SqliteDatabaseBuilder::new("mydb", "default")
            .with_database_name("orders")
            .build();
        let deploy = deployment::generate_deployment(&db);

        let container = &deploy
            .spec
            .as_ref()
            .unwrap()
            .template
            .spec
            .as_ref()
            .unwrap()
            .containers[0];

        // The spec value travels in the env var, never in the command string
        let env = container.env.as_ref().unwrap();
        assert!(env
            .iter()
            .any(|e| e.name == "SQLITE_DATABASE" && e.value.as_deref() == Some("orders")));

        let script = &container.command.as_ref().unwrap()[2];
        assert!(!script.contains("orders"));
        assert!(script.contains("${SQLITE_DATABASE}"));
    }

    #[test]
    fn test_deployment_without_init_has_single_volume() {
        let db = create_test_db("mydb", "default");
        let deploy = deployment::generate_deployment(&db);
        let pod = deploy.spec.as_ref().unwrap().template.spec.as_ref().unwrap();

        let volumes = pod.volumes.as_ref().unwrap();
        assert_eq!(volumes.len(), 1);
        assert_eq!(
            volumes[0]
                .persistent_volume_claim
                .as_ref()
                .unwrap()
                .claim_name,
            "mydb-storage"
        );

        let mounts = pod.containers[0].volume_mounts.as_ref().unwrap();
        assert_eq!(mounts.len(), 1);
        assert_eq!(mounts[0].mount_path, "/data");
    }

    #[test]
    fn test_deployment_with_init_mounts_configmap_read_only() {
        let db = SqliteDatabaseBuilder::new("mydb", "default")
            .with_init_sql("SELECT 1;")
            .build();
        let deploy = deployment::generate_deployment(&db);
        let pod = deploy.spec.as_ref().unwrap().template.spec.as_ref().unwrap();

        let volumes = pod.volumes.as_ref().unwrap();
        assert_eq!(volumes.len(), 2);
        assert_eq!(
            volumes[1].config_map.as_ref().unwrap().name,
            "mydb-init"
        );

        let mounts = pod.containers[0].volume_mounts.as_ref().unwrap();
        assert_eq!(mounts.len(), 2);
        assert_eq!(mounts[1].mount_path, "/init");
        assert_eq!(mounts[1].read_only, Some(true));
    }

    #[test]
    fn test_deployment_clearing_init_sql_drops_the_mount() {
        let with_init = SqliteDatabaseBuilder::new("mydb", "default")
            .with_init_sql("SELECT 1;")
            .build();
        let cleared = create_test_db("mydb", "default");

        let current = deployment::generate_deployment(&with_init);
        let desired = deployment::generate_deployment(&cleared);

        // The init volume pair tracks the current spec, so the ensure step
        // must see a difference and rewrite the workload
        assert!(deployment::needs_update(&current, &desired));
        let pod = desired.spec.as_ref().unwrap().template.spec.as_ref().unwrap();
        assert_eq!(pod.volumes.as_ref().unwrap().len(), 1);
    }

    #[test]
    fn test_deployment_port() {
        let db = create_test_db("mydb", "default");
        let deploy = deployment::generate_deployment(&db);
        let ports = deploy
            .spec
            .as_ref()
            .unwrap()
            .template
            .spec
            .as_ref()
            .unwrap()
            .containers[0]
            .ports
            .as_ref()
            .unwrap();
        assert_eq!(ports[0].container_port, 8080);
    }

    #[test]
    fn test_deployment_owner_reference() {
        let db = create_test_db("mydb", "default");
        let deploy = deployment::generate_deployment(&db);
        let owners = deploy.metadata.owner_references.as_ref().unwrap();
        assert_eq!(owners[0].kind, "SqliteDatabase");
        assert_eq!(owners[0].name, "mydb");
    }

    #[test]
    fn test_deployment_unchanged_needs_no_update() {
        let db = SqliteDatabaseBuilder::new("mydb", "default")
            .with_init_sql("SELECT 1;")
            .with_replicas(2)
            .build();
        let desired = deployment::generate_deployment(&db);
        assert!(!deployment::needs_update(&desired.clone(), &desired));
    }

    #[test]
    fn test_deployment_replica_change_needs_update() {
        let current = deployment::generate_deployment(&create_test_db("mydb", "default"));
        let scaled = SqliteDatabaseBuilder::new("mydb", "default")
            .with_replicas(3)
            .build();
        let desired = deployment::generate_deployment(&scaled);
        assert!(deployment::needs_update(&current, &desired));
    }
}

mod service_tests {
    use super::*;

    #[test]
    fn test_service_name_selector_and_port() {
        let db = create_test_db("mydb", "default");
        let svc = service::generate_service(&db);

        assert_eq!(svc.name_any(), "mydb-service");
        let spec = svc.spec.as_ref().unwrap();
        assert_eq!(
            spec.selector.as_ref().unwrap().get("app"),
            Some(&"mydb".to_string())
        );
        assert_eq!(spec.ports.as_ref().unwrap()[0].port, 8080);
        assert_eq!(spec.type_, Some("ClusterIP".to_string()));
    }

    #[test]
    fn test_service_owner_reference() {
        let db = create_test_db("mydb", "default");
        let svc = service::generate_service(&db);
        let owners = svc.metadata.owner_references.as_ref().unwrap();
        assert_eq!(owners[0].kind, "SqliteDatabase");
        assert_eq!(owners[0].name, "mydb");
    }

    #[test]
    fn test_service_unchanged_needs_no_update() {
        let db = create_test_db("mydb", "default");
        let desired = service::generate_service(&db);
        assert!(!service::needs_update(&desired.clone(), &desired));
    }

    #[test]
    fn test_stripped_owner_reference_forces_reapply() {
        // Ownership is re-asserted on every pass: a dependent whose owner
        // reference was removed by another actor must not be treated as up
        // to date, or it would drop out of the deletion cascade
        let db = SqliteDatabaseBuilder::new("mydb", "default")
            .with_init_sql("SELECT 1;")
            .build();

        let desired_pvc = pvc::generate_pvc(&db);
        let mut live_pvc = desired_pvc.clone();
        live_pvc.metadata.owner_references = None;
        assert!(pvc::needs_update(&live_pvc, &desired_pvc));

        let desired_cm = configmap::generate_init_configmap(&db, "SELECT 1;");
        let mut live_cm = desired_cm.clone();
        live_cm.metadata.owner_references = None;
        assert!(configmap::needs_update(&live_cm, &desired_cm));

        let desired_deploy = deployment::generate_deployment(&db);
        let mut live_deploy = desired_deploy.clone();
        live_deploy.metadata.owner_references = Some(vec![]);
        assert!(deployment::needs_update(&live_deploy, &desired_deploy));

        let desired_svc = service::generate_service(&db);
        let mut live_svc = desired_svc.clone();
        live_svc.metadata.owner_references = None;
        assert!(service::needs_update(&live_svc, &desired_svc));
    }

    #[test]
    fn test_all_dependents_are_owned() {
        // Cascade deletion relies on every dependent carrying the owner
        // reference; the operator has no cleanup path of its own
        let db = SqliteDatabaseBuilder::new("mydb", "default")
            .with_init_sql("SELECT 1;")
            .build();

        let owners = [
            pvc::generate_pvc(&db).metadata.owner_references,
            configmap::generate_init_configmap(&db, "SELECT 1;")
                .metadata
                .owner_references,
            deployment::generate_deployment(&db).metadata.owner_references,
            service::generate_service(&db).metadata.owner_references,
        ];

        for refs in owners {
            let refs = refs.expect("dependent missing owner references");
            assert_eq!(refs.len(), 1);
            assert_eq!(refs[0].uid, "test-uid-12345");
            assert_eq!(refs[0].block_owner_deletion, Some(true));
        }
    }
}

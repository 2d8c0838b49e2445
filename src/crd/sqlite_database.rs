use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Default storage capacity when neither `storage.size` nor the deprecated
/// `storageSize` field is set.
pub const DEFAULT_STORAGE_SIZE: &str = "1Gi";

/// SqliteDatabase is the Schema for the sqlitedatabases API
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, JsonSchema)]
#[kube(
    group = "database.example.com",
    version = "v1",
    kind = "SqliteDatabase",
    plural = "sqlitedatabases",
    shortname = "sqldb",
    namespaced,
    status = "SqliteDatabaseStatus",
    printcolumn = r#"{"name":"Database", "type":"string", "jsonPath":".spec.databaseName"}"#,
    printcolumn = r#"{"name":"Phase", "type":"string", "jsonPath":".status.phase"}"#,
    printcolumn = r#"{"name":"Ready", "type":"boolean", "jsonPath":".status.ready"}"#,
    printcolumn = r#"{"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct SqliteDatabaseSpec {
    /// Name of the SQLite database file (without the .db suffix)
    pub database_name: String,

    /// Storage configuration for the database volume
    #[serde(default)]
    pub storage: StorageSpec,

    /// Requested storage size (deprecated, use storage.size)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_size: Option<String>,

    /// SQL statements executed when the database is first created
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "initSQL")]
    pub init_sql: Option<String>,

    /// Number of database replicas (for read scaling)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,

    /// Enable automatic backups.
    ///
    /// Advisory only: the workload always performs an inline self-backup on
    /// startup, regardless of this flag. No scheduled backup process exists yet.
    #[serde(default)]
    pub backup_enabled: bool,

    /// Backup schedule in cron format (advisory, not yet enforced)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_schedule: Option<String>,
}

/// Storage configuration for the database volume
#[derive(Serialize, Deserialize, Clone, Debug, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StorageSpec {
    /// Size of the persistent volume (e.g., "1Gi", "10Gi")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,

    /// Storage class name (uses the cluster default if not specified)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_class: Option<String>,
}

impl SqliteDatabaseSpec {
    /// Effective storage capacity: `storage.size`, then the deprecated
    /// `storageSize` alias, then the default.
    pub fn effective_storage_size(&self) -> &str {
        if let Some(size) = self.storage.size.as_deref() {
            if !size.is_empty() {
                return size;
            }
        }
        if let Some(size) = self.storage_size.as_deref() {
            if !size.is_empty() {
                return size;
            }
        }
        DEFAULT_STORAGE_SIZE
    }

    /// Replica count, defaulting to a single replica.
    pub fn replica_count(&self) -> i32 {
        self.replicas.unwrap_or(1)
    }

    /// Bootstrap SQL, treating empty or whitespace-only values as absent.
    pub fn init_sql(&self) -> Option<&str> {
        self.init_sql
            .as_deref()
            .filter(|sql| !sql.trim().is_empty())
    }
}

/// Status of a SqliteDatabase
#[derive(Serialize, Deserialize, Clone, Debug, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct SqliteDatabaseStatus {
    /// Current lifecycle phase of the database
    #[serde(default)]
    pub phase: DatabasePhase,

    /// Whether the database is ready to accept connections
    #[serde(default)]
    pub ready: bool,

    /// Current database file size
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_size: Option<String>,

    /// Timestamp of the last backup
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_backup: Option<String>,

    /// Name of a pod running the database
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pod_name: Option<String>,

    /// Kubernetes-style conditions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

/// Database lifecycle phase
///
/// Recomputed from live workload state on every reconciliation; no transition
/// history is kept.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, JsonSchema, Default, PartialEq, Eq)]
pub enum DatabasePhase {
    /// Workload has not been created yet (or cannot be read)
    #[default]
    Creating,
    /// Workload exists but reports no ready replicas
    Pending,
    /// At least one replica is ready
    Ready,
}

impl std::fmt::Display for DatabasePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatabasePhase::Creating => write!(f, "Creating"),
            DatabasePhase::Pending => write!(f, "Pending"),
            DatabasePhase::Ready => write!(f, "Ready"),
        }
    }
}

/// Kubernetes-style condition
#[derive(Serialize, Deserialize, Clone, Debug, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition
    #[serde(rename = "type")]
    pub type_: String,

    /// Status of the condition: True, False, or Unknown
    pub status: String,

    /// Reason for the condition's last transition
    pub reason: String,

    /// Human-readable message
    pub message: String,

    /// Last time the condition transitioned
    pub last_transition_time: String,

    /// Generation observed when condition was set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}

//! Test fixtures and builders for SqliteDatabase resources
//!
//! For simple cases use `create_test_db`; for anything else use the builder:
//!
//! ```rust,ignore
//! let db = SqliteDatabaseBuilder::new("mydb", "default")
//!     .with_init_sql("CREATE TABLE t (id INTEGER);")
//!     .with_replicas(3)
//!     .build();
//! ```

use kube::core::ObjectMeta;
use sqlite_operator::crd::{SqliteDatabase, SqliteDatabaseSpec, StorageSpec};

/// Create a basic test database with minimal configuration
pub fn create_test_db(name: &str, namespace: &str) -> SqliteDatabase {
    SqliteDatabaseBuilder::new(name, namespace).build()
}

/// Builder for SqliteDatabase test resources
pub struct SqliteDatabaseBuilder {
    name: String,
    namespace: String,
    database_name: String,
    storage_size: Option<String>,
    legacy_storage_size: Option<String>,
    storage_class: Option<String>,
    init_sql: Option<String>,
    replicas: Option<i32>,
}

impl SqliteDatabaseBuilder {
    pub fn new(name: &str, namespace: &str) -> Self {
        Self {
            name: name.to_string(),
            namespace: namespace.to_string(),
            database_name: "app".to_string(),
            storage_size: None,
            legacy_storage_size: None,
            storage_class: None,
            init_sql: None,
            replicas: None,
        }
    }

    pub fn with_database_name(mut self, database_name: &str) -> Self {
        self.database_name = database_name.to_string();
        self
    }

    pub fn with_storage_size(mut self, size: &str) -> Self {
        self.storage_size = Some(size.to_string());
        self
    }

    pub fn with_legacy_storage_size(mut self, size: &str) -> Self {
        self.legacy_storage_size = Some(size.to_string());
        self
    }

    pub fn with_storage_class(mut self, class: &str) -> Self {
        self.storage_class = Some(class.to_string());
        self
    }

    pub fn with_init_sql(mut self, sql: &str) -> Self {
        self.init_sql = Some(sql.to_string());
        self
    }

    pub fn with_replicas(mut self, replicas: i32) -> Self {
        self.replicas = Some(replicas);
        self
    }

    pub fn build(self) -> SqliteDatabase {
        SqliteDatabase {
            metadata: ObjectMeta {
                name: Some(self.name),
                namespace: Some(self.namespace),
                uid: Some("test-uid-12345".to_string()),
                generation: Some(1),
                ..Default::default()
            },
            spec: SqliteDatabaseSpec {
                database_name: self.database_name,
                storage: StorageSpec {
                    size: self.storage_size,
                    storage_class: self.storage_class,
                },
                storage_size: self.legacy_storage_size,
                init_sql: self.init_sql,
                replicas: self.replicas,
                backup_enabled: false,
                backup_schedule: None,
            },
            status: None,
        }
    }
}

//! Validation logic for SqliteDatabase specs
//!
//! The database name ends up in a filesystem path inside the workload
//! container and the storage size ends up in a PVC quantity, so both are
//! checked before any resource builder runs. Failures are permanent errors
//! surfaced on the resource's conditions.

use crate::controller::error::{Error, Result};
use crate::crd::SqliteDatabase;

/// Minimum number of replicas
pub const MIN_REPLICAS: i32 = 1;

/// Maximum number of replicas (arbitrary limit for safety)
pub const MAX_REPLICAS: i32 = 100;

/// Maximum database name length (kept below the DNS label limit so derived
/// object names stay valid)
pub const MAX_NAME_LENGTH: usize = 53;

/// Validate the database spec
pub fn validate_spec(db: &SqliteDatabase) -> Result<()> {
    validate_database_name(&db.spec.database_name)?;
    validate_replicas(db)?;
    validate_storage_size(db.spec.effective_storage_size())?;
    Ok(())
}

/// Validate the database file name
///
/// The name is passed to the workload through an environment variable and
/// expanded into a path under /data, so it must not contain shell or path
/// syntax. Allow-list: ASCII alphanumerics, underscore, hyphen.
fn validate_database_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::ValidationError(
            "databaseName must not be empty".to_string(),
        ));
    }

    if name.len() > MAX_NAME_LENGTH {
        return Err(Error::ValidationError(format!(
            "databaseName {:?} exceeds maximum length {}",
            name, MAX_NAME_LENGTH
        )));
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(Error::ValidationError(format!(
            "databaseName {:?} contains characters outside [A-Za-z0-9_-]",
            name
        )));
    }

    Ok(())
}

/// Validate replica count
fn validate_replicas(db: &SqliteDatabase) -> Result<()> {
    let replicas = db.spec.replica_count();

    if replicas < MIN_REPLICAS {
        return Err(Error::ValidationError(format!(
            "replica count {} is below minimum {}",
            replicas, MIN_REPLICAS
        )));
    }

    if replicas > MAX_REPLICAS {
        return Err(Error::ValidationError(format!(
            "replica count {} exceeds maximum {}",
            replicas, MAX_REPLICAS
        )));
    }

    Ok(())
}

/// Validate storage size format (e.g., "1Gi", "500Mi")
fn validate_storage_size(size: &str) -> Result<()> {
    if !size.ends_with("Gi") && !size.ends_with("Mi") && !size.ends_with("Ti") {
        return Err(Error::ValidationError(format!(
            "storage size must end with Gi, Mi, or Ti: {}",
            size
        )));
    }

    let num_str = size.trim_end_matches(char::is_alphabetic);
    let _num: u64 = num_str
        .parse()
        .map_err(|_| Error::ValidationError(format!("invalid storage size number: {}", size)))?;

    Ok(())
}

//! Prints the SqliteDatabase CustomResourceDefinition manifest as YAML.
//!
//! Usage: `cargo run --bin crdgen > deploy/crd.yaml`

use kube::CustomResourceExt;
use sqlite_operator::crd::SqliteDatabase;

fn main() {
    match serde_yaml::to_string(&SqliteDatabase::crd()) {
        Ok(yaml) => print!("{}", yaml),
        Err(e) => {
            eprintln!("Failed to serialize CRD: {}", e);
            std::process::exit(1);
        }
    }
}

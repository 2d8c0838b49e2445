pub mod common;
pub mod configmap;
pub mod deployment;
pub mod pvc;
pub mod service;

pub use common::{
    owner_reference, selector_labels, standard_labels, API_VERSION, FIELD_MANAGER, KIND,
};

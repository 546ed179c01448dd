//! Shared fixtures for store integration tests.

#![allow(dead_code)]

use serde_json::{json, Value};

use chartstore::{MemoryBackend, ResourceStore, StoreConfig};

/// A store over a fresh in-memory backend.
pub fn memory_store() -> ResourceStore<MemoryBackend> {
    ResourceStore::new(MemoryBackend::new(), StoreConfig::default())
}

/// A patient payload, optionally with a caller-supplied id.
pub fn patient_json(id: Option<&str>) -> Value {
    let mut patient = json!({
        "resourceType": "Patient",
        "name": [{"family": "Smith", "given": ["John"]}],
        "active": true
    });
    if let Some(id) = id {
        patient["id"] = json!(id);
    }
    patient
}

/// An observation payload owned by the given patient id.
pub fn observation_json(patient_id: &str) -> Value {
    json!({
        "resourceType": "Observation",
        "status": "final",
        "code": {"text": "heart rate"},
        "subject": {"reference": format!("Patient/{patient_id}")}
    })
}

/// An encounter payload owned by the given patient id.
pub fn encounter_json(patient_id: &str) -> Value {
    json!({
        "resourceType": "Encounter",
        "status": "finished",
        "subject": {"reference": format!("Patient/{patient_id}")}
    })
}

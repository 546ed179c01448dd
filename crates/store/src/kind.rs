//! The supported resource kind set.
//!
//! Resources are schema-tagged records; the tag must be a member of the
//! closed set defined here. Unknown tags are rejected before any backend
//! access with [`ValidationError::UnsupportedKind`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A member of the fixed supported-kind set.
///
/// The kind is immutable after creation and forms half of a resource's
/// identity. `Patient` is the owner kind: clinical-event kinds
/// (`Encounter`, `Observation`, `Condition`, `MedicationRequest`) must carry
/// a `subject.reference` pointing at a patient, which the store uses for
/// owner-index placement.
///
/// # Examples
///
/// ```
/// use chartstore::ResourceKind;
///
/// let kind: ResourceKind = "Patient".parse().unwrap();
/// assert_eq!(kind.as_str(), "Patient");
/// assert!(kind.is_owner_kind());
/// assert!("Spaceship".parse::<ResourceKind>().is_err());
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum ResourceKind {
    /// A person receiving care. The owner kind for index placement.
    Patient,
    /// A person delivering care.
    Practitioner,
    /// An interaction between a patient and the healthcare system.
    Encounter,
    /// A measurement or assertion made about a patient.
    Observation,
    /// A clinical condition, problem, or diagnosis.
    Condition,
    /// An order or request for medication.
    MedicationRequest,
}

impl ResourceKind {
    /// All supported kinds, in declaration order.
    pub const ALL: &'static [ResourceKind] = &[
        ResourceKind::Patient,
        ResourceKind::Practitioner,
        ResourceKind::Encounter,
        ResourceKind::Observation,
        ResourceKind::Condition,
        ResourceKind::MedicationRequest,
    ];

    /// Returns the wire tag for this kind.
    pub const fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Patient => "Patient",
            ResourceKind::Practitioner => "Practitioner",
            ResourceKind::Encounter => "Encounter",
            ResourceKind::Observation => "Observation",
            ResourceKind::Condition => "Condition",
            ResourceKind::MedicationRequest => "MedicationRequest",
        }
    }

    /// Returns `true` if this kind can own other resources.
    pub const fn is_owner_kind(self) -> bool {
        matches!(self, ResourceKind::Patient)
    }

    /// Returns `true` if payloads of this kind must carry an owner
    /// reference (`subject.reference`).
    pub const fn requires_owner(self) -> bool {
        matches!(
            self,
            ResourceKind::Encounter
                | ResourceKind::Observation
                | ResourceKind::Condition
                | ResourceKind::MedicationRequest
        )
    }

    /// Parses a kind tag, rejecting anything outside the supported set.
    pub fn parse(tag: &str) -> Result<Self, ValidationError> {
        match tag {
            "Patient" => Ok(ResourceKind::Patient),
            "Practitioner" => Ok(ResourceKind::Practitioner),
            "Encounter" => Ok(ResourceKind::Encounter),
            "Observation" => Ok(ResourceKind::Observation),
            "Condition" => Ok(ResourceKind::Condition),
            "MedicationRequest" => Ok(ResourceKind::MedicationRequest),
            _ => Err(ValidationError::UnsupportedKind {
                kind: tag.to_string(),
            }),
        }
    }
}

impl FromStr for ResourceKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResourceKind::parse(s)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//! Simulated intake data for the reference hospital.
//!
//! All values are fictional. The defaults match the admission desk's
//! standard intake form.

use carechain_contracts::record::{PatientVitals, Payload};

/// The standard intake vitals: a healthy adult at rest.
pub fn standard_intake() -> Payload {
    Payload::Vitals(PatientVitals::default())
}

/// A febrile, tachycardic patient with moderate symptoms.
pub fn febrile_intake() -> Payload {
    Payload::Vitals(PatientVitals {
        heart_rate: 108.0,
        systolic: 135.0,
        diastolic: 88.0,
        temperature: 39.2,
        oxygen_sat: 94.0,
        symptom_severity: 55.0,
    })
}

/// Reference ranges the simulated lab compares vitals against.
pub struct ReferenceVitals;

impl ReferenceVitals {
    pub const HEART_RATE: f64 = 72.0;
    pub const SYSTOLIC: f64 = 120.0;
    pub const DIASTOLIC: f64 = 80.0;
    pub const TEMPERATURE: f64 = 36.6;
    pub const OXYGEN_SAT: f64 = 98.0;
}

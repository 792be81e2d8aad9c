//! Simulated computation provider.
//!
//! Stands in for the confidential-compute backend. Each operation is a
//! deterministic function of the record, with a formula and derivation a
//! reviewer can re-check by hand. Nothing here is real cryptography: "lock"
//! only stamps a SHA-256 fingerprint of the plaintext onto the record.

use sha2::{Digest, Sha256};
use tracing::debug;

use carechain_contracts::{
    audit::Metrics,
    error::{CarechainError, CarechainResult},
    provider::Computation,
    record::{PatientVitals, Payload, Record},
};
use carechain_core::traits::ComputationProvider;

use crate::mock_data::ReferenceVitals;

/// Deterministic stand-in for the hospital's compute enclave.
#[derive(Debug, Default, Clone)]
pub struct SimulatedComputation;

impl SimulatedComputation {
    pub fn new() -> Self {
        Self
    }

    fn lock(&self, record: &Record) -> CarechainResult<Computation> {
        let payload_json = serde_json::to_vec(&record.payload)?;
        let mut hasher = Sha256::new();
        hasher.update(record.id.to_string().as_bytes());
        hasher.update(&payload_json);
        let fingerprint = hex::encode(hasher.finalize());

        let mut out = record.clone();
        out.sealed = Some(fingerprint.clone());

        let mut metrics = Metrics::new();
        metrics.insert("scheme".to_string(), "simulated-seal".into());
        metrics.insert("payload_bytes".to_string(), (payload_json.len() as f64).into());

        Ok(Computation {
            record: out,
            description: "Vitals locked. Record sealed for transit.".to_string(),
            formula: Some("seal = SHA-256(id || payload)".to_string()),
            derivation: vec![
                format!("payload = {} bytes", payload_json.len()),
                format!("seal = {}", &fingerprint[..16]),
            ],
            metrics,
        })
    }

    fn lab_analysis(&self, record: &Record) -> Computation {
        let (index, steps) = match &record.payload {
            Payload::Vitals(v) => abnormality_index(v),
            Payload::Scalar(x) => (x.abs(), vec![format!("index = |{x:.2}|")]),
        };

        let mut metrics = Metrics::new();
        metrics.insert("abnormality_index".to_string(), round2(index).into());

        Computation {
            record: record.clone(),
            description: format!("Biomarker panel analysed. Abnormality index {:.2}.", index),
            formula: Some("index = 100 * mean(|x - ref| / ref)".to_string()),
            derivation: steps,
            metrics,
        }
    }

    fn diagnosis(&self, record: &Record) -> Computation {
        let (risk, steps) = match &record.payload {
            Payload::Vitals(v) => {
                let (index, _) = abnormality_index(v);
                let risk = (0.5 * v.symptom_severity + 0.5 * index).min(100.0);
                (
                    risk,
                    vec![
                        format!("symptom term = 0.5 * {:.2}", v.symptom_severity),
                        format!("vitals term = 0.5 * {:.2}", index),
                        format!("risk = {:.2}", risk),
                    ],
                )
            }
            Payload::Scalar(x) => {
                let risk = x.abs().min(100.0);
                (risk, vec![format!("risk = min(|{x:.2}|, 100)")])
            }
        };

        let mut metrics = Metrics::new();
        metrics.insert("risk_score".to_string(), round2(risk).into());

        Computation {
            record: record.clone(),
            description: format!("Diagnostic model evaluated. Risk score {:.2}.", risk),
            formula: Some("risk = min(0.5 * symptom + 0.5 * index, 100)".to_string()),
            derivation: steps,
            metrics,
        }
    }

    fn review(&self, record: &Record) -> Computation {
        let mut metrics = Metrics::new();
        if let Some(severity) = record.severity {
            metrics.insert("prior_severity".to_string(), severity.into());
        }

        Computation {
            record: record.clone(),
            description: "Case reviewed inside the enclave and approved for billing.".to_string(),
            formula: None,
            derivation: vec![],
            metrics,
        }
    }

    fn billing(&self, record: &Record) -> Computation {
        let mut metrics = Metrics::new();
        metrics.insert("line_items".to_string(), (record.charges.len() as f64).into());

        Computation {
            record: record.clone(),
            description: "Final invoice generated from itemised charges.".to_string(),
            formula: Some("total = sum(charges)".to_string()),
            derivation: vec![],
            metrics,
        }
    }
}

impl ComputationProvider for SimulatedComputation {
    fn transform(&self, operation: &str, record: &Record) -> CarechainResult<Computation> {
        debug!(operation, record_id = %record.id, "simulated computation");
        match operation {
            "lock" => self.lock(record),
            "lab-analysis" => Ok(self.lab_analysis(record)),
            "diagnosis" => Ok(self.diagnosis(record)),
            "review" => Ok(self.review(record)),
            "billing" => Ok(self.billing(record)),
            other => Err(CarechainError::Computation {
                operation: other.to_string(),
                reason: "no such operation in the simulated enclave".to_string(),
            }),
        }
    }
}

/// Mean relative deviation of the vitals from their reference values, as a
/// 0-100 score. Oxygen saturation only counts when below reference.
fn abnormality_index(v: &PatientVitals) -> (f64, Vec<String>) {
    let deviations = [
        ("heart_rate", (v.heart_rate - ReferenceVitals::HEART_RATE).abs() / ReferenceVitals::HEART_RATE),
        ("systolic", (v.systolic - ReferenceVitals::SYSTOLIC).abs() / ReferenceVitals::SYSTOLIC),
        ("diastolic", (v.diastolic - ReferenceVitals::DIASTOLIC).abs() / ReferenceVitals::DIASTOLIC),
        (
            "temperature",
            (v.temperature - ReferenceVitals::TEMPERATURE).abs() / ReferenceVitals::TEMPERATURE,
        ),
        (
            "oxygen_sat",
            (ReferenceVitals::OXYGEN_SAT - v.oxygen_sat).max(0.0) / ReferenceVitals::OXYGEN_SAT,
        ),
    ];

    let mut steps: Vec<String> = deviations
        .iter()
        .map(|(name, d)| format!("{name} deviation = {:.4}", d))
        .collect();
    let index = 100.0 * deviations.iter().map(|(_, d)| d).sum::<f64>() / deviations.len() as f64;
    steps.push(format!("index = {:.2}", index));
    (index, steps)
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

//! Advisory providers: fixed fallbacks, a Cohere-backed generator, and a
//! latency wrapper.
//!
//! Every provider resolves to an `Advice`. Network failures, bad status
//! codes, and unparsable replies all end in the per-role fallback from
//! `config/hospital.toml`, logged at `warn`.

use std::collections::BTreeMap;
use std::time::Duration;

use futures::future::BoxFuture;
use regex::Regex;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use carechain_contracts::{
    error::{CarechainError, CarechainResult},
    provider::{Advice, AdvisoryRequest},
    record::Payload,
    role::AgentRole,
};
use carechain_core::traits::AdvisoryProvider;

use crate::config::{FallbackAdvice, HospitalConfig};

// ── Fallback ──────────────────────────────────────────────────────────────────

/// Answers every request from the fallback table, with no I/O.
#[derive(Debug, Clone)]
pub struct FallbackAdvisor {
    table: BTreeMap<AgentRole, FallbackAdvice>,
}

impl FallbackAdvisor {
    pub fn new(fallbacks: impl IntoIterator<Item = FallbackAdvice>) -> Self {
        Self {
            table: fallbacks.into_iter().map(|f| (f.role, f)).collect(),
        }
    }

    pub fn from_config(config: &HospitalConfig) -> Self {
        Self::new(config.fallbacks.iter().cloned())
    }

    /// The fallback answer for `request`. Roles without an entry are
    /// charged nothing.
    pub fn advice_for(&self, request: &AdvisoryRequest) -> Advice {
        let Some(entry) = self.table.get(&request.role) else {
            return Advice::new(0.0, format!("No advisory available for {}", request.role));
        };

        let annotation = if entry.carry_prior_severity {
            request.prior_severity.or(entry.annotation)
        } else {
            entry.annotation
        };
        let mut advice = Advice::new(entry.amount, entry.narrative.clone()).with_annotation(annotation);
        advice.findings = entry.findings.clone();
        advice
    }
}

impl AdvisoryProvider for FallbackAdvisor {
    fn advise(&self, request: AdvisoryRequest) -> BoxFuture<'_, Advice> {
        let advice = self.advice_for(&request);
        Box::pin(async move { advice })
    }
}

// ── Cohere ────────────────────────────────────────────────────────────────────

/// Cohere text-generation endpoint.
pub const COHERE_ENDPOINT: &str = "https://api.cohere.ai/v1/generate";

const COHERE_MODEL: &str = "command";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    generations: Vec<Generation>,
}

#[derive(Debug, Deserialize)]
struct Generation {
    text: String,
}

impl GenerateResponse {
    fn into_text(self) -> String {
        self.text
            .filter(|t| !t.is_empty())
            .or_else(|| self.generations.into_iter().next().map(|g| g.text))
            .unwrap_or_default()
    }
}

/// Asks a Cohere model for each agent's bill and severity.
///
/// The human doctor's fee is fixed by the fallback table; only its severity
/// is taken from the model.
pub struct CohereAdvisor {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    fallback: FallbackAdvisor,
    bill: Regex,
    severity: Regex,
    final_severity: Regex,
    biomarker: Regex,
}

impl CohereAdvisor {
    pub fn new(api_key: impl Into<String>, fallback: FallbackAdvisor) -> CarechainResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| CarechainError::ConfigError {
                reason: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            endpoint: COHERE_ENDPOINT.to_string(),
            fallback,
            bill: pattern(r"BILL:\s*\$(\d+)")?,
            severity: pattern(r"SEVERITY:\s*(\d+)")?,
            final_severity: pattern(r"FINAL_SEVERITY:\s*(\d+)")?,
            biomarker: pattern(r"(?i)(hemoglobin|wbc|glucose|creatinine)\s*=\s*(\d+(?:\.\d+)?)")?,
        })
    }

    /// Send requests somewhere other than the public Cohere API.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    async fn generate(&self, prompt: String, max_tokens: u32) -> Result<String, reqwest::Error> {
        let body = json!({
            "model": COHERE_MODEL,
            "prompt": prompt,
            "max_tokens": max_tokens,
            "temperature": 0.7,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        let parsed: GenerateResponse = response.json().await?;
        Ok(parsed.into_text())
    }

    /// Merge a model reply over the fallback answer for `request`.
    ///
    /// Any field the reply does not supply keeps its fallback value.
    pub fn interpret(&self, request: &AdvisoryRequest, text: &str) -> Advice {
        let mut advice = self.fallback.advice_for(request);
        let reply = text.trim();
        if !reply.is_empty() {
            advice.narrative = reply.to_string();
        }

        match request.role {
            AgentRole::HumanDoctor => {
                if let Some(severity) = capture_number(&self.final_severity, text) {
                    advice.annotation = Some(severity);
                }
            }
            AgentRole::Specialist => {
                if let Some(bill) = capture_number(&self.bill, text) {
                    advice.amount = bill;
                }
                if let Some(severity) = capture_number(&self.severity, text) {
                    advice.annotation = Some(severity);
                }
            }
            AgentRole::MedicalLab => {
                if let Some(bill) = capture_number(&self.bill, text) {
                    advice.amount = bill;
                }
                for caps in self.biomarker.captures_iter(text) {
                    if let Ok(value) = caps[2].parse::<f64>() {
                        advice.findings.insert(caps[1].to_ascii_lowercase(), value);
                    }
                }
            }
            _ => {
                if let Some(bill) = capture_number(&self.bill, text) {
                    advice.amount = bill;
                }
            }
        }
        advice
    }
}

impl AdvisoryProvider for CohereAdvisor {
    fn advise(&self, request: AdvisoryRequest) -> BoxFuture<'_, Advice> {
        Box::pin(async move {
            let Some((prompt, max_tokens)) = prompt_for(&request) else {
                return self.fallback.advice_for(&request);
            };

            match self.generate(prompt, max_tokens).await {
                Ok(text) => {
                    debug!(role = %request.role, chars = text.len(), "cohere reply received");
                    self.interpret(&request, &text)
                }
                Err(e) => {
                    warn!(role = %request.role, error = %e, "cohere request failed; using fallback");
                    self.fallback.advice_for(&request)
                }
            }
        })
    }
}

fn pattern(re: &str) -> CarechainResult<Regex> {
    Regex::new(re).map_err(|e| CarechainError::ConfigError {
        reason: format!("invalid advisory pattern '{}': {}", re, e),
    })
}

fn capture_number(re: &Regex, text: &str) -> Option<f64> {
    re.captures(text)?.get(1)?.as_str().parse().ok()
}

/// The prompt and token budget for one role, or `None` for roles the model
/// is never asked about.
fn prompt_for(request: &AdvisoryRequest) -> Option<(String, u32)> {
    let vitals = describe_inputs(&request.inputs);
    let prompt = match request.role {
        AgentRole::GeneralDoctor => (
            format!(
                "As a medical billing expert, analyze these patient vitals and generate a \
                 consultation bill in USD for a General Doctor (Triage) visit.\n\n{vitals}\n\n\
                 Generate a reasonable bill amount (between $50-$300) and provide brief analysis \
                 in format:\nBILL: $[amount]\nANALYSIS: [brief 1-2 line analysis]"
            ),
            150,
        ),
        AgentRole::MedicalLab => (
            format!(
                "As a clinical pathologist, analyze these patient vitals and generate biomarker \
                 test results and lab bill in USD.\n\n{vitals}\n\n\
                 Generate realistic biomarker values (0-100 scale) and lab bill in format:\n\
                 BIOMARKERS: Hemoglobin=[value], WBC=[value], Glucose=[value], Creatinine=[value]\n\
                 BILL: $[amount]\nANALYSIS: [brief analysis]"
            ),
            200,
        ),
        AgentRole::Specialist => (
            format!(
                "As a specialist physician, analyze these patient parameters and provide \
                 diagnosis and consultation bill.\n\n{vitals}\n\n\
                 Provide diagnosis and bill in format:\nDIAGNOSIS: [brief diagnosis]\n\
                 BILL: $[amount]\nSEVERITY: [0-100]"
            ),
            200,
        ),
        AgentRole::HumanDoctor => (
            format!(
                "As a human physician, review these parameters and provide final severity \
                 assessment (0-100) considering all previous evaluations.\n\n{vitals}\n\
                 - Previous Specialist Severity: {}\n\n\
                 Provide final assessment in format:\nFINAL_SEVERITY: [0-100]\n\
                 APPROVAL: [Approved/Conditional/Needs More Info]",
                request.prior_severity.unwrap_or(65.0)
            ),
            150,
        ),
        AgentRole::Patient | AgentRole::Billing => return None,
    };
    Some(prompt)
}

fn describe_inputs(inputs: &Payload) -> String {
    match inputs {
        Payload::Vitals(v) => format!(
            "Patient Vitals:\n\
             - Heart Rate: {} BPM\n\
             - Blood Pressure: {}/{} mmHg\n\
             - Temperature: {}°C\n\
             - Oxygen Saturation: {}%\n\
             - Symptom Severity: {}/100",
            v.heart_rate, v.systolic, v.diastolic, v.temperature, v.oxygen_sat, v.symptom_severity
        ),
        Payload::Scalar(x) => format!("Clinical score: {x}"),
    }
}

// ── Latency ───────────────────────────────────────────────────────────────────

/// Delays every answer from `inner` by a fixed amount.
///
/// Useful for showing what happens when a second action arrives while the
/// first is still waiting on its advisor.
pub struct LatencyAdvisor {
    inner: Box<dyn AdvisoryProvider>,
    delay: Duration,
}

impl LatencyAdvisor {
    pub fn new(inner: Box<dyn AdvisoryProvider>, delay: Duration) -> Self {
        Self { inner, delay }
    }
}

impl AdvisoryProvider for LatencyAdvisor {
    fn advise(&self, request: AdvisoryRequest) -> BoxFuture<'_, Advice> {
        Box::pin(async move {
            tokio::time::sleep(self.delay).await;
            self.inner.advise(request).await
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use carechain_contracts::record::Payload;

    use super::*;

    fn request(role: AgentRole, prior_severity: Option<f64>) -> AdvisoryRequest {
        AdvisoryRequest {
            role,
            inputs: Payload::default(),
            prior_severity,
        }
    }

    fn fallback() -> FallbackAdvisor {
        FallbackAdvisor::from_config(&HospitalConfig::embedded().unwrap())
    }

    fn cohere() -> CohereAdvisor {
        CohereAdvisor::new("test-key", fallback()).unwrap()
    }

    // ── Fallback ─────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_fallback_amounts_per_role() {
        let advisor = fallback();
        let amounts: Vec<f64> = [
            AgentRole::GeneralDoctor,
            AgentRole::MedicalLab,
            AgentRole::Specialist,
            AgentRole::HumanDoctor,
        ]
        .into_iter()
        .map(|r| advisor.advice_for(&request(r, None)).amount)
        .collect();
        assert_eq!(amounts, vec![150.0, 200.0, 250.0, 10.0]);

        let advice = advisor.advise(request(AgentRole::Specialist, None)).await;
        assert_eq!(advice.annotation, Some(65.0));
        assert_eq!(advice.narrative, "Specialist Consultation");
    }

    #[test]
    fn test_fallback_lab_reports_biomarkers() {
        let advice = fallback().advice_for(&request(AgentRole::MedicalLab, None));
        assert_eq!(advice.findings.get("hemoglobin"), Some(&85.0));
        assert_eq!(advice.findings.get("creatinine"), Some(&75.0));
        assert_eq!(advice.annotation, None);
    }

    #[test]
    fn test_human_doctor_carries_prior_severity() {
        let advisor = fallback();
        let carried = advisor.advice_for(&request(AgentRole::HumanDoctor, Some(80.0)));
        assert_eq!(carried.annotation, Some(80.0));

        let defaulted = advisor.advice_for(&request(AgentRole::HumanDoctor, None));
        assert_eq!(defaulted.annotation, Some(65.0));
    }

    #[test]
    fn test_unlisted_role_charges_nothing() {
        let advice = fallback().advice_for(&request(AgentRole::Billing, None));
        assert_eq!(advice.amount, 0.0);
    }

    // ── Cohere reply parsing ─────────────────────────────────────────────────

    #[test]
    fn test_interpret_general_doctor_bill() {
        let advice = cohere().interpret(
            &request(AgentRole::GeneralDoctor, None),
            "BILL: $180\nANALYSIS: Vitals within normal limits.",
        );
        assert_eq!(advice.amount, 180.0);
        assert!(advice.narrative.starts_with("BILL: $180"));
    }

    #[test]
    fn test_interpret_specialist_severity_and_bill() {
        let advice = cohere().interpret(
            &request(AgentRole::Specialist, None),
            "DIAGNOSIS: Viral infection\nBILL: $320\nSEVERITY: 42",
        );
        assert_eq!(advice.amount, 320.0);
        assert_eq!(advice.annotation, Some(42.0));
    }

    #[test]
    fn test_interpret_human_doctor_keeps_fixed_fee() {
        let advice = cohere().interpret(
            &request(AgentRole::HumanDoctor, Some(42.0)),
            "FINAL_SEVERITY: 30\nAPPROVAL: Approved\nBILL: $999",
        );
        assert_eq!(advice.amount, 10.0);
        assert_eq!(advice.annotation, Some(30.0));
    }

    #[test]
    fn test_interpret_lab_biomarkers() {
        let advice = cohere().interpret(
            &request(AgentRole::MedicalLab, None),
            "BIOMARKERS: Hemoglobin=91, WBC=64.5, Glucose=88, Creatinine=70\nBILL: $210",
        );
        assert_eq!(advice.amount, 210.0);
        assert_eq!(advice.findings.get("wbc"), Some(&64.5));
        assert_eq!(advice.findings.get("hemoglobin"), Some(&91.0));
    }

    #[test]
    fn test_interpret_garbage_falls_back_per_field() {
        let advice = cohere().interpret(&request(AgentRole::Specialist, None), "   ");
        assert_eq!(advice.amount, 250.0);
        assert_eq!(advice.annotation, Some(65.0));
        assert_eq!(advice.narrative, "Specialist Consultation");
    }

    #[test]
    fn test_response_text_prefers_top_level_field() {
        let parsed: GenerateResponse =
            serde_json::from_str(r#"{"generations":[{"text":"BILL: $99"}]}"#).unwrap();
        assert_eq!(parsed.into_text(), "BILL: $99");

        let parsed: GenerateResponse =
            serde_json::from_str(r#"{"text":"BILL: $12","generations":[]}"#).unwrap();
        assert_eq!(parsed.into_text(), "BILL: $12");
    }

    #[test]
    fn test_prompt_includes_vitals_and_prior_severity() {
        let (prompt, tokens) = prompt_for(&request(AgentRole::HumanDoctor, Some(70.0))).unwrap();
        assert!(prompt.contains("Heart Rate: 72 BPM"));
        assert!(prompt.contains("Previous Specialist Severity: 70"));
        assert_eq!(tokens, 150);
        assert!(prompt_for(&request(AgentRole::Billing, None)).is_none());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_falls_back() {
        let advisor = cohere().with_endpoint("http://127.0.0.1:9/v1/generate");
        let advice = advisor.advise(request(AgentRole::GeneralDoctor, None)).await;
        assert_eq!(advice.amount, 150.0);
        assert_eq!(advice.narrative, "General Doctor Consultation (Triage)");
    }

    // ── Latency ──────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_latency_advisor_delays_then_delegates() {
        let advisor = LatencyAdvisor::new(Box::new(fallback()), Duration::from_millis(30));
        let started = Instant::now();
        let advice = advisor.advise(request(AgentRole::GeneralDoctor, None)).await;
        assert!(started.elapsed() >= Duration::from_millis(30));
        assert_eq!(advice.amount, 150.0);
    }
}

//! Incident classification: prompt construction, the inference seam, and
//! priority derivation from raw model output.
//!
//! The prompt pins the model to a JSON object with exactly one field
//! `"priorita"` holding one of three severity codes. Derivation goes
//! extraction → parse → code validation, and every failure mode falls
//! back to [`Priority::FALLBACK`] without crossing the row boundary.

use llm_service::AnthropicService;
use serde::Deserialize;
use tracing::debug;

use crate::errors::{Error, TriageResult};
use crate::extract::extract_payload;

/// Closed set of severity codes assigned by the inference step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    /// `"1"` (vysoká).
    High,
    /// `"2"` (střední).
    Medium,
    /// `"3"` (nízká).
    Low,
}

impl Priority {
    /// Default applied when extraction or parsing fails.
    pub const FALLBACK: Priority = Priority::High;

    /// Stored representation, the bare code without quotes.
    pub fn code(self) -> &'static str {
        match self {
            Priority::High => "1",
            Priority::Medium => "2",
            Priority::Low => "3",
        }
    }

    fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "1" => Some(Priority::High),
            "2" => Some(Priority::Medium),
            "3" => Some(Priority::Low),
            _ => None,
        }
    }
}

#[derive(Deserialize)]
struct PriorityPayload {
    priorita: String,
}

/// Inference seam the orchestrator is generic over.
///
/// One call per incident, no retry. Production impl is the Anthropic
/// client; tests use in-memory fakes.
#[allow(async_fn_in_trait)]
pub trait PriorityModel {
    /// Sends one prompt and returns the raw model text.
    async fn classify_raw(&self, prompt: &str) -> TriageResult<String>;
}

impl PriorityModel for AnthropicService {
    async fn classify_raw(&self, prompt: &str) -> TriageResult<String> {
        self.generate(prompt)
            .await
            .map_err(|e| Error::Inference(e.to_string()))
    }
}

/// Builds the fixed-format classification prompt.
///
/// Subject is mandatory context; the description is appended only when
/// present and non-empty. The closing instruction constrains the answer
/// to the JSON shape the extractor expects.
pub fn build_prompt(subject: &str, description: Option<&str>) -> String {
    let mut prompt = format!("Popis nahlášeného incidentu je: {subject};");
    if let Some(desc) = description.filter(|d| !d.trim().is_empty()) {
        prompt.push_str(&format!(" Podrobnosti: {desc};"));
    }
    prompt.push_str(
        " Jaká je priorita incidentu? Vyber jednu z možností: \
         1=vysoká, 2=střední, 3=nízká. Výsledek vrať ve formátu JSON \
         ve tvaru: {\"priorita\":\"1\"}",
    );
    prompt
}

/// Classifies one incident: build the prompt, call the model once.
///
/// # Errors
/// Propagates the model's opaque [`Error::Inference`]; the caller does
/// not retry.
pub async fn classify<M: PriorityModel>(
    model: &M,
    subject: &str,
    description: Option<&str>,
) -> TriageResult<String> {
    let prompt = build_prompt(subject, description);
    debug!(prompt_chars = prompt.chars().count(), "classifying incident");
    model.classify_raw(&prompt).await
}

/// Derives a priority from raw model output.
///
/// Extraction absence, payload parse failure, and an out-of-set code are
/// distinct conditions; each logs its own event and yields
/// [`Priority::FALLBACK`].
pub fn derive_priority(raw: &str) -> Priority {
    let Some(payload) = extract_payload(raw) else {
        debug!("no structured payload in model output, falling back");
        return Priority::FALLBACK;
    };

    let parsed: PriorityPayload = match serde_json::from_str(payload.content()) {
        Ok(p) => p,
        Err(e) => {
            debug!("payload did not parse ({e}), falling back");
            return Priority::FALLBACK;
        }
    };

    Priority::from_code(&parsed.priorita).unwrap_or_else(|| {
        debug!(code = %parsed.priorita, "priority code outside the known set, falling back");
        Priority::FALLBACK
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_includes_description_only_when_present() {
        let with = build_prompt("Výpadek sítě", Some("Nefunguje VPN"));
        assert!(with.starts_with("Popis nahlášeného incidentu je: Výpadek sítě;"));
        assert!(with.contains(" Podrobnosti: Nefunguje VPN;"));

        let without = build_prompt("Výpadek sítě", None);
        assert!(!without.contains("Podrobnosti"));

        let empty = build_prompt("Výpadek sítě", Some("  "));
        assert!(!empty.contains("Podrobnosti"));
    }

    #[test]
    fn prompt_pins_the_json_shape() {
        let p = build_prompt("x", None);
        assert!(p.ends_with("{\"priorita\":\"1\"}"));
        assert!(p.contains("1=vysoká, 2=střední, 3=nízká"));
    }

    #[test]
    fn fenced_payload_yields_its_code() {
        let raw = "```json\n{\"priorita\":\"2\"}\n```";
        assert_eq!(derive_priority(raw), Priority::Medium);
    }

    #[test]
    fn bare_payload_yields_its_code() {
        assert_eq!(derive_priority("{\"priorita\":\"3\"}"), Priority::Low);
    }

    #[test]
    fn prose_falls_back_to_high() {
        let raw = "Some explanation without any structure.";
        assert_eq!(derive_priority(raw), Priority::FALLBACK);
        assert_eq!(derive_priority(raw).code(), "1");
    }

    #[test]
    fn malformed_payload_falls_back() {
        assert_eq!(derive_priority("{\"priorita\":2}"), Priority::FALLBACK);
        assert_eq!(derive_priority("{\"other\":\"2\"}"), Priority::FALLBACK);
    }

    #[test]
    fn out_of_set_code_falls_back() {
        assert_eq!(derive_priority("{\"priorita\":\"4\"}"), Priority::FALLBACK);
        assert_eq!(derive_priority("{\"priorita\":\"\"}"), Priority::FALLBACK);
    }

    #[test]
    fn codes_round_trip() {
        for p in [Priority::High, Priority::Medium, Priority::Low] {
            assert_eq!(Priority::from_code(p.code()), Some(p));
        }
    }
}

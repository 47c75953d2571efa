//! Prompt construction and response parsing for deep analysis.

use serde::{Deserialize, Serialize};

use crate::alert::{AlertDecision, AlertLevel, Provenance, DISCLAIMER};
use crate::error::{Result, VitalsError};

/// Everything the backend is told about one moment of the stream, captured
/// when the analysis is triggered.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisRequest {
    pub timestamp: f64,
    pub risk: f64,
    pub physics_valid: bool,
    pub physics_reason: String,
    /// Symbolic form of the risk computation.
    pub explanation: String,
    pub shape_description: String,
    pub vitals_snapshot: String,
    /// Fast-path decision at trigger time; shown if the analysis fails.
    pub fast_path: AlertDecision,
}

const SYSTEM_PROMPT: &str = "\
You are a critical care decision-support assistant.
Your inputs are vetted by a physics consistency check and a topological shape sensor.
Rules:
1. If physics validity is false, treat the data as a sensor fault and recommend re-measurement.
2. If the shape is 'Exploding' or risk exceeds 0.80, recommend escalation per the sepsis protocol.
3. Cite the shape radius in your rationale.
4. Every recommendation requires clinician verification. Never order treatment directly.
5. Be concise. Output a single JSON object only.";

const RESPONSE_FORMAT: &str = r#"{"recommendation": "...", "rationale": "...", "suggested_checks": ["..."], "alert_level": "GREEN|YELLOW|ORANGE|RED"}"#;

/// Render the full prompt: persona and safety rules, then the data block.
pub fn build_prompt(request: &AnalysisRequest) -> String {
    format!(
        "{system}\n\n\
         DATA:\n\
         - Sepsis risk: {risk:.2}\n\
         - Physics validity: {valid} ({reason})\n\
         - Mathematical basis: {explanation}\n\
         - Topological shape: {shape}\n\
         - Vitals: {vitals}\n\n\
         INSTRUCTION:\n\
         Recommend a clinical action. Respond as JSON:\n{format}\n",
        system = SYSTEM_PROMPT,
        risk = request.risk,
        valid = request.physics_valid,
        reason = request.physics_reason,
        explanation = request.explanation,
        shape = request.shape_description,
        vitals = request.vitals_snapshot,
        format = RESPONSE_FORMAT,
    )
}

/// Suggested checks may come back as a list or as one sentence.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Checks {
    Many(Vec<String>),
    One(String),
}

impl Checks {
    fn into_vec(self) -> Vec<String> {
        match self {
            Checks::Many(items) => items,
            Checks::One(item) => vec![item],
        }
    }
}

/// Shape of the JSON object the backend is asked to produce. Every field is
/// optional; models drift.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct AnalysisPayload {
    #[serde(default)]
    pub recommendation: Option<String>,
    /// Older response shape.
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default, alias = "thought_process")]
    pub rationale: Option<String>,
    #[serde(default)]
    pub suggested_checks: Option<Checks>,
    #[serde(default)]
    pub alert_level: Option<String>,
}

impl AnalysisPayload {
    /// First non-blank of `recommendation` and `action`.
    pub fn recommendation(&self) -> Option<&str> {
        [&self.recommendation, &self.action]
            .into_iter()
            .flatten()
            .map(|s| s.trim())
            .find(|s| !s.is_empty())
    }
}

/// Every balanced top-level `{...}` object in `text`, in order.
///
/// Braces inside JSON strings, including escaped quotes, are not counted.
/// An opening brace that never closes is skipped and scanning resumes after
/// it.
pub fn json_objects(text: &str) -> Vec<&str> {
    let mut objects = Vec::new();
    let mut from = 0;
    while let Some(found) = text[from..].find('{') {
        let start = from + found;
        match balanced_len(&text[start..]) {
            Some(len) => {
                objects.push(&text[start..start + len]);
                from = start + len;
            }
            None => from = start + 1,
        }
    }
    objects
}

// Byte length of the object opening at the start of `text`.
fn balanced_len(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(offset + 1);
                }
            }
            _ => {}
        }
    }
    None
}

/// The part of `raw` after an echoed copy of `prompt`.
///
/// Some backends return the prompt followed by the completion. Leading
/// whitespace of the remainder is dropped. Output that does not contain the
/// prompt is returned unchanged.
pub fn strip_echo<'a>(raw: &'a str, prompt: &str) -> &'a str {
    let prompt = prompt.trim_end();
    if prompt.is_empty() {
        return raw;
    }
    match raw.find(prompt) {
        Some(idx) => raw[idx + prompt.len()..].trim_start(),
        None => raw,
    }
}

// Template filler such as "..." copied back from the response format.
fn is_placeholder(text: &str) -> bool {
    let text = text.trim();
    text.is_empty() || text.chars().all(|c| c == '.' || c == '\u{2026}')
}

/// Cut `text` to at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Turn raw backend output into a decision attributed to `model_id`.
///
/// Every JSON object in `raw` is a candidate and the last usable one wins,
/// so an echoed response template or stray braces ahead of the answer are
/// skipped. A candidate is unusable when it does not decode, has no
/// recommendation, has a placeholder recommendation, or names an alert
/// level that is not recognised.
///
/// The level is taken from the payload when it names one; otherwise it is
/// `Critical` above `critical_threshold` and `RisingConcern` below.
///
/// # Errors
///
/// [`VitalsError::Backend`] when no candidate is usable. The message
/// describes the last candidate in the output.
pub fn parse_response(
    raw: &str,
    request: &AnalysisRequest,
    model_id: &str,
    max_recommendation_chars: usize,
    critical_threshold: f64,
) -> Result<AlertDecision> {
    let mut rejection = None;
    for object in json_objects(raw).into_iter().rev() {
        match decode_payload(object) {
            Ok((payload, level)) => {
                return Ok(build_decision(
                    payload,
                    level,
                    request,
                    model_id,
                    max_recommendation_chars,
                    critical_threshold,
                ))
            }
            Err(e) => {
                rejection.get_or_insert(e);
            }
        }
    }
    Err(rejection.unwrap_or_else(|| {
        VitalsError::Backend("malformed response: no JSON object found".to_string())
    }))
}

fn decode_payload(object: &str) -> Result<(AnalysisPayload, Option<AlertLevel>)> {
    let payload: AnalysisPayload = serde_json::from_str(object)
        .map_err(|e| VitalsError::Backend(format!("malformed response: {}", e)))?;

    match payload.recommendation() {
        None => {
            return Err(VitalsError::Backend(
                "malformed response: missing recommendation".to_string(),
            ))
        }
        Some(r) if is_placeholder(r) => {
            return Err(VitalsError::Backend(
                "malformed response: placeholder recommendation".to_string(),
            ))
        }
        Some(_) => {}
    }

    let level = match payload.alert_level.as_deref().map(str::trim) {
        Some(label) if !label.is_empty() => Some(AlertLevel::from_label(label).ok_or_else(|| {
            VitalsError::Backend(format!("malformed response: unknown alert level '{}'", label))
        })?),
        _ => None,
    };
    Ok((payload, level))
}

fn build_decision(
    payload: AnalysisPayload,
    level: Option<AlertLevel>,
    request: &AnalysisRequest,
    model_id: &str,
    max_recommendation_chars: usize,
    critical_threshold: f64,
) -> AlertDecision {
    let recommendation = payload
        .recommendation()
        .map(|r| truncate_chars(r, max_recommendation_chars).to_string())
        .unwrap_or_default();

    let level = level.unwrap_or(if request.risk > critical_threshold {
        AlertLevel::Critical
    } else {
        AlertLevel::RisingConcern
    });

    let rationale = payload
        .rationale
        .filter(|r| !is_placeholder(r))
        .unwrap_or_else(|| format!("Deep analysis of {}", request.explanation));

    let suggested_checks = payload
        .suggested_checks
        .map(Checks::into_vec)
        .map(|checks| checks.into_iter().filter(|c| !is_placeholder(c)).collect::<Vec<_>>())
        .filter(|checks| !checks.is_empty())
        .unwrap_or_else(|| request.fast_path.suggested_checks.clone());

    AlertDecision {
        level,
        recommendation,
        rationale,
        suggested_checks,
        provenance: Provenance::DeepAnalysis {
            model_id: model_id.to_string(),
        },
        disclaimer: DISCLAIMER.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(risk: f64) -> AnalysisRequest {
        AnalysisRequest {
            timestamp: 42.0,
            risk,
            physics_valid: true,
            physics_reason: "valid (SVR=476)".to_string(),
            explanation: "Risk(0.61) ~ 0.30*Spline(Shape=0.00) + 0.70*(1 - Physics=0.13)"
                .to_string(),
            shape_description: "Stable (radius 0.00)".to_string(),
            vitals_snapshot: "HR 120, MAP 50, SpO2 90, RR 28".to_string(),
            fast_path: AlertDecision {
                level: AlertLevel::RisingConcern,
                recommendation: "fast".to_string(),
                rationale: "fast rationale".to_string(),
                suggested_checks: vec!["Repeat MAP in 5 min".to_string()],
                provenance: Provenance::FastPath,
                disclaimer: DISCLAIMER.to_string(),
            },
        }
    }

    #[test]
    fn test_prompt_contains_data_block() {
        let prompt = build_prompt(&request(0.61));
        assert!(prompt.contains("critical care decision-support assistant"));
        assert!(prompt.contains("clinician verification"));
        assert!(prompt.contains("Sepsis risk: 0.61"));
        assert!(prompt.contains("Physics validity: true"));
        assert!(prompt.contains("Spline(Shape=0.00)"));
        assert!(prompt.contains("Stable (radius 0.00)"));
        assert!(prompt.contains("HR 120, MAP 50"));
    }

    #[test]
    fn test_extract_ignores_braces_in_strings() {
        let text = r#"Sure! {"recommendation": "use {braces} and \"quotes\"", "x": {"y": 1}} trailing }"#;
        let objects = json_objects(text);
        assert_eq!(objects.len(), 1);
        assert!(objects[0].starts_with('{') && objects[0].ends_with("}}"));
        let value: serde_json::Value = serde_json::from_str(objects[0]).unwrap();
        assert_eq!(value["x"]["y"], 1);
    }

    #[test]
    fn test_extract_unbalanced() {
        assert!(json_objects("no json here").is_empty());
        assert!(json_objects(r#"{"a": "}"#).is_empty());
        assert_eq!(json_objects(r#"{ oops {"a": 1} {}"#), vec![r#"{"a": 1}"#, "{}"]);
    }

    #[test]
    fn test_parse_full_payload() {
        let raw = r#"Model says: {"recommendation": "Escalate to sepsis bundle review",
            "rationale": "Radius rising", "suggested_checks": ["Lactate", "Cultures"],
            "alert_level": "RED"}"#;
        let decision = parse_response(raw, &request(0.61), "m1", 200, 0.8).unwrap();
        assert_eq!(decision.level, AlertLevel::Critical);
        assert_eq!(decision.recommendation, "Escalate to sepsis bundle review");
        assert_eq!(decision.suggested_checks, vec!["Lactate", "Cultures"]);
        assert_eq!(
            decision.provenance,
            Provenance::DeepAnalysis {
                model_id: "m1".to_string()
            }
        );
    }

    #[test]
    fn test_parse_action_alias_and_default_level() {
        let raw = r#"{"action": "PREPARE_VASOPRESSOR", "suggested_checks": "Repeat MAP"}"#;
        let decision = parse_response(raw, &request(0.61), "m1", 200, 0.8).unwrap();
        assert_eq!(decision.recommendation, "PREPARE_VASOPRESSOR");
        assert_eq!(decision.level, AlertLevel::RisingConcern);
        assert_eq!(decision.suggested_checks, vec!["Repeat MAP"]);

        let decision = parse_response(raw, &request(0.85), "m1", 200, 0.8).unwrap();
        assert_eq!(decision.level, AlertLevel::Critical);
    }

    #[test]
    fn test_parse_truncates_on_char_boundary() {
        let long = "é".repeat(300);
        let raw = format!(r#"{{"recommendation": "{}"}}"#, long);
        let decision = parse_response(&raw, &request(0.7), "m1", 200, 0.8).unwrap();
        assert_eq!(decision.recommendation.chars().count(), 200);
    }

    #[test]
    fn test_parse_failures() {
        let req = request(0.7);
        assert!(parse_response("I think the patient is fine.", &req, "m", 200, 0.8).is_err());
        assert!(parse_response(r#"{"rationale": "no action"}"#, &req, "m", 200, 0.8).is_err());
        assert!(parse_response(r#"{"recommendation": "   "}"#, &req, "m", 200, 0.8).is_err());
        assert!(parse_response(r#"{"recommendation": 5}"#, &req, "m", 200, 0.8).is_err());
        assert!(parse_response(r#"{"recommendation": "..."}"#, &req, "m", 200, 0.8).is_err());
        let err = parse_response(
            r#"{"recommendation": "Repeat lactate", "alert_level": "purple"}"#,
            &req,
            "m",
            200,
            0.8,
        )
        .unwrap_err();
        assert!(err.to_string().contains("unknown alert level"));
    }

    #[test]
    fn test_echoed_prompt_is_not_the_answer() {
        let req = request(0.61);
        let prompt = build_prompt(&req);
        let raw = format!(
            "{}{}",
            prompt,
            r#"{"recommendation": "Escalate to attending for sepsis review", "alert_level": "RED"}"#
        );

        let decision = parse_response(&raw, &req, "m", 200, 0.8).unwrap();
        assert_eq!(decision.level, AlertLevel::Critical);
        assert_eq!(decision.recommendation, "Escalate to attending for sepsis review");
        assert_eq!(decision.suggested_checks, vec!["Repeat MAP in 5 min"]);

        let stripped = strip_echo(&raw, &prompt);
        assert!(stripped.starts_with(r#"{"recommendation": "Escalate"#));
        assert_eq!(strip_echo("plain answer", &prompt), "plain answer");
    }

    #[test]
    fn test_echo_without_answer_is_rejected() {
        let req = request(0.61);
        let raw = format!("{}I am not sure.", build_prompt(&req));
        let err = parse_response(&raw, &req, "m", 200, 0.8).unwrap_err();
        assert!(err.to_string().contains("placeholder"));
    }

    #[test]
    fn test_stray_braces_before_answer() {
        let raw = r#"Thinking {about it}... {"recommendation": "Repeat MAP", "alert_level": "orange"}"#;
        let decision = parse_response(raw, &request(0.7), "m", 200, 0.8).unwrap();
        assert_eq!(decision.recommendation, "Repeat MAP");
        assert_eq!(decision.level, AlertLevel::RisingConcern);
        assert_eq!(decision.disclaimer, DISCLAIMER);
    }

    #[test]
    fn test_missing_checks_fall_back_to_fast_path() {
        let raw = r#"{"recommendation": "Repeat lactate"}"#;
        let decision = parse_response(raw, &request(0.7), "m", 200, 0.8).unwrap();
        assert_eq!(decision.suggested_checks, vec!["Repeat MAP in 5 min"]);
        assert!(decision.rationale.contains("Spline"));
    }
}

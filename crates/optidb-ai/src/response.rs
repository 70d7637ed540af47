use optidb_core::{
    AugmentError, AugmentResult, FALLBACK_CONFIDENCE, Recommendation, RecommendationType, RiskLevel,
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct RecommendationPayload {
    #[serde(default)]
    recommendations: Vec<RawRecommendation>,
    #[serde(default)]
    analysis: String,
}

#[derive(Debug, Deserialize)]
struct RawRecommendation {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    ddl: Option<String>,
    #[serde(default)]
    rationale: String,
    #[serde(default = "fallback_confidence")]
    confidence: f64,
    #[serde(default)]
    impact_estimate: Option<String>,
    #[serde(default)]
    risk_level: String,
    #[serde(default)]
    rewrite_sql: Option<String>,
}

fn fallback_confidence() -> f64 {
    FALLBACK_CONFIDENCE
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}

/// Strips a surrounding Markdown code fence (```json ... ```), if any
pub fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Skip the info string (e.g. "json") on the opening line.
    let body = rest.split_once('\n').map_or(rest, |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Parses the model's message content into sanitized recommendations.
///
/// Items with an unknown `type` are dropped, empty optional text becomes
/// absent, out-of-range confidence becomes 0.5 and unknown risk becomes medium.
pub fn parse_recommendations(content: &str) -> AugmentResult<Vec<Recommendation>> {
    let payload: RecommendationPayload = serde_json::from_str(strip_code_fence(content))
        .map_err(|e| {
            tracing::debug!(raw = content, "unparseable augmenter response");
            AugmentError::InvalidResponse(format!("invalid JSON response from AI: {e}"))
        })?;

    if !payload.analysis.is_empty() {
        tracing::debug!(analysis = %payload.analysis, "augmenter analysis");
    }

    let recommendations = payload
        .recommendations
        .into_iter()
        .filter_map(|raw| {
            let kind = match raw.kind.parse::<RecommendationType>() {
                Ok(kind) => kind,
                Err(e) => {
                    tracing::warn!(error = %e, "dropping augmenter recommendation");
                    return None;
                }
            };

            let risk = RiskLevel::parse_lossy(&raw.risk_level);
            if risk.as_str() != raw.risk_level {
                tracing::debug!(risk_level = %raw.risk_level, "adjusting invalid risk level to medium");
            }
            let recommendation = Recommendation::new(kind, raw.rationale)
                .with_confidence(raw.confidence)
                .with_risk(risk);
            if recommendation.confidence != raw.confidence {
                tracing::debug!(confidence = raw.confidence, "adjusting invalid confidence to 0.5");
            }

            Some(Recommendation {
                ddl: non_empty(raw.ddl),
                rewrite_sql: non_empty(raw.rewrite_sql),
                impact_estimate: non_empty(raw.impact_estimate),
                ..recommendation
            })
        })
        .collect();

    Ok(recommendations)
}

#[cfg(test)]
mod tests;

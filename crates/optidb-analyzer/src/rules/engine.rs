//! Rule engine
//!
//! The engine gates queries on call count, then either hands the whole query to
//! an augmenter or runs every [`Detector`] in priority order. It holds only
//! read-only configuration, so one engine can serve concurrent calls.

use super::{AnalysisContext, Detector, Finding, RuleEngineConfig};
use crate::extract::extract_tables;
use optidb_core::{
    AugmentError, IndexInfo, QueryStats, Recommendation, RecommendationAugmenter, TableInfo,
};
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Orchestrates detectors and the optional augmenter
#[derive(Clone, Default)]
pub struct RuleEngine {
    config: RuleEngineConfig,
    augmenter: Option<Arc<dyn RecommendationAugmenter>>,
}

impl fmt::Debug for RuleEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleEngine")
            .field("config", &self.config)
            .field(
                "augmenter",
                &self.augmenter.as_ref().map(|augmenter| augmenter.metadata()),
            )
            .finish()
    }
}

impl RuleEngine {
    /// Creates an engine that only uses the heuristic detectors
    pub fn new(config: RuleEngineConfig) -> Self {
        Self {
            config,
            augmenter: None,
        }
    }

    /// Consults `augmenter` before the detectors on every call
    pub fn with_augmenter(mut self, augmenter: Arc<dyn RecommendationAugmenter>) -> Self {
        self.augmenter = Some(augmenter);
        self
    }

    /// Returns the engine config
    pub fn config(&self) -> &RuleEngineConfig {
        &self.config
    }

    /// Returns the configured augmenter, if any
    pub fn augmenter(&self) -> Option<&Arc<dyn RecommendationAugmenter>> {
        self.augmenter.as_ref()
    }

    /// True if the query is called often enough to be analyzed
    pub fn is_significant(&self, query: &QueryStats) -> bool {
        query.calls >= self.config.min_calls
    }

    /// Produces recommendations for one query.
    ///
    /// Never fails: augmenter errors are logged and the heuristic path runs
    /// instead.
    pub async fn analyze_query(
        &self,
        query: &QueryStats,
        tables: &[TableInfo],
        indexes: &[IndexInfo],
    ) -> Vec<Recommendation> {
        self.analyze_query_with_cancel(query, tables, indexes, &CancellationToken::new())
            .await
    }

    /// Like [`Self::analyze_query`], abandoning the augmenter call once
    /// `cancel` fires and falling back to the detectors.
    pub async fn analyze_query_with_cancel(
        &self,
        query: &QueryStats,
        tables: &[TableInfo],
        indexes: &[IndexInfo],
        cancel: &CancellationToken,
    ) -> Vec<Recommendation> {
        tracing::debug!(
            calls = query.calls,
            mean_exec_time_ms = query.mean_exec_time,
            "analyzing query"
        );

        if !self.passes_gate(query) {
            return Vec::new();
        }

        if let Some(augmenter) = self.augmenter.as_ref().filter(|a| a.is_available()) {
            let provider = augmenter.metadata();
            tracing::info!(
                provider = %provider.name,
                model = %provider.model,
                "using augmenter for recommendations"
            );

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(AugmentError::Cancelled),
                result = augmenter.generate_recommendations(query, tables, indexes) => result,
            };

            match outcome {
                Ok(recommendations) => {
                    tracing::info!(
                        recommendations = recommendations.len(),
                        "augmenter produced recommendations"
                    );
                    return recommendations.into_iter().map(sanitize).collect();
                }
                // The losing future is already dropped, which abandons only this
                // call's request. `augmenter.cancel()` would abort every caller's.
                Err(AugmentError::Cancelled) => {
                    tracing::warn!("augmenter call cancelled, falling back to heuristics");
                }
                Err(e) => {
                    tracing::error!(error = %e, "augmenter failed, falling back to heuristics");
                }
            }
        }

        render(self.run_detectors(query, tables, indexes))
    }

    /// Heuristic path only: gate, then every detector in priority order
    pub fn analyze_heuristics(
        &self,
        query: &QueryStats,
        tables: &[TableInfo],
        indexes: &[IndexInfo],
    ) -> Vec<Recommendation> {
        render(self.detect(query, tables, indexes))
    }

    /// Typed findings of the heuristic path, before rendering
    pub fn detect(
        &self,
        query: &QueryStats,
        tables: &[TableInfo],
        indexes: &[IndexInfo],
    ) -> Vec<Finding> {
        if !self.passes_gate(query) {
            return Vec::new();
        }
        self.run_detectors(query, tables, indexes)
    }

    fn passes_gate(&self, query: &QueryStats) -> bool {
        let significant = self.is_significant(query);
        if !significant {
            tracing::debug!(
                calls = query.calls,
                min_calls = self.config.min_calls,
                "skipping query with insufficient calls"
            );
        }
        significant
    }

    fn run_detectors(
        &self,
        query: &QueryStats,
        tables: &[TableInfo],
        indexes: &[IndexInfo],
    ) -> Vec<Finding> {
        let table_names = extract_tables(&query.query);
        tracing::debug!(tables = ?table_names, "extracted table names");

        let ctx = AnalysisContext::new(query, &table_names, tables, indexes);
        let findings: Vec<Finding> = Detector::ALL
            .iter()
            .filter_map(|detector| {
                let finding = detector.run(&self.config, &ctx)?;
                tracing::info!(detector = detector.name(), "detector matched");
                Some(finding)
            })
            .collect();

        tracing::debug!(findings = findings.len(), "heuristic analysis complete");
        findings
    }
}

fn render(findings: Vec<Finding>) -> Vec<Recommendation> {
    findings
        .into_iter()
        .map(|finding| sanitize(finding.into_recommendation()))
        .collect()
}

fn sanitize(recommendation: Recommendation) -> Recommendation {
    let original = recommendation.confidence;
    let sanitized = recommendation.sanitized();
    if sanitized.confidence != original {
        tracing::debug!(
            kind = %sanitized.kind,
            original,
            "replaced out-of-range confidence"
        );
    }
    sanitized
}

#[cfg(test)]
mod tests;

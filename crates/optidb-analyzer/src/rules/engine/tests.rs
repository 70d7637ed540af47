//! Tests for the rule engine

use super::*;
use async_trait::async_trait;
use optidb_core::{AugmentResult, ProviderMetadata, RecommendationType, RiskLevel};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

fn cols(columns: &[&str]) -> Vec<String> {
    columns.iter().map(|c| c.to_string()).collect()
}

fn orders_query() -> QueryStats {
    QueryStats::new("SELECT * FROM orders WHERE customer_id = 42")
        .with_calls(50)
        .with_mean_exec_time(5.0)
}

fn orders_tables() -> Vec<TableInfo> {
    vec![TableInfo::new("orders", 500_000)]
}

/// Recommendations with their timestamps cleared, for equality checks
fn without_timestamps(recommendations: Vec<Recommendation>) -> Vec<Recommendation> {
    recommendations
        .into_iter()
        .map(|rec| rec.with_created_at(Default::default()))
        .collect()
}

enum Behavior {
    Succeed(Vec<Recommendation>),
    Fail(AugmentError),
    Hang,
    Delay(Duration, Vec<Recommendation>),
}

struct StubAugmenter {
    behavior: Behavior,
    available: bool,
    calls: AtomicUsize,
    cancelled: AtomicBool,
}

impl StubAugmenter {
    fn new(behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            available: true,
            calls: AtomicUsize::new(0),
            cancelled: AtomicBool::new(false),
        })
    }

    fn unavailable(behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            available: false,
            calls: AtomicUsize::new(0),
            cancelled: AtomicBool::new(false),
        })
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecommendationAugmenter for StubAugmenter {
    async fn generate_recommendations(
        &self,
        _query: &QueryStats,
        _tables: &[TableInfo],
        _indexes: &[IndexInfo],
    ) -> AugmentResult<Vec<Recommendation>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            Behavior::Succeed(recommendations) => Ok(recommendations.clone()),
            Behavior::Fail(error) => Err(error.clone()),
            Behavior::Hang => {
                std::future::pending::<()>().await;
                Ok(Vec::new())
            }
            Behavior::Delay(delay, recommendations) => {
                tokio::time::sleep(*delay).await;
                Ok(recommendations.clone())
            }
        }
    }

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata::new("Stub", "stub-model")
    }

    fn is_available(&self) -> bool {
        self.available
    }
}

mod gating_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_insignificant_query_returns_nothing() {
        let engine = RuleEngine::default();
        let query = orders_query().with_calls(4).with_mean_exec_time(10_000.0);

        assert!(engine.analyze_query(&query, &orders_tables(), &[]).await.is_empty());
        assert!(engine.analyze_heuristics(&query, &orders_tables(), &[]).is_empty());
        assert!(engine.detect(&query, &orders_tables(), &[]).is_empty());
    }

    #[tokio::test]
    async fn test_gate_applies_before_augmenter() {
        let augmenter = StubAugmenter::new(Behavior::Succeed(vec![Recommendation::new(
            RecommendationType::MissingIndex,
            "from stub",
        )]));
        let engine = RuleEngine::default().with_augmenter(augmenter.clone());
        let query = orders_query().with_calls(1);

        assert!(engine.analyze_query(&query, &orders_tables(), &[]).await.is_empty());
        assert_eq!(augmenter.call_count(), 0);
    }

    #[test]
    fn test_custom_min_calls() {
        let engine = RuleEngine::new(RuleEngineConfig::default().with_min_calls(100));
        assert!(!engine.is_significant(&orders_query()));
        assert!(engine.is_significant(&orders_query().with_calls(100)));
    }
}

mod scenario_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_missing_index_scenario() {
        let engine = RuleEngine::default();
        let recs = engine.analyze_query(&orders_query(), &orders_tables(), &[]).await;

        assert_eq!(recs.len(), 1);
        let rec = &recs[0];
        assert_eq!(rec.kind, RecommendationType::MissingIndex);
        assert_eq!(
            rec.ddl.as_deref(),
            Some("CREATE INDEX idx_orders_customer_id ON orders (customer_id);")
        );
        assert!(rec.rationale.contains("'orders'"));
        assert!(rec.rationale.contains("'customer_id'"));
        assert_eq!(rec.confidence, 0.8);
        assert_eq!(rec.risk_level, RiskLevel::Low);
    }

    #[test]
    fn test_redundant_index_scenario() {
        let engine = RuleEngine::default();
        let query = QueryStats::new("SELECT id FROM users WHERE email = $1")
            .with_calls(10)
            .with_mean_exec_time(0.05);
        let indexes = [
            IndexInfo::new("users", "idx_users_email", cols(&["email"])).with_scans(2),
            IndexInfo::new("users", "idx_users_email_created_at", cols(&["email", "created_at"])),
        ];

        let recs = engine.analyze_heuristics(&query, &[], &indexes);
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].kind, RecommendationType::RedundantIndex);
        assert_eq!(recs[0].ddl.as_deref(), Some("DROP INDEX idx_users_email;"));
    }

    #[test]
    fn test_cardinality_scenario() {
        let engine = RuleEngine::default();
        let query = QueryStats::new("SELECT * FROM events WHERE id = 7")
            .with_calls(20)
            .with_rows(5)
            .with_mean_exec_time(2.0);
        let index = [IndexInfo::new("events", "events_pkey", cols(&["id"])).primary()];

        let large = engine.analyze_heuristics(&query, &[TableInfo::new("events", 1_000_000)], &index);
        let kinds: Vec<_> = large.iter().map(|rec| rec.kind).collect();
        assert_eq!(kinds, vec![RecommendationType::CardinalityIssue]);

        let small = engine.analyze_heuristics(&query, &[TableInfo::new("events", 500)], &index);
        assert!(small.is_empty());
    }

    #[test]
    fn test_detector_priority_order() {
        let engine = RuleEngine::default();
        let query = QueryStats::new(
            "SELECT * FROM orders o JOIN customers c ON o.customer_id = c.id \
             WHERE status = 'open' AND o.total > (SELECT AVG(x.total) FROM orders x WHERE x.customer_id = o.customer_id)",
        )
        .with_calls(100)
        .with_rows(10)
        .with_mean_exec_time(50.0);
        let tables = [TableInfo::new("orders", 2_000_000), TableInfo::new("customers", 40_000)];
        let indexes = [
            IndexInfo::new("orders", "idx_orders_status", cols(&["status"])).with_scans(1),
            IndexInfo::new("orders", "idx_orders_status_created", cols(&["status", "created_at"])),
        ];

        let kinds: Vec<_> = engine
            .detect(&query, &tables, &indexes)
            .iter()
            .map(Finding::kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                RecommendationType::CorrelatedSubquery,
                RecommendationType::JoinIndex,
                RecommendationType::RedundantIndex,
                RecommendationType::CardinalityIssue,
            ]
        );
    }

    #[test]
    fn test_invariants_hold_for_heuristic_output() {
        let engine = RuleEngine::default();
        let recs = engine.analyze_heuristics(&orders_query(), &orders_tables(), &[]);
        for rec in recs {
            assert!((0.0..=1.0).contains(&rec.confidence));
            assert!(matches!(
                rec.risk_level,
                RiskLevel::Low | RiskLevel::Medium | RiskLevel::High
            ));
        }
    }
}

mod augmenter_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_success_bypasses_heuristics() {
        let from_stub = Recommendation::new(RecommendationType::CompositeIndex, "from stub")
            .with_confidence(0.9)
            .with_risk(RiskLevel::Low);
        let augmenter = StubAugmenter::new(Behavior::Succeed(vec![from_stub.clone()]));
        let engine = RuleEngine::default().with_augmenter(augmenter.clone());

        let recs = engine.analyze_query(&orders_query(), &orders_tables(), &[]).await;

        assert_eq!(recs, vec![from_stub]);
        assert_eq!(augmenter.call_count(), 1);
    }

    #[tokio::test]
    async fn test_empty_success_is_returned_as_is() {
        let augmenter = StubAugmenter::new(Behavior::Succeed(Vec::new()));
        let engine = RuleEngine::default().with_augmenter(augmenter);

        assert!(engine.analyze_query(&orders_query(), &orders_tables(), &[]).await.is_empty());
    }

    #[tokio::test]
    async fn test_failure_falls_back_to_heuristics() {
        let heuristic_only = RuleEngine::default();
        let expected = heuristic_only.analyze_heuristics(&orders_query(), &orders_tables(), &[]);

        for error in [
            AugmentError::Network("connection refused".to_string()),
            AugmentError::Timeout,
            AugmentError::InvalidResponse("not json".to_string()),
            AugmentError::RateLimited("slow down".to_string()),
        ] {
            let augmenter = StubAugmenter::new(Behavior::Fail(error));
            let engine = RuleEngine::default().with_augmenter(augmenter.clone());
            let recs = engine.analyze_query(&orders_query(), &orders_tables(), &[]).await;

            assert_eq!(without_timestamps(recs), without_timestamps(expected.clone()));
            assert_eq!(augmenter.call_count(), 1);
        }
    }

    #[tokio::test]
    async fn test_every_call_retries_augmenter() {
        let augmenter =
            StubAugmenter::new(Behavior::Fail(AugmentError::Network("down".to_string())));
        let engine = RuleEngine::default().with_augmenter(augmenter.clone());

        engine.analyze_query(&orders_query(), &orders_tables(), &[]).await;
        engine.analyze_query(&orders_query(), &orders_tables(), &[]).await;

        assert_eq!(augmenter.call_count(), 2);
    }

    #[tokio::test]
    async fn test_unavailable_augmenter_is_skipped() {
        let augmenter = StubAugmenter::unavailable(Behavior::Succeed(Vec::new()));
        let engine = RuleEngine::default().with_augmenter(augmenter.clone());

        let recs = engine.analyze_query(&orders_query(), &orders_tables(), &[]).await;

        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].kind, RecommendationType::MissingIndex);
        assert_eq!(augmenter.call_count(), 0);
    }

    #[tokio::test]
    async fn test_augmenter_output_is_sanitized() {
        let mut overconfident = Recommendation::new(RecommendationType::JoinIndex, "x");
        overconfident.confidence = 1.7;
        let mut negative = Recommendation::new(RecommendationType::JoinIndex, "y");
        negative.confidence = -0.2;
        let fine = Recommendation::new(RecommendationType::JoinIndex, "z").with_confidence(0.3);

        let augmenter = StubAugmenter::new(Behavior::Succeed(vec![overconfident, negative, fine]));
        let engine = RuleEngine::default().with_augmenter(augmenter);

        let confidences: Vec<f64> = engine
            .analyze_query(&orders_query(), &orders_tables(), &[])
            .await
            .iter()
            .map(|rec| rec.confidence)
            .collect();
        assert_eq!(confidences, vec![0.5, 0.5, 0.3]);
    }

    #[tokio::test]
    async fn test_cancelled_before_call_falls_back() {
        let augmenter = StubAugmenter::new(Behavior::Hang);
        let engine = RuleEngine::default().with_augmenter(augmenter.clone());
        let token = CancellationToken::new();
        token.cancel();

        let recs = engine
            .analyze_query_with_cancel(&orders_query(), &orders_tables(), &[], &token)
            .await;

        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].kind, RecommendationType::MissingIndex);
        assert!(!augmenter.cancelled.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_cancel_in_flight_call() {
        let augmenter = StubAugmenter::new(Behavior::Hang);
        let engine = RuleEngine::default().with_augmenter(augmenter.clone());
        let token = CancellationToken::new();

        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });

        let recs = engine
            .analyze_query_with_cancel(&orders_query(), &orders_tables(), &[], &token)
            .await;

        assert_eq!(augmenter.call_count(), 1);
        assert!(!augmenter.cancelled.load(Ordering::SeqCst));
        assert_eq!(recs.len(), 1);
    }

    #[tokio::test]
    async fn test_cancel_is_scoped_to_one_call() {
        let ai_rec = Recommendation::new(RecommendationType::CompositeIndex, "from ai")
            .with_confidence(0.9);
        let augmenter = StubAugmenter::new(Behavior::Delay(
            Duration::from_millis(100),
            vec![ai_rec],
        ));
        let engine = RuleEngine::default().with_augmenter(augmenter.clone());
        let tables = orders_tables();
        let query = orders_query();

        let cancelled_token = CancellationToken::new();
        let canceller = cancelled_token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });
        let live_token = CancellationToken::new();

        let (cancelled, live) = tokio::join!(
            engine.analyze_query_with_cancel(&query, &tables, &[], &cancelled_token),
            engine.analyze_query_with_cancel(&query, &tables, &[], &live_token),
        );

        assert_eq!(augmenter.call_count(), 2);
        assert!(!augmenter.cancelled.load(Ordering::SeqCst));
        let cancelled_kinds: Vec<_> = cancelled.iter().map(|rec| rec.kind).collect();
        assert_eq!(cancelled_kinds, vec![RecommendationType::MissingIndex]);
        let live_kinds: Vec<_> = live.iter().map(|rec| rec.kind).collect();
        assert_eq!(live_kinds, vec![RecommendationType::CompositeIndex]);
        assert_eq!(live[0].rationale, "from ai");
    }

    #[test]
    fn test_debug_shows_provider() {
        let engine = RuleEngine::default()
            .with_augmenter(StubAugmenter::new(Behavior::Succeed(Vec::new())));
        let rendered = format!("{engine:?}");
        assert!(rendered.contains("stub-model"));
    }
}

use super::*;

mod strip_code_fence_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_plain_content_untouched() {
        assert_eq!(strip_code_fence("  {\"a\": 1}\n"), "{\"a\": 1}");
    }

    #[test]
    fn test_fenced_content() {
        assert_eq!(strip_code_fence("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fence("```\n{\"a\": 1}\n```\n"), "{\"a\": 1}");
    }

    #[test]
    fn test_unterminated_fence() {
        assert_eq!(strip_code_fence("```json\n{\"a\": 1}"), "{\"a\": 1}");
    }
}

mod parse_recommendations_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_full_item() {
        let content = r#"{
            "recommendations": [{
                "type": "missing_index",
                "ddl": "CREATE INDEX idx_orders_customer_id ON orders (customer_id);",
                "rationale": "Sequential scan on orders",
                "confidence": 0.9,
                "impact_estimate": "Large",
                "risk_level": "low",
                "rewrite_sql": ""
            }],
            "analysis": "One missing index"
        }"#;
        let recs = parse_recommendations(content).unwrap();

        assert_eq!(recs.len(), 1);
        let rec = &recs[0];
        assert_eq!(rec.kind, RecommendationType::MissingIndex);
        assert_eq!(
            rec.ddl.as_deref(),
            Some("CREATE INDEX idx_orders_customer_id ON orders (customer_id);")
        );
        assert_eq!(rec.rationale, "Sequential scan on orders");
        assert_eq!(rec.confidence, 0.9);
        assert_eq!(rec.impact_estimate.as_deref(), Some("Large"));
        assert_eq!(rec.risk_level, RiskLevel::Low);
        assert_eq!(rec.rewrite_sql, None);
    }

    #[test]
    fn test_values_sanitized() {
        let content = r#"{"recommendations": [
            {"type": "join_index", "rationale": "a", "confidence": 1.7, "risk_level": "extreme"},
            {"type": "join_index", "rationale": "b", "confidence": -1, "risk_level": "HIGH"},
            {"type": "join_index", "rationale": "c"}
        ]}"#;
        let recs = parse_recommendations(content).unwrap();

        let scores: Vec<(f64, RiskLevel)> =
            recs.iter().map(|rec| (rec.confidence, rec.risk_level)).collect();
        assert_eq!(
            scores,
            vec![
                (0.5, RiskLevel::Medium),
                (0.5, RiskLevel::Medium),
                (0.5, RiskLevel::Medium),
            ]
        );
    }

    #[test]
    fn test_unknown_types_dropped() {
        let content = r#"{"recommendations": [
            {"type": "covering_index", "rationale": "x", "confidence": 0.8, "risk_level": "low"},
            {"type": "redundant_index", "rationale": "y", "confidence": 0.8, "risk_level": "low"}
        ]}"#;
        let recs = parse_recommendations(content).unwrap();

        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].kind, RecommendationType::RedundantIndex);
    }

    #[test]
    fn test_fenced_and_empty_payloads() {
        let fenced = "```json\n{\"recommendations\": []}\n```";
        assert!(parse_recommendations(fenced).unwrap().is_empty());
        assert!(parse_recommendations("{}").unwrap().is_empty());
    }

    #[test]
    fn test_malformed_payload() {
        for content in ["not json", "{\"recommendations\": {}}", ""] {
            assert!(matches!(
                parse_recommendations(content),
                Err(AugmentError::InvalidResponse(_))
            ));
        }
    }
}

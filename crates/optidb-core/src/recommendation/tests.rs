//! Tests for recommendations

use super::*;

mod recommendation_type_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_wire_names_round_trip_through_from_str() {
        for kind in RecommendationType::ALL {
            assert_eq!(kind.as_str().parse::<RecommendationType>(), Ok(kind));
        }
    }

    #[test]
    fn test_unknown_name_rejected() {
        let err = "covering_index".parse::<RecommendationType>().unwrap_err();
        assert_eq!(err, UnknownRecommendationType("covering_index".to_string()));
        assert_eq!(err.to_string(), "unknown recommendation type: covering_index");
    }

    #[test]
    fn test_serialization() {
        let json = serde_json::to_string(&RecommendationType::CorrelatedSubquery).unwrap();
        assert_eq!(json, "\"correlated_subquery\"");
    }

    #[test]
    fn test_title() {
        assert_eq!(RecommendationType::JoinIndex.title(), "JOIN Index Missing");
        assert_eq!(
            RecommendationType::CompositeIndex.title(),
            "Composite Index Opportunity"
        );
    }
}

mod risk_level_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_lossy() {
        assert_eq!(RiskLevel::parse_lossy("low"), RiskLevel::Low);
        assert_eq!(RiskLevel::parse_lossy("medium"), RiskLevel::Medium);
        assert_eq!(RiskLevel::parse_lossy("high"), RiskLevel::High);
        assert_eq!(RiskLevel::parse_lossy("critical"), RiskLevel::Medium);
        assert_eq!(RiskLevel::parse_lossy(""), RiskLevel::Medium);
        assert_eq!(RiskLevel::parse_lossy("LOW"), RiskLevel::Medium);
    }

    #[test]
    fn test_deserialize_coerces_unknown() {
        let risk: RiskLevel = serde_json::from_str("\"extreme\"").unwrap();
        assert_eq!(risk, RiskLevel::Medium);

        let risk: RiskLevel = serde_json::from_str("\"high\"").unwrap();
        assert_eq!(risk, RiskLevel::High);
    }

    #[test]
    fn test_serialization() {
        assert_eq!(serde_json::to_string(&RiskLevel::Low).unwrap(), "\"low\"");
    }
}

mod confidence_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_in_range_kept() {
        assert_eq!(sanitize_confidence(0.0), 0.0);
        assert_eq!(sanitize_confidence(0.85), 0.85);
        assert_eq!(sanitize_confidence(1.0), 1.0);
    }

    #[test]
    fn test_out_of_range_replaced() {
        assert_eq!(sanitize_confidence(1.2), 0.5);
        assert_eq!(sanitize_confidence(-0.1), 0.5);
        assert_eq!(sanitize_confidence(f64::NAN), 0.5);
        assert_eq!(sanitize_confidence(f64::INFINITY), 0.5);
    }
}

mod recommendation_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_builder() {
        let rec = Recommendation::new(RecommendationType::MissingIndex, "Add an index")
            .with_ddl("CREATE INDEX idx_orders_customer_id ON orders (customer_id);")
            .with_confidence(0.8)
            .with_risk(RiskLevel::Low)
            .with_impact("Faster");

        assert_eq!(rec.kind, RecommendationType::MissingIndex);
        assert_eq!(
            rec.ddl.as_deref(),
            Some("CREATE INDEX idx_orders_customer_id ON orders (customer_id);")
        );
        assert!(rec.rewrite_sql.is_none());
        assert_eq!(rec.confidence, 0.8);
        assert_eq!(rec.risk_level, RiskLevel::Low);
        assert_eq!(rec.impact_estimate.as_deref(), Some("Faster"));
    }

    #[test]
    fn test_with_confidence_replaces_out_of_range() {
        let rec = Recommendation::new(RecommendationType::JoinIndex, "x").with_confidence(7.0);
        assert_eq!(rec.confidence, 0.5);
    }

    #[test]
    fn test_sanitized() {
        let mut rec = Recommendation::new(RecommendationType::JoinIndex, "x");
        rec.confidence = -3.0;
        assert_eq!(rec.sanitized().confidence, 0.5);
    }

    #[test]
    fn test_json_shape() {
        let rec = Recommendation::new(RecommendationType::RedundantIndex, "Drop it")
            .with_ddl("DROP INDEX idx_users_email;")
            .with_confidence(0.85)
            .with_risk(RiskLevel::Low);
        let value = serde_json::to_value(&rec).unwrap();

        assert_eq!(value["type"], "redundant_index");
        assert_eq!(value["ddl"], "DROP INDEX idx_users_email;");
        assert_eq!(value["rationale"], "Drop it");
        assert_eq!(value["confidence"], 0.85);
        assert_eq!(value["risk_level"], "low");
        assert!(value.get("rewrite_sql").is_none());
        assert!(value.get("impact_estimate").is_none());
        assert!(value.get("created_at").is_some());
    }

    #[test]
    fn test_rerender_is_stable() {
        let rec = Recommendation::new(RecommendationType::CorrelatedSubquery, "Rewrite")
            .with_rewrite_sql("-- use a JOIN")
            .with_confidence(0.7);
        let json = serde_json::to_string(&rec).unwrap();
        let parsed: Recommendation = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed, rec);
        assert_eq!(serde_json::to_string(&parsed).unwrap(), json);
    }
}

mod format_bytes_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_units() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(1023), "1023 B");
        assert_eq!(format_bytes(1024), "1.0 KB");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(2 * 1024 * 1024), "2.0 MB");
        assert_eq!(format_bytes(3 * 1024 * 1024 * 1024), "3.0 GB");
    }
}

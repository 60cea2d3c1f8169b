//! Tests for plan rules

use super::*;
use pretty_assertions::assert_eq;

fn config() -> AnalyzerConfig {
    AnalyzerConfig::default()
}

fn seq_scan(id: &str, rows: u64) -> PlanNode {
    PlanNode::new(id, NodeType::SeqScan)
        .with_plan_rows(rows)
        .with_actual_rows(rows)
        .with_actual_loops(1)
}

mod seq_scan_with_filter_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_orders_user_id_is_critical_with_index_sql() {
        let node = seq_scan("3", 49_999)
            .with_relation("orders")
            .with_filter("(user_id = 123)");

        let rec = SeqScanWithFilter.check(&node, &config()).unwrap().unwrap();
        assert_eq!(rec.severity, Severity::Critical);
        assert_eq!(rec.id, "seq-scan-with-filter:3");
        assert_eq!(
            rec.sql.as_deref(),
            Some("CREATE INDEX idx_orders_user_id ON orders (user_id);")
        );
        assert!(rec.suggestion("en").unwrap().contains("user_id"));
    }

    #[test]
    fn test_between_thresholds_is_warning() {
        let node = seq_scan("1", 5_000)
            .with_relation("orders")
            .with_filter("(status = 'open')");

        let rec = SeqScanWithFilter.check(&node, &config()).unwrap().unwrap();
        assert_eq!(rec.severity, Severity::Warning);
    }

    #[test]
    fn test_multiple_columns_in_index() {
        let node = seq_scan("1", 20_000)
            .with_relation("public.orders")
            .with_filter("((user_id = 1) AND ((status)::text = 'open'::text))");

        let rec = SeqScanWithFilter.check(&node, &config()).unwrap().unwrap();
        assert_eq!(
            rec.sql.as_deref(),
            Some("CREATE INDEX idx_public_orders_user_id_status ON public.orders (user_id, status);")
        );
    }

    #[test]
    fn test_rows_at_or_below_threshold_never_fire() {
        for rows in [0, 10, 999, 1_000] {
            let node = seq_scan("1", rows)
                .with_relation("orders")
                .with_filter("(user_id = 1)");
            assert_eq!(SeqScanWithFilter.check(&node, &config()).unwrap(), None);
        }
    }

    #[test]
    fn test_falls_back_to_planned_rows() {
        let node = PlanNode::new("1", "Seq Scan")
            .with_plan_rows(2_000)
            .with_relation("orders")
            .with_filter("(user_id = 1)");
        let rec = SeqScanWithFilter.check(&node, &config()).unwrap().unwrap();
        assert_eq!(rec.severity, Severity::Warning);
    }

    #[test]
    fn test_actual_rows_take_precedence_over_estimate() {
        let node = PlanNode::new("1", "Seq Scan")
            .with_plan_rows(50_000)
            .with_actual_rows(10)
            .with_relation("orders")
            .with_filter("(user_id = 1)");
        assert_eq!(SeqScanWithFilter.check(&node, &config()).unwrap(), None);
    }

    #[test]
    fn test_requires_non_empty_filter() {
        let no_filter = seq_scan("1", 50_000).with_relation("orders");
        assert_eq!(SeqScanWithFilter.check(&no_filter, &config()).unwrap(), None);

        let blank = no_filter.with_filter("   ");
        assert_eq!(SeqScanWithFilter.check(&blank, &config()).unwrap(), None);
    }

    #[test]
    fn test_other_node_types_never_fire() {
        for node_type in ["Index Scan", "Bitmap Heap Scan", "Sort", "Nested Loop", "Parallel Seq Scan"] {
            let node = PlanNode::new("1", node_type)
                .with_plan_rows(50_000)
                .with_actual_rows(50_000)
                .with_relation("orders")
                .with_filter("(user_id = 1)");
            assert_eq!(SeqScanWithFilter.check(&node, &config()).unwrap(), None);
        }
    }

    #[test]
    fn test_unparseable_filter_gives_generic_suggestion() {
        let node = seq_scan("1", 50_000)
            .with_relation("orders")
            .with_filter("hashed SubPlan 1");

        let rec = SeqScanWithFilter.check(&node, &config()).unwrap().unwrap();
        assert_eq!(rec.sql, None);
        assert_eq!(
            rec.suggestion("en"),
            Some("Create an index on the columns used in the filter condition.")
        );
    }

    #[test]
    fn test_missing_relation_has_no_sql() {
        let node = seq_scan("1", 50_000).with_filter("(user_id = 1)");
        let rec = SeqScanWithFilter.check(&node, &config()).unwrap().unwrap();
        assert_eq!(rec.sql, None);
    }
}

mod estimation_error_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn estimated(planned: u64, actual: u64) -> PlanNode {
        PlanNode::new("9", "Index Scan")
            .with_relation("users")
            .with_plan_rows(planned)
            .with_actual_rows(actual)
    }

    #[test]
    fn test_fires_symmetrically() {
        let under = EstimationError.check(&estimated(100, 1_100), &config()).unwrap().unwrap();
        let over = EstimationError.check(&estimated(1_100, 100), &config()).unwrap().unwrap();

        assert_eq!(under.severity, Severity::Warning);
        assert_eq!(over.severity, Severity::Warning);
        assert_eq!(under.sql.as_deref(), Some("ANALYZE users;"));
    }

    #[test]
    fn test_within_band_is_quiet() {
        for (planned, actual) in [(100, 100), (100, 1_000), (1_000, 100), (100, 500)] {
            assert_eq!(
                EstimationError.check(&estimated(planned, actual), &config()).unwrap(),
                None,
                "planned={planned} actual={actual}"
            );
        }
    }

    #[test]
    fn test_zero_plan_rows_treated_as_one() {
        let rec = EstimationError.check(&estimated(0, 11), &config()).unwrap();
        assert!(rec.is_some());
        assert_eq!(EstimationError.check(&estimated(0, 10), &config()).unwrap(), None);
    }

    #[test]
    fn test_requires_actual_rows() {
        let node = PlanNode::new("1", "Seq Scan").with_plan_rows(1_000_000);
        assert_eq!(EstimationError.check(&node, &config()).unwrap(), None);
    }

    #[test]
    fn test_generic_analyze_without_relation() {
        let node = PlanNode::new("1", "Hash Join")
            .with_plan_rows(1)
            .with_actual_rows(5_000);
        let rec = EstimationError.check(&node, &config()).unwrap().unwrap();
        assert_eq!(rec.sql.as_deref(), Some("ANALYZE;"));
    }
}

mod nested_loop_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn nested_loop(loops: u64, inner: PlanNode) -> PlanNode {
        PlanNode::new("0", "Nested Loop")
            .with_actual_loops(loops)
            .with_child(PlanNode::new("1", "Index Scan").with_relation("users"))
            .with_child(inner)
    }

    #[test]
    fn test_fires_on_inner_seq_scan() {
        let node = nested_loop(5_000, PlanNode::new("2", "Seq Scan").with_relation("orders"));

        let rec = NestedLoopInnerSeqScan.check(&node, &config()).unwrap().unwrap();
        assert_eq!(rec.severity, Severity::Critical);
        assert_eq!(rec.node_id.as_str(), "0");
        assert!(rec.messages.issue.get("en").unwrap().contains("orders"));
        assert!(rec.messages.suggestion.get("zh").unwrap().contains("orders"));
        assert_eq!(rec.sql, None);
    }

    #[test]
    fn test_index_sql_from_inner_filter() {
        let inner = PlanNode::new("2", "Seq Scan")
            .with_relation("orders")
            .with_filter("(o.user_id = u.id)");
        let rec = NestedLoopInnerSeqScan
            .check(&nested_loop(5_000, inner), &config())
            .unwrap()
            .unwrap();
        assert_eq!(
            rec.sql.as_deref(),
            Some("CREATE INDEX idx_orders_user_id ON orders (user_id);")
        );
    }

    #[test]
    fn test_outer_seq_scan_does_not_fire() {
        let node = PlanNode::new("0", "Nested Loop")
            .with_actual_loops(5_000)
            .with_child(PlanNode::new("1", "Seq Scan"))
            .with_child(PlanNode::new("2", "Index Scan"));
        assert_eq!(NestedLoopInnerSeqScan.check(&node, &config()).unwrap(), None);
    }

    #[test]
    fn test_loop_threshold_is_exclusive() {
        let inner = PlanNode::new("2", "Seq Scan");
        assert_eq!(
            NestedLoopInnerSeqScan.check(&nested_loop(1_000, inner), &config()).unwrap(),
            None
        );
    }

    #[test]
    fn test_missing_loops_or_children() {
        let no_loops = PlanNode::new("0", "Nested Loop")
            .with_child(PlanNode::new("1", "Index Scan"))
            .with_child(PlanNode::new("2", "Seq Scan"));
        assert_eq!(NestedLoopInnerSeqScan.check(&no_loops, &config()).unwrap(), None);

        let single_child = PlanNode::new("0", "Nested Loop")
            .with_actual_loops(5_000)
            .with_child(PlanNode::new("1", "Seq Scan"));
        assert_eq!(NestedLoopInnerSeqScan.check(&single_child, &config()).unwrap(), None);
    }
}

mod disk_sort_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_disk_space_type_fires() {
        let node = PlanNode::new("4", "Sort").with_sort_space(SortSpaceType::Disk, 51_200);

        let rec = DiskSort.check(&node, &config()).unwrap().unwrap();
        assert_eq!(rec.severity, Severity::Warning);
        assert_eq!(rec.sql.as_deref(), Some("SET work_mem = '256MB';"));
        assert!(rec.suggestion("en").unwrap().contains("work_mem"));
        assert!(rec.messages.issue.get("en").unwrap().contains("51200 kB"));
    }

    #[test]
    fn test_external_method_fires() {
        let node = PlanNode::new("4", "Sort").with_sort_method("External Merge");
        assert!(DiskSort.check(&node, &config()).unwrap().is_some());
    }

    #[test]
    fn test_memory_sort_is_quiet() {
        let node = PlanNode::new("4", "Sort")
            .with_sort_method("quicksort")
            .with_sort_space(SortSpaceType::Memory, 25);
        assert_eq!(DiskSort.check(&node, &config()).unwrap(), None);

        let bare = PlanNode::new("5", "Sort");
        assert_eq!(DiskSort.check(&bare, &config()).unwrap(), None);
    }

    #[test]
    fn test_configured_work_mem() {
        let mut config = config();
        config.rules.suggested_work_mem = "1GB".to_string();

        let node = PlanNode::new("4", "Sort").with_sort_space(SortSpaceType::Disk, 1);
        let rec = DiskSort.check(&node, &config).unwrap().unwrap();
        assert_eq!(rec.sql.as_deref(), Some("SET work_mem = '1GB';"));
    }
}

mod registry_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_order() {
        let registry = RuleRegistry::default();
        assert_eq!(
            registry.names(),
            vec![
                "seq-scan-with-filter",
                "estimation-error",
                "nested-loop-inner-seq-scan",
                "disk-sort",
                "hash-batch-spill",
                "lossy-bitmap",
            ]
        );
    }

    #[test]
    fn test_extension_slots_stay_quiet() {
        let node = PlanNode::new("1", "Hash")
            .with_plan_rows(1)
            .with_actual_rows(1_000_000);
        assert_eq!(HashBatchSpill.check(&node, &config()).unwrap(), None);
        assert_eq!(LossyBitmap.check(&node, &config()).unwrap(), None);
    }

    #[test]
    fn test_register_appends() {
        let mut registry = RuleRegistry::empty();
        assert!(registry.is_empty());

        registry.register(FnRule::new("always-info", |node: &PlanNode, _: &AnalyzerConfig| {
            Ok(Some(Recommendation::new(
                "always-info",
                &node.id,
                Severity::Info,
                Default::default(),
            )))
        }));
        registry.register(DiskSort);

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.names(), vec!["always-info", "disk-sort"]);

        let node = PlanNode::new("1", "Result");
        let first = registry.rules().next().unwrap();
        assert_eq!(first.check(&node, &config()).unwrap().unwrap().id, "always-info:1");
    }
}

#[test]
fn test_multiple_rules_fire_on_one_node() {
    let node = seq_scan("1", 0)
        .with_plan_rows(10)
        .with_actual_rows(50_000)
        .with_relation("orders")
        .with_filter("(user_id = 1)");

    let registry = RuleRegistry::default();
    let fired: Vec<_> = registry
        .rules()
        .filter_map(|rule| rule.check(&node, &config()).unwrap())
        .map(|rec| rec.rule)
        .collect();
    assert_eq!(fired, vec!["seq-scan-with-filter", "estimation-error"]);
}

// ==========================================
// 导入流水线集成测试
// ==========================================
// 测试目标: 预扫描 → 计划 → 校验 → 提交 → 来源查询 全流程
// 解析器: 内存 MockParser
// ==========================================


use equip_compare::config::MappingConfig;
use equip_compare::domain::{
    DataTypeRegistry, DatasetSide, DatasetSlot, ImportAction, Project, ProjectMode,
};
use equip_compare::engine::{available_scenarios, query_provenance, ImportOrchestrator};
use equip_compare::importer::{scan_files, ConflictDetector, ImportError, ImportPlan};
use equip_compare::logging::{self, ImportContext};
use std::path::PathBuf;
use test_helpers::{scenario_counts, DatasetBuilder, MockParser};

fn files(names: &[&str]) -> Vec<PathBuf> {
    names.iter().map(PathBuf::from).collect()
}

fn slot_with(dataset: equip_compare::domain::Dataset) -> DatasetSlot {
    DatasetSlot {
        dataset,
        ..DatasetSlot::default()
    }
}

/// 扫描并按 Composite 规则生成默认计划
fn composite_plan(parser: &MockParser, names: &[&str], slot: &DatasetSlot) -> ImportPlan {
    let mut ctx = ImportContext::new();
    let batch = scan_files(parser, &files(names), &MappingConfig::default(), &mut ctx);
    assert!(batch.errors.is_empty());
    ImportPlan::build(&batch.results, &available_scenarios(&slot.dataset))
}

#[test]
fn test_standard_mode_replaces_only_touched_types() {
    logging::init_test();

    let mut slot = slot_with(
        DatasetBuilder::new()
            .simple("Bus", "OLD-", 10)
            .simple("Fuse", "F-", 5)
            .build(),
    );
    let parser = MockParser::new().with_file(
        "bus.csv",
        DatasetBuilder::new().simple("Bus", "NEW-", 4).build(),
    );
    let mut ctx = ImportContext::new();

    let conflict = ConflictDetector.pre_scan(
        &parser,
        &files(&["bus.csv"]),
        &MappingConfig::default(),
        &slot.dataset,
        &mut ctx,
    );
    assert!(conflict.will_overwrite);
    assert_eq!(conflict.affected_types, vec!["Bus (10 existing)"]);

    let batch = scan_files(&parser, &files(&["bus.csv"]), &MappingConfig::default(), &mut ctx);
    let plan = ImportPlan::whole_files(&batch.results);
    let result = ImportOrchestrator::new(&parser)
        .commit(&plan, ProjectMode::Standard, &mut slot, &MappingConfig::default(), &mut ctx)
        .unwrap();

    assert_eq!(result.success_count, 1);
    assert_eq!(slot.dataset.type_count("Bus"), 4);
    assert_eq!(slot.dataset.type_count("Fuse"), 5);
    assert_eq!(slot.provenance.source_for_type("Bus"), Some("bus.csv"));
    assert_eq!(slot.import_log[0].cleared_types, vec!["Bus"]);
}

#[test]
fn test_standard_mode_batch_clears_type_once() {
    let mut slot = slot_with(DatasetBuilder::new().simple("Bus", "OLD-", 10).build());
    let parser = MockParser::new()
        .with_file("a.csv", DatasetBuilder::new().simple("Bus", "A-", 3).build())
        .with_file("b.csv", DatasetBuilder::new().simple("Bus", "B-", 2).build());
    let mut ctx = ImportContext::new();

    let batch = scan_files(&parser, &files(&["a.csv", "b.csv"]), &MappingConfig::default(), &mut ctx);
    let plan = ImportPlan::whole_files(&batch.results);
    ImportOrchestrator::new(&parser)
        .commit(&plan, ProjectMode::Standard, &mut slot, &MappingConfig::default(), &mut ctx)
        .unwrap();

    // 同批次第二个文件不会清掉第一个文件刚写入的数据
    assert_eq!(slot.dataset.type_count("Bus"), 5);
    assert_eq!(slot.provenance.source_for_type("Bus"), Some("b.csv"));
}

#[test]
fn test_composite_overwrite_keeps_unselected_scenario() {
    let mut slot = slot_with(
        DatasetBuilder::new()
            .scenario_tagged("ArcFlash", "Main-Min", 40, "old")
            .scenario_tagged("ArcFlash", "Main-Max", 40, "old")
            .build(),
    );
    let parser = MockParser::new().with_file(
        "min.csv",
        DatasetBuilder::new()
            .scenario_tagged("ArcFlash", "Main-Min", 38, "new")
            .build(),
    );

    let mut plan = composite_plan(&parser, &["min.csv"], &slot);
    // 默认 AddNew 与已有场景同名
    assert!(!plan.can_commit());
    plan.set_action(0, ImportAction::Overwrite).unwrap();
    plan.set_overwrite_target(0, "Main-Min").unwrap();
    assert!(plan.can_commit());

    let mut ctx = ImportContext::new();
    ImportOrchestrator::new(&parser)
        .commit(&plan, ProjectMode::Composite, &mut slot, &MappingConfig::default(), &mut ctx)
        .unwrap();

    assert_eq!(
        scenario_counts(&slot.dataset, "ArcFlash"),
        vec![("Main-Max".to_string(), 40), ("Main-Min".to_string(), 38)]
    );
    let source = slot.provenance.source_for_scenario("ArcFlash", "Main-Min").unwrap();
    assert_eq!(source.file_path, "min.csv");
    assert!(slot
        .provenance
        .source_for_scenario("ArcFlash", "Main-Max")
        .is_none());
}

#[test]
fn test_composite_addnew_rename() {
    let mut slot = DatasetSlot::default();
    let parser = MockParser::new().with_file(
        "study.csv",
        DatasetBuilder::new()
            .scenario("ArcFlash", "Main-Min", 5)
            .simple("Bus", "B-", 5)
            .build(),
    );

    let mut plan = composite_plan(&parser, &["study.csv"], &slot);
    plan.set_new_name(0, "Baseline").unwrap();

    let mut ctx = ImportContext::new();
    ImportOrchestrator::new(&parser)
        .commit(&plan, ProjectMode::Composite, &mut slot, &MappingConfig::default(), &mut ctx)
        .unwrap();

    let scenarios = available_scenarios(&slot.dataset);
    assert_eq!(scenarios, vec!["Baseline"]);
    assert_eq!(slot.dataset.type_count("Bus"), 5);

    let source = slot.provenance.source_for_scenario("ArcFlash", "Baseline").unwrap();
    assert_eq!(source.original_scenario.as_deref(), Some("Main-Min"));
    assert_eq!(slot.provenance.source_for_type("Bus"), Some("study.csv"));
}

#[test]
fn test_additional_scenarios_default_to_skip() {
    let mut slot = DatasetSlot::default();
    let parser = MockParser::new().with_file(
        "study.csv",
        DatasetBuilder::new()
            .scenario("ShortCircuit", "Case-A", 3)
            .scenario("ShortCircuit", "Case-B", 3)
            .scenario("ShortCircuit", "Case-C", 3)
            .build(),
    );

    let mut plan = composite_plan(&parser, &["study.csv"], &slot);
    assert_eq!(plan.rows.len(), 3);
    plan.set_action(2, ImportAction::AddNew).unwrap();

    let mut ctx = ImportContext::new();
    let result = ImportOrchestrator::new(&parser)
        .commit(&plan, ProjectMode::Composite, &mut slot, &MappingConfig::default(), &mut ctx)
        .unwrap();

    assert_eq!(result.merged_entries, 6);
    assert_eq!(available_scenarios(&slot.dataset), vec!["Case-A", "Case-C"]);
}

#[test]
fn test_duplicate_addnew_names_block_commit() {
    let mut slot = DatasetSlot::default();
    let parser = MockParser::new()
        .with_file("a.csv", DatasetBuilder::new().scenario("ArcFlash", "Case1", 2).build())
        .with_file("b.csv", DatasetBuilder::new().scenario("ArcFlash", "Case2", 2).build());

    let mut plan = composite_plan(&parser, &["a.csv", "b.csv"], &slot);
    plan.set_new_name(1, "CASE1").unwrap();
    assert!(plan.rows.iter().all(|r| r.error.is_some()));

    let mut ctx = ImportContext::new();
    let err = ImportOrchestrator::new(&parser)
        .commit(&plan, ProjectMode::Composite, &mut slot, &MappingConfig::default(), &mut ctx)
        .unwrap_err();

    assert!(matches!(err, ImportError::PlanInvalid(_)));
    assert!(slot.dataset.is_empty());
    assert!(slot.provenance.is_empty());

    // 修正后可提交
    plan.set_new_name(1, "Case2").unwrap();
    assert!(plan.can_commit());
}

#[test]
fn test_repeated_import_does_not_grow_provenance() {
    let mut slot = DatasetSlot::default();
    let parser = MockParser::new().with_file(
        "study.csv",
        DatasetBuilder::new()
            .scenario("ArcFlash", "Main-Min", 4)
            .simple("Bus", "B-", 4)
            .build(),
    );
    let plan = composite_plan(&parser, &["study.csv"], &slot);
    let orchestrator = ImportOrchestrator::new(&parser);

    let mut ctx = ImportContext::new();
    orchestrator
        .commit(&plan, ProjectMode::Composite, &mut slot, &MappingConfig::default(), &mut ctx)
        .unwrap();
    let first = query_provenance(&slot);

    orchestrator
        .commit(&plan, ProjectMode::Composite, &mut slot, &MappingConfig::default(), &mut ctx)
        .unwrap();
    let second = query_provenance(&slot);

    assert_eq!(first, second);
    assert_eq!(second.leaf_count(), 2);
    assert_eq!(slot.import_log.len(), 2);
    assert_eq!(slot.dataset.type_count("ArcFlash"), 4);
}

#[test]
fn test_per_file_failure_does_not_abort_batch() {
    let mut slot = DatasetSlot::default();
    let parser = MockParser::new()
        .with_file("good.csv", DatasetBuilder::new().simple("Motor", "M-", 2).build());
    let mut ctx = ImportContext::new();

    let batch = scan_files(
        &parser,
        &files(&["missing.csv", "good.csv"]),
        &MappingConfig::default(),
        &mut ctx,
    );
    assert_eq!(batch.errors.len(), 1);
    assert_eq!(batch.results.len(), 1);

    let plan = ImportPlan::whole_files(&batch.results);
    let result = ImportOrchestrator::new(&parser)
        .commit(&plan, ProjectMode::Standard, &mut slot, &MappingConfig::default(), &mut ctx)
        .unwrap();
    assert_eq!(result.success_count, 1);
    assert_eq!(slot.dataset.type_count("Motor"), 2);
}

#[test]
fn test_pre_scan_systemic_failure_is_conservative() {
    let slot = DatasetSlot::default();
    let parser = MockParser::new()
        .with_file("a.csv", DatasetBuilder::new().simple("Bus", "B-", 1).build())
        .with_systemic_failure("broken.csv");
    let mut ctx = ImportContext::new();

    let conflict = ConflictDetector.pre_scan(
        &parser,
        &files(&["a.csv", "broken.csv"]),
        &MappingConfig::default(),
        &slot.dataset,
        &mut ctx,
    );
    assert!(conflict.will_overwrite);
    assert_eq!(conflict.affected_types, vec!["Unknown"]);
}

#[test]
fn test_mode_change_requires_confirmation() {
    let registry = DataTypeRegistry::standard();
    let mut project = Project::new("Substation", &registry);
    *project.dataset_mut(DatasetSide::New) = DatasetBuilder::new().simple("Bus", "B-", 3).build();

    assert!(project.set_mode(ProjectMode::Composite, false).is_err());
    assert_eq!(project.dataset(DatasetSide::New).type_count("Bus"), 3);

    assert!(project.set_mode(ProjectMode::Composite, true).unwrap());
    assert!(project.dataset(DatasetSide::New).is_empty());
    assert_eq!(project.metadata.name, "Substation");
}

#[test]
fn test_cleared_dataset_reports_no_provenance() {
    let registry = DataTypeRegistry::standard();
    let mut project = Project::new("Substation", &registry);
    project.set_mode(ProjectMode::Composite, true).unwrap();
    let parser = MockParser::new().with_file(
        "study.csv",
        DatasetBuilder::new()
            .scenario("ArcFlash", "Main-Max", 3)
            .simple("Bus", "B-", 3)
            .build(),
    );

    let plan = composite_plan(&parser, &["study.csv"], project.slot(DatasetSide::New));
    let mut ctx = ImportContext::new();
    ImportOrchestrator::new(&parser)
        .commit(
            &plan,
            ProjectMode::Composite,
            project.slot_mut(DatasetSide::New),
            &MappingConfig::default(),
            &mut ctx,
        )
        .unwrap();
    assert_eq!(query_provenance(project.slot(DatasetSide::New)).leaf_count(), 2);

    project.clear_dataset(DatasetSide::New);
    assert!(project.dataset(DatasetSide::New).is_empty());
    assert!(query_provenance(project.slot(DatasetSide::New)).files.is_empty());

    // 模式切换清空同理
    ImportOrchestrator::new(&parser)
        .commit(
            &plan,
            ProjectMode::Composite,
            project.slot_mut(DatasetSide::New),
            &MappingConfig::default(),
            &mut ctx,
        )
        .unwrap();
    project.set_mode(ProjectMode::Standard, true).unwrap();
    assert!(query_provenance(project.slot(DatasetSide::New)).files.is_empty());
    assert_eq!(project.slot(DatasetSide::New).import_log.len(), 2);
}

#[test]
fn test_row_edited_outside_plan_api_is_refused() {
    let mut slot = DatasetSlot::default();
    let parser = MockParser::new().with_file(
        "study.csv",
        DatasetBuilder::new()
            .scenario("ArcFlash", "Main-Max", 3)
            .scenario("ArcFlash", "Main-Min", 3)
            .build(),
    );
    let mut plan = composite_plan(&parser, &["study.csv"], &slot);
    plan.rows[1].action = ImportAction::AddNew;
    plan.rows[1].new_name = Some("main-max".to_string());

    let mut ctx = ImportContext::new();
    let err = ImportOrchestrator::new(&parser)
        .commit(&plan, ProjectMode::Composite, &mut slot, &MappingConfig::default(), &mut ctx)
        .unwrap_err();

    assert!(matches!(err, ImportError::PlanInvalid(_)));
    assert!(slot.dataset.is_empty());
    assert!(ctx.has_errors());
}

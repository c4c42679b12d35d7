// ==========================================
// 设备数据集导入系统 - 合并引擎
// ==========================================
// 职责: 将暂存数据集写入目标数据集
// 策略:
// - Standard: 类型粒度整体替换（同批次内首次触及某类型时清空）
// - Composite: 以计划行为准，按场景 新增/覆盖/跳过
// 红线: 同键后写者胜，不做字段级调和
// ==========================================

use crate::domain::dataset::{Dataset, EntryKey, KeyingMismatch, TypeCollection};
use crate::domain::keys::normalize_scenario;
use crate::domain::registry::DataTypeDescriptor;
use crate::domain::types::ImportAction;
use crate::importer::planner::ImportPlanRow;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

// ==========================================
// KeyRemap - 场景分量重映射
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyRemap {
    /// 归一化原始标签 → 目标标签（None = 跳过）
    scenarios: BTreeMap<String, Option<String>>,
    /// 未登记的标签是否丢弃
    strict: bool,
    /// 是否写入简单型类型
    skip_simple: bool,
}

impl KeyRemap {
    /// 全部原样写入
    pub fn identity() -> Self {
        Self::default()
    }

    /// 仅写入显式登记的场景
    pub fn strict() -> Self {
        Self {
            strict: true,
            ..Self::default()
        }
    }

    pub fn rename(mut self, original: &str, target: &str) -> Self {
        self.scenarios
            .insert(normalize_scenario(original), Some(target.trim().to_string()));
        self
    }

    pub fn skip(mut self, original: &str) -> Self {
        self.scenarios.insert(normalize_scenario(original), None);
        self
    }

    pub fn without_simple_types(mut self) -> Self {
        self.skip_simple = true;
        self
    }

    /// 由同一文件的计划行构建
    ///
    /// 全部为整文件行时等同 identity；否则严格按行写入，
    /// 且仅当至少一行非 Skip 时写入简单型类型。
    pub fn from_rows<'a, I>(rows: I) -> Self
    where
        I: IntoIterator<Item = &'a ImportPlanRow>,
    {
        let rows: Vec<&ImportPlanRow> = rows.into_iter().collect();
        if rows.iter().all(|r| r.is_whole_file()) {
            return Self::identity();
        }

        let mut remap = Self::strict();
        for row in &rows {
            let Some(original) = row.original_scenario.as_deref() else {
                continue;
            };
            remap = match row.target_scenario() {
                Some(target) => remap.rename(original, target),
                None => remap.skip(original),
            };
        }
        if rows.iter().all(|r| r.action == ImportAction::Skip) {
            remap = remap.without_simple_types();
        }
        remap
    }

    /// 计算场景标签的落地标签（None = 不写入）
    pub fn resolve(&self, label: &str) -> Option<String> {
        match self.scenarios.get(&normalize_scenario(label)) {
            Some(target) => target.clone(),
            None if self.strict => None,
            None => Some(label.to_string()),
        }
    }

    pub fn includes_simple(&self) -> bool {
        !self.skip_simple
    }
}

// ==========================================
// MergeOutcome - 合并结果
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    /// 写入条目数
    pub written: usize,
    /// 其中替换已有键的条目数
    pub replaced: usize,
    /// 因跳过未写入的条目数
    pub dropped: usize,
    /// 合并前被清除的条目数（Standard 清类型 / Composite 覆盖场景）
    pub removed: usize,
    /// 各类型写入条目数
    pub type_counts: BTreeMap<String, usize>,
    /// 合并前被整体清空的类型
    pub cleared_types: Vec<String>,
}

impl MergeOutcome {
    fn absorb(&mut self, other: MergeOutcome) {
        self.written += other.written;
        self.replaced += other.replaced;
        self.dropped += other.dropped;
        self.removed += other.removed;
        for (data_type, count) in other.type_counts {
            *self.type_counts.entry(data_type).or_insert(0) += count;
        }
        self.cleared_types.extend(other.cleared_types);
    }
}

/// 合并原语: 逐条写入（按 remap 改写场景分量），同键覆盖
///
/// 场景分量与目标中已有场景仅大小写不同时，沿用目标的写法。
///
/// # 参数
/// - scratch: 暂存数据集（只读）
/// - target: 目标数据集
/// - remap: 场景重映射
pub fn merge_into(
    scratch: &Dataset,
    target: &mut Dataset,
    remap: &KeyRemap,
) -> Result<MergeOutcome, KeyingMismatch> {
    let mut outcome = MergeOutcome::default();

    for (data_type, collection) in scratch.collections() {
        if collection.is_empty() {
            continue;
        }
        if matches!(collection, TypeCollection::Simple(_)) && !remap.includes_simple() {
            outcome.dropped += collection.len();
            continue;
        }

        let descriptor = DataTypeDescriptor {
            name: data_type.to_string(),
            keying: collection.keying(),
        };
        let target_collection = target.ensure_collection(&descriptor)?;

        // 归一化标签 → 落地写法；目标已有的写法优先，避免大小写变体并存
        let mut spellings: BTreeMap<String, String> = target_collection
            .scenario_labels()
            .into_iter()
            .map(|label| (normalize_scenario(&label), label))
            .collect();

        let mut written = 0;
        for (key, entry) in collection.iter() {
            let effective = match key {
                EntryKey::Simple(id) => EntryKey::Simple(id),
                EntryKey::Scenario(key) => match remap.resolve(&key.scenario) {
                    Some(label) => {
                        let label = spellings
                            .entry(normalize_scenario(&label))
                            .or_insert_with(|| label.trim().to_string())
                            .clone();
                        EntryKey::Scenario(key.with_scenario(label))
                    }
                    None => {
                        outcome.dropped += 1;
                        continue;
                    }
                },
            };
            if target_collection
                .upsert(data_type, effective, entry.clone())?
                .is_some()
            {
                outcome.replaced += 1;
            }
            written += 1;
        }

        if written > 0 {
            outcome.written += written;
            outcome.type_counts.insert(data_type.to_string(), written);
        }
    }

    Ok(outcome)
}

// ==========================================
// StandardMerge - 类型粒度替换
// ==========================================
/// 一个批次共用一个实例，保证同批次多文件写同类型时只清空一次
#[derive(Debug, Default)]
pub struct StandardMerge {
    cleared: BTreeSet<String>,
}

impl StandardMerge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(
        &mut self,
        scratch: &Dataset,
        target: &mut Dataset,
    ) -> Result<MergeOutcome, KeyingMismatch> {
        let mut outcome = MergeOutcome::default();

        for data_type in scratch.non_empty_types() {
            if self.cleared.insert(data_type.to_string()) {
                let removed = target.clear_type(data_type);
                debug!(data_type, removed, "Standard 模式清空类型");
                outcome.removed += removed;
                outcome.cleared_types.push(data_type.to_string());
            }
        }

        outcome.absorb(merge_into(scratch, target, &KeyRemap::identity())?);
        Ok(outcome)
    }
}

// ==========================================
// CompositeMerge - 场景粒度合并
// ==========================================
pub struct CompositeMerge;

impl CompositeMerge {
    /// 按单个文件的计划行合并
    ///
    /// Overwrite 行先删除目标中该场景在本文件所涉类型下的条目，再写入；
    /// AddNew 行按新名写入；Skip 行不写入。
    pub fn apply(
        scratch: &Dataset,
        target: &mut Dataset,
        rows: &[&ImportPlanRow],
    ) -> Result<MergeOutcome, KeyingMismatch> {
        let mut outcome = MergeOutcome::default();

        for row in rows.iter().filter(|r| r.action == ImportAction::Overwrite) {
            let (Some(original), Some(overwrite_target)) =
                (row.original_scenario.as_deref(), row.target_scenario())
            else {
                continue;
            };
            for (data_type, collection) in scratch.collections() {
                if collection.count_for_scenario(original) == 0 {
                    continue;
                }
                if let Some(existing) = target.collection_mut(data_type) {
                    let removed = existing.remove_scenario(overwrite_target);
                    debug!(data_type, scenario = overwrite_target, removed, "覆盖前清除场景");
                    outcome.removed += removed;
                }
            }
        }

        let remap = KeyRemap::from_rows(rows.iter().copied());
        outcome.absorb(merge_into(scratch, target, &remap)?);
        Ok(outcome)
    }
}

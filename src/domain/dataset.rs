// ==========================================
// 设备数据集导入系统 - 数据集模型
// ==========================================
// 职责: 类型集合容器（简单型 / 场景型）与数据集整体
// 红线: 同一集合内键唯一；同键写入整条替换，不做字段级合并
// ==========================================

use crate::domain::keys::{normalize_scenario, scenario_eq, CompositeKey};
use crate::domain::registry::{DataTypeDescriptor, DataTypeRegistry, Keying};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

// ==========================================
// EquipmentEntry - 设备条目
// ==========================================
// 字段内容由解析器按映射配置填充，核心逻辑不解释字段含义
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquipmentEntry {
    pub fields: BTreeMap<String, String>,
}

impl EquipmentEntry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// 条目键（与集合的键控方式对应）
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntryKey {
    Simple(String),
    Scenario(CompositeKey),
}

impl EntryKey {
    pub fn scenario(&self) -> Option<&str> {
        match self {
            EntryKey::Simple(_) => None,
            EntryKey::Scenario(key) => Some(key.scenario.as_str()),
        }
    }
}

/// 键控方式不匹配（例如向简单型集合写入复合键）
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("数据类型 {data_type} 键控方式不匹配: 期望 {expected:?}, 实际 {actual:?}")]
pub struct KeyingMismatch {
    pub data_type: String,
    pub expected: Keying,
    pub actual: Keying,
}

// ==========================================
// TypeCollection - 类型集合
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "CollectionDoc", try_from = "CollectionDoc")]
pub enum TypeCollection {
    Simple(BTreeMap<String, EquipmentEntry>),
    Scenario {
        has_secondary: bool,
        entries: BTreeMap<CompositeKey, EquipmentEntry>,
    },
}

impl TypeCollection {
    pub fn for_keying(keying: Keying) -> Self {
        match keying {
            Keying::Simple => TypeCollection::Simple(BTreeMap::new()),
            Keying::Scenario { has_secondary } => TypeCollection::Scenario {
                has_secondary,
                entries: BTreeMap::new(),
            },
        }
    }

    pub fn keying(&self) -> Keying {
        match self {
            TypeCollection::Simple(_) => Keying::Simple,
            TypeCollection::Scenario { has_secondary, .. } => Keying::Scenario {
                has_secondary: *has_secondary,
            },
        }
    }

    pub fn len(&self) -> usize {
        match self {
            TypeCollection::Simple(entries) => entries.len(),
            TypeCollection::Scenario { entries, .. } => entries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 清空条目，返回清除数量
    pub fn clear(&mut self) -> usize {
        let removed = self.len();
        match self {
            TypeCollection::Simple(entries) => entries.clear(),
            TypeCollection::Scenario { entries, .. } => entries.clear(),
        }
        removed
    }

    /// 写入条目（同键整条替换），返回被替换的旧条目
    pub fn upsert(
        &mut self,
        data_type: &str,
        key: EntryKey,
        entry: EquipmentEntry,
    ) -> Result<Option<EquipmentEntry>, KeyingMismatch> {
        match (self, key) {
            (TypeCollection::Simple(entries), EntryKey::Simple(id)) => Ok(entries.insert(id, entry)),
            (TypeCollection::Scenario { entries, .. }, EntryKey::Scenario(key)) => {
                Ok(entries.insert(key, entry))
            }
            (collection, key) => Err(KeyingMismatch {
                data_type: data_type.to_string(),
                expected: collection.keying(),
                actual: match key {
                    EntryKey::Simple(_) => Keying::Simple,
                    EntryKey::Scenario(k) => Keying::Scenario {
                        has_secondary: k.secondary_id.is_some(),
                    },
                },
            }),
        }
    }

    pub fn get(&self, key: &EntryKey) -> Option<&EquipmentEntry> {
        match (self, key) {
            (TypeCollection::Simple(entries), EntryKey::Simple(id)) => entries.get(id),
            (TypeCollection::Scenario { entries, .. }, EntryKey::Scenario(key)) => entries.get(key),
            _ => None,
        }
    }

    /// 遍历全部条目（键为克隆值）
    pub fn iter(&self) -> Box<dyn Iterator<Item = (EntryKey, &EquipmentEntry)> + '_> {
        match self {
            TypeCollection::Simple(entries) => Box::new(
                entries
                    .iter()
                    .map(|(id, entry)| (EntryKey::Simple(id.clone()), entry)),
            ),
            TypeCollection::Scenario { entries, .. } => Box::new(
                entries
                    .iter()
                    .map(|(key, entry)| (EntryKey::Scenario(key.clone()), entry)),
            ),
        }
    }

    /// 按场景统计条目数（大小写不敏感合并，保留首次出现的写法）
    ///
    /// 简单型集合返回空表。
    pub fn scenario_counts(&self) -> BTreeMap<String, usize> {
        let TypeCollection::Scenario { entries, .. } = self else {
            return BTreeMap::new();
        };

        let mut by_normalized: BTreeMap<String, (String, usize)> = BTreeMap::new();
        for key in entries.keys() {
            let slot = by_normalized
                .entry(normalize_scenario(&key.scenario))
                .or_insert_with(|| (key.scenario.trim().to_string(), 0));
            slot.1 += 1;
        }

        by_normalized.into_values().collect()
    }

    pub fn scenario_labels(&self) -> Vec<String> {
        self.scenario_counts().into_keys().collect()
    }

    pub fn count_for_scenario(&self, label: &str) -> usize {
        match self {
            TypeCollection::Simple(_) => 0,
            TypeCollection::Scenario { entries, .. } => {
                entries.keys().filter(|k| k.scenario_matches(label)).count()
            }
        }
    }

    /// 删除指定场景的全部条目，返回删除数量
    pub fn remove_scenario(&mut self, label: &str) -> usize {
        let TypeCollection::Scenario { entries, .. } = self else {
            return 0;
        };
        let before = entries.len();
        entries.retain(|key, _| !key.scenario_matches(label));
        before - entries.len()
    }

    /// 将场景 old 改名为 new（仅重映射场景分量），返回改名条目数
    ///
    /// 目标键已存在时被覆盖；new 与已有场景仅大小写不同时沿用已有写法。
    pub fn rename_scenario(&mut self, old: &str, new: &str) -> usize {
        if old.trim() == new.trim() {
            return 0;
        }
        let new = self
            .scenario_labels()
            .into_iter()
            .find(|label| scenario_eq(label, new) && !scenario_eq(label, old))
            .unwrap_or_else(|| new.trim().to_string());
        let TypeCollection::Scenario { entries, .. } = self else {
            return 0;
        };

        let matching: Vec<CompositeKey> = entries
            .keys()
            .filter(|k| k.scenario_matches(old))
            .cloned()
            .collect();

        let mut moved = Vec::with_capacity(matching.len());
        for key in matching {
            if let Some(entry) = entries.remove(&key) {
                moved.push((key.with_scenario(new.as_str()), entry));
            }
        }

        let renamed = moved.len();
        entries.extend(moved);
        renamed
    }
}

// ==========================================
// 持久化文档形式
// ==========================================
// 复合键按 {id, secondary_id, scenario} 显式展开，保证往返后分量可区分
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CollectionDoc {
    keying: Keying,
    #[serde(default)]
    entries: Vec<EntryDoc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct EntryDoc {
    id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    secondary_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    scenario: Option<String>,
    #[serde(default)]
    fields: BTreeMap<String, String>,
}

impl From<TypeCollection> for CollectionDoc {
    fn from(collection: TypeCollection) -> Self {
        let keying = collection.keying();
        let entries = match collection {
            TypeCollection::Simple(entries) => entries
                .into_iter()
                .map(|(id, entry)| EntryDoc {
                    id,
                    secondary_id: None,
                    scenario: None,
                    fields: entry.fields,
                })
                .collect(),
            TypeCollection::Scenario { entries, .. } => entries
                .into_iter()
                .map(|(key, entry)| EntryDoc {
                    id: key.id,
                    secondary_id: key.secondary_id,
                    scenario: Some(key.scenario),
                    fields: entry.fields,
                })
                .collect(),
        };
        CollectionDoc { keying, entries }
    }
}

impl TryFrom<CollectionDoc> for TypeCollection {
    type Error = String;

    fn try_from(doc: CollectionDoc) -> Result<Self, Self::Error> {
        let mut collection = TypeCollection::for_keying(doc.keying);
        for entry_doc in doc.entries {
            let entry = EquipmentEntry {
                fields: entry_doc.fields,
            };
            let key = match doc.keying {
                Keying::Simple => EntryKey::Simple(entry_doc.id),
                Keying::Scenario { .. } => {
                    let scenario = entry_doc
                        .scenario
                        .ok_or_else(|| format!("场景型条目缺少场景分量: id={}", entry_doc.id))?;
                    EntryKey::Scenario(CompositeKey {
                        id: entry_doc.id,
                        secondary_id: entry_doc.secondary_id,
                        scenario,
                    })
                }
            };
            collection
                .upsert("(document)", key, entry)
                .map_err(|e| e.to_string())?;
        }
        Ok(collection)
    }
}

// ==========================================
// DatasetMetadata - 数据集元信息
// ==========================================
// 清空数据集时保留
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetMetadata {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub study_date: Option<chrono::NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
}

// ==========================================
// Dataset - 数据集
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub metadata: DatasetMetadata,
    #[serde(default)]
    collections: BTreeMap<String, TypeCollection>,
    /// 场景标签首次写入的顺序（仅用于扫描，不持久化）
    #[serde(skip)]
    scenario_order: Vec<String>,
}

// 相等性只看内容，不看写入顺序
impl PartialEq for Dataset {
    fn eq(&self, other: &Self) -> bool {
        self.metadata == other.metadata && self.collections == other.collections
    }
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// 按注册表预建全部类型集合
    pub fn with_registry(registry: &DataTypeRegistry) -> Self {
        let collections = registry
            .descriptors()
            .iter()
            .map(|d| (d.name.clone(), TypeCollection::for_keying(d.keying)))
            .collect();
        Self {
            metadata: DatasetMetadata::default(),
            collections,
            scenario_order: Vec::new(),
        }
    }

    /// 获取（必要时创建）类型集合
    pub fn ensure_collection(
        &mut self,
        descriptor: &DataTypeDescriptor,
    ) -> Result<&mut TypeCollection, KeyingMismatch> {
        let collection = self
            .collections
            .entry(descriptor.name.clone())
            .or_insert_with(|| TypeCollection::for_keying(descriptor.keying));

        if collection.keying() != descriptor.keying {
            return Err(KeyingMismatch {
                data_type: descriptor.name.clone(),
                expected: collection.keying(),
                actual: descriptor.keying,
            });
        }
        Ok(collection)
    }

    /// 写入单条条目（同键整条替换）
    pub fn upsert(
        &mut self,
        descriptor: &DataTypeDescriptor,
        key: EntryKey,
        entry: EquipmentEntry,
    ) -> Result<Option<EquipmentEntry>, KeyingMismatch> {
        let scenario = key.scenario().map(str::to_string);
        let replaced = self
            .ensure_collection(descriptor)?
            .upsert(&descriptor.name, key, entry)?;
        if let Some(label) = scenario {
            self.note_scenario(&label);
        }
        Ok(replaced)
    }

    fn note_scenario(&mut self, label: &str) {
        if !self.scenario_order.iter().any(|s| scenario_eq(s, label)) {
            self.scenario_order.push(label.trim().to_string());
        }
    }

    /// 按首次写入顺序列出现存场景（大小写不敏感去重）
    ///
    /// 未经 upsert 写入的场景（如反序列化得到的）按归一化形式排序后追加。
    pub fn discovered_scenarios(&self) -> Vec<String> {
        let mut labels: Vec<String> = self
            .scenario_order
            .iter()
            .filter(|label| self.has_scenario(label))
            .cloned()
            .collect();
        let mut rest: Vec<(String, String)> = self
            .collections
            .values()
            .flat_map(TypeCollection::scenario_labels)
            .filter(|label| !labels.iter().any(|l| scenario_eq(l, label)))
            .map(|label| (normalize_scenario(&label), label))
            .collect();
        rest.sort();
        rest.dedup_by(|a, b| a.0 == b.0);
        labels.extend(rest.into_iter().map(|(_, label)| label));
        labels
    }

    pub fn collection(&self, data_type: &str) -> Option<&TypeCollection> {
        self.collections.get(data_type)
    }

    pub fn collection_mut(&mut self, data_type: &str) -> Option<&mut TypeCollection> {
        self.collections.get_mut(data_type)
    }

    pub fn collections(&self) -> impl Iterator<Item = (&str, &TypeCollection)> {
        self.collections.iter().map(|(name, c)| (name.as_str(), c))
    }

    pub fn type_count(&self, data_type: &str) -> usize {
        self.collection(data_type).map(TypeCollection::len).unwrap_or(0)
    }

    /// 有数据的类型名列表
    pub fn non_empty_types(&self) -> Vec<&str> {
        self.collections()
            .filter(|(_, c)| !c.is_empty())
            .map(|(name, _)| name)
            .collect()
    }

    pub fn total_entries(&self) -> usize {
        self.collections.values().map(TypeCollection::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total_entries() == 0
    }

    /// 整体清空条目（保留元信息与集合结构），返回清除数量
    pub fn clear_entries(&mut self) -> usize {
        self.scenario_order.clear();
        self.collections.values_mut().map(TypeCollection::clear).sum()
    }

    /// 清空单个类型，返回清除数量
    pub fn clear_type(&mut self, data_type: &str) -> usize {
        self.collection_mut(data_type)
            .map(TypeCollection::clear)
            .unwrap_or(0)
    }

    /// 在所有场景型集合中将场景 old 改名为 new，返回改名条目数
    pub fn rename_scenario(&mut self, old: &str, new: &str) -> usize {
        self.collections
            .values_mut()
            .map(|c| c.rename_scenario(old, new))
            .sum()
    }

    /// 在所有场景型集合中删除场景，返回删除条目数
    pub fn remove_scenario(&mut self, label: &str) -> usize {
        self.collections
            .values_mut()
            .map(|c| c.remove_scenario(label))
            .sum()
    }

    /// 场景是否存在于任一场景型集合
    pub fn has_scenario(&self, label: &str) -> bool {
        self.collections.values().any(|c| match c {
            TypeCollection::Simple(_) => false,
            TypeCollection::Scenario { entries, .. } => {
                entries.keys().any(|k| scenario_eq(&k.scenario, label))
            }
        })
    }
}

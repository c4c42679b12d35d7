// ==========================================
// 设备数据集导入系统 - 数据类型注册表
// ==========================================
// 职责: 声明式登记所有设备数据类型及其键控方式
// 所有"是否有数据/清空数据"等操作统一遍历注册表，不再按类型名分支
// ==========================================

use serde::{Deserialize, Serialize};

// ==========================================
// 键控方式 (Keying)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Keying {
    /// 单一标识 → 条目（无场景维度）
    Simple,
    /// (标识[, 次级标识], 场景) → 条目
    Scenario { has_secondary: bool },
}

impl Keying {
    pub fn is_scenario(&self) -> bool {
        matches!(self, Keying::Scenario { .. })
    }

    pub fn has_secondary(&self) -> bool {
        matches!(self, Keying::Scenario { has_secondary: true })
    }
}

/// 数据类型描述
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataTypeDescriptor {
    pub name: String,
    pub keying: Keying,
}

impl DataTypeDescriptor {
    pub fn simple(name: &str) -> Self {
        Self {
            name: name.to_string(),
            keying: Keying::Simple,
        }
    }

    pub fn scenario(name: &str) -> Self {
        Self {
            name: name.to_string(),
            keying: Keying::Scenario {
                has_secondary: false,
            },
        }
    }

    pub fn scenario_with_secondary(name: &str) -> Self {
        Self {
            name: name.to_string(),
            keying: Keying::Scenario {
                has_secondary: true,
            },
        }
    }
}

// 设备台账类（无场景维度）
const SIMPLE_TYPES: &[&str] = &[
    "Bus",
    "Utility",
    "Generator",
    "Transformer",
    "Cable",
    "Motor",
    "Fuse",
    "LVCB",
    "HVCB",
    "Relay",
    "Switch",
    "Panel",
    "MCC",
    "ATS",
    "UPS",
    "Inverter",
    "Capacitor",
    "Reactor",
];

// 研究结果类（按 (标识, 场景) 键控）
const SCENARIO_TYPES: &[&str] = &["ArcFlash", "ShortCircuit", "EquipmentDuty"];

// 保护设备开断能力校核（按 (设备, 所在母线, 场景) 键控）
const SCENARIO_SECONDARY_TYPES: &[&str] = &["LVCBDuty", "FuseDuty", "HVCBDuty"];

// ==========================================
// DataTypeRegistry - 数据类型注册表
// ==========================================
#[derive(Debug, Clone)]
pub struct DataTypeRegistry {
    descriptors: Vec<DataTypeDescriptor>,
}

impl DataTypeRegistry {
    pub fn new(descriptors: Vec<DataTypeDescriptor>) -> Self {
        Self { descriptors }
    }

    /// 标准设备类型注册表
    pub fn standard() -> Self {
        let descriptors = SIMPLE_TYPES
            .iter()
            .map(|name| DataTypeDescriptor::simple(name))
            .chain(SCENARIO_TYPES.iter().map(|name| DataTypeDescriptor::scenario(name)))
            .chain(
                SCENARIO_SECONDARY_TYPES
                    .iter()
                    .map(|name| DataTypeDescriptor::scenario_with_secondary(name)),
            )
            .collect();
        Self { descriptors }
    }

    pub fn descriptors(&self) -> &[DataTypeDescriptor] {
        &self.descriptors
    }

    /// 按名称查找（大小写不敏感）
    pub fn get(&self, name: &str) -> Option<&DataTypeDescriptor> {
        self.descriptors
            .iter()
            .find(|d| d.name.eq_ignore_ascii_case(name.trim()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn scenario_types(&self) -> impl Iterator<Item = &DataTypeDescriptor> {
        self.descriptors.iter().filter(|d| d.keying.is_scenario())
    }
}

impl Default for DataTypeRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

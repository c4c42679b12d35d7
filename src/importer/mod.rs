// ==========================================
// 设备数据集导入系统 - 导入层
// ==========================================
// 职责: 文件解析、预扫描、冲突检测、导入计划
// 支持: CSV, Excel (xlsx/xls/xlsm/ods)
// ==========================================

// 模块声明
pub mod conflict_detector;
pub mod error;
pub mod field_mapper;
pub mod file_parser;
pub mod parser_trait;
pub mod planner;
pub mod scan;
pub mod tabular_parser;

// 重导出核心类型
pub use conflict_detector::{ConflictDetector, ConflictResult};
pub use error::{ImportError, ImportResult};
pub use field_mapper::FieldMapper;
pub use file_parser::{CsvParser, ExcelParser, UniversalFileParser};
pub use planner::{ImportPlan, ImportPlanRow};
pub use scan::{scan_file, scan_files, FileError, FileScanResult, ScanBatch};
pub use tabular_parser::TabularDatasetParser;

// 重导出 Trait 接口
pub use parser_trait::{DatasetParser, FileParser, RawTable};

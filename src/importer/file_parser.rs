// ==========================================
// 设备数据集导入系统 - 文件解析器实现
// ==========================================
// 阶段 0: 文件读取与解析
// 支持: CSV (.csv) / Excel (.xlsx/.xls/.xlsm/.ods)
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use crate::importer::parser_trait::{FileParser, RawTable};
use calamine::{open_workbook_auto, Reader};
use csv::ReaderBuilder;
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

fn check_exists(path: &Path) -> ImportResult<()> {
    if !path.exists() {
        return Err(ImportError::FileNotFound(path.display().to_string()));
    }
    Ok(())
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

fn table_name_of(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown")
        .to_string()
}

// ==========================================
// CSV Parser 实现
// ==========================================
pub struct CsvParser;

impl FileParser for CsvParser {
    fn parse_to_tables(&self, file_path: &Path) -> ImportResult<Vec<RawTable>> {
        check_exists(file_path)?;

        let ext = extension_of(file_path);
        if ext != "csv" {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        let file = File::open(file_path)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true) // 允许行长度不一致
            .from_reader(file);

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            let mut row_map = HashMap::new();

            for (col_idx, value) in record.iter().enumerate() {
                if let Some(header) = headers.get(col_idx) {
                    row_map.insert(header.clone(), value.trim().to_string());
                }
            }

            // 跳过完全空白的行
            if row_map.values().all(|v| v.is_empty()) {
                continue;
            }

            rows.push(row_map);
        }

        Ok(vec![RawTable {
            name: table_name_of(file_path),
            headers,
            rows,
        }])
    }
}

// ==========================================
// Excel Parser 实现
// ==========================================
// 每个工作表独立成表；空工作表跳过
pub struct ExcelParser;

impl FileParser for ExcelParser {
    fn parse_to_tables(&self, file_path: &Path) -> ImportResult<Vec<RawTable>> {
        check_exists(file_path)?;

        let ext = extension_of(file_path);
        if !matches!(ext.as_str(), "xlsx" | "xls" | "xlsm" | "ods") {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        let mut workbook = open_workbook_auto(file_path)?;

        let sheet_names = workbook.sheet_names().to_owned();
        if sheet_names.is_empty() {
            return Err(ImportError::ExcelParseError(
                "Excel 文件无工作表".to_string(),
            ));
        }

        let mut tables = Vec::new();
        for sheet_name in sheet_names {
            let range = workbook.worksheet_range(&sheet_name)?;

            let mut sheet_rows = range.rows();
            let Some(header_row) = sheet_rows.next() else {
                continue;
            };

            let headers: Vec<String> = header_row
                .iter()
                .map(|cell| cell.to_string().trim().to_string())
                .collect();

            let mut rows = Vec::new();
            for data_row in sheet_rows {
                let mut row_map = HashMap::new();

                for (col_idx, cell) in data_row.iter().enumerate() {
                    if let Some(header) = headers.get(col_idx) {
                        row_map.insert(header.clone(), cell.to_string().trim().to_string());
                    }
                }

                // 跳过完全空白的行
                if row_map.values().all(|v| v.is_empty()) {
                    continue;
                }

                rows.push(row_map);
            }

            tables.push(RawTable {
                name: sheet_name,
                headers,
                rows,
            });
        }

        Ok(tables)
    }
}

// ==========================================
// 通用文件解析器（根据扩展名自动选择）
// ==========================================
pub struct UniversalFileParser;

impl FileParser for UniversalFileParser {
    fn parse_to_tables(&self, file_path: &Path) -> ImportResult<Vec<RawTable>> {
        match extension_of(file_path).as_str() {
            "csv" => CsvParser.parse_to_tables(file_path),
            "xlsx" | "xls" | "xlsm" | "ods" => ExcelParser.parse_to_tables(file_path),
            other => Err(ImportError::UnsupportedFormat(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    fn csv_file(lines: &[&str]) -> tempfile::NamedTempFile {
        let mut temp_file = Builder::new().suffix(".csv").tempfile().unwrap();
        for line in lines {
            writeln!(temp_file, "{}", line).unwrap();
        }
        temp_file
    }

    #[test]
    fn test_csv_parser_valid_file() {
        let temp_file = csv_file(&["Bus Name,Base kV", "BUS-1,0.48", "BUS-2, 4.16 "]);

        let tables = CsvParser.parse_to_tables(temp_file.path()).unwrap();

        assert_eq!(tables.len(), 1);
        let table = &tables[0];
        assert_eq!(table.headers, vec!["Bus Name", "Base kV"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].get("Bus Name"), Some(&"BUS-1".to_string()));
        assert_eq!(table.rows[1].get("Base kV"), Some(&"4.16".to_string()));
    }

    #[test]
    fn test_csv_parser_file_not_found() {
        let result = CsvParser.parse_to_tables(Path::new("non_existent.csv"));
        assert!(matches!(result, Err(ImportError::FileNotFound(_))));
    }

    #[test]
    fn test_csv_parser_skip_empty_rows() {
        let temp_file = csv_file(&["Bus Name,Base kV", "BUS-1,0.48", ",", "BUS-2,4.16"]);

        let tables = CsvParser.parse_to_tables(temp_file.path()).unwrap();

        assert_eq!(tables[0].rows.len(), 2);
    }

    #[test]
    fn test_universal_parser_rejects_unknown_extension() {
        let temp_file = Builder::new().suffix(".txt").tempfile().unwrap();
        let result = UniversalFileParser.parse_to_tables(temp_file.path());
        assert!(matches!(result, Err(ImportError::UnsupportedFormat(ext)) if ext == "txt"));
    }

    #[test]
    fn test_raw_table_has_column_case_insensitive() {
        let table = RawTable {
            name: "t".into(),
            headers: vec!["Bus Name".into()],
            rows: Vec::new(),
        };
        assert!(table.has_column("bus name"));
        assert!(!table.has_column("Scenario"));
    }
}

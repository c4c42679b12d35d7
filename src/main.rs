// ==========================================
// 设备数据集导入系统 - 命令行入口
// ==========================================
// 用法:
//   equip-compare scan <mapping.json> <files...>
//   equip-compare import <new|old> <mapping.json> <files...>
//   equip-compare provenance <new|old>
//   equip-compare stats <new|old>
// 项目库: EQUIP_COMPARE_PROJECT_PATH 或用户数据目录
// ==========================================

use anyhow::{bail, Context, Result};
use equip_compare::api::ImportApi;
use equip_compare::config::{default_project_path, MappingConfig};
use equip_compare::domain::DatasetSide;
use equip_compare::logging::{self, ImportContext};
use std::path::PathBuf;

const USAGE: &str = "\
用法:
  equip-compare scan <mapping.json> <files...>
  equip-compare import <new|old> <mapping.json> <files...>
  equip-compare provenance <new|old>
  equip-compare stats <new|old>";

fn main() -> Result<()> {
    logging::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some((command, rest)) = args.split_first() else {
        println!("{}", USAGE);
        return Ok(());
    };

    let db_path = default_project_path();
    tracing::info!(db = %db_path.display(), "使用项目库");
    let api = ImportApi::open(&db_path)
        .with_context(|| format!("无法打开项目库 {}", db_path.display()))?;

    match command.as_str() {
        "scan" => run_scan(&api, rest),
        "import" => run_import(&api, rest),
        "provenance" => run_provenance(&api, rest),
        "stats" => run_stats(&api, rest),
        other => bail!("未知命令: {}\n{}", other, USAGE),
    }
}

fn parse_side(arg: Option<&String>) -> Result<DatasetSide> {
    let raw = arg.context("缺少数据集参数 <new|old>")?;
    raw.parse::<DatasetSide>()
        .map_err(|e| anyhow::anyhow!("{}", e))
}

fn load_mapping(arg: Option<&String>) -> Result<MappingConfig> {
    let path = arg.context("缺少映射配置文件参数")?;
    Ok(MappingConfig::from_json_file(path)?)
}

fn print_messages(ctx: &ImportContext) {
    for message in ctx.messages() {
        println!(
            "[{:?}] {}: {}",
            message.level,
            message.file.as_deref().unwrap_or("-"),
            message.message
        );
    }
}

fn run_scan(api: &ImportApi, args: &[String]) -> Result<()> {
    let mapping = load_mapping(args.first())?;
    let files: Vec<PathBuf> = args.iter().skip(1).map(PathBuf::from).collect();
    if files.is_empty() {
        bail!("未指定文件\n{}", USAGE);
    }

    let mut ctx = ImportContext::new();
    let batch = api.scan_files(&files, &mapping, &mut ctx);
    for result in &batch.results {
        println!("{}", result.file_path.display());
        for (data_type, count) in &result.type_counts {
            println!("  {:<16} {}", data_type, count);
        }
        for (scenario, count) in &result.scenario_counts {
            println!("  [场景] {:<16} {}", scenario, count);
        }
    }
    for error in &batch.errors {
        println!("失败: {}: {}", error.file_path.display(), error.message);
    }
    Ok(())
}

fn run_import(api: &ImportApi, args: &[String]) -> Result<()> {
    let side = parse_side(args.first())?;
    let mapping = load_mapping(args.get(1))?;
    let files: Vec<PathBuf> = args.iter().skip(2).map(PathBuf::from).collect();
    if files.is_empty() {
        bail!("未指定文件\n{}", USAGE);
    }

    let mut ctx = ImportContext::new();
    let conflict = api.pre_scan(side, &files, &mapping, &mut ctx)?;
    if conflict.will_overwrite {
        println!("警告: 以下类型已有数据: {}", conflict.affected_types.join(", "));
    }

    let batch = api.scan_files(&files, &mapping, &mut ctx);
    let plan = api.build_plan(side, &batch.results)?;
    for row in plan.invalid_rows() {
        println!(
            "计划错误: {} [{}]: {}",
            row.file_path.display(),
            row.original_scenario.as_deref().unwrap_or("-"),
            row.error.as_deref().unwrap_or("")
        );
    }

    let result = api.commit(side, &plan, &mapping, &mut ctx)?;
    print_messages(&ctx);
    println!(
        "完成: {}/{} 个文件，写入 {} 条",
        result.success_count, result.total_files, result.merged_entries
    );
    Ok(())
}

fn run_provenance(api: &ImportApi, args: &[String]) -> Result<()> {
    let side = parse_side(args.first())?;
    let tree = api.query_provenance(side)?;
    for (file, provenance) in &tree.files {
        println!("{}", file);
        for (data_type, scenarios) in &provenance.data_types {
            println!("  {}", data_type);
            for attribution in scenarios {
                match &attribution.original_scenario {
                    Some(original) => {
                        println!("    {} (原名 {})", attribution.target_scenario, original)
                    }
                    None => println!("    {}", attribution.target_scenario),
                }
            }
        }
    }
    Ok(())
}

fn run_stats(api: &ImportApi, args: &[String]) -> Result<()> {
    let side = parse_side(args.first())?;
    for (data_type, counts) in api.statistics(side)? {
        println!("{}", data_type);
        for (scenario, count) in counts {
            println!("  {:<16} {}", scenario, count);
        }
    }
    Ok(())
}

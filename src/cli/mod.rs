//! 命令行层
//!
//! 只做参数解析和分发，具体工作交给 services / orchestrator / assembler。

pub mod commands;

use crate::assembler::{self, BookMeta};
use crate::config::Config;
use crate::models::list_json_files;
use crate::orchestrator::BatchProcessor;
use crate::services::generator::is_mcq_file;
use crate::services::normalizer::{self, OrderSource};
use crate::services::scanner::{self, FileListing, ScanOptions};
use crate::services::{ai_sorter, comparator, flattener, name_checker, LlmService, OrderSession, WarnWriter};
use crate::utils::{atomic_write, logging};
use crate::workflow::{FileFlow, GenerateFlow, ReviewFlow};
use anyhow::{Context, Result};
use clap::Parser;
use commands::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// 审阅结果的默认子目录
const REVIEW_SUBFOLDER: &str = "reviews";

#[derive(Parser, Debug)]
#[command(
    name = "mcq-tools",
    version,
    about = "Organize, order, generate and assemble MCQ JSON files into a book."
)]
pub struct Cli {
    /// Config file (defaults to $MCQ_TOOLS_CONFIG or ./mcq_tools.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Debug logging
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub async fn run(self, config: Config) -> Result<()> {
        match self.command {
            Commands::Scan(args) => run_scan(args),
            Commands::Order(args) => run_order(args, &config),
            Commands::Rename(args) => run_rename(args, &config),
            Commands::StripPrefixes(args) => run_strip_prefixes(args),
            Commands::Compare(args) => run_compare(args),
            Commands::Flatten(args) => run_flatten(args),
            Commands::Generate(args) => run_generate(args, &config).await,
            Commands::Review(args) => run_review(args, &config).await,
            Commands::Sort(args) => run_sort(args, &config).await,
            Commands::CheckNames(args) => run_check_names(args, &config),
            Commands::Build(args) => run_build(args, &config),
        }
    }
}

fn folder_or_default(folder: Option<PathBuf>, config: &Config) -> PathBuf {
    folder.unwrap_or_else(|| PathBuf::from(&config.mcq_folder))
}

fn run_scan(args: ScanArgs) -> Result<()> {
    let mut options = ScanOptions::new(args.mode);
    if let Some(ext) = args.ext {
        options = options.with_extension(ext);
    }
    if let Some(pattern) = &args.ignore {
        options = options.with_ignore(pattern)?;
    }

    let files = scanner::scan(&args.folder, &options)?;
    let mut listing = FileListing::new(&args.folder, args.mode, files);
    if let Some(marker) = &args.exclude_marked {
        let removed = listing.filter_marked(marker);
        info!("已排除 {} 个带 '{}' 标记的条目", removed, marker);
    }

    for file in &listing.files {
        println!("{}", file);
    }
    info!("✓ 共 {} 个文件 ({})", listing.files.len(), listing.description);

    if let Some(output) = args.output {
        let json = serde_json::to_vec_pretty(&listing)?;
        atomic_write(&output, &json)?;
        info!("✓ 列表已保存: {}", output.display());
    }
    Ok(())
}

fn run_order(args: OrderArgs, config: &Config) -> Result<()> {
    let session = match &args.from {
        Some(order_file) => OrderSession::from_order_file(order_file)?,
        None => OrderSession::from_folder(&folder_or_default(args.folder, config))?,
    };
    let mut session = session.update_master(!args.no_master);

    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    let outcome = session.run(stdin.lock(), &mut stdout)?;

    if let Some(artifact) = outcome.artifact {
        println!("Ordering file: {}", artifact.display());
    }
    if let Some(master) = outcome.master {
        println!("Master order:  {}", master.display());
    }
    Ok(())
}

fn run_rename(args: RenameArgs, config: &Config) -> Result<()> {
    let folder = folder_or_default(args.folder, config);
    let source = match args.order {
        Some(path) => OrderSource::Artifact(path),
        None => OrderSource::Alphabetical,
    };

    let report = normalizer::normalize_folder(&folder, &source, args.base, args.dry_run)?;
    let verb = if args.dry_run { "would rename" } else { "renamed" };
    for plan in &report.renamed {
        println!("{} {} -> {}", verb, plan.from, plan.to);
    }
    Ok(())
}

fn run_strip_prefixes(args: StripPrefixesArgs) -> Result<()> {
    let changes =
        normalizer::strip_prefixes_in_list(&args.input, args.output.as_deref(), args.dry_run)?;
    for change in &changes {
        println!("line {}: {} -> {}", change.line, change.before, change.after);
    }
    info!("✓ 修改了 {} 行", changes.len());
    Ok(())
}

fn run_compare(args: CompareArgs) -> Result<()> {
    let result = comparator::compare_files(&args.first, &args.second)?;
    let mut stdout = std::io::stdout();
    result.write_report(
        &args.first.display().to_string(),
        &args.second.display().to_string(),
        &mut stdout,
    )?;
    if result.is_identical() {
        info!("✓ 两个列表一致");
    }
    Ok(())
}

fn run_flatten(args: FlattenArgs) -> Result<()> {
    let report = flattener::flatten(&args.folder, args.ignore.as_deref(), args.dry_run)?;
    if args.dry_run {
        for (src, dst) in &report.copied {
            println!("would copy {} -> {}", src, dst.display());
        }
    }
    Ok(())
}

/// 需要处理的题目文件（顶层 `*_mcqs.json`）
fn mcq_files(folder: &Path) -> Result<Vec<PathBuf>> {
    let files: Vec<PathBuf> = list_json_files(folder)?
        .into_iter()
        .filter(|p| {
            p.file_name()
                .map(|n| is_mcq_file(&n.to_string_lossy()))
                .unwrap_or(false)
        })
        .collect();
    Ok(files)
}

async fn run_batch(
    tool: &str,
    folder: &Path,
    output_dir: &Path,
    concurrency: usize,
    flow: Arc<dyn FileFlow>,
) -> Result<()> {
    logging::log_startup(tool, &folder.display().to_string());

    let files = mcq_files(folder)?;
    if files.is_empty() {
        warn!("⚠️ 没有找到 *_mcqs.json 文件，程序结束");
        return Ok(());
    }
    logging::log_files_loaded(files.len(), concurrency);

    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("无法创建输出目录 {}", output_dir.display()))?;

    let warn_writer = Arc::new(WarnWriter::in_folder(output_dir));
    let stats = BatchProcessor::new(concurrency)
        .with_warn_writer(warn_writer)
        .run(flow, files)
        .await?;

    logging::print_final_stats(
        stats.success,
        stats.skipped,
        stats.failed,
        &output_dir.display().to_string(),
    );
    Ok(())
}

async fn run_generate(args: GenerateArgs, config: &Config) -> Result<()> {
    let folder = folder_or_default(args.folder, config);
    let output_dir = args
        .output_dir
        .unwrap_or_else(|| folder.join(&config.generated_folder));
    let backend = Arc::new(LlmService::new(config)?);
    let flow = GenerateFlow::new(backend, output_dir.clone()).overwrite(args.overwrite);
    let concurrency = args.concurrency.unwrap_or(config.max_concurrent_requests);

    run_batch("题目生成", &folder, &output_dir, concurrency, Arc::new(flow)).await
}

async fn run_review(args: ReviewArgs, config: &Config) -> Result<()> {
    let folder = folder_or_default(args.folder, config);
    let output_dir = args
        .output_dir
        .unwrap_or_else(|| folder.join(REVIEW_SUBFOLDER));
    // 审阅需要更稳定的输出
    let backend = Arc::new(LlmService::new(config)?.with_temperature(0.1));
    let flow = ReviewFlow::new(backend, output_dir.clone());
    let concurrency = args.concurrency.unwrap_or(config.max_concurrent_requests);

    run_batch("题目审阅", &folder, &output_dir, concurrency, Arc::new(flow)).await
}

async fn run_sort(args: SortArgs, config: &Config) -> Result<()> {
    let folder = folder_or_default(args.folder, config);
    let output = args.output.unwrap_or_else(|| config.order_file.clone());
    logging::log_startup("教材排序", &folder.display().to_string());

    let backend = LlmService::new(config)?.with_temperature(0.1);
    let outcome = ai_sorter::sort_folder(&backend, &folder, &output).await?;

    if outcome.used_fallback {
        warn!("⚠️ 使用了文件名前缀顺序");
    }
    if !outcome.added.is_empty() {
        warn!("⚠️ {} 个文件被追加到末尾", outcome.added.len());
    }
    for (i, name) in outcome.files.iter().take(10).enumerate() {
        println!("{:3}. {}", i + 1, name);
    }
    if outcome.files.len() > 10 {
        println!("     ... ({} more)", outcome.files.len() - 10);
    }
    println!("{}", outcome.order_file.display());
    Ok(())
}

fn run_check_names(args: CheckNamesArgs, config: &Config) -> Result<()> {
    let folder = folder_or_default(args.folder, config);
    let stats = name_checker::check_names(&folder, &args.target)?;
    println!(
        "total {} | correct {} | renamed {} | errors {}",
        stats.total, stats.correct, stats.renamed, stats.errors
    );
    Ok(())
}

/// 顺序文件：显式参数 → 工作目录中的 `order_file` → 题目文件夹中的 `order_file`
fn resolve_order_file(explicit: Option<PathBuf>, folder: &Path, config: &Config) -> PathBuf {
    if let Some(path) = explicit {
        return path;
    }
    let in_cwd = PathBuf::from(&config.order_file);
    if in_cwd.exists() {
        in_cwd
    } else {
        folder.join(&config.order_file)
    }
}

fn run_build(args: BuildArgs, config: &Config) -> Result<()> {
    let folder = folder_or_default(args.folder, config);
    let order_file = resolve_order_file(args.order_file, &folder, config);
    logging::log_startup("书籍组装", &folder.display().to_string());
    info!("📋 顺序文件: {}", order_file.display());

    let order = assembler::read_order_lines(&order_file)?;
    let mut meta = BookMeta::from_config(config);
    if let Some(placement) = args.answers {
        meta.answer_placement = placement;
    }
    meta.show_chapter_source |= args.show_source;

    let warn_writer = WarnWriter::in_folder(&args.output_dir);
    let (book, report) = assembler::build_book(&folder, &order, meta, Some(&warn_writer))?;
    let stem = args.stem.unwrap_or_else(|| config.output_stem.clone());
    let written = assembler::write_outputs(&book, args.format, &args.output_dir, &stem)?;

    info!("✓ 章节: {}", report.chapters);
    info!("✓ 题目总数: {}", report.mcqs);
    if !report.skipped_files.is_empty() {
        warn!(
            "✗ 跳过文件: {} (详见 {})",
            report.skipped_files.len(),
            warn_writer.path().display()
        );
    }
    if report.skipped_mcqs > 0 {
        warn!("✗ 跳过不完整题目: {}", report.skipped_mcqs);
    }
    for path in written {
        println!("{}", path.display());
    }
    Ok(())
}

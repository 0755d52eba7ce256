//! 子命令与参数定义

use crate::assembler::{AnswerPlacement, OutputFormat};
use crate::services::scanner::ScanMode;
use clap::{Args, Subcommand};
use std::path::PathBuf;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List files in a folder and optionally save the listing as JSON
    Scan(ScanArgs),

    /// Interactively reorder the JSON files of a folder and write an ordering file
    Order(OrderArgs),

    /// Renumber JSON files with zero-padded prefixes (alphabetical or from an ordering file)
    Rename(RenameArgs),

    /// Strip numeric prefixes from every line of a list file
    StripPrefixes(StripPrefixesArgs),

    /// Compare two filename lists and report names missing from either side
    Compare(CompareArgs),

    /// Copy files from all subfolders into the main folder
    Flatten(FlattenArgs),

    /// Generate new MCQs for every `*_mcqs.json` file using the LLM
    Generate(GenerateArgs),

    /// Ask the LLM to review every MCQ file and save the reviews
    Review(ReviewArgs),

    /// Ask the LLM to order the files by textbook chapter and write the order file
    Sort(SortArgs),

    /// Check that each file name matches its disease field
    CheckNames(CheckNamesArgs),

    /// Assemble the ordered MCQ files into a Markdown and/or DOCX book
    Build(BuildArgs),
}

#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Folder to scan
    pub folder: PathBuf,

    #[arg(long, value_enum, default_value_t = ScanMode::TopLevel)]
    pub mode: ScanMode,

    /// Keep only files with this extension
    #[arg(long)]
    pub ext: Option<String>,

    /// Ignore file names matching this glob pattern
    #[arg(long)]
    pub ignore: Option<String>,

    /// Drop entries under directories whose name contains this marker
    #[arg(long)]
    pub exclude_marked: Option<String>,

    /// Write the listing to this JSON file
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct OrderArgs {
    /// Folder with the JSON files (defaults to `mcq_folder`)
    pub folder: Option<PathBuf>,

    /// Continue from an existing ordering file instead of scanning the folder
    #[arg(long)]
    pub from: Option<PathBuf>,

    /// Do not overwrite order.txt when generating
    #[arg(long)]
    pub no_master: bool,
}

#[derive(Args, Debug)]
pub struct RenameArgs {
    /// Folder with the JSON files (defaults to `mcq_folder`)
    pub folder: Option<PathBuf>,

    /// Ordering file to number by; alphabetical when omitted
    #[arg(long)]
    pub order: Option<PathBuf>,

    /// First number to assign
    #[arg(long, default_value_t = 1)]
    pub base: usize,

    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args, Debug)]
pub struct StripPrefixesArgs {
    pub input: PathBuf,

    /// Write here instead of overwriting the input
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args, Debug)]
pub struct CompareArgs {
    pub first: PathBuf,
    pub second: PathBuf,
}

#[derive(Args, Debug)]
pub struct FlattenArgs {
    pub folder: PathBuf,

    /// Skip file names matching this glob pattern
    #[arg(long)]
    pub ignore: Option<String>,

    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Folder with the source MCQ files (defaults to `mcq_folder`)
    pub folder: Option<PathBuf>,

    /// Where to write generated files (defaults to `<folder>/<generated_folder>`)
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Regenerate even when the output file exists
    #[arg(long)]
    pub overwrite: bool,

    /// Parallel LLM requests (defaults to `max_concurrent_requests`)
    #[arg(long)]
    pub concurrency: Option<usize>,
}

#[derive(Args, Debug)]
pub struct ReviewArgs {
    /// Folder with the MCQ files (defaults to `mcq_folder`)
    pub folder: Option<PathBuf>,

    /// Where to write reviews (defaults to `<folder>/reviews`)
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    #[arg(long)]
    pub concurrency: Option<usize>,
}

#[derive(Args, Debug)]
pub struct SortArgs {
    /// Folder with the MCQ files (defaults to `mcq_folder`)
    pub folder: Option<PathBuf>,

    /// Order file name inside the folder (defaults to `order_file`)
    #[arg(long)]
    pub output: Option<String>,
}

#[derive(Args, Debug)]
pub struct CheckNamesArgs {
    /// Folder with the MCQ files (defaults to `mcq_folder`)
    pub folder: Option<PathBuf>,

    /// Subfolder receiving renamed copies
    #[arg(long, default_value = crate::services::name_checker::RENAMED_SUBFOLDER)]
    pub target: String,
}

#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Folder with the MCQ files (defaults to `mcq_folder`)
    #[arg(long)]
    pub folder: Option<PathBuf>,

    /// Ordering file (defaults to `order_file`, looked up in the working directory then the folder)
    #[arg(long)]
    pub order_file: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Markdown)]
    pub format: OutputFormat,

    #[arg(long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Output file name without extension (defaults to `output_stem`)
    #[arg(long)]
    pub stem: Option<String>,

    /// immediate, chapter_end or book_end (defaults to `answer_placement`)
    #[arg(long)]
    pub answers: Option<AnswerPlacement>,

    /// Show the source file under each chapter heading
    #[arg(long)]
    pub show_source: bool,
}

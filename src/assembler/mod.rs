//! 书籍组装层
//!
//! 按顺序文件把题目 JSON 拼成一本书，再交给渲染器输出为 Markdown / DOCX。

pub mod book;
pub mod docx;
pub mod markdown;

use crate::config::Config;
use crate::error::AppResult;
use crate::utils::atomic_write;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::info;

pub use book::{build_book, read_order_lines, resolve_entry, AssemblyReport, Book, Chapter};
pub use docx::DocxRenderer;
pub use markdown::MarkdownRenderer;

/// 答案放在哪里
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerPlacement {
    /// 每道题后面紧跟答案和解析
    #[default]
    Immediate,
    /// 每章末尾统一列出答案
    ChapterEnd,
    /// 全书末尾统一列出答案
    BookEnd,
}

impl FromStr for AnswerPlacement {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "immediate" => Ok(Self::Immediate),
            "chapter_end" => Ok(Self::ChapterEnd),
            "book_end" => Ok(Self::BookEnd),
            other => Err(format!("未知的答案位置: {}", other)),
        }
    }
}

/// 输出格式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Markdown,
    Docx,
    Both,
}

/// 书籍元信息
#[derive(Debug, Clone)]
pub struct BookMeta {
    pub title: String,
    pub author: String,
    pub year: String,
    pub answer_placement: AnswerPlacement,
    /// 章节标题下是否显示来源文件
    pub show_chapter_source: bool,
}

impl BookMeta {
    pub fn from_config(config: &Config) -> Self {
        Self {
            title: config.book_title.clone(),
            author: config.book_author.clone(),
            year: config.book_year.clone(),
            answer_placement: config.answer_placement,
            show_chapter_source: config.show_chapter_source,
        }
    }
}

/// 渲染器：把组装好的书转换为某种文件格式
pub trait Renderer {
    /// 输出文件扩展名（不含点）
    fn extension(&self) -> &'static str;

    fn render(&self, book: &Book) -> AppResult<Vec<u8>>;
}

/// 按输出格式写出文件，返回写出的路径
pub fn write_outputs(
    book: &Book,
    format: OutputFormat,
    output_dir: &Path,
    stem: &str,
) -> AppResult<Vec<PathBuf>> {
    let renderers: Vec<Box<dyn Renderer>> = match format {
        OutputFormat::Markdown => vec![Box::new(MarkdownRenderer)],
        OutputFormat::Docx => vec![Box::new(DocxRenderer)],
        OutputFormat::Both => vec![Box::new(MarkdownRenderer), Box::new(DocxRenderer)],
    };

    let mut written = Vec::with_capacity(renderers.len());
    for renderer in renderers {
        let path = output_dir.join(format!("{}.{}", stem, renderer.extension()));
        let bytes = renderer.render(book)?;
        atomic_write(&path, &bytes)?;
        info!("✓ 已输出: {}", path.display());
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_answer_placement_parses_both_separators() {
        assert_eq!("chapter_end".parse::<AnswerPlacement>(), Ok(AnswerPlacement::ChapterEnd));
        assert_eq!("Book-End".parse::<AnswerPlacement>(), Ok(AnswerPlacement::BookEnd));
        assert!("later".parse::<AnswerPlacement>().is_err());
    }
}

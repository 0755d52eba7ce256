//! DOCX 渲染器
//!
//! 用 `docx-rs` 的构建器生成文档：封面、目录、每章分页、题目与答案。

use crate::assembler::book::{clean_option_text, Book, Chapter, NumberedMcq};
use crate::assembler::{AnswerPlacement, Renderer};
use crate::error::{AppResult, FileError};
use docx_rs::{
    AlignmentType, BreakType, Docx, LineSpacing, Paragraph, Run, RunFonts, Style, StyleType,
};
use std::io::Cursor;

const INDENT: i32 = 720;
const FONT: &str = "Times New Roman";

pub struct DocxRenderer;

impl Renderer for DocxRenderer {
    fn extension(&self) -> &'static str {
        "docx"
    }

    fn render(&self, book: &Book) -> AppResult<Vec<u8>> {
        let mut cursor = Cursor::new(Vec::new());
        build_document(book)
            .build()
            .pack(&mut cursor)
            .map_err(|e| FileError::ArchiveFailed {
                source: Box::new(e),
            })?;
        Ok(cursor.into_inner())
    }
}

/// 字号单位为半磅：22 = 11pt
fn base_document() -> Docx {
    Docx::new()
        .default_fonts(RunFonts::new().ascii(FONT).hi_ansi(FONT).cs(FONT))
        .default_size(22)
        .add_style(
            Style::new("Heading1", StyleType::Paragraph)
                .name("Heading 1")
                .size(36)
                .bold(),
        )
        .add_style(
            Style::new("Heading2", StyleType::Paragraph)
                .name("Heading 2")
                .size(28)
                .bold(),
        )
}

fn spacing(before: u32, after: u32) -> LineSpacing {
    LineSpacing::new().before(before).after(after)
}

fn heading(text: &str, style: &str) -> Paragraph {
    Paragraph::new()
        .add_run(Run::new().add_text(text))
        .style(style)
        .line_spacing(spacing(240, 120))
}

fn centered(run: Run) -> Paragraph {
    Paragraph::new().add_run(run).align(AlignmentType::Center)
}

fn indented(runs: Vec<Run>, before: u32, after: u32) -> Paragraph {
    runs.into_iter()
        .fold(Paragraph::new(), Paragraph::add_run)
        .indent(Some(INDENT), None, None, None)
        .line_spacing(spacing(before, after))
}

fn page_break() -> Paragraph {
    Paragraph::new().add_run(Run::new().add_break(BreakType::Page))
}

fn separator() -> Paragraph {
    Paragraph::new()
        .add_run(Run::new().add_text("―".repeat(60)).color("AAAAAA").size(20))
        .line_spacing(spacing(160, 160))
}

fn build_document(book: &Book) -> Docx {
    let meta = &book.meta;
    let mut doc = base_document();

    // 封面
    doc = doc.add_paragraph(
        centered(Run::new().add_text(&meta.title).bold().size(48)).line_spacing(spacing(2880, 0)),
    );
    doc = doc.add_paragraph(Paragraph::new());
    if !meta.author.is_empty() {
        doc = doc.add_paragraph(centered(Run::new().add_text(&meta.author).size(28)));
    }
    doc = doc.add_paragraph(centered(Run::new().add_text(&meta.year).size(24)));
    doc = doc.add_paragraph(page_break());

    // 目录
    doc = doc.add_paragraph(heading("Table of Contents", "Heading1").align(AlignmentType::Center));
    for chapter in &book.chapters {
        let entry = format!("• {}", chapter.title);
        doc = doc.add_paragraph(indented(vec![Run::new().add_text(entry)], 0, 120));
    }

    for chapter in &book.chapters {
        doc = doc.add_paragraph(page_break());
        doc = render_chapter(doc, chapter, meta.answer_placement, meta.show_chapter_source);
    }

    if meta.answer_placement == AnswerPlacement::BookEnd && book.total_mcqs() > 0 {
        doc = doc.add_paragraph(page_break());
        doc = doc.add_paragraph(heading("Complete Answer Key", "Heading1"));
        for chapter in &book.chapters {
            for item in &chapter.mcqs {
                let label = format!(
                    "MCQ {} ({}): {}. ",
                    item.number, chapter.title, item.mcq.correct_answer
                );
                doc = doc.add_paragraph(key_line(&label, &item.mcq.explanation));
            }
        }
    }

    doc
}

fn render_chapter(
    mut doc: Docx,
    chapter: &Chapter,
    placement: AnswerPlacement,
    show_source: bool,
) -> Docx {
    doc = doc.add_paragraph(heading(&chapter.title, "Heading1"));
    if show_source {
        let source = format!("Chapter source file: {}", chapter.source_file);
        doc = doc.add_paragraph(Paragraph::new().add_run(Run::new().add_text(source).size(18)));
    }

    for item in &chapter.mcqs {
        doc = question(doc, item);
        if placement == AnswerPlacement::Immediate {
            doc = answer(doc, item);
            doc = doc.add_paragraph(separator());
        }
    }

    if placement == AnswerPlacement::ChapterEnd && !chapter.mcqs.is_empty() {
        doc = doc.add_paragraph(heading("Answer Key (this chapter)", "Heading2"));
        for item in &chapter.mcqs {
            let label = format!("MCQ {}: {}. ", item.number, item.mcq.correct_answer);
            doc = doc.add_paragraph(key_line(&label, &item.mcq.explanation));
        }
    }
    doc
}

fn question(mut doc: Docx, item: &NumberedMcq) -> Docx {
    doc = doc.add_paragraph(
        Paragraph::new()
            .add_run(Run::new().add_text(format!("Q {}: ", item.number)).bold())
            .add_run(Run::new().add_text(item.mcq.question.trim()).bold())
            .line_spacing(spacing(240, 120)),
    );
    for (label, text) in &item.mcq.options {
        doc = doc.add_paragraph(indented(
            vec![
                Run::new().add_text(format!("{}. ", label)),
                Run::new().add_text(clean_option_text(text)),
            ],
            0,
            60,
        ));
    }
    doc
}

fn answer(mut doc: Docx, item: &NumberedMcq) -> Docx {
    doc = doc.add_paragraph(indented(
        vec![
            Run::new().add_text("Answer: ").bold(),
            Run::new().add_text(&item.mcq.correct_answer),
        ],
        120,
        60,
    ));
    let explanation = item.mcq.explanation.trim();
    if !explanation.is_empty() {
        doc = doc.add_paragraph(indented(
            vec![
                Run::new().add_text("Explanation: ").bold(),
                Run::new().add_text(explanation),
            ],
            0,
            240,
        ));
    }
    doc
}

fn key_line(label: &str, explanation: &str) -> Paragraph {
    indented(
        vec![
            Run::new().add_text(label).bold(),
            Run::new().add_text(explanation.trim()),
        ],
        0,
        60,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::{build_book, BookMeta};
    use crate::models::Mcq;
    use quick_xml::events::{BytesStart, Event};
    use quick_xml::Reader;
    use std::io::Read;
    use tempfile::TempDir;

    fn book(placement: AnswerPlacement) -> Book {
        Book {
            meta: BookMeta {
                title: "Kids & Surgery".to_string(),
                author: "Dr. <B>".to_string(),
                year: "2025".to_string(),
                answer_placement: placement,
                show_chapter_source: true,
            },
            chapters: vec![Chapter {
                title: "Pyloric Stenosis".to_string(),
                slug: "pyloric-stenosis".to_string(),
                source_file: "pyloric_stenosis_mcqs.json".to_string(),
                mcqs: vec![NumberedMcq {
                    number: 1,
                    mcq: Mcq {
                        question: "Typical age < 3 months?".to_string(),
                        options: [("A", "*Yes*"), ("B", "No.")]
                            .into_iter()
                            .map(|(k, v)| (k.to_string(), v.to_string()))
                            .collect(),
                        correct_answer: "A".to_string(),
                        explanation: "Usually 3-6 weeks".to_string(),
                    },
                }],
            }],
        }
    }

    fn read_part(bytes: Vec<u8>, name: &str) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut file = archive.by_name(name).unwrap();
        let mut content = String::new();
        file.read_to_string(&mut content).unwrap();
        content
    }

    fn style_of(e: &BytesStart<'_>) -> Option<String> {
        if e.name().as_ref() != b"w:pStyle" {
            return None;
        }
        e.try_get_attribute("w:val")
            .unwrap()
            .map(|a| a.unescape_value().unwrap().to_string())
    }

    /// 按出现顺序列出 Heading1 段落的文字
    fn heading1_texts(xml: &str) -> Vec<String> {
        let mut reader = Reader::from_str(xml);
        let mut headings = Vec::new();
        let mut style: Option<String> = None;
        let mut text = String::new();
        loop {
            match reader.read_event().unwrap() {
                Event::Eof => break,
                Event::Start(e) if e.name().as_ref() == b"w:p" => {
                    style = None;
                    text.clear();
                }
                Event::Start(e) | Event::Empty(e) => {
                    if let Some(s) = style_of(&e) {
                        style = Some(s);
                    }
                }
                Event::Text(t) => text.push_str(&t.unescape().unwrap()),
                Event::End(e) if e.name().as_ref() == b"w:p" => {
                    if style.as_deref() == Some("Heading1") {
                        headings.push(text.clone());
                    }
                }
                _ => {}
            }
        }
        headings
    }

    #[test]
    fn test_package_contains_core_parts() {
        let bytes = DocxRenderer.render(&book(AnswerPlacement::Immediate)).unwrap();
        let archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let names: Vec<_> = archive.file_names().collect();
        for part in [
            "[Content_Types].xml",
            "_rels/.rels",
            "word/_rels/document.xml.rels",
            "word/document.xml",
            "word/styles.xml",
        ] {
            assert!(names.contains(&part), "missing {}", part);
        }
    }

    #[test]
    fn test_document_is_well_formed_and_escaped() {
        let bytes = DocxRenderer.render(&book(AnswerPlacement::Immediate)).unwrap();
        let xml = read_part(bytes, "word/document.xml");

        assert!(xml.contains("Kids &amp; Surgery"));
        assert!(xml.contains("Typical age &lt; 3 months?"));
        assert!(xml.contains(">Yes<"));
        assert!(xml.contains("Explanation: "));

        let mut reader = Reader::from_str(&xml);
        let mut paragraphs = 0;
        loop {
            match reader.read_event() {
                Ok(Event::Eof) => break,
                Ok(Event::Start(e)) if e.name().as_ref() == b"w:p" => paragraphs += 1,
                Ok(_) => {}
                Err(e) => panic!("invalid xml: {}", e),
            }
        }
        assert!(paragraphs > 5);
    }

    #[test]
    fn test_book_end_key_after_questions() {
        let bytes = DocxRenderer.render(&book(AnswerPlacement::BookEnd)).unwrap();
        let xml = read_part(bytes, "word/document.xml");
        assert!(!xml.contains("Answer: "));
        let key = xml.find("Complete Answer Key").unwrap();
        assert!(key > xml.find("Q 1: ").unwrap());
        assert!(xml.contains("MCQ 1 (Pyloric Stenosis): A. "));
    }

    #[test]
    fn test_chapters_follow_order_file() {
        let dir = TempDir::new().unwrap();
        for name in ["a", "b", "c"] {
            let body = serde_json::json!({
                "mcqs": [{
                    "question": format!("about {}", name),
                    "options": {"A": "yes", "B": "no"},
                    "correct_answer": "A"
                }]
            });
            std::fs::write(dir.path().join(format!("{}_mcqs.json", name)), body.to_string())
                .unwrap();
        }
        let order: Vec<String> = ["c_mcqs.json", "a_mcqs.json", "b_mcqs.json"]
            .into_iter()
            .map(String::from)
            .collect();
        let mut meta = book(AnswerPlacement::Immediate).meta;
        meta.show_chapter_source = false;
        let (assembled, _) = build_book(dir.path(), &order, meta, None).unwrap();

        let bytes = DocxRenderer.render(&assembled).unwrap();
        let xml = read_part(bytes, "word/document.xml");
        assert_eq!(heading1_texts(&xml), vec!["Table of Contents", "C", "A", "B"]);
    }
}

//! Markdown 渲染器

use crate::assembler::book::{clean_option_text, Book, Chapter, NumberedMcq};
use crate::assembler::{AnswerPlacement, Renderer};
use crate::error::AppResult;

pub struct MarkdownRenderer;

impl Renderer for MarkdownRenderer {
    fn extension(&self) -> &'static str {
        "md"
    }

    fn render(&self, book: &Book) -> AppResult<Vec<u8>> {
        Ok(render_markdown(book).into_bytes())
    }
}

fn yaml_quote(text: &str) -> String {
    format!("\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\""))
}

pub fn render_markdown(book: &Book) -> String {
    let meta = &book.meta;
    let mut lines: Vec<String> = vec![
        "---".to_string(),
        format!("title: {}", yaml_quote(&meta.title)),
        format!("author: {}", yaml_quote(&meta.author)),
        format!("date: {}", yaml_quote(&meta.year)),
        "toc: true".to_string(),
        "toc-depth: 2".to_string(),
        "number-sections: false".to_string(),
        "---".to_string(),
        String::new(),
        format!("# {}", meta.title),
        String::new(),
    ];
    if !meta.author.is_empty() {
        lines.push(format!("**Author:** {}  ", meta.author));
    }
    lines.push(format!("**Year:** {}", meta.year));
    lines.push(String::new());

    lines.push("## Table of Contents".to_string());
    lines.push(String::new());
    for chapter in &book.chapters {
        lines.push(format!("- [{}](#{})", chapter.title, chapter.slug));
    }
    lines.push(String::new());
    lines.push("---".to_string());

    for chapter in &book.chapters {
        render_chapter(&mut lines, chapter, meta.answer_placement, meta.show_chapter_source);
    }

    if meta.answer_placement == AnswerPlacement::BookEnd && book.total_mcqs() > 0 {
        lines.push(String::new());
        lines.push("# Complete Answer Key".to_string());
        lines.push(String::new());
        for chapter in &book.chapters {
            for item in &chapter.mcqs {
                lines.push(format!(
                    "- **MCQ {}** ({}): **{}**. {}",
                    item.number, chapter.title, item.mcq.correct_answer, item.mcq.explanation
                ));
            }
        }
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

fn render_chapter(
    lines: &mut Vec<String>,
    chapter: &Chapter,
    placement: AnswerPlacement,
    show_source: bool,
) {
    lines.push(String::new());
    lines.push(format!("# {}", chapter.title));
    lines.push(String::new());
    if show_source {
        lines.push(format!("*Chapter source file: `{}`*", chapter.source_file));
        lines.push(String::new());
    }

    for item in &chapter.mcqs {
        render_question(lines, item);
        if placement == AnswerPlacement::Immediate {
            render_answer(lines, item);
            lines.push(String::new());
            lines.push("---".to_string());
        }
        lines.push(String::new());
    }

    if placement == AnswerPlacement::ChapterEnd && !chapter.mcqs.is_empty() {
        lines.push("**Answer Key (this chapter)**".to_string());
        lines.push(String::new());
        for item in &chapter.mcqs {
            lines.push(format!(
                "- **MCQ {}**: **{}**. {}",
                item.number, item.mcq.correct_answer, item.mcq.explanation
            ));
        }
        lines.push(String::new());
        lines.push("---".to_string());
    }
}

fn render_question(lines: &mut Vec<String>, item: &NumberedMcq) {
    lines.push(format!("### MCQ {}: {}", item.number, item.mcq.question.trim()));
    lines.push(String::new());
    for (label, text) in &item.mcq.options {
        lines.push(format!("- {}. {}", label, clean_option_text(text)));
    }
}

fn render_answer(lines: &mut Vec<String>, item: &NumberedMcq) {
    lines.push(String::new());
    lines.push(format!("**Answer:** {}", item.mcq.correct_answer));
    if !item.mcq.explanation.trim().is_empty() {
        lines.push(String::new());
        lines.push(format!("**Explanation:** {}", item.mcq.explanation.trim()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::BookMeta;
    use crate::models::Mcq;

    fn sample_book(placement: AnswerPlacement) -> Book {
        let mcq = |q: &str| Mcq {
            question: q.to_string(),
            options: [("A", "Yes"), ("B", "**No**")]
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            correct_answer: "A".to_string(),
            explanation: format!("about {}", q),
        };
        let chapter = |title: &str, slug: &str, items: Vec<(usize, &str)>| Chapter {
            title: title.to_string(),
            slug: slug.to_string(),
            source_file: format!("{}.json", slug),
            mcqs: items
                .into_iter()
                .map(|(n, q)| NumberedMcq {
                    number: n,
                    mcq: mcq(q),
                })
                .collect(),
        };
        Book {
            meta: BookMeta {
                title: "Surgery \"MCQ\" Book".to_string(),
                author: "Dr. A".to_string(),
                year: "2025".to_string(),
                answer_placement: placement,
                show_chapter_source: false,
            },
            chapters: vec![
                chapter("Intussusception", "intussusception", vec![(1, "first?"), (2, "second?")]),
                chapter("Wilms Tumor", "wilms-tumor", vec![(3, "third?")]),
            ],
        }
    }

    #[test]
    fn test_header_toc_and_questions() {
        let md = render_markdown(&sample_book(AnswerPlacement::Immediate));
        assert!(md.starts_with("---\ntitle: \"Surgery \\\"MCQ\\\" Book\"\n"));
        assert!(md.contains("- [Wilms Tumor](#wilms-tumor)"));
        assert!(md.contains("### MCQ 3: third?"));
        assert!(md.contains("- B. No"));
        assert!(md.contains("**Answer:** A\n\n**Explanation:** about first?"));

        let first = md.find("# Intussusception").unwrap();
        let second = md.find("# Wilms Tumor").unwrap();
        assert!(first < second);
    }

    #[test]
    fn test_chapter_end_answers() {
        let md = render_markdown(&sample_book(AnswerPlacement::ChapterEnd));
        assert!(!md.contains("**Answer:**"));
        assert_eq!(md.matches("**Answer Key (this chapter)**").count(), 2);
        let key = md.find("- **MCQ 2**: **A**. about second?").unwrap();
        assert!(key < md.find("# Wilms Tumor").unwrap());
    }

    #[test]
    fn test_book_end_answers() {
        let md = render_markdown(&sample_book(AnswerPlacement::BookEnd));
        assert!(!md.contains("Answer Key (this chapter)"));
        let key = md.find("# Complete Answer Key").unwrap();
        assert!(key > md.find("### MCQ 3").unwrap());
        assert!(md.contains("- **MCQ 3** (Wilms Tumor): **A**. about third?"));
    }
}

use async_trait::async_trait;
use mcq_book_tools::assembler::{self, BookMeta, MarkdownRenderer, Renderer};
use mcq_book_tools::services::comparator::{compare, parse_name_set};
use mcq_book_tools::services::normalizer::{normalize_folder, OrderSource};
use mcq_book_tools::services::ordering::load_order_file;
use mcq_book_tools::services::{ChatBackend, OrderSession, WarnWriter};
use mcq_book_tools::workflow::GenerateFlow;
use mcq_book_tools::{AppResult, BatchProcessor, Config};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn write_mcq_file(dir: &Path, name: &str, question: &str) {
    let body = serde_json::json!({
        "mcqs": [{
            "question": question,
            "options": {"A": "first", "B": "second"},
            "correct_answer": "B",
            "explanation": "see chapter"
        }]
    });
    std::fs::write(dir.join(name), body.to_string()).unwrap();
}

fn sorted_file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().to_string())
        .filter(|n| n.ends_with(".json"))
        .collect();
    names.sort();
    names
}

fn render(dir: &Path, order: &[String]) -> String {
    let meta = BookMeta::from_config(&Config::default());
    let (book, _) = assembler::build_book(dir, order, meta, None).unwrap();
    String::from_utf8(MarkdownRenderer.render(&book).unwrap()).unwrap()
}

fn assert_in_order(text: &str, needles: &[&str]) {
    let positions: Vec<usize> = needles
        .iter()
        .map(|n| text.find(n).unwrap_or_else(|| panic!("missing {}", n)))
        .collect();
    assert!(
        positions.windows(2).all(|w| w[0] < w[1]),
        "wrong order: {:?}",
        needles
    );
}

#[test]
fn test_reorder_then_build_follows_new_order() {
    let dir = TempDir::new().unwrap();
    write_mcq_file(dir.path(), "q1.json", "question from q1");
    write_mcq_file(dir.path(), "q2.json", "question from q2");
    write_mcq_file(dir.path(), "q3.json", "question from q3");

    let mut session = OrderSession::from_folder(dir.path()).unwrap();
    let mut out = Vec::new();
    let outcome = session.run("mv 3 1\ngen\n".as_bytes(), &mut out).unwrap();

    let artifact = outcome.artifact.expect("ordering file written");
    let order = assembler::read_order_lines(&artifact).unwrap();
    assert_eq!(order, vec!["q3.json", "q1.json", "q2.json"]);

    let md = render(dir.path(), &order);
    assert_in_order(&md, &["from q3", "from q1", "from q2"]);
    assert!(md.contains("### MCQ 1: question from q3"));

    // order.txt 带编号前缀，文件夹未编号时也能组装
    let master = assembler::read_order_lines(&outcome.master.unwrap()).unwrap();
    assert_eq!(master[0], "001_q3.json");
    let md = render(dir.path(), &master);
    assert_in_order(&md, &["from q3", "from q1", "from q2"]);
}

#[test]
fn test_resume_with_nested_file_then_build() {
    let dir = TempDir::new().unwrap();
    write_mcq_file(dir.path(), "a_mcqs.json", "question a");
    std::fs::create_dir_all(dir.path().join("sub")).unwrap();
    write_mcq_file(&dir.path().join("sub"), "burns_mcqs.json", "question burns");
    let master = dir.path().join("order.txt");
    std::fs::write(&master, "001_burns_mcqs.json\n002_a_mcqs.json\n").unwrap();

    let mut session = OrderSession::from_order_file(&master).unwrap();
    let outcome = session.run("gen\n".as_bytes(), &mut Vec::new()).unwrap();

    let rewritten = outcome.master.unwrap();
    assert_eq!(
        std::fs::read_to_string(&rewritten).unwrap(),
        "001_burns_mcqs.json\n002_a_mcqs.json\n"
    );

    // order.txt 和时间戳排序文件都能完整组装
    let order = assembler::read_order_lines(&rewritten).unwrap();
    let meta = BookMeta::from_config(&Config::default());
    let (book, report) = assembler::build_book(dir.path(), &order, meta, None).unwrap();
    assert_eq!(book.chapters.len(), 2);
    assert!(report.skipped_files.is_empty());
    assert_in_order(&render(dir.path(), &order), &["question burns", "question a"]);

    let artifact = assembler::read_order_lines(&outcome.artifact.unwrap()).unwrap();
    assert_in_order(&render(dir.path(), &artifact), &["question burns", "question a"]);

    // 再次继续排序时不会丢条目
    assert_eq!(load_order_file(&rewritten).unwrap().entries.len(), 2);
}

#[test]
fn test_rename_by_ordering_file_then_build_from_it() {
    let dir = TempDir::new().unwrap();
    write_mcq_file(dir.path(), "alpha.json", "alpha q");
    write_mcq_file(dir.path(), "beta.json", "beta q");
    let order_file = dir.path().join("ordered.txt");
    std::fs::write(&order_file, "beta.json\nalpha.json\n").unwrap();

    normalize_folder(dir.path(), &OrderSource::Artifact(order_file.clone()), 1, false).unwrap();
    assert_eq!(sorted_file_names(dir.path()), vec!["01_beta.json", "02_alpha.json"]);

    let order = assembler::read_order_lines(&order_file).unwrap();
    let md = render(dir.path(), &order);
    assert_in_order(&md, &["beta q", "alpha q"]);
}

#[test]
fn test_alphabetical_normalize_is_stable() {
    let dir = TempDir::new().unwrap();
    for name in ["c.json", "05_a.json", "b.json"] {
        write_mcq_file(dir.path(), name, name);
    }

    normalize_folder(dir.path(), &OrderSource::Alphabetical, 1, false).unwrap();
    let first = sorted_file_names(dir.path());
    assert_eq!(first, vec!["01_a.json", "02_b.json", "03_c.json"]);

    let again = normalize_folder(dir.path(), &OrderSource::Alphabetical, 1, false).unwrap();
    assert!(again.renamed.is_empty());
    assert_eq!(sorted_file_names(dir.path()), first);
}

#[test]
fn test_compare_is_symmetric() {
    let left = parse_name_set("a.json\nb.json\nc.json\n");
    let right = parse_name_set("b.json\nd.json\n");

    let ab = compare(&left, &right);
    let ba = compare(&right, &left);
    assert_eq!(ab.missing_from_first, ba.missing_from_second);
    assert_eq!(ab.missing_from_second, ba.missing_from_first);
    assert!(compare(&left, &left).is_identical());
}

#[test]
fn test_build_skips_missing_entries_and_continues() {
    let dir = TempDir::new().unwrap();
    write_mcq_file(dir.path(), "kept.json", "kept question");
    let warn = WarnWriter::in_folder(dir.path());

    let order = vec!["ghost.json".to_string(), "kept.json".to_string()];
    let meta = BookMeta::from_config(&Config::default());
    let (book, report) = assembler::build_book(dir.path(), &order, meta, Some(&warn)).unwrap();

    assert_eq!(book.chapters.len(), 1);
    assert_eq!(report.skipped_files.len(), 1);
    assert!(std::fs::read_to_string(warn.path()).unwrap().contains("ghost.json"));
}

struct EchoBackend;

#[async_trait]
impl ChatBackend for EchoBackend {
    async fn chat(&self, _system_message: &str, user_message: &str) -> AppResult<String> {
        // 把收到的示例题原样返回
        let request: serde_json::Value = serde_json::from_str(user_message).unwrap();
        Ok(serde_json::json!({ "mcqs": request["mcqs"] }).to_string())
    }

    fn model_name(&self) -> &str {
        "echo"
    }
}

#[test]
fn test_batch_generation_writes_only_mcq_files() {
    let dir = TempDir::new().unwrap();
    write_mcq_file(dir.path(), "01_hernia_mcqs.json", "hernia q");
    write_mcq_file(dir.path(), "02_burns_mcqs.json", "burns q");
    let out = dir.path().join("generated");

    let flow = Arc::new(GenerateFlow::new(Arc::new(EchoBackend), out.clone()));
    let files = vec![
        dir.path().join("01_hernia_mcqs.json"),
        dir.path().join("02_burns_mcqs.json"),
    ];
    let stats = tokio_test::block_on(BatchProcessor::new(2).run(flow, files)).unwrap();

    assert_eq!(stats.success, 2);
    assert_eq!(
        sorted_file_names(&out),
        vec!["01_hernia_mcqs.json", "02_burns_mcqs.json"]
    );
}

//! 文件名列表比对服务

use crate::error::{AppError, AppResult};
use std::collections::BTreeSet;
use std::io::Write;
use std::path::Path;

/// 读取按行分隔的文件名列表（去除首尾空白，忽略空行，重复项合并）
pub fn read_name_set(path: &Path) -> AppResult<BTreeSet<String>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;
    Ok(parse_name_set(&content))
}

pub fn parse_name_set(content: &str) -> BTreeSet<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

/// 两个列表的双向差集
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Comparison {
    /// 在第二个列表中、但第一个列表没有的
    pub missing_from_first: BTreeSet<String>,
    /// 在第一个列表中、但第二个列表没有的
    pub missing_from_second: BTreeSet<String>,
}

pub fn compare(first: &BTreeSet<String>, second: &BTreeSet<String>) -> Comparison {
    Comparison {
        missing_from_first: second.difference(first).cloned().collect(),
        missing_from_second: first.difference(second).cloned().collect(),
    }
}

impl Comparison {
    pub fn is_identical(&self) -> bool {
        self.missing_from_first.is_empty() && self.missing_from_second.is_empty()
    }

    /// 输出便于阅读的比对报告
    pub fn write_report<W: Write>(
        &self,
        first_label: &str,
        second_label: &str,
        out: &mut W,
    ) -> std::io::Result<()> {
        writeln!(
            out,
            "Filenames in {} but missing in {} ({}):",
            second_label,
            first_label,
            self.missing_from_first.len()
        )?;
        for name in &self.missing_from_first {
            writeln!(out, "{}", name)?;
        }

        writeln!(
            out,
            "\nFilenames in {} but missing in {} ({}):",
            first_label,
            second_label,
            self.missing_from_second.len()
        )?;
        for name in &self.missing_from_second {
            writeln!(out, "{}", name)?;
        }
        Ok(())
    }
}

/// 读取两个列表文件并比对
pub fn compare_files(first: &Path, second: &Path) -> AppResult<Comparison> {
    let a = read_name_set(first)?;
    let b = read_name_set(second)?;
    let result = compare(&a, &b);
    tracing::info!(
        "比对完成: {} 缺少 {} 个, {} 缺少 {} 个",
        first.display(),
        result.missing_from_first.len(),
        second.display(),
        result.missing_from_second.len()
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_set_differences_both_ways() {
        let a = parse_name_set("x.json\ny.json\ny.json\n\n  z.json  \n");
        let b = set(&["y.json", "w.json"]);
        let result = compare(&a, &b);

        assert_eq!(result.missing_from_first, set(&["w.json"]));
        assert_eq!(result.missing_from_second, set(&["x.json", "z.json"]));
    }

    #[test]
    fn test_swapping_arguments_mirrors_result() {
        let a = set(&["1", "2", "3"]);
        let b = set(&["3", "4"]);
        assert_eq!(
            compare(&a, &b).missing_from_first,
            compare(&b, &a).missing_from_second
        );
        assert!(compare(&a, &a).is_identical());
    }

    #[test]
    fn test_report_format() {
        let result = compare(&set(&["a"]), &set(&["b"]));
        let mut out = Vec::new();
        result.write_report("list1.txt", "list2.txt", &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("Filenames in list2.txt but missing in list1.txt (1):\nb\n"));
        assert!(text.contains("Filenames in list1.txt but missing in list2.txt (1):\na\n"));
    }
}

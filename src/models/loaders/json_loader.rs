use crate::error::{AppError, AppResult, FileError};
use crate::models::mcq::McqBook;
use std::path::{Path, PathBuf};

/// 从 JSON 文件加载题目，兼容带 BOM 的 UTF-8
pub fn load_mcq_file(path: &Path) -> AppResult<McqBook> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;
    let content = content.strip_prefix('\u{feff}').unwrap_or(&content);

    let mut book: McqBook = serde_json::from_str(content)
        .map_err(|e| AppError::json_parse_failed(path.display().to_string(), e))?;

    book.source_file = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string());

    Ok(book)
}

/// 列出文件夹顶层的所有 `.json` 文件，按文件名排序
pub fn list_json_files(folder: &Path) -> AppResult<Vec<PathBuf>> {
    if !folder.is_dir() {
        return Err(FileError::DirectoryNotFound {
            path: folder.display().to_string(),
        }
        .into());
    }

    let entries = std::fs::read_dir(folder)
        .map_err(|e| AppError::file_read_failed(folder.display().to_string(), e))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let is_json = path
            .extension()
            .and_then(|s| s.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);
        if path.is_file() && is_json {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_with_bom_and_list_only_json() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("a.json"),
            "\u{feff}{\"disease\": \"A\", \"mcqs\": []}",
        )
        .unwrap();
        std::fs::write(dir.path().join("b.json"), "{not json").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let files = list_json_files(dir.path()).unwrap();
        assert_eq!(files.len(), 2);

        let book = load_mcq_file(&files[0]).unwrap();
        assert_eq!(book.source_file.as_deref(), Some("a.json"));
        assert!(matches!(
            load_mcq_file(&files[1]).unwrap_err(),
            AppError::Data(crate::error::DataError::JsonParseFailed { .. })
        ));
    }

    #[test]
    fn test_missing_folder_is_error() {
        let dir = TempDir::new().unwrap();
        let err = list_json_files(&dir.path().join("nope")).unwrap_err();
        assert!(matches!(
            err,
            AppError::File(FileError::DirectoryNotFound { .. })
        ));
    }
}

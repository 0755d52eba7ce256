use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 数据错误（JSON 损坏、字段缺失等）
    #[error("数据错误: {0}")]
    Data(#[from] DataError),
    /// 排序文件相关错误
    #[error("排序错误: {0}")]
    Order(#[from] OrderError),
    /// LLM 服务错误
    #[error("LLM错误: {0}")]
    Llm(#[from] LlmError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 其他错误（用于包装第三方库错误）
    #[error("错误: {0}")]
    Other(String),
}

type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    #[error("文件不存在: {path}")]
    NotFound { path: String },

    #[error("目录不存在: {path}")]
    DirectoryNotFound { path: String },

    #[error("目录为空: {path}")]
    EmptyDirectory { path: String },

    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: BoxedSource,
    },

    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: BoxedSource,
    },

    #[error("重命名失败 ({from} -> {to}): {source}")]
    RenameFailed {
        from: String,
        to: String,
        #[source]
        source: std::io::Error,
    },

    #[error("遍历目录失败: {source}")]
    WalkFailed {
        #[source]
        source: walkdir::Error,
    },

    #[error("生成文档压缩包失败: {source}")]
    ArchiveFailed {
        #[source]
        source: BoxedSource,
    },
}

/// 数据错误
#[derive(Debug, Error)]
pub enum DataError {
    #[error("JSON解析失败 ({path}): {source}")]
    JsonParseFailed {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("题目文件 {path} 中没有有效的题目")]
    NoValidMcqs { path: String },

    #[error("文件名去掉编号后重复: {name} ({first} / {second})")]
    AmbiguousName {
        name: String,
        first: String,
        second: String,
    },

    #[error("编号超出范围: 起始 {base}，共 {count} 个文件")]
    NumberingOverflow { base: usize, count: usize },

    #[error("文件缺少 disease 字段: {path}")]
    MissingDisease { path: String },

    #[error("无效的匹配模式 {pattern}: {source}")]
    BadPattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },
}

/// 排序列表错误
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("位置 {index} 超出范围 [1, {len}]")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("排序文件中没有一个文件能在 {folder} 中找到")]
    NothingResolved { folder: String },

    #[error("尚未选择任何条目")]
    NothingSelected,

    #[error("无法识别的命令: {0}")]
    UnknownCommand(String),
}

/// LLM 服务错误
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM API调用失败 (模型: {model}): {source}")]
    ApiCallFailed {
        model: String,
        /// 网络中断、限流、服务端错误等可以重试的失败
        transient: bool,
        #[source]
        source: BoxedSource,
    },

    #[error("LLM返回内容为空 (模型: {model})")]
    EmptyContent { model: String },

    #[error("LLM返回的内容不是有效的JSON: {snippet}")]
    InvalidJson { snippet: String },

    #[error("构建LLM请求失败: {0}")]
    RequestBuildFailed(String),
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("未配置 API Key，请设置环境变量 LLM_API_KEY")]
    MissingApiKey,

    #[error("配置文件 {path} 解析失败: {source}")]
    ParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
}

// ========== 从常见错误类型转换 ==========

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::File(FileError::ReadFailed {
            path: String::new(),
            source: Box::new(err),
        })
    }
}

impl From<walkdir::Error> for AppError {
    fn from(err: walkdir::Error) -> Self {
        AppError::File(FileError::WalkFailed { source: err })
    }
}

impl From<tempfile::PersistError> for AppError {
    fn from(err: tempfile::PersistError) -> Self {
        let path = err.file.path().display().to_string();
        AppError::File(FileError::WriteFailed {
            path,
            source: Box::new(err.error),
        })
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建文件读取错误
    pub fn file_read_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::File(FileError::ReadFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }

    /// 创建文件写入错误
    pub fn file_write_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::File(FileError::WriteFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }

    /// 创建LLM API调用错误
    pub fn llm_api_failed(
        model: impl Into<String>,
        transient: bool,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Llm(LlmError::ApiCallFailed {
            model: model.into(),
            transient,
            source: Box::new(source),
        })
    }

    /// 创建JSON解析错误
    pub fn json_parse_failed(path: impl Into<String>, source: serde_json::Error) -> Self {
        AppError::Data(DataError::JsonParseFailed {
            path: path.into(),
            source,
        })
    }

    /// 单条数据错误（可跳过继续），而非整个运行失败
    pub fn is_item_level(&self) -> bool {
        matches!(self, AppError::Data(_) | AppError::Llm(_))
    }

    /// 值得重试的错误
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AppError::Llm(LlmError::ApiCallFailed {
                transient: true,
                ..
            })
        )
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_converts_to_file_error() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: AppError = io.into();
        assert!(matches!(err, AppError::File(FileError::ReadFailed { .. })));
        assert!(!err.is_item_level());
    }

    #[test]
    fn test_only_transient_api_errors_are_retryable() {
        let io = || std::io::Error::new(std::io::ErrorKind::Other, "boom");
        assert!(AppError::llm_api_failed("m", true, io()).is_transient());
        assert!(!AppError::llm_api_failed("m", false, io()).is_transient());
        assert!(!AppError::Llm(LlmError::RequestBuildFailed("bad".into())).is_transient());
        assert!(!AppError::Llm(LlmError::EmptyContent { model: "m".into() }).is_transient());
    }

    #[test]
    fn test_data_errors_are_item_level() {
        let err = AppError::Data(DataError::NoValidMcqs {
            path: "a.json".to_string(),
        });
        assert!(err.is_item_level());
        assert!(err.to_string().contains("a.json"));
    }
}

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// 一道选择题
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Mcq {
    /// 题干
    #[serde(default)]
    pub question: String,
    /// 选项，按标签排序（A、B、C ……）
    #[serde(default, deserialize_with = "deserialize_options")]
    pub options: BTreeMap<String, String>,
    /// 正确答案标签
    #[serde(default, deserialize_with = "deserialize_answer")]
    pub correct_answer: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub explanation: String,
}

/// 题目缺失的必要字段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingField {
    Question,
    Options,
    Answer,
}

impl std::fmt::Display for MissingField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MissingField::Question => "question",
            MissingField::Options => "options",
            MissingField::Answer => "correct_answer",
        };
        write!(f, "{}", name)
    }
}

impl Mcq {
    /// 检查题干、选项、答案是否齐全
    pub fn validate(&self) -> Result<(), MissingField> {
        if self.question.trim().is_empty() {
            return Err(MissingField::Question);
        }
        if self.options.is_empty() {
            return Err(MissingField::Options);
        }
        if self.correct_answer.trim().is_empty() {
            return Err(MissingField::Answer);
        }
        Ok(())
    }
}

/// 一个题目文件：某个疾病（章节）下的全部题目
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct McqBook {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disease: Option<String>,
    #[serde(default)]
    pub mcqs: Vec<Mcq>,
    /// 来源文件名（不参与序列化）
    #[serde(skip)]
    pub source_file: Option<String>,
}

impl McqBook {
    /// 通过校验的题目数量
    pub fn valid_count(&self) -> usize {
        self.mcqs.iter().filter(|q| q.validate().is_ok()).count()
    }
}

// 答案可能写成字符串，也可能写成数字
fn deserialize_answer<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Visitor;
    use std::fmt;

    struct AnswerVisitor;

    impl<'de> Visitor<'de> for AnswerVisitor {
        type Value = String;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a string or integer answer label")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value.trim().to_string())
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value.to_string())
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value.to_string())
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(String::new())
        }
    }

    deserializer.deserialize_any(AnswerVisitor)
}

// 选项可以是 {"A": "..."} 形式，也可以是数组（按 A、B、C 依次编号）
fn deserialize_options<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawOptions {
        Map(BTreeMap<String, String>),
        List(Vec<String>),
    }

    Ok(match Option::<RawOptions>::deserialize(deserializer)? {
        Some(RawOptions::Map(map)) => map,
        Some(RawOptions::List(list)) => list
            .into_iter()
            .enumerate()
            .map(|(i, text)| (option_label(i), text))
            .collect(),
        None => BTreeMap::new(),
    })
}

/// 0 -> "A"，1 -> "B"……
pub fn option_label(index: usize) -> String {
    let letter = (b'A' + (index % 26) as u8) as char;
    if index < 26 {
        letter.to_string()
    } else {
        format!("{}{}", letter, index / 26)
    }
}

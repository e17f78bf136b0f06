//! Concept and subject normalization.
//!
//! LLM output and user input name the same concept in slightly different
//! ways ("二次函数：", " 二次函数 "). Everything that touches the
//! knowledge graph funnels names through [`normalize_concept`] and subject
//! labels through [`normalize_subject`] so one concept does not fragment
//! across spellings, and so (owner, subject, name) stays a stable key.

use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::defaults::CONCEPT_NAME_MAX_CHARS;

/// Bucket for anything that cannot be mapped to a known subject.
pub const UNCLASSIFIED_SUBJECT: &str = "未分类";

/// Canonical subject labels. Stored subjects are always one of these.
pub const SUBJECT_CHOICES: [&str; 30] = [
    "语文",
    "数学",
    "英语",
    "物理",
    "化学",
    "生物",
    "历史",
    "地理",
    "政治",
    "道德与法治",
    "科学",
    "信息技术",
    "通用技术",
    "体育与健康",
    "音乐",
    "美术",
    "劳动",
    "心理健康",
    "书法",
    "综合实践",
    "研究性学习",
    "校本课程",
    "地方课程",
    "少儿编程",
    "日语",
    "俄语",
    "法语",
    "德语",
    "经济与金融",
    "未分类",
];

/// Alias → canonical label, in priority order for the substring pass.
const SUBJECT_ALIASES: [(&str, &str); 28] = [
    ("中文", "语文"),
    ("汉语", "语文"),
    ("国文", "语文"),
    ("语文作文", "语文"),
    ("作文", "语文"),
    ("数学(奥数)", "数学"),
    ("奥数", "数学"),
    ("英语口语", "英语"),
    ("英语听力", "英语"),
    ("生物学", "生物"),
    ("历史学", "历史"),
    ("地理学", "地理"),
    ("思想政治", "政治"),
    ("思政", "政治"),
    ("道法", "道德与法治"),
    ("品德与社会", "道德与法治"),
    ("品德与生活", "道德与法治"),
    ("信息科技", "信息技术"),
    ("计算机", "信息技术"),
    ("电脑", "信息技术"),
    ("体育", "体育与健康"),
    ("体育健康", "体育与健康"),
    ("健康", "体育与健康"),
    ("心理", "心理健康"),
    ("综合实践活动", "综合实践"),
    ("编程", "少儿编程"),
    ("其他", "未分类"),
    ("其它", "未分类"),
];

/// Labels often arrive wrapped in a field prefix. Only the first match is
/// stripped.
const SUBJECT_PREFIXES: [&str; 6] = ["学科：", "科目：", "科目:", "学科:", "subject:", "Subject:"];

/// English fragments worth recognizing, checked against the lowercased
/// input before the substring passes.
const ENGLISH_HINTS: [(&str, &str); 7] = [
    ("math", "数学"),
    ("english", "英语"),
    ("physics", "物理"),
    ("chem", "化学"),
    ("bio", "生物"),
    ("history", "历史"),
    ("geography", "地理"),
];

static SUBJECT_ALIAS_MAP: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| SUBJECT_ALIASES.into_iter().collect());

/// Punctuation stripped from both ends of a concept name.
const CONCEPT_TRIM_SET: [char; 13] = [
    ' ', '\t', '\r', '\n', '，', '。', '；', ';', '：', ':', '、', '-', '—',
];

/// Canonicalize a concept name.
///
/// Trims, collapses internal whitespace runs to single spaces, strips
/// leading/trailing punctuation tails, and truncates to
/// [`CONCEPT_NAME_MAX_CHARS`] characters. Returns an empty string when
/// nothing survives; callers treat that as "no concept". Idempotent.
pub fn normalize_concept(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    let collapsed = trimmed.split_whitespace().collect::<Vec<_>>().join(" ");
    let stripped = collapsed.trim_matches(|c: char| CONCEPT_TRIM_SET.contains(&c));
    stripped.chars().take(CONCEPT_NAME_MAX_CHARS).collect()
}

/// Map a free-form subject label onto one of [`SUBJECT_CHOICES`].
///
/// Resolution order: exact canonical match, exact alias match, English
/// hint, alias substring, canonical substring. Anything unresolved lands
/// in [`UNCLASSIFIED_SUBJECT`]. Total: never fails, never returns a label
/// outside the canon.
pub fn normalize_subject(value: &str) -> String {
    let mut s = value.trim();
    if s.is_empty() {
        return UNCLASSIFIED_SUBJECT.to_string();
    }

    for prefix in SUBJECT_PREFIXES {
        if let Some(rest) = s.strip_prefix(prefix) {
            s = rest.trim();
            break;
        }
    }

    if SUBJECT_CHOICES.contains(&s) {
        return s.to_string();
    }

    if let Some(canonical) = SUBJECT_ALIAS_MAP.get(s) {
        return (*canonical).to_string();
    }

    let lowered = s.to_lowercase();
    for (hint, canonical) in ENGLISH_HINTS {
        if lowered.contains(hint) {
            return canonical.to_string();
        }
    }

    for (alias, canonical) in SUBJECT_ALIASES {
        if s.contains(alias) {
            return canonical.to_string();
        }
    }

    for choice in SUBJECT_CHOICES {
        if choice != UNCLASSIFIED_SUBJECT && s.contains(choice) {
            return choice.to_string();
        }
    }

    UNCLASSIFIED_SUBJECT.to_string()
}

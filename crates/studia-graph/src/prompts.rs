//! Prompt builders for map generation.
//!
//! Prompts are bounded here, not at the call site: seed lists are
//! deduplicated and capped, source text is truncated. The JSON schema
//! embedded in each prompt is the contract the decoders in [`crate::tree`]
//! and the engine enforce.

use studia_core::defaults::{PROMPT_SEED_CAP, PROMPT_SOURCE_CHARS};
use studia_core::normalize_subject;

/// Build the hierarchical knowledge-tree prompt.
pub fn mind_tree_prompt(
    subject: &str,
    title: &str,
    source_text: &str,
    seed_concepts: &[String],
) -> String {
    let subject = normalize_subject(subject);

    let mut seeds: Vec<&str> = Vec::new();
    for seed in seed_concepts {
        let seed = seed.trim();
        if !seed.is_empty() && !seeds.contains(&seed) {
            seeds.push(seed);
        }
    }
    seeds.truncate(PROMPT_SEED_CAP);

    let seed_json = serde_json::to_string(&seeds).unwrap_or_else(|_| "[]".to_string());
    let seed_line = if seeds.is_empty() {
        "无".to_string()
    } else {
        seeds.join(", ")
    };

    let text: String = source_text.trim().chars().take(PROMPT_SOURCE_CHARS).collect();

    format!(
        r#"
你是学习助手。请基于输入内容生成“更完善”的知识树：

要求：
1) 必须包含上级知识（更宏观的章节/主题）与下级细分（更具体的子概念/方法/易错点）。
1.1) 允许适度补充“输入中未直接出现但强相关”的知识点（例如前置概念/常见方法/典型易错点），不要只局限于种子概念。
2) 输出必须是严格 JSON（不要 markdown、不要代码块、不要多余解释）。
3) 节点数量控制在 12-30 个；层级深度 2-4；尽量形成树（一个子节点只有一个父节点）。
4) 节点 name 用中文短语，尽量 <= 12 字。
5) kind 只能是：chapter / concept / method / mistake

返回 JSON schema：
{{
  "tree": {{
    "name": "{title}",
    "kind": "chapter",
    "children": [
      {{"name": "...", "kind": "chapter|concept|method|mistake", "children": [ ... ]}}
    ]
  }},
  "subject": "{subject}",
  "seed_concepts": {seed_json}
}}

输入：
科目：{subject}
标题：{title}
关键概念（种子，仅供参考，不是限制）：{seed_line}
内容（截断）：
{text}"#
    )
}

/// Build the comparative-insight prompt over pre-serialized evidence items.
pub fn compare_prompt(subject: &str, title: &str, items_json: &str) -> String {
    let subject = normalize_subject(subject);
    format!(
        r#"
你是学习分析助手。给你一些知识点以及它们关联的“笔记要点/错题错因”，请输出对比分析。

输出必须是严格 JSON（不要 markdown、不要代码块）：
{{
  "comparisons": [
    {{
      "name": "知识点名称",
      "summary": "一句话总结差距/误区",
      "gaps": ["差距1", "差距2"],
      "actions": ["可执行建议1", "可执行建议2"]
    }}
  ]
}}

约束：
- 每个知识点 gaps/actions 各 1-3 条，中文短句。
- 不要虚构具体题号；引用内容用概括表达。

科目：{subject}
标题：{title}
输入 items JSON：
{items_json}
"#
    )
}

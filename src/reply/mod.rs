//! Turns the model's free-form reply into a [`SuggestionResult`].
//!
//! Parsing never fails. A reply is read as, in order of preference:
//! a JSON object with `suggestion`/`analysis`/`tips`/`confidence` keys,
//! text with labelled sections ("Analysis:", "Tips:", ...), or plain prose,
//! in which case the whole reply becomes the suggestion.

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value as JsonValue;

use crate::models::chat::SuggestionResult;

/// Confidence reported when the reply carries no usable score.
pub const FALLBACK_CONFIDENCE: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Suggestion,
    Analysis,
    Tips,
    Confidence,
}

/// Recognised labels, compared after lowercasing and stripping markdown.
const LABELS: &[(&str, Section)] = &[
    ("suggestion", Section::Suggestion),
    ("suggested reply", Section::Suggestion),
    ("suggested response", Section::Suggestion),
    ("suggested answer", Section::Suggestion),
    ("reply", Section::Suggestion),
    ("response", Section::Suggestion),
    ("answer", Section::Suggestion),
    ("建议", Section::Suggestion),
    ("建议回答", Section::Suggestion),
    ("回答建议", Section::Suggestion),
    ("analysis", Section::Analysis),
    ("reasoning", Section::Analysis),
    ("assessment", Section::Analysis),
    ("分析", Section::Analysis),
    ("tips", Section::Tips),
    ("tip", Section::Tips),
    ("advice", Section::Tips),
    ("pointers", Section::Tips),
    ("技巧", Section::Tips),
    ("回答技巧", Section::Tips),
    ("提示", Section::Tips),
    ("confidence", Section::Confidence),
    ("confidence score", Section::Confidence),
    ("confidence level", Section::Confidence),
    ("可信度", Section::Confidence),
    ("置信度", Section::Confidence),
];

static LIST_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:[-*+•·]|\(?\d{1,3}[.)、:：]|\(\d{1,3}\))\s*").expect("list marker pattern")
});

static LEADING_NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\(?\d{1,3}[.)、]").expect("leading number pattern")
});

static INLINE_NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s\d{1,3}(?:[.)]\s|、)").expect("inline number pattern")
});

static NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d+(?:\.\d+)?)\s*(%|％)?").expect("number pattern")
});

static CODE_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^```[a-zA-Z]*\s*(.*?)\s*```$").expect("code fence pattern")
});

pub fn parse_reply(raw: &str) -> SuggestionResult {
    parse_json(raw)
        .or_else(|| parse_sections(raw))
        .unwrap_or_else(|| unstructured(raw))
}

fn unstructured(raw: &str) -> SuggestionResult {
    SuggestionResult {
        suggestion: raw.to_string(),
        analysis: String::new(),
        tips: Vec::new(),
        confidence: FALLBACK_CONFIDENCE,
        timestamp: Utc::now(),
    }
}

fn parse_json(raw: &str) -> Option<SuggestionResult> {
    let trimmed = raw.trim();
    let body = CODE_FENCE.captures(trimmed)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(trimmed);
    if !body.starts_with('{') {
        return None;
    }

    let value: JsonValue = serde_json::from_str(body).ok()?;
    let suggestion = value.get("suggestion")?.as_str()?.trim().to_string();

    let analysis = value
        .get("analysis")
        .and_then(JsonValue::as_str)
        .unwrap_or_default()
        .trim()
        .to_string();

    let tips = match value.get("tips") {
        Some(JsonValue::Array(items)) =>
            items
                .iter()
                .filter_map(JsonValue::as_str)
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect(),
        Some(JsonValue::String(s)) => split_tips(&s.lines().collect::<Vec<_>>()),
        _ => Vec::new(),
    };

    let confidence = match value.get("confidence") {
        Some(JsonValue::Number(n)) => n.as_f64().map(|v| normalize_confidence(v, false)),
        Some(JsonValue::String(s)) => parse_confidence(s),
        _ => None,
    }.unwrap_or(FALLBACK_CONFIDENCE);

    Some(SuggestionResult {
        suggestion,
        analysis,
        tips,
        confidence,
        timestamp: Utc::now(),
    })
}

/// Splits a line like `**Tips**: rest` into its section and inline text.
fn match_label(line: &str) -> Option<(Section, &str)> {
    let (head, rest) = match (line.find(':'), line.find('：')) {
        (Some(a), Some(b)) if b < a => (&line[..b], &line[b + '：'.len_utf8()..]),
        (Some(a), _) => (&line[..a], &line[a + 1..]),
        (None, Some(b)) => (&line[..b], &line[b + '：'.len_utf8()..]),
        (None, None) => return None,
    };

    let label = head
        .trim()
        .trim_matches(|c: char| c == '*' || c == '#' || c == '_' || c.is_whitespace())
        .to_lowercase();
    let section = LABELS.iter().find(|(name, _)| *name == label).map(|(_, s)| *s)?;

    // Markdown bold may close after the colon: "**Tips:** ..."
    let rest = rest.trim_start_matches(|c: char| c == '*' || c == '_');
    Some((section, rest))
}

fn parse_sections(raw: &str) -> Option<SuggestionResult> {
    let mut preamble: Vec<&str> = Vec::new();
    let mut sections: Vec<(Section, Vec<&str>)> = Vec::new();

    for line in raw.lines() {
        if let Some((section, rest)) = match_label(line) {
            let mut body = Vec::new();
            if !rest.trim().is_empty() {
                body.push(rest);
            }
            sections.push((section, body));
        } else if let Some((_, body)) = sections.last_mut() {
            body.push(line);
        } else {
            preamble.push(line);
        }
    }

    if sections.is_empty() {
        return None;
    }

    let suggestion_lines = section_lines(&sections, Section::Suggestion);
    let suggestion = if suggestion_lines.is_empty() {
        join_text(&preamble)
    } else {
        join_text(&suggestion_lines)
    };

    Some(SuggestionResult {
        suggestion,
        analysis: join_text(&section_lines(&sections, Section::Analysis)),
        tips: split_tips(&section_lines(&sections, Section::Tips)),
        confidence: section_lines(&sections, Section::Confidence)
            .iter()
            .find_map(|l| parse_confidence(l))
            .unwrap_or(FALLBACK_CONFIDENCE),
        timestamp: Utc::now(),
    })
}

fn section_lines<'a>(sections: &[(Section, Vec<&'a str>)], wanted: Section) -> Vec<&'a str> {
    sections
        .iter()
        .filter(|(s, _)| *s == wanted)
        .flat_map(|(_, body)| body.iter().copied())
        .collect()
}

fn join_text(lines: &[&str]) -> String {
    lines
        .iter()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Splits `1. a 2. b` into `["1. a", "2. b"]`. Lines that do not start
/// with a number are returned whole.
fn split_inline_numbering(line: &str) -> Vec<&str> {
    let Some(lead) = LEADING_NUMBER.find(line) else {
        return vec![line];
    };
    let mut pieces = Vec::new();
    let mut start = 0;
    for m in INLINE_NUMBER.find_iter(&line[lead.end()..]) {
        let at = lead.end() + m.start();
        pieces.push(line[start..at].trim());
        start = at;
    }
    pieces.push(line[start..].trim());
    pieces
}

/// Marker lines start a new tip and unmarked lines continue the previous
/// one. Without markers every line is a tip, and a single line is split
/// on semicolons.
fn split_tips(lines: &[&str]) -> Vec<String> {
    let lines: Vec<&str> = lines
        .iter()
        .map(|l| l.trim())
        .flat_map(split_inline_numbering)
        .filter(|l| !l.is_empty())
        .collect();

    if lines.iter().any(|l| LIST_MARKER.is_match(l)) {
        let mut tips: Vec<String> = Vec::new();
        for line in lines {
            if let Some(m) = LIST_MARKER.find(line) {
                tips.push(line[m.end()..].trim().to_string());
            } else if let Some(last) = tips.last_mut() {
                if !last.is_empty() {
                    last.push(' ');
                }
                last.push_str(line);
            } else {
                tips.push(line.to_string());
            }
        }
        return tips.into_iter().filter(|t| !t.is_empty()).collect();
    }

    if lines.len() == 1 {
        return lines[0]
            .split(|c| c == ';' || c == '；')
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
    }

    lines.into_iter().map(str::to_string).collect()
}

fn parse_confidence(text: &str) -> Option<f64> {
    let caps = NUMBER.captures(text)?;
    let value: f64 = caps.get(1)?.as_str().parse().ok()?;
    Some(normalize_confidence(value, caps.get(2).is_some()))
}

/// Percentages and 0-100 scores are scaled down, then clamped to [0, 1].
fn normalize_confidence(value: f64, percent: bool) -> f64 {
    if !value.is_finite() {
        return FALLBACK_CONFIDENCE;
    }
    let scaled = if percent || value > 1.0 { value / 100.0 } else { value };
    scaled.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn plain_prose_becomes_the_suggestion() {
        let raw = "Sounds great, I'd love to join you on Saturday!";
        let result = parse_reply(raw);
        assert_eq!(result.suggestion, raw);
        assert_eq!(result.analysis, "");
        assert!(result.tips.is_empty());
        assert!(approx(result.confidence, FALLBACK_CONFIDENCE));
    }

    #[test]
    fn colon_in_prose_is_not_a_label() {
        let raw = "Note: I'd keep it short.\nMaybe say: thanks, that works for me.";
        let result = parse_reply(raw);
        assert_eq!(result.suggestion, raw);
        assert!(result.tips.is_empty());
    }

    #[test]
    fn labelled_analysis_tips_and_confidence() {
        let result = parse_reply("Analysis: good rapport\nTips:\n1. smile\n2. nod\nConfidence: 85%");
        assert_eq!(result.analysis, "good rapport");
        assert_eq!(result.tips, vec!["smile", "nod"]);
        assert!(approx(result.confidence, 0.85));
    }

    #[test]
    fn full_labelled_reply() {
        let raw = "Suggestion: I led the migration to Rust and cut latency by 40%.\n\
Analysis: They want evidence of impact.\n\
Tips:\n\
- Quantify results\n\
- Keep it under a minute\n\
Confidence: 0.9";
        let result = parse_reply(raw);
        assert_eq!(result.suggestion, "I led the migration to Rust and cut latency by 40%.");
        assert_eq!(result.analysis, "They want evidence of impact.");
        assert_eq!(result.tips, vec!["Quantify results", "Keep it under a minute"]);
        assert!(approx(result.confidence, 0.9));
    }

    #[test]
    fn labels_are_case_insensitive_and_markdown_tolerant() {
        let raw = "**SUGGESTION:** Happy to help.\n## analysis: friendly opener\n**Tips**:\n* be warm\nconfidence: 70";
        let result = parse_reply(raw);
        assert_eq!(result.suggestion, "Happy to help.");
        assert_eq!(result.analysis, "friendly opener");
        assert_eq!(result.tips, vec!["be warm"]);
        assert!(approx(result.confidence, 0.7));
    }

    #[test]
    fn chinese_labels_and_full_width_colon() {
        let raw = "建议：很高兴认识你！\n分析：对方在寒暄\n技巧：\n1、保持微笑\n2、主动提问\n可信度：90％";
        let result = parse_reply(raw);
        assert_eq!(result.suggestion, "很高兴认识你！");
        assert_eq!(result.analysis, "对方在寒暄");
        assert_eq!(result.tips, vec!["保持微笑", "主动提问"]);
        assert!(approx(result.confidence, 0.9));
    }

    #[test]
    fn preamble_is_the_suggestion_when_unlabelled() {
        let raw = "Sure, let's meet at noon.\nAnalysis: scheduling request";
        let result = parse_reply(raw);
        assert_eq!(result.suggestion, "Sure, let's meet at noon.");
        assert_eq!(result.analysis, "scheduling request");
    }

    #[test]
    fn unmarked_lines_continue_previous_tip() {
        let result = parse_reply("Tips:\n1. Mention the project\n   and its outcome\n2. Ask a follow-up");
        assert_eq!(result.tips, vec!["Mention the project and its outcome", "Ask a follow-up"]);
    }

    #[test]
    fn inline_numbered_tips_are_split() {
        let result = parse_reply("Suggestion: hi\nTips: 1. smile 2. nod");
        assert_eq!(result.tips, vec!["smile", "nod"]);

        let result = parse_reply("技巧：1、保持微笑 2、主动提问 3、适时总结");
        assert_eq!(result.tips, vec!["保持微笑", "主动提问", "适时总结"]);
    }

    #[test]
    fn numbers_inside_a_tip_are_kept() {
        let result = parse_reply("Tips:\n1. mention the 2.5x speedup\n2. ask about 3 teams");
        assert_eq!(result.tips, vec!["mention the 2.5x speedup", "ask about 3 teams"]);
    }

    #[test]
    fn inline_tips_split_on_semicolons() {
        let result = parse_reply("Suggestion: Hi!\nTips: smile; make eye contact");
        assert_eq!(result.tips, vec!["smile", "make eye contact"]);
    }

    #[test]
    fn confidence_is_clamped_and_defaulted() {
        assert!(approx(parse_reply("Suggestion: x\nConfidence: 250").confidence, 1.0));
        assert!(approx(parse_reply("Suggestion: x\nConfidence: high").confidence, FALLBACK_CONFIDENCE));
        assert!(approx(parse_reply("Suggestion: x\nConfidence: 1").confidence, 1.0));
        assert!(approx(parse_reply("Suggestion: x\nConfidence: 0.35").confidence, 0.35));
    }

    #[test]
    fn json_reply_is_understood() {
        let raw = r#"{"suggestion": "Nice to meet you!", "analysis": "greeting", "tips": ["smile", " "], "confidence": 0.85}"#;
        let result = parse_reply(raw);
        assert_eq!(result.suggestion, "Nice to meet you!");
        assert_eq!(result.analysis, "greeting");
        assert_eq!(result.tips, vec!["smile"]);
        assert!(approx(result.confidence, 0.85));
    }

    #[test]
    fn fenced_json_with_percent_score() {
        let raw = "```json\n{\"suggestion\": \"Sure thing\", \"confidence\": 92}\n```";
        let result = parse_reply(raw);
        assert_eq!(result.suggestion, "Sure thing");
        assert!(result.tips.is_empty());
        assert!(approx(result.confidence, 0.92));
    }

    #[test]
    fn json_without_suggestion_falls_through() {
        let raw = r#"{"answer": 42}"#;
        let result = parse_reply(raw);
        assert_eq!(result.suggestion, raw);
        assert!(approx(result.confidence, FALLBACK_CONFIDENCE));
    }

    #[test]
    fn unstructured_reply_is_kept_verbatim() {
        let result = parse_reply("  hello there\n");
        assert_eq!(result.suggestion, "  hello there\n");
    }

    #[test]
    fn empty_reply_still_yields_a_result() {
        let result = parse_reply("   ");
        assert_eq!(result.suggestion, "   ");
        assert!(result.tips.is_empty());
        assert!(approx(result.confidence, FALLBACK_CONFIDENCE));
    }
}

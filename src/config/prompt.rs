use crate::config::scenario::{ self, ScenarioPreset };
use crate::models::chat::{ ChatMessage, RequestContext };

const PERSONA: &str = "You are a professional real-time conversation assistant. \
The user is in a live conversation and will send you what the other person just said. \
Help them answer well.

Principles:
1. Keep the reply concise, natural and unforced
2. Adapt tone and style to the scenario
3. Suggest one to three sentences, never more
4. Respect cultural and social etiquette
5. Avoid overly formal or academic phrasing

Answer using exactly these labelled sections:
Suggestion: <the reply the user could say, 1-3 sentences>
Analysis: <one sentence on what the other person is after>
Tips:
1. <answering tip>
2. <answering tip>
Confidence: <0-100%>";

/// Builds the system instruction for a resolved preset and the optional
/// background and goal.
pub fn build_system_prompt(preset: &ScenarioPreset, context: &RequestContext) -> String {
    let mut prompt = format!("{}\n\n{}", PERSONA, preset.prompt_fragment);

    if let Some(background) = non_blank(&context.user_background) {
        prompt.push_str(&format!("\n\nUser background: {}", background));
    }
    if let Some(goal) = non_blank(&context.conversation_goal) {
        prompt.push_str(&format!("\nConversation goal: {}", goal));
    }

    prompt
}

/// System instruction followed by the interlocutor's statement, passed
/// through untouched.
pub fn build_messages(message: &str, context: &RequestContext) -> Vec<ChatMessage> {
    let preset = scenario::resolve(context.scenario.as_deref());
    vec![
        ChatMessage::system(build_system_prompt(preset, context)),
        ChatMessage::user(message)
    ]
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::chat::Role;

    fn context(scenario: Option<&str>, background: Option<&str>, goal: Option<&str>) -> RequestContext {
        RequestContext {
            scenario: scenario.map(String::from),
            user_background: background.map(String::from),
            conversation_goal: goal.map(String::from),
        }
    }

    #[test]
    fn produces_system_then_user() {
        let messages = build_messages("How are you?", &RequestContext::default());
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[1].role, Role::User);
        assert_eq!(messages[1].content, "How are you?");
    }

    #[test]
    fn user_message_is_not_trimmed_or_truncated() {
        let long = format!("  {}  ", "word ".repeat(5_000));
        let messages = build_messages(&long, &RequestContext::default());
        assert_eq!(messages[1].content, long);
    }

    #[test]
    fn scenario_fragment_is_included() {
        let messages = build_messages("Tell me about yourself", &context(Some("interview"), None, None));
        assert!(messages[0].content.contains("STAR method"));
    }

    #[test]
    fn unknown_scenario_uses_general_fragment() {
        let messages = build_messages("hi", &context(Some("alien"), None, None));
        let general = scenario::get("general").unwrap();
        assert!(messages[0].content.ends_with(general.prompt_fragment));
    }

    #[test]
    fn background_and_goal_are_appended_when_present() {
        let messages = build_messages(
            "Why should we hire you?",
            &context(Some("interview"), Some("5 years of Rust"), Some("get the offer"))
        );
        let system = &messages[0].content;
        assert!(system.contains("User background: 5 years of Rust"));
        assert!(system.contains("Conversation goal: get the offer"));
    }

    #[test]
    fn blank_background_is_skipped() {
        let messages = build_messages("hi", &context(None, Some("   "), None));
        assert!(!messages[0].content.contains("User background"));
        assert!(!messages[0].content.contains("Conversation goal"));
    }

    #[test]
    fn output_is_deterministic() {
        let ctx = context(Some("business"), Some("sales lead"), Some("close the deal"));
        assert_eq!(build_messages("Price?", &ctx), build_messages("Price?", &ctx));
    }
}

use super::{Capability, RouterError, Selection, Selector};
use crate::llm::LlmClient;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

/// Selector that asks the LLM to pick a capability from a numbered list.
pub struct LlmSelector {
    llm: Arc<dyn LlmClient>,
}

impl LlmSelector {
    /// Wrap a completion client.
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Selector for LlmSelector {
    async fn select(
        &self,
        question: &str,
        choices: &[Capability],
    ) -> Result<Selection, RouterError> {
        let prompt = build_selection_prompt(question, choices);
        let raw = self.llm.complete(&prompt).await?;
        tracing::debug!(model = self.llm.model(), raw = %raw, "Selector response");
        parse_selection(&raw, choices)
    }
}

pub(crate) fn build_selection_prompt(question: &str, choices: &[Capability]) -> String {
    let mut prompt = format!(
        "Some choices are given below as a numbered list (1 to {}). Each item describes when \
         that choice should be used.\n---------------------\n",
        choices.len()
    );
    for (position, capability) in choices.iter().enumerate() {
        prompt.push_str(&format!("({}) {}\n", position + 1, capability.description()));
    }
    prompt.push_str("---------------------\n");
    prompt.push_str(&format!(
        "Using only the choices above and not prior knowledge, return the single choice that is \
         most relevant to the question: '{}'\n\n",
        question.trim()
    ));
    prompt.push_str(
        "Reply with JSON only, formatted as a list with exactly one object, for example:\n\
         [{\"choice\": 1, \"reason\": \"<why this choice fits>\"}]\n",
    );
    prompt
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawOutput {
    Many(Vec<RawSelection>),
    One(RawSelection),
}

#[derive(Deserialize)]
struct RawSelection {
    choice: RawChoice,
    #[serde(default)]
    reason: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawChoice {
    Number(u64),
    Text(String),
}

/// Interpret the selector's reply as one of `choices`.
///
/// Accepts a JSON list or object, optionally wrapped in prose or a code fence. When no JSON
/// parses, a bare `choice: N` in the text is still honoured.
pub(crate) fn parse_selection(raw: &str, choices: &[Capability]) -> Result<Selection, RouterError> {
    let (choice, reason) = match extract_json(raw).and_then(decode_json) {
        Some(found) => found,
        None => (
            scan_choice_number(raw)
                .ok_or_else(|| RouterError::MalformedSelection(raw.trim().to_string()))?,
            String::new(),
        ),
    };

    let index = usize::try_from(choice)
        .ok()
        .and_then(|value| value.checked_sub(1))
        .filter(|index| *index < choices.len())
        .ok_or(RouterError::ChoiceOutOfRange {
            choice,
            available: choices.len(),
        })?;

    Ok(Selection {
        capability: choices[index],
        reason: reason.trim().to_string(),
    })
}

fn extract_json(raw: &str) -> Option<&str> {
    let start = raw.find(['[', '{'])?;
    let closer = if raw[start..].starts_with('[') { ']' } else { '}' };
    let end = raw.rfind(closer)?;
    (end > start).then(|| &raw[start..=end])
}

fn decode_json(candidate: &str) -> Option<(u64, String)> {
    let selection = match serde_json::from_str::<RawOutput>(candidate).ok()? {
        RawOutput::Many(list) => list.into_iter().next()?,
        RawOutput::One(single) => single,
    };
    let choice = match selection.choice {
        RawChoice::Number(value) => value,
        RawChoice::Text(text) => text.trim().parse().ok()?,
    };
    Some((choice, selection.reason))
}

fn scan_choice_number(raw: &str) -> Option<u64> {
    let lower = raw.to_lowercase();
    let after = &lower[lower.find("choice")? + "choice".len()..];
    let digits: String = after
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}

use std::sync::LazyLock;

use anyhow::{anyhow, bail};
use async_openai::{
    Client,
    config::OpenAIConfig,
    error::OpenAIError,
    types::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
};
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::config::{Config, OPENROUTER_BASE_URL};

const CHAT_SYSTEM_PROMPT: &str = "You are Luno, a friendly and patient AI coding tutor specializing in HTML and CSS. You help students learn step-by-step, explain concepts clearly, and encourage them. Keep responses concise (under 200 words) and beginner-friendly.";

const EXPLAIN_SYSTEM_PROMPT: &str = "You are a friendly, patient coding tutor who explains code in simple terms for beginners learning HTML and CSS.";

const QUIZ_SYSTEM_PROMPT: &str = "You are a coding tutor creating quiz questions. Always respond with valid JSON only, no markdown formatting.";

const DEBUG_SYSTEM_PROMPT: &str = "You are a helpful debugging assistant. Explain errors clearly and provide solutions in a friendly, encouraging way.";

const REVIEW_SYSTEM_PROMPT: &str = "You are an expert HTML/CSS code reviewer helping beginners improve their code. Always respond with valid JSON only, no markdown formatting.";

/// One turn of chat history as sent by the client.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChatTurn {
    /// Missing roles are treated as the student speaking.
    #[serde(default = "default_role")]
    pub role: String,
    pub content: String,
}

fn default_role() -> String {
    "user".to_string()
}

impl ChatTurn {
    fn to_message(&self) -> anyhow::Result<ChatCompletionRequestMessage> {
        let message = match self.role.as_str() {
            "assistant" => ChatCompletionRequestAssistantMessageArgs::default()
                .content(self.content.as_str())
                .build()?
                .into(),
            "system" => ChatCompletionRequestSystemMessageArgs::default()
                .content(self.content.as_str())
                .build()?
                .into(),
            // anything unrecognized is treated as the student speaking
            _ => ChatCompletionRequestUserMessageArgs::default()
                .content(self.content.as_str())
                .build()?
                .into(),
        };
        Ok(message)
    }
}

#[derive(Debug, Deserialize)]
pub struct GeneratedQuiz {
    pub questions: Vec<GeneratedQuestion>,
}

#[derive(Debug, Deserialize)]
pub struct GeneratedQuestion {
    pub question: String,
    pub options: QuestionOptions,
    #[serde(rename = "correctAnswer")]
    pub correct_answer: String,
    #[serde(default)]
    pub explanation: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct QuestionOptions {
    #[serde(default)]
    pub a: String,
    #[serde(default)]
    pub b: String,
    #[serde(default)]
    pub c: String,
    #[serde(default)]
    pub d: String,
}

/// Whole-editor review returned by the AI, passed through to the client.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReviewAnalysis {
    pub score: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default)]
    pub suggestions: Vec<ReviewSuggestion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ReviewAnalysis {
    /// Canned result for an empty editor, no AI round-trip needed.
    pub fn empty_editor() -> Self {
        Self {
            score: 100,
            summary: None,
            suggestions: Vec::new(),
            message: Some("Code is empty. Start typing to get suggestions!".into()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReviewSuggestion {
    /// One of `error`, `warning`, `info`, `suggestion`.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(default, rename = "startLine", skip_serializing_if = "Option::is_none")]
    pub start_line: Option<u32>,
    #[serde(default, rename = "endLine", skip_serializing_if = "Option::is_none")]
    pub end_line: Option<u32>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(default, rename = "oldCode", skip_serializing_if = "Option::is_none")]
    pub old_code: Option<String>,
    #[serde(default, rename = "newCode", skip_serializing_if = "Option::is_none")]
    pub new_code: Option<String>,
}

/// Chat-completion gateway shared by every AI feature. Holds no client when no
/// API key is configured; calls then fail with a configuration error instead
/// of panicking at startup.
#[derive(Clone)]
pub struct AiClient {
    client: Option<Client<OpenAIConfig>>,
    model: String,
    openrouter: bool,
}

impl AiClient {
    pub fn from_config(config: &Config) -> Self {
        let Some(api_key) = config.openai_api_key.clone() else {
            return Self {
                client: None,
                model: config.ai_model.clone(),
                openrouter: false,
            };
        };
        let openrouter = config.uses_openrouter();
        let mut oa_config = OpenAIConfig::default().with_api_key(api_key);
        if let Some(base_url) = &config.openai_base_url {
            oa_config = oa_config.with_api_base(base_url);
        } else if openrouter {
            oa_config = oa_config.with_api_base(OPENROUTER_BASE_URL);
        }
        let client = if openrouter {
            // OpenRouter wants to know who is calling on every request
            match openrouter_http_client(&config.site_url) {
                Ok(http_client) => Client::build(
                    http_client,
                    oa_config,
                    backoff::ExponentialBackoff::default(),
                ),
                Err(e) => {
                    tracing::warn!("failed to build OpenRouter headers: {e:#}");
                    Client::with_config(oa_config)
                }
            }
        } else {
            Client::with_config(oa_config)
        };
        Self {
            client: Some(client),
            model: qualify_model(&config.ai_model, openrouter),
            openrouter,
        }
    }

    pub fn provider(&self) -> &'static str {
        if self.openrouter { "OpenRouter" } else { "OpenAI" }
    }

    pub async fn chat(&self, message: &str, history: &[ChatTurn]) -> anyhow::Result<String> {
        let mut messages = vec![ChatCompletionRequestMessage::System(
            CHAT_SYSTEM_PROMPT.to_string().into(),
        )];
        for turn in history {
            messages.push(turn.to_message()?);
        }
        messages.push(ChatCompletionRequestMessage::User(message.to_string().into()));
        self.complete(messages, 300, "Failed to get response from tutor")
            .await
    }

    pub async fn explain_line(&self, code_line: &str, context: &str) -> anyhow::Result<String> {
        let context_part = if context.is_empty() {
            String::new()
        } else {
            format!("Context: {context}")
        };
        let prompt = format!(
            "You are a friendly coding tutor teaching HTML and CSS to beginners. \
             Explain this line of code in a simple, encouraging way:\n\n\
             {code_line}\n\n\
             {context_part}\n\n\
             Keep the explanation:\n\
             - Simple and beginner-friendly\n\
             - Fun and engaging\n\
             - Under 100 words\n\
             - Focus on what this line does and why it's important"
        );
        let messages = vec![
            ChatCompletionRequestMessage::System(EXPLAIN_SYSTEM_PROMPT.to_string().into()),
            ChatCompletionRequestMessage::User(prompt.into()),
        ];
        self.complete(messages, 200, "Failed to generate explanation")
            .await
    }

    pub async fn generate_quiz(
        &self,
        lesson_title: &str,
        lesson_content: &str,
    ) -> anyhow::Result<GeneratedQuiz> {
        let prompt = format!(
            "Generate 5 multiple-choice questions about this HTML/CSS lesson:\n\n\
             Lesson Title: {lesson_title}\n\
             Lesson Content:\n{lesson_content}\n\n\
             Create 5 MCQ questions with:\n\
             - Clear, beginner-friendly question text\n\
             - 4 options (a, b, c, d) for each question\n\
             - One correct answer per question\n\
             - Brief explanation for the correct answer\n\n\
             Format as JSON:\n\
             {{\n\
               \"questions\": [\n\
                 {{\n\
                   \"question\": \"Question text?\",\n\
                   \"options\": {{\n\
                     \"a\": \"Option A\",\n\
                     \"b\": \"Option B\",\n\
                     \"c\": \"Option C\",\n\
                     \"d\": \"Option D\"\n\
                   }},\n\
                   \"correctAnswer\": \"a\",\n\
                   \"explanation\": \"Brief explanation\"\n\
                 }}\n\
               ]\n\
             }}"
        );
        let messages = vec![
            ChatCompletionRequestMessage::System(QUIZ_SYSTEM_PROMPT.to_string().into()),
            ChatCompletionRequestMessage::User(prompt.into()),
        ];
        let content = self
            .complete(messages, 1500, "Failed to generate quiz")
            .await?;
        parse_generated_quiz(&content)
    }

    pub async fn debug_code(&self, code: &str, error_message: &str) -> anyhow::Result<String> {
        let error_part = if error_message.is_empty() {
            "No specific error, but the code is not working as expected.".to_string()
        } else {
            format!("Error message: {error_message}")
        };
        let prompt = format!(
            "A student is having trouble with their HTML/CSS code. Help them debug it:\n\n\
             Code:\n{code}\n\n\
             {error_part}\n\n\
             Provide:\n\
             1. What's wrong with the code\n\
             2. How to fix it\n\
             3. A corrected version (if applicable)\n\n\
             Keep it beginner-friendly and encouraging."
        );
        let messages = vec![
            ChatCompletionRequestMessage::System(DEBUG_SYSTEM_PROMPT.to_string().into()),
            ChatCompletionRequestMessage::User(prompt.into()),
        ];
        self.complete(messages, 500, "Failed to debug code").await
    }

    pub async fn review_code(&self, code: &str, language: &str) -> anyhow::Result<ReviewAnalysis> {
        let prompt = format!(
            "Review this {language} code written by a beginner and point out problems and improvements:\n\n\
             {code}\n\n\
             Respond with JSON in this exact shape:\n\
             {{\n\
               \"score\": 85,\n\
               \"summary\": \"One-sentence verdict\",\n\
               \"suggestions\": [\n\
                 {{\n\
                   \"type\": \"error|warning|info|suggestion\",\n\
                   \"priority\": \"high|medium|low\",\n\
                   \"line\": 3,\n\
                   \"message\": \"Short description of the issue\",\n\
                   \"explanation\": \"Why it matters, beginner-friendly\",\n\
                   \"oldCode\": \"the problematic snippet\",\n\
                   \"newCode\": \"the corrected snippet\"\n\
                 }}\n\
               ]\n\
             }}\n\n\
             Score from 0 to 100 where 100 is flawless. Use startLine and endLine instead of line \
             when an issue spans multiple lines. At most 8 suggestions, most important first."
        );
        let messages = vec![
            ChatCompletionRequestMessage::System(REVIEW_SYSTEM_PROMPT.to_string().into()),
            ChatCompletionRequestMessage::User(prompt.into()),
        ];
        let content = self
            .complete(messages, 1500, "Failed to review code")
            .await?;
        parse_review_analysis(&content)
    }

    pub async fn suggest_fixes(
        &self,
        code: &str,
        issue: &str,
        language: &str,
    ) -> anyhow::Result<Vec<ReviewSuggestion>> {
        let prompt = format!(
            "A beginner needs help with a specific issue in their {language} code.\n\n\
             Code:\n{code}\n\n\
             Issue: {issue}\n\n\
             Respond with JSON in this exact shape:\n\
             {{\n\
               \"suggestions\": [\n\
                 {{\n\
                   \"type\": \"error|warning|info|suggestion\",\n\
                   \"priority\": \"high|medium|low\",\n\
                   \"line\": 3,\n\
                   \"message\": \"Short description\",\n\
                   \"explanation\": \"How this addresses the issue\",\n\
                   \"oldCode\": \"the problematic snippet\",\n\
                   \"newCode\": \"the corrected snippet\"\n\
                 }}\n\
               ]\n\
             }}\n\n\
             Only include suggestions that address the stated issue."
        );
        let messages = vec![
            ChatCompletionRequestMessage::System(REVIEW_SYSTEM_PROMPT.to_string().into()),
            ChatCompletionRequestMessage::User(prompt.into()),
        ];
        let content = self
            .complete(messages, 1500, "Failed to get suggestions")
            .await?;
        parse_suggestions(&content)
    }

    async fn complete(
        &self,
        messages: Vec<ChatCompletionRequestMessage>,
        max_tokens: u32,
        context: &str,
    ) -> anyhow::Result<String> {
        let Some(client) = &self.client else {
            bail!("OpenAI API key is not configured");
        };
        let request = CreateChatCompletionRequestArgs::default()
            .model(self.model.as_str())
            .messages(messages)
            .max_completion_tokens(max_tokens)
            .temperature(0.7)
            .build()?;
        tracing::debug!("sending chat request to {}", self.provider());
        let response = client
            .chat()
            .create(request)
            .await
            .map_err(|e| shape_provider_error(context, &e))?;
        let content = response
            .choices
            .first()
            .ok_or(anyhow!("No response from {}", self.provider()))?
            .message
            .content
            .clone()
            .ok_or(anyhow!("No response from {}", self.provider()))?;
        Ok(content.trim().to_string())
    }
}

fn openrouter_http_client(site_url: &str) -> anyhow::Result<reqwest::Client> {
    let mut headers = HeaderMap::new();
    headers.insert("HTTP-Referer", HeaderValue::from_str(site_url)?);
    headers.insert("X-Title", HeaderValue::from_static("Luno - AI Coding Tutor"));
    let client = reqwest::Client::builder()
        .default_headers(headers)
        .build()?;
    Ok(client)
}

/// OpenRouter expects vendor-qualified model names like `openai/gpt-3.5-turbo`.
fn qualify_model(model: &str, openrouter: bool) -> String {
    if openrouter && !model.contains('/') {
        format!("openai/{model}")
    } else {
        model.to_string()
    }
}

fn shape_provider_error(context: &str, err: &OpenAIError) -> anyhow::Error {
    anyhow!("{}", shape_provider_message(context, &err.to_string()))
}

/// Rewrites auth-ish provider failures into something a user can act on.
/// Everything else keeps the provider's wording, prefixed with the feature
/// that failed.
fn shape_provider_message(context: &str, raw: &str) -> String {
    let lower = raw.to_lowercase();
    let key_problem = ["user not found", "no auth credentials", "api key", "unauthorized"]
        .iter()
        .any(|needle| lower.contains(needle));
    if key_problem {
        format!("{context}: the AI provider rejected the API key ({raw}). Check OPENAI_API_KEY.")
    } else {
        format!("{context}: {raw}")
    }
}

static CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```(?:json)?\n?").expect("invalid fence regex"));

/// Models regularly wrap JSON in markdown fences despite being told not to.
fn strip_code_fences(content: &str) -> String {
    CODE_FENCE.replace_all(content, "").into_owned()
}

fn parse_generated_quiz(content: &str) -> anyhow::Result<GeneratedQuiz> {
    let cleaned = strip_code_fences(content);
    let value: serde_json::Value = serde_json::from_str(cleaned.trim())
        .map_err(|e| anyhow!("Invalid quiz data from AI: {e}"))?;
    let Some(raw_questions) = value.get("questions").and_then(|q| q.as_array()) else {
        bail!("Invalid quiz data format from AI");
    };
    let mut questions = Vec::new();
    for raw in raw_questions {
        match serde_json::from_value::<GeneratedQuestion>(raw.clone()) {
            Ok(q) if q.question.is_empty() || q.correct_answer.is_empty() => {
                tracing::warn!("skipping quiz question with empty text or answer");
            }
            Ok(question) => questions.push(question),
            Err(e) => tracing::warn!("skipping malformed quiz question: {e}"),
        }
    }
    if questions.is_empty() {
        bail!("Invalid quiz data format from AI");
    }
    Ok(GeneratedQuiz { questions })
}

fn parse_review_analysis(content: &str) -> anyhow::Result<ReviewAnalysis> {
    let cleaned = strip_code_fences(content);
    let mut value: serde_json::Value = serde_json::from_str(cleaned.trim())
        .map_err(|e| anyhow!("Invalid review data from AI: {e}"))?;
    // drop malformed suggestions instead of failing the whole review
    let suggestions = take_suggestions(&mut value);
    let mut analysis: ReviewAnalysis = serde_json::from_value(value)
        .map_err(|e| anyhow!("Invalid review data from AI: {e}"))?;
    analysis.suggestions = suggestions;
    Ok(analysis)
}

fn parse_suggestions(content: &str) -> anyhow::Result<Vec<ReviewSuggestion>> {
    let cleaned = strip_code_fences(content);
    let mut value: serde_json::Value = serde_json::from_str(cleaned.trim())
        .map_err(|e| anyhow!("Invalid suggestion data from AI: {e}"))?;
    Ok(take_suggestions(&mut value))
}

fn take_suggestions(value: &mut serde_json::Value) -> Vec<ReviewSuggestion> {
    let Some(raw) = value
        .as_object_mut()
        .and_then(|obj| obj.remove("suggestions"))
    else {
        return Vec::new();
    };
    let Some(items) = raw.as_array() else {
        return Vec::new();
    };
    let mut suggestions = Vec::new();
    for item in items {
        match serde_json::from_value::<ReviewSuggestion>(item.clone()) {
            Ok(suggestion) => suggestions.push(suggestion),
            Err(e) => tracing::warn!("skipping malformed suggestion: {e}"),
        }
    }
    suggestions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_names_get_vendor_prefix_for_openrouter() {
        assert_eq!(qualify_model("gpt-3.5-turbo", true), "openai/gpt-3.5-turbo");
        assert_eq!(qualify_model("gpt-3.5-turbo", false), "gpt-3.5-turbo");
        assert_eq!(
            qualify_model("mistralai/mistral-7b-instruct", true),
            "mistralai/mistral-7b-instruct"
        );
    }

    #[test]
    fn fences_are_stripped() {
        assert_eq!(
            strip_code_fences("```json\n{\"a\":1}\n```"),
            "{\"a\":1}\n"
        );
        assert_eq!(strip_code_fences("{\"a\":1}"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n[]\n```"), "[]\n");
    }

    #[test]
    fn quiz_parse_accepts_fenced_json() {
        let content = r#"```json
{
  "questions": [
    {
      "question": "What does <h1> mean?",
      "options": {"a": "Heading", "b": "Header cell", "c": "Horizontal rule", "d": "Hyperlink"},
      "correctAnswer": "a",
      "explanation": "h1 is the top-level heading."
    }
  ]
}
```"#;
        let quiz = parse_generated_quiz(content).unwrap();
        assert_eq!(quiz.questions.len(), 1);
        assert_eq!(quiz.questions[0].correct_answer, "a");
        assert_eq!(quiz.questions[0].options.a, "Heading");
    }

    #[test]
    fn quiz_parse_skips_malformed_questions() {
        let content = r#"{
  "questions": [
    {"question": "ok?", "options": {"a": "1", "b": "2", "c": "3", "d": "4"}, "correctAnswer": "b"},
    {"question": "missing answer", "options": {"a": "1", "b": "2", "c": "3", "d": "4"}},
    {"question": "", "options": {"a": "1", "b": "2", "c": "3", "d": "4"}, "correctAnswer": "a"}
  ]
}"#;
        let quiz = parse_generated_quiz(content).unwrap();
        assert_eq!(quiz.questions.len(), 1);
        assert_eq!(quiz.questions[0].question, "ok?");
        assert_eq!(quiz.questions[0].explanation, "");
    }

    #[test]
    fn quiz_parse_rejects_wrong_shape() {
        assert!(parse_generated_quiz("{\"not_questions\": []}").is_err());
        assert!(parse_generated_quiz("not json at all").is_err());
        assert!(parse_generated_quiz("{\"questions\": []}").is_err());
    }

    #[test]
    fn review_parse_fills_defaults() {
        let content = r#"{"score": 70, "suggestions": [
            {"type": "warning", "message": "Missing alt attribute", "line": 4},
            {"bogus": true}
        ]}"#;
        let analysis = parse_review_analysis(content).unwrap();
        assert_eq!(analysis.score, 70);
        assert_eq!(analysis.suggestions.len(), 1);
        assert_eq!(analysis.suggestions[0].kind, "warning");
        assert_eq!(analysis.suggestions[0].line, Some(4));
        assert!(analysis.summary.is_none());
    }

    #[test]
    fn suggestions_parse_tolerates_missing_list() {
        assert!(parse_suggestions("{}").unwrap().is_empty());
        let got = parse_suggestions(
            r#"{"suggestions": [{"type": "suggestion", "message": "Use semantic tags"}]}"#,
        )
        .unwrap();
        assert_eq!(got.len(), 1);
    }

    #[test]
    fn provider_errors_mention_the_key_when_relevant() {
        let msg = shape_provider_message("Failed to get response from tutor", "User not found");
        assert!(msg.contains("OPENAI_API_KEY"));
        assert!(msg.starts_with("Failed to get response from tutor"));

        let msg = shape_provider_message("Failed to debug code", "rate limit exceeded");
        assert_eq!(msg, "Failed to debug code: rate limit exceeded");
    }
}

use std::time::Duration;

use async_trait::async_trait;
use rand::seq::SliceRandom;
use rand::Rng;
use reqwest::Client;
use serde_json::{json, Value as JsonValue};

use crate::error::Result;
use crate::models::exam::{ExplanationRequest, QuestionRequest};
use crate::models::question::{Question, OPTION_COUNT};

const GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const SIMPLIFY_EMPTY_REPLY: &str = "I couldn't simplify this concept at the moment.";

/// Produces multiple-choice questions for a session.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuestionSource: Send + Sync {
    /// Returns between zero and `request.count` questions.
    async fn generate(&self, request: &QuestionRequest) -> Result<Vec<Question>>;
}

/// Rewrites an explanation in plainer terms for the review screen.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ExplanationSource: Send + Sync {
    async fn simplify(&self, request: &ExplanationRequest) -> Result<String>;
}

#[derive(Clone)]
pub struct GeminiService {
    client: Client,
    api_key: String,
    question_model: String,
    explanation_model: String,
}

impl GeminiService {
    pub fn new(
        client: Client,
        api_key: String,
        question_model: String,
        explanation_model: String,
    ) -> Self {
        Self {
            client,
            api_key,
            question_model,
            explanation_model,
        }
    }

    async fn generate_content(&self, model: &str, payload: JsonValue) -> Result<String> {
        let res = self
            .client
            .post(format!("{}/{}:generateContent", GEMINI_ENDPOINT, model))
            .header("x-goog-api-key", &self.api_key)
            .json(&payload)
            .timeout(Duration::from_secs(120))
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("Gemini API error {}: {}", status, error_message(&text)).into());
        }

        let body: JsonValue = res.json().await?;
        Ok(response_text(&body))
    }
}

#[async_trait]
impl QuestionSource for GeminiService {
    async fn generate(&self, request: &QuestionRequest) -> Result<Vec<Question>> {
        let system_instruction = format!(
            "You are a Senior Sri Lankan A/L Examiner.\n\
             Subject: {subject}\n\
             Medium: {medium}\n\
             Task: Generate {count} MCQs (5 options each) strictly based on the Sri Lankan National Syllabus.\n\
             Format: Provide 1 correct answer and a pedagogical explanation.\n\
             Language: Technical terms must be standard for the {medium} medium in SL.",
            subject = request.subject,
            medium = request.medium,
            count = request.count,
        );

        let payload = json!({
            "systemInstruction": { "parts": [{ "text": system_instruction }] },
            "contents": [{
                "role": "user",
                "parts": [{
                    "text": format!(
                        "Generate {} {} questions for A/L {} (Topic: {}).",
                        request.count,
                        request.exam_type.as_str(),
                        request.subject,
                        request.topic
                    )
                }]
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "temperature": 0.4,
                "responseSchema": question_schema()
            }
        });

        tracing::info!(
            subject = %request.subject,
            medium = %request.medium,
            count = request.count,
            exam_type = request.exam_type.as_str(),
            "Requesting questions from Gemini"
        );
        let text = self.generate_content(&self.question_model, payload).await?;

        let raw = extract_json(&text).unwrap_or(JsonValue::Null);
        let questions = sanitize_questions(&raw, request.count, &mut rand::thread_rng());
        tracing::info!(received = questions.len(), "Questions sanitized");
        Ok(questions)
    }
}

#[async_trait]
impl ExplanationSource for GeminiService {
    async fn simplify(&self, request: &ExplanationRequest) -> Result<String> {
        let payload = json!({
            "contents": [{
                "role": "user",
                "parts": [{
                    "text": format!(
                        "Subject: {}\nQ: {}\nTechnical Explanation: {}\nTask: Explain this using a simple real-world analogy in {}.",
                        request.subject, request.question, request.explanation, request.medium
                    )
                }]
            }],
            "generationConfig": { "temperature": 0.7 }
        });

        let text = self
            .generate_content(&self.explanation_model, payload)
            .await?;
        let text = text.trim();
        if text.is_empty() {
            return Ok(SIMPLIFY_EMPTY_REPLY.to_string());
        }
        Ok(text.to_string())
    }
}

fn question_schema() -> JsonValue {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "question": { "type": "STRING" },
                "options": {
                    "type": "ARRAY",
                    "items": { "type": "STRING" },
                    "minItems": OPTION_COUNT,
                    "maxItems": OPTION_COUNT
                },
                "correctAnswerIndex": { "type": "INTEGER" },
                "explanation": { "type": "STRING" }
            },
            "required": ["question", "options", "correctAnswerIndex", "explanation"]
        }
    })
}

/// Concatenated text parts of the first candidate.
fn response_text(body: &JsonValue) -> String {
    body.pointer("/candidates/0/content/parts")
        .and_then(|p| p.as_array())
        .map(|parts| {
            parts
                .iter()
                .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
                .collect::<String>()
        })
        .unwrap_or_default()
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<JsonValue>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().to_string())
}

/// Parses model output that may be wrapped in markdown fences or prose.
pub fn extract_json(text: &str) -> Option<JsonValue> {
    if let (Some(start), Some(end)) = (text.find('['), text.rfind(']')) {
        if start < end {
            if let Ok(v) = serde_json::from_str(&text[start..=end]) {
                return Some(v);
            }
        }
    }
    match serde_json::from_str(text.trim()) {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!(error = %e, "Unparsable question payload");
            None
        }
    }
}

pub fn sanitize_questions(raw: &JsonValue, count: usize, rng: &mut impl Rng) -> Vec<Question> {
    let items = raw
        .get("questions")
        .and_then(|a| a.as_array())
        .or_else(|| raw.as_array());
    let Some(items) = items else {
        return Vec::new();
    };

    let mut questions: Vec<Question> = items
        .iter()
        .filter_map(|v| coerce_question(v, &mut *rng))
        .collect();
    if questions.len() < items.len() {
        tracing::debug!(
            dropped = items.len() - questions.len(),
            "Dropped malformed questions"
        );
    }
    questions.truncate(count);
    questions
}

fn coerce_question(v: &JsonValue, rng: &mut impl Rng) -> Option<Question> {
    let options: Vec<String> = v
        .get("options")?
        .as_array()?
        .iter()
        .map(|o| o.as_str().map(|s| s.trim().to_string()))
        .collect::<Option<_>>()?;

    let correct_answer = v
        .get("correctAnswerIndex")
        .or_else(|| v.get("correct_answer"))
        .and_then(|i| i.as_u64())? as usize;

    let mut question = Question {
        question: v.get("question")?.as_str()?.trim().to_string(),
        options,
        correct_answer,
        explanation: v
            .get("explanation")
            .and_then(|s| s.as_str())
            .unwrap_or_default()
            .trim()
            .to_string(),
    };
    if !question.is_well_formed() {
        return None;
    }

    let correct_option = question.options[question.correct_answer].clone();
    question.options.shuffle(rng);
    question.correct_answer = question.options.iter().position(|o| *o == correct_option)?;
    Some(question)
}

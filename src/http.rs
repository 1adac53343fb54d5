use crate::dtos::{DraftDto, LlmRequestInput};
use crate::error::HttpError;

/// Thin wrapper around the shared reqwest client used for LLM calls.
/// Cloning is cheap because reqwest::Client is reference counted.
#[derive(Clone)]
pub struct LlmClient {
    pub conn: reqwest::Client,
}

impl LlmClient {
    pub fn new(conn: reqwest::Client) -> Self {
        Self { conn }
    }

    /// Ask the configured model for a post draft on `prompt`.
    ///
    /// The service speaks the OpenAI responses API. The model is told to
    /// put the title on the first line and the body below it; reasoning
    /// models may prefix a `<think>` block, which is stripped before the
    /// split.
    pub async fn generate_draft(
        &self,
        llm_url: &str,
        model_name: &str,
        prompt: &str,
    ) -> Result<DraftDto, HttpError> {
        let full_url = format!("{}/v1/responses", llm_url);

        let request_body = LlmRequestInput {
            model: model_name.to_string(),
            input: format!(
                "Write a blog post draft about the topic below. \
                Reply with the post title on the first line, then a blank line, \
                then the post body as plain paragraphs without markdown headings. \
                Topic: {}",
                prompt
            ),
        };

        tracing::debug!(model = model_name, "requesting draft from llm service");

        let response = self
            .conn
            .post(full_url)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| HttpError::server_error(e.to_string()))?;

        let json_value: serde_json::Value = response
            .json()
            .await
            .map_err(|e| HttpError::server_error(e.to_string()))?;

        // Responses arrive as {"output": [{"content": [{"text": "..."}]}]}.
        let llm_response_text = json_value["output"][0]["content"][0]["text"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| {
                HttpError::server_error("Could not find text in response".to_string())
            })?;

        let answer = match llm_response_text.split_once("</think>") {
            Some((_reasoning, after)) => after.trim(),
            None => llm_response_text.trim(),
        };

        let (title, content) = answer
            .split_once('\n')
            .map(|(first, rest)| (first.trim_start_matches('#').trim(), rest.trim()))
            .ok_or_else(|| HttpError::server_error("LLM draft parsing error".to_string()))?;

        if title.is_empty() || content.is_empty() {
            return Err(HttpError::server_error(
                "LLM draft parsing error".to_string(),
            ));
        }

        Ok(DraftDto {
            title: title.to_string(),
            content: content.to_string(),
        })
    }
}

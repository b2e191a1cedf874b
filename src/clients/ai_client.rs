use crate::{
    config::AIConfig,
    errors::AIError,
    types::ai::{ChatMessage, OpenAIChatCompletionResponse, OpenAIChatRequest, ResponseFormat},
    types::analysis::AnalysisPrompt,
};
use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use std::time::Duration;

/// A language model that answers one analysis stage with a JSON value.
///
/// Implementations only transport and decode; checking the value against the
/// stage schema is the orchestrator's job.
#[async_trait]
pub trait ChatModel: Send + Sync {
    fn model_name(&self) -> &str;

    async fn invoke(&self, prompt: &AnalysisPrompt) -> Result<Value, AIError>;
}

/// OpenAI-compatible `/chat/completions` endpoint in JSON mode.
#[derive(Debug, Clone)]
pub struct OpenAIChatModel {
    api_url: String,
    model_name: String,
    temperature: f32,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl OpenAIChatModel {
    pub fn new(
        api_url: impl Into<String>,
        model_name: impl Into<String>,
        temperature: f32,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, AIError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            api_url: api_url.into(),
            model_name: model_name.into(),
            temperature,
            api_key: api_key.filter(|k| !k.is_empty()),
            client,
        })
    }

    /// `Ok(None)` when no endpoint is configured.
    pub fn from_config(config: &AIConfig) -> Result<Option<Self>, AIError> {
        let Some(api_url) = config.api_url.as_ref() else {
            return Ok(None);
        };
        Self::new(
            api_url.clone(),
            config.model_name.clone(),
            config.temperature,
            config.api_key.clone(),
            Duration::from_secs(config.timeout_secs),
        )
        .map(Some)
    }

    fn build_messages(prompt: &AnalysisPrompt) -> Vec<ChatMessage> {
        let mut system = prompt.instructions.clone();
        if let Some(schema) = &prompt.schema {
            system.push_str("\n\nRespond with a single JSON object that matches this JSON schema:\n");
            system.push_str(&schema.to_string());
        }

        let mut user = prompt.prompt.clone();
        if let Some(context) = &prompt.context {
            if !context.is_empty() {
                user.push_str("\n\nContext:\n");
                user.push_str(
                    &serde_json::to_string_pretty(context).unwrap_or_else(|_| "{}".to_string()),
                );
            }
        }

        vec![ChatMessage::system(system), ChatMessage::user(user)]
    }

    async fn execute_ai_request(&self, messages: Vec<ChatMessage>) -> Result<String, AIError> {
        let request_payload = OpenAIChatRequest {
            model: self.model_name.clone(),
            messages,
            temperature: Some(self.temperature),
            stream: false,
            response_format: Some(ResponseFormat {
                format_type: "json_object".to_string(),
            }),
        };

        if let Ok(json_string) = serde_json::to_string_pretty(&request_payload) {
            tracing::trace!("正在发送 JSON 数据到 AI:\n{}", json_string);
        }

        let mut request_builder = self.client.post(&self.api_url);
        if let Some(api_key) = &self.api_key {
            request_builder = request_builder.bearer_auth(api_key);
        }

        let response = request_builder
            .json(&request_payload)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("发送 AI 请求失败: {}", e);
                AIError::RequestFailed(e)
            })?;

        if !response.status().is_success() {
            let status_code = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body from AI response".to_string());
            tracing::error!("AI API 请求失败，状态码: {}: {}", status_code, body);
            return Err(AIError::ApiResponseError(status_code, body));
        }

        let response_data = response
            .json::<OpenAIChatCompletionResponse>()
            .await
            .map_err(|e| {
                tracing::error!("解析 AI 响应 JSON 失败: {}", e);
                AIError::InvalidJson(e.to_string())
            })?;

        let Some(choice) = response_data.choices.first() else {
            tracing::warn!("在 AI 响应中未找到选项。");
            return Err(AIError::NoChoiceInResponse);
        };
        if choice.message.content.trim().is_empty() {
            tracing::warn!("AI 返回了空的消息内容。");
            return Err(AIError::EmptyMessage);
        }
        Ok(clean_ai_output(&choice.message.content))
    }
}

#[async_trait]
impl ChatModel for OpenAIChatModel {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn invoke(&self, prompt: &AnalysisPrompt) -> Result<Value, AIError> {
        tracing::debug!("调用模型 {} 执行阶段 {}", self.model_name, prompt.step);
        let content = self
            .execute_ai_request(Self::build_messages(prompt))
            .await?;
        serde_json::from_str(&content).map_err(|e| {
            tracing::warn!(
                "阶段 {} 的 AI 输出不是合法 JSON: {} (前 100 个字符: {})",
                prompt.step,
                e,
                content.chars().take(100).collect::<String>()
            );
            AIError::InvalidJson(e.to_string())
        })
    }
}

lazy_static! {
    static ref RE_THINK_TAGS: Regex = Regex::new(r"(?s)<think>.*?</think>").unwrap();
    static ref RE_CODE_FENCE: Regex = Regex::new(r"(?s)^```[a-zA-Z]*\s*\n(.*?)\n?```$").unwrap();
}

/// Drops `<think>` blocks and a surrounding Markdown code fence.
pub fn clean_ai_output(text: &str) -> String {
    let without_think = RE_THINK_TAGS.replace_all(text, "");
    let trimmed = without_think.trim();
    match RE_CODE_FENCE.captures(trimmed) {
        Some(caps) => caps[1].trim().to_string(),
        None => trimmed.to_string(),
    }
}

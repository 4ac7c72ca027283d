//! AI assistant backed by the Gemini `generateContent` API.
//!
//! Every public call degrades to offline content instead of failing: no API
//! key, a transport error, a non-success status or an empty answer all
//! produce a deterministic fallback (prefixed `(离线模式) ` for questions).

use std::time::Duration;

use rand::seq::SliceRandom;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::AiConfig;
use crate::error::{Error, Result};

pub const OFFLINE_PREFIX: &str = "(离线模式) ";
pub const EMPTY_QUESTION_FALLBACK: &str = "请检查该阶段的关键规范要求是否满足。";
pub const EMPTY_REVIEW_FALLBACK: &str = "无法分析输入，请重试。";
pub const CHAT_EMPTY_REPLY: &str = "No response.";
pub const CHAT_ERROR_REPLY: &str = "Error connecting to AI.";

const CHAT_SYSTEM_INSTRUCTION: &str = "You are a helpful and expert HVAC assistant.";

pub const OFFLINE_DESIGN_CHECKLIST: &str = "\
[离线模式 - 规范自查清单]
由于无法连接 AI 网络，请依据以下通则自查：
1. 强制性条文复核：是否违反 GB50736 及 GB50016 强条？
2. 完整性检查：平面图、系统图、大样图是否闭合一致？
3. 提资复核：是否已向电气提供准确的设备功率（含备用）？
4. 碰撞检查：主要管线标高是否与梁底、喷淋及桥架冲突？
5. 节能审查：水泵风机能效比是否满足节能规范限制？";

const DEFAULT_QUESTIONS: &[&str] = &[
    "请核对该系统的抗震支吊架间距是否符合 GB 50981 的要求？",
    "请确认设备的基础高度是否满足冷凝水排放坡度要求？",
    "请检查防火阀的安装位置是否距离墙体表面不大于 200mm？",
    "请复核机房内检修通道宽度是否满足设备更换组件的需求？",
];

/// Offline questions for a category name; unknown categories use the general set.
pub fn offline_questions(category: &str) -> &'static [&'static str] {
    match category {
        "多专业接口" => &[
            "多专业边界条件是否已与结构、电气、工艺进行交叉确认？",
            "是否确认了与其他专业的关键接口变更记录？",
        ],
        "安全与风险控制" => &[
            "关键风险工况是否已纳入通风/空调系统方案？",
            "事故通风路径是否已验证可行性？",
        ],
        "阶段成果" => &[
            "当前阶段成果文件是否包含必要的系统图和计算说明？",
            "阶段性成果是否已满足审图所需的基本完整度？",
        ],
        _ => DEFAULT_QUESTIONS,
    }
}

/// A random offline question for the category, with the offline prefix.
pub fn offline_question(category: &str) -> String {
    let pool = offline_questions(category);
    let pick = pool
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(EMPTY_QUESTION_FALLBACK);
    format!("{}{}", OFFLINE_PREFIX, pick)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    fn new(role: &str, text: &str) -> Self {
        Content {
            role: Some(role.to_string()),
            parts: vec![Part { text: text.to_string() }],
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: &'a [Content],
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate, trimmed.
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| c.parts.iter().map(|p| p.text.as_str()).collect::<String>())
            .unwrap_or_default()
            .trim()
            .to_string()
    }
}

pub struct Assistant {
    http_client: Client,
    config: AiConfig,
    api_key: Option<String>,
}

impl Assistant {
    pub fn new(config: AiConfig, api_key: Option<String>) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Assistant {
            http_client,
            config,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        })
    }

    /// Build with the key taken from the environment.
    pub fn from_config(config: &AiConfig) -> Result<Self> {
        Self::new(config.clone(), config.resolved_api_key())
    }

    pub fn is_online(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    async fn generate(&self, contents: &[Content], system: Option<&str>) -> Result<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| Error::AiUnavailable("no API key configured".to_string()))?;
        let url = format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        );
        tracing::debug!(model = %self.config.model, turns = contents.len(), "sending generateContent request");

        let request = GenerateRequest {
            contents,
            system_instruction: system.map(|s| Content {
                role: None,
                parts: vec![Part { text: s.to_string() }],
            }),
        };
        let response = self
            .http_client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Remote {
                status: status.as_u16(),
                body,
            });
        }
        let parsed: GenerateResponse = response.json().await?;
        Ok(parsed.text())
    }

    /// One short check-up question for a design phase or category.
    pub async fn workflow_question(&self, category: &str) -> String {
        let prompt = format!(
            "You are a strict and experienced Senior HVAC Engineer in China.\n\
             The user is working on the design phase: \"{}\".\n\n\
             Please generate ONE short, critical \"check-up\" question (in Chinese) to ask the designer.\n\
             The question should verify if they have considered a specific, often overlooked technical detail \
             or regulation related to this phase.\n\n\
             Return ONLY the question text in Chinese. No introductory text.",
            category
        );
        match self.generate(&[Content::new("user", &prompt)], None).await {
            Ok(text) if text.is_empty() => EMPTY_QUESTION_FALLBACK.to_string(),
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(error = %e, "AI unavailable, using offline question");
                offline_question(category)
            }
        }
    }

    /// Review a design note for compliance risks and gaps.
    pub async fn review_design_input(&self, input: &str) -> String {
        let prompt = format!(
            "You are a Senior HVAC Engineer. Review the following design note or parameter provided by a junior designer:\n\
             \"{}\"\n\n\
             Evaluate it for potential issues, compliance risks (Chinese GB standards), or missing information.\n\
             Reply in Chinese. Be constructive and concise.",
            input
        );
        match self.generate(&[Content::new("user", &prompt)], None).await {
            Ok(text) if text.is_empty() => EMPTY_REVIEW_FALLBACK.to_string(),
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(error = %e, "AI unavailable, using offline checklist");
                OFFLINE_DESIGN_CHECKLIST.to_string()
            }
        }
    }

    pub fn chat(&self) -> ChatSession<'_> {
        ChatSession {
            assistant: self,
            history: Vec::new(),
        }
    }
}

/// Multi-turn conversation. History is kept only for turns that got an answer.
pub struct ChatSession<'a> {
    assistant: &'a Assistant,
    history: Vec<Content>,
}

impl ChatSession<'_> {
    pub fn history(&self) -> &[Content] {
        &self.history
    }

    pub async fn send(&mut self, message: &str) -> String {
        let mut turns = self.history.clone();
        turns.push(Content::new("user", message));
        match self.assistant.generate(&turns, Some(CHAT_SYSTEM_INSTRUCTION)).await {
            Ok(text) => {
                let reply = if text.is_empty() {
                    CHAT_EMPTY_REPLY.to_string()
                } else {
                    text
                };
                turns.push(Content::new("model", &reply));
                self.history = turns;
                reply
            }
            Err(e) => {
                tracing::warn!(error = %e, "chat request failed");
                CHAT_ERROR_REPLY.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offline() -> Assistant {
        Assistant::new(AiConfig::default(), None).unwrap()
    }

    #[tokio::test]
    async fn test_question_without_key_is_offline() {
        let assistant = offline();
        assert!(!assistant.is_online());
        let q = assistant.workflow_question("多专业接口").await;
        assert!(q.starts_with(OFFLINE_PREFIX));
        let body = q.trim_start_matches(OFFLINE_PREFIX);
        assert!(offline_questions("多专业接口").contains(&body));
    }

    #[tokio::test]
    async fn test_unknown_category_uses_default_pool() {
        let q = offline().workflow_question("施工配合").await;
        let body = q.trim_start_matches(OFFLINE_PREFIX);
        assert!(DEFAULT_QUESTIONS.contains(&body));
    }

    #[tokio::test]
    async fn test_review_without_key_returns_checklist() {
        let review = offline().review_design_input("室内设计温度 26℃").await;
        assert_eq!(review, OFFLINE_DESIGN_CHECKLIST);
    }

    #[tokio::test]
    async fn test_chat_without_key_keeps_no_history() {
        let assistant = Assistant::new(AiConfig::default(), Some("  ".into())).unwrap();
        let mut chat = assistant.chat();
        assert_eq!(chat.send("hello").await, CHAT_ERROR_REPLY);
        assert!(chat.history().is_empty());
    }

    #[test]
    fn test_response_text_extraction() {
        let parsed: GenerateResponse = serde_json::from_str(
            r#"{ "candidates": [{ "content": { "role": "model", "parts": [{ "text": " 第一 " }, { "text": "部分 " }] } }] }"#,
        )
        .unwrap();
        assert_eq!(parsed.text(), "第一 部分");
        assert_eq!(GenerateResponse::default().text(), "");
    }

    #[test]
    fn test_request_shape() {
        let contents = vec![Content::new("user", "hi")];
        let request = GenerateRequest {
            contents: &contents,
            system_instruction: Some(Content { role: None, parts: vec![Part { text: "sys".into() }] }),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["contents"][0]["parts"][0]["text"], "hi");
        assert_eq!(value["systemInstruction"]["parts"][0]["text"], "sys");
        assert!(value["systemInstruction"].get("role").is_none());
    }
}

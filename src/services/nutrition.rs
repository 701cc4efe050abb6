use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::{NutritionConfig, NutritionProvider};
use crate::error::{AppError, AppResult};
use crate::services::retry::{retry_with_backoff, RetryPolicy};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutritionInfo {
    pub food_name: String,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub serving_qty: f64,
    pub serving_unit: String,
    pub serving_weight_grams: f64,
}

/// Resolves a free-text food description to nutrition facts.
#[async_trait]
pub trait NutritionLookup: Send + Sync + 'static {
    async fn lookup(&self, query: &str) -> AppResult<NutritionInfo>;
}

pub fn from_config(cfg: &NutritionConfig) -> AppResult<Arc<dyn NutritionLookup>> {
    match cfg.provider {
        NutritionProvider::Mock => {
            tracing::info!("Using mock nutrition provider");
            Ok(Arc::new(MockNutrition))
        }
        NutritionProvider::OpenAi => {
            tracing::info!("Using OpenAI nutrition provider (model {})", cfg.openai_model);
            Ok(Arc::new(OpenAiNutrition::new(cfg)?))
        }
    }
}

// ============================================================================
// Mock provider
// ============================================================================

/// Canned answers for a few staple foods, generic values for anything else.
pub struct MockNutrition;

#[allow(clippy::too_many_arguments)]
fn info(
    food_name: &str,
    calories: f64,
    protein: f64,
    carbs: f64,
    fat: f64,
    serving_qty: f64,
    serving_unit: &str,
    serving_weight_grams: f64,
) -> NutritionInfo {
    NutritionInfo {
        food_name: food_name.to_string(),
        calories,
        protein,
        carbs,
        fat,
        serving_qty,
        serving_unit: serving_unit.to_string(),
        serving_weight_grams,
    }
}

fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[async_trait]
impl NutritionLookup for MockNutrition {
    async fn lookup(&self, query: &str) -> AppResult<NutritionInfo> {
        let q = query.trim().to_lowercase();

        let found = if q.contains("rice") {
            info("Cooked White Rice", 130.0, 2.7, 28.0, 0.3, 1.0, "cup", 158.0)
        } else if q.contains("chicken") {
            info("Grilled Chicken Breast", 165.0, 31.0, 0.0, 3.6, 100.0, "grams", 100.0)
        } else if q.contains("apple") {
            info("Apple", 95.0, 0.5, 25.0, 0.3, 1.0, "medium apple", 182.0)
        } else if q.contains("banana") {
            info("Banana", 105.0, 1.3, 27.0, 0.4, 1.0, "medium banana", 118.0)
        } else if q.contains("egg") {
            info("Large Egg", 70.0, 6.0, 0.6, 5.0, 1.0, "large egg", 50.0)
        } else if q.contains("bread") {
            info("White Bread", 80.0, 2.3, 15.0, 1.0, 1.0, "slice", 28.0)
        } else {
            info(&title_case(&q), 100.0, 5.0, 15.0, 3.0, 1.0, "serving", 100.0)
        };

        Ok(found)
    }
}

// ============================================================================
// OpenAI provider
// ============================================================================

const SYSTEM_PROMPT: &str = "You are a helpful nutrition assistant that returns a single JSON object.";

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

pub struct OpenAiNutrition {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    retry: RetryPolicy,
}

impl OpenAiNutrition {
    pub fn new(cfg: &NutritionConfig) -> AppResult<Self> {
        let api_key = cfg
            .openai_api_key
            .clone()
            .ok_or_else(|| AppError::ServiceUnavailable("OpenAI API key is not configured".into()))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            api_key,
            model: cfg.openai_model.clone(),
            base_url: cfg.openai_base_url.trim_end_matches('/').to_string(),
            retry: RetryPolicy {
                max_attempts: cfg.max_attempts,
                initial_backoff: Duration::from_millis(cfg.initial_backoff_ms),
            },
        })
    }

    fn prompt(query: &str) -> String {
        format!(
            r#"Provide detailed nutrition info in JSON format with these fields:
{{
  "food_name": string,
  "calories": float,
  "protein": float,
  "carbs": float,
  "fat": float,
  "serving_qty": float,
  "serving_unit": string,
  "serving_weight_grams": float
}}
Return only the JSON object. For this food description: "{}""#,
            query
        )
    }

    async fn complete_once(&self, query: &str) -> AppResult<String> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: Self::prompt(query),
                },
            ],
            temperature: 0.2,
        };

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS
                || text.to_lowercase().contains("quota")
            {
                return Err(AppError::RateLimited);
            }
            return Err(AppError::NutritionApi(format!(
                "OpenAI returned {}: {}",
                status, text
            )));
        }

        let parsed: ChatResponse = resp.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .ok_or_else(|| AppError::NutritionApi("No response from OpenAI".to_string()))
    }
}

/// First `{` through last `}` of the reply; tolerates code fences and chatter.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

#[async_trait]
impl NutritionLookup for OpenAiNutrition {
    async fn lookup(&self, query: &str) -> AppResult<NutritionInfo> {
        let reply = retry_with_backoff(
            self.retry,
            "OpenAI nutrition lookup",
            |e| matches!(e, AppError::RateLimited),
            move || self.complete_once(query),
        )
        .await
        .map_err(|e| match e {
            AppError::RateLimited => AppError::ServiceUnavailable(
                "Nutrition provider rate limit or quota exceeded".to_string(),
            ),
            other => other,
        })?;

        tracing::debug!("Raw OpenAI reply: {}", reply);

        let json = extract_json_object(&reply).ok_or_else(|| {
            AppError::NutritionApi("Invalid OpenAI response format: no JSON object found".into())
        })?;

        serde_json::from_str(json).map_err(|e| {
            tracing::warn!("Failed to parse nutrition JSON ({}): {}", e, json);
            AppError::NutritionApi("Failed to parse nutrition JSON from OpenAI response".into())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    use axum::{extract::State, http::StatusCode, routing::post, Json, Router};

    #[tokio::test]
    async fn mock_matches_keywords() {
        let m = MockNutrition;
        assert_eq!(m.lookup("Fried RICE").await.unwrap().food_name, "Cooked White Rice");
        assert_eq!(m.lookup("two eggs").await.unwrap().calories, 70.0);

        let other = m.lookup("  greek yogurt ").await.unwrap();
        assert_eq!(other.food_name, "Greek Yogurt");
        assert_eq!(other.serving_unit, "serving");
    }

    #[test]
    fn extracts_json_from_fenced_reply() {
        let reply = "Sure!\n```json\n{\"a\": {\"b\": 1}}\n```";
        assert_eq!(extract_json_object(reply), Some("{\"a\": {\"b\": 1}}"));
        assert_eq!(extract_json_object("no json here"), None);
        assert_eq!(extract_json_object("} backwards {"), None);
    }

    async fn fake_openai(failures: u32) -> (String, Arc<AtomicU32>) {
        let hits = Arc::new(AtomicU32::new(0));

        async fn handler(
            State((hits, failures)): State<(Arc<AtomicU32>, u32)>,
        ) -> (StatusCode, Json<serde_json::Value>) {
            if hits.fetch_add(1, Ordering::SeqCst) < failures {
                return (
                    StatusCode::TOO_MANY_REQUESTS,
                    Json(serde_json::json!({"error": {"message": "slow down"}})),
                );
            }
            let content = "```json\n{\"food_name\":\"Oats\",\"calories\":150,\"protein\":5,\
                           \"carbs\":27,\"fat\":3,\"serving_qty\":1,\"serving_unit\":\"cup\",\
                           \"serving_weight_grams\":40}\n```";
            (
                StatusCode::OK,
                Json(serde_json::json!({
                    "choices": [{"message": {"role": "assistant", "content": content}}]
                })),
            )
        }

        let app = Router::new()
            .route("/v1/chat/completions", post(handler))
            .with_state((hits.clone(), failures));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{}/v1", addr), hits)
    }

    fn provider(base_url: String) -> OpenAiNutrition {
        OpenAiNutrition::new(&NutritionConfig {
            provider: NutritionProvider::OpenAi,
            openai_api_key: Some("sk-test".to_string()),
            openai_model: "gpt-test".to_string(),
            openai_base_url: base_url,
            timeout_seconds: 5,
            max_attempts: 3,
            initial_backoff_ms: 1,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn openai_retries_rate_limits() {
        let (url, hits) = fake_openai(2).await;
        let found = provider(url).lookup("oatmeal").await.unwrap();

        assert_eq!(found.food_name, "Oats");
        assert_eq!(found.serving_weight_grams, 40.0);
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn openai_gives_up_after_three_attempts() {
        let (url, hits) = fake_openai(10).await;
        let err = provider(url).lookup("oatmeal").await.unwrap_err();

        assert!(matches!(err, AppError::ServiceUnavailable(_)));
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }
}

use crate::config::{ApiConfig, TranslateBackendType, TranslateConfig};
use crate::translator::{TranslateRequest, TranslateResponse, TranslatorBackend};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

/// 外部翻訳APIのレスポンス形式
#[derive(Debug, Deserialize)]
struct ApiResponse {
    translated_text: String,
    #[serde(default)]
    reading_text: Option<String>,
}

/// 外部翻訳APIバックエンド
///
/// 設定されたエンドポイントにJSONをPOSTし、翻訳と読み注釈を受け取る。
pub struct ApiTranslateBackend {
    api_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl ApiTranslateBackend {
    pub fn new(config: &ApiConfig, timeout_seconds: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_seconds))
            .build()
            .context("翻訳API HTTPクライアント作成失敗")?;

        Ok(Self {
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            client,
        })
    }
}

#[async_trait]
impl TranslatorBackend for ApiTranslateBackend {
    async fn translate(&self, request: &TranslateRequest) -> Result<TranslateResponse> {
        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(request)
            .send()
            .await
            .context("翻訳API リクエスト失敗")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("翻訳API エラー: {} - {}", status, error_text);
        }

        let api_response: ApiResponse = response
            .json::<ApiResponse>()
            .await
            .context("翻訳API レスポンスパース失敗")?;

        Ok(TranslateResponse {
            translated_text: api_response.translated_text,
            reading_text: api_response.reading_text,
        })
    }

    fn name(&self) -> &'static str {
        "api"
    }
}

/// パススルーバックエンド
///
/// APIキーなしで動作確認するための開発用バックエンド。
/// 入力テキストをそのまま翻訳結果として返し、読みは提供しない。
pub struct OfflineBackend;

#[async_trait]
impl TranslatorBackend for OfflineBackend {
    async fn translate(&self, request: &TranslateRequest) -> Result<TranslateResponse> {
        log::debug!(
            "オフラインバックエンド: {} 文字をパススルー",
            request.text.chars().count()
        );
        Ok(TranslateResponse {
            translated_text: request.text.clone(),
            reading_text: None,
        })
    }

    fn name(&self) -> &'static str {
        "offline"
    }
}

/// 設定からバックエンドを選択して作成
pub fn build_backend(
    translate: &TranslateConfig,
    api: Option<&ApiConfig>,
) -> Result<Box<dyn TranslatorBackend>> {
    match translate.backend {
        TranslateBackendType::Api => {
            log::info!("翻訳バックエンド: 外部API を使用");
            let api_config = api.ok_or_else(|| anyhow::anyhow!("API設定が見つかりません"))?;
            Ok(Box::new(ApiTranslateBackend::new(
                api_config,
                translate.timeout_seconds,
            )?))
        }
        TranslateBackendType::Offline => {
            log::info!("翻訳バックエンド: オフライン（パススルー）を使用");
            Ok(Box::new(OfflineBackend))
        }
    }
}

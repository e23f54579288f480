use crate::config::TranslateConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::script::ScriptClassifier;
use crate::translator::{TranslateRequest, TranslatorBackend};
use crate::types::{ForcedLanguage, Translation};
use anyhow::Result;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

/// リクエスト処理の段階
///
/// 1リクエストは `Idle → Classifying → Validating → Calling →
/// Succeeded | Failed` と遷移する。UI層が進捗表示に使う。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    /// スクリプト判定中
    Classifying,
    /// 強制言語の検証中
    Validating,
    /// 外部翻訳サービスを呼び出し中
    Calling,
    Succeeded,
    Failed,
}

/// 翻訳リクエストの結果
#[derive(Clone, Debug)]
pub enum RequestOutcome {
    /// 完了した翻訳
    Completed(Translation),
    /// 処理中により新しいリクエストが始まったため、この応答は破棄された
    Superseded,
}

/// 表示用の共有状態
struct DisplayState {
    phase: Phase,
    /// 直近の成功結果。失敗やリトライでは上書きされない
    latest: Option<Translation>,
}

/// 翻訳オーケストレーター
///
/// スクリプト判定・強制言語の検証・外部翻訳呼び出しを1本の
/// パイプラインにまとめる。検証に失敗したテキストに対して外部呼び出しを
/// 行うことはない。
///
/// リクエストには単調増加のトークンを振り、処理中に新しいリクエストが
/// 始まった場合は古い応答を捨てる。編集して再送信した入力が、遅れて
/// 届いた古い結果で上書きされることはない。
pub struct TranslationOrchestrator {
    classifier: ScriptClassifier,
    backend: Box<dyn TranslatorBackend>,
    target_language: String,
    forced: ForcedLanguage,
    timeout: Duration,
    max_retries: u32,

    /// 最新リクエストのトークン
    token: AtomicU64,
    state: Mutex<DisplayState>,
}

impl TranslationOrchestrator {
    /// オーケストレーターを作成
    ///
    /// # Errors
    ///
    /// 設定の `forced_language` が未対応の言語コードの場合にエラーを返す。
    pub fn new(
        classifier: ScriptClassifier,
        backend: Box<dyn TranslatorBackend>,
        config: &TranslateConfig,
    ) -> Result<Self> {
        let forced = ForcedLanguage::from_code(&config.forced_language).ok_or_else(|| {
            anyhow::anyhow!("未対応の強制言語コード: {}", config.forced_language)
        })?;

        log::info!(
            "翻訳パイプラインを初期化: バックエンド={}, 翻訳先={}, 強制言語={}",
            backend.name(),
            config.target_language,
            config.forced_language
        );

        Ok(Self {
            classifier,
            backend,
            target_language: config.target_language.clone(),
            forced,
            timeout: Duration::from_secs(config.timeout_seconds),
            max_retries: config.max_retries,
            token: AtomicU64::new(0),
            state: Mutex::new(DisplayState {
                phase: Phase::Idle,
                latest: None,
            }),
        })
    }

    /// 現在の処理段階
    pub async fn phase(&self) -> Phase {
        self.state.lock().await.phase
    }

    /// 直近の成功結果
    pub async fn latest(&self) -> Option<Translation> {
        self.state.lock().await.latest.clone()
    }

    /// 現在の強制言語の制約
    pub fn forced(&self) -> ForcedLanguage {
        self.forced
    }

    /// トークンが最新のリクエストのものである場合のみ段階を更新
    async fn set_phase(&self, token: u64, phase: Phase) {
        if self.token.load(Ordering::SeqCst) == token {
            self.state.lock().await.phase = phase;
        }
    }

    /// テキストを翻訳する
    ///
    /// 再送信のたびにトークンが増え、前のリクエストの応答は破棄の対象に
    /// なる。同じ入力・同じ制約に対する判定と検証は決定的で、外部呼び出し
    /// の結果だけが変わりうる。
    ///
    /// # Errors
    ///
    /// - `LanguageMismatch`: 強制言語の検証失敗。外部呼び出しは行われない
    /// - `Provider`: 外部翻訳サービスの失敗・タイムアウト（再試行後）
    pub async fn translate(&self, text: &str) -> PipelineResult<RequestOutcome> {
        let token = self.token.fetch_add(1, Ordering::SeqCst) + 1;

        // スクリプト判定（毎回再計算し、キャッシュしない）
        self.set_phase(token, Phase::Classifying).await;
        let signature = self.classifier.classify(text);
        let detected = self.classifier.resolve_label(&signature);
        log::debug!("スクリプト判定: {} ({:?})", detected, signature);

        // 強制言語の検証。失敗したら外部呼び出しせずに終了する
        self.set_phase(token, Phase::Validating).await;
        if let ForcedLanguage::Forced(expected) = self.forced {
            if !self.classifier.validate_forced(text, self.forced) {
                log::info!("強制言語の検証に失敗: 期待={}", expected);
                self.set_phase(token, Phase::Failed).await;
                return Err(PipelineError::LanguageMismatch { expected });
            }
        }

        // 外部翻訳呼び出し
        self.set_phase(token, Phase::Calling).await;
        let request = TranslateRequest {
            text: text.to_string(),
            target_language: self.target_language.clone(),
            forced_language: match self.forced {
                ForcedLanguage::Auto => "auto".to_string(),
                ForcedLanguage::Forced(lang) => lang.as_code().to_string(),
            },
        };

        let mut last_error = String::new();
        let mut response = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                log::warn!(
                    "翻訳呼び出しを再試行します ({}/{})",
                    attempt,
                    self.max_retries
                );
                tokio::time::sleep(Duration::from_millis(200 * attempt as u64)).await;
            }

            match tokio::time::timeout(self.timeout, self.backend.translate(&request)).await {
                Ok(Ok(resp)) => {
                    response = Some(resp);
                    break;
                }
                Ok(Err(e)) => {
                    log::warn!("翻訳呼び出しに失敗: {}", e);
                    last_error = e.to_string();
                }
                Err(_) => {
                    log::warn!("翻訳呼び出しがタイムアウト ({}秒)", self.timeout.as_secs());
                    last_error = format!("タイムアウト ({}秒)", self.timeout.as_secs());
                }
            }
        }

        let Some(resp) = response else {
            self.set_phase(token, Phase::Failed).await;
            return Err(PipelineError::Provider {
                message: last_error,
            });
        };

        let romanization_missing =
            ScriptClassifier::needs_romanization(detected) && resp.reading_text.is_none();
        if romanization_missing {
            // 翻訳自体は使えるため、警告を付けて成功として扱う
            log::warn!("読みが必要な言語（{}）ですが読みが提供されませんでした", detected);
        }

        let translation = Translation {
            source_text: text.to_string(),
            translated_text: resp.translated_text,
            reading_text: resp.reading_text,
            detected,
            signature,
            romanization_missing,
        };

        // 処理中に新しいリクエストが始まっていたら、この応答は捨てる
        let mut state = self.state.lock().await;
        if self.token.load(Ordering::SeqCst) != token {
            log::debug!("古いリクエストの応答を破棄 (token {})", token);
            return Ok(RequestOutcome::Superseded);
        }

        state.phase = Phase::Succeeded;
        state.latest = Some(translation.clone());
        drop(state);

        Ok(RequestOutcome::Completed(translation))
    }
}

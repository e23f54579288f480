use crate::types::SubscriptionTier;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub translate: TranslateConfig,
    pub api: Option<ApiConfig>,
    #[serde(default)]
    pub usage: UsageConfig,
    #[serde(default)]
    pub plans: PlansConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// 翻訳バックエンドの種類
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TranslateBackendType {
    /// 外部翻訳API (HTTP)
    Api,
    /// パススルー（開発・テスト用）
    Offline,
}

/// 翻訳設定
///
/// 翻訳パイプライン全体に関する設定。
///
/// # デフォルト値
///
/// - `backend`: "offline"（APIキーなしで動作するパススルー）
/// - `target_language`: "en"（翻訳先の言語）
/// - `forced_language`: "auto"（入力言語の自動判定）
/// - `timeout_seconds`: 10 秒
/// - `max_retries`: 3 回
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TranslateConfig {
    #[serde(default = "default_backend")]
    pub backend: TranslateBackendType,
    #[serde(default = "default_target_language")]
    pub target_language: String,
    #[serde(default = "default_forced_language")]
    pub forced_language: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

/// 外部翻訳API設定
///
/// `backend = "api"` のときのみ必要。
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    /// 翻訳APIのエンドポイントURL
    pub api_url: String,
    /// APIキー
    pub api_key: String,
}

/// 使用量カウンター設定
///
/// # デフォルト値
///
/// - `window_hours`: 24 時間（OCR・フラッシュカードのローリングウィンドウ）
/// - `streak_threshold`: 3 回（スワイプ連続記録の判定しきい値）
/// - `fail_open`: true（ストレージ障害時もユーザー操作を止めない）
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UsageConfig {
    #[serde(default = "default_window_hours")]
    pub window_hours: u32,
    #[serde(default = "default_streak_threshold")]
    pub streak_threshold: u32,
    #[serde(default = "default_fail_open")]
    pub fail_open: bool,
}

/// プラン設定
///
/// 無料プランの1日あたりの上限。有料プランは実質無制限として扱われ、
/// 設定項目を持たない。上限は乱用の抑止が目的であり、通常利用を
/// 計測するためのものではない。
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlansConfig {
    #[serde(default = "default_tier")]
    pub tier: SubscriptionTier,
    #[serde(default = "default_free_ocr_per_day")]
    pub free_ocr_per_day: u32,
    #[serde(default = "default_free_flashcards_per_day")]
    pub free_flashcards_per_day: u32,
    #[serde(default = "default_streak_threshold")]
    pub swipe_streak_threshold: u32,
}

/// ストレージ設定
///
/// 使用量ウィンドウを保存するキー/バリューストアの置き場所。
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

/// 出力設定
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    #[serde(default = "default_deck_dir")]
    pub deck_dir: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// Default functions
fn default_backend() -> TranslateBackendType {
    TranslateBackendType::Offline
}

fn default_target_language() -> String {
    "en".to_string()
}

fn default_forced_language() -> String {
    "auto".to_string()
}

fn default_timeout_seconds() -> u64 {
    10
}

fn default_max_retries() -> u32 {
    3
}

fn default_window_hours() -> u32 {
    24
}

fn default_streak_threshold() -> u32 {
    3
}

fn default_fail_open() -> bool {
    true // 可用性優先。厳密な上限強制が必要なら false
}

fn default_tier() -> SubscriptionTier {
    SubscriptionTier::Free
}

fn default_free_ocr_per_day() -> u32 {
    10
}

fn default_free_flashcards_per_day() -> u32 {
    20
}

fn default_data_dir() -> String {
    "./data".to_string()
}

fn default_deck_dir() -> String {
    "./deck".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            translate: TranslateConfig::default(),
            api: None, // デフォルトではAPI設定なし
            usage: UsageConfig::default(),
            plans: PlansConfig::default(),
            storage: StorageConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl Default for TranslateConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            target_language: default_target_language(),
            forced_language: default_forced_language(),
            timeout_seconds: default_timeout_seconds(),
            max_retries: default_max_retries(),
        }
    }
}

impl Default for UsageConfig {
    fn default() -> Self {
        Self {
            window_hours: default_window_hours(),
            streak_threshold: default_streak_threshold(),
            fail_open: default_fail_open(),
        }
    }
}

impl Default for PlansConfig {
    fn default() -> Self {
        Self {
            tier: default_tier(),
            free_ocr_per_day: default_free_ocr_per_day(),
            free_flashcards_per_day: default_free_flashcards_per_day(),
            swipe_streak_threshold: default_streak_threshold(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            deck_dir: default_deck_dir(),
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// 設定ファイルから読み込み
    ///
    /// TOML形式の設定ファイルをパースしてConfig構造体を生成する。
    ///
    /// # Arguments
    ///
    /// * `path` - 設定ファイルのパス
    ///
    /// # Errors
    ///
    /// ファイルの読み込みまたはパースに失敗した場合にエラーを返す。
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use yomicard::config::Config;
    /// let config = Config::from_file("config.toml").unwrap();
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("設定ファイルの読み込みに失敗: {:?}", path.as_ref()))?;
        let config: Config =
            toml::from_str(&content).with_context(|| "設定ファイルのパースに失敗")?;
        Ok(config)
    }

    /// デフォルト設定をファイルに書き出し
    ///
    /// デフォルト値を持つ設定ファイルを生成する。
    /// 既存のファイルは上書きされる。
    ///
    /// # Arguments
    ///
    /// * `path` - 出力先のパス
    ///
    /// # Errors
    ///
    /// ファイルの書き込みに失敗した場合にエラーを返す。
    pub fn write_default<P: AsRef<Path>>(path: P) -> Result<()> {
        let config = Config::default();
        let content =
            toml::to_string_pretty(&config).with_context(|| "設定のシリアライズに失敗")?;
        fs::write(path.as_ref(), content)
            .with_context(|| format!("設定ファイルの書き込みに失敗: {:?}", path.as_ref()))?;
        Ok(())
    }

    /// 設定ファイルがあれば読み込み、なければデフォルトを使用
    ///
    /// # Arguments
    ///
    /// * `path` - 設定ファイルのパス
    ///
    /// # Errors
    ///
    /// ファイルが存在するがパースに失敗した場合にエラーを返す。
    /// ファイルが存在しない場合はエラーにならず、デフォルト設定を返す。
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            log::warn!(
                "設定ファイルが見つかりません。デフォルト設定を使用します: {:?}",
                path.as_ref()
            );
            Ok(Config::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.translate.backend, TranslateBackendType::Offline);
        assert_eq!(config.translate.target_language, "en");
        assert_eq!(config.translate.forced_language, "auto");
        assert_eq!(config.translate.timeout_seconds, 10);
        assert_eq!(config.usage.window_hours, 24);
        assert_eq!(config.usage.streak_threshold, 3);
        assert!(config.usage.fail_open);
        assert_eq!(config.plans.tier, SubscriptionTier::Free);
        assert_eq!(config.plans.free_ocr_per_day, 10);
        assert_eq!(config.plans.free_flashcards_per_day, 20);
        assert!(config.api.is_none());
    }

    #[test]
    fn test_write_and_read_config() {
        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path();

        // デフォルト設定を書き込み
        Config::write_default(path).unwrap();

        // 読み込み
        let config = Config::from_file(path).unwrap();
        assert_eq!(config.translate.backend, TranslateBackendType::Offline);
        assert_eq!(config.usage.window_hours, 24);
        assert_eq!(config.plans.free_flashcards_per_day, 20);
    }

    #[test]
    fn test_custom_config() {
        let toml_content = r#"
[translate]
backend = "api"
target_language = "ja"
forced_language = "ko"
timeout_seconds = 30
max_retries = 5

[api]
api_url = "https://translate.example.com/v1/translate"
api_key = "test-key"

[usage]
window_hours = 12
streak_threshold = 5
fail_open = false

[plans]
tier = "premium"
free_ocr_per_day = 3
free_flashcards_per_day = 5
swipe_streak_threshold = 5

[storage]
data_dir = "/tmp/yomicard-data"

[output]
deck_dir = "/tmp/yomicard-deck"
log_level = "debug"
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = Config::from_file(temp_file.path()).unwrap();

        assert_eq!(config.translate.backend, TranslateBackendType::Api);
        assert_eq!(config.translate.target_language, "ja");
        assert_eq!(config.translate.forced_language, "ko");
        assert_eq!(config.translate.timeout_seconds, 30);
        assert_eq!(config.translate.max_retries, 5);

        let api = config.api.unwrap();
        assert_eq!(api.api_url, "https://translate.example.com/v1/translate");
        assert_eq!(api.api_key, "test-key");

        assert_eq!(config.usage.window_hours, 12);
        assert_eq!(config.usage.streak_threshold, 5);
        assert!(!config.usage.fail_open);

        assert_eq!(config.plans.tier, SubscriptionTier::Premium);
        assert_eq!(config.plans.free_ocr_per_day, 3);
        assert_eq!(config.plans.free_flashcards_per_day, 5);

        assert_eq!(config.storage.data_dir, "/tmp/yomicard-data");
        assert_eq!(config.output.deck_dir, "/tmp/yomicard-deck");
        assert_eq!(config.output.log_level, "debug");
    }

    #[test]
    fn test_load_or_default_nonexistent() {
        let config = Config::load_or_default("nonexistent_file.toml").unwrap();
        // デフォルト設定が返されることを確認
        assert_eq!(config.usage.window_hours, 24);
    }

    #[test]
    fn test_partial_config() {
        // 一部の設定のみ記述した場合、残りはデフォルト値が使われる
        let toml_content = r#"
[translate]
target_language = "de"

[usage]
fail_open = false
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = Config::from_file(temp_file.path()).unwrap();

        // 指定した値
        assert_eq!(config.translate.target_language, "de");
        assert!(!config.usage.fail_open);

        // デフォルト値
        assert_eq!(config.translate.backend, TranslateBackendType::Offline);
        assert_eq!(config.translate.forced_language, "auto");
        assert_eq!(config.usage.window_hours, 24);
        assert_eq!(config.plans.free_ocr_per_day, 10);
    }
}

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// 翻訳リクエスト
///
/// 外部翻訳サービスに渡す内容。`forced_language` は `"auto"` または
/// 言語コードで、サービス側の言語判定のヒントとして渡す。
#[derive(Clone, Debug, Serialize)]
pub struct TranslateRequest {
    /// 翻訳対象のテキスト
    pub text: String,
    /// 翻訳先の言語コード
    pub target_language: String,
    /// 強制言語（"auto" で自動判定）
    pub forced_language: String,
}

/// 翻訳レスポンス
///
/// `reading_text` は本文に読み注釈を付けたテキストで、
/// 言語によっては提供されないことがある。
#[derive(Clone, Debug, Deserialize)]
pub struct TranslateResponse {
    /// 翻訳されたテキスト
    pub translated_text: String,
    /// 読み注釈付きテキスト（省略されることがある）
    pub reading_text: Option<String>,
}

/// 翻訳バックエンドの共通トレイト
///
/// 外部翻訳・ローマ字化サービスとの境界。実際の機械翻訳の計算は
/// このトレイトの向こう側にあり、このクレートの関心ではない。
#[async_trait]
pub trait TranslatorBackend: Send + Sync {
    /// テキストを翻訳し、可能なら読み注釈も取得する
    async fn translate(&self, request: &TranslateRequest) -> Result<TranslateResponse>;

    /// バックエンドの表示名（ログ用）
    fn name(&self) -> &'static str;
}

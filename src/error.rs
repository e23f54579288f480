use crate::types::Language;
use thiserror::Error;

/// パイプラインのエラー分類
///
/// 判定・解析関数 (`script`, `ruby`) は全域関数でありエラーを返さない。
/// エラーが発生するのはI/O境界（外部翻訳呼び出しとストレージ）のみ。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// 強制言語の検証に失敗（ユーザー向け・入力修正で再試行可能）
    #[error("入力テキストが指定言語（{expected}）として認識できません")]
    LanguageMismatch {
        /// ユーザーが指定していた言語
        expected: Language,
    },

    /// 外部翻訳サービスに到達できない、またはエラー応答（再試行可能）
    #[error("翻訳サービスエラー: {message}")]
    Provider { message: String },

    /// ルビ注釈の形式不正（診断専用・描画は継続する）
    #[error("ルビ注釈の形式が不正です: {detail}")]
    MalformedAnnotation { detail: String },

    /// 使用量ストレージにアクセスできない（既定ではフェイルオープン）
    #[error("使用量ストレージにアクセスできません: {message}")]
    StorageUnavailable { message: String },
}

impl PipelineError {
    /// 再試行で解消しうるエラーか
    pub fn is_retryable(&self) -> bool {
        match self {
            PipelineError::LanguageMismatch { .. } => true, // 入力の修正で再試行
            PipelineError::Provider { .. } => true,
            PipelineError::MalformedAnnotation { .. } => false,
            PipelineError::StorageUnavailable { .. } => true,
        }
    }

    /// ユーザーに操作可能なメッセージとして提示すべきエラーか
    ///
    /// `MalformedAnnotation` と `StorageUnavailable` はログのみで、
    /// ユーザー操作を妨げない。
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            PipelineError::LanguageMismatch { .. } | PipelineError::Provider { .. }
        )
    }
}

/// パイプライン用の結果型エイリアス
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_facing_classification() {
        let mismatch = PipelineError::LanguageMismatch {
            expected: Language::Japanese,
        };
        let provider = PipelineError::Provider {
            message: "timeout".to_string(),
        };
        let annotation = PipelineError::MalformedAnnotation {
            detail: "空の読み".to_string(),
        };
        let storage = PipelineError::StorageUnavailable {
            message: "disk full".to_string(),
        };

        assert!(mismatch.is_user_facing());
        assert!(provider.is_user_facing());
        assert!(!annotation.is_user_facing());
        assert!(!storage.is_user_facing());
    }

    #[test]
    fn test_retryable_classification() {
        assert!(PipelineError::Provider {
            message: "接続失敗".to_string()
        }
        .is_retryable());
        assert!(!PipelineError::MalformedAnnotation {
            detail: "閉じ括弧なし".to_string()
        }
        .is_retryable());
    }

    #[test]
    fn test_mismatch_message_names_expected_language() {
        let err = PipelineError::LanguageMismatch {
            expected: Language::Japanese,
        };
        assert!(err.to_string().contains("日本語"));
    }
}

//! yomicard - 外国語テキストのフラッシュカード作成パイプライン
//!
//! このクレートは、撮影または入力された外国語テキストを判定・翻訳し、
//! ルビ（ふりがな）注釈を分解してフラッシュカードとして保存するための
//! コアパイプラインを提供します。使用量はサブスクリプションのプランに
//! 応じてローリングウィンドウのカウンターで制限されます。
//!
//! # 主な機能
//!
//! - **スクリプト判定**: Unicodeブロックに基づく文字体系の検出と、
//!   強制言語の検証
//! - **ルビ解析**: `漢字(かんじ)` 形式の注釈テキストを本文と読みの
//!   セグメント列に分解
//! - **翻訳オーケストレーション**: 外部翻訳サービスの呼び出し、
//!   タイムアウト・再試行・古い応答の破棄
//! - **使用量計測**: 種別ごとの永続カウンター、重複排除、連続記録、
//!   プランごとの上限判定
//!
//! # アーキテクチャ
//!
//! ```text
//! [入力テキスト] → [ScriptClassifier] → [TranslationOrchestrator]
//!                       │                        │
//!                  (強制言語の検証)        [TranslatorBackend]
//!                                                │
//!                                          [RubyTextParser]
//!                                                │
//!                                          [Flashcard] → [DeckWriter]
//!                                                │
//!                            [SubscriptionGate] ─┴─ [UsageCounter] → [KeyValueStore]
//! ```
//!
//! # 使用例
//!
//! ```no_run
//! use yomicard::config::Config;
//!
//! // 設定ファイルを読み込み
//! let config = Config::load_or_default("config.toml").unwrap();
//!
//! // またはデフォルト設定を生成
//! Config::write_default("config.toml").unwrap();
//! ```

pub mod config;
pub mod deck;
pub mod error;
pub mod gate;
pub mod orchestrator;
pub mod ruby;
pub mod script;
pub mod storage;
pub mod translate_api;
pub mod translator;
pub mod types;
pub mod usage;

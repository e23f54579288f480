use anyhow::{Context, Result};
use env_logger::Env;
use std::io::Read;
use std::sync::Arc;
use yomicard::config::Config;
use yomicard::deck::DeckWriter;
use yomicard::gate::{FixedTier, PlanTable, SubscriptionGate, SubscriptionState};
use yomicard::orchestrator::{RequestOutcome, TranslationOrchestrator};
use yomicard::ruby;
use yomicard::script::ScriptClassifier;
use yomicard::storage::JsonFileStore;
use yomicard::translate_api::build_backend;
use yomicard::types::{AnnotatedWord, CounterKind, Flashcard};

#[tokio::main]
async fn main() -> Result<()> {
    // ロガーを初期化
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    // コマンドライン引数をパース
    let args: Vec<String> = std::env::args().collect();

    // 設定ファイル生成モード
    if args.len() > 1 && args[1] == "--generate-config" {
        let config_path = if args.len() > 2 {
            &args[2]
        } else {
            "config.toml"
        };
        Config::write_default(config_path)?;
        println!("設定ファイルを生成しました: {}", config_path);
        return Ok(());
    }

    // スワイプ記録モード
    if args.len() > 1 && (args[1] == "--swipe-right" || args[1] == "--swipe-left") {
        let kind = if args[1] == "--swipe-right" {
            CounterKind::SwipeRight
        } else {
            CounterKind::SwipeLeft
        };
        let card_id = args.get(2).map(String::as_str);
        return record_swipe(kind, card_id).await;
    }

    // 設定ファイルのパス
    let config_path = if args.len() > 1 && !args[1].starts_with("--") {
        &args[1]
    } else {
        "config.toml"
    };

    // 設定を読み込み
    let config = Config::load_or_default(config_path)?;

    log::info!("yomicard を起動します");
    log::debug!("設定: {:?}", config);

    // 標準入力からテキストを読み込み
    let mut text = String::new();
    std::io::stdin()
        .read_to_string(&mut text)
        .context("標準入力の読み込みに失敗")?;
    let text = text.trim();
    if text.is_empty() {
        anyhow::bail!("入力テキストが空です");
    }

    // 使用量ゲートを構築
    let store = Arc::new(JsonFileStore::new(&config.storage.data_dir)?);
    let gate = SubscriptionGate::new(
        PlanTable::from_config(&config.plans),
        &config.usage,
        store,
    );

    // サブスクリプション状態は外部が所有し、ここでは問い合わせるだけ
    let subscription: Box<dyn SubscriptionState> = Box::new(FixedTier(config.plans.tier));
    let tier = subscription.current_tier();

    // 上限に達していればカードは作成できない
    if !gate.can_perform(CounterKind::Flashcard, tier).await? {
        anyhow::bail!(
            "フラッシュカードの1日あたりの上限に達しました（残り0枚）。明日また試すか、プランをアップグレードしてください"
        );
    }

    // 翻訳パイプラインを構築して実行
    let backend = build_backend(&config.translate, config.api.as_ref())?;
    let orchestrator =
        TranslationOrchestrator::new(ScriptClassifier::new(), backend, &config.translate)?;

    let translation = match orchestrator.translate(text).await? {
        RequestOutcome::Completed(translation) => translation,
        RequestOutcome::Superseded => {
            // 単発実行では発生しない
            log::warn!("翻訳結果が破棄されました");
            return Ok(());
        }
    };

    log::info!(
        "判定言語: {}, 翻訳完了 ({} 文字)",
        translation.detected,
        translation.translated_text.chars().count()
    );
    if translation.romanization_missing {
        log::warn!("読み注釈なしで保存します");
    }

    // 読み注釈を分解してカードを作成
    let words = match &translation.reading_text {
        Some(reading_text) => ruby::parse(reading_text),
        None => vec![AnnotatedWord::plain(&translation.source_text)],
    };
    let card = Flashcard::new(&translation, words);

    // 保存を計上（同じテキストの再保存は重複排除される）
    gate.record(CounterKind::Flashcard, Some(&card.id)).await?;

    // デッキに追記し、カードをJSONとして出力
    let mut deck = DeckWriter::new(&config.output.deck_dir)?;
    deck.append(&card)?;
    if let Ok(json) = serde_json::to_string(&card) {
        println!("{}", json);
    }

    let remaining = gate.remaining_today(CounterKind::Flashcard, tier).await?;
    log::info!("本日の残りフラッシュカード作成可能数: {}", remaining);

    Ok(())
}

/// 復習スワイプを記録
async fn record_swipe(kind: CounterKind, card_id: Option<&str>) -> Result<()> {
    let config = Config::load_or_default("config.toml")?;

    let store = Arc::new(JsonFileStore::new(&config.storage.data_dir)?);
    let gate = SubscriptionGate::new(
        PlanTable::from_config(&config.plans),
        &config.usage,
        store,
    );

    let count = gate.record(kind, card_id).await?;
    log::info!("{} を記録しました（本日 {} 回目）", kind.as_str(), count);

    if gate.swipe_streak().await? {
        println!("連続記録達成！今日も頑張りましょう");
    }

    Ok(())
}

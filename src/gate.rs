use crate::config::{PlansConfig, UsageConfig};
use crate::error::PipelineResult;
use crate::storage::KeyValueStore;
use crate::types::{CounterKind, SubscriptionTier};
use crate::usage::UsageCounter;
use std::sync::Arc;

/// プランごとの上限
///
/// 無料プランの上限は乱用の抑止を目的とした1日あたりの固定値。
/// 有料プランは「無制限」の番兵値ではなく `u32::MAX` を持つため、
/// `remaining()` などの計算が常に定義される。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TierLimits {
    /// OCRスキャンの上限
    pub ocr_ceiling: u32,
    /// フラッシュカード作成の上限
    pub flashcard_ceiling: u32,
    /// スワイプ連続記録の判定しきい値
    pub swipe_streak_threshold: u32,
}

impl TierLimits {
    /// カウンター種別ごとの上限
    ///
    /// スワイプは計測（連続記録）のみで上限は設けない。
    pub fn ceiling(&self, kind: CounterKind) -> u32 {
        match kind {
            CounterKind::Ocr => self.ocr_ceiling,
            CounterKind::Flashcard => self.flashcard_ceiling,
            CounterKind::SwipeRight | CounterKind::SwipeLeft => u32::MAX,
        }
    }
}

/// プランテーブル
///
/// 設定から構築されるイミュータブルな共有テーブル。
/// モジュールレベルのシングルトンにはせず、必要な箇所へ渡す。
#[derive(Clone, Copy, Debug)]
pub struct PlanTable {
    free: TierLimits,
    premium: TierLimits,
}

impl PlanTable {
    pub fn from_config(config: &PlansConfig) -> Self {
        Self {
            free: TierLimits {
                ocr_ceiling: config.free_ocr_per_day,
                flashcard_ceiling: config.free_flashcards_per_day,
                swipe_streak_threshold: config.swipe_streak_threshold,
            },
            premium: TierLimits {
                ocr_ceiling: u32::MAX,
                flashcard_ceiling: u32::MAX,
                swipe_streak_threshold: config.swipe_streak_threshold,
            },
        }
    }

    pub fn limits(&self, tier: SubscriptionTier) -> &TierLimits {
        match tier {
            SubscriptionTier::Free => &self.free,
            SubscriptionTier::Premium => &self.premium,
        }
    }
}

/// サブスクリプション状態の提供元
///
/// 現在のプランは外部（課金SDKなど）が所有し、ゲートは問い合わせる
/// だけで保持しない。
pub trait SubscriptionState: Send + Sync {
    fn current_tier(&self) -> SubscriptionTier;
}

/// 固定プランの提供元（設定ファイル・テスト用）
pub struct FixedTier(pub SubscriptionTier);

impl SubscriptionState for FixedTier {
    fn current_tier(&self) -> SubscriptionTier {
        self.0
    }
}

/// 使用量ゲート
///
/// プランテーブルと種別ごとの使用量カウンターを束ね、
/// 「この操作をまだ実行できるか」という問いに答える。
///
/// カウンターは種別ごとに1つ持ち、同一種別のインクリメントは
/// カウンター内部で直列化される。
pub struct SubscriptionGate {
    plans: PlanTable,
    ocr: UsageCounter,
    flashcard: UsageCounter,
    swipe_right: UsageCounter,
    swipe_left: UsageCounter,
}

impl SubscriptionGate {
    pub fn new(plans: PlanTable, usage: &UsageConfig, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            plans,
            ocr: UsageCounter::new(CounterKind::Ocr, usage, store.clone()),
            flashcard: UsageCounter::new(CounterKind::Flashcard, usage, store.clone()),
            swipe_right: UsageCounter::new(CounterKind::SwipeRight, usage, store.clone()),
            swipe_left: UsageCounter::new(CounterKind::SwipeLeft, usage, store),
        }
    }

    /// 種別に対応するカウンター
    pub fn counter(&self, kind: CounterKind) -> &UsageCounter {
        match kind {
            CounterKind::Ocr => &self.ocr,
            CounterKind::Flashcard => &self.flashcard,
            CounterKind::SwipeRight => &self.swipe_right,
            CounterKind::SwipeLeft => &self.swipe_left,
        }
    }

    pub fn plans(&self) -> &PlanTable {
        &self.plans
    }

    /// 操作がまだ上限に達していないか
    pub async fn can_perform(
        &self,
        kind: CounterKind,
        tier: SubscriptionTier,
    ) -> PipelineResult<bool> {
        let ceiling = self.plans.limits(tier).ceiling(kind);
        let count = self.counter(kind).count().await?;
        Ok(count < ceiling)
    }

    /// 今日の残り回数
    pub async fn remaining_today(
        &self,
        kind: CounterKind,
        tier: SubscriptionTier,
    ) -> PipelineResult<u32> {
        let ceiling = self.plans.limits(tier).ceiling(kind);
        self.counter(kind).remaining(ceiling).await
    }

    /// 操作を1回計上し、新しいカウントを返す
    pub async fn record(&self, kind: CounterKind, dedup_id: Option<&str>) -> PipelineResult<u32> {
        self.counter(kind).increment(dedup_id).await
    }

    /// 右スワイプの連続記録に到達しているか
    pub async fn swipe_streak(&self) -> PipelineResult<bool> {
        self.swipe_right.streak().await
    }
}

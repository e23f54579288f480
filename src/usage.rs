use crate::config::UsageConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::storage::KeyValueStore;
use crate::types::CounterKind;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;

/// 使用量ウィンドウ
///
/// (カウンター種別, ユーザー) ごとに1つ存在する計測期間の状態。
/// 初回インクリメントで作成され、期間満了で新しいウィンドウに
/// 巻き戻される。変更のたびにJSONとして永続化される。
///
/// `streak_reached` はウィンドウ内で一度しきい値に達したら立ったままに
/// なるフラグで、カウントから再導出はしない。
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct UsageWindow {
    /// ウィンドウ内のカウント
    #[serde(default)]
    pub count: u32,

    /// ウィンドウ開始時刻（UNIXエポック秒）
    pub window_start: i64,

    /// 同一ウィンドウ内で計上済みの重複排除キー
    #[serde(default)]
    pub dedup_keys: Vec<String>,

    /// ウィンドウ内で連続記録しきい値に達したか
    #[serde(default)]
    pub streak_reached: bool,
}

impl UsageWindow {
    /// 空のウィンドウを作成
    pub fn fresh(now: i64) -> Self {
        Self {
            count: 0,
            window_start: now,
            dedup_keys: Vec::new(),
            streak_reached: false,
        }
    }
}

/// ウィンドウの巻き戻し方式
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WindowPolicy {
    /// ウィンドウ開始から固定時間が経過したら巻き戻す
    Rolling {
        /// ウィンドウの長さ（時間）
        hours: u32,
    },

    /// 端末ローカルの暦日が変わったら巻き戻す
    ///
    /// UTCではなくローカルの日付で判定する。UTC基準だと深夜以外の
    /// 時間帯にリセットされてしまう地域があるため。
    CalendarDay,
}

impl WindowPolicy {
    /// カウンター種別ごとの方式
    ///
    /// OCRとフラッシュカードはローリング、スワイプは暦日リセット。
    pub fn for_kind(kind: CounterKind, window_hours: u32) -> Self {
        match kind {
            CounterKind::Ocr | CounterKind::Flashcard => WindowPolicy::Rolling {
                hours: window_hours,
            },
            CounterKind::SwipeRight | CounterKind::SwipeLeft => WindowPolicy::CalendarDay,
        }
    }

    /// ウィンドウが満了しているか
    pub fn expired(&self, window_start: i64, now: DateTime<Local>) -> bool {
        match self {
            WindowPolicy::Rolling { hours } => {
                now.timestamp() - window_start >= (*hours as i64) * 3600
            }
            WindowPolicy::CalendarDay => match DateTime::from_timestamp(window_start, 0) {
                Some(start) => start.with_timezone(&Local).date_naive() != now.date_naive(),
                // 不正な開始時刻は満了扱いにして巻き戻す
                None => true,
            },
        }
    }
}

/// 使用量カウンター
///
/// キー/バリューストアに永続化されるローリングウィンドウのカウンター。
/// 同じカウンターへのインクリメントは内部のロックで直列化され、
/// 連打（永続化が終わる前の2回目のスワイプなど）でも更新が失われない。
///
/// ストレージ障害時の動作は `fail_open` で切り替える:
///
/// - `true`（既定）: 読み書きの失敗はログに記録し、状態なしとして
///   処理を続行する。可用性を優先し、厳密な計数は保証しない。
/// - `false`: `StorageUnavailable` を返して操作を失敗させる。
pub struct UsageCounter {
    kind: CounterKind,
    policy: WindowPolicy,
    streak_threshold: u32,
    fail_open: bool,
    store: Arc<dyn KeyValueStore>,

    /// read-modify-write を1つの論理ステップに直列化するロック
    update_lock: Mutex<()>,
}

impl UsageCounter {
    pub fn new(kind: CounterKind, config: &UsageConfig, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            kind,
            policy: WindowPolicy::for_kind(kind, config.window_hours),
            streak_threshold: config.streak_threshold,
            fail_open: config.fail_open,
            store,
            update_lock: Mutex::new(()),
        }
    }

    pub fn kind(&self) -> CounterKind {
        self.kind
    }

    /// 現在のウィンドウを読み込む
    ///
    /// 保存された状態がない、または壊れている場合は空のウィンドウを
    /// 返す。ストレージ障害はフェイルオープン設定に従う。
    async fn load(&self, now: DateTime<Local>) -> PipelineResult<UsageWindow> {
        let key = self.kind.storage_key();
        match self.store.get(&key).await {
            Ok(Some(json)) => match serde_json::from_str(&json) {
                Ok(window) => Ok(window),
                Err(e) => {
                    log::warn!(
                        "カウンター {} の保存状態を解析できません（新規扱い）: {}",
                        self.kind.as_str(),
                        e
                    );
                    Ok(UsageWindow::fresh(now.timestamp()))
                }
            },
            Ok(None) => Ok(UsageWindow::fresh(now.timestamp())),
            Err(e) => {
                if self.fail_open {
                    log::warn!(
                        "カウンター {} の読み込みに失敗（フェイルオープンで続行）: {}",
                        self.kind.as_str(),
                        e
                    );
                    Ok(UsageWindow::fresh(now.timestamp()))
                } else {
                    Err(PipelineError::StorageUnavailable {
                        message: e.to_string(),
                    })
                }
            }
        }
    }

    /// ウィンドウを永続化する
    async fn persist(&self, window: &UsageWindow) -> PipelineResult<()> {
        let key = self.kind.storage_key();
        let json = serde_json::to_string(window).map_err(|e| {
            PipelineError::StorageUnavailable {
                message: e.to_string(),
            }
        })?;

        match self.store.set(&key, &json).await {
            Ok(()) => Ok(()),
            Err(e) => {
                if self.fail_open {
                    log::warn!(
                        "カウンター {} の保存に失敗（フェイルオープンで続行）: {}",
                        self.kind.as_str(),
                        e
                    );
                    Ok(())
                } else {
                    Err(PipelineError::StorageUnavailable {
                        message: e.to_string(),
                    })
                }
            }
        }
    }

    /// カウントを1増やし、新しいカウントを返す
    ///
    /// ウィンドウが満了していれば巻き戻してから計上する。
    /// `dedup_id` が同一ウィンドウ内で計上済みならカウントは増えず、
    /// 現在値をそのまま返す（同じカードの再保存は1回と数える）。
    pub async fn increment(&self, dedup_id: Option<&str>) -> PipelineResult<u32> {
        let _guard = self.update_lock.lock().await;
        let now = Local::now();

        let mut window = self.load(now).await?;
        if self.policy.expired(window.window_start, now) {
            log::debug!("カウンター {} のウィンドウを巻き戻し", self.kind.as_str());
            window = UsageWindow::fresh(now.timestamp());
        }

        if let Some(id) = dedup_id {
            if window.dedup_keys.iter().any(|k| k == id) {
                log::debug!(
                    "カウンター {}: {} は計上済み（カウント {}）",
                    self.kind.as_str(),
                    id,
                    window.count
                );
                return Ok(window.count);
            }
            window.dedup_keys.push(id.to_string());
        }

        window.count += 1;
        if window.count >= self.streak_threshold {
            window.streak_reached = true;
        }

        self.persist(&window).await?;
        Ok(window.count)
    }

    /// 現在のウィンドウのカウント
    ///
    /// ウィンドウが満了していれば0を返す（巻き戻しは行わない）。
    pub async fn count(&self) -> PipelineResult<u32> {
        let now = Local::now();
        let window = self.load(now).await?;
        if self.policy.expired(window.window_start, now) {
            Ok(0)
        } else {
            Ok(window.count)
        }
    }

    /// 上限までの残り回数。`count > ceiling` でも負にはならない
    pub async fn remaining(&self, ceiling: u32) -> PipelineResult<u32> {
        Ok(ceiling.saturating_sub(self.count().await?))
    }

    /// ウィンドウ内で連続記録しきい値に達したか
    ///
    /// 一度 true になったら、そのウィンドウの間は true のまま。
    pub async fn streak(&self) -> PipelineResult<bool> {
        let now = Local::now();
        let window = self.load(now).await?;
        if self.policy.expired(window.window_start, now) {
            Ok(false)
        } else {
            Ok(window.streak_reached)
        }
    }

    /// 手動リセット
    ///
    /// カウント0・重複排除キーなしの新しいウィンドウを保存する。
    /// 管理操作専用であり、通常の巻き戻しはインクリメント時に行われる。
    pub async fn reset(&self) -> PipelineResult<()> {
        let _guard = self.update_lock.lock().await;
        let window = UsageWindow::fresh(Local::now().timestamp());
        self.persist(&window).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use anyhow::anyhow;
    use async_trait::async_trait;

    /// 常に失敗するストア（障害系のテスト用）
    struct FailingStore;

    #[async_trait]
    impl KeyValueStore for FailingStore {
        async fn get(&self, _key: &str) -> anyhow::Result<Option<String>> {
            Err(anyhow!("ストア障害"))
        }

        async fn set(&self, _key: &str, _value: &str) -> anyhow::Result<()> {
            Err(anyhow!("ストア障害"))
        }

        async fn remove(&self, _key: &str) -> anyhow::Result<()> {
            Err(anyhow!("ストア障害"))
        }
    }

    fn test_config() -> UsageConfig {
        UsageConfig {
            window_hours: 24,
            streak_threshold: 3,
            fail_open: true,
        }
    }

    fn counter(kind: CounterKind, store: Arc<dyn KeyValueStore>) -> UsageCounter {
        UsageCounter::new(kind, &test_config(), store)
    }

    /// 任意のウィンドウ状態をストアに直接書き込む
    async fn seed_window(store: &dyn KeyValueStore, kind: CounterKind, window: &UsageWindow) {
        store
            .set(&kind.storage_key(), &serde_json::to_string(window).unwrap())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_first_increment_creates_window() {
        let store = Arc::new(MemoryStore::new());
        let c = counter(CounterKind::Flashcard, store);

        assert_eq!(c.increment(None).await.unwrap(), 1);
        assert_eq!(c.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_dedup_same_id_counts_once() {
        let store = Arc::new(MemoryStore::new());
        let c = counter(CounterKind::Flashcard, store);

        assert_eq!(c.increment(Some("card1")).await.unwrap(), 1);
        // 同じIDの再計上はカウントを増やさない
        assert_eq!(c.increment(Some("card1")).await.unwrap(), 1);
        assert_eq!(c.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_distinct_ids_count_separately() {
        let store = Arc::new(MemoryStore::new());
        let c = counter(CounterKind::Flashcard, store);

        assert_eq!(c.increment(Some("card1")).await.unwrap(), 1);
        assert_eq!(c.increment(Some("card2")).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_rolling_window_resets_after_duration() {
        let store = Arc::new(MemoryStore::new());

        // 25時間前に開始したウィンドウ（24時間ローリングは満了済み）
        let stale = UsageWindow {
            count: 5,
            window_start: Local::now().timestamp() - 25 * 3600,
            dedup_keys: vec!["card1".to_string()],
            streak_reached: true,
        };
        seed_window(store.as_ref(), CounterKind::Flashcard, &stale).await;

        let c = counter(CounterKind::Flashcard, store);

        // 満了済みなのでカウントは0扱い
        assert_eq!(c.count().await.unwrap(), 0);
        assert!(!c.streak().await.unwrap());

        // インクリメントで巻き戻し、2ではなく1になる
        assert_eq!(c.increment(Some("card1")).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_window_within_duration_accumulates() {
        let store = Arc::new(MemoryStore::new());

        let recent = UsageWindow {
            count: 2,
            window_start: Local::now().timestamp() - 3600,
            dedup_keys: Vec::new(),
            streak_reached: false,
        };
        seed_window(store.as_ref(), CounterKind::Ocr, &recent).await;

        let c = counter(CounterKind::Ocr, store);
        assert_eq!(c.increment(None).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_calendar_day_window_resets_on_new_day() {
        let store = Arc::new(MemoryStore::new());

        // 2日前に開始したウィンドウ → ローカル暦日が変わっている
        let old = UsageWindow {
            count: 7,
            window_start: Local::now().timestamp() - 2 * 24 * 3600,
            dedup_keys: Vec::new(),
            streak_reached: true,
        };
        seed_window(store.as_ref(), CounterKind::SwipeRight, &old).await;

        let c = counter(CounterKind::SwipeRight, store);
        assert_eq!(c.count().await.unwrap(), 0);
        assert_eq!(c.increment(None).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_calendar_day_window_same_day_accumulates() {
        let store = Arc::new(MemoryStore::new());

        let today = UsageWindow {
            count: 4,
            window_start: Local::now().timestamp(),
            dedup_keys: Vec::new(),
            streak_reached: true,
        };
        seed_window(store.as_ref(), CounterKind::SwipeLeft, &today).await;

        let c = counter(CounterKind::SwipeLeft, store);
        assert_eq!(c.increment(None).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_streak_becomes_true_at_threshold_and_stays() {
        let store = Arc::new(MemoryStore::new());
        let c = counter(CounterKind::SwipeRight, store);

        c.increment(Some("a")).await.unwrap();
        c.increment(Some("b")).await.unwrap();
        assert!(!c.streak().await.unwrap());

        // 3回目でしきい値に到達
        c.increment(Some("c")).await.unwrap();
        assert!(c.streak().await.unwrap());

        // 4回目でも真偽は変わらない
        c.increment(Some("d")).await.unwrap();
        assert!(c.streak().await.unwrap());
    }

    #[tokio::test]
    async fn test_remaining_never_negative() {
        let store = Arc::new(MemoryStore::new());

        // カウントが上限を超えた状態でも remaining は0で止まる
        let over = UsageWindow {
            count: 10,
            window_start: Local::now().timestamp(),
            dedup_keys: Vec::new(),
            streak_reached: true,
        };
        seed_window(store.as_ref(), CounterKind::Flashcard, &over).await;

        let c = counter(CounterKind::Flashcard, store);
        assert_eq!(c.remaining(3).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_manual_reset() {
        let store = Arc::new(MemoryStore::new());
        let c = counter(CounterKind::Ocr, store);

        c.increment(Some("scan1")).await.unwrap();
        c.increment(Some("scan2")).await.unwrap();
        c.reset().await.unwrap();

        assert_eq!(c.count().await.unwrap(), 0);
        assert!(!c.streak().await.unwrap());

        // リセット後は同じIDでも再計上できる
        assert_eq!(c.increment(Some("scan1")).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_fail_open_read_failure_starts_from_zero() {
        let c = counter(CounterKind::Flashcard, Arc::new(FailingStore));

        // 読み書きとも失敗するが、操作はブロックされない
        assert_eq!(c.increment(None).await.unwrap(), 1);
        assert_eq!(c.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_fail_closed_surfaces_storage_error() {
        let config = UsageConfig {
            window_hours: 24,
            streak_threshold: 3,
            fail_open: false,
        };
        let c = UsageCounter::new(CounterKind::Flashcard, &config, Arc::new(FailingStore));

        let err = c.increment(None).await.unwrap_err();
        assert!(matches!(err, PipelineError::StorageUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_corrupt_state_treated_as_missing() {
        let store = Arc::new(MemoryStore::new());
        store
            .set(&CounterKind::Ocr.storage_key(), "これはJSONではない")
            .await
            .unwrap();

        let c = counter(CounterKind::Ocr, store);
        assert_eq!(c.increment(None).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_legacy_window_without_streak_field() {
        let store = Arc::new(MemoryStore::new());
        let json = format!(
            r#"{{"count":2,"window_start":{},"dedup_keys":["card1"]}}"#,
            Local::now().timestamp()
        );
        store
            .set(&CounterKind::Flashcard.storage_key(), &json)
            .await
            .unwrap();

        let c = counter(CounterKind::Flashcard, store);
        assert_eq!(c.count().await.unwrap(), 2);
        assert!(!c.streak().await.unwrap());
    }

    #[tokio::test]
    async fn test_rapid_increments_are_serialized() {
        let store = Arc::new(MemoryStore::new());
        let c = Arc::new(counter(CounterKind::SwipeRight, store));

        // 永続化完了を待たない連続スワイプでも更新が失われない
        let (a, b, d) = tokio::join!(
            c.increment(None),
            c.increment(None),
            c.increment(None)
        );
        a.unwrap();
        b.unwrap();
        d.unwrap();

        assert_eq!(c.count().await.unwrap(), 3);
    }

    #[test]
    fn test_window_policy_for_kind() {
        assert_eq!(
            WindowPolicy::for_kind(CounterKind::Ocr, 24),
            WindowPolicy::Rolling { hours: 24 }
        );
        assert_eq!(
            WindowPolicy::for_kind(CounterKind::Flashcard, 12),
            WindowPolicy::Rolling { hours: 12 }
        );
        assert_eq!(
            WindowPolicy::for_kind(CounterKind::SwipeRight, 24),
            WindowPolicy::CalendarDay
        );
        assert_eq!(
            WindowPolicy::for_kind(CounterKind::SwipeLeft, 24),
            WindowPolicy::CalendarDay
        );
    }

    #[test]
    fn test_rolling_expiry_boundary() {
        let policy = WindowPolicy::Rolling { hours: 24 };
        let now = Local::now();

        // ちょうど24時間で満了（>=）
        assert!(policy.expired(now.timestamp() - 24 * 3600, now));
        assert!(!policy.expired(now.timestamp() - 24 * 3600 + 1, now));
    }

    #[test]
    fn test_invalid_window_start_is_expired() {
        let policy = WindowPolicy::CalendarDay;
        assert!(policy.expired(i64::MIN, Local::now()));
    }
}

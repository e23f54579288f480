use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::sync::Mutex;

/// 永続キー/バリューストアの共通トレイト
///
/// 使用量カウンターのウィンドウ状態の保存に使う。値はJSON文字列。
/// キーは `{kind}_counter_daily` 形式で種別ごとに1つ。
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// キーに対応する値を取得。存在しなければ `None`
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// 値を保存（上書き）
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// キーを削除。存在しなくてもエラーにしない
    async fn remove(&self, key: &str) -> Result<()>;
}

/// ファイルベースのキー/バリューストア
///
/// 1キー1ファイルでディレクトリに保存する。書き込みは一時ファイルに
/// 書いてからリネームするため、途中でクラッシュしても既存の値が
/// 壊れることはない。
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// ストアを開く。ディレクトリがなければ作成する
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        if !dir.exists() {
            fs::create_dir_all(&dir)
                .with_context(|| format!("ストアディレクトリの作成に失敗: {:?}", dir))?;
        }
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

#[async_trait]
impl KeyValueStore for JsonFileStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("ストアの読み込みに失敗: {:?}", path)),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key);

        // 一時ファイル経由のアトミック書き込み
        let mut temp = NamedTempFile::new_in(&self.dir)
            .with_context(|| format!("一時ファイルの作成に失敗: {:?}", self.dir))?;
        temp.write_all(value.as_bytes())
            .with_context(|| "一時ファイルへの書き込みに失敗")?;
        temp.persist(&path)
            .with_context(|| format!("ストアへの保存に失敗: {:?}", path))?;

        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("ストアからの削除に失敗: {:?}", path)),
        }
    }
}

/// インメモリのキー/バリューストア
///
/// テストと使い捨て実行用。プロセス終了で消える。
#[derive(Default)]
pub struct MemoryStore {
    map: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.map.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.map
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.map.lock().await.remove(key);
        Ok(())
    }
}

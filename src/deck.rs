use crate::types::Flashcard;
use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// フラッシュカードのデッキ書き出し
///
/// 保存されたカードを日付ごとのJSON Linesファイルに追記する。
/// 1行が1枚のカードで、後段のツールがそのまま読み込める。
pub struct DeckWriter {
    output_dir: PathBuf,
    cards_written: usize,
}

impl DeckWriter {
    pub fn new<P: AsRef<Path>>(output_dir: P) -> Result<Self> {
        let output_dir = output_dir.as_ref().to_path_buf();

        // 出力ディレクトリが存在しない場合は作成
        if !output_dir.exists() {
            fs::create_dir_all(&output_dir)
                .with_context(|| format!("デッキディレクトリの作成に失敗: {:?}", output_dir))?;
        }

        Ok(Self {
            output_dir,
            cards_written: 0,
        })
    }

    /// 今日のデッキファイルのパス
    fn current_path(&self) -> PathBuf {
        let date = chrono::Local::now().format("%Y%m%d");
        self.output_dir.join(format!("deck_{}.jsonl", date))
    }

    /// カードを1枚追記
    pub fn append(&mut self, card: &Flashcard) -> Result<()> {
        let path = self.current_path();
        let json = serde_json::to_string(card).with_context(|| "カードのシリアライズに失敗")?;

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("デッキファイルのオープンに失敗: {:?}", path))?;
        writeln!(file, "{}", json).with_context(|| "デッキファイルへの書き込みに失敗")?;

        self.cards_written += 1;
        log::info!("カードを保存: {} → {:?}", card.id, path);

        Ok(())
    }

    /// 書き込んだカード枚数
    pub fn cards_written(&self) -> usize {
        self.cards_written
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AnnotatedWord, Language, ScriptSignature, Translation};
    use tempfile::TempDir;

    fn sample_card(text: &str) -> Flashcard {
        let translation = Translation {
            source_text: text.to_string(),
            translated_text: format!("訳: {}", text),
            reading_text: None,
            detected: Language::Japanese,
            signature: ScriptSignature::default(),
            romanization_missing: false,
        };
        Flashcard::new(&translation, vec![AnnotatedWord::plain(text)])
    }

    #[test]
    fn test_append_writes_one_line_per_card() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let mut writer = DeckWriter::new(temp_dir.path())?;

        writer.append(&sample_card("一枚目"))?;
        writer.append(&sample_card("二枚目"))?;
        assert_eq!(writer.cards_written(), 2);

        // ファイルが1つ作られ、2行含まれている
        let files: Vec<_> = fs::read_dir(temp_dir.path())?
            .filter_map(|e| e.ok())
            .collect();
        assert_eq!(files.len(), 1);

        let content = fs::read_to_string(files[0].path())?;
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        // 各行が有効なカードとして読み戻せる
        let card: Flashcard = serde_json::from_str(lines[0])?;
        assert_eq!(card.source_text, "一枚目");

        Ok(())
    }

    #[test]
    fn test_creates_missing_directory() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let nested = temp_dir.path().join("a").join("b");

        let mut writer = DeckWriter::new(&nested)?;
        writer.append(&sample_card("カード"))?;

        assert!(nested.exists());
        Ok(())
    }
}

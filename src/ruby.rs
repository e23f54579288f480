use crate::error::PipelineError;
use crate::script::char_class;
use crate::types::AnnotatedWord;

/// ルビ注釈テキストの解析
///
/// 外部翻訳サービスが返す読みテキストは、本文の直後に読みを括弧で
/// 付けるインライン形式になっている。対応する括弧は半角 `( )` と
/// 二重山括弧 `｟ ｠` (U+FF5F/U+FF60) の2種類。
///
/// ```text
/// 漢字(かんじ)です      →  [漢字/かんじ] [です]
/// 日本｟にほん｠語       →  [日本/にほん] [語]
/// ```
///
/// 読みが係る本文の範囲は、開き括弧の直前の文字と同じスクリプト分類の
/// 末尾連続列とする。括弧の形式に合致しない部分はそのまま1つの
/// プレーンな単語として出力し、不正な入力でも決して失敗しない。
///
/// # Examples
///
/// ```
/// # use yomicard::ruby::parse;
/// # use yomicard::types::AnnotatedWord;
/// let words = parse("漢字(かんじ)です");
/// assert_eq!(
///     words,
///     vec![
///         AnnotatedWord::annotated("漢字", "かんじ"),
///         AnnotatedWord::plain("です"),
///     ]
/// );
/// ```
pub fn parse(text: &str) -> Vec<AnnotatedWord> {
    segments(text).collect()
}

/// 遅延評価のセグメントイテレータを作成
///
/// イテレータは `Clone` であり、同じ入力に対して何度でも作り直せる。
/// 編集後の再解析はこの関数を呼び直すだけでよい。
pub fn segments(text: &str) -> RubySegments<'_> {
    RubySegments {
        rest: text,
        pending: None,
    }
}

/// 注釈付き単語の遅延イテレータ
///
/// 入力を左から右へ走査し、`AnnotatedWord` を出現順に返す。
/// 有限であり、入力が空でなければ少なくとも1つのセグメントを返す。
#[derive(Clone, Debug)]
pub struct RubySegments<'a> {
    rest: &'a str,
    /// 注釈の前にプレーン部分を先に返す場合の持ち越し
    pending: Option<AnnotatedWord>,
}

/// 走査で見つかった注釈の位置（バイトインデックス）
struct Found {
    base_start: usize,
    open_idx: usize,
    reading_start: usize,
    reading_end: usize,
    resume: usize,
}

fn is_delimiter(c: char) -> bool {
    matches!(c, '(' | ')' | '｟' | '｠')
}

/// 次に成立する注釈を探す
///
/// 成立しない括弧（閉じなし・読みが空・本文なし）は読み飛ばし、
/// プレーンテキストの一部として扱う。
fn scan(rest: &str) -> Option<Found> {
    let mut search_from = 0;

    loop {
        let (rel_idx, open) = rest[search_from..]
            .char_indices()
            .find(|&(_, c)| c == '(' || c == '｟')?;
        let open_idx = search_from + rel_idx;
        let after_open = open_idx + open.len_utf8();

        let close = if open == '(' { ')' } else { '｠' };
        let Some(rel_close) = rest[after_open..].find(close) else {
            // 閉じ括弧なし: 残り全体がプレーンテキストに退化する
            return None;
        };

        let reading_start = after_open;
        let reading_end = after_open + rel_close;
        let resume = reading_end + close.len_utf8();
        let reading = &rest[reading_start..reading_end];

        // 読みが空、または括弧が入れ子の場合は注釈として成立しない
        if reading.is_empty() || reading.chars().any(is_delimiter) {
            search_from = after_open;
            continue;
        }

        // 本文: 開き括弧の直前の文字と同じスクリプト分類の末尾連続列
        let prefix = &rest[..open_idx];
        let base_class = prefix.chars().next_back().and_then(char_class);
        let Some(class) = base_class else {
            // 直前が空白・記号など注釈対象外 → 通常の括弧書きとして扱う
            search_from = resume;
            continue;
        };

        let base_start = prefix
            .char_indices()
            .rev()
            .take_while(|&(_, c)| char_class(c) == Some(class))
            .last()
            .map(|(i, _)| i)
            .unwrap_or(open_idx);

        return Some(Found {
            base_start,
            open_idx,
            reading_start,
            reading_end,
            resume,
        });
    }
}

impl<'a> Iterator for RubySegments<'a> {
    type Item = AnnotatedWord;

    fn next(&mut self) -> Option<AnnotatedWord> {
        if let Some(word) = self.pending.take() {
            return Some(word);
        }
        if self.rest.is_empty() {
            return None;
        }

        let Some(found) = scan(self.rest) else {
            // 注釈なし: 残り全体を1つのプレーンな単語として返す
            let word = AnnotatedWord::plain(self.rest);
            self.rest = "";
            return Some(word);
        };

        let word = AnnotatedWord::annotated(
            &self.rest[found.base_start..found.open_idx],
            &self.rest[found.reading_start..found.reading_end],
        );

        if word.reading_truncated() {
            // 読みが本文に対して短すぎる場合は上流での欠落を疑う。
            // 診断ログのみで、セグメントはそのまま出力する。
            let warning = PipelineError::MalformedAnnotation {
                detail: format!(
                    "本文「{}」に対して読み「{}」が短すぎます",
                    word.base,
                    word.reading.as_deref().unwrap_or("")
                ),
            };
            log::warn!("{}", warning);
        }

        let plain_part = &self.rest[..found.base_start];
        let plain_word = if plain_part.is_empty() {
            None
        } else {
            Some(AnnotatedWord::plain(plain_part))
        };
        self.rest = &self.rest[found.resume..];

        match plain_word {
            Some(plain) => {
                self.pending = Some(word);
                Some(plain)
            }
            None => Some(word),
        }
    }
}

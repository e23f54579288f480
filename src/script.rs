use crate::types::{ForcedLanguage, Language, ScriptSignature};

/// エスペラント語の字上符付き文字
const ESPERANTO_CHARS: &str = "ĉĝĥĵŝŭĈĜĤĴŜŬ";
/// イタリア語のアクセント付き文字
const ITALIAN_CHARS: &str = "àèéìíîòóùúÀÈÉÌÍÎÒÓÙÚ";
/// フランス語のアクセント・合字付き文字
const FRENCH_CHARS: &str = "àâæçéèêëîïôœùûüÿÀÂÆÇÉÈÊËÎÏÔŒÙÛÜŸ";
/// スペイン語の特殊文字（逆疑問符・逆感嘆符を含む）
const SPANISH_CHARS: &str = "áéíñóúüÁÉÍÑÓÚÜ¿¡";
/// ポルトガル語のアクセント・鼻母音付き文字
const PORTUGUESE_CHARS: &str = "ãõáâàéêíóôúçÃÕÁÂÀÉÊÍÓÔÚÇ";
/// ドイツ語のウムラウト・エスツェット
const GERMAN_CHARS: &str = "äöüßÄÖÜ";

/// 文字の大まかなスクリプト分類
///
/// ルビ解析で「読み注釈が係る本文の範囲」を決めるために使う。
/// `None` は注釈対象にならない文字（空白・記号・数字など）。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum CharClass {
    Kana,
    Han,
    Hangul,
    Cyrillic,
    Arabic,
    Devanagari,
    Tagalog,
    Latin,
}

/// 1文字のスクリプト分類
///
/// ASCIIの句読点・空白・数字はどのスクリプトにも分類しない。
/// 共有句読点1文字でスクリプト判定が誤爆しないための除外。
pub(crate) fn char_class(c: char) -> Option<CharClass> {
    if c.is_ascii() {
        return if c.is_ascii_alphabetic() {
            Some(CharClass::Latin)
        } else {
            None
        };
    }

    match c {
        // ひらがな・カタカナ
        '\u{3040}'..='\u{30FF}' => Some(CharClass::Kana),
        // CJK統合漢字（拡張Aを含む）
        '\u{3400}'..='\u{4DBF}' | '\u{4E00}'..='\u{9FFF}' => Some(CharClass::Han),
        // ハングル音節
        '\u{AC00}'..='\u{D7AF}' => Some(CharClass::Hangul),
        // キリル文字
        '\u{0400}'..='\u{04FF}' => Some(CharClass::Cyrillic),
        // アラビア文字
        '\u{0600}'..='\u{06FF}' => Some(CharClass::Arabic),
        // デーヴァナーガリー文字
        '\u{0900}'..='\u{097F}' => Some(CharClass::Devanagari),
        // バイバイン文字（タガログ語）
        '\u{1700}'..='\u{171F}' => Some(CharClass::Tagalog),
        // アクセント付きラテン文字など
        _ if c.is_alphabetic() => Some(CharClass::Latin),
        _ => None,
    }
}

/// スクリプト判定器
///
/// 入力テキストのUnicodeコードポイントを走査し、各文字体系の文字が
/// 含まれるかを判定する。判定は純粋・決定的で、空文字列や空白のみの
/// 入力は全て偽のシグネチャになる。
///
/// 表示ラベルの解決順序は固定の優先順位リストとして保持する。
/// かなを伴わない漢字のみのテキストは中国語と日本語の両方に該当しうる
/// ため、かなの有無で先に日本語を確定させる順序になっている。
///
/// # Examples
///
/// ```
/// # use yomicard::script::ScriptClassifier;
/// # use yomicard::types::Language;
/// let classifier = ScriptClassifier::new();
///
/// let sig = classifier.classify("漢字とかな");
/// assert!(sig.kana);
/// assert!(sig.han);
/// assert_eq!(classifier.resolve_label(&sig), Language::Japanese);
///
/// // ASCIIのみのテキストはどのスクリプトにも該当しない
/// let sig = classifier.classify("hello, world! 123");
/// assert!(!sig.any());
/// ```
pub struct ScriptClassifier {
    /// ラベル解決の優先順位
    priority: Vec<Language>,
}

impl ScriptClassifier {
    /// 既定の優先順位で判定器を作成
    pub fn new() -> Self {
        Self {
            priority: vec![
                Language::Japanese,
                Language::Chinese,
                Language::Korean,
                Language::Russian,
                Language::Arabic,
                Language::Hindi,
                Language::Esperanto,
                Language::Italian,
                Language::Tagalog,
                Language::French,
                Language::Spanish,
                Language::Portuguese,
                Language::German,
            ],
        }
    }

    /// 優先順位を差し替えて作成（テスト・製品判断の差し替え用）
    pub fn with_priority(priority: Vec<Language>) -> Self {
        Self { priority }
    }

    /// テキストのスクリプトシグネチャを計算
    ///
    /// 各文字体系について、該当するコードポイントが1文字でもあれば
    /// そのフラグを立てる。結果はキャッシュせず、編集のたびに
    /// 呼び直すこと。
    pub fn classify(&self, text: &str) -> ScriptSignature {
        let mut sig = ScriptSignature::default();

        for c in text.chars() {
            match char_class(c) {
                Some(CharClass::Kana) => sig.kana = true,
                Some(CharClass::Han) => sig.han = true,
                Some(CharClass::Hangul) => sig.hangul = true,
                Some(CharClass::Cyrillic) => sig.cyrillic = true,
                Some(CharClass::Arabic) => sig.arabic = true,
                Some(CharClass::Devanagari) => sig.devanagari = true,
                Some(CharClass::Tagalog) => sig.tagalog = true,
                Some(CharClass::Latin) | None => {}
            }

            // ラテン文字ベースの言語は特定の文字集合で判定する。
            // 1文字が複数言語に属することがある（é など）。
            if ESPERANTO_CHARS.contains(c) {
                sig.esperanto = true;
            }
            if ITALIAN_CHARS.contains(c) {
                sig.italian = true;
            }
            if FRENCH_CHARS.contains(c) {
                sig.french = true;
            }
            if SPANISH_CHARS.contains(c) {
                sig.spanish = true;
            }
            if PORTUGUESE_CHARS.contains(c) {
                sig.portuguese = true;
            }
            if GERMAN_CHARS.contains(c) {
                sig.german = true;
            }
        }

        sig
    }

    /// シグネチャから表示用の言語ラベルを1つ解決
    ///
    /// 優先順位リストを先頭から評価し、最初に該当した言語を返す。
    /// 日本語はかなの有無、中国語は漢字の有無で判定するため、
    /// かな付きのテキストは漢字が混ざっていても日本語になる。
    /// どれにも該当しなければ `Unknown`。
    pub fn resolve_label(&self, signature: &ScriptSignature) -> Language {
        for &language in &self.priority {
            let hit = match language {
                // かながあれば日本語を確定させる
                Language::Japanese => signature.kana,
                // 日本語が先に評価されなかった（かながない）場合のみ漢字で中国語
                Language::Chinese => signature.han,
                _ => signature.matches(language),
            };
            if hit {
                return language;
            }
        }
        Language::Unknown
    }

    /// 強制言語の検証
    ///
    /// `Auto` なら常に成功。指定言語がある場合は、その言語のスクリプト
    /// 判定をシグネチャが満たすときのみ成功する。失敗しても決して
    /// panic せず false を返す。入力が編集されるたびに呼び直すこと。
    ///
    /// # Examples
    ///
    /// ```
    /// # use yomicard::script::ScriptClassifier;
    /// # use yomicard::types::{ForcedLanguage, Language};
    /// let classifier = ScriptClassifier::new();
    ///
    /// assert!(classifier.validate_forced("anything", ForcedLanguage::Auto));
    /// assert!(!classifier.validate_forced(
    ///     "Bonjour",
    ///     ForcedLanguage::Forced(Language::Japanese)
    /// ));
    /// ```
    pub fn validate_forced(&self, text: &str, forced: ForcedLanguage) -> bool {
        match forced {
            ForcedLanguage::Auto => true,
            ForcedLanguage::Forced(language) => self.classify(text).matches(language),
        }
    }

    /// 翻訳に読み（ローマ字・ルビ）が必須の言語か
    ///
    /// 固定の方針テーブルであり、シグネチャからの推論ではない。
    pub fn needs_romanization(language: Language) -> bool {
        matches!(
            language,
            Language::Japanese
                | Language::Chinese
                | Language::Korean
                | Language::Russian
                | Language::Arabic
                | Language::Hindi
        )
    }
}

impl Default for ScriptClassifier {
    fn default() -> Self {
        Self::new()
    }
}

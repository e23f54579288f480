use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

/// 対応言語ラベル
///
/// スクリプト判定の結果から解決される表示用の言語名。
/// 表示・セクションタイトル専用であり、強制言語の検証には使わない。
///
/// # Examples
///
/// ```
/// # use yomicard::types::Language;
/// let lang = Language::Japanese;
/// assert_eq!(lang.as_code(), "ja");
/// assert_eq!(Language::from_code("ja"), Some(Language::Japanese));
/// ```
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, Hash)]
pub enum Language {
    /// 日本語 (かな・漢字)
    #[serde(rename = "ja")]
    Japanese,
    /// 中国語 (かなを伴わない漢字)
    #[serde(rename = "zh")]
    Chinese,
    /// 韓国語 (ハングル)
    #[serde(rename = "ko")]
    Korean,
    /// ロシア語 (キリル文字)
    #[serde(rename = "ru")]
    Russian,
    /// アラビア語
    #[serde(rename = "ar")]
    Arabic,
    /// ヒンディー語 (デーヴァナーガリー)
    #[serde(rename = "hi")]
    Hindi,
    /// エスペラント語 (ĉ ĝ ĥ ĵ ŝ ŭ)
    #[serde(rename = "eo")]
    Esperanto,
    /// イタリア語
    #[serde(rename = "it")]
    Italian,
    /// タガログ語 (バイバイン文字)
    #[serde(rename = "tl")]
    Tagalog,
    /// フランス語
    #[serde(rename = "fr")]
    French,
    /// スペイン語
    #[serde(rename = "es")]
    Spanish,
    /// ポルトガル語
    #[serde(rename = "pt")]
    Portuguese,
    /// ドイツ語
    #[serde(rename = "de")]
    German,
    /// 判定不能
    #[serde(rename = "unknown")]
    Unknown,
}

impl Language {
    /// ISO 639-1 相当の言語コード
    pub fn as_code(&self) -> &'static str {
        match self {
            Language::Japanese => "ja",
            Language::Chinese => "zh",
            Language::Korean => "ko",
            Language::Russian => "ru",
            Language::Arabic => "ar",
            Language::Hindi => "hi",
            Language::Esperanto => "eo",
            Language::Italian => "it",
            Language::Tagalog => "tl",
            Language::French => "fr",
            Language::Spanish => "es",
            Language::Portuguese => "pt",
            Language::German => "de",
            Language::Unknown => "unknown",
        }
    }

    /// 言語コードからの変換
    ///
    /// 未対応のコードは `None` を返す。
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "ja" => Some(Language::Japanese),
            "zh" => Some(Language::Chinese),
            "ko" => Some(Language::Korean),
            "ru" => Some(Language::Russian),
            "ar" => Some(Language::Arabic),
            "hi" => Some(Language::Hindi),
            "eo" => Some(Language::Esperanto),
            "it" => Some(Language::Italian),
            "tl" => Some(Language::Tagalog),
            "fr" => Some(Language::French),
            "es" => Some(Language::Spanish),
            "pt" => Some(Language::Portuguese),
            "de" => Some(Language::German),
            _ => None,
        }
    }

    /// 表示用の言語名
    pub fn display_name(&self) -> &'static str {
        match self {
            Language::Japanese => "日本語",
            Language::Chinese => "中国語",
            Language::Korean => "韓国語",
            Language::Russian => "ロシア語",
            Language::Arabic => "アラビア語",
            Language::Hindi => "ヒンディー語",
            Language::Esperanto => "エスペラント語",
            Language::Italian => "イタリア語",
            Language::Tagalog => "タガログ語",
            Language::French => "フランス語",
            Language::Spanish => "スペイン語",
            Language::Portuguese => "ポルトガル語",
            Language::German => "ドイツ語",
            Language::Unknown => "不明",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// 強制言語の制約
///
/// ユーザーが入力言語を固定している場合の制約。
/// `Auto` のときは自動判定に任せ、検証は常に成功する。
///
/// # Examples
///
/// ```
/// # use yomicard::types::{ForcedLanguage, Language};
/// assert_eq!(ForcedLanguage::from_code("auto"), Some(ForcedLanguage::Auto));
/// assert_eq!(
///     ForcedLanguage::from_code("ja"),
///     Some(ForcedLanguage::Forced(Language::Japanese))
/// );
/// assert_eq!(ForcedLanguage::from_code("xx"), None);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ForcedLanguage {
    /// 自動判定（制約なし）
    Auto,
    /// 指定言語のみ受け付ける
    Forced(Language),
}

impl ForcedLanguage {
    /// 設定ファイルの言語コードからの変換
    pub fn from_code(code: &str) -> Option<Self> {
        if code == "auto" {
            return Some(ForcedLanguage::Auto);
        }
        Language::from_code(code).map(ForcedLanguage::Forced)
    }
}

/// スクリプト判定のシグネチャ
///
/// 入力テキストに各文字体系の文字が1文字以上含まれるかどうかの独立した
/// ブール値の集合。入力から毎回計算し、編集をまたいでキャッシュしない。
///
/// かなと漢字は別々に保持する。日本語判定（かな or 漢字）と中国語判定
/// （かなを伴わない漢字）はこの2つから導出する。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScriptSignature {
    /// ひらがな・カタカナ
    pub kana: bool,
    /// 漢字 (CJK統合漢字)
    pub han: bool,
    /// ハングル
    pub hangul: bool,
    /// キリル文字
    pub cyrillic: bool,
    /// アラビア文字
    pub arabic: bool,
    /// デーヴァナーガリー文字
    pub devanagari: bool,
    /// エスペラント語の字上符付き文字
    pub esperanto: bool,
    /// イタリア語のアクセント付き文字
    pub italian: bool,
    /// バイバイン文字（タガログ語）
    pub tagalog: bool,
    /// フランス語のアクセント付き文字
    pub french: bool,
    /// スペイン語の特殊文字
    pub spanish: bool,
    /// ポルトガル語のアクセント付き文字
    pub portuguese: bool,
    /// ドイツ語のウムラウト・エスツェット
    pub german: bool,
}

impl ScriptSignature {
    /// 日本語とみなせるか（かな、または漢字を含む）
    pub fn japanese(&self) -> bool {
        self.kana || self.han
    }

    /// 中国語とみなせるか（かなを伴わない漢字）
    pub fn chinese(&self) -> bool {
        self.han && !self.kana
    }

    /// 指定言語のスクリプト判定を満たすか
    ///
    /// 強制言語の検証に使う。`Unknown` は常に `false`。
    pub fn matches(&self, language: Language) -> bool {
        match language {
            Language::Japanese => self.japanese(),
            Language::Chinese => self.chinese(),
            Language::Korean => self.hangul,
            Language::Russian => self.cyrillic,
            Language::Arabic => self.arabic,
            Language::Hindi => self.devanagari,
            Language::Esperanto => self.esperanto,
            Language::Italian => self.italian,
            Language::Tagalog => self.tagalog,
            Language::French => self.french,
            Language::Spanish => self.spanish,
            Language::Portuguese => self.portuguese,
            Language::German => self.german,
            Language::Unknown => false,
        }
    }

    /// いずれかのスクリプトを検出したか
    pub fn any(&self) -> bool {
        self.kana
            || self.han
            || self.hangul
            || self.cyrillic
            || self.arabic
            || self.devanagari
            || self.esperanto
            || self.italian
            || self.tagalog
            || self.french
            || self.spanish
            || self.portuguese
            || self.german
    }
}

/// 注釈付き単語
///
/// ルビ（ふりがな）注釈付きテキストの1セグメント。
/// `reading` が `None` のときは読み注釈のないプレーンテキスト。
///
/// 不変条件: `base` は空にならない。`reading` が存在する場合は空にならない。
///
/// # Examples
///
/// ```
/// # use yomicard::types::AnnotatedWord;
/// let word = AnnotatedWord::annotated("漢字", "かんじ");
/// assert_eq!(word.base, "漢字");
/// assert_eq!(word.reading.as_deref(), Some("かんじ"));
///
/// let plain = AnnotatedWord::plain("です");
/// assert!(plain.reading.is_none());
/// ```
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct AnnotatedWord {
    /// 本文テキスト
    pub base: String,

    /// 読み（ルビ）。プレーンテキストの場合は `None`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reading: Option<String>,
}

impl AnnotatedWord {
    /// 読み注釈のないプレーンな単語を作成
    pub fn plain(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            reading: None,
        }
    }

    /// 読み注釈付きの単語を作成
    pub fn annotated(base: impl Into<String>, reading: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            reading: Some(reading.into()),
        }
    }

    /// 読みが切り詰められている疑いがあるか
    ///
    /// 読みの文字数が本文の文字数の半分未満の場合、上流で読みが
    /// 欠落した可能性が高い。診断専用であり、描画は継続する。
    pub fn reading_truncated(&self) -> bool {
        match &self.reading {
            Some(reading) => reading.chars().count() * 2 < self.base.chars().count(),
            None => false,
        }
    }
}

/// 使用量カウンターの種別
///
/// 種別ごとに独立したウィンドウを持ち、ストレージキーも種別ごとに分かれる。
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CounterKind {
    /// OCRスキャン回数
    Ocr,
    /// フラッシュカード作成回数
    Flashcard,
    /// 復習の右スワイプ（覚えた）回数
    SwipeRight,
    /// 復習の左スワイプ（もう一度）回数
    SwipeLeft,
}

impl CounterKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CounterKind::Ocr => "ocr",
            CounterKind::Flashcard => "flashcard",
            CounterKind::SwipeRight => "swipe_right",
            CounterKind::SwipeLeft => "swipe_left",
        }
    }

    /// 永続化キー
    ///
    /// 種別ごとに1キー。既存データとの互換のため `{kind}_counter_daily` 形式。
    pub fn storage_key(&self) -> String {
        format!("{}_counter_daily", self.as_str())
    }

    /// 全種別
    pub fn all() -> [CounterKind; 4] {
        [
            CounterKind::Ocr,
            CounterKind::Flashcard,
            CounterKind::SwipeRight,
            CounterKind::SwipeLeft,
        ]
    }
}

/// サブスクリプションのプラン
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionTier {
    /// 無料プラン（1日あたりの上限あり）
    Free,
    /// 有料プラン（実質無制限）
    Premium,
}

/// 翻訳パイプラインの成功結果
///
/// オーケストレーターが外部翻訳サービスの応答と判定結果をまとめたもの。
#[derive(Clone, Debug)]
pub struct Translation {
    /// 入力テキスト
    pub source_text: String,
    /// 翻訳されたテキスト
    pub translated_text: String,
    /// ローマ字・ルビ注釈付きの読みテキスト（提供されない場合もある）
    pub reading_text: Option<String>,
    /// 判定された言語ラベル
    pub detected: Language,
    /// スクリプト判定のシグネチャ
    pub signature: ScriptSignature,
    /// 読みが必要な言語なのに読みが提供されなかった場合 true（非致命）
    pub romanization_missing: bool,
}

/// フラッシュカード
///
/// 翻訳結果を保存用のカードにしたもの。JSON 1行として出力される。
///
/// # JSON出力例
///
/// ```json
/// {
///   "id": "card-5a2e19c87b3d410f",
///   "source_text": "漢字です",
///   "translated_text": "It is kanji",
///   "words": [{"base": "漢字", "reading": "かんじ"}, {"base": "です"}],
///   "language": "ja",
///   "created_at": "2026-02-14T09:30:15+09:00"
/// }
/// ```
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Flashcard {
    /// カードID（入力テキストから決定的に導出）
    pub id: String,

    /// 入力テキスト
    pub source_text: String,

    /// 翻訳されたテキスト
    pub translated_text: String,

    /// 読み注釈を分解した単語列（描画順）
    pub words: Vec<AnnotatedWord>,

    /// 判定された言語
    pub language: Language,

    /// 作成日時 (RFC 3339)
    pub created_at: String,
}

impl Flashcard {
    /// 翻訳結果からフラッシュカードを作成
    ///
    /// IDは入力テキストのハッシュから決定的に導出する。同じテキストを
    /// 同一ウィンドウ内で再保存しても、重複排除キーが一致するため
    /// カウントは増えない。
    pub fn new(translation: &Translation, words: Vec<AnnotatedWord>) -> Self {
        let mut hasher = DefaultHasher::new();
        translation.source_text.hash(&mut hasher);
        let id = format!("card-{:016x}", hasher.finish());

        Self {
            id,
            source_text: translation.source_text.clone(),
            translated_text: translation.translated_text.clone(),
            words,
            language: translation.detected,
            created_at: chrono::Local::now().to_rfc3339(),
        }
    }
}

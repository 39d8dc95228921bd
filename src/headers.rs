//! ヘッダーマップとアキュムレーター
//!
//! トークナイザーから届くフィールド名・値スパンは execute 呼び出しの
//! 境界で分断されていることがある。アキュムレーターはそれを論理ヘッダーに
//! 再構成し、マップは挿入順を保持したまま同名ヘッダーを到着順リストへ
//! 昇格させる。
//!
//! 名前は小文字に正規化して格納する。元の大文字小文字は保存しない
//! (偶然ではなく方針としての選択。イベントには生のスパンが流れる)。
//! 値は `String` として格納するため、obs-text (0x80-0xFF) で UTF-8 として
//! 解釈できないバイトは U+FFFD に置換される。生のバイト列が必要な場合は
//! header_value イベントで受け取ること。

/// ヘッダー値 (単一またはリスト)
///
/// 初回出現時はスカラーで格納し、2 回目の出現でリストへ昇格する。
/// コストと単純さのトレードオフであり、利用側はどちらの形も扱うこと。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderEntry {
    /// 1 回だけ出現したヘッダー
    Single(String),
    /// 複数回出現したヘッダー (到着順)
    Multiple(Vec<String>),
}

impl HeaderEntry {
    /// 最初の値を取得
    pub fn first(&self) -> &str {
        match self {
            HeaderEntry::Single(v) => v,
            HeaderEntry::Multiple(vs) => vs.first().map(String::as_str).unwrap_or(""),
        }
    }

    /// すべての値を到着順で取得
    pub fn all(&self) -> Vec<&str> {
        match self {
            HeaderEntry::Single(v) => vec![v.as_str()],
            HeaderEntry::Multiple(vs) => vs.iter().map(String::as_str).collect(),
        }
    }

    /// 値の個数を取得
    pub fn len(&self) -> usize {
        match self {
            HeaderEntry::Single(_) => 1,
            HeaderEntry::Multiple(vs) => vs.len(),
        }
    }

    /// 値が空かどうか
    ///
    /// `Single` は常に 1 値、`Multiple` は昇格時点で必ず 2 値以上のため、
    /// このメソッドが true を返すことはない (`len` と対になる API として提供)。
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 値を追加 (スカラーからリストへ昇格)
    fn push(&mut self, value: String) {
        match self {
            HeaderEntry::Single(prev) => {
                let prev = std::mem::take(prev);
                *self = HeaderEntry::Multiple(vec![prev, value]);
            }
            HeaderEntry::Multiple(vs) => vs.push(value),
        }
    }
}

/// 挿入順を保持するヘッダーマップ
///
/// 名前は小文字正規化済み。1 メッセージの間は追記のみで、reset で消去される。
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HeaderMap {
    entries: Vec<(String, HeaderEntry)>,
}

impl HeaderMap {
    /// 空のマップを作成
    pub fn new() -> Self {
        Self::default()
    }

    /// ヘッダーを追加
    ///
    /// `name` は小文字正規化済みであること。
    /// 既存の名前なら到着順リストへ昇格する。
    pub(crate) fn append(&mut self, name: String, value: String) {
        debug_assert!(!name.bytes().any(|b| b.is_ascii_uppercase()));
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, entry)) => entry.push(value),
            None => self.entries.push((name, HeaderEntry::Single(value))),
        }
    }

    /// ヘッダーを取得 (大文字小文字を区別しない)
    pub fn get(&self, name: &str) -> Option<&HeaderEntry> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, entry)| entry)
    }

    /// ヘッダーの最初の値を取得
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).map(HeaderEntry::first)
    }

    /// ヘッダーが存在するか確認
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// 異なる名前の個数を取得
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// マップが空かどうか
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 挿入順にイテレート
    pub fn iter(&self) -> impl Iterator<Item = (&str, &HeaderEntry)> {
        self.entries.iter().map(|(n, e)| (n.as_str(), e))
    }

    /// マップを消去
    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}

/// ヘッダーアキュムレーター
///
/// 複数回の execute 呼び出しに分断されて届くフィールド名・値スパンを
/// 保持し、行の完了時にペアとして取り出す。
/// バッファはメッセージをまたいで再利用される (容量は保持)。
#[derive(Debug, Default)]
pub(crate) struct HeaderAccumulator {
    field: Vec<u8>,
    value: Vec<u8>,
    has_field: bool,
}

impl HeaderAccumulator {
    /// フィールド名のバイトを追加
    pub(crate) fn push_field(&mut self, b: u8) {
        self.field.push(b);
        self.has_field = true;
    }

    /// 値のバイトを追加
    pub(crate) fn push_value(&mut self, b: u8) {
        self.value.push(b);
    }

    /// 蓄積中のフィールド名を取得
    pub(crate) fn field_bytes(&self) -> &[u8] {
        &self.field
    }

    /// 蓄積中の値を取得 (末尾 OWS を除去済み)
    pub(crate) fn value_bytes(&self) -> &[u8] {
        let mut end = self.value.len();
        while end > 0 && matches!(self.value[end - 1], b' ' | b'\t') {
            end -= 1;
        }
        &self.value[..end]
    }

    /// フィールドが蓄積中かどうか
    pub(crate) fn has_field(&self) -> bool {
        self.has_field
    }

    /// 蓄積中のペアを取り出してバッファを消去する
    ///
    /// 値のバイトが 1 つもないフィールド (`Name:` 直後に行末) は
    /// 空文字列の値としてフラッシュする。観測されたフィールド名は
    /// 必ず最終マップに現れる。
    pub(crate) fn take_pair(&mut self) -> (Vec<u8>, Vec<u8>) {
        let value_len = self.value_bytes().len();
        self.value.truncate(value_len);
        let field = std::mem::take(&mut self.field);
        let value = std::mem::take(&mut self.value);
        self.has_field = false;
        (field, value)
    }

    /// 蓄積中のバイト数を取得
    pub(crate) fn pending_len(&self) -> usize {
        self.field.len() + self.value.len()
    }

    /// バッファを消去
    pub(crate) fn clear(&mut self) {
        self.field.clear();
        self.value.clear();
        self.has_field = false;
    }
}

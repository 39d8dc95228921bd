/// パーサーの設定
///
/// 構築時に渡す明示的な設定オブジェクト。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParserOptions {
    /// ヘッダー行の終端として裸の LF を許容する
    ///
    /// 有効にしてもヘッダー行の終端だけが緩和される。
    /// リクエストライン・ステータスライン・チャンクフレーミングは
    /// 常に CRLF を要求する。
    pub lenient_headers: bool,
}

impl ParserOptions {
    /// 厳格モードの設定を作成 (デフォルト)
    pub fn new() -> Self {
        Self::default()
    }

    /// 裸 LF を許容する設定を作成
    pub fn lenient() -> Self {
        Self {
            lenient_headers: true,
        }
    }
}

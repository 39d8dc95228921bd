//! 状態機械のノード定義
//!
//! 任意のバイト境界で中断・再開できるよう 1 バイト単位の粒度を持つ。
//! 文法グラフ上を前進するのみで、後退は reset でのみ起こる。

/// 状態機械のノード
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum State {
    /// メッセージ開始待ち (先行する CRLF は読み飛ばす)
    Start,

    // リクエストライン
    /// メソッドトークン読み取り中
    Method,
    /// メソッド後の SP を消費済み、URL の先頭バイト待ち
    UrlStart,
    /// URL 読み取り中
    Url,
    /// "HTTP/" を照合中 (pos は照合済みバイト数)
    ReqHttpName { pos: u8 },
    /// HTTP/0.9 簡易リクエストの LF 待ち (URL 直後に CR を観測)
    Req09AlmostDone,
    /// リクエストラインの LF 待ち
    ReqLineAlmostDone,

    // ステータスライン
    /// "HTTP/" を照合中 (レスポンス)
    ResHttpName { pos: u8 },
    /// ステータスコード読み取り中 (digits は読み取り済み桁数)
    StatusCode { digits: u8 },
    /// ステータスコード直後 (SP で reason、CR で行末)
    StatusCodeEnd,
    /// reason-phrase 読み取り中
    Status,
    /// ステータスラインの LF 待ち
    ResLineAlmostDone,

    // HTTP バージョン (リクエスト・レスポンス共通)
    /// メジャーバージョンの DIGIT 待ち
    HttpMajor,
    /// "." 待ち
    HttpDot,
    /// マイナーバージョンの DIGIT 待ち
    HttpMinor,
    /// バージョン完了 (リクエストは CR、レスポンスは SP が続く)
    HttpVersionDone,

    // ヘッダー (トレーラーも同じ経路を通る)
    /// ヘッダー行の先頭バイト待ち
    HeaderFieldStart,
    /// フィールド名読み取り中
    HeaderField,
    /// ':' の後の OWS 読み飛ばし中
    HeaderValueDiscardWs,
    /// 値読み取り中
    HeaderValue,
    /// ヘッダー行の LF 待ち
    HeaderValueAlmostDone,
    /// ヘッダー終端 (空行) の LF 待ち
    HeadersAlmostDone,

    // ボディ
    /// Content-Length ボディ読み取り中
    BodyIdentity,
    /// EOF 終端ボディ読み取り中 (レスポンスのみ)
    BodyIdentityEof,

    // chunked ボディ
    /// チャンクサイズの先頭 16 進数字待ち
    ChunkSizeStart,
    /// チャンクサイズ読み取り中
    ChunkSize,
    /// チャンク拡張読み飛ばし中
    ChunkExt,
    /// チャンクサイズ行の LF 待ち
    ChunkSizeAlmostDone,
    /// チャンクデータ読み取り中
    ChunkData,
    /// チャンクデータ後の CR 待ち
    ChunkDataAlmostDone,
    /// チャンクデータ後の LF 待ち
    ChunkDataDone,

    /// メッセージ完了 (次のバイトで次メッセージの開始判定を行う)
    MessageDone,
    /// 終端エラー状態 (reset のみで回復)
    Dead,
}

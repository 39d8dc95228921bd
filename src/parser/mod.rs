//! コールバック駆動 HTTP/1.x パーサー (Sans I/O)
//!
//! 1 つの `Parser` が 1 つの論理接続方向 (リクエスト側またはレスポンス側) の
//! 全パース状態を所有する。バイト列を `execute` に渡すと、状態機械が
//! 文法グラフを前進しながら登録済みハンドラーへイベントを同期配送する。
//!
//! ## 使い方
//!
//! ```rust
//! use shiguredo_http1_parser::{Event, Handler, Parser};
//!
//! let mut parser = Parser::request();
//! parser
//!     .on(Event::Url, Handler::data(|url| {
//!         assert_eq!(url, b"/hello/world?foo=bar");
//!         Ok(())
//!     }))
//!     .unwrap();
//!
//! let input = b"GET /hello/world?foo=bar HTTP/1.1\r\nHost: example.com\r\n\r\n";
//! parser.execute(input).unwrap();
//! assert_eq!(parser.http_major(), 1);
//! assert_eq!(parser.http_minor(), 1);
//! assert_eq!(parser.headers().get_str("host"), Some("example.com"));
//! ```

mod chars;
mod machine;
mod state;

use crate::error::{Error, ErrorKind};
use crate::events::{Event, Handler, Handlers};
use crate::headers::{HeaderAccumulator, HeaderMap};
use crate::method::Method;
use crate::options::ParserOptions;

use state::State;

/// パースモード
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// リクエストをパースする (サーバー側)
    Request,
    /// レスポンスをパースする (クライアント側)
    Response,
}

/// 文法上の事実を記録するフラグ集合
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct Flags {
    /// Connection: close を観測した
    pub(crate) connection_close: bool,
    /// Connection: keep-alive を観測した
    pub(crate) connection_keep_alive: bool,
    /// Connection: upgrade を観測した
    pub(crate) connection_upgrade: bool,
    /// Upgrade ヘッダーを観測した
    pub(crate) upgrade_header: bool,
    /// アップグレード (または CONNECT) が確定した
    pub(crate) upgrade: bool,
    /// headers_complete ハンドラーがボディスキップを指示した
    pub(crate) skip_body: bool,
}

/// コールバック駆動 HTTP/1.x パーサー
///
/// 接続方向ごとに 1 インスタンス。`&mut self` を要求することで
/// 2 つの呼び出し箇所からの同時アクセスを構造的に禁止する。
/// 永続接続では reset でメッセージ間の再利用ができる
/// (バッファ容量は保持される)。
#[derive(Debug)]
pub struct Parser {
    mode: Mode,
    options: ParserOptions,
    handlers: Handlers,

    state: State,
    http_major: u16,
    http_minor: u16,

    // リクエスト側
    method: Option<Method>,
    method_buf: Vec<u8>,
    pending_url: Vec<u8>,

    // レスポンス側
    status_code: u16,
    pending_status: Vec<u8>,

    // ボディフレーミング
    content_length: Option<u64>,
    content_remaining: u64,
    chunk_remaining: u64,
    is_chunked: bool,

    flags: Flags,
    headers_done: bool,
    in_trailers: bool,

    acc: HeaderAccumulator,
    headers: HeaderMap,
    trailers: HeaderMap,

    paused: bool,
    error: Option<Error>,
}

impl Parser {
    /// 新しいパーサーを作成
    pub fn new(mode: Mode) -> Self {
        Self::with_options(mode, ParserOptions::default())
    }

    /// 設定付きでパーサーを作成
    pub fn with_options(mode: Mode, options: ParserOptions) -> Self {
        Self {
            mode,
            options,
            handlers: Handlers::default(),
            state: State::Start,
            http_major: 0,
            http_minor: 0,
            method: None,
            method_buf: Vec::new(),
            pending_url: Vec::new(),
            status_code: 0,
            pending_status: Vec::new(),
            content_length: None,
            content_remaining: 0,
            chunk_remaining: 0,
            is_chunked: false,
            flags: Flags::default(),
            headers_done: false,
            in_trailers: false,
            acc: HeaderAccumulator::default(),
            headers: HeaderMap::new(),
            trailers: HeaderMap::new(),
            paused: false,
            error: None,
        }
    }

    /// リクエストパーサーを作成
    pub fn request() -> Self {
        Self::new(Mode::Request)
    }

    /// レスポンスパーサーを作成
    pub fn response() -> Self {
        Self::new(Mode::Response)
    }

    /// パースモードを取得
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// 設定を取得
    pub fn options(&self) -> &ParserOptions {
        &self.options
    }

    /// イベントハンドラーを登録
    ///
    /// イベントとハンドラー形態が一致しない場合は `InvalidArgument`。
    pub fn on(&mut self, event: Event, handler: Handler) -> Result<(), Error> {
        self.handlers.set(event, handler)
    }

    /// イベントハンドラーを解除
    pub fn off(&mut self, event: Event) {
        self.handlers.remove(event);
    }

    /// バイト列をパースする
    ///
    /// 消費したバイト数を返す。成功時はバッファ全体を消費する。
    /// 一時停止 (ハンドラー指示またはアップグレード) が起きた呼び出しは
    /// そこまでの消費数を返すので、残りは resume 後に再提示すること。
    /// 文法違反・ハンドラー失敗はエラーを返し、コンテキストは reset まで
    /// それ以降の入力を拒否する。
    ///
    /// 一時停止中の呼び出しは 1 バイトも消費せず `Paused` を返す
    /// (終端エラーではない。resume を忘れた呼び出し側への通知)。
    pub fn execute(&mut self, data: &[u8]) -> Result<usize, Error> {
        if let Some(err) = &self.error {
            return Err(err.clone());
        }
        if self.paused {
            return Err(Error::new(
                ErrorKind::Paused,
                "execute called while paused; call resume() first",
            ));
        }
        match self.run(data) {
            Ok(consumed) => Ok(consumed),
            Err(err) => {
                if err.kind().is_fatal() {
                    self.state = State::Dead;
                    self.error = Some(err.clone());
                }
                Err(err)
            }
        }
    }

    /// ストリーム終端を通知する
    ///
    /// EOF 終端ボディのメッセージはここで完了する。
    /// メッセージ途中の終端は `ClosedConnection`。
    pub fn finish(&mut self) -> Result<(), Error> {
        if let Some(err) = &self.error {
            return Err(err.clone());
        }
        match self.state {
            State::Start | State::MessageDone => Ok(()),
            State::BodyIdentityEof => match self.dispatch_message_complete() {
                Ok(()) => Ok(()),
                Err(err) => {
                    self.state = State::Dead;
                    self.error = Some(err.clone());
                    Err(err)
                }
            },
            _ => {
                let err = Error::new(
                    ErrorKind::ClosedConnection,
                    "EOF before message completed",
                );
                self.state = State::Dead;
                self.error = Some(err.clone());
                Err(err)
            }
        }
    }

    /// パーサーを一時停止する
    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// 一時停止を解除する
    ///
    /// 次の `execute` は状態機械が止まった位置から正確に再開する。
    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// 一時停止中かどうか
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// パーサーを構築時の状態に戻す
    ///
    /// ハンドラー登録と設定は保持される。エラー状態からの唯一の回復手段。
    pub fn reset(&mut self) {
        self.reinit_message();
        self.state = State::Start;
        self.paused = false;
        self.error = None;
    }

    /// HTTP メジャーバージョンを取得 (バージョントークン完了後に有効)
    pub fn http_major(&self) -> u16 {
        self.http_major
    }

    /// HTTP マイナーバージョンを取得 (バージョントークン完了後に有効)
    pub fn http_minor(&self) -> u16 {
        self.http_minor
    }

    /// メソッドを取得 (リクエストモードでメソッドトークン完了後に有効)
    pub fn method(&self) -> Option<Method> {
        self.method
    }

    /// メソッド名を取得
    pub fn method_name(&self) -> Option<&'static str> {
        self.method.map(|m| m.as_str())
    }

    /// ステータスコードを取得 (レスポンスモードでステータス行完了後に有効)
    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    /// Content-Length ヘッダーの値を取得 (受理された場合のみ)
    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    /// Transfer-Encoding: chunked が受理されたかどうか
    pub fn is_chunked(&self) -> bool {
        self.is_chunked
    }

    /// ヘッダーマップを取得 (名前は小文字正規化済み、挿入順)
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// トレーラーマップを取得 (chunked の終端後に有効)
    pub fn trailers(&self) -> &HeaderMap {
        &self.trailers
    }

    /// アップグレード (または CONNECT) が確定したかどうか
    pub fn is_upgrade(&self) -> bool {
        self.flags.upgrade
    }

    /// 現在のエラーを取得
    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    /// 蓄積中バッファの合計バイト数を取得
    ///
    /// メッセージサイズ制限はコアでは強制しない。埋め込み側はこの値を
    /// 監視して、方針を超えたらパーサーを破棄することで制限を課す。
    pub fn pending_buffer_len(&self) -> usize {
        self.acc.pending_len()
            + self.pending_url.len()
            + self.pending_status.len()
            + self.method_buf.len()
    }

    /// 接続を再利用できるかどうか
    ///
    /// ヘッダー完了後に意味を持つ。HTTP/1.1 は close がない限り keep-alive、
    /// HTTP/1.0 以前は明示的な keep-alive トークンが必要。
    /// EOF 終端ボディとアップグレードは常に接続を専有する。
    pub fn should_keep_alive(&self) -> bool {
        if self.flags.connection_close {
            return false;
        }
        if self.flags.upgrade {
            return false;
        }
        if self.message_needs_eof() {
            return false;
        }
        if self.http_major == 1 && self.http_minor >= 1 {
            return true;
        }
        self.flags.connection_keep_alive
    }

    /// ボディが接続終了でのみ区切られるメッセージかどうか
    ///
    /// レスポンスモードで、ボディを持ちうるステータスなのに
    /// Content-Length も chunked も確立されなかった場合のみ true。
    pub fn message_needs_eof(&self) -> bool {
        if self.mode == Mode::Request {
            return false;
        }
        if !self.headers_done {
            return false;
        }
        if self.flags.skip_body || self.flags.upgrade {
            return false;
        }
        if !Self::status_allows_body(self.status_code) {
            return false;
        }
        !(self.is_chunked || self.content_length.is_some())
    }

    /// ステータスコードがボディを持ちうるかどうか (1xx, 204, 304 は持たない)
    pub(crate) fn status_allows_body(status_code: u16) -> bool {
        !((100..200).contains(&status_code) || status_code == 204 || status_code == 304)
    }

    /// メッセージ単位の状態を初期化する (ハンドラー・設定・エラーは対象外)
    pub(crate) fn reinit_message(&mut self) {
        self.http_major = 0;
        self.http_minor = 0;
        self.method = None;
        self.method_buf.clear();
        self.pending_url.clear();
        self.status_code = 0;
        self.pending_status.clear();
        self.content_length = None;
        self.content_remaining = 0;
        self.chunk_remaining = 0;
        self.is_chunked = false;
        self.flags = Flags::default();
        self.headers_done = false;
        self.in_trailers = false;
        self.acc.clear();
        self.headers.clear();
        self.trailers.clear();
    }
}

//! バイトトークナイザーと文法検証
//!
//! 1 バイトずつ状態機械を前進させる (ボディデータのみ一括消費)。
//! 検証はトークナイザーと同じパスで行い、不正な入力は最初の違反バイトで
//! 拒否する。スパンが execute 呼び出しの境界で分断された場合は
//! 蓄積バッファに保持し、検証済みバイトを再走査することはない。

use crate::error::{Error, ErrorKind};
use crate::events::{Event, HeadersDirective};
use crate::method::Method;

use super::chars::{hex_value, is_field_vchar, is_token_char, is_url_char};
use super::state::State;
use super::{Mode, Parser};

/// "HTTP/" プレフィックス (バージョントークンの照合用)
const HTTP_NAME: &[u8; 5] = b"HTTP/";

/// メソッドトークンの最大長 (既知メソッドの最長は MKACTIVITY の 10 バイト)
const METHOD_MAX_LEN: usize = 16;

impl Parser {
    /// 状態機械を実行する
    ///
    /// 消費したバイト数を返す。成功時は全バイト、一時停止時は
    /// 停止位置までのバイト数。エラー時は違反バイトで停止し、
    /// 呼び出し側 (`execute`) が終端状態への遷移を行う。
    pub(crate) fn run(&mut self, data: &[u8]) -> Result<usize, Error> {
        let mut i = 0;

        while i < data.len() {
            let b = data[i];
            match self.state {
                State::Start => {
                    // メッセージ前の空行は読み飛ばす (RFC 9112 Section 2.2)
                    if b == b'\r' || b == b'\n' {
                        i += 1;
                        continue;
                    }
                    self.handlers.notify(Event::MessageBegin)?;
                    match self.mode {
                        Mode::Request => {
                            if !is_token_char(b) {
                                return Err(Error::new(
                                    ErrorKind::InvalidMethod,
                                    format!("invalid first character in method: 0x{:02X}", b),
                                ));
                            }
                            self.state = State::Method;
                        }
                        Mode::Response => {
                            if b != b'H' {
                                return Err(Error::new(
                                    ErrorKind::InvalidVersion,
                                    "status line must start with HTTP/",
                                ));
                            }
                            self.state = State::ResHttpName { pos: 1 };
                            i += 1;
                        }
                    }
                }

                State::Method => {
                    if is_token_char(b) {
                        if self.method_buf.len() >= METHOD_MAX_LEN {
                            return Err(Error::new(
                                ErrorKind::InvalidMethod,
                                "method token too long",
                            ));
                        }
                        self.method_buf.push(b);
                        i += 1;
                    } else if b == b' ' {
                        match Method::from_bytes(&self.method_buf) {
                            Some(method) => {
                                self.method = Some(method);
                                self.method_buf.clear();
                                self.state = State::UrlStart;
                                i += 1;
                            }
                            None => {
                                return Err(Error::new(
                                    ErrorKind::InvalidMethod,
                                    format!(
                                        "unknown method: {}",
                                        String::from_utf8_lossy(&self.method_buf)
                                    ),
                                ));
                            }
                        }
                    } else {
                        return Err(Error::new(
                            ErrorKind::InvalidMethod,
                            format!("invalid character in method: 0x{:02X}", b),
                        ));
                    }
                }

                State::UrlStart => {
                    if !is_url_char(b) {
                        return Err(Error::new(
                            ErrorKind::InvalidUrl,
                            format!("invalid first character in request-target: 0x{:02X}", b),
                        ));
                    }
                    self.state = State::Url;
                }

                State::Url => {
                    if is_url_char(b) {
                        self.pending_url.push(b);
                        i += 1;
                    } else if b == b' ' {
                        self.handlers.data(Event::Url, &self.pending_url)?;
                        self.pending_url.clear();
                        self.state = State::ReqHttpName { pos: 0 };
                        i += 1;
                    } else if b == b'\r' {
                        // バージョントークンなし: HTTP/0.9 簡易リクエスト
                        self.handlers.data(Event::Url, &self.pending_url)?;
                        self.pending_url.clear();
                        self.http_major = 0;
                        self.http_minor = 9;
                        self.state = State::Req09AlmostDone;
                        i += 1;
                    } else {
                        return Err(Error::new(
                            ErrorKind::InvalidUrl,
                            format!("invalid character in request-target: 0x{:02X}", b),
                        ));
                    }
                }

                State::Req09AlmostDone => {
                    if b != b'\n' {
                        return Err(Error::new(
                            ErrorKind::InvalidVersion,
                            "expected LF after CR in simple-request line",
                        ));
                    }
                    i += 1;
                    // HTTP/0.9 にヘッダーとボディはない
                    let pause = self.on_headers_done()?;
                    if pause || self.paused {
                        return Ok(i);
                    }
                }

                State::ReqHttpName { pos } => {
                    if b != HTTP_NAME[usize::from(pos)] {
                        return Err(Error::new(
                            ErrorKind::InvalidVersion,
                            "expected HTTP/ after request-target",
                        ));
                    }
                    i += 1;
                    if usize::from(pos) + 1 == HTTP_NAME.len() {
                        self.state = State::HttpMajor;
                    } else {
                        self.state = State::ReqHttpName { pos: pos + 1 };
                    }
                }

                State::ResHttpName { pos } => {
                    if b != HTTP_NAME[usize::from(pos)] {
                        return Err(Error::new(
                            ErrorKind::InvalidVersion,
                            "status line must start with HTTP/",
                        ));
                    }
                    i += 1;
                    if usize::from(pos) + 1 == HTTP_NAME.len() {
                        self.state = State::HttpMajor;
                    } else {
                        self.state = State::ResHttpName { pos: pos + 1 };
                    }
                }

                State::HttpMajor => {
                    if !b.is_ascii_digit() {
                        return Err(Error::new(
                            ErrorKind::InvalidVersion,
                            "HTTP major version must be a single digit",
                        ));
                    }
                    self.http_major = u16::from(b - b'0');
                    self.state = State::HttpDot;
                    i += 1;
                }

                State::HttpDot => {
                    if b != b'.' {
                        return Err(Error::new(
                            ErrorKind::InvalidVersion,
                            "expected '.' in HTTP version",
                        ));
                    }
                    self.state = State::HttpMinor;
                    i += 1;
                }

                State::HttpMinor => {
                    if !b.is_ascii_digit() {
                        return Err(Error::new(
                            ErrorKind::InvalidVersion,
                            "HTTP minor version must be a single digit",
                        ));
                    }
                    self.http_minor = u16::from(b - b'0');
                    self.state = State::HttpVersionDone;
                    i += 1;
                }

                State::HttpVersionDone => match self.mode {
                    Mode::Request => {
                        if b != b'\r' {
                            return Err(Error::new(
                                ErrorKind::InvalidVersion,
                                "expected CRLF after HTTP version",
                            ));
                        }
                        self.state = State::ReqLineAlmostDone;
                        i += 1;
                    }
                    Mode::Response => {
                        if b != b' ' {
                            return Err(Error::new(
                                ErrorKind::InvalidVersion,
                                "expected SP after HTTP version in status line",
                            ));
                        }
                        self.state = State::StatusCode { digits: 0 };
                        i += 1;
                    }
                },

                State::ReqLineAlmostDone => {
                    if b != b'\n' {
                        return Err(Error::new(
                            ErrorKind::InvalidVersion,
                            "expected LF after CR in request line",
                        ));
                    }
                    self.state = State::HeaderFieldStart;
                    i += 1;
                }

                State::StatusCode { digits } => {
                    if !b.is_ascii_digit() {
                        return Err(Error::new(
                            ErrorKind::InvalidVersion,
                            "status code must be three digits",
                        ));
                    }
                    self.status_code = self.status_code * 10 + u16::from(b - b'0');
                    i += 1;
                    if digits + 1 == 3 {
                        self.state = State::StatusCodeEnd;
                    } else {
                        self.state = State::StatusCode { digits: digits + 1 };
                    }
                }

                State::StatusCodeEnd => {
                    if b == b' ' {
                        self.state = State::Status;
                        i += 1;
                    } else if b == b'\r' {
                        // reason-phrase なし
                        self.handlers.data(Event::Status, &self.pending_status)?;
                        self.state = State::ResLineAlmostDone;
                        i += 1;
                    } else {
                        return Err(Error::new(
                            ErrorKind::InvalidVersion,
                            "expected SP or CRLF after status code",
                        ));
                    }
                }

                State::Status => {
                    if b == b'\r' {
                        self.handlers.data(Event::Status, &self.pending_status)?;
                        self.pending_status.clear();
                        self.state = State::ResLineAlmostDone;
                        i += 1;
                    } else if is_field_vchar(b) {
                        self.pending_status.push(b);
                        i += 1;
                    } else {
                        return Err(Error::new(
                            ErrorKind::InvalidVersion,
                            format!("invalid character in reason phrase: 0x{:02X}", b),
                        ));
                    }
                }

                State::ResLineAlmostDone => {
                    if b != b'\n' {
                        return Err(Error::new(
                            ErrorKind::InvalidVersion,
                            "expected LF after CR in status line",
                        ));
                    }
                    self.state = State::HeaderFieldStart;
                    i += 1;
                }

                State::HeaderFieldStart => {
                    if b == b'\r' {
                        self.state = State::HeadersAlmostDone;
                        i += 1;
                    } else if b == b'\n' && self.options.lenient_headers {
                        i += 1;
                        let pause = self.end_of_headers()?;
                        if pause || self.paused {
                            return Ok(i);
                        }
                    } else if b == b' ' || b == b'\t' {
                        return Err(Error::new(
                            ErrorKind::InvalidHeaderToken,
                            "obs-fold line continuation is not supported",
                        ));
                    } else if is_token_char(b) {
                        self.state = State::HeaderField;
                    } else {
                        return Err(Error::new(
                            ErrorKind::InvalidHeaderToken,
                            format!("invalid first character in header name: 0x{:02X}", b),
                        ));
                    }
                }

                State::HeaderField => {
                    if is_token_char(b) {
                        self.acc.push_field(b);
                        i += 1;
                    } else if b == b':' {
                        self.state = State::HeaderValueDiscardWs;
                        i += 1;
                    } else {
                        return Err(Error::new(
                            ErrorKind::InvalidHeaderToken,
                            format!("invalid character in header name: 0x{:02X}", b),
                        ));
                    }
                }

                State::HeaderValueDiscardWs => {
                    if b == b' ' || b == b'\t' {
                        i += 1;
                    } else if b == b'\r' {
                        self.state = State::HeaderValueAlmostDone;
                        i += 1;
                    } else if b == b'\n' {
                        if !self.options.lenient_headers {
                            return Err(Error::new(
                                ErrorKind::InvalidHeaderToken,
                                "bare LF as header line terminator",
                            ));
                        }
                        self.finish_header_line()?;
                        self.state = State::HeaderFieldStart;
                        i += 1;
                    } else if is_field_vchar(b) {
                        self.state = State::HeaderValue;
                    } else {
                        return Err(Error::new(
                            ErrorKind::InvalidHeaderToken,
                            format!("invalid character in header value: 0x{:02X}", b),
                        ));
                    }
                }

                State::HeaderValue => {
                    if b == b'\r' {
                        self.state = State::HeaderValueAlmostDone;
                        i += 1;
                    } else if b == b'\n' {
                        if !self.options.lenient_headers {
                            return Err(Error::new(
                                ErrorKind::InvalidHeaderToken,
                                "bare LF as header line terminator",
                            ));
                        }
                        self.finish_header_line()?;
                        self.state = State::HeaderFieldStart;
                        i += 1;
                    } else if is_field_vchar(b) {
                        self.acc.push_value(b);
                        i += 1;
                    } else {
                        return Err(Error::new(
                            ErrorKind::InvalidHeaderToken,
                            format!("invalid character in header value: 0x{:02X}", b),
                        ));
                    }
                }

                State::HeaderValueAlmostDone => {
                    if b != b'\n' {
                        return Err(Error::new(
                            ErrorKind::InvalidHeaderToken,
                            "expected LF after CR in header line",
                        ));
                    }
                    self.finish_header_line()?;
                    self.state = State::HeaderFieldStart;
                    i += 1;
                }

                State::HeadersAlmostDone => {
                    if b != b'\n' {
                        return Err(Error::new(
                            ErrorKind::InvalidHeaderToken,
                            "expected LF after CR at end of headers",
                        ));
                    }
                    i += 1;
                    let pause = self.end_of_headers()?;
                    if pause || self.paused {
                        return Ok(i);
                    }
                }

                State::BodyIdentity => {
                    let avail = data.len() - i;
                    let take = (self.content_remaining.min(avail as u64)) as usize;
                    self.handlers.data(Event::Body, &data[i..i + take])?;
                    i += take;
                    self.content_remaining -= take as u64;
                    if self.content_remaining == 0 {
                        self.dispatch_message_complete()?;
                    }
                }

                State::BodyIdentityEof => {
                    // 接続終了までのすべてがボディ
                    self.handlers.data(Event::Body, &data[i..])?;
                    i = data.len();
                }

                State::ChunkSizeStart => match hex_value(b) {
                    Some(v) => {
                        self.chunk_remaining = v;
                        self.state = State::ChunkSize;
                        i += 1;
                    }
                    None => {
                        return Err(Error::new(
                            ErrorKind::InvalidChunkSize,
                            format!("expected hex digit in chunk size: 0x{:02X}", b),
                        ));
                    }
                },

                State::ChunkSize => {
                    if let Some(v) = hex_value(b) {
                        self.chunk_remaining = self
                            .chunk_remaining
                            .checked_mul(16)
                            .and_then(|n| n.checked_add(v))
                            .ok_or_else(|| {
                                Error::new(ErrorKind::InvalidChunkSize, "chunk size overflow")
                            })?;
                        i += 1;
                    } else if b == b';' {
                        self.state = State::ChunkExt;
                        i += 1;
                    } else if b == b'\r' {
                        self.state = State::ChunkSizeAlmostDone;
                        i += 1;
                    } else {
                        return Err(Error::new(
                            ErrorKind::InvalidChunkSize,
                            format!("invalid character in chunk size: 0x{:02X}", b),
                        ));
                    }
                }

                State::ChunkExt => {
                    // チャンク拡張はトークン化するが解釈しない
                    if b == b'\r' {
                        self.state = State::ChunkSizeAlmostDone;
                        i += 1;
                    } else if b == b'\n' || b < 0x20 || b == 0x7F {
                        return Err(Error::new(
                            ErrorKind::InvalidChunkSize,
                            format!("invalid character in chunk extension: 0x{:02X}", b),
                        ));
                    } else {
                        i += 1;
                    }
                }

                State::ChunkSizeAlmostDone => {
                    if b != b'\n' {
                        return Err(Error::new(
                            ErrorKind::InvalidChunkSize,
                            "expected LF after CR in chunk size line",
                        ));
                    }
                    i += 1;
                    if self.chunk_remaining == 0 {
                        // 終端チャンク: トレーラーはヘッダーと同じ経路で蓄積する
                        self.in_trailers = true;
                        self.state = State::HeaderFieldStart;
                    } else {
                        self.state = State::ChunkData;
                    }
                }

                State::ChunkData => {
                    let avail = data.len() - i;
                    let take = (self.chunk_remaining.min(avail as u64)) as usize;
                    self.handlers.data(Event::Body, &data[i..i + take])?;
                    i += take;
                    self.chunk_remaining -= take as u64;
                    if self.chunk_remaining == 0 {
                        self.state = State::ChunkDataAlmostDone;
                    }
                }

                State::ChunkDataAlmostDone => {
                    if b != b'\r' {
                        return Err(Error::new(
                            ErrorKind::InvalidChunkSize,
                            "expected CRLF after chunk data",
                        ));
                    }
                    self.state = State::ChunkDataDone;
                    i += 1;
                }

                State::ChunkDataDone => {
                    if b != b'\n' {
                        return Err(Error::new(
                            ErrorKind::InvalidChunkSize,
                            "expected CRLF after chunk data",
                        ));
                    }
                    self.state = State::ChunkSizeStart;
                    i += 1;
                }

                State::MessageDone => {
                    // メッセージ間の空行は読み飛ばす
                    if b == b'\r' || b == b'\n' {
                        i += 1;
                        continue;
                    }
                    if !self.should_keep_alive() {
                        return Err(Error::new(
                            ErrorKind::SiblingMessageInProgress,
                            "new message on a connection that must close",
                        ));
                    }
                    self.reinit_message();
                    self.state = State::Start;
                }

                State::Dead => {
                    // execute が保存済みエラーで拒否するため到達しない
                    return Err(Error::new(
                        ErrorKind::Internal,
                        "state machine executed in dead state",
                    ));
                }
            }
        }

        Ok(i)
    }

    /// 完成したヘッダー行を処理する
    ///
    /// イベントは再構成済みの完全なトークンで 1 回だけ発火する。
    /// フレーミングヘッダーの検証はイベント配送より先に行う。
    ///
    /// 値は obs-text (0x80-0xFF) を含みうるため、イベントには生のバイト列を
    /// そのまま渡す。マップへは UTF-8 として解釈できないバイトを置換した
    /// 文字列で格納する (バイト単位の検証はトークナイザー側で済んでいる)。
    fn finish_header_line(&mut self) -> Result<(), Error> {
        let (field, value) = self.acc.take_pair();
        let name = String::from_utf8(field)
            .map_err(|_| Error::new(ErrorKind::Internal, "header name is not ASCII"))?;
        let lower = name.to_ascii_lowercase();
        let value_str = String::from_utf8_lossy(&value).into_owned();

        if !self.in_trailers {
            self.check_special_header(&lower, &value_str)?;
        }

        self.handlers.data(Event::HeaderField, name.as_bytes())?;
        self.handlers.data(Event::HeaderValue, &value)?;

        if self.in_trailers {
            self.trailers.append(lower, value_str);
        } else {
            self.headers.append(lower, value_str);
        }
        Ok(())
    }

    /// フレーミング・接続制御ヘッダーを検証してフラグに反映する
    ///
    /// `name` は小文字正規化済み。Content-Length と chunked の競合は
    /// ボディバイトを処理する前、観測した行の時点で拒否する。
    fn check_special_header(&mut self, name: &str, value: &str) -> Result<(), Error> {
        match name {
            "content-length" => {
                if self.is_chunked {
                    return Err(Error::new(
                        ErrorKind::UnexpectedContentLength,
                        "Content-Length with chunked Transfer-Encoding",
                    ));
                }
                let parsed = parse_content_length(value)?;
                if let Some(prev) = self.content_length {
                    if prev != parsed {
                        return Err(Error::new(
                            ErrorKind::InvalidContentLength,
                            "mismatched duplicate Content-Length",
                        ));
                    }
                }
                self.content_length = Some(parsed);
            }
            "transfer-encoding" => {
                // RFC 9112 Section 6: HTTP/1.0 に Transfer-Encoding は定義されない
                if self.http_major == 1 && self.http_minor == 0 {
                    return Err(Error::new(
                        ErrorKind::InvalidHeaderToken,
                        "Transfer-Encoding is not defined in HTTP/1.0",
                    ));
                }
                for token in value.split(',') {
                    let token = token.trim();
                    if token.is_empty() {
                        return Err(Error::new(
                            ErrorKind::InvalidHeaderToken,
                            "empty Transfer-Encoding token",
                        ));
                    }
                    if token.eq_ignore_ascii_case("chunked") {
                        if self.is_chunked {
                            return Err(Error::new(
                                ErrorKind::InvalidHeaderToken,
                                "duplicate chunked Transfer-Encoding",
                            ));
                        }
                        if self.content_length.is_some() {
                            return Err(Error::new(
                                ErrorKind::UnexpectedContentLength,
                                "chunked Transfer-Encoding with Content-Length",
                            ));
                        }
                        self.is_chunked = true;
                    } else {
                        return Err(Error::new(
                            ErrorKind::InvalidHeaderToken,
                            format!("unsupported transfer coding: {}", token),
                        ));
                    }
                }
            }
            "connection" => {
                for token in value.split(',') {
                    let token = token.trim();
                    if token.eq_ignore_ascii_case("close") {
                        self.flags.connection_close = true;
                    } else if token.eq_ignore_ascii_case("keep-alive") {
                        self.flags.connection_keep_alive = true;
                    } else if token.eq_ignore_ascii_case("upgrade") {
                        self.flags.connection_upgrade = true;
                    }
                }
            }
            "upgrade" => {
                self.flags.upgrade_header = true;
            }
            _ => {}
        }
        Ok(())
    }

    /// ヘッダー終端 (またはトレーラー終端) を処理する
    ///
    /// 一時停止すべきときは true を返す。
    fn end_of_headers(&mut self) -> Result<bool, Error> {
        if self.in_trailers {
            self.dispatch_message_complete()?;
            Ok(false)
        } else {
            self.on_headers_done()
        }
    }

    /// ヘッダー完了を処理してボディフレーミングを決定する
    ///
    /// 一時停止すべきとき (SkipBodyAndPause またはアップグレード確定) は
    /// true を返す。
    fn on_headers_done(&mut self) -> Result<bool, Error> {
        // 蓄積中のペアは必ずヘッダーフェーズを出る前にフラッシュする
        if self.acc.has_field() {
            self.finish_header_line()?;
        }
        self.headers_done = true;

        let directive = self.handlers.headers_complete()?;
        match directive {
            HeadersDirective::SkipBody | HeadersDirective::SkipBodyAndPause => {
                self.flags.skip_body = true;
            }
            HeadersDirective::Normal => {}
        }

        // アップグレード確定: ボディはなく、以降のバイトは HTTP ではない。
        // メッセージを完了して一時停止し、残りのバイトを呼び出し側に委ねる。
        let upgrade = match self.mode {
            Mode::Request => {
                self.method == Some(Method::Connect)
                    || (self.flags.connection_upgrade && self.flags.upgrade_header)
            }
            Mode::Response => self.status_code == 101,
        };
        if upgrade {
            self.flags.upgrade = true;
            self.dispatch_message_complete()?;
            self.paused = true;
            return Ok(true);
        }

        if self.flags.skip_body {
            self.dispatch_message_complete()?;
            if directive == HeadersDirective::SkipBodyAndPause {
                self.paused = true;
                return Ok(true);
            }
            return Ok(false);
        }

        match self.mode {
            Mode::Request => {
                if self.is_chunked {
                    self.state = State::ChunkSizeStart;
                } else if let Some(len) = self.content_length {
                    if len == 0 {
                        self.dispatch_message_complete()?;
                    } else {
                        self.content_remaining = len;
                        self.state = State::BodyIdentity;
                    }
                } else {
                    // フレーミングヘッダーのないリクエストにボディはない
                    self.dispatch_message_complete()?;
                }
            }
            Mode::Response => {
                if !Self::status_allows_body(self.status_code) {
                    self.dispatch_message_complete()?;
                } else if self.is_chunked {
                    self.state = State::ChunkSizeStart;
                } else if let Some(len) = self.content_length {
                    if len == 0 {
                        self.dispatch_message_complete()?;
                    } else {
                        self.content_remaining = len;
                        self.state = State::BodyIdentity;
                    }
                } else {
                    // フレーミングなし: 接続終了までがボディ (close-delimited)
                    self.state = State::BodyIdentityEof;
                }
            }
        }
        Ok(false)
    }

    /// message_complete を配送して完了状態へ遷移する
    pub(crate) fn dispatch_message_complete(&mut self) -> Result<(), Error> {
        self.state = State::MessageDone;
        self.handlers.notify(Event::MessageComplete)
    }
}

/// Content-Length 値をパースする
///
/// 非負 10 進整数のみ。符号・空白・数字以外の文字・u64 超過は
/// `InvalidContentLength`。
fn parse_content_length(value: &str) -> Result<u64, Error> {
    if value.is_empty() {
        return Err(Error::new(
            ErrorKind::InvalidContentLength,
            "empty Content-Length value",
        ));
    }
    let mut result: u64 = 0;
    for b in value.bytes() {
        if !b.is_ascii_digit() {
            return Err(Error::new(
                ErrorKind::InvalidContentLength,
                format!("invalid character in Content-Length: 0x{:02X}", b),
            ));
        }
        result = result
            .checked_mul(10)
            .and_then(|n| n.checked_add(u64::from(b - b'0')))
            .ok_or_else(|| {
                Error::new(ErrorKind::InvalidContentLength, "Content-Length overflow")
            })?;
    }
    Ok(result)
}

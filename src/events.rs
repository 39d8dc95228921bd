//! イベント定義とハンドラー配送
//!
//! パーサーが発行する 8 種類のイベントと、登録済みハンドラーへの
//! 同期配送を提供する。ハンドラーは `execute` を呼び出したスレッド上で
//! そのまま呼ばれる (遅延・非同期配送はしない)。

use std::fmt;

use crate::error::{Error, ErrorKind};

/// パーサーが発行するイベント
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
    /// メッセージ開始 (ペイロードなし)
    MessageBegin,
    /// リクエストターゲット (リクエストのみ)
    Url,
    /// ステータス行の reason-phrase (レスポンスのみ)
    Status,
    /// ヘッダーフィールド名 (完全なトークン)
    HeaderField,
    /// ヘッダー値 (完全なトークン)
    HeaderValue,
    /// ヘッダー完了 (制御指示を返せる)
    HeadersComplete,
    /// ボディデータ (到着に応じて分割されうる)
    Body,
    /// メッセージ完了 (ペイロードなし)
    MessageComplete,
}

impl Event {
    /// 全イベント
    pub const ALL: [Event; 8] = [
        Event::MessageBegin,
        Event::Url,
        Event::Status,
        Event::HeaderField,
        Event::HeaderValue,
        Event::HeadersComplete,
        Event::Body,
        Event::MessageComplete,
    ];

    /// イベント名を取得
    pub fn name(&self) -> &'static str {
        match self {
            Event::MessageBegin => "message_begin",
            Event::Url => "url",
            Event::Status => "status",
            Event::HeaderField => "header_field",
            Event::HeaderValue => "header_value",
            Event::HeadersComplete => "headers_complete",
            Event::Body => "body",
            Event::MessageComplete => "message_complete",
        }
    }

    /// イベント名からイベントを取得
    ///
    /// 未知の名前は `InvalidArgument` エラー (パーサー本体のエラーではなく
    /// 呼び出し側の誤り)。
    pub fn from_name(name: &str) -> Result<Event, Error> {
        match name {
            "message_begin" => Ok(Event::MessageBegin),
            "url" => Ok(Event::Url),
            "status" => Ok(Event::Status),
            "header_field" => Ok(Event::HeaderField),
            "header_value" => Ok(Event::HeaderValue),
            "headers_complete" => Ok(Event::HeadersComplete),
            "body" => Ok(Event::Body),
            "message_complete" => Ok(Event::MessageComplete),
            _ => Err(Error::new(
                ErrorKind::InvalidArgument,
                format!("unknown event name: {}", name),
            )),
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// `headers_complete` ハンドラーが返す制御指示
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeadersDirective {
    /// 通常どおりボディをパースする
    #[default]
    Normal,
    /// ボディを読まずに message_complete へ遷移する (HEAD レスポンス等)
    SkipBody,
    /// SkipBody に加えてパーサーを一時停止する
    SkipBodyAndPause,
}

type NotifyFn = Box<dyn FnMut() -> Result<(), String>>;
type DataFn = Box<dyn FnMut(&[u8]) -> Result<(), String>>;
type HeadersCompleteFn = Box<dyn FnMut() -> Result<HeadersDirective, String>>;

/// イベントハンドラー
///
/// イベントごとにシグネチャが異なるため 3 形態を持つ。
/// `Err(reason)` を返すとパースは `UserCallback` エラーで中断され、
/// reason がそのままエラーに保存される。
pub enum Handler {
    /// ペイロードなしイベント用 (message_begin, message_complete)
    Notify(NotifyFn),
    /// バイト列ペイロードイベント用 (url, status, header_field, header_value, body)
    Data(DataFn),
    /// headers_complete 用 (制御指示を返す)
    HeadersComplete(HeadersCompleteFn),
}

impl Handler {
    /// ペイロードなしハンドラーを作成
    pub fn notify(f: impl FnMut() -> Result<(), String> + 'static) -> Self {
        Handler::Notify(Box::new(f))
    }

    /// バイト列ペイロードハンドラーを作成
    pub fn data(f: impl FnMut(&[u8]) -> Result<(), String> + 'static) -> Self {
        Handler::Data(Box::new(f))
    }

    /// headers_complete ハンドラーを作成
    pub fn headers_complete(f: impl FnMut() -> Result<HeadersDirective, String> + 'static) -> Self {
        Handler::HeadersComplete(Box::new(f))
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handler::Notify(_) => f.write_str("Handler::Notify"),
            Handler::Data(_) => f.write_str("Handler::Data"),
            Handler::HeadersComplete(_) => f.write_str("Handler::HeadersComplete"),
        }
    }
}

/// 登録済みハンドラーの保管と配送
#[derive(Default)]
pub(crate) struct Handlers {
    message_begin: Option<NotifyFn>,
    url: Option<DataFn>,
    status: Option<DataFn>,
    header_field: Option<DataFn>,
    header_value: Option<DataFn>,
    headers_complete: Option<HeadersCompleteFn>,
    body: Option<DataFn>,
    message_complete: Option<NotifyFn>,
}

impl Handlers {
    /// ハンドラーを登録
    ///
    /// イベントとハンドラー形態が一致しない場合は `InvalidArgument`。
    pub(crate) fn set(&mut self, event: Event, handler: Handler) -> Result<(), Error> {
        match (event, handler) {
            (Event::MessageBegin, Handler::Notify(f)) => self.message_begin = Some(f),
            (Event::MessageComplete, Handler::Notify(f)) => self.message_complete = Some(f),
            (Event::Url, Handler::Data(f)) => self.url = Some(f),
            (Event::Status, Handler::Data(f)) => self.status = Some(f),
            (Event::HeaderField, Handler::Data(f)) => self.header_field = Some(f),
            (Event::HeaderValue, Handler::Data(f)) => self.header_value = Some(f),
            (Event::Body, Handler::Data(f)) => self.body = Some(f),
            (Event::HeadersComplete, Handler::HeadersComplete(f)) => self.headers_complete = Some(f),
            (event, handler) => {
                return Err(Error::new(
                    ErrorKind::InvalidArgument,
                    format!("handler shape {:?} does not match event {}", handler, event),
                ));
            }
        }
        Ok(())
    }

    /// ハンドラーを解除
    pub(crate) fn remove(&mut self, event: Event) {
        match event {
            Event::MessageBegin => self.message_begin = None,
            Event::Url => self.url = None,
            Event::Status => self.status = None,
            Event::HeaderField => self.header_field = None,
            Event::HeaderValue => self.header_value = None,
            Event::HeadersComplete => self.headers_complete = None,
            Event::Body => self.body = None,
            Event::MessageComplete => self.message_complete = None,
        }
    }

    /// ペイロードなしイベントを配送
    pub(crate) fn notify(&mut self, event: Event) -> Result<(), Error> {
        let slot = match event {
            Event::MessageBegin => &mut self.message_begin,
            Event::MessageComplete => &mut self.message_complete,
            _ => {
                return Err(Error::new(
                    ErrorKind::Internal,
                    format!("notify dispatch for payload event {}", event),
                ));
            }
        };
        if let Some(f) = slot {
            f().map_err(|reason| user_callback_error(event, &reason))?;
        }
        Ok(())
    }

    /// バイト列ペイロードイベントを配送
    pub(crate) fn data(&mut self, event: Event, payload: &[u8]) -> Result<(), Error> {
        let slot = match event {
            Event::Url => &mut self.url,
            Event::Status => &mut self.status,
            Event::HeaderField => &mut self.header_field,
            Event::HeaderValue => &mut self.header_value,
            Event::Body => &mut self.body,
            _ => {
                return Err(Error::new(
                    ErrorKind::Internal,
                    format!("data dispatch for non-payload event {}", event),
                ));
            }
        };
        if let Some(f) = slot {
            f(payload).map_err(|reason| user_callback_error(event, &reason))?;
        }
        Ok(())
    }

    /// headers_complete イベントを配送して制御指示を受け取る
    pub(crate) fn headers_complete(&mut self) -> Result<HeadersDirective, Error> {
        match &mut self.headers_complete {
            Some(f) => f().map_err(|reason| user_callback_error(Event::HeadersComplete, &reason)),
            None => Ok(HeadersDirective::Normal),
        }
    }
}

impl fmt::Debug for Handlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handlers")
            .field("message_begin", &self.message_begin.is_some())
            .field("url", &self.url.is_some())
            .field("status", &self.status.is_some())
            .field("header_field", &self.header_field.is_some())
            .field("header_value", &self.header_value.is_some())
            .field("headers_complete", &self.headers_complete.is_some())
            .field("body", &self.body.is_some())
            .field("message_complete", &self.message_complete.is_some())
            .finish()
    }
}

/// ハンドラー失敗を UserCallback エラーへ変換
///
/// 入力不正 (文法エラー) と呼び出し側コードの失敗を区別できるよう、
/// イベント名と報告された原因を理由に残す。
fn user_callback_error(event: Event, reason: &str) -> Error {
    Error::new(
        ErrorKind::UserCallback,
        format!("{} handler failed: {}", event.name(), reason),
    )
}

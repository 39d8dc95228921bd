//! HTTP メソッド定義
//!
//! llhttp と同様に既知のメソッドのみを受理する。
//! 未知のトークンはリクエストラインのパース時に `InvalidMethod` となる。

use std::fmt;

/// HTTP メソッド
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Delete,
    Connect,
    Options,
    Trace,
    Patch,
    // WebDAV (RFC 4918 / RFC 3253)
    Propfind,
    Proppatch,
    Mkcol,
    Copy,
    Move,
    Lock,
    Unlock,
    Report,
    Mkactivity,
    Checkout,
    Merge,
    // その他広く使われる拡張
    Search,
    Purge,
    Link,
    Unlink,
}

impl Method {
    /// メソッド名のバイト列からメソッドを取得
    ///
    /// 大文字完全一致のみ。未知のトークンは `None`。
    pub fn from_bytes(bytes: &[u8]) -> Option<Method> {
        match bytes {
            b"GET" => Some(Method::Get),
            b"HEAD" => Some(Method::Head),
            b"POST" => Some(Method::Post),
            b"PUT" => Some(Method::Put),
            b"DELETE" => Some(Method::Delete),
            b"CONNECT" => Some(Method::Connect),
            b"OPTIONS" => Some(Method::Options),
            b"TRACE" => Some(Method::Trace),
            b"PATCH" => Some(Method::Patch),
            b"PROPFIND" => Some(Method::Propfind),
            b"PROPPATCH" => Some(Method::Proppatch),
            b"MKCOL" => Some(Method::Mkcol),
            b"COPY" => Some(Method::Copy),
            b"MOVE" => Some(Method::Move),
            b"LOCK" => Some(Method::Lock),
            b"UNLOCK" => Some(Method::Unlock),
            b"REPORT" => Some(Method::Report),
            b"MKACTIVITY" => Some(Method::Mkactivity),
            b"CHECKOUT" => Some(Method::Checkout),
            b"MERGE" => Some(Method::Merge),
            b"SEARCH" => Some(Method::Search),
            b"PURGE" => Some(Method::Purge),
            b"LINK" => Some(Method::Link),
            b"UNLINK" => Some(Method::Unlink),
            _ => None,
        }
    }

    /// メソッド名を取得
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Connect => "CONNECT",
            Method::Options => "OPTIONS",
            Method::Trace => "TRACE",
            Method::Patch => "PATCH",
            Method::Propfind => "PROPFIND",
            Method::Proppatch => "PROPPATCH",
            Method::Mkcol => "MKCOL",
            Method::Copy => "COPY",
            Method::Move => "MOVE",
            Method::Lock => "LOCK",
            Method::Unlock => "UNLOCK",
            Method::Report => "REPORT",
            Method::Mkactivity => "MKACTIVITY",
            Method::Checkout => "CHECKOUT",
            Method::Merge => "MERGE",
            Method::Search => "SEARCH",
            Method::Purge => "PURGE",
            Method::Link => "LINK",
            Method::Unlink => "UNLINK",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//! # shiguredo_http1_parser
//!
//! 依存なしのインクリメンタル HTTP/1.x パーサー (Sans I/O)
//!
//! ## 特徴
//!
//! - **依存なし**: 標準ライブラリのみ使用
//! - **Sans I/O**: I/O を完全に分離した設計
//! - **インクリメンタル**: 任意のバイト境界で分断された入力を扱える
//! - **コールバック駆動**: メッセージを再構築せず、構造イベントを
//!   パース中に同期配送する
//!
//! ## 使い方
//!
//! ### リクエストのパース (サーバー側)
//!
//! ```rust
//! use shiguredo_http1_parser::{Event, Handler, Parser};
//!
//! let mut parser = Parser::request();
//! parser
//!     .on(Event::Url, Handler::data(|url| {
//!         println!("url: {}", String::from_utf8_lossy(url));
//!         Ok(())
//!     }))
//!     .unwrap();
//! parser
//!     .on(Event::Body, Handler::data(|chunk| {
//!         println!("body chunk: {} bytes", chunk.len());
//!         Ok(())
//!     }))
//!     .unwrap();
//!
//! let input = b"POST /upload HTTP/1.1\r\nContent-Length: 5\r\n\r\nhello";
//! let consumed = parser.execute(input).unwrap();
//! assert_eq!(consumed, input.len());
//! assert_eq!(parser.method_name(), Some("POST"));
//! ```
//!
//! ### レスポンスのパース (クライアント側)
//!
//! ```rust
//! use shiguredo_http1_parser::Parser;
//!
//! let mut parser = Parser::response();
//! parser
//!     .execute(b"HTTP/1.1 204 No Content\r\nServer: sora\r\n\r\n")
//!     .unwrap();
//! assert_eq!(parser.status_code(), 204);
//! assert_eq!(parser.headers().get_str("server"), Some("sora"));
//! ```
//!
//! 入力は分断されていてもよい。イベント列は分断位置に依存しない:
//!
//! ```rust
//! use shiguredo_http1_parser::Parser;
//!
//! let mut parser = Parser::request();
//! parser.execute(b"GET /he").unwrap();
//! parser.execute(b"llo HTTP/1.1\r\n").unwrap();
//! parser.execute(b"\r\n").unwrap();
//! assert_eq!(parser.http_minor(), 1);
//! ```

mod error;
mod events;
mod headers;
mod method;
mod options;
mod parser;

pub use error::{Error, ErrorKind};
pub use events::{Event, Handler, HeadersDirective};
pub use headers::{HeaderEntry, HeaderMap};
pub use method::Method;
pub use options::ParserOptions;
pub use parser::{Mode, Parser};

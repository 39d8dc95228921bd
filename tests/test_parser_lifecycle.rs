//! パーサーのライフサイクルのテスト
//!
//! 一時停止・再開・リセット・ストリーム終端・接続再利用・アップグレードの
//! 組み合わせを確認する。これらは「部分的な入力」「外部からの制御」が
//! 絡む動作であり、状態機械単体の文法テストではカバーできない。
//!
//! ## エラーの粘着性について
//!
//! 終端エラー (文法違反・ハンドラー失敗など) を返したパーサーは、reset
//! されるまですべての execute / finish を同じエラーで拒否する。
//! 呼び出し側がエラーを無視して入力を流し続けても、壊れた位置以降の
//! バイトが誤って解釈されることはない。一時停止 (`Paused`) と引数誤り
//! (`InvalidArgument`) だけは終端ではなく、パーサー状態を壊さない。

use std::cell::RefCell;
use std::rc::Rc;

use shiguredo_http1_parser::{
    ErrorKind, Event, Handler, HeadersDirective, Method, Parser,
};

#[test]
fn pause_and_resume_mid_stream() {
    let mut parser = Parser::request();
    parser
        .on(
            Event::HeadersComplete,
            Handler::headers_complete(|| Ok(HeadersDirective::SkipBodyAndPause)),
        )
        .unwrap();

    let input = b"HEAD / HTTP/1.1\r\nHost: a\r\n\r\nGET / HTTP/1.1\r\n\r\n";
    let consumed = parser.execute(input).unwrap();

    // ヘッダー終端の LF まで消費して停止する
    let first_len = b"HEAD / HTTP/1.1\r\nHost: a\r\n\r\n".len();
    assert_eq!(consumed, first_len);
    assert!(parser.is_paused());

    // 一時停止中の execute は 1 バイトも消費しない
    let err = parser.execute(&input[consumed..]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Paused);
    assert!(!err.kind().is_fatal());

    // 再開後は停止位置から正確に続きをパースする
    parser.resume();
    let rest = parser.execute(&input[consumed..]).unwrap();
    assert_eq!(rest, input.len() - first_len);
    assert_eq!(parser.method(), Some(Method::Get));
}

#[test]
fn external_pause_before_execute() {
    let mut parser = Parser::request();
    parser.pause();
    let err = parser.execute(b"GET / HTTP/1.1\r\n\r\n").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Paused);

    parser.resume();
    parser.execute(b"GET / HTTP/1.1\r\n\r\n").unwrap();
    assert_eq!(parser.method(), Some(Method::Get));
}

#[test]
fn skip_body_directive_ignores_declared_body() {
    // HEAD レスポンス: Content-Length があってもボディは届かない
    let body_seen = Rc::new(RefCell::new(false));
    let mut parser = Parser::response();
    parser
        .on(
            Event::HeadersComplete,
            Handler::headers_complete(|| Ok(HeadersDirective::SkipBody)),
        )
        .unwrap();
    let b = Rc::clone(&body_seen);
    parser
        .on(
            Event::Body,
            Handler::data(move |_| {
                *b.borrow_mut() = true;
                Ok(())
            }),
        )
        .unwrap();

    parser
        .execute(b"HTTP/1.1 200 OK\r\nContent-Length: 1234\r\n\r\n")
        .unwrap();
    assert!(!*body_seen.borrow());
    assert_eq!(parser.content_length(), Some(1234));
}

#[test]
fn fatal_error_is_sticky_until_reset() {
    let mut parser = Parser::request();
    let err = parser.execute(b"GE T / HTTP/1.1\r\n\r\n").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidMethod);
    assert!(err.kind().is_fatal());

    // 以降の入力は同じエラーで拒否される
    let err = parser.execute(b"GET / HTTP/1.1\r\n\r\n").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidMethod);
    let err = parser.finish().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidMethod);
    assert!(parser.error().is_some());

    // reset が唯一の回復手段
    parser.reset();
    assert!(parser.error().is_none());
    parser.execute(b"GET / HTTP/1.1\r\n\r\n").unwrap();
    assert_eq!(parser.method(), Some(Method::Get));
}

#[test]
fn handler_failure_reports_user_callback() {
    let mut parser = Parser::request();
    parser
        .on(
            Event::Url,
            Handler::data(|_| Err("path rejected".to_string())),
        )
        .unwrap();
    let err = parser.execute(b"GET /forbidden HTTP/1.1\r\n\r\n").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UserCallback);
    assert!(err.reason().contains("path rejected"));
    assert!(err.kind().is_fatal());
}

#[test]
fn finish_mid_message_is_closed_connection() {
    let mut parser = Parser::response();
    parser
        .execute(b"HTTP/1.1 200 OK\r\nContent-Length: 10\r\n\r\nhel")
        .unwrap();
    let err = parser.finish().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ClosedConnection);
}

#[test]
fn finish_between_messages_is_ok() {
    let mut parser = Parser::request();
    parser.finish().unwrap();

    parser.execute(b"GET / HTTP/1.1\r\n\r\n").unwrap();
    parser.finish().unwrap();
}

#[test]
fn pipelined_requests_on_keep_alive() {
    let begins = Rc::new(RefCell::new(0));
    let mut parser = Parser::request();
    let b = Rc::clone(&begins);
    parser
        .on(
            Event::MessageBegin,
            Handler::notify(move || {
                *b.borrow_mut() += 1;
                Ok(())
            }),
        )
        .unwrap();

    let input = b"GET /a HTTP/1.1\r\nHost: x\r\n\r\nGET /b HTTP/1.1\r\nHost: x\r\n\r\n";
    assert_eq!(parser.execute(input).unwrap(), input.len());
    assert_eq!(*begins.borrow(), 2);
    // 2 通目のメッセージの状態が見える
    assert_eq!(parser.headers().get_str("host"), Some("x"));
}

#[test]
fn sibling_message_after_close_is_rejected() {
    let mut parser = Parser::request();
    parser
        .execute(b"GET /a HTTP/1.0\r\nConnection: close\r\n\r\n")
        .unwrap();
    assert!(!parser.should_keep_alive());

    let err = parser.execute(b"GET /b HTTP/1.0\r\n\r\n").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SiblingMessageInProgress);
}

#[test]
fn keep_alive_defaults_by_version() {
    // HTTP/1.1 は既定で keep-alive
    let mut parser = Parser::request();
    parser.execute(b"GET / HTTP/1.1\r\nHost: a\r\n\r\n").unwrap();
    assert!(parser.should_keep_alive());

    // HTTP/1.1 + Connection: close
    let mut parser = Parser::request();
    parser
        .execute(b"GET / HTTP/1.1\r\nConnection: close\r\n\r\n")
        .unwrap();
    assert!(!parser.should_keep_alive());

    // HTTP/1.0 は既定で close
    let mut parser = Parser::request();
    parser.execute(b"GET / HTTP/1.0\r\n\r\n").unwrap();
    assert!(!parser.should_keep_alive());

    // HTTP/1.0 + Connection: keep-alive
    let mut parser = Parser::request();
    parser
        .execute(b"GET / HTTP/1.0\r\nConnection: keep-alive\r\n\r\n")
        .unwrap();
    assert!(parser.should_keep_alive());
}

#[test]
fn upgrade_pauses_after_headers() {
    let mut parser = Parser::request();
    let input = b"GET /chat HTTP/1.1\r\nConnection: Upgrade\r\nUpgrade: websocket\r\n\r\n\x88\x00";
    let consumed = parser.execute(input).unwrap();

    // ヘッダー終端までで停止し、以降のバイトには触れない
    assert_eq!(consumed, input.len() - 2);
    assert!(parser.is_upgrade());
    assert!(parser.is_paused());
    assert!(!parser.should_keep_alive());
}

#[test]
fn connect_request_pauses_after_headers() {
    let mut parser = Parser::request();
    let input = b"CONNECT example.com:443 HTTP/1.1\r\nHost: example.com:443\r\n\r\n";
    assert_eq!(parser.execute(input).unwrap(), input.len());
    assert_eq!(parser.method(), Some(Method::Connect));
    assert!(parser.is_upgrade());
    assert!(parser.is_paused());
}

#[test]
fn switching_protocols_response_pauses() {
    let mut parser = Parser::response();
    let input =
        b"HTTP/1.1 101 Switching Protocols\r\nUpgrade: websocket\r\nConnection: Upgrade\r\n\r\n";
    assert_eq!(parser.execute(input).unwrap(), input.len());
    assert_eq!(parser.status_code(), 101);
    assert!(parser.is_upgrade());
    assert!(parser.is_paused());
}

#[test]
fn reset_allows_reuse_with_same_handlers() {
    let urls = Rc::new(RefCell::new(Vec::new()));
    let mut parser = Parser::request();
    let u = Rc::clone(&urls);
    parser
        .on(
            Event::Url,
            Handler::data(move |url| {
                u.borrow_mut().push(String::from_utf8_lossy(url).into_owned());
                Ok(())
            }),
        )
        .unwrap();

    parser.execute(b"GET /first HTTP/1.1\r\n\r\n").unwrap();
    parser.reset();
    parser.execute(b"GET /second HTTP/1.1\r\n\r\n").unwrap();

    assert_eq!(*urls.borrow(), vec!["/first", "/second"]);
}

#[test]
fn off_unregisters_handler() {
    let seen = Rc::new(RefCell::new(0));
    let mut parser = Parser::request();
    let s = Rc::clone(&seen);
    parser
        .on(
            Event::Url,
            Handler::data(move |_| {
                *s.borrow_mut() += 1;
                Ok(())
            }),
        )
        .unwrap();
    parser.off(Event::Url);

    parser.execute(b"GET / HTTP/1.1\r\n\r\n").unwrap();
    assert_eq!(*seen.borrow(), 0);
}

#[test]
fn handler_shape_mismatch_is_invalid_argument() {
    let mut parser = Parser::request();
    let err = parser
        .on(Event::MessageBegin, Handler::data(|_| Ok(())))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert!(!err.kind().is_fatal());

    // InvalidArgument はパーサー状態を壊さない
    parser.execute(b"GET / HTTP/1.1\r\n\r\n").unwrap();
}

#[test]
fn grammar_errors_at_first_offending_byte() {
    let cases: [(&[u8], ErrorKind); 6] = [
        (b"FROBNICATE / HTTP/1.1\r\n\r\n", ErrorKind::InvalidMethod),
        (b"GET /a<b HTTP/1.1\r\n\r\n", ErrorKind::InvalidUrl),
        (b"GET / HTTP/1.x\r\n\r\n", ErrorKind::InvalidVersion),
        (b"GET / PTTH/1.1\r\n\r\n", ErrorKind::InvalidVersion),
        (b"GET / HTTP/1.1\r\nBad Header: v\r\n\r\n", ErrorKind::InvalidHeaderToken),
        (b"GET / HTTP/1.1\r\nNoColonHere\r\n\r\n", ErrorKind::InvalidHeaderToken),
    ];
    for (input, kind) in cases {
        let mut parser = Parser::request();
        let err = parser.execute(input).unwrap_err();
        assert_eq!(err.kind(), kind, "{:?}", String::from_utf8_lossy(input));
    }
}

#[test]
fn invalid_chunk_size_is_rejected() {
    let mut parser = Parser::request();
    let err = parser
        .execute(b"POST / HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\nzz\r\n")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidChunkSize);

    // チャンクサイズの u64 オーバーフロー
    let mut parser = Parser::request();
    let err = parser
        .execute(b"POST / HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\nFFFFFFFFFFFFFFFFF\r\n")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidChunkSize);
}

#[test]
fn transfer_encoding_rejected_for_http10() {
    let mut parser = Parser::request();
    let err = parser
        .execute(b"POST / HTTP/1.0\r\nTransfer-Encoding: chunked\r\n\r\n")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidHeaderToken);
}

#[test]
fn pending_buffer_len_tracks_partial_tokens() {
    let mut parser = Parser::request();
    assert_eq!(parser.pending_buffer_len(), 0);

    parser.execute(b"GET /a/very/long/pa").unwrap();
    // URL の途中: 蓄積バッファに溜まっている
    assert!(parser.pending_buffer_len() >= b"/a/very/long/pa".len());

    parser.execute(b"th HTTP/1.1\r\nHost: exa").unwrap();
    assert!(parser.pending_buffer_len() > 0);

    parser.execute(b"mple.com\r\n\r\n").unwrap();
    assert_eq!(parser.pending_buffer_len(), 0);
}

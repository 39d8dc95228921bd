//! PBT テスト共通ユーティリティ
//!
//! 有効な HTTP/1.1 メッセージの生成器。パーサーに与える入力と、
//! パース後に観測されるべき値 (小文字名・OWS 除去済み値・ボディ) を
//! 同時に生成する。

use proptest::prelude::*;

// ========================================
// トークン生成 (RFC 9110)
// ========================================

/// フレーミング・接続制御に使われる名前 (生成対象から除外する)
const RESERVED_HEADER_NAMES: [&str; 4] =
    ["content-length", "transfer-encoding", "connection", "upgrade"];

/// リクエストメソッド (既知メソッドのみ)
pub fn method() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("GET"),
        Just("HEAD"),
        Just("POST"),
        Just("PUT"),
        Just("DELETE"),
        Just("OPTIONS"),
        Just("PATCH"),
    ]
}

/// request-target: origin-form 風のパス + 任意のクエリ
pub fn url() -> impl Strategy<Value = String> {
    "/[A-Za-z0-9/_.~-]{0,24}(\\?[A-Za-z0-9=&%-]{0,16})?"
}

/// ヘッダー名: token 文字のみ、フレーミングヘッダーは除外
pub fn header_name() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z0-9-]{0,14}".prop_filter("reserved header name", |name| {
        !RESERVED_HEADER_NAMES.contains(&name.to_ascii_lowercase().as_str())
    })
}

/// ヘッダー値: 前後に OWS を持たない可視文字列 (空も可)
///
/// パーサーは前後の OWS を除去するため、生成時点で除去済みの形にして
/// 観測値とそのまま比較できるようにする。
pub fn header_value() -> impl Strategy<Value = String> {
    "([!-~]([ !-~]{0,22}[!-~])?)?"
}

/// ヘッダーのリスト (名前の重複を許す)
pub fn headers() -> impl Strategy<Value = Vec<(String, String)>> {
    proptest::collection::vec((header_name(), header_value()), 0..6)
}

/// ボディバイト列 (任意バイナリ)
pub fn body() -> impl Strategy<Value = Vec<u8>> {
    proptest::collection::vec(any::<u8>(), 0..128)
}

// ========================================
// メッセージ生成
// ========================================

/// 生成された HTTP メッセージと期待される観測値
#[derive(Debug, Clone)]
pub struct Message {
    /// パーサーへ与えるバイト列
    pub encoded: Vec<u8>,
    /// 期待されるヘッダー (小文字名、到着順、OWS 除去済み値)
    pub expected_headers: Vec<(String, String)>,
    /// 期待されるボディ (body イベントの連結)
    pub expected_body: Vec<u8>,
}

fn encode_head(
    first_line: &str,
    headers: &[(String, String)],
    framing: &str,
) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(first_line.as_bytes());
    out.extend_from_slice(b"\r\n");
    for (name, value) in headers {
        out.extend_from_slice(name.as_bytes());
        out.extend_from_slice(b": ");
        out.extend_from_slice(value.as_bytes());
        out.extend_from_slice(b"\r\n");
    }
    out.extend_from_slice(framing.as_bytes());
    out.extend_from_slice(b"\r\n");
    out
}

fn expected_headers(
    headers: &[(String, String)],
    framing: Option<(String, String)>,
) -> Vec<(String, String)> {
    let mut expected: Vec<(String, String)> = headers
        .iter()
        .map(|(n, v)| (n.to_ascii_lowercase(), v.clone()))
        .collect();
    if let Some(pair) = framing {
        expected.push(pair);
    }
    expected
}

/// Content-Length フレーミングのリクエスト
pub fn content_length_request() -> impl Strategy<Value = Message> {
    (method(), url(), headers(), body()).prop_map(|(method, url, headers, body)| {
        let first_line = format!("{} {} HTTP/1.1", method, url);
        let framing = format!("Content-Length: {}\r\n", body.len());
        let mut encoded = encode_head(&first_line, &headers, &framing);
        encoded.extend_from_slice(&body);
        Message {
            encoded,
            expected_headers: expected_headers(
                &headers,
                Some(("content-length".to_string(), body.len().to_string())),
            ),
            expected_body: body,
        }
    })
}

/// chunked フレーミングのリクエスト (チャンク分割は生成器が決める)
pub fn chunked_request() -> impl Strategy<Value = Message> {
    (
        method(),
        url(),
        headers(),
        proptest::collection::vec(proptest::collection::vec(any::<u8>(), 1..32), 0..5),
    )
        .prop_map(|(method, url, headers, chunks)| {
            let first_line = format!("{} {} HTTP/1.1", method, url);
            let mut encoded =
                encode_head(&first_line, &headers, "Transfer-Encoding: chunked\r\n");
            let mut expected_body = Vec::new();
            for chunk in &chunks {
                encoded.extend_from_slice(format!("{:x}\r\n", chunk.len()).as_bytes());
                encoded.extend_from_slice(chunk);
                encoded.extend_from_slice(b"\r\n");
                expected_body.extend_from_slice(chunk);
            }
            encoded.extend_from_slice(b"0\r\n\r\n");
            Message {
                encoded,
                expected_headers: expected_headers(
                    &headers,
                    Some(("transfer-encoding".to_string(), "chunked".to_string())),
                ),
                expected_body,
            }
        })
}

/// どちらかのフレーミングのリクエスト
pub fn request() -> impl Strategy<Value = Message> {
    prop_oneof![content_length_request(), chunked_request()]
}

/// Content-Length フレーミングのレスポンス
pub fn content_length_response() -> impl Strategy<Value = Message> {
    (200u16..=599u16, headers(), body()).prop_map(|(status, headers, body)| {
        // 204 / 304 はボディを持たないため避ける
        let status = if status == 204 || status == 304 { 200 } else { status };
        let first_line = format!("HTTP/1.1 {} Reason", status);
        let framing = format!("Content-Length: {}\r\n", body.len());
        let mut encoded = encode_head(&first_line, &headers, &framing);
        encoded.extend_from_slice(&body);
        Message {
            encoded,
            expected_headers: expected_headers(
                &headers,
                Some(("content-length".to_string(), body.len().to_string())),
            ),
            expected_body: body,
        }
    })
}

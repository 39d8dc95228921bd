//! パーサーのプロパティテスト
//!
//! 生成した有効なメッセージについて、以下の性質を検証する:
//!
//! 1. 入力をどのバイト境界で分割しても、観測される結果は変わらない
//! 2. body イベントの連結は元のボディと一致する (chunked は脱チャンク済み)
//! 3. ヘッダーは小文字名・到着順で、重複は到着順リストになる
//! 4. reset 後の再利用は新品のパーサーと同じ結果になる

use std::cell::RefCell;
use std::rc::Rc;

use proptest::prelude::*;
use shiguredo_http1_parser::{Event, Handler, Mode, Parser};

use pbt::{chunked_request, content_length_request, content_length_response, request, Message};

/// パース結果の観測値
#[derive(Debug, Clone, PartialEq, Eq)]
struct Observed {
    /// ヘッダーマップの内容 (名前ごとに到着順の値リスト)
    headers: Vec<(String, Vec<String>)>,
    /// body イベントの連結
    body: Vec<u8>,
    /// message_complete の発火回数
    completes: usize,
}

/// メッセージを与えられた分割位置でパースして観測値を得る
fn parse_observed(mode: Mode, encoded: &[u8], split: usize) -> Observed {
    let body = Rc::new(RefCell::new(Vec::new()));
    let completes = Rc::new(RefCell::new(0usize));

    let mut parser = Parser::new(mode);
    let b = Rc::clone(&body);
    parser
        .on(
            Event::Body,
            Handler::data(move |chunk| {
                b.borrow_mut().extend_from_slice(chunk);
                Ok(())
            }),
        )
        .unwrap();
    let c = Rc::clone(&completes);
    parser
        .on(
            Event::MessageComplete,
            Handler::notify(move || {
                *c.borrow_mut() += 1;
                Ok(())
            }),
        )
        .unwrap();

    let split = split.min(encoded.len());
    parser.execute(&encoded[..split]).unwrap();
    parser.execute(&encoded[split..]).unwrap();

    let headers = parser
        .headers()
        .iter()
        .map(|(name, entry)| {
            (
                name.to_string(),
                entry.all().into_iter().map(str::to_string).collect(),
            )
        })
        .collect();

    Observed {
        headers,
        body: body.borrow().clone(),
        completes: *completes.borrow(),
    }
}

/// 期待ヘッダー (到着順の名前・値ペア) をマップと同じ形に畳む
fn group_expected(pairs: &[(String, String)]) -> Vec<(String, Vec<String>)> {
    let mut grouped: Vec<(String, Vec<String>)> = Vec::new();
    for (name, value) in pairs {
        match grouped.iter_mut().find(|(n, _)| n == name) {
            Some((_, values)) => values.push(value.clone()),
            None => grouped.push((name.clone(), vec![value.clone()])),
        }
    }
    grouped
}

/// メッセージと分割位置のペア
fn message_with_split(
    message: impl Strategy<Value = Message>,
) -> impl Strategy<Value = (Message, usize)> {
    message.prop_flat_map(|msg| {
        let len = msg.encoded.len();
        (Just(msg), 0..=len)
    })
}

proptest! {
    /// Content-Length リクエスト: ヘッダー・ボディ・完了回数が期待どおり
    #[test]
    fn content_length_request_roundtrip(msg in content_length_request()) {
        let observed = parse_observed(Mode::Request, &msg.encoded, msg.encoded.len());
        prop_assert_eq!(&observed.headers, &group_expected(&msg.expected_headers));
        prop_assert_eq!(&observed.body, &msg.expected_body);
        prop_assert_eq!(observed.completes, 1);
    }

    /// chunked リクエスト: body イベントの連結が脱チャンク済みボディと一致
    #[test]
    fn chunked_request_dechunks(msg in chunked_request()) {
        let observed = parse_observed(Mode::Request, &msg.encoded, msg.encoded.len());
        prop_assert_eq!(&observed.body, &msg.expected_body);
        prop_assert_eq!(observed.completes, 1);
    }

    /// レスポンスでも同じ性質が成り立つ
    #[test]
    fn content_length_response_roundtrip(msg in content_length_response()) {
        let observed = parse_observed(Mode::Response, &msg.encoded, msg.encoded.len());
        prop_assert_eq!(&observed.headers, &group_expected(&msg.expected_headers));
        prop_assert_eq!(&observed.body, &msg.expected_body);
        prop_assert_eq!(observed.completes, 1);
    }

    /// どのバイト境界で分割しても観測結果は変わらない
    #[test]
    fn split_position_is_invisible((msg, split) in message_with_split(request())) {
        let whole = parse_observed(Mode::Request, &msg.encoded, msg.encoded.len());
        let halves = parse_observed(Mode::Request, &msg.encoded, split);
        prop_assert_eq!(whole, halves);
    }

    /// reset 後の再利用は新品のパーサーと同じ結果になる
    #[test]
    fn reset_behaves_like_fresh_parser(
        first in content_length_request(),
        second in content_length_request(),
    ) {
        let fresh = parse_observed(Mode::Request, &second.encoded, second.encoded.len());

        let body = Rc::new(RefCell::new(Vec::new()));
        let mut parser = Parser::request();
        let b = Rc::clone(&body);
        parser
            .on(
                Event::Body,
                Handler::data(move |chunk| {
                    b.borrow_mut().extend_from_slice(chunk);
                    Ok(())
                }),
            )
            .unwrap();

        parser.execute(&first.encoded).unwrap();
        parser.reset();
        body.borrow_mut().clear();
        parser.execute(&second.encoded).unwrap();

        let headers: Vec<(String, Vec<String>)> = parser
            .headers()
            .iter()
            .map(|(name, entry)| {
                (
                    name.to_string(),
                    entry.all().into_iter().map(str::to_string).collect(),
                )
            })
            .collect();
        prop_assert_eq!(headers, fresh.headers);
        prop_assert_eq!(body.borrow().clone(), fresh.body);
    }

    /// keep-alive 接続上の連続メッセージはそれぞれ完了する
    #[test]
    fn pipelined_messages_each_complete(
        first in content_length_request(),
        second in content_length_request(),
    ) {
        let mut encoded = first.encoded.clone();
        encoded.extend_from_slice(&second.encoded);
        let observed = parse_observed(Mode::Request, &encoded, encoded.len());

        prop_assert_eq!(observed.completes, 2);
        let mut expected_body = first.expected_body.clone();
        expected_body.extend_from_slice(&second.expected_body);
        prop_assert_eq!(observed.body, expected_body);
    }
}

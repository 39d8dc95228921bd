#![no_main]

use libfuzzer_sys::fuzz_target;
use shiguredo_http1_parser::{ErrorKind, Parser};

// 一括 feed と 17 バイト分割 feed で結果が一致することを確認する
// (一時停止が絡むと消費位置が分かれるため、停止しない入力のみ比較する)
fuzz_target!(|data: &[u8]| {
    let mut whole = Parser::request();
    let whole_result = whole.execute(data);
    if whole.is_paused() {
        return;
    }

    let mut split = Parser::request();
    let mut split_result = Ok(());
    for chunk in data.chunks(17) {
        match split.execute(chunk) {
            Ok(_) => {
                if split.is_paused() {
                    return;
                }
            }
            Err(err) => {
                split_result = Err(err);
                break;
            }
        }
    }

    match (whole_result, split_result) {
        (Ok(_), Ok(())) => {
            assert_eq!(whole.http_major(), split.http_major());
            assert_eq!(whole.http_minor(), split.http_minor());
            assert_eq!(whole.method(), split.method());
            assert_eq!(whole.headers().len(), split.headers().len());
        }
        (Err(a), Err(b)) => {
            assert_eq!(a.kind(), b.kind());
        }
        (Ok(_), Err(err)) | (Err(err), Ok(())) => {
            // 片方だけ失敗するのは一時停止絡みのみ許される
            assert_eq!(err.kind(), ErrorKind::Paused);
        }
    }
});

#![no_main]

use libfuzzer_sys::fuzz_target;
use shiguredo_http1_parser::Parser;

fuzz_target!(|data: &[u8]| {
    // パニックしないこと、エラー後は粘着することだけを確認する
    let mut parser = Parser::request();
    match parser.execute(data) {
        Ok(consumed) => {
            assert!(consumed <= data.len());
        }
        Err(err) => {
            if err.kind().is_fatal() {
                // 終端エラー後の入力は同じエラーで拒否される
                let again = parser.execute(b"GET / HTTP/1.1\r\n\r\n").unwrap_err();
                assert_eq!(again.kind(), err.kind());
            }
        }
    }
    let _ = parser.finish();
});

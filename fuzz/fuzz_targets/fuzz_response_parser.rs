#![no_main]

use libfuzzer_sys::fuzz_target;
use shiguredo_http1_parser::Parser;

fuzz_target!(|data: &[u8]| {
    let mut parser = Parser::response();
    if parser.execute(data).is_ok() {
        // EOF 終端ボディのレスポンスはここで完了する
        let _ = parser.finish();
        let _ = parser.should_keep_alive();
        let _ = parser.message_needs_eof();
    }
});

use std::fmt;

/// パースエラーの種別
///
/// llhttp 互換の安定した分類。外部入力で `Internal` が発生することはない
/// (発生した場合は状態機械のバグ)。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// 不正な HTTP メソッド
    InvalidMethod,
    /// 不正な URL (request-target)
    InvalidUrl,
    /// 不正な HTTP バージョン
    InvalidVersion,
    /// 不正なヘッダートークン
    InvalidHeaderToken,
    /// 不正な Content-Length 値
    InvalidContentLength,
    /// 不正なチャンクサイズ
    InvalidChunkSize,
    /// フレーミングヘッダーの競合 (Content-Length と Transfer-Encoding: chunked)
    UnexpectedContentLength,
    /// メッセージ完了前に接続が閉じられた
    ClosedConnection,
    /// 前のメッセージが接続を閉じるはずのところに次のメッセージが開始された
    SiblingMessageInProgress,
    /// 一時停止中に execute が呼ばれた (resume を呼ぶこと)
    Paused,
    /// ハンドラー由来のエラー
    UserCallback,
    /// 状態機械の内部不変条件違反
    Internal,
    /// 不正な引数 (未知のイベント名など)
    InvalidArgument,
}

impl ErrorKind {
    /// 種別の説明文を取得
    pub fn message(&self) -> &'static str {
        match self {
            ErrorKind::InvalidMethod => "invalid HTTP method",
            ErrorKind::InvalidUrl => "invalid URL",
            ErrorKind::InvalidVersion => "invalid HTTP version",
            ErrorKind::InvalidHeaderToken => "invalid header token",
            ErrorKind::InvalidContentLength => "invalid Content-Length value",
            ErrorKind::InvalidChunkSize => "invalid chunk size",
            ErrorKind::UnexpectedContentLength => "unexpected Content-Length header",
            ErrorKind::ClosedConnection => "connection closed before message completed",
            ErrorKind::SiblingMessageInProgress => "sibling message in progress",
            ErrorKind::Paused => "parser is paused",
            ErrorKind::UserCallback => "user callback error",
            ErrorKind::Internal => "internal parser error",
            ErrorKind::InvalidArgument => "invalid argument",
        }
    }

    /// コンテキストを終了させるエラーかどうか
    ///
    /// `Paused` は resume で、`InvalidArgument` は正しい引数で回復できる。
    /// それ以外は reset するまでコンテキストは使用不能。
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ErrorKind::Paused | ErrorKind::InvalidArgument)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// パースエラー
///
/// 種別と人間可読な理由のペア。`UserCallback` の場合、理由には
/// ハンドラーが報告した原因がそのまま含まれる。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    kind: ErrorKind,
    reason: String,
}

impl Error {
    /// 新しいエラーを作成
    pub(crate) fn new(kind: ErrorKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            reason: reason.into(),
        }
    }

    /// エラー種別を取得
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// 理由を取得
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.reason.is_empty() {
            write!(f, "{}", self.kind.message())
        } else {
            write!(f, "{}: {}", self.kind.message(), self.reason)
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_with_reason() {
        let err = Error::new(ErrorKind::InvalidChunkSize, "non-hex digit");
        assert_eq!(err.to_string(), "invalid chunk size: non-hex digit");
        assert_eq!(err.kind(), ErrorKind::InvalidChunkSize);
    }

    #[test]
    fn display_without_reason() {
        let err = Error::new(ErrorKind::Paused, "");
        assert_eq!(err.to_string(), "parser is paused");
    }

    #[test]
    fn fatal_classification() {
        assert!(ErrorKind::InvalidMethod.is_fatal());
        assert!(ErrorKind::UserCallback.is_fatal());
        assert!(!ErrorKind::Paused.is_fatal());
        assert!(!ErrorKind::InvalidArgument.is_fatal());
    }
}

use std::fmt;
use std::path::PathBuf;

/// 初期化エラー
///
/// スキャン中の失敗はエラーにならない（空トークンに縮退する）。
/// エラーになるのはバッファの読み込みに失敗した場合だけ。
#[derive(Debug)]
pub enum InitError {
    /// ファイルが存在しない
    FileNotFound(PathBuf),
    /// ファイル読み込みエラー
    Io(PathBuf, String),
    /// バッファが空
    EmptyBuffer(PathBuf),
}

impl fmt::Display for InitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitError::FileNotFound(p) => write!(f, "file not found: {}", p.display()),
            InitError::Io(p, e) => write!(f, "I/O error reading {}: {}", p.display(), e),
            InitError::EmptyBuffer(p) => write!(f, "empty buffer: {}", p.display()),
        }
    }
}

impl std::error::Error for InitError {}

/// 置換テーブル読み込みエラー
#[derive(Debug)]
pub enum TableError {
    /// ファイル読み込みエラー
    Io(PathBuf, String),
    /// JSONパースエラー
    Json(PathBuf, String),
}

impl fmt::Display for TableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableError::Io(p, e) => write!(f, "I/O error reading {}: {}", p.display(), e),
            TableError::Json(p, e) => write!(f, "invalid replacement table {}: {}", p.display(), e),
        }
    }
}

impl std::error::Error for TableError {}

/// Result型エイリアス
pub type Result<T> = std::result::Result<T, InitError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_error_display() {
        let err = InitError::FileNotFound(PathBuf::from("/tmp/missing.h"));
        assert_eq!(format!("{}", err), "file not found: /tmp/missing.h");
    }

    #[test]
    fn test_empty_buffer_display() {
        let err = InitError::EmptyBuffer(PathBuf::from("a.cpp"));
        assert!(format!("{}", err).contains("empty buffer"));
    }

    #[test]
    fn test_table_error_display() {
        let err = TableError::Json(PathBuf::from("t.json"), "expected value".into());
        assert!(format!("{}", err).contains("invalid replacement table"));
    }
}

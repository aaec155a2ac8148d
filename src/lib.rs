//! C/C++ Code-Completion Tokenizer
//!
//! コード補完パーサ向けの C/C++ トークナイザ。編集中の不完全なソースを
//! 許容し、スキャン失敗は空トークンへ縮退する（決して中断しない）。
//! 文字列・コメント・プリプロセッサ行・配列添字・デフォルト引数などの
//! 文脈依存のスキップ、1トークンの先読みと押し戻し、マクロ置換を持つ。

pub mod buffer;
pub mod error;
pub mod replacement;
pub mod tokenizer;

// 主要な型を再エクスポート
pub use buffer::{SENTINEL, SourceBuffer};
pub use error::{InitError, Result, TableError};
pub use replacement::{Directive, ReplacementTable};
pub use tokenizer::{Tokenizer, TokenizerOptions};

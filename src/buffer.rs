//! ソースバッファ
//!
//! ファイルまたは文字列から読み込んだ文字列に番兵を1文字付加して保持する。
//! MacroReplace による既読部分の上書きだけが変更を許される。

use std::fs;
use std::path::Path;

use crate::error::{InitError, Result};

/// 番兵文字（バッファ末尾に1文字だけ付加される）
pub const SENTINEL: char = ' ';

/// ソースバッファ
///
/// `chars` は常に `len + 1` 文字（末尾1文字は番兵）。
/// `len` は番兵を含まない論理長。
#[derive(Debug, Clone, Default)]
pub struct SourceBuffer {
    chars: Vec<char>,
    len: usize,
}

impl SourceBuffer {
    /// 空のバッファを作成（番兵のみ、長さ0）
    pub fn new() -> Self {
        Self {
            chars: vec![SENTINEL],
            len: 0,
        }
    }

    /// 文字列からバッファを作成
    pub fn from_str(text: &str) -> Self {
        let mut chars: Vec<char> = text.chars().collect();
        let len = chars.len();
        chars.push(SENTINEL);
        Self { chars, len }
    }

    /// ファイルからバッファを作成
    ///
    /// UTF-8 として読み込み、失敗した場合は Latin-1 として再解釈する。
    /// ファイルが存在しない・読めない・空の場合はエラー。
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(InitError::FileNotFound(path.to_path_buf()));
        }

        let bytes = fs::read(path)
            .map_err(|e| InitError::Io(path.to_path_buf(), e.to_string()))?;

        let text = match String::from_utf8(bytes) {
            Ok(s) => s,
            // Latin-1 では各バイトがそのままコードポイントになる
            Err(e) => e.into_bytes().iter().map(|&b| b as char).collect(),
        };

        if text.is_empty() {
            return Err(InitError::EmptyBuffer(path.to_path_buf()));
        }

        Ok(Self::from_str(&text))
    }

    /// 論理長（番兵を含まない）
    pub fn len(&self) -> usize {
        self.len
    }

    /// バッファが空かどうか
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// 位置 `index` の文字を取得
    ///
    /// `index == len` は番兵を返す。範囲外は番兵扱い。
    pub fn char_at(&self, index: usize) -> char {
        self.chars.get(index).copied().unwrap_or(SENTINEL)
    }

    /// 位置 `index` の文字を上書きする（境界チェック付き）
    ///
    /// 挿入・削除は不可。長さは変わらない。範囲外は無視。
    pub fn set_char(&mut self, index: usize, c: char) {
        if index <= self.len {
            self.chars[index] = c;
        }
    }

    /// 範囲 `[start, end)` を文字列として切り出す
    pub fn slice(&self, start: usize, end: usize) -> String {
        let end = end.min(self.len);
        if start >= end {
            return String::new();
        }
        self.chars[start..end].iter().collect()
    }
}

//! マクロ置換テーブル
//!
//! 識別子 → 置換指示文字列のマップ。セッション開始時に一度だけ構築し、
//! 複数のトークナイザから読み取り専用で共有する。
//!
//! 指示文字列の先頭1文字が種別を表す:
//! - `+` : 後続の `(...)` 呼び出しを吸収して `{` に書き換える
//! - `-` : バッファを後方へ上書きしカーソルを巻き戻す
//! - それ以外 : 文字列をそのまま返す

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::TableError;

/// 置換指示の種別ビュー
///
/// テーブルには生の指示文字列を保持し、参照時にプレフィックスを剥がす。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive<'a> {
    /// そのまま返す置換
    Literal(&'a str),
    /// `+` : 引数リスト吸収（値はプレフィックスを除いたもの）
    ParenToBrace(&'a str),
    /// `-` : バッファ後方上書き（値はプレフィックスを除いたもの）
    RewriteBackward(&'a str),
}

/// 置換テーブル
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReplacementTable {
    map: HashMap<String, String>,
}

impl ReplacementTable {
    /// 空のテーブルを作成
    pub fn new() -> Self {
        Self {
            map: HashMap::new(),
        }
    }

    /// JSONファイルからテーブルを読み込む
    ///
    /// 形式はフラットなオブジェクト: `{ "識別子": "指示文字列", ... }`
    pub fn from_json_file(path: &Path) -> Result<Self, TableError> {
        let text = fs::read_to_string(path)
            .map_err(|e| TableError::Io(path.to_path_buf(), e.to_string()))?;
        serde_json::from_str(&text)
            .map_err(|e| TableError::Json(path.to_path_buf(), e.to_string()))
    }

    /// 置換を登録する
    pub fn insert(&mut self, key: impl Into<String>, directive: impl Into<String>) {
        self.map.insert(key.into(), directive.into());
    }

    /// 置換を削除する
    pub fn remove(&mut self, key: &str) {
        self.map.remove(key);
    }

    /// 生の指示文字列を取得
    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(String::as_str)
    }

    /// 識別子を検索し、種別付きの指示ビューを返す
    pub fn lookup(&self, ident: &str) -> Option<Directive<'_>> {
        let value = self.map.get(ident)?;
        Some(match value.as_bytes().first() {
            Some(b'+') => Directive::ParenToBrace(&value[1..]),
            Some(b'-') => Directive::RewriteBackward(&value[1..]),
            _ => Directive::Literal(value),
        })
    }

    /// 登録数を返す
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// テーブルが空かどうか
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// 登録された置換をイテレート
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.map.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_literal() {
        let mut table = ReplacementTable::new();
        table.insert("FOO", "bar");
        assert_eq!(table.lookup("FOO"), Some(Directive::Literal("bar")));
        assert_eq!(table.lookup("BAZ"), None);
    }

    #[test]
    fn test_lookup_prefixed() {
        let mut table = ReplacementTable::new();
        table.insert("BEGIN_NS", "+namespace std {");
        table.insert("WXDLLIMPEXP_FWD_CORE", "-class WXDLLIMPEXP_CORE");
        assert_eq!(
            table.lookup("BEGIN_NS"),
            Some(Directive::ParenToBrace("namespace std {"))
        );
        assert_eq!(
            table.lookup("WXDLLIMPEXP_FWD_CORE"),
            Some(Directive::RewriteBackward("class WXDLLIMPEXP_CORE"))
        );
    }

    #[test]
    fn test_empty_directive_is_literal() {
        let mut table = ReplacementTable::new();
        table.insert("NOTHING", "");
        assert_eq!(table.lookup("NOTHING"), Some(Directive::Literal("")));
    }

    #[test]
    fn test_insert_remove() {
        let mut table = ReplacementTable::new();
        assert!(table.is_empty());
        table.insert("A", "b");
        assert_eq!(table.len(), 1);
        table.remove("A");
        assert!(table.is_empty());
    }

    #[test]
    fn test_json_roundtrip() {
        let mut table = ReplacementTable::new();
        table.insert("FOO", "bar");
        let json = serde_json::to_string(&table).unwrap();
        let parsed: ReplacementTable = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.get("FOO"), Some("bar"));
    }
}

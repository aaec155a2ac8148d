//! トークナイザエンジン
//!
//! 編集途中の不完全な C/C++ ソースを許容するトークナイザ。
//! スキャン失敗は空トークンへ縮退し、決して中断しない。
//! 1トークン分の先読み（peek）と押し戻し（unget）を持つ。

use std::path::{Path, PathBuf};

use crate::buffer::SourceBuffer;
use crate::error::Result;
use crate::replacement::{Directive, ReplacementTable};

/// トークナイザ設定
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenizerOptions {
    /// `#define` 行をトークンとして表面化するか
    pub want_preprocessor: bool,
}

/// トークナイザ
///
/// 一つのバッファの上に一つの可変カーソルを持つ。再初期化は `init` /
/// `init_from_buffer` で行う。置換テーブルは構築時に注入され、
/// 複数エンジンから読み取り専用で共有される。
pub struct Tokenizer<'t> {
    filename: Option<PathBuf>,
    buffer: SourceBuffer,
    replacements: &'t ReplacementTable,
    options: TokenizerOptions,

    token: String,
    token_index: usize,
    line_number: u32,
    nest_level: i32,
    saved_nesting_level: i32,

    // 1段だけの undo スナップショット
    undo_token_index: usize,
    undo_line_number: u32,
    undo_nest_level: i32,

    // 1トークンだけの peek キャッシュ
    peek_available: bool,
    peek_token: String,
    peek_token_index: usize,
    peek_line_number: u32,
    peek_nest_level: i32,

    is_ok: bool,
    is_operator: bool,
    is_preprocessor: bool,
    skip_unwanted_tokens: bool,
}

impl<'t> Tokenizer<'t> {
    /// 空のトークナイザを作成（`init` 前はトークンを返さない）
    pub fn new(replacements: &'t ReplacementTable) -> Self {
        Self {
            filename: None,
            buffer: SourceBuffer::new(),
            replacements,
            options: TokenizerOptions::default(),
            token: String::new(),
            token_index: 0,
            line_number: 1,
            nest_level: 0,
            saved_nesting_level: 0,
            undo_token_index: 0,
            undo_line_number: 1,
            undo_nest_level: 0,
            peek_available: false,
            peek_token: String::new(),
            peek_token_index: 0,
            peek_line_number: 0,
            peek_nest_level: 0,
            is_ok: false,
            is_operator: false,
            is_preprocessor: false,
            skip_unwanted_tokens: true,
        }
    }

    /// ファイルを読み込んで初期化済みのトークナイザを作成
    pub fn from_file(path: &Path, replacements: &'t ReplacementTable) -> Result<Self> {
        let mut tokenizer = Self::new(replacements);
        tokenizer.init(path)?;
        Ok(tokenizer)
    }

    /// ファイルから再初期化する
    ///
    /// 存在しない・読めない・空のファイルはエラー。
    pub fn init(&mut self, path: &Path) -> Result<()> {
        self.base_init();
        self.buffer = SourceBuffer::from_file(path)?;
        self.filename = Some(path.to_path_buf());
        self.is_ok = true;
        Ok(())
    }

    /// 文字列から再初期化する（空文字列も許容）
    pub fn init_from_buffer(&mut self, text: &str) {
        self.base_init();
        self.buffer = SourceBuffer::from_str(text);
        self.filename = None;
        self.is_ok = true;
    }

    /// カーソル・undo・peek の全状態をリセット
    fn base_init(&mut self) {
        self.buffer = SourceBuffer::new();
        self.filename = None;
        self.token.clear();
        self.token_index = 0;
        self.line_number = 1;
        self.nest_level = 0;
        self.saved_nesting_level = 0;
        self.undo_token_index = 0;
        self.undo_line_number = 1;
        self.undo_nest_level = 0;
        self.peek_available = false;
        self.peek_token.clear();
        self.peek_token_index = 0;
        self.peek_line_number = 0;
        self.peek_nest_level = 0;
        self.is_ok = false;
        self.is_operator = false;
        self.is_preprocessor = false;
    }

    // === アクセサ ===

    /// 初期化に成功しているか
    pub fn is_ok(&self) -> bool {
        self.is_ok
    }

    /// 初期化したファイル名（バッファ初期化時は None）
    pub fn filename(&self) -> Option<&Path> {
        self.filename.as_deref()
    }

    /// 現在の行番号（1始まり）
    pub fn line_number(&self) -> u32 {
        self.line_number
    }

    /// 現在のブレース `{ }` ネスト深さ
    ///
    /// ヒューリスティックな計数で、不均衡な入力では負になり得る。
    pub fn nest_level(&self) -> i32 {
        self.nest_level
    }

    /// 直前に認識したプリプロセッサ指令を表面化したか
    pub fn last_was_preprocessor(&self) -> bool {
        self.is_preprocessor
    }

    /// 不要構文のスキップを切り替える
    pub fn set_skip_unwanted_tokens(&mut self, skip: bool) {
        self.skip_unwanted_tokens = skip;
    }

    /// 不要構文をスキップする設定か
    pub fn skip_unwanted_tokens(&self) -> bool {
        self.skip_unwanted_tokens
    }

    /// 設定への可変参照を取得
    pub fn options_mut(&mut self) -> &mut TokenizerOptions {
        &mut self.options
    }

    /// 現在の設定を取得
    pub fn options(&self) -> TokenizerOptions {
        self.options
    }

    /// 現在のネスト深さを保存する（1段のみ）
    pub fn save_nesting_level(&mut self) {
        self.saved_nesting_level = self.nest_level;
    }

    /// 保存したネスト深さに戻す
    pub fn restore_nesting_level(&mut self) {
        self.nest_level = self.saved_nesting_level;
    }

    // === カーソルプリミティブ ===

    fn is_eof(&self) -> bool {
        self.token_index >= self.buffer.len()
    }

    fn not_eof(&self) -> bool {
        self.token_index < self.buffer.len()
    }

    /// カーソル位置の文字（バッファ終端では番兵）
    fn current_char(&self) -> char {
        self.buffer.char_at(self.token_index)
    }

    /// カーソルの次の文字
    fn next_char(&self) -> char {
        self.buffer.char_at(self.token_index + 1)
    }

    /// カーソルの直前の文字（先頭では NUL）
    fn previous_char(&self) -> char {
        if self.token_index >= 1 {
            self.buffer.char_at(self.token_index - 1)
        } else {
            '\0'
        }
    }

    /// カーソルを1文字進める
    ///
    /// 改行に乗った時点で行番号を加算する。終端に達したら false。
    fn move_to_next_char(&mut self) -> bool {
        self.token_index += 1;
        if self.is_eof() {
            self.token_index = self.buffer.len();
            return false;
        }
        if self.current_char() == '\n' {
            self.line_number += 1;
        }
        true
    }

    // === スキップロジック ===

    /// 空白類をスキップする
    ///
    /// `' '` 以下の文字はすべて空白として扱う（番兵もここに含まれる）。
    fn skip_whitespace(&mut self) -> bool {
        while self.current_char() <= ' ' && self.move_to_next_char() {}
        !self.is_eof()
    }

    /// 現在位置の引用符が本当に文字列の終端かどうか
    ///
    /// 直前に連続するバックスラッシュが奇数個なら引用符はエスケープ
    /// されていて終端ではない。`\\"` はバックスラッシュ自身がエスケープ
    /// されているので終端。
    fn is_string_end(&self) -> bool {
        let mut backslashes = 0usize;
        while backslashes < self.token_index
            && self.buffer.char_at(self.token_index - 1 - backslashes) == '\\'
        {
            backslashes += 1;
        }
        backslashes % 2 == 0
    }

    /// `ch` が現れるまでスキップする（文字列の外を前提とする）
    fn skip_to_char(&mut self, ch: char) -> bool {
        while self.current_char() != ch && self.move_to_next_char() {}
        !self.is_eof()
    }

    /// 文字列リテラルの終端引用符までスキップする
    ///
    /// エスケープされた引用符では止まらない。
    fn skip_to_string_end(&mut self, quote: char) -> bool {
        loop {
            while self.current_char() != quote && self.move_to_next_char() {}
            if self.is_eof() {
                return false;
            }
            if self.is_string_end() {
                break;
            }
            self.move_to_next_char();
        }
        true
    }

    /// カーソルが引用符上にあれば文字列リテラルを丸ごとスキップする
    ///
    /// 実際にスキップしてカーソルが動いた場合のみ true。
    fn skip_string(&mut self) -> bool {
        let c = self.current_char();
        if c == '"' || c == '\'' {
            self.move_to_next_char();
            self.skip_to_string_end(c);
            self.move_to_next_char();
            return true;
        }
        false
    }

    /// `chars` のいずれかが現れるまでスキップする
    ///
    /// 途中の文字列・コメントは丸ごと飛ばす。`support_nesting` なら
    /// ブロック `() [] {} <>` も丸ごと飛ばす（`<<` 演算子は除く）。
    fn skip_to_one_of_chars(&mut self, chars: &str, support_nesting: bool) -> bool {
        while self.not_eof() && !chars.contains(self.current_char()) {
            self.move_to_next_char();

            while self.skip_string() || self.skip_comment(true) {}

            // 連続するブロックをまとめて飛ばす
            // 例: sometemplate<foo>(bar) は <foo> の直後に (bar) も飛ばす
            let mut done = false;
            while support_nesting && !done {
                match self.current_char() {
                    '{' => {
                        self.skip_block('{');
                    }
                    '(' => {
                        self.skip_block('(');
                    }
                    '[' => {
                        self.skip_block('[');
                    }
                    '<' => {
                        if self.next_char() == '<' {
                            // << 演算子はブロックではない
                            self.move_to_next_char();
                            self.move_to_next_char();
                        } else {
                            self.skip_block('<');
                        }
                    }
                    _ => done = true,
                }
            }
        }

        !self.is_eof()
    }

    /// カーソルから行末までの生テキストを返す
    pub fn read_to_eol(&mut self, nest_braces: bool) -> String {
        let start = self.token_index;
        self.skip_to_eol(nest_braces);
        self.buffer.slice(start, self.token_index)
    }

    /// 行末までスキップする
    ///
    /// 行末のバックスラッシュは行継続として扱い、次の物理行も
    /// 同じ論理行として読み飛ばす。
    pub fn skip_to_eol(&mut self, nest_braces: bool) -> bool {
        self.skip_to_eol_inner(nest_braces, false)
    }

    fn skip_to_eol_inner(&mut self, nest_braces: bool, skipping_comment: bool) -> bool {
        loop {
            while self.not_eof() && self.current_char() != '\n' {
                if !skipping_comment {
                    if self.current_char() == '/' && self.next_char() == '*' {
                        self.skip_comment(false);
                    }
                    if nest_braces && self.current_char() == '{' {
                        self.nest_level += 1;
                    } else if nest_braces && self.current_char() == '}' {
                        self.nest_level -= 1;
                    }
                }
                self.move_to_next_char();
            }

            let mut last = self.previous_char();
            // DOS改行なら \r の手前を見る
            if last == '\r' {
                last = if self.token_index >= 2 {
                    self.buffer.char_at(self.token_index - 2)
                } else {
                    '\0'
                };
            }
            if self.is_eof() || last != '\\' {
                break;
            }
            self.move_to_next_char();
        }
        !self.is_eof()
    }

    /// 開き括弧から対応する閉じ括弧の直後までスキップする
    ///
    /// 途中の文字列・コメントは括弧として数えない。
    /// 対応が取れないまま終端に達したら false。
    fn skip_block(&mut self, ch: char) -> bool {
        let matching = match ch {
            '(' => ')',
            '[' => ']',
            '{' => '}',
            '<' => '>',
            _ => return false,
        };

        self.move_to_next_char();
        let mut nest_level = 1i32;
        while self.not_eof() {
            while self.skip_string() || self.skip_comment(true) {}

            if self.current_char() == ch {
                nest_level += 1;
            } else if self.current_char() == matching {
                nest_level -= 1;
            }

            self.move_to_next_char();

            if nest_level == 0 {
                break;
            }
        }

        !self.is_eof()
    }

    /// カーソルがコメント上にあればコメントをスキップする
    ///
    /// `skip_end_white` ならコメント後の空白と後続コメントも連鎖的に
    /// スキップする。カーソルが動いた場合のみ true。
    fn skip_comment(&mut self, skip_end_white: bool) -> bool {
        let cstyle = if self.current_char() == '/' {
            match self.next_char() {
                '*' => true,
                '/' => false,
                _ => return false,
            }
        } else {
            return false;
        };

        self.move_to_next_char();
        self.move_to_next_char();

        loop {
            if cstyle {
                self.skip_to_char('/');
                if self.previous_char() == '*' {
                    self.move_to_next_char();
                    break;
                }
                if !self.move_to_next_char() {
                    break;
                }
            } else {
                self.skip_to_eol_inner(false, true);
                self.move_to_next_char();
                break;
            }
        }

        if self.is_eof() {
            return false;
        }

        if skip_end_white {
            if !self.skip_whitespace() {
                return false;
            }
            self.skip_comment(true);
            return true;
        }

        true
    }

    /// 不要構文をスキップする
    ///
    /// プリプロセッサ行・配列添字・代入右辺・三項演算子を、どれも
    /// 該当しなくなるまで繰り返し飛ばす。認識対象のプリプロセッサ指令
    /// （#include/#if系/#else系/#endif、設定次第で #define）は `#` まで
    /// 巻き戻してトークンとして表面化させる。
    fn skip_unwanted(&mut self, want_value: bool) -> bool {
        let mut current = self.current_char();

        // 連鎖するコメントと空白を先に飛ばす
        self.skip_comment(true);

        while current == '#'
            || (!self.is_operator && current == '=')
            || (!self.is_operator && current == '[')
            || current == '?'
        {
            let mut early_exit = false;

            while self.current_char() == '#' {
                let backup_index = self.token_index;
                self.move_to_next_char();
                self.skip_whitespace();

                let c = self.current_char();
                let n = self.next_char();

                if (c == 'i' && n == 'n') // in(clude)
                    || (c == 'i' && n == 'f') // if(|def|ndef)
                    || (c == 'e' && n == 'l') // el(se|if)
                    || (c == 'e' && n == 'n') // en(dif)
                    || (self.options.want_preprocessor && c == 'd' && n == 'e') // de(fine)
                {
                    // 表面化する指令: # に巻き戻して呼び出し側へ返す
                    self.is_preprocessor = true;
                    self.token_index = backup_index;
                    early_exit = true;
                    break;
                } else {
                    // #pragma などはノイズとして行ごと飛ばす
                    self.skip_to_eol(false);
                    if !self.skip_whitespace() {
                        return false;
                    }
                }
            }

            if early_exit {
                break;
            }

            while self.current_char() == '[' {
                // 配列添字は中身をトークン化しない
                self.skip_block('[');
                if !self.skip_whitespace() {
                    return false;
                }
            }

            while self.current_char() == '=' {
                if want_value {
                    // 値モード: = の直後で止めて呼び出し側に値を読ませる
                    self.move_to_next_char();
                    self.skip_whitespace();
                    return true;
                }
                if !self.skip_to_one_of_chars(",;}", true) {
                    return false;
                }
            }

            while self.current_char() == '?' {
                // "cond ? a : b" を丸ごと飛ばす
                if !self.skip_to_one_of_chars(";}", false) {
                    return false;
                }
            }

            if !self.skip_whitespace() {
                return false;
            }

            self.skip_comment(true);

            current = self.current_char();
        }
        true
    }

    // === トークン取得 ===

    /// 次のトークンを取得してカーソルを進める
    ///
    /// 終端またはスキップ失敗では空文字列を返す（両者は区別されない）。
    /// `want_value` が false のとき、有効な peek キャッシュがあれば
    /// 再スキャンせずそれを消費する。
    pub fn get_token(&mut self, want_value: bool, want_template: bool) -> String {
        self.undo_token_index = self.token_index;
        self.undo_line_number = self.line_number;
        self.undo_nest_level = self.nest_level;

        if want_value {
            self.token = self.do_get_token(want_value, want_template);
        } else if self.peek_available {
            self.token_index = self.peek_token_index;
            self.line_number = self.peek_line_number;
            self.nest_level = self.peek_nest_level;
            self.token = self.peek_token.clone();
        } else {
            self.token = self.do_get_token(want_value, want_template);
        }

        self.peek_available = false;

        self.token.clone()
    }

    /// 次のトークンをカーソルを進めずに取得する
    ///
    /// キャッシュが有効な間は同じトークンを返す。
    pub fn peek_token(&mut self, want_value: bool, want_template: bool) -> String {
        if !self.peek_available {
            self.peek_available = true;
            let undo_token_index = self.token_index;
            let undo_line_number = self.line_number;
            let undo_nest_level = self.nest_level;
            self.peek_token = self.do_get_token(want_value, want_template);
            self.peek_token_index = self.token_index;
            self.peek_line_number = self.line_number;
            self.peek_nest_level = self.nest_level;
            self.token_index = undo_token_index;
            self.line_number = undo_line_number;
            self.nest_level = undo_nest_level;
        }
        self.peek_token.clone()
    }

    /// 直前のトークンを押し戻す
    ///
    /// カーソルを undo スナップショットへ戻し、返したばかりのトークンを
    /// peek キャッシュに入れて次の `get_token(false, ..)` で再生させる。
    /// 保証されるのは1トークン分だけ。
    pub fn unget_token(&mut self) {
        self.peek_token_index = self.token_index;
        self.peek_line_number = self.line_number;
        self.peek_nest_level = self.nest_level;
        self.token_index = self.undo_token_index;
        self.line_number = self.undo_line_number;
        self.nest_level = self.undo_nest_level;
        self.peek_token = self.token.clone();
        self.peek_available = true;
    }

    /// トークンの分類と切り出し
    fn do_get_token(&mut self, want_value: bool, want_template: bool) -> String {
        if self.is_eof() {
            return String::new();
        }

        if !self.skip_whitespace() {
            return String::new();
        }

        if self.skip_unwanted_tokens {
            if !self.skip_unwanted(want_value) {
                return String::new();
            }
        } else {
            // スキップ無効時でもコメントだけはここで処理する
            self.skip_comment(true);
        }

        // スキップ中に終端へ達していたら番兵を拾わずここで止める
        if self.is_eof() {
            return String::new();
        }

        let start = self.token_index;
        let mut need_replace = false;

        let token;
        let c = self.current_char();

        if c == '_' || c.is_alphabetic() {
            // キーワード・識別子
            loop {
                let ch = self.current_char();
                if (ch == '_' || ch.is_alphanumeric()) && self.move_to_next_char() {
                    continue;
                }
                break;
            }

            if self.is_eof() {
                return String::new();
            }

            need_replace = true;
            token = self.buffer.slice(start, self.token_index);
            self.is_operator = token == "operator";
        } else if c.is_ascii_digit() {
            // 数値: 字句的に妥当そうな文字の最長一致で、数値文法の検証はしない
            while self.not_eof()
                && "0123456789.abcdefABCDEFXxLl".contains(self.current_char())
            {
                self.move_to_next_char();
            }

            if self.is_eof() {
                return String::new();
            }

            token = self.buffer.slice(start, self.token_index);
            self.is_operator = false;
        } else if c == '"' || c == '\'' {
            // リテラル全体を引用符込みで1トークンとして返す
            self.skip_string();
            token = self.buffer.slice(start, self.token_index);
        } else if c == ':' {
            if self.next_char() == ':' {
                self.move_to_next_char();
                self.move_to_next_char();
                token = "::".to_string();
            } else {
                self.move_to_next_char();
                token = ":".to_string();
            }
        } else if c == '<' && want_template {
            // テンプレート引数リスト: > か行末まで（この階層では入れ子は見ない）
            self.move_to_next_char();
            self.skip_to_one_of_chars(">\r\n", false);
            self.move_to_next_char();
            let inner = self
                .buffer
                .slice(start + 1, self.token_index.saturating_sub(1));
            token = format!("<{}>", inner.trim_end());
        } else if c == '(' {
            self.is_operator = false;

            if !self.skip_block('(') {
                return String::new();
            }

            let raw = self.buffer.slice(start, self.token_index);
            token = compact_spaces(&fix_argument(&raw));
        } else {
            if c == '{' {
                self.nest_level += 1;
            } else if c == '}' {
                self.nest_level -= 1;
            }

            token = c.to_string();
            self.move_to_next_char();
        }

        if need_replace {
            return self.macro_replace(token);
        }

        token
    }

    /// 識別子へのマクロ置換を適用する
    ///
    /// `+` 指令は後続の `(...)` をバッファ上で吸収して `{` に書き換え、
    /// `-` 指令は識別子の占めていた領域を後方から上書きしてカーソルを
    /// 値中の最初の空白位置まで巻き戻す。どちらもバッファ長は変えない。
    fn macro_replace(&mut self, ident: String) -> String {
        let table = self.replacements;
        match table.lookup(&ident) {
            Some(Directive::ParenToBrace(value)) if self.current_char() == '(' => {
                let value = value.to_string();
                let mut pos = self.token_index;
                self.buffer.set_char(pos, ' ');
                let mut fill_space = false;
                // 最初のコンマ以降を空白で潰し、閉じ括弧を '{' に変える
                while pos <= self.buffer.len() && self.buffer.char_at(pos) != ')' {
                    if self.buffer.char_at(pos) == ',' {
                        fill_space = true;
                    }
                    if fill_space {
                        self.buffer.set_char(pos, ' ');
                    }
                    pos += 1;
                }
                self.buffer.set_char(pos, '{');
                value
            }
            Some(Directive::ParenToBrace(_)) => {
                // 呼び出し構文が続かないなら指令は適用しない
                ident
            }
            Some(Directive::RewriteBackward(value)) => {
                let value_chars: Vec<char> = value.chars().collect();
                let value_len = value_chars.len();
                let key_len = ident.chars().count();

                for i in 1..=key_len {
                    if self.token_index < i {
                        break;
                    }
                    if i < value_len {
                        self.buffer
                            .set_char(self.token_index - i, value_chars[value_len - i]);
                    } else {
                        self.buffer.set_char(self.token_index - i, ' ');
                    }
                }

                match value_chars.iter().position(|&ch| ch == ' ') {
                    Some(first_space) => {
                        self.token_index = (self.token_index + first_space)
                            .saturating_sub(value_len);
                        value_chars[..first_space].iter().collect()
                    }
                    // 空白を含まない値では巻き戻し先がないのでそのまま返す
                    None => value.to_string(),
                }
            }
            Some(Directive::Literal(value)) => value.to_string(),
            None => ident,
        }
    }
}

/// 括弧付き引数リストを正規化する
///
/// タブ・改行を空白化し、`,`/`=` 直前の空白と `=` から次のトップレベル
/// `,` までのデフォルト値、埋め込みの `/*...*/` を除去する。
/// 結果は必ず `)` で終わる。
fn fix_argument(src: &str) -> String {
    let mut src: Vec<char> = src.chars().collect();
    for c in src.iter_mut() {
        if *c == '\t' || *c == '\r' || *c == '\n' {
            *c = ' ';
        }
    }

    let len = src.len();
    let mut dst = String::with_capacity(len);

    let mut i = 0usize;
    while i + 1 < len {
        let c = src[i];
        let n = src[i + 1];

        // ',' と '=' の直前の空白は落とす
        if c == ' ' && (n == ',' || n == '=') {
            i += 1;
            continue;
        }

        if c == '/' && n == '*' {
            // 埋め込みCコメントを読み飛ばす
            i += 2;
            while i + 1 < len {
                if src[i] == '*' && src[i + 1] == '/' {
                    break;
                }
                i += 1;
            }

            if i + 1 >= len || src[i + 1] != '/' {
                // 閉じられていないコメント
                i += 1;
                continue;
            }

            i += 2;
        } else if c == '=' {
            // デフォルト値を次のトップレベル ',' か閉じ括弧まで落とす
            i += 1;
            let mut level = 0i32;
            while i < len {
                if src[i] == '(' {
                    level += 1;
                } else if src[i] == ')' {
                    level -= 1;
                }

                if (src[i] == ',' && level == 0) || (src[i] == ')' && level < 0) {
                    break;
                }

                i += 1;
            }

            if i < len && src[i] == ',' {
                i -= 1;
            }
            i += 1;
            continue;
        }

        if i + 1 < len {
            if src[i] == ' ' && src[i + 1] == ' ' {
                i += 1;
                continue;
            }
            dst.push(src[i]);
        }
        i += 1;
    }

    // 閉じ括弧はループで除かれているのでここで付け直す
    dst.push(')');
    dst
}

/// 連続する空白を1つに圧縮する
fn compact_spaces(src: &str) -> String {
    let mut dst = String::with_capacity(src.len());
    let mut last_was_space = false;
    for c in src.chars() {
        if c == ' ' {
            if !last_was_space {
                dst.push(' ');
            }
            last_was_space = true;
        } else {
            dst.push(c);
            last_was_space = false;
        }
    }
    dst
}

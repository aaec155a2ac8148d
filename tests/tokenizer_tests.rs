//! Tokenizer integration tests

use std::io::Write;

use cpp_tokenizer::{InitError, ReplacementTable, Tokenizer};

/// Helper to collect all tokens from a source string
fn tokenize(source: &str) -> Vec<String> {
    let table = ReplacementTable::new();
    let mut tokenizer = Tokenizer::new(&table);
    tokenizer.init_from_buffer(source);

    let mut tokens = Vec::new();
    loop {
        let token = tokenizer.get_token(false, false);
        if token.is_empty() {
            break;
        }
        tokens.push(token);
    }
    tokens
}

#[test]
fn test_end_to_end_scenario() {
    // Full scenario from a typical function declaration
    let table = ReplacementTable::new();
    let mut tokenizer = Tokenizer::new(&table);
    tokenizer.init_from_buffer("int f(int a = foo(1,2), char b) { return a; }\n");

    assert_eq!(tokenizer.get_token(false, false), "int");
    assert_eq!(tokenizer.get_token(false, false), "f");
    assert_eq!(tokenizer.get_token(false, false), "(int a, char b)");
    assert_eq!(tokenizer.get_token(false, false), "{");
    assert_eq!(tokenizer.nest_level(), 1);
    assert_eq!(tokenizer.get_token(false, false), "return");
    assert_eq!(tokenizer.get_token(false, false), "a");
    assert_eq!(tokenizer.get_token(false, false), ";");
    assert_eq!(tokenizer.get_token(false, false), "}");
    assert_eq!(tokenizer.nest_level(), 0);
    assert_eq!(tokenizer.get_token(false, false), "");
    // Repeated calls at EOF keep returning the empty token
    assert_eq!(tokenizer.get_token(false, false), "");
}

#[test]
fn test_preprocessor_define_skipped() {
    // With the default options a #define line never surfaces
    assert_eq!(tokenize("#define X 1\nint y;\n"), vec!["int", "y", ";"]);
}

#[test]
fn test_preprocessor_include_surfaces() {
    let table = ReplacementTable::new();
    let mut tokenizer = Tokenizer::new(&table);
    tokenizer.init_from_buffer("#include \"config.h\"\nint y;\n");

    assert_eq!(tokenizer.get_token(false, false), "#");
    assert!(tokenizer.last_was_preprocessor());
    assert_eq!(tokenizer.get_token(false, false), "include");
    // The parser reads the rest of the directive line raw
    assert_eq!(tokenizer.read_to_eol(false).trim(), "\"config.h\"");
    assert_eq!(tokenizer.get_token(false, false), "int");
}

#[test]
fn test_preprocessor_conditionals_surface() {
    let table = ReplacementTable::new();
    let mut tokenizer = Tokenizer::new(&table);
    tokenizer.init_from_buffer("#ifdef A\nint x;\n#endif\n");

    assert_eq!(tokenizer.get_token(false, false), "#");
    assert_eq!(tokenizer.get_token(false, false), "ifdef");
    assert_eq!(tokenizer.get_token(false, false), "A");
    assert_eq!(tokenizer.get_token(false, false), "int");
    assert_eq!(tokenizer.get_token(false, false), "x");
    assert_eq!(tokenizer.get_token(false, false), ";");
    assert_eq!(tokenizer.get_token(false, false), "#");
    assert_eq!(tokenizer.get_token(false, false), "endif");
}

#[test]
fn test_operator_scenario() {
    // Inside an operator declaration '=' is an ordinary token
    let table = ReplacementTable::new();
    let mut tokenizer = Tokenizer::new(&table);
    tokenizer.init_from_buffer("operator=(int x)\n");

    assert_eq!(tokenizer.get_token(false, false), "operator");
    assert_eq!(tokenizer.get_token(false, false), "=");
    assert_eq!(tokenizer.get_token(false, false), "(int x)");
}

#[test]
fn test_operator_bracket() {
    let table = ReplacementTable::new();
    let mut tokenizer = Tokenizer::new(&table);
    tokenizer.init_from_buffer("operator[](int i)\n");

    assert_eq!(tokenizer.get_token(false, false), "operator");
    assert_eq!(tokenizer.get_token(false, false), "[");
    assert_eq!(tokenizer.get_token(false, false), "]");
    assert_eq!(tokenizer.get_token(false, false), "(int i)");
}

#[test]
fn test_string_escape_rules() {
    // "a\"b" is one 6-char literal including the quotes
    let tokens = tokenize("\"a\\\"b\" x\n");
    assert_eq!(tokens[0].chars().count(), 6);
    assert_eq!(tokens[0], "\"a\\\"b\"");

    // Even number of backslashes does not escape the quote
    let tokens = tokenize("\"a\\\\\" x\n");
    assert_eq!(tokens, vec!["\"a\\\\\"", "x"]);
}

#[test]
fn test_char_literal() {
    assert_eq!(tokenize("'a' x\n"), vec!["'a'", "x"]);
    assert_eq!(tokenize("'\\'' x\n"), vec!["'\\''", "x"]);
}

#[test]
fn test_comment_chaining() {
    // Consecutive comments are skipped in one go
    assert_eq!(
        tokenize("/* a */ // b\n/* c */ int x;\n"),
        vec!["int", "x", ";"]
    );
}

#[test]
fn test_line_numbers_across_comments() {
    let table = ReplacementTable::new();
    let mut tokenizer = Tokenizer::new(&table);
    tokenizer.init_from_buffer("// one\n// two\nint x;\n");

    assert_eq!(tokenizer.get_token(false, false), "int");
    assert_eq!(tokenizer.line_number(), 3);
}

#[test]
fn test_peek_get_round_trip() {
    let table = ReplacementTable::new();
    let mut tokenizer = Tokenizer::new(&table);
    tokenizer.init_from_buffer("alpha beta gamma\n");

    let peeked = tokenizer.peek_token(false, false);
    assert_eq!(peeked, "alpha");
    // get after peek returns the same text without rescanning
    assert_eq!(tokenizer.get_token(false, false), "alpha");
    assert_eq!(tokenizer.get_token(false, false), "beta");

    // unget followed by get reproduces the token identically
    tokenizer.unget_token();
    assert_eq!(tokenizer.get_token(false, false), "beta");
    assert_eq!(tokenizer.get_token(false, false), "gamma");
}

#[test]
fn test_unget_restores_line_and_nesting() {
    let table = ReplacementTable::new();
    let mut tokenizer = Tokenizer::new(&table);
    tokenizer.init_from_buffer("x\n{\n");

    tokenizer.get_token(false, false);
    let line_before = tokenizer.line_number();
    let nest_before = tokenizer.nest_level();
    tokenizer.get_token(false, false); // '{'
    assert_eq!(tokenizer.nest_level(), nest_before + 1);

    tokenizer.unget_token();
    assert_eq!(tokenizer.line_number(), line_before);
    assert_eq!(tokenizer.nest_level(), nest_before);
    assert_eq!(tokenizer.get_token(false, false), "{");
}

#[test]
fn test_template_mode() {
    let table = ReplacementTable::new();
    let mut tokenizer = Tokenizer::new(&table);
    tokenizer.init_from_buffer("vector<int> v;\n");

    assert_eq!(tokenizer.get_token(false, false), "vector");
    assert_eq!(tokenizer.get_token(false, true), "<int>");
    assert_eq!(tokenizer.get_token(false, false), "v");
}

#[test]
fn test_template_mode_off() {
    // Without template mode '<' is a plain single-char token
    let table = ReplacementTable::new();
    let mut tokenizer = Tokenizer::new(&table);
    tokenizer.init_from_buffer("a < b;\n");

    assert_eq!(tokenizer.get_token(false, false), "a");
    assert_eq!(tokenizer.get_token(false, false), "<");
    assert_eq!(tokenizer.get_token(false, false), "b");
}

#[test]
fn test_value_mode_reads_assigned_value() {
    let table = ReplacementTable::new();
    let mut tokenizer = Tokenizer::new(&table);
    tokenizer.init_from_buffer("const int x = 42;\n");

    assert_eq!(tokenizer.get_token(false, false), "const");
    assert_eq!(tokenizer.get_token(false, false), "int");
    assert_eq!(tokenizer.get_token(false, false), "x");
    assert_eq!(tokenizer.get_token(true, false), "42");
    assert_eq!(tokenizer.get_token(false, false), ";");
}

#[test]
fn test_malformed_input_degrades_to_no_tokens() {
    // Unterminated constructs never abort, they just stop producing tokens
    assert_eq!(tokenize("int f(\n"), vec!["int", "f"]);
    assert_eq!(tokenize("char* s = \"abc\n"), vec!["char", "*", "s"]);
    assert_eq!(tokenize("int /* never closed\n"), vec!["int"]);
}

#[test]
fn test_block_skip_consecutive_blocks() {
    // The assignment skip must clear both <foo> and (bar)
    assert_eq!(
        tokenize("x = sometemplate<foo>(bar), y;\n"),
        vec!["x", ",", "y", ";"]
    );
}

#[test]
fn test_init_from_missing_file() {
    let table = ReplacementTable::new();
    let mut tokenizer = Tokenizer::new(&table);
    let err = tokenizer.init(std::path::Path::new("/no/such/dir/file.cpp"));
    assert!(matches!(err, Err(InitError::FileNotFound(_))));
    assert!(!tokenizer.is_ok());
}

#[test]
fn test_init_from_empty_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.flush().unwrap();

    let table = ReplacementTable::new();
    let mut tokenizer = Tokenizer::new(&table);
    let err = tokenizer.init(file.path());
    assert!(matches!(err, Err(InitError::EmptyBuffer(_))));
}

#[test]
fn test_init_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "int main() {{ return 0; }}\n").unwrap();
    file.flush().unwrap();

    let table = ReplacementTable::new();
    let mut tokenizer = Tokenizer::from_file(file.path(), &table).unwrap();
    assert!(tokenizer.is_ok());
    assert_eq!(tokenizer.filename(), Some(file.path()));

    assert_eq!(tokenizer.get_token(false, false), "int");
    assert_eq!(tokenizer.get_token(false, false), "main");
    assert_eq!(tokenizer.get_token(false, false), "()");
}

#[test]
fn test_init_latin1_fallback() {
    // Invalid UTF-8 bytes fall back to Latin-1 decoding
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"int x; // caf\xe9\n").unwrap();
    file.flush().unwrap();

    let table = ReplacementTable::new();
    let mut tokenizer = Tokenizer::from_file(file.path(), &table).unwrap();
    assert_eq!(tokenizer.get_token(false, false), "int");
    assert_eq!(tokenizer.get_token(false, false), "x");
    assert_eq!(tokenizer.get_token(false, false), ";");
}

#[test]
fn test_reinit_resets_state() {
    let table = ReplacementTable::new();
    let mut tokenizer = Tokenizer::new(&table);
    tokenizer.init_from_buffer("{ x\n");
    tokenizer.get_token(false, false);
    assert_eq!(tokenizer.nest_level(), 1);

    tokenizer.init_from_buffer("y\n");
    assert_eq!(tokenizer.nest_level(), 0);
    assert_eq!(tokenizer.line_number(), 1);
    assert_eq!(tokenizer.get_token(false, false), "y");
}

#[test]
fn test_dos_line_endings() {
    assert_eq!(tokenize("int x;\r\nint y;\r\n"), vec!["int", "x", ";", "int", "y", ";"]);
}

#[test]
fn test_line_continuation_in_line_comment() {
    // A trailing backslash continues the comment over the next physical line
    assert_eq!(tokenize("// a\\\nstill comment\nz\n"), vec!["z"]);
}

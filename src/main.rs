//! トークンダンプCLI
//!
//! ファイルをトークナイズして1行1トークンで出力する開発用ツール。
//! ライブラリ本体の薄い消費者であり、コア API 以外には触れない。

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use clap::Parser;

use cpp_tokenizer::{ReplacementTable, Tokenizer};

/// コマンドライン引数
#[derive(Parser)]
#[command(name = "cpp-tokenizer")]
#[command(version, about = "C/C++ token dump tool")]
struct Cli {
    /// 入力 C/C++ ファイル
    input: PathBuf,

    /// 置換テーブル（JSONファイル: {"識別子": "指示文字列", ...}）
    #[arg(short = 'r', long = "replacements")]
    replacements: Option<PathBuf>,

    /// #define 行をトークンとして表面化する
    #[arg(long = "want-preprocessor")]
    want_preprocessor: bool,

    /// テンプレート引数リスト <...> を1トークンにまとめる
    #[arg(long = "template")]
    template: bool,

    /// 行番号を出力しない
    #[arg(long = "no-lines")]
    no_lines: bool,

    /// 出力ファイル（省略時は標準出力）
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // 置換テーブルはトークナイズ開始前に一度だけ読み込む
    let table = match cli.replacements {
        Some(ref path) => ReplacementTable::from_json_file(path)?,
        None => ReplacementTable::new(),
    };

    let mut tokenizer = Tokenizer::from_file(&cli.input, &table)?;
    tokenizer.options_mut().want_preprocessor = cli.want_preprocessor;

    if let Some(output_path) = cli.output {
        let file = File::create(&output_path)?;
        let mut writer = BufWriter::new(file);
        dump_tokens(&mut tokenizer, &mut writer, cli.template, !cli.no_lines)?;
        writer.flush()?;
    } else {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        dump_tokens(&mut tokenizer, &mut handle, cli.template, !cli.no_lines)?;
        handle.flush()?;
    }

    Ok(())
}

/// 空トークンが返るまでトークンを出力する
fn dump_tokens(
    tokenizer: &mut Tokenizer<'_>,
    writer: &mut impl Write,
    template: bool,
    with_lines: bool,
) -> io::Result<()> {
    loop {
        let line = tokenizer.line_number();
        let token = tokenizer.get_token(false, template);
        if token.is_empty() {
            break;
        }
        if with_lines {
            writeln!(writer, "{}\t{}", line, token)?;
        } else {
            writeln!(writer, "{}", token)?;
        }
    }
    Ok(())
}

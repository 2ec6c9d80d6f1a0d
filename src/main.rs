//! vikey - bộ chuyển Telex/VNI cho dòng lệnh
//!
//! Đọc từng dòng từ stdin (hoặc chuỗi truyền thẳng), chạy qua engine
//! và in bản tiếng Việt ra stdout. Từ không phải tiếng Việt giữ nguyên
//! như đã gõ.

use clap::Parser;
use std::io::BufRead;
use std::sync::Arc;
use vikey::config::{load_config, VikeyConfig};
use vikey::fallback::FallbackPolicy;
use vikey::{builtin_definitions, convert_with, parse_input_method, Engine, EngineFlags};

#[derive(Parser, Debug)]
#[command(name = "vikey", version, about = "Chuyển chuỗi phím Telex/VNI thành tiếng Việt")]
struct Args {
    /// Kiểu gõ: Telex, VNI hoặc tên kiểu tự định nghĩa trong cấu hình
    #[arg(short, long)]
    method: Option<String>,

    /// Đặt thanh kiểu mới (hoá, tuỳ) thay vì kiểu chuẩn (hóa, tùy)
    #[arg(long)]
    new_style_tone: bool,

    /// Tắt các phép nắn tự động (tắt uow)
    #[arg(long)]
    no_auto_correct: bool,

    /// Giữ nguyên kết quả kể cả khi từ không phải tiếng Việt
    #[arg(long)]
    keep_invalid: bool,

    /// Chuỗi cần chuyển; bỏ trống thì đọc từng dòng từ stdin
    text: Vec<String>,
}

fn build_engine(args: &Args, config: &VikeyConfig) -> Result<Engine, String> {
    let name = args.method.as_ref().unwrap_or(&config.input_method);
    let mut definitions = builtin_definitions();
    for (n, def) in &config.custom_methods {
        definitions.insert(n.clone(), def.clone());
    }
    let definition = definitions
        .get(name.as_str())
        .ok_or_else(|| format!("không có kiểu gõ '{}'", name))?;
    let method =
        parse_input_method(name, definition).map_err(|e| format!("kiểu gõ '{}': {}", name, e))?;

    let mut flags = config.engine_flags();
    if args.new_style_tone {
        flags -= EngineFlags::STD_TONE_STYLE;
    }
    if args.no_auto_correct {
        flags -= EngineFlags::AUTO_CORRECT;
    }
    Ok(Engine::new(Arc::new(method), flags))
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    let config = load_config();
    let policy = FallbackPolicy {
        auto_restore: config.auto_restore_non_vietnamese && !args.keep_invalid,
        dd_free_style: config.dd_free_style,
    };

    let mut engine = match build_engine(&args, &config) {
        Ok(engine) => engine,
        Err(e) => {
            log::error!("{}", e);
            eprintln!("vikey: {}", e);
            std::process::exit(1);
        }
    };
    log::debug!(
        "kiểu gõ {} | cờ {:?}",
        engine.input_method().name,
        engine.flags()
    );

    if !args.text.is_empty() {
        let line = args.text.join(" ");
        println!("{}", convert_with(&mut engine, &policy, &line));
        return;
    }

    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        match line {
            Ok(line) => println!("{}", convert_with(&mut engine, &policy, &line)),
            Err(e) => {
                log::error!("đọc stdin lỗi: {}", e);
                break;
            }
        }
    }
}

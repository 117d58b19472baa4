//! # Shell 预览提取 — 命令行入口
//!
//! 只做参数解析、日志初始化与结果打印；提取逻辑见 `lib.rs`。

use std::path::PathBuf;
use std::process;

use clap::{Parser, ValueEnum};
use shell_preview::PreviewConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// 先缩略图，失败再预览
    Auto,
    Thumbnail,
    Preview,
    Icon,
}

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// 要提取的文件
    input: PathBuf,

    /// 输出图片（.png 保留透明度，其它扩展名写 24 位 BMP）
    output: PathBuf,

    /// 缩略图 / 图标边长
    #[arg(short, long)]
    size: Option<u32>,

    /// 预览宽度
    #[arg(long)]
    width: Option<u32>,

    /// 预览高度
    #[arg(long)]
    height: Option<u32>,

    #[arg(short, long, value_enum, default_value_t = Mode::Auto)]
    mode: Mode,

    /// JSON 配置文件
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 输出调试日志
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let config = match &cli.config {
        Some(path) => match PreviewConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("{}", e);
                eprintln!("  -> {}", e.kind().hint());
                process::exit(1);
            }
        },
        None => PreviewConfig::default(),
    };

    process::exit(run(&cli, config));
}

#[cfg(target_os = "windows")]
fn run(cli: &Cli, config: PreviewConfig) -> i32 {
    use shell_preview::{ImageHandle, PreviewError, ShellPreview};

    fn report(stage: &str, err: &PreviewError) {
        eprintln!("{} 失败: {}", stage, err);
        eprintln!("  -> {:?}: {}", err.kind(), err.kind().hint());
    }

    let size = cli.size.unwrap_or(config.default_size);
    let width = cli.width.unwrap_or(size);
    let height = cli.height.unwrap_or(size);

    let preview = match ShellPreview::new(config) {
        Ok(preview) => preview,
        Err(e) => {
            report("初始化", &e);
            return 1;
        }
    };

    println!("输入: {}", cli.input.display());
    let result: Result<ImageHandle, PreviewError> = match cli.mode {
        Mode::Thumbnail => preview.get_thumbnail(&cli.input, size),
        Mode::Preview => preview.get_preview(&cli.input, width, height),
        Mode::Icon => preview.get_icon(&cli.input, size),
        Mode::Auto => preview.get_thumbnail(&cli.input, size).or_else(|e| {
            report("缩略图", &e);
            println!("改用预览方式...");
            preview.get_preview(&cli.input, width, height)
        }),
    };

    let handle = match result {
        Ok(handle) => handle,
        Err(e) => {
            report("提取", &e);
            return 1;
        }
    };

    println!(
        "位图: {}x{}, {} bits, alpha={}",
        handle.width(),
        handle.height(),
        handle.bit_depth(),
        handle.alpha_mode().as_str()
    );

    let saved = preview.save_to_file(&handle, &cli.output);
    preview.release(handle);

    match saved {
        Ok(()) => {
            println!("已保存: {}", cli.output.display());
            0
        }
        Err(e) => {
            report("保存", &e);
            1
        }
    }
}

#[cfg(not(target_os = "windows"))]
fn run(cli: &Cli, _config: PreviewConfig) -> i32 {
    eprintln!(
        "Shell 预览提取仅在 Windows 上可用: input={} output={} mode={:?}",
        cli.input.display(),
        cli.output.display(),
        cli.mode
    );
    1
}

use clap::{Parser, ValueEnum};
use screenplay_rust::{
    api,
    collection_to_json,
    parse_any,
    write_interchange_xml,
    write_plain_text,
    Conf,
    ParseControl,
    ProgressUpdate,
};
use std::fs;
use std::path::PathBuf;
use std::process;

#[derive(Parser, Debug)]
#[command(name = "screenplay-convert")]
#[command(about = "在 Fountain、FDX 和 JSON 之间转换剧本")]
struct Args {
    /// 输入文件（Fountain 或 FDX，自动识别）
    input: PathBuf,

    /// 输出格式
    #[arg(long, value_enum, default_value_t = Target::Json)]
    to: Target,

    /// JSON 格式的解析配置
    #[arg(long, value_name = "CONF_JSON")]
    config: Option<PathBuf>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Target {
    Fountain,
    Fdx,
    Json,
}

fn load_conf(path: Option<&PathBuf>) -> Result<Conf, String> {
    let Some(path) = path else {
        return Ok(Conf::default());
    };
    let json = fs::read_to_string(path).map_err(|e| e.to_string())?;
    Conf::from_json_str(&json).map_err(|e| e.to_string())
}

fn main() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let args = Args::parse();

    let conf = match load_conf(args.config.as_ref()) {
        Ok(conf) => conf,
        Err(e) => {
            eprintln!("读取配置失败: {}", e);
            process::exit(1);
        }
    };

    let bytes = match fs::read(&args.input) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("读取文件失败: {}", e);
            process::exit(1);
        }
    };

    let progress = |update: ProgressUpdate| match update.fraction_completed {
        Some(fraction) => log::debug!("{}: {:.0}%", update.description, fraction * 100.0),
        None => log::debug!("{}...", update.description),
    };
    let control = ParseControl::new().with_progress(&progress);

    let format = api::detect_format(&bytes);
    let collection = match parse_any(&bytes, &conf, control) {
        Ok(collection) => {
            let name = args
                .input
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| args.input.display().to_string());
            collection.with_filename(name)
        }
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    };

    log::info!(
        "解析完成 ({:?}): {} 个元素, {} 个章节, {} 条标题页信息",
        format,
        collection.len(),
        collection.chapter_count(),
        collection.title_page().len()
    );

    match args.to {
        Target::Fountain => print!("{}", write_plain_text(&collection)),
        Target::Fdx => print!("{}", String::from_utf8_lossy(&write_interchange_xml(&collection))),
        Target::Json => match collection_to_json(&collection) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("导出 JSON 失败: {}", e);
                process::exit(1);
            }
        },
    }
}

use std::io::Write;
use std::str::FromStr;

/// 将配置中的日志等级字符串转换为 `LevelFilter`
///
/// 无法识别的字符串退回到 `Info`。
pub fn parse_level(level: &str) -> log::LevelFilter {
    log::LevelFilter::from_str(level.trim()).unwrap_or(log::LevelFilter::Info)
}

/// 初始化全局 logger
///
/// 格式：`[HH:MM:SS] LEVEL [file:line] message`。
/// 重复调用时忽略后续的初始化（例如多个测试共享进程）。
pub fn init_log(level: log::LevelFilter) {
    let result = env_logger::Builder::new()
        .format(|buf, record| {
            let info_style = buf
                .default_level_style(log::Level::Info)
                .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green)));
            let warn_style = buf
                .default_level_style(log::Level::Warn)
                .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow)));
            let error_style = buf
                .default_level_style(log::Level::Error)
                .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red)));

            let level_style = match record.level() {
                log::Level::Info => info_style,
                log::Level::Warn => warn_style,
                log::Level::Error => error_style,
                _ => buf.default_level_style(record.level()),
            };
            let grey_style = info_style.fg_color(Some(anstyle::Color::Rgb(anstyle::RgbColor(110, 110, 110))));

            let line = record.line().unwrap_or(!0);
            let file = record.file().unwrap_or("").rsplit(|c| c == '/' || c == '\\').next().unwrap_or("");
            let time = chrono::Local::now().format("%H:%M:%S");
            let level = record.level();

            writeln!(
                buf,
                "{level_style}[{time}] {level}{level_style:#} {grey_style}[{file}:{line}]{grey_style:#} {}",
                record.args()
            )
        })
        .filter(None, level)
        .try_init();

    if result.is_err() {
        log::debug!("logger already initialized");
    }
}

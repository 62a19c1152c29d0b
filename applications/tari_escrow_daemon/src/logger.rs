//    Copyright 2024 The Tari Project
//    SPDX-License-Identifier: BSD-3-Clause

pub fn init_logger() -> Result<(), log::SetLoggerError> {
    fn should_skip(target: &str) -> bool {
        const SKIP: [&str; 3] = ["hyper::", "h2::", "tower::"];
        if SKIP.iter().any(|s| target.starts_with(s)) {
            return true;
        }

        false
    }

    let colors = fern::colors::ColoredLevelConfig::new()
        .info(fern::colors::Color::Green)
        .debug(fern::colors::Color::Yellow)
        .error(fern::colors::Color::Red);
    fern::Dispatch::new()
        .format(move |out, message, record| {
            if should_skip(record.target()) {
                return;
            }

            out.finish(format_args!(
                "[{} {} {}] {}",
                humantime::format_rfc3339(std::time::SystemTime::now()),
                record.metadata().target(),
                colors.color(record.level()),
                message
            ))
        })
        .level(log::LevelFilter::Info)
        .level_for("tari::escrow", log::LevelFilter::Debug)
        .chain(std::io::stdout())
        .apply()
}

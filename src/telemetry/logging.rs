use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::{Mutex, OnceLock};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd)]
enum LogFile {
    Session,
    Error,
}

struct Logger {
    files: Mutex<BTreeMap<LogFile, File>>,
}

static LOGGER: OnceLock<Logger> = OnceLock::new();

pub fn init(root: &Path) -> Result<(), String> {
    if LOGGER.get().is_some() {
        return Ok(());
    }
    let log_dir = root.join("log");
    std::fs::create_dir_all(&log_dir)
        .map_err(|err| format!("log directory create failed: {}", err))?;

    let mut files = BTreeMap::new();
    for (log_file, name) in [(LogFile::Session, "session.log"), (LogFile::Error, "error.log")] {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_dir.join(name))
            .map_err(|err| format!("open log {} failed: {}", name, err))?;
        files.insert(log_file, file);
    }

    LOGGER
        .set(Logger {
            files: Mutex::new(files),
        })
        .map_err(|_| "log system already initialized".to_string())?;
    Ok(())
}

/// Best-effort: silently does nothing before init, never fails the caller.
pub fn log_session(message: &str) {
    write_timestamped(LogFile::Session, message);
}

pub fn log_error(message: &str) {
    write_timestamped(LogFile::Error, message);
}

fn write_timestamped(log_file: LogFile, message: &str) {
    let Some(logger) = LOGGER.get() else {
        return;
    };
    let line = format!("{} {}\n", format_timestamp(unix_timestamp()), message);
    let Ok(mut files) = logger.files.lock() else {
        return;
    };
    if let Some(file) = files.get_mut(&log_file) {
        let _ = file.write_all(line.as_bytes());
        let _ = file.flush();
    }
}

fn unix_timestamp() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

fn format_timestamp(ts: i64) -> String {
    let secs = ts.max(0);
    let days = secs / 86_400;
    let second_of_day = (secs % 86_400) as u32;
    let (year, month, day) = civil_from_days(days);
    format!(
        "{:02}.{:02}.{} {:02}:{:02}:{:02}",
        day,
        month,
        year,
        second_of_day / 3_600,
        (second_of_day % 3_600) / 60,
        second_of_day % 60
    )
}

// Civil-from-days conversion; log timestamps need no time crate.
fn civil_from_days(days: i64) -> (i32, u32, u32) {
    let z = days + 719_468;
    let era = if z >= 0 { z } else { z - 146_096 } / 146_097;
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1_460 + doe / 36_524 - doe / 146_096) / 365;
    let y = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = mp + if mp < 10 { 3 } else { -9 };
    let year = (y + if m <= 2 { 1 } else { 0 }) as i32;
    (year, m as u32, d as u32)
}

use std::path::Path;
use std::time::SystemTime;

use chrono::{DateTime, Local};

use crate::app::ports::ClockPort;
use crate::error::Result;

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Wall clock and filesystem timestamps in local time
pub struct SystemClock;

fn format_time(time: SystemTime) -> String {
    DateTime::<Local>::from(time).format(TIME_FORMAT).to_string()
}

impl ClockPort for SystemClock {
    fn today(&self) -> String {
        Local::now().format(DATE_FORMAT).to_string()
    }

    /// Start is the earliest of creation and modification time, end is the modification time.
    fn file_window(&self, path: &Path) -> Result<(String, String)> {
        let meta = std::fs::metadata(path)?;
        let modified = meta.modified()?;
        let start = match meta.created() {
            Ok(created) if created < modified => created,
            _ => modified,
        };
        Ok((format_time(start), format_time(modified)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_window_is_ordered() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let (start, end) = SystemClock.file_window(file.path()).unwrap();
        assert!(start <= end);
        assert_eq!(start.len(), "2024-01-01 00:00:00".len());
        assert_eq!(SystemClock.today().len(), "2024-01-01".len());
    }
}

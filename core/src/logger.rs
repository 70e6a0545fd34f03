// Global ring-buffer sink for the `log` facade

use core::fmt::{self, Write};
use spin::Mutex;

const MAX_LOG_ENTRIES: usize = 512;
/// Longer lines are truncated.
pub const MAX_LINE_LEN: usize = 120;

/// One captured log line.
#[derive(Clone, Copy)]
pub struct LogLine {
    pub level: log::Level,
    buf: [u8; MAX_LINE_LEN],
    len: usize,
}

impl LogLine {
    const EMPTY: LogLine = LogLine {
        level: log::Level::Info,
        buf: [0; MAX_LINE_LEN],
        len: 0,
    };

    pub fn as_str(&self) -> &str {
        // Truncation only ever happens on a char boundary (see write_str)
        core::str::from_utf8(&self.buf[..self.len]).unwrap_or("")
    }
}

impl Write for LogLine {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for ch in s.chars() {
            let n = ch.len_utf8();
            if self.len + n > MAX_LINE_LEN {
                break;
            }
            ch.encode_utf8(&mut self.buf[self.len..self.len + n]);
            self.len += n;
        }
        Ok(())
    }
}

impl fmt::Debug for LogLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.level, self.as_str())
    }
}

struct Ring {
    lines: [LogLine; MAX_LOG_ENTRIES],
    count: usize, // Total logs written
}

static RING: Mutex<Ring> = Mutex::new(Ring {
    lines: [LogLine::EMPTY; MAX_LOG_ENTRIES],
    count: 0,
});

/// `log::Log` implementation writing into the global ring.
pub struct RingLogger;

static LOGGER: RingLogger = RingLogger;

impl log::Log for RingLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let mut line = LogLine::EMPTY;
        line.level = record.level();
        let _ = write!(line, "{}", record.args());
        push(line);
    }

    fn flush(&self) {}
}

/// Install the ring as the global logger.
pub fn init(level: log::LevelFilter) -> Result<(), log::SetLoggerError> {
    log::set_logger(&LOGGER)?;
    log::set_max_level(level);
    Ok(())
}

fn push(line: LogLine) {
    let mut ring = RING.lock();
    let idx = ring.count % MAX_LOG_ENTRIES; // Ring buffer wrap-around
    ring.lines[idx] = line;
    ring.count += 1;
}

/// Iterator over a snapshot of log entries in chronological order
pub struct LogIterator {
    start: usize,
    current: usize,
    remaining: usize,
}

impl Iterator for LogIterator {
    type Item = LogLine;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        let ring = RING.lock();
        // Entries older than the buffer were overwritten meanwhile
        let oldest = ring.count.saturating_sub(MAX_LOG_ENTRIES);
        let seq = (self.start + self.current).max(oldest);
        if seq >= ring.count {
            return None;
        }
        self.current += 1;
        self.remaining -= 1;
        Some(ring.lines[seq % MAX_LOG_ENTRIES])
    }
}

pub fn get_logs_iter() -> LogIterator {
    let total = total_log_count();
    let num_logs = total.min(MAX_LOG_ENTRIES);

    LogIterator {
        start: total - num_logs,
        current: 0,
        remaining: num_logs,
    }
}

/// Get the last N log entries (up to MAX_LOG_ENTRIES)
pub fn get_last_n_logs(n: usize) -> LogIterator {
    let total = total_log_count();
    let num_logs = n.min(total.min(MAX_LOG_ENTRIES));

    LogIterator {
        start: total - num_logs,
        current: 0,
        remaining: num_logs,
    }
}

/// Entries logged since sequence number `seq` (as returned by `total_log_count`).
pub fn logs_since(seq: usize) -> LogIterator {
    let total = total_log_count();
    let num_logs = total.saturating_sub(seq).min(MAX_LOG_ENTRIES);

    LogIterator {
        start: total - num_logs,
        current: 0,
        remaining: num_logs,
    }
}

pub fn log_count() -> usize {
    total_log_count().min(MAX_LOG_ENTRIES)
}

pub fn total_log_count() -> usize {
    RING.lock().count
}

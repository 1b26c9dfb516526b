//! Platform abstraction layer to allow users to override how the crate interacts with its environment.
//!
//! Currently the layer covers time keeping and log emission: every log message produced by the crate is formatted
//! into a [`LogEntry`] and handed to the registered `emit_log_message` function. Without a registered
//! implementation, `std` builds print messages of level [`LogLevel::Info`] and above to stderr, and `no_std` builds
//! drop them.

use core::ptr;
use core::sync::atomic::{AtomicPtr, Ordering};

use crate::alloc::Box;

static PLATFORM: AtomicPtr<PlatformImpl> = AtomicPtr::new(ptr::null_mut());

/// Initialize the platform abstraction layer.
///
/// Calls the `init` function of the registered platform implementation, if any.
pub fn pal_init() {
    if let Some(init) = registered().and_then(|p| p.init) {
        init();
    }
}

/// Override the platform functions with user implementations.
///
/// Any unset entries keep the default implementation. This function also calls the new platform's init function, if
/// set. A later registration replaces an earlier one; implementations are never deallocated, so registrations are
/// expected to happen a handful of times during the process lifetime, typically once at startup.
pub fn register_platform_impl(plat_impl: PlatformImpl) {
    let plat_impl: &'static PlatformImpl = Box::leak(Box::new(plat_impl));
    PLATFORM.store(plat_impl as *const PlatformImpl as *mut PlatformImpl, Ordering::Release);
    if let Some(init) = plat_impl.init {
        init();
    }
}

fn registered() -> Option<&'static PlatformImpl> {
    let plat_impl = PLATFORM.load(Ordering::Acquire);
    // Safety: the pointer is either null or was leaked from a Box in `register_platform_impl` and is never freed
    unsafe { plat_impl.as_ref() }
}

/// Table of platform abstraction layer functions.
#[derive(Clone, Copy)]
pub struct PlatformImpl {
    init: Option<fn()>,
    current_ticks: Option<fn() -> Timestamp>,
    emit_log_message: Option<fn(&LogEntry)>,
    source_filename: Option<&'static str>,
}
impl PlatformImpl {
    /// Create a new, empty PlatformImpl.
    ///
    /// By default, all functions are unset, meaning the default implementations will be used.
    ///
    /// # Arguments
    ///
    /// * `source_filename` - Optional string representing the source filename the platform implementation is defined
    ///   in. In case of multiple platform implementations being registered, this can help in debugging.
    pub fn new(source_filename: Option<&'static str>) -> Self {
        Self {
            init: None,
            current_ticks: None,
            emit_log_message: None,
            source_filename,
        }
    }

    /// Set the init function.
    ///
    /// The init function is called when the implementation is registered and on every [`pal_init`] call.
    pub fn set_init(&mut self, f: fn()) {
        self.init = Some(f);
    }

    /// Set the current_ticks function.
    ///
    /// The current_ticks function returns a monotonically non-decreasing timestamp in system ticks.
    pub fn set_current_ticks(&mut self, f: fn() -> Timestamp) {
        self.current_ticks = Some(f);
    }

    /// Set the emit_log_message function.
    ///
    /// The function receives every log entry emitted by the crate, regardless of its level.
    pub fn set_emit_log_message(&mut self, f: fn(&LogEntry)) {
        self.emit_log_message = Some(f);
    }

    /// The source filename given at construction, if any.
    pub fn source_filename(&self) -> Option<&'static str> {
        self.source_filename
    }
}

/// Platform timestamp in system ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Timestamp(u64);
impl Timestamp {
    /// Create a new Timestamp from the given tick count.
    pub fn new(ticks: u64) -> Self {
        Self(ticks)
    }

    /// Get the tick count of this Timestamp.
    pub fn ticks(&self) -> u64 {
        self.0
    }
}

/// Returns the current timestamp, using the registered `current_ticks` function if set.
///
/// The default implementation returns nanoseconds since the Unix epoch with `std`, and zero without it.
pub fn current_ticks() -> Timestamp {
    if let Some(current_ticks) = registered().and_then(|p| p.current_ticks) {
        return current_ticks();
    }
    cfg_if::cfg_if! { if #[cfg(feature = "std")] {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);
        Timestamp(nanos)
    } else {
        Timestamp(0)
    } }
}

/// Severity level of a log message
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[allow(missing_docs)]
pub enum LogLevel {
    Debug,
    Info,
    Error,
    Fatal,
}
impl LogLevel {
    /// Single character tag of the level, as used by the default log sink.
    pub fn as_char(self) -> char {
        match self {
            LogLevel::Debug => 'D',
            LogLevel::Info => 'I',
            LogLevel::Error => 'E',
            LogLevel::Fatal => 'F',
        }
    }
}

/// A log entry, consumed by the platform log message handler.
#[derive(Debug)]
pub struct LogEntry<'a> {
    /// Timestamp of the log message.
    pub timestamp: Timestamp,
    /// Log level of the message.
    pub level: LogLevel,
    /// Filename where the log message was emitted, if available.
    pub filename: Option<&'a str>,
    /// Module path where the log message was emitted, if available.
    pub module_path: Option<&'a str>,
    /// Line number where the log message was emitted.
    pub line: usize,
    /// The log message.
    ///
    /// Messages longer than the internal buffer are truncated.
    pub message: &'a str,
}

const MAX_LOG_MESSAGE_LEN: usize = 256;

struct FormatBuffer {
    buf: [u8; MAX_LOG_MESSAGE_LEN],
    len: usize,
}
impl FormatBuffer {
    fn as_str(&self) -> &str {
        // only whole chars are ever written
        core::str::from_utf8(&self.buf[..self.len]).unwrap_or("? (format error)")
    }
}
impl core::fmt::Write for FormatBuffer {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        let remaining = &mut self.buf[self.len..];
        if s.len() <= remaining.len() {
            remaining[..s.len()].copy_from_slice(s.as_bytes());
            self.len += s.len();
            return Ok(());
        }
        let mut n = remaining.len();
        while !s.is_char_boundary(n) {
            n -= 1;
        }
        remaining[..n].copy_from_slice(&s.as_bytes()[..n]);
        self.len += n;
        Err(core::fmt::Error) // not enough space
    }
}

pub(crate) fn emit_log(
    level: LogLevel,
    filename: &'static str,
    module_path: &'static str,
    line: usize,
    msg_args: core::fmt::Arguments,
) {
    let sink = registered().and_then(|p| p.emit_log_message);
    if sink.is_none() && !default_sink_accepts(level) {
        return;
    }
    let mut msg_buf = FormatBuffer {
        buf: [0; MAX_LOG_MESSAGE_LEN],
        len: 0,
    };
    // a truncated message is still emitted
    let _ = core::fmt::write(&mut msg_buf, msg_args);

    let entry = LogEntry {
        timestamp: current_ticks(),
        level,
        filename: Some(filename),
        module_path: Some(module_path),
        line,
        message: msg_buf.as_str(),
    };
    match sink {
        Some(emit_log_message) => emit_log_message(&entry),
        None => default_emit_log_message(&entry),
    }
}

/// Whether the default sink prints entries of the given level.
fn default_sink_accepts(level: LogLevel) -> bool {
    cfg!(feature = "std") && level >= LogLevel::Info
}

fn default_emit_log_message(entry: &LogEntry) {
    cfg_if::cfg_if! { if #[cfg(feature = "std")] {
        eprintln!(
            "{} {:?} {}:{}] {}",
            entry.level.as_char(),
            entry.timestamp.ticks(),
            entry.filename.unwrap_or("?"),
            entry.line,
            entry.message,
        );
    } else {
        let _ = entry;
    } }
}

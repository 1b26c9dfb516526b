macro_rules! log {
    ($level:ident, $($arg:tt)*) => {{
        crate::platform::emit_log(
            crate::platform::LogLevel::$level,
            file!(),
            module_path!(),
            line!() as usize,
            core::format_args!($($arg)*),
        );
    }}
}
macro_rules! debug {
    ($($arg:tt)*) => {{
        crate::log::log!(Debug, $($arg)*);
    }}
}
macro_rules! error {
    ($($arg:tt)*) => {{
        crate::log::log!(Error, $($arg)*);
    }}
}
pub(crate) use debug;
pub(crate) use error;
pub(crate) use log;

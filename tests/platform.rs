use std::sync::atomic::{AtomicU32, Ordering};

use functionalize::platform::{LogEntry, LogLevel, PlatformImpl, Timestamp};
use functionalize::tensor::{empty_strided_meta_symint, Device, SymInt, Tensor};

static INIT_CALLS_COUNT: AtomicU32 = AtomicU32::new(0);
static CURRENT_TICKS_CALLS_COUNT: AtomicU32 = AtomicU32::new(0);
static DEBUG_LOG_CALLS_COUNT: AtomicU32 = AtomicU32::new(0);
static ERROR_LOG_CALLS_COUNT: AtomicU32 = AtomicU32::new(0);

fn emit_log_message(log_entry: &LogEntry) {
    match log_entry.level {
        LogLevel::Debug => DEBUG_LOG_CALLS_COUNT.fetch_add(1, Ordering::SeqCst),
        _ => ERROR_LOG_CALLS_COUNT.fetch_add(1, Ordering::SeqCst),
    };
    assert_eq!(log_entry.timestamp, Timestamp::new(7));
    println!(
        "[custom PAL][{:?}] {}::{}::{} ({:?}) {}",
        log_entry.timestamp,
        log_entry.filename.unwrap_or("?"),
        log_entry.module_path.unwrap_or("?"),
        log_entry.line,
        log_entry.level,
        log_entry.message
    );
}

#[test]
fn custom_pal() {
    let mut plat_impl = PlatformImpl::new(Some(file!()));
    assert_eq!(plat_impl.source_filename(), Some(file!()));
    plat_impl.set_init(|| {
        INIT_CALLS_COUNT.fetch_add(1, Ordering::SeqCst);
    });
    plat_impl.set_current_ticks(|| {
        CURRENT_TICKS_CALLS_COUNT.fetch_add(1, Ordering::SeqCst);
        Timestamp::new(7)
    });
    plat_impl.set_emit_log_message(emit_log_message);

    assert_eq!(INIT_CALLS_COUNT.load(Ordering::SeqCst), 0);
    functionalize::platform::register_platform_impl(plat_impl);
    assert_eq!(INIT_CALLS_COUNT.load(Ordering::SeqCst), 1); // registration should call init
    functionalize::platform::pal_init();
    assert_eq!(INIT_CALLS_COUNT.load(Ordering::SeqCst), 2);
    assert_eq!(functionalize::platform::current_ticks(), Timestamp::new(7));

    // projecting a tensor emits a debug message
    let t = Tensor::from_slice(&[1.0_f32, 2.0, 3.0, 4.0], &[2, 2]).unwrap();
    assert_eq!(DEBUG_LOG_CALLS_COUNT.load(Ordering::SeqCst), 0);
    let _ = functionalize::meta::to_meta(&t).unwrap();
    assert_eq!(DEBUG_LOG_CALLS_COUNT.load(Ordering::SeqCst), 1);

    // cause an error log message by asking the meta allocator for a cpu tensor
    assert_eq!(ERROR_LOG_CALLS_COUNT.load(Ordering::SeqCst), 0);
    let sizes = [SymInt::new(2)];
    let strides = [SymInt::new(1)];
    let res = empty_strided_meta_symint(&sizes, &strides, None, None, Some(Device::CPU), None);
    assert!(res.is_err());
    assert_eq!(ERROR_LOG_CALLS_COUNT.load(Ordering::SeqCst), 1);
    assert!(CURRENT_TICKS_CALLS_COUNT.load(Ordering::SeqCst) >= 3);
}

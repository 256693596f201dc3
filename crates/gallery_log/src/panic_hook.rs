//! Panic hook for crash reporting

use backtrace::Backtrace;
use chrono::Local;
use std::panic::PanicHookInfo;

/// Initialize the panic hook for crash reporting
pub fn init_panic_hook() {
    std::panic::set_hook(Box::new(panic_handler));
    tracing::debug!("Panic hook initialized");
}

fn panic_payload<'a>(info: &'a PanicHookInfo) -> &'a str {
    if let Some(s) = info.payload().downcast_ref::<&str>() {
        s
    } else if let Some(s) = info.payload().downcast_ref::<String>() {
        s.as_str()
    } else {
        "<unknown>"
    }
}

fn crash_report(info: &PanicHookInfo) -> String {
    let backtrace = Backtrace::new();
    let thread = std::thread::current();
    let thread_name = thread.name().unwrap_or("<unnamed>");

    format!(
        "=== CRITICAL PANIC ===\n\
         Timestamp: {}\n\
         Thread: {}\n\
         Location: {:?}\n\
         Payload: {}\n\n\
         Stack Trace:\n{:?}",
        Local::now().to_rfc3339(),
        thread_name,
        info.location(),
        panic_payload(info),
        backtrace
    )
}

fn panic_handler(info: &PanicHookInfo) {
    let report = crash_report(info);

    eprintln!("{}", report);
    tracing::error!("{}", report);

    let dump_filename = format!(
        "image_gallery_crash_{}.txt",
        Local::now().format("%Y%m%d_%H%M%S")
    );
    let dump_path = std::env::temp_dir().join(&dump_filename);

    if let Err(e) = std::fs::write(&dump_path, &report) {
        eprintln!("Failed to write crash dump: {}", e);
    }

    #[cfg(windows)]
    show_error_dialog(&dump_path, info);
}

#[cfg(windows)]
fn show_error_dialog(dump_path: &std::path::Path, info: &PanicHookInfo) {
    use windows::core::HSTRING;
    use windows::Win32::UI::WindowsAndMessaging::{MessageBoxW, MB_ICONERROR, MB_OK};

    let msg = format!(
        "An unexpected error occurred.\n\n\
         Crash report: {}\n\n\
         Error: {}",
        dump_path.display(),
        panic_payload(info)
    );

    unsafe {
        MessageBoxW(
            None,
            &HSTRING::from(msg),
            &HSTRING::from("Image Gallery - Fatal Error"),
            MB_ICONERROR | MB_OK,
        );
    }
}

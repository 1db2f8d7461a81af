/// Prefixed status line on stderr, written only when stderr is a terminal.
/// Write errors are dropped.
///
/// ```ignore
/// log_status!("flow", "Running pipeline '{}' ({} steps)", name, total);
/// ```
#[macro_export]
macro_rules! log_status {
    ($prefix:expr, $($arg:tt)*) => {{
        let stderr = ::std::io::stderr();
        if ::std::io::IsTerminal::is_terminal(&stderr) {
            let _ = ::std::io::Write::write_fmt(
                &mut stderr.lock(),
                format_args!(concat!("[", $prefix, "] {}\n"), format_args!($($arg)*)),
            );
        }
    }};
}

pub mod core;
pub mod utils;

pub use core::*;
pub use utils::*;

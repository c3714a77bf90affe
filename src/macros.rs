//! Logging macros over the process-wide logger
//!
//! ```ignore
//! sitelog::log_green!("listening on {}", addr);
//! sitelog::log_to!("device_42", sitelog::LogColor::Yellow, "battery at {}%", level);
//! ```

/// Log with an explicit colour to the default table
#[macro_export]
macro_rules! log_color {
    ($color:expr, $($arg:tt)+) => {
        $crate::global().log_fmt($color, ::std::format_args!($($arg)+))
    };
}

/// Log to a named, row-capped table
#[macro_export]
macro_rules! log_to {
    ($table:expr, $color:expr, $($arg:tt)+) => {
        $crate::global().log_fmt_to($table, $color, ::std::format_args!($($arg)+))
    };
}

/// Log attributed to the `depth`-th caller above the macro call site
#[macro_export]
macro_rules! log_trace {
    ($color:expr, $depth:expr, $($arg:tt)+) => {
        $crate::global().trace_fmt($color, $depth, ::std::format_args!($($arg)+))
    };
}

/// Log `Some(err)` in red; evaluates to whether there was an error
#[macro_export]
macro_rules! check_err {
    ($err:expr) => {
        $crate::global().check_error($err)
    };
}

#[macro_export]
macro_rules! log_black {
    ($($arg:tt)+) => { $crate::log_color!($crate::LogColor::Black, $($arg)+) };
}

#[macro_export]
macro_rules! log_red {
    ($($arg:tt)+) => { $crate::log_color!($crate::LogColor::Red, $($arg)+) };
}

#[macro_export]
macro_rules! log_green {
    ($($arg:tt)+) => { $crate::log_color!($crate::LogColor::Green, $($arg)+) };
}

#[macro_export]
macro_rules! log_yellow {
    ($($arg:tt)+) => { $crate::log_color!($crate::LogColor::Yellow, $($arg)+) };
}

#[macro_export]
macro_rules! log_blue {
    ($($arg:tt)+) => { $crate::log_color!($crate::LogColor::Blue, $($arg)+) };
}

#[macro_export]
macro_rules! log_magenta {
    ($($arg:tt)+) => { $crate::log_color!($crate::LogColor::Magenta, $($arg)+) };
}

#[macro_export]
macro_rules! log_cyan {
    ($($arg:tt)+) => { $crate::log_color!($crate::LogColor::Cyan, $($arg)+) };
}

#[macro_export]
macro_rules! log_white {
    ($($arg:tt)+) => { $crate::log_color!($crate::LogColor::White, $($arg)+) };
}

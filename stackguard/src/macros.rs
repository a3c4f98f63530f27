macro_rules! guard_debug {
    ($options:expr, $($arg:tt)*) => {
        if $options.debug {
            eprint!("[stackguard] ");
            eprintln!($($arg)*);
        }
    };
}

pub(crate) use guard_debug;

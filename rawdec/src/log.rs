//! Diagnostics routed to the `log` crate, or discarded without the `logging` feature.

macro_rules! emit {
    ($level:ident, $fmt:literal $(, $($arg:expr),* $(,)?)?) => {{
        #[cfg(feature = "logging")]
        ::log::$level!($fmt $(, $($arg),*)?);
        // Keep the arguments used so that disabling logging doesn't cause warnings.
        #[cfg(not(feature = "logging"))]
        { $($(let _ = &$arg;)*)? }
    }};
}

macro_rules! ldebug {
    ($($tt:tt)*) => {
        $crate::log::emit!(debug, $($tt)*)
    };
}

macro_rules! ltrace {
    ($($tt:tt)*) => {
        $crate::log::emit!(trace, $($tt)*)
    };
}

macro_rules! lwarn {
    ($($tt:tt)*) => {
        $crate::log::emit!(warn, $($tt)*)
    };
}

pub(crate) use emit;
pub(crate) use ldebug;
pub(crate) use ltrace;
pub(crate) use lwarn;

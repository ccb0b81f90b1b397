macro_rules! dispatch_dialect {
    ($type:ident: $dialect:expr => $expr:expr) => {{
        use crate::arch::{Dialect, Libc, Syscall};

        match $dialect {
            Dialect::Syscall => {
                type $type = Syscall;
                $expr
            }

            Dialect::Libc => {
                type $type = Libc;
                $expr
            }
        }
    }};
}

macro_rules! emit {
    ($listing:expr, $opcode:expr) => {
        $listing.line(format!("\t{}", $opcode))
    };

    ($listing:expr, $opcode:expr, $($format:tt)*) => {
        $listing.line(format!("\t{:8}{}", $opcode, format_args!($($format)*)))
    };
}

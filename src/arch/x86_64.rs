use std::fmt;

/// Tamaño de cada valor en la pila; esta es una arquitectura de 64 bits.
pub const VALUE_SIZE: usize = 8;

/// Registros que utiliza la generación de código.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Reg {
    Rax,
    Rcx,
    Rdx,
    Rdi,
    Rbp,
    Rsp,
}

impl fmt::Display for Reg {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Reg::*;

        let name = match self {
            Rax => "rax",
            Rcx => "rcx",
            Rdx => "rdx",
            Rdi => "rdi",
            Rbp => "rbp",
            Rsp => "rsp",
        };

        formatter.write_str(name)
    }
}

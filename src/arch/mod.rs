//! Detalles específicos para cada dialecto objetivo.
//!
//! Ambos dialectos generan ensamblador x86-64 en sintaxis AT&T para
//! GNU as y difieren únicamente en cómo se entra y se sale del
//! proceso. En general, debe utilizarse la macro `dispatch_dialect!()`
//! para acceder a estas implementaciones.

use crate::codegen::Listing;

mod libc;
mod linux;
mod x86_64;

pub use libc::Abi as Libc;
pub use linux::Abi as Syscall;
pub use x86_64::{Reg, VALUE_SIZE};

/// Dialecto de ensamblador a emitir.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Dialect {
    /// Ejecutable independiente que termina por medio de `exit(2)`.
    Syscall,

    /// Función `main` que retorna su código de salida al runtime de C.
    Libc,
}

/// Convención de entrada y salida de un ejecutable.
///
/// Los tipos que implementan este trait determinan el símbolo de
/// entrada del programa, su prólogo y la secuencia que termina el
/// proceso con un código de salida.
pub trait Abi {
    /// Símbolo de entrada exportado.
    const ENTRY: &'static str;

    /// Registro que debe contener el código de salida
    /// al invocar [`Abi::terminate()`].
    const EXIT_CODE: Reg;

    /// Emite el prólogo, inmediatamente después del símbolo de entrada.
    fn prologue(listing: &mut Listing);

    /// Emite la secuencia que termina el proceso.
    fn terminate(listing: &mut Listing);
}

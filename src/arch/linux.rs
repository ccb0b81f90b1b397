use super::Reg;
use crate::codegen::Listing;

/// Número de la llamada al sistema `exit` en Linux x86-64.
const SYS_EXIT: u32 = 60;

/// Ejecutable sin runtime de C; inicia en `_start`.
pub struct Abi;

impl super::Abi for Abi {
    const ENTRY: &'static str = "_start";
    const EXIT_CODE: Reg = Reg::Rdi;

    // El kernel entrega el control sin stack frame que preservar
    fn prologue(_listing: &mut Listing) {}

    fn terminate(listing: &mut Listing) {
        emit!(listing, "movq", "${}, %{}", SYS_EXIT, Reg::Rax);
        emit!(listing, "syscall");
    }
}

use super::Reg;
use crate::codegen::Listing;

/// Función `main` invocada por el runtime de C.
///
/// El código de salida es el valor de retorno de `main`. El marco
/// creado en el prólogo permite retornar desde cualquier profundidad
/// de la pila de operandos.
pub struct Abi;

impl super::Abi for Abi {
    const ENTRY: &'static str = "main";
    const EXIT_CODE: Reg = Reg::Rax;

    fn prologue(listing: &mut Listing) {
        emit!(listing, "pushq", "%{}", Reg::Rbp);
        emit!(listing, "movq", "%{}, %{}", Reg::Rsp, Reg::Rbp);
    }

    fn terminate(listing: &mut Listing) {
        emit!(listing, "movq", "%{}, %{}", Reg::Rbp, Reg::Rsp);
        emit!(listing, "popq", "%{}", Reg::Rbp);
        emit!(listing, "ret");
    }
}

//! Ensamblado, enlazado y ejecución de programas compilados.
//!
//! `gcc` cumple ambos papeles de ensamblador y enlazador. El listado
//! se le entrega por tubería sin pasar por archivos temporales, por lo
//! que el driver escribe en [`Linker::stdin()`] y luego espera el
//! resultado con [`Linker::finish()`].

use std::{
    io::{self, BufWriter},
    path::Path,
    process::{Child, ChildStdin, Command, ExitStatus, Stdio},
    str::FromStr,
};

use crate::arch::Dialect;
use bitflags::bitflags;
use log::info;
use thiserror::Error;

const GCC: &str = "gcc";

bitflags! {
    /// Ajustes del ejecutable producido.
    pub struct LinkOptions: u32 {
        /// Omitir la tabla de símbolos (`gcc -s`).
        const STRIP = 1 << 0;
    }
}

#[non_exhaustive]
#[derive(Error, Debug)]
pub enum LinkerError {
    /// No se pudo lanzar `gcc` o el programa, o se cerró la tubería.
    #[error("I/O error while running the toolchain")]
    Io(#[from] io::Error),

    /// `gcc` rechazó el listado o no pudo producir el ejecutable.
    #[error("gcc failed to build the executable ({0})")]
    Failed(ExitStatus),

    /// El programa compilado terminó por una señal, sin código de salida.
    ///
    /// Una división entre cero, por ejemplo, termina con `SIGFPE`.
    #[error("Program was terminated abnormally ({0})")]
    Signaled(ExitStatus),
}

/// Sistema donde correrá el ejecutable.
///
/// Cada plataforma fija un [`Dialect`] y las banderas con las que
/// `gcc` debe enlazar el listado.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Platform {
    /// Linux x86-64 sin biblioteca de C.
    Linux,

    /// Sistema anfitrión con runtime de C.
    Hosted,
}

impl Platform {
    pub fn dialect(self) -> Dialect {
        match self {
            Platform::Linux => Dialect::Syscall,
            Platform::Hosted => Dialect::Libc,
        }
    }

    fn gcc_flags(self) -> &'static [&'static str] {
        match self {
            // `_start` propio y salida por llamada al sistema
            Platform::Linux => &["-nostdlib", "-static"],
            Platform::Hosted => &[],
        }
    }
}

impl FromStr for Platform {
    type Err = ();

    fn from_str(name: &str) -> Result<Self, ()> {
        [("linux", Platform::Linux), ("hosted", Platform::Hosted)]
            .iter()
            .find(|&&(known, _)| known == name)
            .map(|&(_, platform)| platform)
            .ok_or(())
    }
}

/// Un proceso de `gcc` en espera de ensamblador.
pub struct Linker {
    child: Child,
    stdin: BufWriter<ChildStdin>,
}

impl Linker {
    /// Lanza `gcc` para producir el ejecutable `output`.
    pub fn spawn<O>(platform: Platform, output: &O, opts: LinkOptions) -> Result<Self, LinkerError>
    where
        O: AsRef<Path>,
    {
        let mut command = gcc(platform, output.as_ref(), opts);
        info!("Linking {} with {:?}", output.as_ref().display(), command);

        let mut child = command.stdin(Stdio::piped()).spawn()?;
        let stdin = child.stdin.take().ok_or_else(|| {
            io::Error::new(io::ErrorKind::BrokenPipe, "linker stdin is not piped")
        })?;

        Ok(Linker {
            child,
            stdin: BufWriter::new(stdin),
        })
    }

    /// Destino del listado, tal y como lo emitió [`crate::target::generate()`].
    pub fn stdin(&mut self) -> &mut BufWriter<ChildStdin> {
        &mut self.stdin
    }

    /// Cierra la tubería y espera a que `gcc` termine.
    pub fn finish(self) -> Result<(), LinkerError> {
        let Linker { mut child, stdin } = self;

        // `gcc` no termina de leer hasta observar EOF
        stdin.into_inner().map_err(io::Error::from)?;

        match child.wait()? {
            status if status.success() => Ok(()),
            status => Err(LinkerError::Failed(status)),
        }
    }
}

/// Ejecuta un programa compilado y obtiene su código de salida.
pub fn run<P: AsRef<Path>>(path: P) -> Result<i32, LinkerError> {
    let path = path.as_ref();

    // Una ruta relativa sin directorio sería buscada en $PATH
    let status = if path.components().count() == 1 && path.is_relative() {
        Command::new(Path::new(".").join(path)).status()?
    } else {
        Command::new(path).status()?
    };

    let code = status.code().ok_or(LinkerError::Signaled(status))?;
    info!("{} exited with code {}", path.display(), code);

    Ok(code)
}

/// Línea de comandos completa, sin lanzar el proceso.
fn gcc(platform: Platform, output: &Path, opts: LinkOptions) -> Command {
    let mut command = Command::new(GCC);
    command.args(platform.gcc_flags()).arg("-o").arg(output);

    if opts.contains(LinkOptions::STRIP) {
        command.arg("-s");
    }

    // `-` como archivo de entrada lee desde stdin
    command.args(&["-xassembler", "-"]);
    command
}

//! Punto de entrada ("driver").
//!
//! Este módulo orquesta las diferentes fases del proceso de
//! compilación y expone una CLI.

use anyhow::{self, bail, Context};
use clap::{crate_version, Arg, ArgMatches, Command};
use log::{info, LevelFilter};
use simple_logger::SimpleLogger;
use yzc::{
    arena,
    error::Diagnostics,
    link::{self, LinkOptions, Linker, Platform},
    parse, target, Options,
};

use std::{
    fs::{self, File},
    io::{self, Read, Write},
    process,
    str::FromStr,
};

fn main() -> anyhow::Result<()> {
    // Parsing de CLI
    let args = Command::new("yz compiler")
        .version(crate_version!())
        .arg(
            Arg::new("input")
                .required(true)
                .value_name("INPUT")
                .help("Source file ('-' for stdin)"),
        )
        .arg(
            Arg::new("target")
                .short('t')
                .long("target")
                .value_name("PLATFORM")
                .takes_value(true)
                .default_value("linux")
                .possible_values(["linux", "hosted"])
                .help("Target platform"),
        )
        .arg(
            Arg::new("asm")
                .short('S')
                .help("Generate assembly instead of linking"),
        )
        .arg(
            Arg::new("emit")
                .long("emit")
                .value_name("STAGE")
                .takes_value(true)
                .possible_values(["tokens", "ast", "asm"])
                .help("Dump an intermediate representation to stdout"),
        )
        .arg(Arg::new("strip").short('s').help("Strip executables"))
        .arg(
            Arg::new("run")
                .long("run")
                .conflicts_with("asm")
                .help("Execute the program after linking and exit with its status code"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .takes_value(true)
                .value_name("FILE")
                .help("Output file ('-' along with -S for stdout)"),
        )
        .arg(
            Arg::new("arena-capacity")
                .long("arena-capacity")
                .takes_value(true)
                .value_name("NODES")
                .help("Maximum syntax tree nodes of each kind"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .multiple_occurrences(true)
                .help("Increase logging verbosity"),
        )
        .get_matches();

    let level = match args.occurrences_of("verbose") {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };

    SimpleLogger::new()
        .with_level(level)
        .init()
        .context("Failed to initialize logger")?;

    // Se extraen argumentos necesarios
    let platform = args.value_of("target").unwrap_or("linux");
    let platform = Platform::from_str(platform)
        .map_err(|()| anyhow::anyhow!("Unsupported target: {}", platform))?;

    let arena_capacity = match args.value_of("arena-capacity") {
        None => arena::DEFAULT_CAPACITY,
        Some(capacity) => capacity
            .parse()
            .with_context(|| format!("Bad arena capacity: {}", capacity))?,
    };

    let options = Options {
        dialect: platform.dialect(),
        arena_capacity,
    };

    let (name, text) = read_input(&args)?;
    info!("Compiling {} for {:?}", name, platform);

    let result = match args.value_of("emit") {
        Some(stage) => dump(stage, &text, &name, options).map(|()| None),
        None => yzc::compile(&text, name.as_str(), options).map(Some),
    };

    let listing = match result {
        Ok(Some(listing)) => listing,
        Ok(None) => return Ok(()),
        Err(diagnostics) => {
            eprint!("{}", diagnostics);
            process::exit(1);
        }
    };

    let asm = args.is_present("asm");
    let output = match (asm, args.value_of("output")) {
        (_, Some(output)) => output,
        (true, None) => "out.s",
        (false, None) => "out",
    };

    match (asm, output) {
        // Salida a stdout sin enlazado
        (true, "-") => {
            let mut stdout = io::stdout();
            stdout
                .write_all(listing.as_bytes())
                .context("Failed to emit to stdout")?;
        }

        // Salida a archivo sin enlazado
        (true, path) => {
            let mut file = File::create(path)
                .with_context(|| format!("Failed to open for writing: {}", path))?;

            file.write_all(listing.as_bytes())
                .with_context(|| format!("Failed to emit to file: {}", path))?;
        }

        // Salida a stdout con enlazado
        (false, "-") => bail!("Refusing to write executable to stdout"),

        // Salida a archivo con enlazado
        (false, path) => {
            let mut options = LinkOptions::empty();
            if args.is_present("strip") {
                options |= LinkOptions::STRIP;
            }

            let mut linker = Linker::spawn(platform, &path, options).context("Failed to link")?;
            linker
                .stdin()
                .write_all(listing.as_bytes())
                .context("Failed to emit assembly to assembler")?;

            linker
                .finish()
                .with_context(|| format!("Failed to generate executable: {}", path))?;

            if args.is_present("run") {
                let code = link::run(path).with_context(|| format!("Failed to execute: {}", path))?;

                info!("Program exited with code {}", code);
                process::exit(code);
            }
        }
    };

    Ok(())
}

/// Lee el código fuente, ya sea de un archivo o de stdin.
fn read_input(args: &ArgMatches) -> anyhow::Result<(String, String)> {
    match args.value_of("input").unwrap_or("-") {
        "-" => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read from stdin")?;

            Ok((String::from("<stdin>"), text))
        }

        path => {
            let text =
                fs::read_to_string(path).with_context(|| format!("Failed to read: {}", path))?;

            Ok((String::from(path), text))
        }
    }
}

/// Imprime una representación intermedia en vez de compilar.
fn dump(stage: &str, text: &str, name: &str, options: Options) -> Result<(), Diagnostics> {
    let (start, tokens) = yzc::scan(text, name)?;
    if stage == "tokens" {
        for token in &tokens {
            println!("{}\t{}", token.location(), token.val());
        }

        return Ok(());
    }

    let ast = parse::parse(&tokens, start, options.arena_capacity)?;
    if stage == "ast" {
        print!("{}", ast);
        return Ok(());
    }

    let listing = target::generate(&ast, options.dialect)?;
    print!("{}", listing);
    Ok(())
}

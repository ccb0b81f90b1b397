use yzc::{arena::DEFAULT_CAPACITY, error::Diagnostics, lex::Lexer, parse, source::Source, target};

fn main() {
    let source = match Source::read("<stdin>", std::io::stdin()) {
        Ok(source) => source,
        Err(error) => {
            eprintln!("Failed to read stdin: {}", error);
            return;
        }
    };

    let diagnostics = match Lexer::new(&source).try_exhaustive() {
        Err(errors) => Diagnostics::from(errors),

        Ok(tokens) => {
            print!("Tokens: {:#?}\n\n", tokens);

            match parse::parse(&tokens, source.start(), DEFAULT_CAPACITY) {
                Err(error) => Diagnostics::from(error),

                Ok(ast) => {
                    print!("Ast:\n{}\n", ast);

                    match target::generate(&ast, target::Dialect::Syscall) {
                        Err(error) => Diagnostics::from(error),

                        Ok(listing) => {
                            print!("Assembly:\n{}", listing);
                            Diagnostics::default()
                        }
                    }
                }
            }
        }
    };

    if !diagnostics.is_empty() {
        eprint!("{}", diagnostics);
    }
}

use clap::Parser;
use dirs::home_dir;
use fpp::{
    cli::{Args, Commands},
    error::{Error, Result},
    parser::parse,
    repl::{
        banner, describe_result, help_text, is_confirmation, release_notes, MetaCommand,
        REPLPrompt, REPLValidator, SyntaxHighlighter, STDIN_SOURCE,
    },
    runtime::run,
    stdlib::{create_standard_context, read_line, Registry},
    tokenizer::tokenize,
};
use log::{debug, info};
use nu_ansi_term::{Color, Style};
use reedline::{DefaultHinter, FileBackedHistory, Reedline, Signal};
use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
    process,
};

const SCRIPT_EXTENSION: &str = "fpp";

fn has_script_extension(file: &Path) -> bool {
    file.extension().map_or(false, |ext| ext == SCRIPT_EXTENSION)
}

/// Prints a failed evaluation. An `exit` request ends the process instead.
fn report(err: Error) {
    match err {
        Error::Exit { code } => process::exit(code),
        err => eprintln!("{}", err.report()),
    }
}

fn run_file(registry: &Registry, file: PathBuf) -> Result<()> {
    if !has_script_extension(&file) {
        eprintln!(
            "File '{}' must have the .{} extension",
            file.display(),
            SCRIPT_EXTENSION
        );
        return Ok(());
    }

    let text = fs::read_to_string(&file)?;
    let source_name = file.display().to_string();
    let context = create_standard_context(registry, "<program>");

    let value = run(&source_name, &text, &context)?;
    if let Some(output) = describe_result(&value) {
        println!("{}", output);
    }

    Ok(())
}

fn check_file(file: PathBuf) -> Result<()> {
    let text = fs::read_to_string(&file)?;
    let source_name = file.display().to_string();

    let tokens = tokenize(&source_name, &text)?;
    debug!("tokens: {:?}", tokens);

    let ast = parse(&tokens)?;
    debug!("ast: {:#?}", ast);

    println!("ok");
    Ok(())
}

fn confirm_exit() -> Result<bool> {
    print!("Are you sure you want to exit? (yes/no): ");
    io::stdout().flush()?;
    let answer = read_line(&mut io::stdin().lock())?;
    Ok(answer.map_or(true, |answer| is_confirmation(&answer)))
}

fn run_repl(registry: &Registry) -> Result<()> {
    let mut line_editor = Reedline::create()
        .with_hinter(Box::new(
            DefaultHinter::default().with_style(Style::new().italic().fg(Color::LightGray)),
        ))
        .with_highlighter(Box::new(SyntaxHighlighter))
        .with_validator(Box::new(REPLValidator));

    // Add file-backed history if possible
    if let Some(history) = home_dir()
        .map(|home| home.join(".fpp_history"))
        .and_then(|path| FileBackedHistory::with_file(20, path).ok())
        .map(Box::new)
    {
        line_editor = line_editor.with_history(history);
    } else {
        eprintln!("NOTE: Failed to load history. Persistence is now disabled.")
    }

    let prompt = REPLPrompt;
    // One context for the whole session so bindings survive between lines
    let context = create_standard_context(registry, "<program>");

    println!("{}", banner());

    loop {
        match line_editor.read_line(&prompt)? {
            Signal::Success(buffer) => match MetaCommand::parse(&buffer) {
                Some(MetaCommand::Exit) => {
                    if confirm_exit()? {
                        break Ok(());
                    }
                }
                Some(MetaCommand::Help) => println!("{}", help_text(registry)),
                Some(MetaCommand::ReleaseNotes) => println!("{}", release_notes()),
                None => {
                    run(STDIN_SOURCE, &buffer, &context)
                        .map(|value| {
                            if let Some(output) = describe_result(&value) {
                                println!("{}", output);
                            }
                        })
                        .unwrap_or_else(report);
                }
            },
            Signal::CtrlD | Signal::CtrlC => {
                break Ok(());
            }
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let registry = Registry::standard();

    match args.command() {
        Commands::Run { file } => {
            info!("FILE MODE");
            debug!("file: {:?}", file);

            run_file(&registry, file).unwrap_or_else(report);
        }
        Commands::Check { file } => {
            info!("CHECK MODE");
            debug!("file: {:?}", file);

            check_file(file).unwrap_or_else(report);
        }
        Commands::Repl => {
            info!("REPL MODE");

            run_repl(&registry).unwrap_or_else(report);
        }
    }
    Ok(())
}

mod input;

#[macro_use]
extern crate lazy_static;

use std::collections::HashMap;
use calc::ops::{self, AngleUnit};
use calc::Session;
use input::{Config, InputSource};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::{debug, error, info};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer, Registry};


// How many history records the history command shows.
const HISTORY_LENGTH: usize = 10;


fn main() {
    let config = Config::from_env();

    init_logging(config.log_level);

    let mut session = Session::new();

    match config.input {
        InputSource::Lines(lines) => {
            for line in lines {
                if !evaluate_line(&line, &mut session) {
                    break;
                }
            }
        }

        InputSource::Interactive => {
            if let Err(err) = run_interactive(&mut session) {
                error!(%err, "terminal input failed");
            }
        }
    }
}


// Log lines go to stderr without timestamps, so they can't be confused with results.
fn init_logging(level: LevelFilter) {
    let layer = tracing_subscriber::fmt::layer()
        .without_time()
        .with_target(false)
        .with_ansi(false)
        .compact()
        .with_writer(std::io::stderr)
        .with_filter(level);

    Registry::default().with(layer).init();
}


fn run_interactive(session: &mut Session) -> rustyline::Result<()> {
    let mut editor = DefaultEditor::new()?;

    println!("Welcome to Advanced Calculator!");
    println!("Type 'menu' to see options or 'help' for assistance");
    println!("Or simply enter an expression to evaluate (e.g., '2 + 3 * 4')");

    loop {
        match editor.readline("\nCalc> ") {
            Ok(line) => {
                if !line.trim().is_empty() {
                    editor.add_history_entry(line.as_str())?;
                }

                if !evaluate_line(&line, session) {
                    break;
                }
            }

            // Ctrl-C and Ctrl-D end the session, not the program's error path.
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                println!("\nGoodbye!");
                break;
            }

            Err(err) => return Err(err),
        }
    }

    Ok(())
}


// Handles one line of input, returning whether to keep going.
fn evaluate_line(line: &str, session: &mut Session) -> bool {
    let line = line.trim();

    if line.is_empty() {
        return true;
    }

    // Is this a special command?
    if let Some(result) = dispatch_command(line, session) {
        return result;
    }

    match session.evaluate(line) {
        Ok(value) => println!("= {}", value),

        Err(err) => {
            info!(expression = line, %err, "evaluation failed");
            println!("Error: {}", err);
        }
    }

    true
}


fn dispatch_command(line: &str, session: &mut Session) -> Option<bool> {
    let (name, argument) = match line.split_once(char::is_whitespace) {
        Some((name, argument)) => (name, argument.trim()),
        None                   => (line, ""),
    };

    let name = name.to_lowercase();

    // Check if the first word is in the COMMANDS table, and dispatch through that if found.
    let command = COMMANDS.get(name.as_str())?;

    // Commands without parameters only match on their own, so eg. "mr + 1" stays an expression.
    if !command.takes_argument && !argument.is_empty() {
        return None;
    }

    if command.takes_argument && argument.is_empty() {
        println!("Usage: {}", command.usage);
        return Some(true);
    }

    debug!(command = %name, argument, "dispatching command");

    Some((command.run)(argument, session))
}


// Special commands return a bool indicating whether to keep going.
struct Command {
    run:            fn(&str, &mut Session) -> bool,
    usage:          &'static str,
    takes_argument: bool,
}


impl Command {
    fn new(run: fn(&str, &mut Session) -> bool, usage: &'static str) -> Command {
        Command { run, usage, takes_argument: false }
    }

    fn with_argument(run: fn(&str, &mut Session) -> bool, usage: &'static str) -> Command {
        Command { run, usage, takes_argument: true }
    }
}


lazy_static! {
    static ref COMMANDS: HashMap<&'static str, Command> = vec![
        ( "q",       Command::new(quit_command,                   "q")                     ),
        ( "quit",    Command::new(quit_command,                   "quit")                  ),
        ( "exit",    Command::new(quit_command,                   "exit")                  ),
        ( "menu",    Command::new(menu_command,                   "menu")                  ),
        ( "help",    Command::new(help_command,                   "help")                  ),
        ( "history", Command::new(history_command,                "history")               ),
        ( "clear",   Command::with_argument(clear_command,        "clear history")         ),
        ( "ms",      Command::with_argument(memory_store_command, "ms <value>")            ),
        ( "mr",      Command::new(memory_recall_command,          "mr")                    ),
        ( "mc",      Command::new(memory_clear_command,           "mc")                    ),
        ( "m+",      Command::with_argument(memory_add_command,   "m+ <value>")            ),
        ( "m-",      Command::with_argument(memory_subtract_command, "m- <value>")         ),
        ( "deg",     Command::with_argument(degrees_command,      "deg <sin|cos|tan> <angle>") ),
    ].into_iter().collect();
}


fn quit_command(_: &str, _: &mut Session) -> bool {
    println!("Goodbye!");
    false
}


fn menu_command(_: &str, _: &mut Session) -> bool {
    let rule = "=".repeat(50);

    println!();
    println!("{}", rule);
    println!("ADVANCED CALCULATOR");
    println!("{}", rule);
    println!("1. Basic Operations (+, -, *, /, %, **)");
    println!("2. Advanced Functions (sqrt, sin, cos, tan, log, ln)");
    println!("3. Expression Evaluation");
    println!("4. Memory Functions (ms, mr, mc, m+, m-)");
    println!("5. Show History (history)");
    println!("6. Clear History (clear history)");
    println!("7. Help (help)");
    println!("8. Exit (exit)");
    println!("{}", rule);

    true
}


fn help_command(_: &str, _: &mut Session) -> bool {
    println!();
    println!("Expression examples:");

    for example in &[ "2 + 3 * 4", "sqrt(16) + 5", "sin(pi / 6) * cos(pi / 4)", "log(100) + ln(e)", "2^3 + sqrt(25)", "(5 + 3) * 2 - 10 / 2" ] {
        println!("    {}", example);
    }

    let constants = ops::CONSTANTS.iter().map(|op| op.name).chain(std::iter::once(ops::ANSWER)).collect();

    print_help("Operators", ops::OPERATORS.iter().filter(|op| op.is_binary()).map(|op| op.name).chain(ops::ALIASES.iter().map(|(alias, _)| *alias)).collect());
    print_help("Constants", constants);
    print_help("Functions (trig in radians)", ops::FUNCTIONS.iter().map(|op| op.name).collect());
    print_help("Commands",  COMMANDS.values().map(|command| command.usage).collect());

    true
}


fn print_help(title: &str, items: Vec<&str>) {
    use itertools::Itertools;

    println!();
    println!("{}:", title);

    let item_width = items.iter().fold(0, |a, i| std::cmp::max(a, i.chars().count())) + 2;
    let per_line = std::cmp::max(1, 60 / item_width);

    for line in &items.into_iter().sorted().chunks(per_line) {
        print!("    ");

        for item in line {
            print!("{:w$}", item, w = item_width);
        }

        println!();
    }
}


fn history_command(_: &str, session: &mut Session) -> bool {
    let history = session.history(HISTORY_LENGTH);

    if history.is_empty() {
        println!("No history yet");
    }
    else {
        println!("Calculation History:");

        for entry in history {
            println!("  {}", entry);
        }
    }

    true
}


fn clear_command(argument: &str, session: &mut Session) -> bool {
    if argument.eq_ignore_ascii_case("history") {
        session.clear_history();
        println!("History cleared");
    }
    else {
        println!("Usage: clear history");
    }

    true
}


// Memory values may be full expressions, evaluated without touching the history.
fn memory_value(argument: &str, session: &Session) -> Option<f64> {
    match calc::evaluate(argument, session.last_answer()) {
        Ok(value) => Some(value),

        Err(err) => {
            println!("Error: {}", err);
            None
        }
    }
}


fn memory_store_command(argument: &str, session: &mut Session) -> bool {
    if let Some(value) = memory_value(argument, session) {
        session.memory_store(value);
        println!("Stored {} in memory", value);
    }

    true
}


fn memory_recall_command(_: &str, session: &mut Session) -> bool {
    println!("Memory: {}", session.memory_recall());
    true
}


fn memory_clear_command(_: &str, session: &mut Session) -> bool {
    session.memory_clear();
    println!("Memory cleared");
    true
}


fn memory_add_command(argument: &str, session: &mut Session) -> bool {
    if let Some(value) = memory_value(argument, session) {
        session.memory_add(value);
        println!("Added {} to memory. Memory: {}", value, session.memory_recall());
    }

    true
}


fn memory_subtract_command(argument: &str, session: &mut Session) -> bool {
    if let Some(value) = memory_value(argument, session) {
        session.memory_subtract(value);
        println!("Subtracted {} from memory. Memory: {}", value, session.memory_recall());
    }

    true
}


// Trig in degrees, which the expression grammar deliberately does not offer.
fn degrees_command(argument: &str, session: &mut Session) -> bool {
    let (function, angle) = match argument.split_once(char::is_whitespace) {
        Some((function, angle)) => (function, angle.trim()),
        None => {
            println!("Usage: deg <sin|cos|tan> <angle>");
            return true;
        }
    };

    let result = calc::evaluate(angle, session.last_answer())
        .and_then(|angle| ops::trig(function, angle, AngleUnit::Degrees));

    match result {
        Ok(value) => println!("= {}", value),
        Err(err)  => println!("Error: {}", err),
    }

    true
}

use std::env;
use std::fs;
use tracing_subscriber::filter::LevelFilter;


// Environment variable holding the log level (error, warn, info, debug, trace).
pub const LOG_ENV: &str = "CALC_LOG";


pub enum InputSource {
    // Lines supplied up front, from the commandline or an argument file.
    Lines(Vec<String>),

    // Read from the terminal until the user quits.
    Interactive,
}


pub struct Config {
    pub log_level: LevelFilter,
    pub input:     InputSource,
}


impl Config {
    pub fn from_env() -> Config {
        // Skip over the executable name.
        Config::new(env::args().skip(1).collect(), env::var(LOG_ENV).ok())
    }


    pub fn new(args: Vec<String>, log_level: Option<String>) -> Config {
        let mut log_level = log_level.and_then(|level| level.parse().ok())
                                     .unwrap_or(LevelFilter::WARN);

        let mut lines = vec![];

        for arg in args {
            if arg == "--debug" {
                log_level = LevelFilter::DEBUG;
            }
            else {
                lines.push(arg);
            }
        }

        let input = if lines.is_empty() {
            InputSource::Interactive
        }
        else {
            match Self::read_arg_file(&lines) {
                // Source expressions were read from an argument file.
                Some(file_lines) => InputSource::Lines(file_lines),

                // Commandline arguments provide the source expressions.
                None => InputSource::Lines(lines),
            }
        };

        Config { log_level, input }
    }


    // If there is only one commandline argument, try to read that as an argument file.
    fn read_arg_file(args: &[String]) -> Option<Vec<String>> {
        match args {
            [ filename ] => fs::read_to_string(filename).ok().map(|contents| contents.lines().map(String::from).collect()),
            _ => None
        }
    }
}

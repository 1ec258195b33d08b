use crate::utils::exit_codes::ExitCode;
use log::LevelFilter;
use std::process;

pub const USAGE: &str = "\
Usage: gfs [-v|-vv|-q] <command> [args...]

Commands:
  create <size> <drive>              format a new drive (size: 4096, 64KB, 2MB)
  add <drive> <file> [name]          copy a host file into the drive
  get <drive> <name> <destination>   copy a file out of the drive
  remove <drive> <name>              delete a file from the drive
  tree <drive>                       list stored files
  status <drive>                     dump the drive's metadata
  drop <drive>                       delete the drive image
  version                            print version information
  help                               print this message

Options:
  -v, -vv                            more diagnostic output
  -q                                 errors only";

/// Settings taken from the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub log_level: LevelFilter,
    pub command: String,
    pub args: Vec<String>,
}

/// Splits the program arguments into global flags, command and arguments.
pub fn parse_args<I>(args: I) -> Result<Config, String>
where
    I: IntoIterator<Item = String>,
{
    let mut it = args.into_iter().peekable();
    let mut log_level = LevelFilter::Warn;

    while let Some(arg) = it.peek() {
        match arg.as_str() {
            "-v" => log_level = LevelFilter::Info,
            "-vv" => log_level = LevelFilter::Debug,
            "-q" => log_level = LevelFilter::Error,
            "-h" | "--help" => {
                return Ok(Config {
                    log_level,
                    command: "help".to_string(),
                    args: Vec::new(),
                });
            }
            flag if flag.starts_with('-') => return Err(format!("unknown option: {flag}")),
            _ => break,
        }
        it.next();
    }

    let command = it.next().ok_or_else(|| "missing command".to_string())?;
    Ok(Config {
        log_level,
        command,
        args: it.collect(),
    })
}

pub fn handle_prog_args<I>(args: I) -> Config
where
    I: IntoIterator<Item = String>,
{
    match parse_args(args) {
        Ok(config) => config,
        Err(msg) => {
            eprintln!("{msg}");
            eprintln!("{USAGE}");
            process::exit(ExitCode::Usage.into())
        }
    }
}

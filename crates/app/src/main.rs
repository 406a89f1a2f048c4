mod logging;

use std::fmt;
use std::sync::Arc;

use navigator_core::{AuthPhase, Session, SessionPatch};
use services::{AuthConfig, AuthSnapshot, SessionController};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- [-v|-vv] [--api-url <url>]");
    eprintln!();
    eprintln!("Commands (one per line on stdin):");
    eprintln!("  register <name>   create a session");
    eprintln!("  status            show the current session");
    eprintln!("  ask               use one question from the local quota");
    eprintln!("  clear             dismiss the last registration error");
    eprintln!("  logout            end the session");
    eprintln!("  quit");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  NAVIGATOR_API_URL, RUST_LOG");
}

struct Args {
    api_url: Option<String>,
    verbosity: u8,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut api_url = None;
        let mut verbosity = 0_u8;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--api-url" => api_url = Some(require_value(args, "--api-url")?),
                "-v" => verbosity = verbosity.saturating_add(1),
                "-vv" => verbosity = verbosity.saturating_add(2),
                other => return Err(ArgsError::UnknownArg(other.to_owned())),
            }
        }

        Ok(Self { api_url, verbosity })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Register(String),
    Status,
    Ask,
    Clear,
    Logout,
    Quit,
}

impl Command {
    fn from_line(line: &str) -> Option<Self> {
        let line = line.trim();
        let (head, rest) = line.split_once(' ').unwrap_or((line, ""));
        match head {
            "register" if !rest.trim().is_empty() => Some(Self::Register(rest.trim().to_owned())),
            "status" => Some(Self::Status),
            "ask" => Some(Self::Ask),
            "clear" => Some(Self::Clear),
            "logout" => Some(Self::Logout),
            "quit" | "exit" => Some(Self::Quit),
            _ => None,
        }
    }
}

fn describe(session: &Session) -> String {
    match (session.user_name(), session.questions_remaining()) {
        (Some(name), Some(left)) if session.is_authenticated() => {
            format!("signed in as {name} ({left} questions remaining)")
        }
        (Some(name), None) if session.is_authenticated() => format!("signed in as {name}"),
        _ => "not signed in".to_owned(),
    }
}

async fn watch_phase(mut rx: watch::Receiver<AuthSnapshot>) {
    let mut last = rx.borrow().phase();
    while rx.changed().await.is_ok() {
        let phase = rx.borrow_and_update().phase();
        if phase != last {
            tracing::info!(from = ?last, to = ?phase, "auth phase changed");
            last = phase;
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv = std::env::args().skip(1);
    let args = Args::parse(&mut argv).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    logging::init_logging(args.verbosity);

    let config = match args.api_url.as_deref() {
        Some(url) => AuthConfig::new(url)?,
        None => AuthConfig::from_env()?,
    };
    tracing::info!(base_url = %config.base_url, "using auth service");

    let controller = Arc::new(SessionController::from_config(config)?);
    controller.set_auth_observer(|name| {
        if let Some(name) = name {
            println!("Welcome, {name}!");
        }
    });
    tokio::spawn(watch_phase(controller.subscribe()));

    let session = controller.resume_session().await;
    println!("{}", describe(&session));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let Some(command) = Command::from_line(&line) else {
            eprintln!("unknown command: {}", line.trim());
            continue;
        };

        match command {
            Command::Register(name) => {
                if controller.register(&name).await {
                    println!("{}", describe(&controller.session()));
                } else if let Some(message) = controller.register_error() {
                    eprintln!("{message}");
                }
            }
            Command::Status => {
                let snapshot = controller.snapshot();
                println!("{}", describe(&snapshot.session));
                if let Some(message) = snapshot.register_error {
                    println!("last error: {message}");
                }
            }
            Command::Ask => {
                let session = controller.session();
                match session.questions_remaining() {
                    Some(left) if controller.phase() == AuthPhase::Authenticated && left > 0 => {
                        controller
                            .update_auth(SessionPatch::new().questions_remaining(Some(left - 1)));
                        println!("{}", describe(&controller.session()));
                    }
                    Some(_) if session.is_authenticated() => println!("no questions remaining"),
                    _ => println!("register first"),
                }
            }
            Command::Clear => controller.reset_error(),
            Command::Logout => {
                controller.logout().await;
                println!("{}", describe(&controller.session()));
            }
            Command::Quit => break,
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Args, ArgsError> {
        let mut iter = args.iter().map(|s| (*s).to_owned());
        Args::parse(&mut iter)
    }

    #[test]
    fn parses_flags() {
        let args = parse(&["-v", "--api-url", "http://example.com"]).unwrap();
        assert_eq!(args.verbosity, 1);
        assert_eq!(args.api_url.as_deref(), Some("http://example.com"));
    }

    #[test]
    fn rejects_missing_and_unknown_args() {
        assert!(matches!(
            parse(&["--api-url"]),
            Err(ArgsError::MissingValue { flag: "--api-url" })
        ));
        assert!(matches!(parse(&["--db"]), Err(ArgsError::UnknownArg(_))));
    }

    #[test]
    fn parses_commands() {
        assert_eq!(
            Command::from_line("register  Alice Smith "),
            Some(Command::Register("Alice Smith".into()))
        );
        assert_eq!(Command::from_line("register"), None);
        assert_eq!(Command::from_line("logout"), Some(Command::Logout));
        assert_eq!(Command::from_line("exit"), Some(Command::Quit));
        assert_eq!(Command::from_line("dance"), None);
    }

    #[test]
    fn describes_sessions() {
        assert_eq!(describe(&Session::empty()), "not signed in");

        let session =
            Session::authenticated("Alice", navigator_core::SessionId::new("s1"), None, 3).unwrap();
        assert_eq!(describe(&session), "signed in as Alice (3 questions remaining)");
    }
}

//! These structs provide the CLI interface for the firefly-importer CLI.

use crate::config::{
    Credentials, Settings, DEFAULT_FIREFLY_URL, DEFAULT_LOOKBACK_DAYS, DEFAULT_VISION_MODEL,
};
use clap::{Parser, Subcommand};
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::error;
use tracing_subscriber::filter::LevelFilter;

/// firefly-importer: Import bank statements into a Firefly III ledger.
///
/// Statements are read from CSV exports or from photos and screenshots of a statement, which are
/// sent to a vision model. Rows that already exist in the ledger are skipped, and the rest are
/// written to a batch file that you can review and edit before submitting it.
///
/// When you change a description, budget or category in the batch before submitting, the change
/// is remembered and suggested the next time the same description is imported.
#[derive(Debug, Parser, Clone)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn new(common: Common, command: Command) -> Self {
        Self { common, command }
    }

    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the data directory, the configuration file and the mapping store.
    ///
    /// This is the first command you should run. The home directory is $HOME/firefly-importer
    /// unless you pass --home or set FIREFLY_IMPORTER_HOME.
    ///
    /// Tokens are never written to the configuration file. Pass them with --firefly-token and
    /// --vision-api-key, or set FIREFLY_TOKEN and VISION_API_KEY, on each run.
    Init(InitArgs),
    /// List the asset accounts in the ledger that statements can be imported into.
    Accounts,
    /// List the budgets and categories in the ledger.
    Labels,
    /// Parse a statement and classify its rows against the ledger.
    Import(ImportArgs),
    /// Store the rows of a reviewed batch in the ledger.
    Submit(SubmitArgs),
    /// List the description mappings learned from previous submits.
    Mappings,
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The directory where configuration and learned mappings are held. Defaults to
    /// ~/firefly-importer
    #[arg(long, env = "FIREFLY_IMPORTER_HOME", default_value_t = default_home())]
    home: DisplayPath,

    /// The personal access token for the Firefly III API.
    #[arg(long, env = "FIREFLY_TOKEN", default_value = "", hide_env_values = true)]
    firefly_token: String,

    /// The API key for the vision model. Only needed when importing images.
    #[arg(long, env = "VISION_API_KEY", default_value = "", hide_env_values = true)]
    vision_api_key: String,
}

impl Common {
    pub fn new(log_level: LevelFilter, home: PathBuf) -> Self {
        Self {
            log_level,
            home: home.into(),
            firefly_token: String::new(),
            vision_api_key: String::new(),
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn home(&self) -> &DisplayPath {
        &self.home
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.firefly_token.as_str(), self.vision_api_key.as_str())
    }
}

/// (Not shown): Args for the `firefly-importer init` command.
#[derive(Debug, Parser, Clone)]
pub struct InitArgs {
    /// The base URL of the Firefly III API, including the `/api/v1` path.
    #[arg(long, default_value = DEFAULT_FIREFLY_URL)]
    firefly_url: String,

    /// The base URL of an OpenAI-compatible vision API, e.g. http://localhost:11434. Requests go
    /// to /v1/chat/completions under it. Image imports are refused when this is not set.
    #[arg(long)]
    vision_api_url: Option<String>,

    /// The vision model to send statement images to.
    #[arg(long, default_value = DEFAULT_VISION_MODEL)]
    vision_model: String,

    /// How many days of existing ledger transactions are compared against an import.
    #[arg(long, default_value_t = DEFAULT_LOOKBACK_DAYS)]
    lookback_days: u32,
}

impl InitArgs {
    pub fn new(firefly_url: impl Into<String>, vision_api_url: Option<String>) -> Self {
        Self {
            firefly_url: firefly_url.into(),
            vision_api_url,
            vision_model: DEFAULT_VISION_MODEL.to_string(),
            lookback_days: DEFAULT_LOOKBACK_DAYS,
        }
    }

    pub fn settings(&self) -> Settings {
        Settings::new(
            self.firefly_url.as_str(),
            self.vision_api_url.clone(),
            self.vision_model.as_str(),
            self.lookback_days,
        )
    }
}

/// (Not shown): Args for the `firefly-importer import` command.
#[derive(Debug, Parser, Clone)]
pub struct ImportArgs {
    /// The numeric id of the ledger asset account the statement belongs to. See `accounts`.
    #[arg(long)]
    account_id: String,

    /// The statement to import: a .csv file, or a .png, .jpg or .jpeg image.
    #[arg(long)]
    file: PathBuf,

    /// Where to write the classified batch. It is printed to stdout when omitted.
    #[arg(long)]
    output: Option<PathBuf>,
}

impl ImportArgs {
    pub fn new(account_id: impl Into<String>, file: impl Into<PathBuf>) -> Self {
        Self {
            account_id: account_id.into(),
            file: file.into(),
            output: None,
        }
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    pub fn output(&self) -> Option<&Path> {
        self.output.as_deref()
    }
}

/// (Not shown): Args for the `firefly-importer submit` command.
#[derive(Debug, Parser, Clone)]
pub struct SubmitArgs {
    /// A batch file written by `import`, possibly edited.
    #[arg(long)]
    file: PathBuf,
}

impl SubmitArgs {
    pub fn new(file: impl Into<PathBuf>) -> Self {
        Self { file: file.into() }
    }

    pub fn file(&self) -> &Path {
        &self.file
    }
}

fn default_home() -> DisplayPath {
    DisplayPath(match dirs::home_dir() {
        Some(home) => home.join("firefly-importer"),
        None => {
            error!(
                "There was an error when trying to get your home directory. You can get around \
                this by providing --home or FIREFLY_IMPORTER_HOME instead of relying on the \
                default home directory. If you continue using the program right now, you may \
                have problems!",
            );
            PathBuf::from("firefly-importer")
        }
    })
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DisplayPath(PathBuf);

impl From<PathBuf> for DisplayPath {
    fn from(value: PathBuf) -> Self {
        DisplayPath(value)
    }
}

impl Deref for DisplayPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<Path> for DisplayPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Display for DisplayPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_string_lossy())
    }
}

impl FromStr for DisplayPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}

impl DisplayPath {
    pub fn new(path: PathBuf) -> Self {
        Self(path)
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_import() {
        let args = Args::try_parse_from([
            "firefly-importer",
            "--home",
            "/tmp/ff",
            "--firefly-token",
            "abc",
            "import",
            "--account-id",
            "42",
            "--file",
            "statement.csv",
        ])
        .unwrap();
        assert_eq!(Path::new("/tmp/ff"), args.common().home().path());
        assert_eq!("abc", args.common().firefly_token);
        let Command::Import(import) = args.command() else {
            panic!("expected import, got {:?}", args.command());
        };
        assert_eq!("42", import.account_id());
        assert_eq!(Path::new("statement.csv"), import.file());
        assert!(import.output().is_none());
    }

    #[test]
    fn test_init_defaults() {
        let args = Args::try_parse_from(["firefly-importer", "init"]).unwrap();
        let Command::Init(init) = args.command() else {
            panic!("expected init, got {:?}", args.command());
        };
        let settings = init.settings();
        assert_eq!(Settings::default(), settings);
    }

    #[test]
    fn test_log_level() {
        let args =
            Args::try_parse_from(["firefly-importer", "--log-level", "debug", "mappings"]).unwrap();
        assert_eq!(LevelFilter::DEBUG, args.common().log_level());
        assert!(matches!(args.command(), Command::Mappings));
    }
}

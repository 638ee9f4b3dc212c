use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rewardcode::config::{Config, Options};
use rewardcode::crypto::{TruncationPolicy, generate_key};
use rewardcode::error::{Error, Result};
use rewardcode::identity::MemoryIdentityLookup;
use rewardcode::limit::MemoryCounterStore;
use rewardcode::models::CodeKind;
use rewardcode::{Verdict, Verifier, check_hash, decode, generate};

#[derive(Parser, Debug)]
#[command(name = "rewardcode")]
#[command(about = "Issue and check HMAC-authenticated reward codes")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Issue a new code
    Generate(GenerateArgs),
    /// Decode a code and check its hash
    Check(CheckArgs),
    /// Redeem codes in order, counting uses and resolving usernames in memory
    Verify(VerifyArgs),
    /// Print a new random signing key
    Keygen,
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// JSON options file; flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Signing key (default: REWARDCODE_KEY)
    #[arg(long)]
    key: Option<String>,

    /// Anyone may redeem the code
    #[arg(long, conflicts_with_all = ["username", "userid"])]
    public: bool,

    /// Only the account holding this username may redeem the code
    #[arg(long, conflicts_with = "userid")]
    username: Option<String>,

    /// Only this user id may redeem the code (not shown in the code)
    #[arg(long)]
    userid: Option<String>,

    /// Display label, must not be a number
    #[arg(long)]
    label: Option<String>,

    /// Reward amount
    #[arg(long)]
    currency: Option<u64>,

    /// Maximum number of uses (public codes only)
    #[arg(long)]
    max: Option<u64>,

    /// Truncation policy as ceiling,bytes pairs (default: REWARDCODE_BYTES)
    #[arg(long, value_delimiter = ',')]
    bytes: Vec<u64>,
}

#[derive(Args, Debug)]
struct CheckArgs {
    code: String,

    /// Signing key (default: REWARDCODE_KEY)
    #[arg(long)]
    key: Option<String>,

    /// User id for user-id bound codes
    #[arg(long)]
    userid: Option<String>,

    /// Truncation policy as ceiling,bytes pairs (default: REWARDCODE_BYTES)
    #[arg(long, value_delimiter = ',')]
    bytes: Vec<u64>,
}

#[derive(Args, Debug)]
struct VerifyArgs {
    /// Codes to redeem, in order; repeats count against usage limits
    #[arg(required = true)]
    codes: Vec<String>,

    /// Signing key (default: REWARDCODE_KEY)
    #[arg(long)]
    key: Option<String>,

    /// Identity of the presenter, required for personal codes
    #[arg(long)]
    identity: Option<String>,

    /// Known username and its identity, as name=id (repeatable)
    #[arg(long = "user", value_parser = parse_user)]
    users: Vec<(String, String)>,

    /// Truncation policy as ceiling,bytes pairs (default: REWARDCODE_BYTES)
    #[arg(long, value_delimiter = ',')]
    bytes: Vec<u64>,

    /// Deadline for each store or lookup call (default: REWARDCODE_TIMEOUT_MS)
    #[arg(long)]
    timeout_ms: Option<u64>,
}

fn parse_user(raw: &str) -> std::result::Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, id)) if !name.is_empty() && !id.is_empty() => {
            Ok((name.to_string(), id.to_string()))
        }
        _ => Err(format!("expected name=id, got '{}'", raw)),
    }
}

/// Signing key and policy from flags, falling back to the environment.
fn signing_setup(
    key: Option<String>,
    bytes: &[u64],
    config: &Config,
) -> Result<(String, TruncationPolicy)> {
    let key = key
        .or_else(|| config.key.clone())
        .ok_or_else(|| Error::Config("a signing key is required".into()))?;
    let policy = if bytes.is_empty() {
        config.policy()?
    } else {
        TruncationPolicy::from_flat(bytes)?
    };
    Ok((key, policy))
}

impl GenerateArgs {
    fn into_options(self) -> Result<Options> {
        let mut options = match &self.config {
            Some(path) => {
                let json = std::fs::read_to_string(path).map_err(|e| {
                    Error::Config(format!("cannot read {}: {}", path.display(), e))
                })?;
                Options::from_json(&json)?
            }
            None => Options::default(),
        };

        if let Some(key) = self.key {
            options.key = key;
        }
        if self.public {
            options.public = true;
        }
        if self.username.is_some() {
            options.username = self.username;
        }
        if self.userid.is_some() {
            options.userid = self.userid;
        }
        if self.label.is_some() {
            options.label = self.label;
        }
        if let Some(currency) = self.currency {
            options.currency = currency;
        }
        if self.max.is_some() {
            options.max = self.max;
        }
        if !self.bytes.is_empty() {
            options.bytes = self.bytes;
        }
        Ok(options)
    }
}

fn run_generate(args: GenerateArgs, config: &Config) -> Result<()> {
    let request = args.into_options()?.merge_config(config).into_request()?;
    let code = generate(
        &request.payload,
        &request.key,
        &request.policy,
        request.identity.as_deref(),
    )?;
    println!("{}", code);
    Ok(())
}

fn run_check(args: CheckArgs, config: &Config) -> Result<bool> {
    let (key, policy) = signing_setup(args.key, &args.bytes, config)?;

    let payload = decode(&args.code)?;
    if payload.kind() == CodeKind::PersonalById && args.userid.is_none() {
        return Err(Error::MissingIdentity);
    }

    let valid = payload.meets_required_length(&policy)
        && check_hash(&payload, &key, &policy, args.userid.as_deref())?;

    println!("kind:     {:?}", payload.kind());
    if let Some(label) = payload.label() {
        println!("label:    {}", label);
    }
    if let Some(username) = payload.username() {
        println!("username: {}", username);
    }
    println!("currency: {}", payload.currency());
    if let Some(limit) = payload.limit() {
        println!("limit:    {}", limit);
    }
    println!("valid:    {}", valid);
    Ok(valid)
}

async fn run_verify(args: VerifyArgs, config: &Config) -> Result<bool> {
    let (key, policy) = signing_setup(args.key, &args.bytes, config)?;
    let timeout = args
        .timeout_ms
        .map(Duration::from_millis)
        .unwrap_or(config.timeout);

    let mut lookup = MemoryIdentityLookup::new();
    for (name, id) in &args.users {
        lookup.insert(name, id);
    }

    let verifier = Verifier::new(key, policy, MemoryCounterStore::new(), lookup).timeout(timeout);

    let mut all_accepted = true;
    for code in &args.codes {
        let verdict = verifier.verify(code, args.identity.as_deref()).await?;
        let outcome = match &verdict {
            Verdict::Accepted(payload) => format!("accepted (currency {})", payload.currency()),
            Verdict::Forged => "forged".to_string(),
            Verdict::IdentityMismatch => "identity mismatch".to_string(),
            Verdict::LimitReached => "limit reached".to_string(),
        };
        println!("{}: {}", code, outcome);
        all_accepted &= verdict.is_accepted();
    }
    Ok(all_accepted)
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rewardcode=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Command::Generate(args) => run_generate(args, &config).map(|_| true),
        Command::Check(args) => run_check(args, &config),
        Command::Verify(args) => run_verify(args, &config).await,
        Command::Keygen => {
            println!("{}", generate_key());
            Ok(true)
        }
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

//! `cop` - the ChainOfProduct command line.
//!
//! Operates on local files: a keystore directory for private keys, one
//! JSON document for published public keys, and one for group
//! membership (standing in for the group server in demo deployments).
//!
//! Exit codes: 0 success, 2 input error, 3 authorization denied,
//! 4 cryptographic failure, 1 other.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cop_core::canonical::{parse_envelope, to_canonical_bytes};
use cop_core::error::CopError;
use cop_keystore::{FileDirectory, FileGroups, KeyStore};
use cop_pipeline::{buyer_sign, check, protect, unprotect, AccessPath, ProtectRequest};

const EXIT_INPUT: u8 = 2;
const EXIT_DENIED: u8 = 3;
const EXIT_CRYPTO: u8 = 4;
const EXIT_OTHER: u8 = 1;

#[derive(Parser)]
#[command(name = "cop")]
#[command(version, about = "ChainOfProduct - protected supply-chain transactions")]
struct Cli {
    /// Keystore root directory (private keys)
    #[arg(long, default_value = "keys", global = true)]
    keys_dir: PathBuf,

    /// Public-key directory file
    #[arg(long, default_value = "public_keys.json", global = true)]
    directory: PathBuf,

    /// Group membership file
    #[arg(long, default_value = "groups.json", global = true)]
    groups_file: PathBuf,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate an identity for a party and publish its keys
    Keygen {
        /// Party name
        party: String,
    },

    /// Protect a transaction file
    Protect {
        /// Input transaction file
        input: PathBuf,
        /// Output protected document file
        output: PathBuf,
        /// Seller party name (must have a keystore identity)
        #[arg(long)]
        seller: String,
        /// Buyer party name; may be omitted until buyer-sign time
        #[arg(long, default_value = "")]
        buyer: String,
        /// Additional recipients, comma separated
        #[arg(long, value_delimiter = ',')]
        recipients: Vec<String>,
        /// Group ids to disclose to, comma separated
        #[arg(long, value_delimiter = ',')]
        groups: Vec<String>,
    },

    /// Verify a protected document
    Check {
        /// Protected document file
        input: PathBuf,
    },

    /// Decrypt a protected document
    Unprotect {
        /// Protected document file
        input: PathBuf,
        /// Party name to decrypt as
        party: String,
        /// Output file for the decrypted transaction
        output: PathBuf,
    },

    /// Add the buyer signature to a protected document
    BuyerSign {
        /// Protected document file
        input: PathBuf,
        /// Buyer party name
        buyer: String,
        /// Output file for the counter-signed document
        output: PathBuf,
    },
}

enum CliError {
    /// Bad input files or arguments.
    Input(String),
    /// A pipeline failure, mapped onto exit codes by kind.
    Cop(CopError),
}

impl From<CopError> for CliError {
    fn from(e: CopError) -> Self {
        CliError::Cop(e)
    }
}

impl CliError {
    fn exit_code(&self) -> u8 {
        match self {
            CliError::Input(_) => EXIT_INPUT,
            CliError::Cop(e) => match e {
                CopError::Malformed(_) | CopError::AlreadyExists(_) => EXIT_INPUT,
                CopError::NotARecipient
                | CopError::WrongBuyer
                | CopError::UnknownParty(_)
                | CopError::UnknownGroup(_) => EXIT_DENIED,
                CopError::SignatureInvalid | CopError::AuthFailure => EXIT_CRYPTO,
                CopError::KeyStoreFailure(_) | CopError::RandomnessFailure => EXIT_OTHER,
            },
        }
    }

    fn message(&self) -> String {
        match self {
            CliError::Input(msg) => msg.clone(),
            CliError::Cop(e) => e.to_string(),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("ERROR: {}", e.message());
            ExitCode::from(e.exit_code())
        }
    }
}

fn run(cli: Cli) -> Result<u8, CliError> {
    let keystore = KeyStore::new(&cli.keys_dir);

    match cli.command {
        Commands::Keygen { party } => {
            let identity = keystore.generate(&party)?;
            let (signing, encryption) = identity.publics();
            let mut directory = FileDirectory::open(&cli.directory)?;
            directory.register(&party, signing, encryption)?;

            println!("✓ Keys generated for {party}");
            println!("  Private keys stored in: {}", cli.keys_dir.join(&party).display());
            println!("  Public keys registered in: {}", cli.directory.display());
            Ok(0)
        }

        Commands::Protect {
            input,
            output,
            seller,
            buyer,
            recipients,
            groups,
        } => {
            let content = read_file(&input)?;
            validate_addressing(&content, &seller, &buyer)?;

            let seller_keys = keystore.load(&seller)?;
            let directory = FileDirectory::open(&cli.directory)?;
            let resolver = FileGroups::open(&cli.groups_file)?;

            let request = ProtectRequest {
                buyer,
                recipients,
                groups,
            };
            let envelope = protect(&content, &seller_keys, &request, &directory, &resolver)?;
            write_file(&output, &to_canonical_bytes(&envelope)?)?;

            println!("✓ Transaction protected successfully");
            println!("  Output: {}", output.display());
            println!("  Transaction ID: {}", envelope.tx_id);
            println!("  Recipients: {} individual", envelope.direct_recipients.len());
            println!("  Groups: {} groups", envelope.group_recipients.len());
            Ok(0)
        }

        Commands::Check { input } => {
            let envelope = parse_envelope(&read_file(&input)?)?;
            let directory = FileDirectory::open(&cli.directory)?;
            let report = check(&envelope, &directory);

            if report.all_valid() {
                println!("✓ Document verification PASSED");
            } else {
                println!("✗ Document verification FAILED");
            }
            println!();
            println!("Details:");
            println!("  envelope_well_formed: {}", report.envelope_well_formed);
            println!("  seller_signature: {}", flag(Some(report.seller_sig_valid)));
            println!("  buyer_signature: {}", flag(report.buyer_sig_valid));
            println!("  addenda: {}", flag(report.addenda_valid));
            if !report.failures.is_empty() {
                println!();
                println!("Failures:");
                for failure in &report.failures {
                    println!("  - {failure}");
                }
            }
            Ok(if report.all_valid() { 0 } else { EXIT_CRYPTO })
        }

        Commands::Unprotect {
            input,
            party,
            output,
        } => {
            let envelope = parse_envelope(&read_file(&input)?)?;
            let keys = keystore.load(&party)?;
            let directory = FileDirectory::open(&cli.directory)?;

            let opened = unprotect(&envelope, &keys, &directory)?;
            write_file(&output, &opened.content)?;

            println!("✓ Document decrypted successfully");
            println!("  Output: {}", output.display());
            println!("  Access method: {}", access_label(&opened.access));
            Ok(0)
        }

        Commands::BuyerSign {
            input,
            buyer,
            output,
        } => {
            let mut envelope = parse_envelope(&read_file(&input)?)?;
            let keys = keystore.load(&buyer)?;
            buyer_sign(&mut envelope, &keys)?;
            write_file(&output, &to_canonical_bytes(&envelope)?)?;

            println!("✓ Buyer signature added successfully");
            println!("  Output: {}", output.display());
            Ok(0)
        }
    }
}

/// When the transaction is structured JSON naming its parties, the
/// addressing flags must agree with it.
fn validate_addressing(content: &[u8], seller: &str, buyer: &str) -> Result<(), CliError> {
    let Ok(value) = serde_json::from_slice::<serde_json::Value>(content) else {
        return Ok(()); // opaque payloads are fine
    };
    if let Some(named) = value.get("seller").and_then(|v| v.as_str()) {
        if named != seller {
            return Err(CliError::Input(format!(
                "seller name mismatch: {seller} vs {named}"
            )));
        }
    }
    if !buyer.is_empty() {
        if let Some(named) = value.get("buyer").and_then(|v| v.as_str()) {
            if named != buyer {
                return Err(CliError::Input(format!(
                    "buyer name mismatch: {buyer} vs {named}"
                )));
            }
        }
    }
    Ok(())
}

fn access_label(access: &AccessPath) -> String {
    match access {
        AccessPath::Direct => "individual".into(),
        AccessPath::SharedDirect { sharer } => format!("shared by {sharer}"),
        AccessPath::SharedGroup { group_id, sharer } => {
            format!("group {group_id}, shared by {sharer}")
        }
    }
}

fn flag(value: Option<bool>) -> &'static str {
    match value {
        Some(true) => "valid",
        Some(false) => "invalid",
        None => "absent",
    }
}

fn read_file(path: &PathBuf) -> Result<Vec<u8>, CliError> {
    fs::read(path).map_err(|e| CliError::Input(format!("{}: {e}", path.display())))
}

fn write_file(path: &PathBuf, bytes: &[u8]) -> Result<(), CliError> {
    fs::write(path, bytes).map_err(|e| CliError::Input(format!("{}: {e}", path.display())))
}

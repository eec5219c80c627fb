//! Command line parsing.
//!
//! Flags override whatever `MAINTAINER_*` environment variables set.

use maintainer_core::config::{key_source_from, load_ledger_proof};
use maintainer_core::node::parse_node_list;
use maintainer_core::{DidMethod, MaintainerConfig};
use std::path::Path;
use std::time::Duration;

/// What the run should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Create,
    Update,
    Sync,
}

#[derive(Debug)]
pub enum Parsed {
    Run(Command, Box<MaintainerConfig>),
    Help,
}

pub fn print_usage() {
    eprintln!("witness-maintainer - Keep a ledger's witness pool in step with its nodes");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  witness-maintainer <create|update|sync> [options]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  create   Publish a new witness pool (fails if one exists)");
    eprintln!("  update   Patch the existing witness pool (fails if none exists)");
    eprintln!("  sync     Create or update as needed");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -p, --primary <hosts>         Primary nodes, comma separated or repeated");
    eprintln!("  -s, --secondary <hosts>       Secondary nodes, comma separated or repeated");
    eprintln!("  -d, --did-method <v1|key>     Identity method (default: key)");
    eprintln!("  -k, --key <seed|file>         Seed phrase or key file (default: random key)");
    eprintln!("  -m, --mode <mode>             Veres One mode for did:v1 (default: dev)");
    eprintln!("  -w, --max-witnesses <n>       maximumWitnessCount (default on create: 1)");
    eprintln!("  -l, --ledger-proof <file>     Ledger write proof stapled onto v1 operations");
    eprintln!("  -t, --timeout <secs>          Per-node discovery timeout");
    eprintln!("  -q, --quorum <n>              Keep going if at least n nodes per role resolve");
    eprintln!("  -r, --reject-unauthorized     Refuse invalid TLS certificates");
    eprintln!("      --no-keep-alive           Close connections after each request");
    eprintln!("  -h, --help                    Show this help");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  MAINTAINER_PRIMARY, MAINTAINER_SECONDARY, MAINTAINER_DID_METHOD, MAINTAINER_KEY,");
    eprintln!("  MAINTAINER_VERES_MODE, MAINTAINER_MAX_WITNESSES, MAINTAINER_LEDGER_PROOF,");
    eprintln!("  MAINTAINER_NODE_TIMEOUT_SECS, MAINTAINER_REJECT_UNAUTHORIZED, MAINTAINER_KEEP_ALIVE");
    eprintln!("  RUST_LOG  Log filter (default: witness_maintainer=info,maintainer_core=info)");
}

/// Parse `args` (without the program name) on top of `config`.
pub fn parse(args: &[String], mut config: MaintainerConfig) -> Result<Parsed, String> {
    let mut args = args.iter();

    let command = match args.next().map(String::as_str) {
        Some("create") => Command::Create,
        Some("update") => Command::Update,
        Some("sync") => Command::Sync,
        Some("-h") | Some("--help") | Some("help") => return Ok(Parsed::Help),
        Some(other) => return Err(format!("unknown command {:?}", other)),
        None => return Err("missing command".into()),
    };

    let mut primary: Option<Vec<String>> = None;
    let mut secondary: Option<Vec<String>> = None;

    while let Some(flag) = args.next() {
        let mut value = || {
            args.next()
                .cloned()
                .ok_or_else(|| format!("{} requires a value", flag))
        };

        match flag.as_str() {
            "-p" | "--primary" => primary
                .get_or_insert_with(Vec::new)
                .extend(parse_node_list(&value()?)),
            "-s" | "--secondary" => secondary
                .get_or_insert_with(Vec::new)
                .extend(parse_node_list(&value()?)),
            "-d" | "--did-method" => {
                config.did_method = value()?.parse::<DidMethod>().map_err(|e| e.to_string())?;
            }
            "-k" | "--key" => config.key_source = key_source_from(&value()?),
            "-m" | "--mode" => config.veres_mode = value()?,
            "-w" | "--max-witnesses" => {
                config.maximum_witness_count = Some(number(flag, &value()?)?);
            }
            "-l" | "--ledger-proof" => {
                let proof = load_ledger_proof(Path::new(&value()?)).map_err(|e| e.to_string())?;
                config.ledger_proof = Some(proof);
            }
            "-t" | "--timeout" => {
                let secs = number(flag, &value()?)?;
                config.discovery = config.discovery.with_timeout(Duration::from_secs(secs));
            }
            "-q" | "--quorum" => {
                let min = number(flag, &value()?)?;
                config.discovery = config.discovery.with_quorum(min as usize);
            }
            "-r" | "--reject-unauthorized" => config.http.reject_unauthorized = true,
            "--no-keep-alive" => config.http.keep_alive = false,
            "-h" | "--help" => return Ok(Parsed::Help),
            other => return Err(format!("unknown option {:?}", other)),
        }
    }

    if let Some(primary) = primary {
        config.primary = primary;
    }
    if let Some(secondary) = secondary {
        config.secondary = secondary;
    }
    if config.primary.is_empty() {
        return Err("at least one primary node is required (-p or MAINTAINER_PRIMARY)".into());
    }

    Ok(Parsed::Run(command, Box::new(config)))
}

fn number(flag: &str, value: &str) -> Result<u64, String> {
    value
        .trim()
        .parse()
        .map_err(|_| format!("{} expects a non-negative integer, got {:?}", flag, value))
}

// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 U.S. Federal Government (in countries where recognized)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! PIV Toolkit Command-Line Tool
//!
//! Inspect PIV certificates and read credentials from PIV smart cards.
//!
//! # Usage
//!
//! ```text
//! pivtk [OPTIONS] <COMMAND>
//!
//! Commands:
//!   info       Decode PIV certificate files
//!   dump       Print the certificates on an attached card
//!   biometric  Unwrap biometric container files
//!
//! Options:
//!   -v, --verbose         Enable verbose output
//!   -q, --quiet           Suppress non-error output
//!   -h, --help            Print help
//!   -V, --version         Print version
//! ```
//!
//! # Examples
//!
//! ```bash
//! # Decode certificates exported from a card
//! pivtk info auth.pem signature.der
//!
//! # Dump a card through OpenSC, logging in first
//! PIV_PIN=123456 pivtk dump --module /usr/lib/x86_64-linux-gnu/opensc-pkcs11.so --login
//!
//! # Unwrap a facial image data object
//! pivtk biometric facial.bin --output "{name}.cbeff"
//! ```

use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::error;
use usg_piv::{BiometricContainer, PivCertificate, PivCredentials, PivSlot};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// PIV Toolkit Command-Line Tool
#[derive(Parser)]
#[command(name = "pivtk")]
#[command(author = "U.S. Federal Government")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "PIV certificate and smart card toolkit", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode PIV certificate files (DER or PEM)
    Info {
        /// Certificate files
        #[arg(required = true, value_name = "FILE")]
        files: Vec<PathBuf>,
    },

    /// Print the certificates on an attached card
    Dump(DumpArgs),

    /// Unwrap TLV-wrapped biometric container files
    Biometric {
        /// Container files read from the card
        #[arg(required = true, value_name = "FILE")]
        files: Vec<PathBuf>,

        /// Output path template; `{name}` is the input file stem
        #[arg(short, long, default_value = "{name}.cbeff")]
        output: String,
    },
}

#[derive(Args)]
struct DumpArgs {
    /// Token configuration file (TOML)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// PKCS#11 module (default: detect installed middleware)
    #[arg(short, long, value_name = "PATH")]
    module: Option<PathBuf>,

    /// Label of the token to use when several are attached
    #[arg(long, value_name = "LABEL")]
    token_label: Option<String>,

    /// Log in before reading
    #[arg(long)]
    login: bool,

    /// PIN used with --login
    #[arg(long, env = "PIV_PIN", hide_env_values = true)]
    pin: Option<String>,

    /// Read from a YubiKey PIV applet instead of PKCS#11
    #[cfg(feature = "yubikey")]
    #[arg(long)]
    yubikey: bool,

    /// Facial image output template; `{person}` is the cardholder key
    #[arg(short, long, default_value = "{person}.facial.cbeff")]
    output: String,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.quiet {
        tracing::Level::ERROR
    } else if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    let result = match &cli.command {
        Commands::Info { files } => cmd_info(files),
        Commands::Dump(args) => cmd_dump(args),
        Commands::Biometric { files, output } => cmd_biometric(files, output),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

// ============================================================================
// Command Implementations
// ============================================================================

fn cmd_info(files: &[PathBuf]) -> CliResult<()> {
    let mut failures = 0;

    for path in files {
        match load_certificate(path) {
            Ok(cert) => print_info(&cert),
            Err(e) => {
                error!("{}: {}", path.display(), e);
                failures += 1;
            }
        }
    }

    finish(failures)
}

fn load_certificate(path: &Path) -> CliResult<PivCertificate> {
    let bytes = std::fs::read(path)?;
    let cert = if bytes.starts_with(b"-----BEGIN") {
        PivCertificate::from_pem(&bytes)?
    } else {
        PivCertificate::from_der(&bytes)?
    };
    Ok(cert)
}

fn print_info(cert: &PivCertificate) {
    println!("Serial: {}", cert.serial_hex());
    if let Some(cn) = cert.common_name() {
        println!("  CN: {}", cn);
    }
    for uid in cert.user_ids() {
        println!("  UID: {}", uid);
    }
    if let Some(naci) = cert.completed_naci() {
        println!("  NACI: {}", naci);
    }
    for fasc in cert.fascs() {
        println!("  FASC: {}", fasc);
    }
    for upn in cert.principal_names() {
        println!("  UPN: {}", upn);
    }
    for email in cert.email_addresses() {
        println!("  Email: {}", email);
    }
    for policy in cert.policies() {
        println!("  Policy: {}", policy);
    }
    println!("  Assurance: {}", cert.policies().highest_assurance());
    println!();
}

fn cmd_dump(args: &DumpArgs) -> CliResult<()> {
    let pin = if args.login {
        Some(
            args.pin
                .clone()
                .ok_or("--login requires a PIN (--pin or PIV_PIN)")?,
        )
    } else {
        None
    };

    #[cfg(feature = "yubikey")]
    if args.yubikey {
        return dump_yubikey(pin.as_deref());
    }

    dump_pkcs11(args, pin)
}

#[cfg(feature = "pkcs11")]
fn dump_pkcs11(args: &DumpArgs, pin: Option<String>) -> CliResult<()> {
    use usg_piv::{Token, TokenConfig};

    let mut config = match &args.config {
        Some(path) => TokenConfig::from_file(path)?,
        None if args.module.is_some() => TokenConfig::new(""),
        None => TokenConfig::detect()?,
    };
    if let Some(module) = &args.module {
        config.module = module.clone();
    }
    if let Some(label) = &args.token_label {
        config = config.with_token_label(label);
    }
    if let Some(pin) = pin {
        config = config.with_pin(pin);
    }

    tracing::info!("Using PKCS#11 module {}", config.module.display());
    let mut token = Token::open_pkcs11(config)?;

    let (mut failures, person) = print_slots(&mut token);

    match token.facial_image() {
        Ok(container) => {
            if let Err(e) = write_facial(&container, &args.output, person.as_deref()) {
                error!("Facial image: {}", e);
                failures += 1;
            }
        }
        Err(e) if e.is_not_found() => println!("Facial data not found"),
        Err(e) => {
            error!("Facial image: {}", e);
            failures += 1;
        }
    }

    if let Err(e) = token.close() {
        error!("{}", e);
        failures += 1;
    }

    finish(failures)
}

#[cfg(not(feature = "pkcs11"))]
fn dump_pkcs11(_args: &DumpArgs, _pin: Option<String>) -> CliResult<()> {
    Err("pivtk was built without PKCS#11 support".into())
}

#[cfg(feature = "yubikey")]
fn dump_yubikey(pin: Option<&str>) -> CliResult<()> {
    let mut yubikey = usg_piv::YubiKeyCredentials::find_first()?;
    tracing::info!("Using YubiKey {}", yubikey.serial());

    if let Some(pin) = pin {
        yubikey.verify_pin(pin)?;
    }

    let (failures, _) = print_slots(&mut yubikey);
    finish(failures)
}

/// Print every certificate slot, returning the failure count and the
/// cardholder key of the first certificate carrying a FASC-N.
fn print_slots<C: PivCredentials>(credentials: &mut C) -> (usize, Option<String>) {
    let mut failures = 0;
    let mut person = None;

    for slot in PivSlot::ALL {
        match credentials.certificate(slot) {
            Ok(cert) => {
                if person.is_none() {
                    person = cert.fascs().first().map(|f| f.person_key());
                }
                if let Err(e) = print_certificate(slot, &cert) {
                    error!("{}: {}", slot, e);
                    failures += 1;
                }
            }
            Err(e) if e.is_not_found() => println!("No certificate in the {} slot", slot.name()),
            Err(e) => {
                error!("{}: {}", slot, e);
                failures += 1;
            }
        }
    }

    (failures, person)
}

fn print_certificate(slot: PivSlot, cert: &PivCertificate) -> CliResult<()> {
    println!("{}:", slot);
    println!("  Subject: {}", cert.subject());
    println!("  Issuer: {}", cert.issuer());

    if !cert.principal_names().is_empty() {
        println!("  UPNs:");
        for upn in cert.principal_names() {
            println!("    {}", upn);
        }
    }

    if !cert.fascs().is_empty() {
        println!("  FASC:");
        for fasc in cert.fascs() {
            println!("    {}", fasc);
        }
    }

    println!("{}", cert.to_pem()?);
    Ok(())
}

#[cfg(feature = "pkcs11")]
fn write_facial(
    container: &BiometricContainer,
    template: &str,
    person: Option<&str>,
) -> CliResult<()> {
    let person = person.unwrap_or_else(|| {
        tracing::warn!("No FASC-N on the card; naming facial image \"unknown\"");
        "unknown"
    });
    let path = template.replace("{person}", person);
    std::fs::write(&path, container.cbeff())?;
    println!("Wrote {} bytes of facial data to {}", container.cbeff().len(), path);
    Ok(())
}

fn cmd_biometric(files: &[PathBuf], template: &str) -> CliResult<()> {
    let mut failures = 0;

    for path in files {
        if let Err(e) = unwrap_biometric(path, template) {
            error!("{}: {}", path.display(), e);
            failures += 1;
        }
    }

    finish(failures)
}

fn unwrap_biometric(path: &Path, template: &str) -> CliResult<()> {
    let bytes = std::fs::read(path)?;
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "biometric".to_string());
    let container = BiometricContainer::from_tlv(name.clone(), &bytes)?;

    let output = template.replace("{name}", &name);
    std::fs::write(&output, container.cbeff())?;
    println!(
        "{}: {} bytes of CBEFF data written to {}",
        path.display(),
        container.cbeff().len(),
        output
    );
    Ok(())
}

fn finish(failures: usize) -> CliResult<()> {
    if failures == 0 {
        Ok(())
    } else {
        Err(format!("{} item(s) failed", failures).into())
    }
}

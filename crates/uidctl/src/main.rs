// # uidctl - User-ID Client
//
// Thin command-line layer over `uid-core`: builds one transaction from its
// arguments and either prints the encoded message or pushes it to the device.
// Merging, encoding and reply classification all live in `uid-core`.
//
// ## Usage
//
// ```text
// uidctl [--print] <op> <args..> [<op> <args..> ...]
//
//   register   IP TAG [TTL]
//   unregister IP TAG
//   login      USER IP [TTL]
//   logout     USER IP
//   group      USER GROUP [TTL]
//   ungroup    USER GROUP
// ```
//
// TTLs are minutes. `--print` writes the `<uid-message>` to stdout and sends
// nothing; no device settings are needed in that mode.
//
// ## Configuration
//
// All device settings come from environment variables:
//
// - `UID_HOST`: Device address, optionally with port (e.g. `10.1.1.1:443`)
// - `UID_API_KEY`: XML API key
// - `UID_TIMEOUT_SECS`: Request timeout (default 30)
// - `UID_ACCEPT_INVALID_CERTS`: `true` to accept self-signed certificates
// - `UID_MODE`: `dry-run` to log requests instead of sending them
// - `UID_LOG_LEVEL`: trace, debug, info, warn, error (default info)
//
// ## Example
//
// ```bash
// export UID_HOST=10.1.1.1
// export UID_API_KEY=...
//
// uidctl login acme\\alice 10.1.1.20 60 group acme\\alice admins register 10.1.1.20 web
// ```

use std::env;
use std::process::ExitCode;

use anyhow::{Context, Result};
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;
use uid_core::{DeviceConfig, TracingChangeLog, UidBuilder};
use uid_transport_http::HttpTransport;

/// Exit codes for different termination scenarios
///
/// - 0: Update accepted (or printed)
/// - 1: Configuration or usage error
/// - 2: Runtime error (push failed)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UidExitCode {
    /// Update accepted
    Success = 0,
    /// Configuration or usage error
    ConfigError = 1,
    /// Runtime error (connection, HTTP status, device rejection)
    RuntimeError = 2,
}

impl From<UidExitCode> for ExitCode {
    fn from(code: UidExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
struct Config {
    host: String,
    api_key: String,
    timeout_secs: Option<u64>,
    accept_invalid_certs: bool,
    mode: String,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Ok(Self {
            host: env::var("UID_HOST").unwrap_or_default(),
            api_key: env::var("UID_API_KEY").unwrap_or_default(),
            timeout_secs: env::var("UID_TIMEOUT_SECS")
                .ok()
                .map(|s| s.parse())
                .transpose()
                .context("UID_TIMEOUT_SECS must be a number of seconds")?,
            accept_invalid_certs: env::var("UID_ACCEPT_INVALID_CERTS")
                .map(|s| matches!(s.to_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
            mode: env::var("UID_MODE").unwrap_or_else(|_| "live".to_string()),
            log_level: env::var("UID_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Validate settings that do not depend on the device
    fn validate(&self) -> Result<()> {
        match self.mode.as_str() {
            "live" | "dry-run" => {}
            _ => anyhow::bail!(
                "UID_MODE '{}' is not valid. Valid modes: live, dry-run",
                self.mode
            ),
        }

        self.level()?;
        Ok(())
    }

    /// Device settings, validated
    fn device(&self) -> Result<DeviceConfig> {
        if self.host.is_empty() {
            anyhow::bail!("UID_HOST is required. Set it via: export UID_HOST=10.1.1.1");
        }
        if self.api_key.is_empty() {
            anyhow::bail!("UID_API_KEY is required. Set it via: export UID_API_KEY=<key>");
        }

        let mut device = DeviceConfig::new(&self.host, &self.api_key)
            .with_accept_invalid_certs(self.accept_invalid_certs)
            .with_dry_run(self.mode == "dry-run");
        if let Some(secs) = self.timeout_secs {
            device = device.with_timeout_secs(secs);
        }
        device.validate()?;
        Ok(device)
    }

    fn level(&self) -> Result<Level> {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Ok(Level::TRACE),
            "debug" => Ok(Level::DEBUG),
            "info" => Ok(Level::INFO),
            "warn" => Ok(Level::WARN),
            "error" => Ok(Level::ERROR),
            _ => anyhow::bail!(
                "UID_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }
    }
}

/// Parsed command line
#[derive(Debug)]
struct Command {
    builder: UidBuilder,
    print: bool,
}

/// Parse `[--print] <op> <args..> ...` into one transaction
fn parse_args<I>(args: I) -> Result<Command>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter().peekable();
    let mut builder = UidBuilder::new();
    let mut print = false;

    while let Some(op) = args.next() {
        let mut operand = |name: &str| {
            args.next()
                .with_context(|| format!("'{}' is missing {}", op, name))
        };
        builder = match op.as_str() {
            "--print" => {
                print = true;
                builder
            }
            "register" => {
                let ip = operand("IP")?;
                let tag = operand("TAG")?;
                let ttl = parse_ttl(&mut args)?;
                builder.register_ip(ip, tag, ttl)
            }
            "unregister" => {
                let ip = operand("IP")?;
                let tag = operand("TAG")?;
                builder.unregister_ip(ip, tag)
            }
            "login" => {
                let user = operand("USER")?;
                let ip = operand("IP")?;
                let ttl = parse_ttl(&mut args)?;
                builder.login_user(user, ip, ttl)
            }
            "logout" => {
                let user = operand("USER")?;
                let ip = operand("IP")?;
                builder.logout_user(user, ip)
            }
            "group" => {
                let user = operand("USER")?;
                let group = operand("GROUP")?;
                let ttl = parse_ttl(&mut args)?;
                builder.group_user(user, group, ttl)
            }
            "ungroup" => {
                let user = operand("USER")?;
                let group = operand("GROUP")?;
                builder.ungroup_user(user, group)
            }
            other => anyhow::bail!(
                "Unknown operation '{}'. \
                Valid operations: register, unregister, login, logout, group, ungroup",
                other
            ),
        };
    }

    if builder.is_empty() {
        anyhow::bail!("No operations given. Usage: uidctl [--print] <op> <args..> ...");
    }
    Ok(Command { builder, print })
}

/// Consume the next argument as a TTL if it is all digits
fn parse_ttl<I>(args: &mut std::iter::Peekable<I>) -> Result<Option<u32>>
where
    I: Iterator<Item = String>,
{
    match args.next_if(|s| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())) {
        Some(raw) => {
            let minutes = raw
                .parse()
                .with_context(|| format!("TTL '{}' is out of range", raw))?;
            Ok(Some(minutes))
        }
        None => Ok(None),
    }
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return UidExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {:#}", e);
        return UidExitCode::ConfigError.into();
    }

    let command = match parse_args(env::args().skip(1)) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("Usage error: {:#}", e);
            return UidExitCode::ConfigError.into();
        }
    };

    // Initialize tracing
    let log_level = config.level().unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return UidExitCode::ConfigError.into();
    }

    if command.print {
        return match print_message(&command.builder) {
            Ok(()) => UidExitCode::Success.into(),
            Err(e) => {
                error!("Failed to encode message: {:#}", e);
                UidExitCode::RuntimeError.into()
            }
        };
    }

    let device = match config.device() {
        Ok(device) => device,
        Err(e) => {
            eprintln!("Configuration validation error: {:#}", e);
            return UidExitCode::ConfigError.into();
        }
    };

    let transport = match HttpTransport::new(&device) {
        Ok(transport) => transport,
        Err(e) => {
            error!("Failed to create transport: {}", e);
            return UidExitCode::ConfigError.into();
        }
    };

    // A single request; a current-thread runtime is enough
    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return UidExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        match push(&command.builder, &transport, &device).await {
            Ok(()) => UidExitCode::Success,
            Err(e) => {
                error!("Push failed: {:#}", e);
                UidExitCode::RuntimeError
            }
        }
    });

    result.into()
}

/// Print the encoded message to stdout
fn print_message(builder: &UidBuilder) -> Result<()> {
    let mut sink = TracingChangeLog;
    let xml = builder.message(Some(&mut sink))?.to_xml()?;
    println!("{}", xml);
    Ok(())
}

/// Push the transaction and log the device's answer
async fn push(builder: &UidBuilder, transport: &HttpTransport, device: &DeviceConfig) -> Result<()> {
    let mut sink = TracingChangeLog;
    let response = builder.push(transport, device, Some(&mut sink)).await?;

    info!(status = %response.status, host = %device.host, "Device accepted User-ID update");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use uid_core::PendingEntry;

    fn args(line: &str) -> Vec<String> {
        line.split_whitespace().map(str::to_string).collect()
    }

    fn config(mode: &str, log_level: &str) -> Config {
        Config {
            host: "10.1.1.1".to_string(),
            api_key: "secret".to_string(),
            timeout_secs: None,
            accept_invalid_certs: false,
            mode: mode.to_string(),
            log_level: log_level.to_string(),
        }
    }

    #[test]
    fn test_parse_all_operations() {
        let command = parse_args(args(
            "register 1.1.1.1 web 60 unregister 2.2.2.2 db \
             login alice 1.1.1.1 logout bob 2.2.2.2 \
             group alice admins 15 ungroup bob admins",
        ))
        .unwrap();

        assert!(!command.print);
        let entries = command.builder.entries();
        assert_eq!(entries.len(), 6);
        assert_eq!(
            entries[0],
            PendingEntry::Register {
                ip: "1.1.1.1".to_string(),
                tag: "web".to_string(),
                ttl: Some(60),
            }
        );
        assert_eq!(
            entries[2],
            PendingEntry::Login {
                user: "alice".to_string(),
                ip: "1.1.1.1".to_string(),
                ttl: None,
            }
        );
        assert_eq!(
            entries[4],
            PendingEntry::Group {
                user: "alice".to_string(),
                group: "admins".to_string(),
                ttl: Some(15),
            }
        );
    }

    #[test]
    fn test_parse_print_flag_anywhere() {
        let command = parse_args(args("register 1.1.1.1 web --print")).unwrap();
        assert!(command.print);
        assert_eq!(command.builder.len(), 1);
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_args(args("")).is_err());
        assert!(parse_args(args("--print")).is_err());
        assert!(parse_args(args("register 1.1.1.1")).is_err());
        assert!(parse_args(args("promote alice")).is_err());
        assert!(parse_args(args("register 1.1.1.1 web 99999999999")).is_err());
    }

    #[test]
    fn test_config_validation() {
        assert!(config("live", "info").validate().is_ok());
        assert!(config("dry-run", "DEBUG").validate().is_ok());
        assert!(config("staging", "info").validate().is_err());
        assert!(config("live", "verbose").validate().is_err());
    }

    #[test]
    fn test_device_from_config() {
        let device = config("dry-run", "info").device().unwrap();
        assert!(device.dry_run);
        assert_eq!(device.endpoint(), "https://10.1.1.1/api/");

        let mut missing = config("live", "info");
        missing.api_key.clear();
        assert!(missing.device().is_err());
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(UidExitCode::Success as u8, 0);
        assert_eq!(UidExitCode::ConfigError as u8, 1);
        assert_eq!(UidExitCode::RuntimeError as u8, 2);
    }
}

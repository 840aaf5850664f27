//! Centralised helpers for user-facing CLI output written to stderr.
//!
//! Machine-readable results go to stdout; everything here is for the human at the terminal.

use secrecy::SecretString;
use std::io::Write as _;

fn stderr_writeln(s: &str) {
    let mut stderr = std::io::stderr().lock();
    if stderr.write_all(s.as_bytes()).is_err() {
        return;
    }
    if stderr.write_all(b"\n").is_err() {
        return;
    }
    let _flush = stderr.flush();
}

/// Shown once after a wallet is generated.
pub fn print_backup_warning(show_private_key: bool) {
    if show_private_key {
        stderr_writeln(
            "VelCoin: new wallet created. Store the private key somewhere safe; if you lose it, the funds cannot be recovered.",
        );
    } else {
        stderr_writeln(
            "VelCoin: new wallet created. Run `velwallet show --show-private-key` and back up the private key; if you lose it, the funds cannot be recovered.",
        );
    }
}

pub fn print_history_cleared() {
    stderr_writeln("VelCoin: local transaction history cleared.");
}

/// Notice for the state left behind by `logout` (history is not removed).
pub fn print_logged_out(history_len: usize) {
    if history_len == 0 {
        stderr_writeln("VelCoin: logged out.");
    } else {
        stderr_writeln(&format!(
            "VelCoin: logged out. {history_len} local history entries were kept; run `velwallet clear-history` to remove them."
        ));
    }
}

/// Read a private key without echoing it.
pub fn prompt_private_key() -> eyre::Result<SecretString> {
    let s = rpassword::prompt_password("Private key (hex): ")
        .map_err(|e| eyre::eyre!("read private key: {e}"))?;
    Ok(SecretString::new(s.into()))
}

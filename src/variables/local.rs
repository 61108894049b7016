//! Loader for the local variable tier.
//!
//! Local variables come from a dotenv-style file next to the deployment, not
//! from the process environment. Infrastructure keys that configure the
//! engine itself are excluded so they can never leak into request text.

use std::collections::HashMap;
use std::path::Path;

/// Infrastructure keys that never become request variables.
pub const RESERVED_KEYS: &[&str] = &["STORE_URI", "STORE_DB", "SSL_VERIFY"];

/// Loads the local variable tier from a dotenv-style file.
///
/// A missing or unreadable file yields an empty tier; malformed lines are
/// skipped. Reserved infrastructure keys are dropped.
pub fn load_local_vars(path: impl AsRef<Path>) -> HashMap<String, String> {
    let mut vars = HashMap::new();
    let iter = match dotenvy::from_path_iter(path.as_ref()) {
        Ok(iter) => iter,
        Err(err) => {
            log::debug!("no local variable file loaded: {}", err);
            return vars;
        }
    };

    for entry in iter {
        match entry {
            Ok((key, value)) => {
                if !RESERVED_KEYS.contains(&key.as_str()) {
                    vars.insert(key, value);
                }
            }
            Err(err) => log::debug!("skipping malformed local variable line: {}", err),
        }
    }
    vars
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_env_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_loads_plain_pairs() {
        let file = write_env_file("API_HOST=api.example.com\nAPI_TOKEN=abc123\n");
        let vars = load_local_vars(file.path());
        assert_eq!(vars.get("API_HOST").unwrap(), "api.example.com");
        assert_eq!(vars.get("API_TOKEN").unwrap(), "abc123");
    }

    #[test]
    fn test_reserved_keys_are_dropped() {
        let file = write_env_file(
            "STORE_URI=mongodb://localhost\nSTORE_DB=testdb\nSSL_VERIFY=false\nKEEP=yes\n",
        );
        let vars = load_local_vars(file.path());
        assert_eq!(vars.len(), 1);
        assert_eq!(vars.get("KEEP").unwrap(), "yes");
    }

    #[test]
    fn test_missing_file_yields_empty_tier() {
        let vars = load_local_vars("/nonexistent/.env");
        assert!(vars.is_empty());
    }
}

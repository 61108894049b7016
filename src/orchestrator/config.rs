//! Per-run execution options.

use crate::transport::TransportOptions;
use crate::variables::load_local_vars;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// Caller-supplied knobs for one pipeline run.
///
/// The defaults match the interactive client: 30-second dispatch timeout and
/// TLS verification on. `local_vars` is the static highest-precedence
/// variable tier; it never participates in persistence.
#[derive(Debug, Clone)]
pub struct ExecutionOptions {
    /// Timeout applied to the main dispatch and to every sandbox-bridged call.
    pub timeout: Duration,

    /// Whether to verify TLS certificates. `SSL_VERIFY=false` in the
    /// deployment's dotenv file turns this off.
    pub verify_tls: bool,

    /// The local variable tier.
    pub local_vars: HashMap<String, String>,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            verify_tls: true,
            local_vars: HashMap::new(),
        }
    }
}

impl ExecutionOptions {
    /// Builds options from a dotenv-style file.
    ///
    /// Non-reserved entries become the local variable tier; the reserved
    /// `SSL_VERIFY` key configures certificate verification. A missing file
    /// yields the defaults.
    pub fn from_env_file(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let local_vars = load_local_vars(path);

        let mut verify_tls = true;
        if let Ok(iter) = dotenvy::from_path_iter(path) {
            for (key, value) in iter.flatten() {
                if key == "SSL_VERIFY" {
                    verify_tls = !matches!(
                        value.trim().to_ascii_lowercase().as_str(),
                        "false" | "0" | "no" | "off"
                    );
                }
            }
        }

        Self {
            timeout: Duration::from_secs(30),
            verify_tls,
            local_vars,
        }
    }

    /// The transport options implied by this configuration.
    pub fn transport_options(&self) -> TransportOptions {
        TransportOptions {
            verify_tls: self.verify_tls,
            timeout: self.timeout,
        }
    }
}

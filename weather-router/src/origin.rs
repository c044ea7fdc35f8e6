use crate::config::OriginConfig;
use hyper::header::{HeaderMap, ORIGIN};
use std::collections::HashSet;

/// Static origin whitelist, checked against the `Origin` request header.
#[derive(Clone, Debug)]
pub struct OriginGuard {
    allowed: HashSet<String>,
    debug: bool,
}

impl OriginGuard {
    pub fn new(config: &OriginConfig) -> Self {
        if config.debug {
            tracing::warn!("Debug mode is on, origin whitelist checks are disabled");
        }

        Self {
            allowed: config.allowed.iter().cloned().collect(),
            debug: config.debug,
        }
    }

    /// Returns true if a request carrying `headers` may proceed.
    pub fn allows(&self, headers: &HeaderMap) -> bool {
        if self.debug {
            return true;
        }

        headers
            .get(ORIGIN)
            .and_then(|origin| origin.to_str().ok())
            .is_some_and(|origin| self.allowed.contains(origin))
    }
}

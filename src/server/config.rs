use crate::controller::DEFAULT_MAX_INPUT_MB;
use crate::size::BYTES_IN_MB;

/// Settings injected into every request handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Largest accepted upload, in MB.
    pub max_input_mb: u64,
    /// Target pre-filled in the form, in MB.
    pub default_target_mb: u32,
}

impl ServerConfig {
    /// Request body ceiling: the largest PDF plus room for the multipart framing.
    pub fn body_limit(&self) -> usize {
        let bytes = self
            .max_input_mb
            .saturating_add(1)
            .saturating_mul(BYTES_IN_MB);
        usize::try_from(bytes).unwrap_or(usize::MAX)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            max_input_mb: DEFAULT_MAX_INPUT_MB,
            default_target_mb: 100,
        }
    }
}

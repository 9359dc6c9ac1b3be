//! Default value functions for configuration.

use pirch_proto::command::DEFAULT_PROXY_CAPACITY;
use pirch_proto::line::DEFAULT_MAX_LEN;

use crate::session::DEFAULT_ENTITY_CAPACITY;

// =============================================================================
// Protocol Defaults
// =============================================================================

pub fn default_max_line_length() -> usize {
    DEFAULT_MAX_LEN
}

pub fn default_proxy_capacity() -> usize {
    DEFAULT_PROXY_CAPACITY
}

pub fn default_entity_capacity() -> usize {
    DEFAULT_ENTITY_CAPACITY
}

// =============================================================================
// Logging Defaults
// =============================================================================

pub fn default_log_filter() -> String {
    "info".to_string()
}

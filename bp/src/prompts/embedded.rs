//! Embedded prompts
//!
//! These are compiled into the binary from .pmt files at build time.

use tracing::debug;

pub const SYSTEM: &str = include_str!("../../prompts/system.pmt");
pub const CLASSIFY_REQUEST: &str = include_str!("../../prompts/classify-request.pmt");
pub const NEEDS_DATA: &str = include_str!("../../prompts/needs-data.pmt");
pub const CLASSIFY_WRITE: &str = include_str!("../../prompts/classify-write.pmt");
pub const SYNTHESIZE_QUERY: &str = include_str!("../../prompts/synthesize-query.pmt");
pub const DECIDE_REFINE: &str = include_str!("../../prompts/decide-refine.pmt");
pub const REGENERATE_PROMPT: &str = include_str!("../../prompts/regenerate-prompt.pmt");
pub const RESPOND_READ: &str = include_str!("../../prompts/respond-read.pmt");
pub const RESPOND_WRITE: &str = include_str!("../../prompts/respond-write.pmt");

/// Get the embedded prompt by name
pub fn get_embedded(name: &str) -> Option<&'static str> {
    debug!(%name, "get_embedded: called");
    let found = match name {
        "system" => Some(SYSTEM),
        "classify-request" => Some(CLASSIFY_REQUEST),
        "needs-data" => Some(NEEDS_DATA),
        "classify-write" => Some(CLASSIFY_WRITE),
        "synthesize-query" => Some(SYNTHESIZE_QUERY),
        "decide-refine" => Some(DECIDE_REFINE),
        "regenerate-prompt" => Some(REGENERATE_PROMPT),
        "respond-read" => Some(RESPOND_READ),
        "respond-write" => Some(RESPOND_WRITE),
        _ => None,
    };
    if found.is_none() {
        debug!("get_embedded: no match found");
    }
    found
}

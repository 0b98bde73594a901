// src/scanner/mod.rs
// =============================================================================
// Everything that looks inside a page.
//
// Submodules:
// - classify: decides what one URL means (insecure resource, link, or skip)
// - tokens: turns HTML into a stream of start/end/self-closing tag tokens
// - page: walks the tokens and collects resources and links for one page
// =============================================================================

mod classify;
mod page;
mod tokens;

pub use classify::normalize;
pub use page::scan_body;

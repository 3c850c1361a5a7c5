// Library surface for headless/integration tests and reuse.
// Keep this lean to avoid coupling to bin-only types in main.rs.
pub mod config;
pub mod exam;
pub mod export;
pub mod history;
pub mod question;
pub mod runtime;
pub mod session;
pub mod source;
pub mod util;

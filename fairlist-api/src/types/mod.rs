//! API Request and Response Types

// Response envelope
mod envelope;
pub use envelope::*;

// List views and upload results
mod list;
pub use list::*;

// Agent and sub-agent management
mod recipient;
pub use recipient::*;

//! API route modules.

pub mod mic_check;

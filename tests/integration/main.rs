//! Integration tests: full session flows through the public API.

mod scripted_outcome;
mod session_flow;

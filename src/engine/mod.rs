//! Core engine: odds, outcomes, ledger, settlement and the session
//! lifecycle built on top of them.

pub mod clock;
pub mod ledger;
pub mod manager;
pub mod odds;
pub mod outcome;
pub mod session;
pub mod settlement;

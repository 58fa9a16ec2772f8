//! Data types and the pure logic over them.

pub mod api;
pub mod credentials;
pub mod ledger;
pub mod mongodb;
pub mod ranking;
pub mod session;
pub mod topic;

//! Data models
//!
//! Entities persisted by the engine:
//! - Identity: User, SecurityQuestion, Session, ResetToken
//! - Monitoring: Batch, SensorReading, BatchHistory

mod batch;
mod history;
mod reading;
mod reset_token;
mod session;
mod user;

pub use batch::{Batch, BatchStatus, BatchWithStats, CreateBatchInput};
pub use history::{BatchHistory, SaveHistoryInput};
pub use reading::{ReadingSnapshot, SensorReading, Verdict};
pub use reset_token::ResetToken;
pub use session::Session;
pub use user::{SecurityQuestion, User};

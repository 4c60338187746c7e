//! Business logic services
//!
//! Services sit between the HTTP layer and the repositories. Each service
//! owns its error enum; handlers map those onto API error codes.

pub mod batch;
pub mod history;
pub mod password;
pub mod predictor;
pub mod reading;
pub mod recovery;
pub mod user;

pub use batch::{BatchService, BatchServiceError};
pub use history::{HistoryService, HistoryServiceError};
pub use predictor::{fallback_verdict, HttpPredictor, Predictor};
pub use reading::{ReadingService, ReadingServiceError, RecordedReading};
pub use recovery::{RecoveryService, RecoveryServiceError};
pub use user::{SignupInput, UserService, UserServiceError};

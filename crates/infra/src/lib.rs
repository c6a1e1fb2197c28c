//! Infrastructure layer: transactional store, sequence generator, the draft
//! lifecycle / transfer engine, and configuration.

pub mod config;
pub mod engine;
pub mod error;
pub mod sequence;
pub mod store;


pub use config::{Config, ConfigError, EngineConfig};
pub use engine::{DraftQuery, Engine, OpeningBalance, Page, TransferRequest};
pub use error::{EngineError, EngineResult};
pub use sequence::{SequenceGenerator, SequenceKind, with_sequence_retry};
pub use store::{InMemoryStore, Store, StoreError, UnitOfWork};

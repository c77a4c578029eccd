pub mod config;
pub mod error;
pub mod models;

pub use config::MqConfig;
pub use error::MqError;
pub use models::{BroccoliError, BrokerMessage, MqQueue, init_mq, publish, publish_all};

pub type Mq = MqQueue;

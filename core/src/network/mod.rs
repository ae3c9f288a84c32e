//! Network stage: link session, naming service, SNTP and topics

pub mod error;
pub mod naming;
pub mod session;
pub mod sntp;
pub mod topic;

pub use error::{NamingError, NetworkError, SntpError};
pub use naming::NamingClient;
pub use session::{Connected, NetworkSession};
pub use sntp::{SntpClient, SntpConfig};
pub use topic::{format_topic, TopicError, MAX_TOPIC_LEN};

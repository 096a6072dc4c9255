pub mod endpoints;
pub mod session;

pub use endpoints::TrackerEndpoints;
pub use session::{Credentials, TrackerSession, WebClient};

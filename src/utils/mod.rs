pub mod capacity;
pub mod command;
pub mod locker;
pub mod remote;

pub use capacity::{check_local, CapacityReport};
pub use command::CommandResult;
pub use locker::AgentLock;
pub use remote::{OpenSshConnector, OpenSshSession, RemoteSession, SessionConnector};

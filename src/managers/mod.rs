pub mod cycle;
pub mod logging;
pub mod notification;
pub mod scheduler;

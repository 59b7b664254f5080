// RouterOS v7 REST surface
//
// `client` owns URL construction, auth and response handling; the other
// modules add endpoint groups to `RestClient` as inherent methods.

mod client;
mod menus;
mod scheduler;
mod system;

pub use client::RestClient;
pub use scheduler::SCHEDULER_PATH;
pub use system::IDENTITY_PATH;

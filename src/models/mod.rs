mod site;
mod user_activity;

pub use site::*;
pub use user_activity::*;

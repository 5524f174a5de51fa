pub mod dispatch;
pub mod matcher;
pub mod state_machine;

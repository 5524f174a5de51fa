pub mod driver;
pub mod event;
pub mod notification;
pub mod order;
pub mod user;

pub mod events;
pub mod fanout;
pub mod gateway;
pub mod handler;

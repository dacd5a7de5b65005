pub mod chat_service;
pub mod message_service;
pub mod notification_service;

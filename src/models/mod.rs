pub mod chat;
pub mod message;
pub mod notification;
pub mod user;

pub use chat::{Chat, ChatDetails};
pub use message::{Message, MessageDetails};
pub use notification::Notification;
pub use user::UserProfile;

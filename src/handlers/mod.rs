pub mod auth;
pub mod comments;
pub mod health;
pub mod likes;
pub mod posts;
pub mod users;

pub use auth::login_access_token;
pub use comments::{add_comment, list_comments};
pub use health::health_check;
pub use likes::{likes_count, toggle_like};
pub use posts::{create_post, delete_post, get_post, list_posts, publish_post, update_post};
pub use users::{create_user, get_user, get_user_posts};

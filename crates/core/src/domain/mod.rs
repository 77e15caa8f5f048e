pub mod record;
pub mod reply;

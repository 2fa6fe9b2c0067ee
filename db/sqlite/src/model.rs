pub mod record;
pub mod system;

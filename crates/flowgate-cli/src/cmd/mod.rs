pub mod detect;
pub mod hook;

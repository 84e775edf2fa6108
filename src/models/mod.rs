pub mod push;
pub mod response;

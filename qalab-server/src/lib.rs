pub mod http;
pub mod pages;
pub mod router;
pub mod session;

pub mod i18n;
pub mod jwt;
pub mod logging;
pub mod response;

//! Error handling for the proxy
//!
//! A single error enum covers every failure domain named in the spec's
//! error taxonomy, with an `actix_web::ResponseError` impl that renders the
//! JSON envelope clients see.

pub mod error;

pub use error::*;

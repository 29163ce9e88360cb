//! Capabilities the core asks the shell to perform.
//!
//! Render comes straight from Crux; HTTP and key-value storage use the
//! published `crux_http` and `crux_kv` capabilities.

pub mod http;
pub mod kv;

pub use crux_core::render::Render;
pub use crux_http::Http;
pub use crux_kv::KeyValue;

pub use self::http::{ApiRequest, AuthPolicy, Endpoint, HttpMethod};

use crate::app::App;
use crate::event::Event;

// Field types are spelled out: the Effect derive reads the capability name
// from the field type and does not see through aliases. It also names `App`.
#[derive(crux_core::macros::Effect)]
pub struct Capabilities {
    pub http: Http<Event>,
    pub key_value: KeyValue<Event>,
    pub render: Render<Event>,
}

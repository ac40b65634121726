//! # routekit client
//!
//! Calls the routes of a routekit [`RouteTable`](routekit_core::RouteTable)
//! over HTTP. Inputs are encoded with the inverse of the server's extraction
//! rule, so a value that validates against a route's input schema arrives at
//! the handler unchanged.
//!
//! ```rust,ignore
//! use routekit_client::{Client, ClientOptions};
//!
//! let client = Client::new(api::table(), ClientOptions::new().base_url("http://localhost:3000"))?;
//!
//! let user = client.call_endpoint::<api::GetUser>(&GetUserInput::id("42")).await?;
//! let created = client.post("/users", Some(json!({"name": "Ada", "email": "ada@example.com"}))).await?;
//! ```

mod client;
mod encode;
mod error;
mod options;

pub use client::Client;
pub use encode::{encode_request, substitute_params, EncodedRequest};
pub use error::{ClientError, Result};
pub use options::{ClientOptions, ErrorHook, HeaderProvider, DEFAULT_BASE_URL};

//! # Client
//!
//! The [`Gateway`] and its administrative sub-gateway.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use cluster_gateway::{Gateway, Requests};
//!
//! let gateway = Gateway::builder().transport(my_transport).build()?;
//!
//! // Future style
//! let request = Requests::search_request(["twitter"]).size(20).build()?;
//! let response = gateway.search(request).get()?;
//!
//! // Listener style
//! let request = Requests::count_request(["twitter"]).build()?;
//! gateway.count_with(request, |outcome| match outcome {
//!     Ok(count) => println!("{} documents", count.count),
//!     Err(e) => eprintln!("count failed: {e}"),
//! });
//! ```

pub mod admin;
pub mod gateway;

pub use admin::AdminGateway;
pub use gateway::{Gateway, GatewayBuilder};

//! # Router Module
//!
//! Per-method route tables mapping path keys to handler descriptors.
//!
//! ## Matching
//!
//! Given `(method, path)`:
//!
//! 1. A key equal to the path wins outright, whatever its registration order.
//! 2. Otherwise each delimited key is tried as a regular expression in
//!    registration order; the first match wins and its captures are kept.
//! 3. A method without a bucket is *not recognized* (501), which is distinct
//!    from *not found* (404).
//! 4. HEAD and OPTIONS fall back to a no-op beneath user routes.
//!
//! ## Example
//!
//! ```rust
//! use http::Method;
//! use pactrouter::router::{MatchKind, MethodFilter, RouteLookup, RouteTable};
//!
//! let mut table = RouteTable::new();
//! table.add(Method::GET, "/one", "literal").unwrap();
//! table.add(MethodFilter::All, r"/^\/o.*$/", "pattern").unwrap();
//!
//! match table.lookup(&Method::GET, "/one") {
//!     RouteLookup::Matched(m) => {
//!         assert_eq!(*m.handler, "literal");
//!         assert_eq!(m.kind, MatchKind::Literal);
//!     }
//!     _ => unreachable!(),
//! }
//! ```

mod pattern;
mod table;

pub use pattern::{CaptureVec, RoutePattern, MAX_INLINE_CAPTURES};
pub use table::{MatchKind, MethodFilter, RouteLookup, RouteMatch, RouteTable, SUPPORTED_METHODS};

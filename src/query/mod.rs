//! Client-side query cache: keys, policies, the engine and observers

mod client;
pub mod key;
mod observer;
pub mod policy;
pub mod retry;

pub use client::{ClientOptions, QueryClient, QueryState, QueryStatus, Subscription};
pub use key::{keys, QueryKey};
pub use observer::{ObserverOptions, QueryObserver, QueryRequest};
pub use policy::{CachePolicy, Category};
pub use retry::RetryPolicy;

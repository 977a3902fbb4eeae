//! `screensage-providers` — vendor implementations of the recognition and
//! generation capabilities, plus the bearer-token cache they share.
//!
//! Providers are selected once at construction time and injected into the
//! pipeline; nothing here is swapped at runtime.

pub mod baidu;
pub mod deepseek;
pub mod mock;
pub mod token;

pub use baidu::{BaiduOcrProvider, BaiduTokenExchanger};
pub use deepseek::DeepSeekProvider;
pub use mock::{MockGenerator, MockRecognizer};
pub use token::TokenCache;

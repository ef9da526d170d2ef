//! Carrier-agnostic call dialing: one `ProviderDriver` trait with three
//! variants (Hosted, TokenExchange, Generic), selected and constructed by
//! `factory::build_driver` from a vault-encrypted `ProviderConfig`.

pub mod driver;
pub mod error;
pub mod factory;
pub mod generic;
pub mod hosted;
pub mod retry;
pub mod token_exchange;
pub mod types;

pub use driver::ProviderDriver;
pub use error::{ProviderError, Result};
pub use factory::{build_driver, FactoryConfig};
pub use generic::{GenericCredentials, GenericDriver};
pub use hosted::{HostedCredentials, HostedDriver};
pub use retry::initiate_call_with_retry;
pub use token_exchange::{TokenExchangeCredentials, TokenExchangeDriver};
pub use types::{normalize_digits, AnsweredBy, InitiateCallResult, StatusResult};

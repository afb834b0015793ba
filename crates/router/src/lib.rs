pub mod provider;
pub mod response;

pub use provider::anthropic::AnthropicProvider;
pub use provider::{CompletionRequest, HostedTool, Message, Provider, ProviderError};
pub use response::{ProviderResponse, Segment};

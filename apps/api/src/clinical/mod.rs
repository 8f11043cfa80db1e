pub mod differential;
pub mod handlers;
pub mod live;
pub mod pipeline;
pub mod prompts;
pub mod soap_parser;

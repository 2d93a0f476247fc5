use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("shape error: {0}")]
    Type(#[from] transponder_types::TypeError),

    #[error("driver error: {0}")]
    Driver(#[from] transponder_driver::DriverError),

    #[error("dispatch error: {0}")]
    Dispatch(#[from] transponder_dispatch::DispatchError),

    #[error("describe error: {0}")]
    Describe(#[from] transponder_describe::DescribeError),

    #[error("proxy error: {0}")]
    Proxy(#[from] transponder_proxy::ProxyError),
}

pub type SdkResult<T> = Result<T, SdkError>;

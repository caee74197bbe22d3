pub mod error;
pub mod request;
pub mod response;

pub use error::{
    AttemptContext, BoxError, ClassifiedError, ErrorClassifier, ErrorKind, ErrorMetadata,
    Failure, GatewayError, QueryResult, Result,
};
pub use request::{CacheKey, Request, TEMPERATURE_RANGE, canonical_json};
pub use response::{Response, ResponseMetadata};

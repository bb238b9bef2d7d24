//! Registry API Messages
//!
//! Hand-written prost messages matching `proto/registry.proto`. No transport
//! is bundled; any gRPC or HTTP layer can carry these as-is.

/// Proto source of the registry API
pub const REGISTRY_PROTO: &str = include_str!("../proto/registry.proto");

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetSchemaRequest {
    #[prost(int64, tag = "1")]
    pub id: i64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetSchemaResponse {
    #[prost(bool, tag = "1")]
    pub exists: bool,
    /// Empty when `exists` is false
    #[prost(bytes = "vec", tag = "2")]
    pub schema: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RegisterSchemaRequest {
    #[prost(string, tag = "1")]
    pub topic: String,
    #[prost(bytes = "vec", tag = "2")]
    pub schema: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RegisterSchemaResponse {
    #[prost(oneof = "register_schema_response::Response", tags = "1, 2")]
    pub response: Option<register_schema_response::Response>,
}

pub mod register_schema_response {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Response {
        #[prost(message, tag = "1")]
        ResponseSuccess(super::RegisterSchemaSuccess),
        #[prost(message, tag = "2")]
        ResponseError(super::RegisterSchemaError),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RegisterSchemaSuccess {
    #[prost(int64, tag = "1")]
    pub id: i64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RegisterSchemaError {
    #[prost(string, repeated, tag = "1")]
    pub errors: Vec<String>,
}

//! Registry Service
//!
//! Maps API requests onto a [`SchemaStorage`] backend. The service never
//! re-derives schemas: it returns stored bytes verbatim and passes
//! registrations straight through. Storage errors propagate unchanged and no
//! response is built for them.

use tracing::debug;

use crate::api::register_schema_response::Response;
use crate::api::{
    GetSchemaRequest, GetSchemaResponse, RegisterSchemaError, RegisterSchemaRequest,
    RegisterSchemaResponse, RegisterSchemaSuccess,
};
use crate::error::Result;
use crate::storage::{Registration, SchemaStorage};

pub struct RegistryService<S: SchemaStorage> {
    storage: S,
}

impl<S: SchemaStorage> RegistryService<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Fetch a schema by id. A missing id is a normal response, not an error.
    pub async fn get_schema(&self, request: GetSchemaRequest) -> Result<GetSchemaResponse> {
        debug!("GetSchema id={}", request.id);

        let response = match self.storage.get_schema(request.id).await? {
            Some(schema) => GetSchemaResponse {
                exists: true,
                schema,
            },
            None => GetSchemaResponse::default(),
        };
        Ok(response)
    }

    /// Register a schema under a topic.
    pub async fn register_schema(&self, request: RegisterSchemaRequest) -> Result<RegisterSchemaResponse> {
        debug!(
            "RegisterSchema topic={} bytes={}",
            request.topic,
            request.schema.len()
        );

        let registration = self
            .storage
            .register_schema(&request.topic, &request.schema)
            .await?;

        let response = match registration {
            Registration::Accepted { id } => Response::ResponseSuccess(RegisterSchemaSuccess { id }),
            Registration::Rejected { errors } => Response::ResponseError(RegisterSchemaError { errors }),
        };
        Ok(RegisterSchemaResponse {
            response: Some(response),
        })
    }
}

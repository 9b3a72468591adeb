pub mod parameter;
pub mod request;
pub mod response;

pub use parameter::{
    build_parameter_schemas, resolve_parameters, ParameterLocation, ParameterSchemas,
};
pub use request::{build_request_gate, build_request_schema, GateOutcome, RequestGate, RequestParts};
pub use response::{
    build_response_gate, build_response_schema, ResponseGate, ResponseParts, StatusKey,
};

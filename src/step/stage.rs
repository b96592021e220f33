//! Stage names and the fixed execution orders.

use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// One named unit of work in the pipeline.
///
/// Twelve processing stages, the exception handler, and four response
/// stages. The orders below are fixed; a pipeline only chooses which stages
/// are present, never their sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Extract basic request info to minimize dependency on the transport.
    FillRequestInfo,
    /// Check the requester is authenticated, e.g. the auth token is valid.
    CheckAuthenticated,
    /// Check request headers are acceptable.
    CheckHeaders,
    /// Access check before the body has been read.
    CheckAccessPreRead,
    /// Pull the raw body out of the transport layer.
    ExtractBody,
    /// Optional decryption / signature check of the request body.
    Decrypt,
    /// Parse the request body into `input_raw`.
    Deserialize,
    /// Validate `input_raw`.
    ValidateInput,
    /// Access check after the body has been read.
    CheckAccessPostRead,
    /// Map `input_raw` to the business representation.
    MapInput,
    /// The endpoint's domain logic.
    Business,
    /// Map `output_business` to the raw representation.
    MapOutput,
    /// Recovery hook consulted when a processing stage fails.
    ExceptionHandler,
    /// Serialize `output_raw` into the response body.
    Serialize,
    /// Optional encryption / signing of the response body.
    Encrypt,
    /// Prepare additional response headers.
    ResponseHeaders,
    /// Build the final response object.
    CreateResponse,
}

impl Stage {
    /// Processing phase, in execution order.
    pub const PROCESS_ORDER: [Stage; 12] = [
        Stage::FillRequestInfo,
        Stage::CheckAuthenticated,
        Stage::CheckHeaders,
        Stage::CheckAccessPreRead,
        Stage::ExtractBody,
        Stage::Decrypt,
        Stage::Deserialize,
        Stage::ValidateInput,
        Stage::CheckAccessPostRead,
        Stage::MapInput,
        Stage::Business,
        Stage::MapOutput,
    ];

    /// Response phase, in execution order.
    pub const RESPONSE_ORDER: [Stage; 4] = [
        Stage::Serialize,
        Stage::Encrypt,
        Stage::ResponseHeaders,
        Stage::CreateResponse,
    ];

    /// Every stage a declaration may target.
    pub const ALL: [Stage; 17] = [
        Stage::FillRequestInfo,
        Stage::CheckAuthenticated,
        Stage::CheckHeaders,
        Stage::CheckAccessPreRead,
        Stage::ExtractBody,
        Stage::Decrypt,
        Stage::Deserialize,
        Stage::ValidateInput,
        Stage::CheckAccessPostRead,
        Stage::MapInput,
        Stage::Business,
        Stage::MapOutput,
        Stage::ExceptionHandler,
        Stage::Serialize,
        Stage::Encrypt,
        Stage::ResponseHeaders,
        Stage::CreateResponse,
    ];

    /// Snake-case name, as used in suffix-keyed declarations and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::FillRequestInfo => "fill_request_info",
            Stage::CheckAuthenticated => "check_authenticated",
            Stage::CheckHeaders => "check_headers",
            Stage::CheckAccessPreRead => "check_access_pre_read",
            Stage::ExtractBody => "extract_body",
            Stage::Decrypt => "decrypt",
            Stage::Deserialize => "deserialize",
            Stage::ValidateInput => "validate_input",
            Stage::CheckAccessPostRead => "check_access_post_read",
            Stage::MapInput => "map_input",
            Stage::Business => "business",
            Stage::MapOutput => "map_output",
            Stage::ExceptionHandler => "exception_handler",
            Stage::Serialize => "serialize",
            Stage::Encrypt => "encrypt",
            Stage::ResponseHeaders => "response_headers",
            Stage::CreateResponse => "create_response",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Stage::ALL
            .iter()
            .copied()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| ConfigError::UnknownStage(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orders_are_disjoint_and_complete() {
        for stage in Stage::PROCESS_ORDER {
            assert!(!Stage::RESPONSE_ORDER.contains(&stage));
        }
        assert_eq!(
            Stage::ALL.len(),
            Stage::PROCESS_ORDER.len() + Stage::RESPONSE_ORDER.len() + 1
        );
        assert!(Stage::ALL.contains(&Stage::ExceptionHandler));
    }

    #[test]
    fn test_round_trip_names() {
        for stage in Stage::ALL {
            assert_eq!(stage.as_str().parse::<Stage>().unwrap(), stage);
        }
    }

    #[test]
    fn test_unknown_stage_name() {
        let err = "frobnicate".parse::<Stage>().unwrap_err();
        assert_eq!(err, ConfigError::UnknownStage("frobnicate".to_string()));
    }
}

//! Response envelopes for API handlers.
//!
//! Workflow actions answer with [`mosaico_pipeline::Outcome`]
//! (`{success, data, warnings}`); plain reads use [`DataResponse`].

use serde::Serialize;

/// Standard `{ "data": T }` response envelope.
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}

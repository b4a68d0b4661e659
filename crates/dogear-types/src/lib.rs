/// Shared types for the Dog-Eared backend.
///
/// `api` holds the JSON request/response bodies and session claims,
/// `models` the small domain vocabularies (intake status, owned format),
/// `time` the UTC normalization used at every storage and wire boundary.
pub mod api;
pub mod models;
pub mod time;

// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Endpoints used to obtain an identity in the first place.

pub mod auth;

//! Request and Response models for the offline sidecar API
//!
//! This module defines the DTOs (Data Transfer Objects) used for
//! serializing/deserializing HTTP request and response bodies.

pub mod requests;
pub mod responses;

pub use requests::{CacheRequest, ConnectivityRequest, DoctorUnavailableRequest, SmsRequest};
pub use responses::{
    AlternativesResponse, CacheResponse, CachedDataResponse, HealthResponse, SmsResponse,
    StatsResponse, StatusResponse,
};

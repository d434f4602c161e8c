//! # Vaultlink Gateway
//!
//! HTTP gateway for encrypted file sharing.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     ┌─────────────────┐     ┌──────────────────┐
//! │  SDK / app   │────▶│ Vaultlink       │────▶│  Object store    │
//! │ (encrypts)   │     │ Gateway         │     │  (fs / memory)   │
//! └──────────────┘     └─────────────────┘     └──────────────────┘
//!                             │
//!        ┌────────────────────┼────────────────────┐
//!        ▼                    ▼                    ▼
//!  ┌───────────┐      ┌──────────────┐     ┌──────────────┐
//!  │ JWT auth  │      │ Link issuer  │     │ Link resolver│
//!  │ (owners)  │      │ (policies)   │     │ (public)     │
//!  └───────────┘      └──────────────┘     └──────────────┘
//! ```
//!
//! Owner routes under `/api/keys`, `/api/files` and `/api/links` require a
//! bearer token. Share routes under `/api/share/{token}` are public. The
//! gateway only ever sees ciphertext and wrapped keys for E2EE uploads.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;

pub use config::GatewayConfig;
pub use error::{ApiError, ErrorCode};
pub use server::{run_server, run_server_with_shutdown, serve};
pub use state::AppState;

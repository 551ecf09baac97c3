//! # Pandora Integration Module
//!
//! This module is the client for Pandora's private web API. It covers the
//! authenticated REST transport, the classification of the heterogeneous JSON
//! bodies the API returns, the playback session state machine, the audio
//! pipeline and the catalog lookups used by the command-line front end.
//!
//! ## Architecture
//!
//! ```text
//! CLI Layer (commands, now-playing output)
//!          ↓
//! SessionController ── Catalog
//!     ├── ResponseClassifier (RestResponse)
//!     ├── AudioPipeline ──→ PlaybackSink
//!     └── RetryPolicy (wraps any fetch)
//!          ↓
//! RestTransport (reqwest, cookie jar, CSRF)
//!          ↓
//! Pandora web API
//! ```
//!
//! ## Core Modules
//!
//! - [`transport`] - POST wrapper attaching the CSRF token, auth token, cookie
//!   jar and a stable user agent to every call. The CSRF token comes from a
//!   single `HEAD` request against the web origin and must be obtained before
//!   anything else is sent.
//! - [`classify`] - Structural predicates over raw JSON and the
//!   [`classify::RestResponse`] tagged union decoded from the one that matched.
//! - [`session`] - [`session::SessionController`], the owner of the cached
//!   [`session::Session`]. It serializes `source`/`peek`/`skip`, gates rating
//!   actions on the origin type and answers derived queries without I/O.
//! - [`audio`] - Fetches track audio, reverses the XOR obfuscation and hands
//!   the bytes to a [`audio::PlaybackSink`].
//! - [`retry`] - Fixed-interval, bounded retry for transient failures.
//! - [`catalog`] - Stations, subscription info, collection endpoints and
//!   GraphQL lookups.
//! - [`device`] - The `deviceProperties` record sent with playback calls.
//!
//! ## API Coverage
//!
//! - `POST /api/v1/station/getStations`
//! - `POST /api/v1/billing/infoV2`
//! - `POST /api/v1/playback/source`, `/api/v1/playback/peek`
//! - `POST /api/v1/action/skip`, `/api/v1/action/thumbUp`, `/api/v1/action/removeThumb`
//! - `POST /api/v1/event/started`
//! - `POST /api/v1/graphql/graphql`
//! - `POST /api/v1/mip/getArtistPageConcerts`
//! - `POST /api/v6/collections/getSortedPlaylists`, `/api/v6/collections/getItems`
//!
//! ## Error Types
//!
//! Every function returns [`crate::Res`]. Shape mismatches surface as
//! [`crate::PandoraError::ApiShape`] and are never retried; connection
//! failures surface as [`crate::PandoraError::Transient`].

pub mod audio;
pub mod catalog;
pub mod classify;
pub mod device;
pub mod retry;
pub mod session;
pub mod transport;

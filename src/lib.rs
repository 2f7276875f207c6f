/*!
# Flashflashy

A flashcard study backend: users register, build decks of front/back cards,
share decks through public links, and rate cards with a spaced-repetition
scheduler that decides when each card comes up next.

## Architecture

The application follows a client-server architecture:

### Frontend Layer
A single-page client (not part of this crate) that consumes the JSON API.

### Backend Layer
- **Technologies**: Rust, axum
- **Core Components**:
  - Review Scheduler - pure SM-2 style interval/ease-factor update rule
  - Document Store - JSON-file collections for users, decks, and cards
  - Auth - Argon2id password hashing and cookie sessions
  - Access Control - per-request caller resolution and ownership checks
  - Admin - role-based user management

### Data Persistence Layer
One JSON file per collection under the data directory, loaded at startup
and written back on every mutation.

## Modules

- **scheduler**: the spaced-repetition update rule (the interesting part)
- **store**: document persistence and sessions
- **login**: accounts, credentials, sessions, auth middleware
- **decks**: deck CRUD and share links
- **cards**: card CRUD, the rating endpoint, due-card queries
- **shared**: public shared-deck access and copying
- **admin**: admin-only user management
- **app**: routing and the server loop
- **config**: environment configuration
- **error**: API error type and HTTP status mapping

## REST API Endpoints

- `POST /api/users/register`, `POST /api/users/login`, `POST /api/users/logout`,
  `POST /api/users/check-username`
- `GET|POST /api/decks`, `GET|PATCH|DELETE /api/decks/{deckId}`
- `POST|DELETE /api/decks/{deckId}/share`, `GET /api/decks/{deckId}/due`
- `POST /api/cards`, `PATCH|DELETE /api/cards/{cardId}`,
  `POST /api/cards/{cardId}/review`
- `GET /api/shared/{shareId}`, `POST /api/shared/{shareId}/copy`
- `GET /api/admin/users`, `DELETE /api/admin/users/{userId}`,
  `PATCH /api/admin/users/{userId}/username`,
  `PATCH /api/admin/users/{userId}/admin`
*/

pub mod admin;
pub mod app;
pub mod cards;
pub mod config;
pub mod decks;
pub mod error;
pub mod login;
pub mod scheduler;
pub mod shared;
pub mod store;

pub use app::{AppState, router, run};
pub use config::Config;
pub use error::ApiError;
pub use scheduler::{Rating, ReviewState, schedule};
pub use store::Store;

//! # dbpulse
//!
//! Watches the `items` table of a SQLite database and pushes its full
//! contents to every connected WebSocket client whenever it changes, whether
//! the change came through `/add` and `/update` or from another process.
//!
//! | Route | Purpose |
//! |-------|---------|
//! | `GET /` | status page showing the latest notification |
//! | `GET /ws` | WebSocket feed of `DB Changed: [...]` messages |
//! | `GET /add/{name}/{value}` | insert a record and notify |
//! | `GET /update/{id}/{value}` | update a record and notify |
//! | `GET /health` | store reachability and client count |

pub mod config;
pub mod logging;
pub mod routes;
pub mod state;

pub use config::{Config, ConfigError};
pub use logging::init_logging;
pub use routes::build_app;
pub use state::AppState;

//! Eatelligent application core
//!
//! Meal logging with duplicate suppression, nutrient aggregation against daily
//! goals, OpenAI-backed photo analysis and a nutrition-coach chat. The UI layer
//! drives everything through [`app::AppController`] and observes
//! [`app::AppState`].
//!
//! ```rust,no_run
//! use eatelligent::{app::AppController, config};
//!
//! fn main() -> anyhow::Result<()> {
//!     // before the runtime exists: this touches the process environment
//!     config::load_environment();
//!     eatelligent::logging::init_tracing()?;
//!
//!     let runtime = tokio::runtime::Runtime::new()?;
//!     runtime.block_on(async {
//!         let app = AppController::from_config(&config::AppConfig::from_env()?)?;
//!         app.load().await;
//!         let chat = app.open_chat_center();
//!         app.send_chat_message(&chat, "Was soll ich heute noch essen?").await;
//!         Ok::<_, anyhow::Error>(())
//!     })
//! }
//! ```

pub mod ai;
pub mod app;
pub mod chat;
pub mod config;
pub mod error;
pub mod logging;
pub mod meals;
pub mod nutrition;
pub mod storage;
pub mod types;

pub use app::{AppController, AppState};
pub use error::{AppError, AppResult, ErrorKind};

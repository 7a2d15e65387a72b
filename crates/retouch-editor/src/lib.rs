pub mod config;
pub mod error;
pub mod export;
pub mod session;

pub use config::{EditorConfig, ExportFormat, ExportSettings, ResourceSettings};
pub use error::{EditorError, ExportError};
pub use export::{export, flatten};
pub use session::{EditorSession, RenderTicket, RenderedPreview};

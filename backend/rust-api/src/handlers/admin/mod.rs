mod administrators;
mod content;
mod dashboard;
mod practicants;
mod session_timer;

pub use administrators::*;
pub use content::*;
pub use dashboard::*;
pub use practicants::*;
pub use session_timer::*;

use serde::Deserialize;

/// `?search=&reveal_passwords=` on the CRUD panels
#[derive(Debug, Default, Deserialize)]
pub struct PanelQuery {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub reveal_passwords: bool,
}

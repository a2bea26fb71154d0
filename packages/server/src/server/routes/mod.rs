// HTTP routes
pub mod health;
pub mod preferences;
pub mod prescreening;
pub mod previews;
pub mod registration;
pub mod stream;
pub mod voice;

pub use health::*;
pub use preferences::*;
pub use prescreening::*;
pub use previews::*;
pub use registration::*;
pub use stream::*;
pub use voice::*;

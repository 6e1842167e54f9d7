/// Embedded Lua scripting for luminos
///
/// The editor's visuals come from a Lua program. The [`ScriptController`]
/// owns the one live [`ScriptEnvironment`], publishes input into it through
/// the [`GlobalStateTable`], calls its entry points every frame and replaces
/// it wholesale on reload.
pub mod bridge;
pub mod environment;
pub mod error;
pub mod lifecycle;
pub mod network;
pub mod reload;
pub mod watcher;

// Re-export commonly used types
pub use bridge::{GlobalStateTable, PointerState};
pub use environment::{entry, ScriptEnvironment};
pub use error::{ScriptBindingError, ScriptLoadError, ScriptLocation, ScriptRuntimeError, StartError};
pub use lifecycle::{LifecycleState, ScriptController};
pub use network::{NetworkBinding, Offline};
pub use reload::{setup_reload_signal, take_reload_signal, ReloadSignal};
pub use watcher::ScriptWatcher;

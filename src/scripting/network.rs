use mlua::Lua;
use tracing::debug;

/// Network collaborator that receives each new script environment.
///
/// `bind` runs after the environment is created and before it is marked
/// running, so the collaborator can register callbacks against the fresh
/// Lua state. `unbind` runs before the environment is dropped; after it
/// returns the collaborator must not touch the old state again.
pub trait NetworkBinding {
    fn bind(&mut self, lua: &Lua) -> mlua::Result<()>;

    fn unbind(&mut self) {}
}

/// Network layer for sessions without a connection.
///
/// Exposes `net.online = false` so scripts can branch on connectivity.
#[derive(Debug, Default)]
pub struct Offline;

impl NetworkBinding for Offline {
    fn bind(&mut self, lua: &Lua) -> mlua::Result<()> {
        let net = lua.create_table()?;
        net.set("online", false)?;
        lua.globals().set("net", net)?;
        debug!(target: "scripting", "Bound offline network table");
        Ok(())
    }
}

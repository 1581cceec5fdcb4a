//! Cooperative multi-script scheduler.
//!
//! Scripts advance in stable insertion order, one at a time, each running
//! a whole instruction block before the next gets a turn. A script failure
//! deactivates that script only; the scheduler itself never aborts.

use std::path::Path;

use crate::engine::Engine;
use crate::script::{Script, ScriptTime};

pub struct Scheduler {
    scripts: Vec<Script>,
    pub engine: Engine,
}

impl Scheduler {
    pub fn new(engine: Engine) -> Self {
        Self {
            scripts: Vec::new(),
            engine,
        }
    }

    /// Append a script. It becomes eligible on the next tick whose time
    /// reaches its activation time.
    pub fn add(&mut self, script: Script) {
        self.scripts.push(script);
    }

    /// Load a script file and append it. On failure nothing is added and
    /// the error is returned; already-loaded scripts are unaffected.
    pub fn load(&mut self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let script = Script::load(path)?;
        self.add(script);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Script> {
        self.scripts.iter().find(|s| s.name() == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Script> {
        self.scripts.iter_mut().find(|s| s.name() == name)
    }

    pub fn scripts(&self) -> impl Iterator<Item = &Script> {
        self.scripts.iter()
    }

    /// Advance every live script whose activation time has arrived.
    ///
    /// Scripts that died since the previous tick are reaped first, so a
    /// deactivation mid-block never disturbs the iteration: the script
    /// simply stops being advanced and is removed on the next pass.
    pub fn tick(&mut self, now: ScriptTime) {
        self.reap();

        for script in &mut self.scripts {
            if !script.is_active() || script.activation_time() > now {
                continue;
            }

            if let Err(e) = self.engine.run_block(script) {
                log::error!("deactivating script '{}': {e}", script.name());
                script.deactivate();
            }
        }
    }

    fn reap(&mut self) {
        let before = self.scripts.len();
        self.scripts.retain(Script::is_active);

        let reaped = before - self.scripts.len();
        if reaped != 0 {
            log::info!("unloaded {reaped} inactive script(s)");
        }
    }

    /// Rewind every script to its freshly-loaded state (host restart).
    pub fn reset_all(&mut self) {
        for script in &mut self.scripts {
            script.reset();
        }
    }

    /// Drop every script, releasing their instruction buffers.
    pub fn unload_all(&mut self) {
        log::info!("unloading all {} script(s)", self.scripts.len());
        self.scripts.clear();
    }
}

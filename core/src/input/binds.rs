//! Per-port keybind and remap tables
//!
//! Both are written in the config file with the names from
//! [`retrolink_shared::BIND_NAMES`] and resolved to numeric ids once at
//! startup.

use hashbrown::HashMap;
use retrolink_shared::{FIRST_CUSTOM_BIND, MAX_PORTS, bind_id_from_name};

use crate::error::ConfigError;

/// Host key or button bound to each core-visible id of one port.
///
/// The values are opaque to the pipeline; the input driver interprets them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortBinds {
    by_id: HashMap<u32, String>,
}

impl PortBinds {
    /// Resolve a `name -> host key` table.
    pub fn from_names(table: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let mut by_id = HashMap::with_capacity(table.len());
        for (name, key) in table {
            let id = bind_id_from_name(name).ok_or_else(|| ConfigError::UnknownBind(name.clone()))?;
            by_id.insert(id, key.clone());
        }
        Ok(Self { by_id })
    }

    pub fn get(&self, id: u32) -> Option<&str> {
        self.by_id.get(&id).map(String::as_str)
    }

    pub fn insert(&mut self, id: u32, key: impl Into<String>) {
        self.by_id.insert(id, key.into());
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

/// Substitution of joypad ids per port, identity by default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemapTable {
    ids: [[u32; FIRST_CUSTOM_BIND as usize]; MAX_PORTS],
}

impl Default for RemapTable {
    fn default() -> Self {
        let mut row = [0u32; FIRST_CUSTOM_BIND as usize];
        for (i, id) in row.iter_mut().enumerate() {
            *id = i as u32;
        }
        Self {
            ids: [row; MAX_PORTS],
        }
    }
}

impl RemapTable {
    /// Build from per-port `core id name -> physical id name` tables.
    pub fn from_names(ports: &[HashMap<String, String>]) -> Result<Self, ConfigError> {
        let mut table = Self::default();
        for (port, entries) in ports.iter().enumerate().take(MAX_PORTS) {
            for (from, to) in entries {
                let from_id = resolve_button(from)?;
                let to_id = resolve_button(to)?;
                table.set(port as u32, from_id, to_id);
            }
        }
        Ok(table)
    }

    /// Id to read instead of `id`; ids outside the remappable range pass through.
    pub fn get(&self, port: u32, id: u32) -> u32 {
        if id >= FIRST_CUSTOM_BIND {
            return id;
        }
        self.ids
            .get(port as usize)
            .map(|row| row[id as usize])
            .unwrap_or(id)
    }

    pub fn set(&mut self, port: u32, id: u32, target: u32) {
        if id < FIRST_CUSTOM_BIND
            && let Some(row) = self.ids.get_mut(port as usize)
        {
            row[id as usize] = target;
        }
    }
}

fn resolve_button(name: &str) -> Result<u32, ConfigError> {
    match bind_id_from_name(name) {
        Some(id) if id < FIRST_CUSTOM_BIND => Ok(id),
        _ => Err(ConfigError::UnknownBind(name.to_string())),
    }
}

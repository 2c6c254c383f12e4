use parking_lot::Mutex;
use starsdb_models::{Role, RoleKey, RoleType};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::persistence::{load_list, save_list};

/// Interning table for credits.
///
/// Each (type, show, talent) triple maps to exactly one [`Role`] with a
/// random 64-bit id. Lookups by triple and by id go through one lock, so
/// both indexes always agree. Ids that were removed are never handed out
/// again.
#[derive(Default)]
pub struct RoleRegistry {
    index: Mutex<RoleIndex>,
}

#[derive(Default)]
struct RoleIndex {
    by_key: HashMap<RoleKey, i64>,
    by_id: HashMap<i64, Role>,
    retired: HashSet<i64>,
}

impl RoleIndex {
    fn insert(&mut self, role: Role) {
        self.by_key.insert(role.key, role.id);
        self.by_id.insert(role.id, role);
    }

    /// First id at or after `start` that is neither live nor retired.
    fn free_id(&self, start: i64) -> i64 {
        let mut id = start;
        while self.by_id.contains_key(&id) || self.retired.contains(&id) {
            id = id.wrapping_add(1);
        }
        id
    }
}

impl RoleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_roles(roles: Vec<Role>) -> Self {
        let registry = Self::new();
        registry.replace_all(roles);
        registry
    }

    /// The role for this triple, created on first sight.
    pub fn get_or_create(&self, role_type: RoleType, show: i64, talent: i64) -> Role {
        let key = RoleKey::new(role_type, show, talent);
        let mut index = self.index.lock();

        if let Some(role) = index.by_key.get(&key).and_then(|id| index.by_id.get(id)) {
            return role.clone();
        }

        let id = index.free_id(rand::random::<i64>());
        let role = Role::new(key, id);
        index.insert(role.clone());
        debug!(id, ?role_type, show, talent, "created role");
        role
    }

    /// Set the character/credit name of a role. Returns false for unknown ids.
    pub fn set_name(&self, id: i64, name: impl Into<String>) -> bool {
        match self.index.lock().by_id.get_mut(&id) {
            Some(role) => {
                role.name = Some(name.into());
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: i64) -> Option<Role> {
        self.index.lock().by_id.get(&id).cloned()
    }

    pub fn find(&self, role_type: RoleType, show: i64, talent: i64) -> Option<Role> {
        let index = self.index.lock();
        index
            .by_key
            .get(&RoleKey::new(role_type, show, talent))
            .and_then(|id| index.by_id.get(id))
            .cloned()
    }

    pub fn contains(&self, id: i64) -> bool {
        self.index.lock().by_id.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.index.lock().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Evict a role from both indexes. Its id is retired.
    pub fn remove(&self, role: &Role) -> bool {
        let mut index = self.index.lock();
        let Some(stored) = index.by_id.remove(&role.id) else {
            return false;
        };
        if index.by_key.get(&stored.key) == Some(&stored.id) {
            index.by_key.remove(&stored.key);
        }
        index.retired.insert(stored.id);
        true
    }

    /// Snapshot of every role, ordered by id.
    pub fn full_manifest(&self) -> Vec<Role> {
        let mut roles: Vec<Role> = self.index.lock().by_id.values().cloned().collect();
        roles.sort_by_key(|role| role.id);
        roles
    }

    pub async fn save(&self, path: &Path) -> Result<(), StoreError> {
        let roles = self.full_manifest();
        save_list(path, &roles).await?;
        info!("Saved {} roles to {:?}", roles.len(), path);
        Ok(())
    }

    /// Replace the contents with the roles stored at `path`.
    pub async fn load(&self, path: &Path) -> Result<(), StoreError> {
        let roles: Vec<Role> = load_list(path).await?;
        let count = roles.len();
        self.replace_all(roles);
        info!("Loaded {} roles from {:?}", count, path);
        Ok(())
    }

    fn replace_all(&self, roles: Vec<Role>) {
        let mut index = self.index.lock();
        *index = RoleIndex::default();
        for role in roles {
            if let Some(existing) = index.by_key.get(&role.key) {
                warn!(
                    "Duplicate role for {:?}: keeping {}, dropping {}",
                    role.key, existing, role.id
                );
                continue;
            }
            if index.by_id.contains_key(&role.id) {
                warn!("Duplicate role id {}, dropping {:?}", role.id, role.key);
                continue;
            }
            index.insert(role);
        }
    }
}

use parking_lot::Mutex;
use starsdb_models::Mergeable;
use std::collections::HashMap;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Inserted,
    Merged,
}

/// Id-keyed entity map with merge-on-insert.
///
/// A merge runs entirely under the map lock, so concurrent merges of the same
/// id are serialized and never lose fields.
pub struct EntityCollection<T> {
    items: Mutex<HashMap<i64, T>>,
}

impl<T> Default for EntityCollection<T> {
    fn default() -> Self {
        Self {
            items: Mutex::new(HashMap::new()),
        }
    }
}

impl<T: Mergeable + Clone> EntityCollection<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_items(items: Vec<T>) -> Self {
        let collection = Self::new();
        collection.replace_all(items);
        collection
    }

    pub fn merge(&self, incoming: T) -> MergeOutcome {
        let mut items = self.items.lock();
        match items.get_mut(&incoming.id()) {
            Some(existing) => {
                existing.merge_from(&incoming);
                MergeOutcome::Merged
            }
            None => {
                trace!(id = incoming.id(), "inserted");
                items.insert(incoming.id(), incoming);
                MergeOutcome::Inserted
            }
        }
    }

    pub fn get(&self, id: i64) -> Option<T> {
        self.items.lock().get(&id).cloned()
    }

    pub fn contains(&self, id: i64) -> bool {
        self.items.lock().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run `f` against the stored entity, if any, while holding the lock.
    pub fn update<R>(&self, id: i64, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        self.items.lock().get_mut(&id).map(f)
    }

    /// Point-in-time copy, ordered by id.
    pub fn snapshot(&self) -> Vec<T> {
        let mut items: Vec<T> = self.items.lock().values().cloned().collect();
        items.sort_by_key(|item| item.id());
        items
    }

    /// Replace everything. Duplicate ids in `items` are merged.
    pub fn replace_all(&self, items: Vec<T>) {
        let mut map: HashMap<i64, T> = HashMap::with_capacity(items.len());
        for item in items {
            match map.get_mut(&item.id()) {
                Some(existing) => existing.merge_from(&item),
                None => {
                    map.insert(item.id(), item);
                }
            }
        }
        *self.items.lock() = map;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use starsdb_models::{Person, Show, ShowType};
    use std::sync::Arc;

    fn show_with_genres(id: i64, genres: &[&str]) -> Show {
        let mut show = Show::new(id);
        show.genre = Some(genres.iter().map(|g| g.to_string()).collect());
        show
    }

    #[test]
    fn test_insert_then_merge() {
        let shows = EntityCollection::new();

        let mut first = Show::new(1);
        first.header.title = Some("Heat".to_string());
        assert_eq!(shows.merge(first.clone()), MergeOutcome::Inserted);
        assert_eq!(shows.get(1), Some(first));

        let mut second = Show::new(1);
        second.show_type = ShowType::Movie;
        assert_eq!(shows.merge(second), MergeOutcome::Merged);

        let stored = shows.get(1).unwrap();
        assert_eq!(stored.header.title.as_deref(), Some("Heat"));
        assert_eq!(stored.show_type, ShowType::Movie);
        assert_eq!(shows.len(), 1);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let shows = EntityCollection::new();
        let incoming = show_with_genres(7, &["Crime", "Drama"]);

        shows.merge(incoming.clone());
        let once = shows.get(7);
        shows.merge(incoming);
        assert_eq!(shows.get(7), once);
    }

    #[test]
    fn test_list_union() {
        let shows = EntityCollection::new();
        shows.merge(show_with_genres(3, &["a", "b"]));
        shows.merge(show_with_genres(3, &["b", "c"]));

        assert_eq!(
            shows.get(3).unwrap().genre,
            Some(vec!["a".to_string(), "b".to_string(), "c".to_string()])
        );
    }

    #[test]
    fn test_concurrent_merges_keep_every_field() {
        let people = Arc::new(EntityCollection::<Person>::new());

        let handles: Vec<_> = (0..4)
            .map(|n| {
                let people = people.clone();
                std::thread::spawn(move || {
                    let mut person = Person::new(9);
                    match n {
                        0 => person.name = Some("Al Pacino".to_string()),
                        1 => person.bio = Some("Actor".to_string()),
                        2 => person.height_cm = Some(170.0),
                        _ => person.is_dead = Some(false),
                    }
                    people.merge(person);
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let person = people.get(9).unwrap();
        assert!(person.name.is_some());
        assert!(person.bio.is_some());
        assert!(person.height_cm.is_some());
        assert!(person.is_dead.is_some());
    }

    #[test]
    fn test_update_and_snapshot_order() {
        let people = EntityCollection::from_items(vec![Person::new(3), Person::new(1)]);
        let updated = people.update(3, |p| {
            p.image_local_path = Some("/data/Images/3.jpg".to_string());
        });
        assert!(updated.is_some());
        assert!(people.update(2, |_| ()).is_none());

        let ids: Vec<i64> = people.snapshot().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![1, 3]);
        assert!(people.get(3).unwrap().image_local_path.is_some());
    }
}

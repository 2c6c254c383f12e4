use serde::Serialize;
use starsdb_models::{Mergeable, Person, Role, RoleType, Show, ShowHeader};
use std::path::{Path, PathBuf};
use tracing::{error, info};

use crate::collection::{EntityCollection, MergeOutcome};
use crate::error::StoreError;
use crate::persistence::{load_list, save_list};
use crate::role_registry::RoleRegistry;

/// File layout of a data directory.
#[derive(Debug, Clone)]
pub struct StorePaths {
    data_dir: PathBuf,
}

impl StorePaths {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn headers_file(&self) -> PathBuf {
        self.data_dir.join("AllShowHeaders.json")
    }

    pub fn shows_file(&self) -> PathBuf {
        self.data_dir.join("Shows.json")
    }

    pub fn people_file(&self) -> PathBuf {
        self.data_dir.join("People.json")
    }

    pub fn roles_file(&self) -> PathBuf {
        self.data_dir.join("Roles.json")
    }

    pub fn image_dir(&self) -> PathBuf {
        self.data_dir.join("Images")
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreCounts {
    pub headers: usize,
    pub shows: usize,
    pub people: usize,
    pub roles: usize,
}

/// Result of [`EntityStore::save_all`]. Each file is saved independently.
#[derive(Debug, Default)]
pub struct SaveReport {
    pub saved: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, StoreError)>,
}

impl SaveReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// In-memory database of everything crawled so far.
///
/// Parsers feed partial entities in through the `merge_*` methods; the
/// reporting side reads snapshots. Each collection has its own lock and no
/// operation spans more than one of them at a time.
pub struct EntityStore {
    paths: StorePaths,
    headers: EntityCollection<ShowHeader>,
    shows: EntityCollection<Show>,
    people: EntityCollection<Person>,
    roles: RoleRegistry,
}

impl EntityStore {
    /// Empty store rooted at `data_dir`. Nothing is read or created.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            paths: StorePaths::new(data_dir),
            headers: EntityCollection::new(),
            shows: EntityCollection::new(),
            people: EntityCollection::new(),
            roles: RoleRegistry::new(),
        }
    }

    /// Create the data and image directories and load whatever was saved there.
    pub async fn open(data_dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let store = Self::new(data_dir);
        for dir in [store.paths.data_dir().to_path_buf(), store.paths.image_dir()] {
            tokio::fs::create_dir_all(&dir)
                .await
                .map_err(|source| StoreError::CreateDir {
                    path: dir.clone(),
                    source,
                })?;
        }

        let start = std::time::Instant::now();
        store
            .headers
            .replace_all(load_list(&store.paths.headers_file()).await?);
        store
            .shows
            .replace_all(load_list(&store.paths.shows_file()).await?);
        store
            .people
            .replace_all(load_list(&store.paths.people_file()).await?);
        store.roles.load(&store.paths.roles_file()).await?;

        let counts = store.counts();
        info!(
            "Opened store at {:?}: {} headers, {} shows, {} people, {} roles in {:?}",
            store.paths.data_dir(),
            counts.headers,
            counts.shows,
            counts.people,
            counts.roles,
            start.elapsed()
        );
        Ok(store)
    }

    pub fn paths(&self) -> &StorePaths {
        &self.paths
    }

    /// Merge a listing entry, then mirror it into the show with the same id.
    pub fn merge_header(&self, header: ShowHeader) -> MergeOutcome {
        let mirrored = Show::from(header.clone());
        let outcome = self.headers.merge(header);
        self.shows.merge(mirrored);
        outcome
    }

    pub fn merge_show(&self, show: Show) -> MergeOutcome {
        self.shows.merge(show)
    }

    pub fn merge_person(&self, person: Person) -> MergeOutcome {
        self.people.merge(person)
    }

    pub fn role(&self, role_type: RoleType, show: i64, talent: i64) -> Role {
        self.roles.get_or_create(role_type, show, talent)
    }

    pub fn roles(&self) -> &RoleRegistry {
        &self.roles
    }

    pub fn show(&self, id: i64) -> Option<Show> {
        self.shows.get(id)
    }

    pub fn header(&self, id: i64) -> Option<ShowHeader> {
        self.headers.get(id)
    }

    pub fn person(&self, id: i64) -> Option<Person> {
        self.people.get(id)
    }

    pub fn role_by_id(&self, id: i64) -> Option<Role> {
        self.roles.get(id)
    }

    pub fn has_show(&self, id: i64) -> bool {
        self.shows.contains(id)
    }

    pub fn has_person(&self, id: i64) -> bool {
        self.people.contains(id)
    }

    pub fn show_headers(&self) -> Vec<ShowHeader> {
        self.headers.snapshot()
    }

    pub fn shows(&self) -> Vec<Show> {
        self.shows.snapshot()
    }

    pub fn people(&self) -> Vec<Person> {
        self.people.snapshot()
    }

    pub fn role_manifest(&self) -> Vec<Role> {
        self.roles.full_manifest()
    }

    pub fn counts(&self) -> StoreCounts {
        StoreCounts {
            headers: self.headers.len(),
            shows: self.shows.len(),
            people: self.people.len(),
            roles: self.roles.len(),
        }
    }

    pub fn update_header<R>(&self, id: i64, f: impl FnOnce(&mut ShowHeader) -> R) -> Option<R> {
        self.headers.update(id, f)
    }

    pub fn update_show<R>(&self, id: i64, f: impl FnOnce(&mut Show) -> R) -> Option<R> {
        self.shows.update(id, f)
    }

    pub fn update_person<R>(&self, id: i64, f: impl FnOnce(&mut Person) -> R) -> Option<R> {
        self.people.update(id, f)
    }

    /// Where a downloaded image for `url` lives: the image directory plus the
    /// last path segment of the URL. `None` if the URL has no usable segment.
    pub fn local_image_path(&self, url: &str) -> Option<PathBuf> {
        let path = url.split(&['?', '#'][..]).next().unwrap_or(url);
        let name = path.rsplit('/').next().filter(|name| !name.is_empty())?;
        if name == "." || name == ".." {
            return None;
        }
        Some(self.paths.image_dir().join(name))
    }

    /// Write all four files. A failure is logged and reported but does not
    /// stop the remaining files from being written.
    pub async fn save_all(&self) -> SaveReport {
        let start = std::time::Instant::now();
        let mut report = SaveReport::default();

        let path = self.paths.headers_file();
        let result = save_collection(&path, &self.headers).await;
        record(&mut report, path, result);

        let path = self.paths.shows_file();
        let result = save_collection(&path, &self.shows).await;
        record(&mut report, path, result);

        let path = self.paths.people_file();
        let result = save_collection(&path, &self.people).await;
        record(&mut report, path, result);

        let path = self.paths.roles_file();
        let result = self.roles.save(&path).await;
        record(&mut report, path, result);

        info!(
            "Saved {}/4 store files in {:?}",
            report.saved.len(),
            start.elapsed()
        );
        report
    }
}

async fn save_collection<T>(
    path: &Path,
    collection: &EntityCollection<T>,
) -> Result<(), StoreError>
where
    T: Mergeable + Clone + Serialize,
{
    let items = collection.snapshot();
    save_list(path, &items).await?;
    info!("Saved {} entries to {:?}", items.len(), path);
    Ok(())
}

fn record(report: &mut SaveReport, path: PathBuf, result: Result<(), StoreError>) {
    match result {
        Ok(()) => report.saved.push(path),
        Err(e) => {
            error!("Failed to save {:?}: {}", path, e);
            report.failed.push((path, e));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use starsdb_models::{ContentRating, ShowType, TextWithId};
    use tempfile::TempDir;

    async fn sample_store(dir: &Path) -> EntityStore {
        let store = EntityStore::open(dir).await.unwrap();

        let mut header = ShowHeader::new(111161);
        header.title = Some("The Shawshank Redemption".to_string());
        header.poster_url = Some("https://m.media-amazon.test/images/M/poster.jpg".to_string());
        store.merge_header(header);

        let mut show = Show::new(111161);
        show.show_type = ShowType::Movie;
        show.content_rating = ContentRating::R;
        show.release_date = NaiveDate::from_ymd_opt(1994, 10, 14);
        show.spoken_languages = Some(vec![TextWithId {
            id: "en".to_string(),
            text: Some("English".to_string()),
        }]);
        let role = store.role(RoleType::Actor, 111161, 151);
        store.roles().set_name(role.id, "Red");
        show.credits = Some(vec![role.id]);
        show.principal_credits = Some(vec![role.id]);
        store.merge_show(show);

        let mut person = Person::new(151);
        person.name = Some("Morgan Freeman".to_string());
        store.merge_person(person);

        store
    }

    #[tokio::test]
    async fn test_merge_header_mirrors_into_show() {
        let dir = TempDir::new().unwrap();
        let store = EntityStore::open(dir.path()).await.unwrap();

        let mut header = ShowHeader::new(5);
        header.title = Some("Pilot".to_string());
        header.season = Some(1);
        assert_eq!(store.merge_header(header), MergeOutcome::Inserted);

        let show = store.show(5).expect("stub show created");
        assert_eq!(show.header.title.as_deref(), Some("Pilot"));
        assert_eq!(show.show_type, ShowType::Unknown);

        let mut detail = Show::new(5);
        detail.show_type = ShowType::Episode;
        assert_eq!(store.merge_show(detail), MergeOutcome::Merged);

        let mut renamed = ShowHeader::new(5);
        renamed.title = Some("Pilot (Part 1)".to_string());
        assert_eq!(store.merge_header(renamed), MergeOutcome::Merged);

        let show = store.show(5).unwrap();
        assert_eq!(show.header.title.as_deref(), Some("Pilot (Part 1)"));
        assert_eq!(show.header.season, Some(1));
        assert_eq!(show.show_type, ShowType::Episode);
    }

    #[tokio::test]
    async fn test_open_creates_directories() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("data");
        let store = EntityStore::open(&root).await.unwrap();

        assert!(root.is_dir());
        assert!(store.paths().image_dir().is_dir());
        assert_eq!(store.counts(), StoreCounts::default());
    }

    #[tokio::test]
    async fn test_save_and_reopen_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = sample_store(dir.path()).await;

        let report = store.save_all().await;
        assert!(report.is_complete());
        assert_eq!(report.saved.len(), 4);

        let reopened = EntityStore::open(dir.path()).await.unwrap();
        assert_eq!(reopened.show_headers(), store.show_headers());
        assert_eq!(reopened.shows(), store.shows());
        assert_eq!(reopened.people(), store.people());
        assert_eq!(reopened.role_manifest(), store.role_manifest());
        assert_eq!(
            reopened.counts(),
            StoreCounts {
                headers: 1,
                shows: 1,
                people: 1,
                roles: 1
            }
        );
    }

    #[tokio::test]
    async fn test_save_all_reports_failures_without_stopping() {
        let dir = TempDir::new().unwrap();
        let store = sample_store(dir.path()).await;
        // A directory where Shows.json should be makes that one write fail.
        std::fs::create_dir_all(store.paths().shows_file()).unwrap();

        let report = store.save_all().await;
        assert!(!report.is_complete());
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, store.paths().shows_file());
        assert_eq!(report.saved.len(), 3);
        assert!(store.paths().roles_file().is_file());
    }

    #[tokio::test]
    async fn test_update_person_attaches_image_path() {
        let dir = TempDir::new().unwrap();
        let store = sample_store(dir.path()).await;

        let image = store
            .local_image_path("https://m.media-amazon.test/images/M/face.jpg?w=300")
            .unwrap();
        assert_eq!(image, store.paths().image_dir().join("face.jpg"));

        let path = image.to_string_lossy().into_owned();
        assert!(store
            .update_person(151, |p| p.image_local_path = Some(path))
            .is_some());
        assert!(store.person(151).unwrap().image_local_path.is_some());
        assert!(store.update_person(999, |_| ()).is_none());
    }

    #[test]
    fn test_local_image_path_rejects_urls_without_a_file_name() {
        let store = EntityStore::new("/srv/data");
        assert!(store.local_image_path("https://example.test/images/").is_none());
        assert!(store.local_image_path("").is_none());
        assert_eq!(
            store.local_image_path("poster.png"),
            Some(PathBuf::from("/srv/data/Images/poster.png"))
        );
    }

    #[tokio::test]
    async fn test_read_side_lookups() {
        let dir = TempDir::new().unwrap();
        let store = sample_store(dir.path()).await;

        assert!(store.has_show(111161));
        assert!(store.has_person(151));
        assert!(!store.has_person(152));
        assert!(store.header(111161).is_some());

        let role = store.role(RoleType::Actor, 111161, 151);
        assert_eq!(store.role_by_id(role.id).unwrap().name.as_deref(), Some("Red"));
    }
}

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::merge::{merge_option, Mergeable};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct Person {
    pub id: i64,
    pub name: Option<String>,
    pub url: Option<String>,
    pub image_url: Option<String>,
    pub image_local_path: Option<String>,
    pub bio: Option<String>,
    pub birthday: Option<NaiveDate>,
    pub death_date: Option<NaiveDate>,
    /// `None` when the source does not say either way.
    pub is_dead: Option<bool>,
    pub trivia: Option<String>,
    pub quote: Option<String>,
    pub height_cm: Option<f32>,
}

impl Person {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }
}

impl Mergeable for Person {
    fn id(&self) -> i64 {
        self.id
    }

    fn merge_from(&mut self, incoming: &Self) {
        merge_option(&mut self.name, &incoming.name);
        merge_option(&mut self.url, &incoming.url);
        merge_option(&mut self.image_url, &incoming.image_url);
        merge_option(&mut self.image_local_path, &incoming.image_local_path);
        merge_option(&mut self.bio, &incoming.bio);
        merge_option(&mut self.birthday, &incoming.birthday);
        merge_option(&mut self.death_date, &incoming.death_date);
        merge_option(&mut self.is_dead, &incoming.is_dead);
        merge_option(&mut self.trivia, &incoming.trivia);
        merge_option(&mut self.quote, &incoming.quote);
        merge_option(&mut self.height_cm, &incoming.height_cm);
    }
}

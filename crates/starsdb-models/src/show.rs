use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::merge::{merge_list, merge_option, merge_sentinel, Mergeable};

/// Kind of title as reported by the source.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum ShowType {
    #[default]
    Unknown,
    Movie,
    #[serde(rename = "TVMovie")]
    TvMovie,
    #[serde(rename = "TVSeries")]
    TvSeries,
    #[serde(rename = "TVMiniSeries")]
    TvMiniSeries,
    #[serde(rename = "TVSpecial")]
    TvSpecial,
    Episode,
    Short,
    MusicVideo,
    Podcast,
    VideoGame,
}

impl ShowType {
    /// Series-like titles have an episode listing.
    pub fn is_series(&self) -> bool {
        matches!(self, ShowType::TvSeries | ShowType::TvMiniSeries)
    }
}

/// Content certification. `Unrated` doubles as the "not known yet" sentinel.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum ContentRating {
    #[default]
    Unrated,
    G,
    #[serde(rename = "PG")]
    Pg,
    #[serde(rename = "PG13")]
    Pg13,
    R,
    #[serde(rename = "NC17")]
    Nc17,
    X,
    #[serde(rename = "TVY")]
    TvY,
    #[serde(rename = "TVY7")]
    TvY7,
    #[serde(rename = "TVY7FV")]
    TvY7Fv,
    #[serde(rename = "TVG")]
    TvG,
    #[serde(rename = "TVPG")]
    TvPg,
    #[serde(rename = "TV14")]
    Tv14,
    #[serde(rename = "TVMA")]
    TvMa,
    #[serde(rename = "VG_E")]
    VgE,
    #[serde(rename = "VG_E10")]
    VgE10,
    #[serde(rename = "VG_T")]
    VgT,
    #[serde(rename = "VG_M")]
    VgM,
    Approved,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Money {
    pub amount: Option<i64>,
    pub currency: Option<String>,
}

/// Source-keyed label, e.g. a spoken language or a country of origin.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub struct TextWithId {
    pub id: String,
    pub text: Option<String>,
}

/// Lightweight listing entry, as produced by search and episode index pages.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct ShowHeader {
    pub id: i64,
    pub title: Option<String>,
    pub url: Option<String>,
    pub poster_url: Option<String>,
    pub poster_local_path: Option<String>,
    pub season: Option<i32>,
    pub episode: Option<i32>,
}

impl ShowHeader {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }
}

impl Mergeable for ShowHeader {
    fn id(&self) -> i64 {
        self.id
    }

    fn merge_from(&mut self, incoming: &Self) {
        merge_option(&mut self.title, &incoming.title);
        merge_option(&mut self.url, &incoming.url);
        merge_option(&mut self.poster_url, &incoming.poster_url);
        merge_option(&mut self.poster_local_path, &incoming.poster_local_path);
        merge_option(&mut self.season, &incoming.season);
        merge_option(&mut self.episode, &incoming.episode);
    }
}

/// Full title record. The listing fields live in the embedded header and are
/// serialized flat alongside the detail fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct Show {
    #[serde(flatten)]
    pub header: ShowHeader,
    #[serde(rename = "type")]
    pub show_type: ShowType,
    pub release_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub total_seasons: Option<i32>,
    pub total_episodes: Option<i32>,
    pub duration_minutes: Option<u32>,
    pub content_rating: ContentRating,
    pub quality_rating: Option<f32>,
    pub votes: Option<u32>,
    pub genre: Option<Vec<String>>,
    pub description: Option<String>,
    pub trailer_url: Option<String>,
    pub trailer_thumbnail_url: Option<String>,
    pub trailer_thumbnail_local_path: Option<String>,
    pub is_adult: Option<bool>,
    pub trivia_markdown: Option<String>,
    pub goof_markdown: Option<String>,
    pub production_budget: Option<Money>,
    pub worldwide_gross: Option<Money>,
    pub lifetime_gross: Option<Money>,
    pub opening_weekend_gross: Option<Money>,
    pub opening_weekend_end: Option<NaiveDate>,
    pub spoken_languages: Option<Vec<TextWithId>>,
    pub countries_of_origin: Option<Vec<TextWithId>>,
    /// Role ids of the top-billed credits.
    pub principal_credits: Option<Vec<i64>>,
    /// Role ids of every known credit.
    pub credits: Option<Vec<i64>>,
    /// Show ids of the episodes of a series.
    pub episodes: Option<Vec<i64>>,
}

impl Show {
    pub fn new(id: i64) -> Self {
        Self::from(ShowHeader::new(id))
    }

    pub fn id(&self) -> i64 {
        self.header.id
    }
}

impl From<ShowHeader> for Show {
    fn from(header: ShowHeader) -> Self {
        Self {
            header,
            ..Self::default()
        }
    }
}

impl Mergeable for Show {
    fn id(&self) -> i64 {
        self.header.id
    }

    fn merge_from(&mut self, incoming: &Self) {
        self.header.merge_from(&incoming.header);

        merge_sentinel(&mut self.show_type, incoming.show_type, ShowType::Unknown);
        merge_option(&mut self.release_date, &incoming.release_date);
        merge_option(&mut self.end_date, &incoming.end_date);
        merge_option(&mut self.total_seasons, &incoming.total_seasons);
        merge_option(&mut self.total_episodes, &incoming.total_episodes);
        merge_option(&mut self.duration_minutes, &incoming.duration_minutes);
        merge_sentinel(
            &mut self.content_rating,
            incoming.content_rating,
            ContentRating::Unrated,
        );
        merge_option(&mut self.quality_rating, &incoming.quality_rating);
        merge_option(&mut self.votes, &incoming.votes);
        merge_list(&mut self.genre, &incoming.genre);
        merge_option(&mut self.description, &incoming.description);
        merge_option(&mut self.trailer_url, &incoming.trailer_url);
        merge_option(&mut self.trailer_thumbnail_url, &incoming.trailer_thumbnail_url);
        merge_option(
            &mut self.trailer_thumbnail_local_path,
            &incoming.trailer_thumbnail_local_path,
        );
        merge_option(&mut self.is_adult, &incoming.is_adult);
        merge_option(&mut self.trivia_markdown, &incoming.trivia_markdown);
        merge_option(&mut self.goof_markdown, &incoming.goof_markdown);
        merge_option(&mut self.production_budget, &incoming.production_budget);
        merge_option(&mut self.worldwide_gross, &incoming.worldwide_gross);
        merge_option(&mut self.lifetime_gross, &incoming.lifetime_gross);
        merge_option(&mut self.opening_weekend_gross, &incoming.opening_weekend_gross);
        merge_option(&mut self.opening_weekend_end, &incoming.opening_weekend_end);
        merge_list(&mut self.spoken_languages, &incoming.spoken_languages);
        merge_list(&mut self.countries_of_origin, &incoming.countries_of_origin);
        merge_list(&mut self.principal_credits, &incoming.principal_credits);
        merge_list(&mut self.credits, &incoming.credits);
        merge_list(&mut self.episodes, &incoming.episodes);
    }
}

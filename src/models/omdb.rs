//! Raw OMDB API payloads

use serde::{Deserialize, Serialize};

use super::Ratings;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase", default)]
pub struct OmdbRating {
    pub source: String,
    pub value: String,
}

/// Title record from `?t=`, `?i=` or one entry of a `?s=` search
///
/// OMDB reports missing fields as `"N/A"`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase", default)]
pub struct OmdbTitle {
    pub title: String,
    pub year: String,
    pub rated: String,
    pub released: String,
    pub runtime: String,
    pub genre: String,
    pub director: String,
    pub writer: String,
    pub actors: String,
    pub plot: String,
    pub poster: String,
    pub ratings: Vec<OmdbRating>,
    pub metascore: String,
    #[serde(rename = "imdbRating")]
    pub imdb_rating: String,
    #[serde(rename = "imdbVotes")]
    pub imdb_votes: String,
    #[serde(rename = "imdbID")]
    pub imdb_id: String,
    #[serde(rename = "Type")]
    pub kind: String,
    pub response: String,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct OmdbSearch {
    pub search: Vec<OmdbTitle>,
    #[serde(rename = "totalResults")]
    pub total_results: String,
    pub response: String,
    pub error: Option<String>,
}

fn known(value: &str) -> Option<&str> {
    let value = value.trim();
    (!value.is_empty() && value != "N/A").then_some(value)
}

impl OmdbTitle {
    /// True when OMDB answered `"Response": "False"`
    pub fn is_failure(&self) -> bool {
        self.response.eq_ignore_ascii_case("false")
    }

    /// Plot text unless OMDB has none
    pub fn plot(&self) -> Option<&str> {
        known(&self.plot)
    }

    /// Runtime in minutes, parsed from `"136 min"`
    pub fn runtime_minutes(&self) -> Option<u32> {
        known(&self.runtime)
            .and_then(|r| r.trim_end_matches("min").trim().parse::<u32>().ok())
            .filter(|m| *m > 0)
    }

    /// Extracts IMDB, Metacritic and Rotten Tomatoes scores and their average
    ///
    /// The average is taken on a 10-point scale over the sources present.
    pub fn ratings(&self) -> Ratings {
        let mut ratings = Ratings::default();

        if let Some(imdb) = known(&self.imdb_rating).and_then(|r| r.parse::<f64>().ok()) {
            ratings.imdb = imdb;
        }
        if let Some(meta) = known(&self.metascore).and_then(|r| r.parse::<f64>().ok()) {
            ratings.metacritic = meta;
        }
        for rating in &self.ratings {
            if rating.source.eq_ignore_ascii_case("rotten tomatoes") {
                if let Some(rt) = known(&rating.value)
                    .and_then(|v| v.trim_end_matches('%').parse::<f64>().ok())
                {
                    ratings.rotten_tomatoes = rt;
                }
            }
        }

        let scores: Vec<f64> = [
            ratings.imdb,
            ratings.metacritic / 10.0,
            ratings.rotten_tomatoes / 10.0,
        ]
        .into_iter()
        .filter(|s| *s > 0.0)
        .collect();

        if !scores.is_empty() {
            ratings.omdb = scores.iter().sum::<f64>() / scores.len() as f64;
        }

        ratings.clamp_to_scales();
        ratings
    }
}

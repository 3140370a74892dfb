use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Inclusive runtime bounds in minutes
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RuntimeRange {
    pub min: Option<u32>,
    pub max: Option<u32>,
}

/// Inclusive release-year bounds
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct YearRange {
    pub from: Option<i32>,
    pub to: Option<i32>,
}

/// A recommendation request as submitted by the client.
///
/// Every field is an optional filter, but at least one of `mood`,
/// `genres`, or `platforms` must be present for the request to be valid.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RecommendationRequest {
    pub mood: Option<String>,
    pub genres: Option<Vec<String>>,
    pub platforms: Option<Vec<String>>,
    pub runtime: Option<RuntimeRange>,
    pub year: Option<YearRange>,
}

impl RecommendationRequest {
    /// Validates the request before any agent call is made.
    ///
    /// Empty genre/platform lists count as absent filters.
    pub fn validate(&self) -> AppResult<()> {
        let has_mood = self.mood.as_deref().is_some_and(|m| !m.trim().is_empty());
        let has_genres = self.genres.as_deref().is_some_and(|g| !g.is_empty());
        let has_platforms = self.platforms.as_deref().is_some_and(|p| !p.is_empty());

        if !has_mood && !has_genres && !has_platforms {
            return Err(AppError::Validation(
                "at least one of mood, genres, or platforms is required".to_string(),
            ));
        }

        if let Some(RuntimeRange {
            min: Some(min),
            max: Some(max),
        }) = self.runtime
        {
            if min > max {
                return Err(AppError::Validation(format!(
                    "invalid runtime range: min {} exceeds max {}",
                    min, max
                )));
            }
        }

        if let Some(YearRange {
            from: Some(from),
            to: Some(to),
        }) = self.year
        {
            if from > to {
                return Err(AppError::Validation(format!(
                    "invalid year range: from {} exceeds to {}",
                    from, to
                )));
            }
        }

        Ok(())
    }
}

/// A single recommended title as returned by the agent
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    pub title: String,
    pub year: Option<i32>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub platforms: Vec<String>,
    pub synopsis: Option<String>,
    /// Why the agent believes this title matches the request
    pub match_reason: Option<String>,
}

/// The successful outcome of a recommendation request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecommendationResponse {
    pub recommendations: Vec<Recommendation>,
    /// Optional free-text reasoning accompanying the list
    pub reasoning: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mood_request(mood: &str) -> RecommendationRequest {
        RecommendationRequest {
            mood: Some(mood.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_request_is_invalid() {
        let request = RecommendationRequest::default();
        let err = request.validate().unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }

    #[test]
    fn test_empty_lists_count_as_absent() {
        let request = RecommendationRequest {
            genres: Some(vec![]),
            platforms: Some(vec![]),
            ..Default::default()
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_blank_mood_counts_as_absent() {
        assert!(mood_request("   ").validate().is_err());
    }

    #[test]
    fn test_single_filter_is_sufficient() {
        assert!(mood_request("cozy").validate().is_ok());

        let request = RecommendationRequest {
            platforms: Some(vec!["netflix".to_string()]),
            ..Default::default()
        };
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_inverted_runtime_range_is_invalid() {
        let mut request = mood_request("tense");
        request.runtime = Some(RuntimeRange {
            min: Some(120),
            max: Some(60),
        });
        let err = request.validate().unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
        assert!(err.to_string().contains("runtime range"));
    }

    #[test]
    fn test_half_open_runtime_range_is_valid() {
        let mut request = mood_request("tense");
        request.runtime = Some(RuntimeRange {
            min: Some(90),
            max: None,
        });
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_inverted_year_range_is_invalid() {
        let mut request = mood_request("nostalgic");
        request.year = Some(YearRange {
            from: Some(2010),
            to: Some(1999),
        });
        let err = request.validate().unwrap_err();
        assert!(err.to_string().contains("year range"));
    }

    #[test]
    fn test_equal_bounds_are_valid() {
        let mut request = mood_request("nostalgic");
        request.runtime = Some(RuntimeRange {
            min: Some(90),
            max: Some(90),
        });
        request.year = Some(YearRange {
            from: Some(1999),
            to: Some(1999),
        });
        assert!(request.validate().is_ok());
    }
}

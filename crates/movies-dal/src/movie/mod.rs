mod fold;
pub mod validation;

pub use fold::fold_rows;

use garde::Validate;
use serde::{Deserialize, Serialize};
use sqlx::{Acquire, Connection as _, Executor, QueryBuilder};
use tracing::debug;
use uuid::Uuid;

use crate::{
    ChosenDB, Error, Pool,
    error::Result,
    genre::{self, Genre},
};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Movie {
    pub id: Uuid,
    pub title: String,
    pub year: i32,
    pub director: String,
    pub duration: i32,
    pub poster: String,
    pub rate: f64,
    pub genre: Vec<String>,
}

/// One row of the movie to genre join, a movie without genres comes as a
/// single row with `genre` set to `None`.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct MovieRow {
    pub id: Uuid,
    pub title: String,
    pub year: i32,
    pub director: String,
    pub duration: i32,
    pub poster: String,
    pub rate: f64,
    pub genre: Option<String>,
}

/// Fully validated input for a new movie.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CreateMovie {
    pub title: String,
    pub year: i32,
    pub director: String,
    pub duration: i32,
    pub poster: String,
    pub rate: f64,
    pub genre: Vec<String>,
}

/// Partial change of a movie, only present fields are written.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Validate)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(deny_unknown_fields)]
pub struct MoviePatch {
    #[garde(length(min = 1, max = 255), inner(custom(validation::not_blank)))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[garde(inner(custom(validation::valid_year)))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,

    #[garde(length(min = 1, max = 255), inner(custom(validation::not_blank)))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub director: Option<String>,

    #[garde(range(min = 1, max = 1440))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<i32>,

    #[garde(url, length(max = 1023))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster: Option<String>,

    #[garde(range(min = 0.0, max = 10.0))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate: Option<f64>,

    #[garde(inner(
        length(min = 1, max = 32),
        custom(validation::unique_genres),
        inner(length(min = 1, max = 255))
    ))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<Vec<String>>,
}

impl MoviePatch {
    /// Fields with no value, in declaration order.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let MoviePatch {
            title,
            year,
            director,
            duration,
            poster,
            rate,
            genre,
        } = self;
        [
            ("title", title.is_none()),
            ("year", year.is_none()),
            ("director", director.is_none()),
            ("duration", duration.is_none()),
            ("poster", poster.is_none()),
            ("rate", rate.is_none()),
            ("genre", genre.is_none()),
        ]
        .into_iter()
        .filter_map(|(name, missing)| missing.then_some(name))
        .collect()
    }

    /// `UPDATE` for the scalar fields present in the patch, `None` when only
    /// genres (or nothing) change.
    pub fn update_statement(&self, id: Uuid) -> Option<QueryBuilder<'static, ChosenDB>> {
        let MoviePatch {
            title,
            year,
            director,
            duration,
            poster,
            rate,
            genre: _,
        } = self;

        if title.is_none()
            && year.is_none()
            && director.is_none()
            && duration.is_none()
            && poster.is_none()
            && rate.is_none()
        {
            return None;
        }

        let mut query = QueryBuilder::new("UPDATE movie SET ");
        let mut assignments = query.separated(", ");
        if let Some(title) = title {
            assignments.push("title = ").push_bind_unseparated(title.clone());
        }
        if let Some(year) = year {
            assignments.push("year = ").push_bind_unseparated(*year);
        }
        if let Some(director) = director {
            assignments
                .push("director = ")
                .push_bind_unseparated(director.clone());
        }
        if let Some(duration) = duration {
            assignments
                .push("duration = ")
                .push_bind_unseparated(*duration);
        }
        if let Some(poster) = poster {
            assignments.push("poster = ").push_bind_unseparated(poster.clone());
        }
        if let Some(rate) = rate {
            assignments.push("rate = ").push_bind_unseparated(*rate);
        }
        query.push(" WHERE id = ").push_bind(id);
        Some(query)
    }
}

const SELECT_ALL: &str = r#"
SELECT m.id, m.title, m.year, m.director, m.duration, m.poster, m.rate, g.name AS genre
FROM movie m
LEFT JOIN movie_genre mg ON m.id = mg.movie_id
LEFT JOIN genre g ON mg.genre_id = g.id
ORDER BY m.rowid, mg.rowid
"#;

const SELECT_ONE: &str = r#"
SELECT m.id, m.title, m.year, m.director, m.duration, m.poster, m.rate, g.name AS genre
FROM movie m
LEFT JOIN movie_genre mg ON m.id = mg.movie_id
LEFT JOIN genre g ON mg.genre_id = g.id
WHERE m.id = ?
ORDER BY mg.rowid
"#;

const ANY_IN_GENRE: &str = r#"
SELECT 1
FROM movie_genre mg
JOIN genre g ON mg.genre_id = g.id
WHERE LOWER(g.name) = LOWER(?)
LIMIT 1
"#;

const SELECT_BY_GENRE: &str = r#"
SELECT m.id, m.title, m.year, m.director, m.duration, m.poster, m.rate, g.name AS genre
FROM movie m
LEFT JOIN movie_genre mg ON m.id = mg.movie_id
LEFT JOIN genre g ON mg.genre_id = g.id
WHERE m.id IN (
    SELECT fmg.movie_id
    FROM movie_genre fmg
    JOIN genre fg ON fmg.genre_id = fg.id
    WHERE LOWER(fg.name) = LOWER(?)
)
ORDER BY m.rowid, mg.rowid
"#;

/// Writing transactions take the database lock up front, concurrent writers
/// then queue on the busy timeout.
const BEGIN_WRITE: &str = "BEGIN IMMEDIATE";

async fn fetch_movie<'e, X>(executor: X, id: Uuid) -> Result<Option<Movie>>
where
    X: Executor<'e, Database = ChosenDB>,
{
    let rows = sqlx::query_as::<_, MovieRow>(SELECT_ONE)
        .bind(id)
        .fetch_all(executor)
        .await?;
    Ok(fold_rows(rows).into_iter().next())
}

async fn link_genres<'e, X>(executor: X, movie_id: Uuid, genres: &[Genre]) -> Result<()>
where
    X: Executor<'e, Database = ChosenDB>,
{
    if genres.is_empty() {
        return Ok(());
    }
    let mut query = QueryBuilder::<ChosenDB>::new("INSERT INTO movie_genre (movie_id, genre_id) ");
    query.push_values(genres, |mut row, genre| {
        row.push_bind(movie_id).push_bind(genre.id);
    });
    query.build().execute(executor).await?;
    Ok(())
}

fn not_found() -> Error {
    Error::RecordNotFound("Movie".to_string())
}

pub type MovieRepository = MovieRepositoryImpl<Pool>;

pub struct MovieRepositoryImpl<E> {
    executor: E,
}

impl<'c, E> MovieRepositoryImpl<E>
where
    for<'a> &'a E: Executor<'c, Database = ChosenDB> + Acquire<'c, Database = ChosenDB>,
{
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    /// All movies, optionally only those having a genre named `genre` (any case).
    pub async fn list(&self, genre: Option<&str>) -> Result<Vec<Movie>> {
        let rows = match genre {
            None => {
                sqlx::query_as::<_, MovieRow>(SELECT_ALL)
                    .fetch_all(&self.executor)
                    .await?
            }
            Some(genre) => {
                let any: Option<i64> = sqlx::query_scalar(ANY_IN_GENRE)
                    .bind(genre)
                    .fetch_optional(&self.executor)
                    .await?;
                if any.is_none() {
                    debug!("No movies in genre {genre}");
                    return Ok(Vec::new());
                }

                sqlx::query_as::<_, MovieRow>(SELECT_BY_GENRE)
                    .bind(genre)
                    .fetch_all(&self.executor)
                    .await?
            }
        };

        Ok(fold_rows(rows))
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Movie>> {
        fetch_movie(&self.executor, id).await
    }

    pub async fn create(&self, payload: CreateMovie) -> Result<Movie> {
        let id = Uuid::new_v4();
        let mut conn = self.executor.acquire().await?;
        let mut tx = conn.begin_with(BEGIN_WRITE).await?;

        let genres = genre::resolve_names(&mut *tx, &payload.genre).await?;

        sqlx::query(
            "INSERT INTO movie (id, title, year, director, duration, poster, rate) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(&payload.title)
        .bind(payload.year)
        .bind(&payload.director)
        .bind(payload.duration)
        .bind(&payload.poster)
        .bind(payload.rate)
        .execute(&mut *tx)
        .await?;

        link_genres(&mut *tx, id, &genres).await?;

        let movie = fetch_movie(&mut *tx, id).await?.ok_or_else(not_found)?;
        tx.commit().await?;
        debug!("Created movie {id}");
        Ok(movie)
    }

    /// Applies `patch` to movie `id`, a present genre list replaces all
    /// genres of the movie.
    pub async fn update(&self, id: Uuid, patch: MoviePatch) -> Result<Movie> {
        let mut conn = self.executor.acquire().await?;
        let mut tx = conn.begin_with(BEGIN_WRITE).await?;

        let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM movie WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(not_found());
        }

        if let Some(mut statement) = patch.update_statement(id) {
            statement.build().execute(&mut *tx).await?;
        }

        if let Some(names) = patch.genre.as_ref() {
            let genres = genre::resolve_names(&mut *tx, names).await?;
            sqlx::query("DELETE FROM movie_genre WHERE movie_id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            link_genres(&mut *tx, id, &genres).await?;
        }

        let movie = fetch_movie(&mut *tx, id).await?.ok_or_else(not_found)?;
        tx.commit().await?;
        debug!("Updated movie {id}");
        Ok(movie)
    }

    /// Returns `false` when there was no such movie.
    pub async fn delete(&self, id: Uuid) -> Result<bool> {
        let res = sqlx::query("DELETE FROM movie WHERE id = ?")
            .bind(id)
            .execute(&self.executor)
            .await?;

        Ok(res.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_statement_only_present_fields() {
        let id = Uuid::nil();
        let patch = MoviePatch {
            title: Some("Heat".to_string()),
            rate: Some(8.3),
            genre: Some(vec!["Crime".to_string()]),
            ..Default::default()
        };
        let statement = patch.update_statement(id).unwrap();
        assert_eq!(
            statement.sql(),
            "UPDATE movie SET title = ?, rate = ? WHERE id = ?"
        );
    }

    #[test]
    fn test_update_statement_genre_only() {
        let patch = MoviePatch {
            genre: Some(vec!["Crime".to_string()]),
            ..Default::default()
        };
        assert!(patch.update_statement(Uuid::nil()).is_none());
        assert!(MoviePatch::default().update_statement(Uuid::nil()).is_none());
    }

    #[test]
    fn test_missing_fields() {
        let patch = MoviePatch {
            title: Some("Heat".to_string()),
            year: Some(1995),
            poster: Some("http://x/heat.jpg".to_string()),
            ..Default::default()
        };
        assert_eq!(
            patch.missing_fields(),
            vec!["director", "duration", "rate", "genre"]
        );
    }
}

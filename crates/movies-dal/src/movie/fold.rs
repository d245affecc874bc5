use std::collections::HashMap;

use uuid::Uuid;

use super::{Movie, MovieRow};

/// Groups join rows by movie id.
///
/// Movies come out in order of their first row, scalar fields are taken from
/// that first row and genres are appended in row order without duplicates.
pub fn fold_rows<I>(rows: I) -> Vec<Movie>
where
    I: IntoIterator<Item = MovieRow>,
{
    let mut positions: HashMap<Uuid, usize> = HashMap::new();
    let mut movies: Vec<Movie> = Vec::new();

    for row in rows {
        let MovieRow {
            id,
            title,
            year,
            director,
            duration,
            poster,
            rate,
            genre,
        } = row;

        let pos = *positions.entry(id).or_insert_with(|| {
            movies.push(Movie {
                id,
                title,
                year,
                director,
                duration,
                poster,
                rate,
                genre: Vec::new(),
            });
            movies.len() - 1
        });

        if let Some(genre) = genre {
            let movie = &mut movies[pos];
            if !movie.genre.contains(&genre) {
                movie.genre.push(genre);
            }
        }
    }

    movies
}
